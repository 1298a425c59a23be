//! Text reader: blur, Otsu binarisation, then single-line Tesseract OCR

use std::collections::HashMap;

use image::{DynamicImage, GrayImage};
use opencv::{
    core::{Mat, Size},
    imgproc,
};
use rusty_tesseract::{Args, Image as TessImage};

use super::matcher::{gray_image_to_mat, mat_to_gray_image};

/// Tesseract language code for a template locale
pub fn tesseract_language(language: &str) -> &'static str {
    match language {
        "ru" => "rus",
        "de" => "deu",
        "fr" => "fra",
        "pl" => "pol",
        "es" => "spa",
        "pt" => "por",
        "zh" => "chi_sim",
        _ => "eng",
    }
}

/// OCR front end for banner text such as the fish name
pub struct TextReader {
    lang: String,
}

impl TextReader {
    pub fn new(language: &str) -> Self {
        Self {
            lang: tesseract_language(language).to_string(),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Blur and binarise a capture so the glyphs survive the game's soft shadows
    pub fn preprocess(img: &GrayImage) -> opencv::Result<GrayImage> {
        let src = gray_image_to_mat(img)?;

        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(&src, &mut blurred, Size::new(5, 5), 0.0)?;

        let mut binary = Mat::default();
        imgproc::threshold(
            &blurred,
            &mut binary,
            0.0,
            255.0,
            imgproc::THRESH_BINARY | imgproc::THRESH_OTSU,
        )?;

        mat_to_gray_image(&binary)
    }

    /// Read one line of text.
    ///
    /// Returns the trimmed first line, or `""` when nothing was recognised. OCR engine failures
    /// are logged and read as `""`.
    pub fn read(&self, img: &GrayImage) -> opencv::Result<String> {
        let binary = Self::preprocess(img)?;
        let dynamic_img = DynamicImage::ImageLuma8(binary);

        let tess_image = match TessImage::from_dynamic_image(&dynamic_img) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("[OCR] Failed to create Tesseract image: {:?}", e);
                return Ok(String::new());
            }
        };

        let args = Args {
            lang: self.lang.clone(),
            config_variables: HashMap::new(),
            dpi: Some(150),
            psm: Some(7), // single line
            oem: Some(3),
        };

        let text = match rusty_tesseract::image_to_string(&tess_image, &args) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("[OCR] Tesseract failed: {:?}", e);
                return Ok(String::new());
            }
        };

        let line = first_line(&text);
        tracing::debug!("[OCR] Read '{}'", line);
        Ok(line)
    }
}

/// Trimmed first non-empty line
pub fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}
