//! Normalised cross-correlation matching and image/Mat conversion helpers

use image::{GrayImage, RgbImage};
use opencv::{
    core::{min_max_loc, no_array, Mat, Size, CV_8UC1, CV_8UC3},
    imgproc,
    prelude::*,
};

use super::capture_cache::Frame;

/// Convert image::GrayImage to OpenCV Mat
pub fn gray_image_to_mat(img: &GrayImage) -> opencv::Result<Mat> {
    let (width, height) = (img.width() as i32, img.height() as i32);
    let data = img.as_raw();

    // 1 byte per pixel for CV_8UC1
    let step = width as usize;
    let mat = unsafe {
        Mat::new_rows_cols_with_data_unsafe(
            height,
            width,
            CV_8UC1,
            data.as_ptr() as *mut std::ffi::c_void,
            step,
        )?
    };

    // the borrowed buffer belongs to the GrayImage
    mat.try_clone()
}

/// Convert image::RgbImage to a BGR OpenCV Mat, the layout `imread` produces
pub fn rgb_image_to_mat(img: &RgbImage) -> opencv::Result<Mat> {
    let (width, height) = (img.width() as i32, img.height() as i32);
    let data = img.as_raw();

    let step = width as usize * 3;
    let rgb = unsafe {
        Mat::new_rows_cols_with_data_unsafe(
            height,
            width,
            CV_8UC3,
            data.as_ptr() as *mut std::ffi::c_void,
            step,
        )?
    };

    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

pub fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
    match frame {
        Frame::Gray(img) => gray_image_to_mat(img),
        Frame::Color(img) => rgb_image_to_mat(img),
    }
}

/// Copy a single-channel 8-bit Mat back into an image buffer
pub fn mat_to_gray_image(mat: &Mat) -> opencv::Result<GrayImage> {
    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };
    let bytes = mat.data_bytes()?.to_vec();
    GrayImage::from_raw(mat.cols() as u32, mat.rows() as u32, bytes).ok_or_else(|| {
        opencv::Error::new(
            opencv::core::StsBadArg,
            "Mat is not a single-channel 8-bit image",
        )
    })
}

/// Best TM_CCOEFF_NORMED score of `template` anywhere in `image`.
///
/// A template larger than the image scores 0. Flat images make the coefficient undefined;
/// those score 0 as well.
pub fn best_score(image: &Mat, template: &Mat) -> opencv::Result<f32> {
    if template.empty() || template.cols() > image.cols() || template.rows() > image.rows() {
        return Ok(0.0);
    }

    let mut result = Mat::default();
    imgproc::match_template(
        image,
        template,
        &mut result,
        imgproc::TM_CCOEFF_NORMED,
        &no_array(),
    )?;

    let mut max_val = 0.0;
    min_max_loc(&result, None, Some(&mut max_val), None, None, &no_array())?;

    if max_val.is_finite() {
        Ok(max_val as f32)
    } else {
        Ok(0.0)
    }
}

/// Template resized by `scale`; `None` when it would collapse below one pixel
pub fn scaled_template(template: &Mat, scale: f32) -> opencv::Result<Option<Mat>> {
    let width = (template.cols() as f32 * scale).round() as i32;
    let height = (template.rows() as f32 * scale).round() as i32;
    if width < 1 || height < 1 {
        return Ok(None);
    }

    let mut resized = Mat::default();
    imgproc::resize(
        template,
        &mut resized,
        Size::new(width, height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(Some(resized))
}

/// Try each scale in order and stop at the first one clearing `threshold`.
/// Returns the best score seen.
pub fn best_score_multi_scale(
    image: &Mat,
    template: &Mat,
    scales: &[f32],
    threshold: f32,
) -> opencv::Result<f32> {
    let mut best = 0.0f32;
    for &scale in scales {
        let score = if (scale - 1.0).abs() < f32::EPSILON {
            best_score(image, template)?
        } else {
            match scaled_template(template, scale)? {
                Some(resized) => best_score(image, &resized)?,
                None => continue,
            }
        };

        tracing::trace!("[PERCEPTION] scale {:.2} scored {:.3}", scale, score);
        best = best.max(score);
        if score >= threshold {
            break;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    pub(crate) fn textured(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 37 + y * 91 + (x * y) % 13) % 256) as u8])
        })
    }

    #[test]
    fn test_gray_image_roundtrip_through_mat() {
        let img = textured(10, 7);
        let mat = gray_image_to_mat(&img).unwrap();
        assert_eq!((mat.cols(), mat.rows()), (10, 7));
        assert_eq!(mat_to_gray_image(&mat).unwrap(), img);
    }

    #[test]
    fn test_rgb_image_becomes_three_channel_mat() {
        let img = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let mat = rgb_image_to_mat(&img).unwrap();
        assert_eq!(mat.channels(), 3);
        assert_eq!((mat.cols(), mat.rows()), (4, 3));
    }

    #[test]
    fn test_exact_crop_scores_near_one() {
        let screen = textured(60, 40);
        let crop = image::imageops::crop_imm(&screen, 12, 9, 20, 14).to_image();

        let score = best_score(
            &gray_image_to_mat(&screen).unwrap(),
            &gray_image_to_mat(&crop).unwrap(),
        )
        .unwrap();
        assert!(score > 0.99, "score was {}", score);
    }

    #[test]
    fn test_oversized_template_scores_zero() {
        let screen = gray_image_to_mat(&textured(10, 10)).unwrap();
        let template = gray_image_to_mat(&textured(20, 5)).unwrap();
        assert_eq!(best_score(&screen, &template).unwrap(), 0.0);
    }

    #[test]
    fn test_multi_scale_finds_exact_scale() {
        let screen = textured(60, 40);
        let crop = image::imageops::crop_imm(&screen, 5, 5, 24, 16).to_image();
        let screen = gray_image_to_mat(&screen).unwrap();
        let template = gray_image_to_mat(&crop).unwrap();

        let score =
            best_score_multi_scale(&screen, &template, &[0.8, 0.9, 1.0, 1.1, 1.2], 0.95).unwrap();
        assert!(score >= 0.95);
    }

    #[test]
    fn test_degenerate_scale_is_skipped() {
        let template = gray_image_to_mat(&textured(4, 4)).unwrap();
        assert!(scaled_template(&template, 0.1).unwrap().is_none());
    }
}
