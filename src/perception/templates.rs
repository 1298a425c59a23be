//! Template store: localized reference images, loaded on first use and cached for the process

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use opencv::{core::Mat, imgcodecs, prelude::*};

use super::capture_cache::Frame;
use super::matcher;
use crate::error::{ConfigurationError, PerceptionError};

/// Locale every other language falls back to
pub const DEFAULT_LANGUAGE: &str = "en";

/// Every template the cue table can ask for
pub const KNOWN_TEMPLATES: [&str; 8] = [
    "cast_indicator",
    "fish_hooked",
    "fish_captured",
    "line_snagged",
    "retrieval_done",
    "disconnected",
    "energy_low",
    "tag",
];

/// Templates a session cannot land a fish without
pub const REQUIRED_TEMPLATES: [&str; 3] = ["cast_indicator", "fish_hooked", "fish_captured"];

/// Where a template image resolves on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateFile {
    Localized(PathBuf),
    /// Only the default locale has it
    Fallback(PathBuf),
    Missing,
}

/// Pixel layout a template is matched in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    Grayscale,
    Color,
}

/// Immutable reference image
#[derive(Debug)]
pub struct Template {
    name: String,
    color_mode: ColorMode,
    image: Mat,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn mat(&self) -> &Mat {
        &self.image
    }

    pub fn size(&self) -> (i32, i32) {
        (self.image.cols(), self.image.rows())
    }
}

/// Lazily-loaded template cache keyed by `(name, color mode)`
pub struct TemplateStore {
    root: PathBuf,
    language: String,
    known: HashSet<String>,
    cache: HashMap<(String, ColorMode), Option<Arc<Template>>>,
}

impl TemplateStore {
    /// Store reading `<root>/<language>/<name>.png`
    pub fn new(root: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            language: language.into(),
            known: KNOWN_TEMPLATES.iter().map(|n| n.to_string()).collect(),
            cache: HashMap::new(),
        }
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Look up a template.
    ///
    /// `Err` for names outside the known set; `Ok(None)` for a known name whose image exists
    /// in neither the active nor the default locale. Both outcomes are cached.
    pub fn get(
        &mut self,
        name: &str,
        mode: ColorMode,
    ) -> Result<Option<Arc<Template>>, PerceptionError> {
        if !self.is_known(name) {
            return Err(ConfigurationError::UnknownTemplate(name.to_string()).into());
        }

        let key = (name.to_string(), mode);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let loaded = self.load(name, mode)?;
        self.cache.insert(key, loaded.clone());
        Ok(loaded)
    }

    /// Register an in-memory template, e.g. one captured by a calibration tool.
    /// The color mode follows the frame's layout.
    pub fn preload(&mut self, name: &str, frame: &Frame) -> Result<(), PerceptionError> {
        if !self.is_known(name) {
            return Err(ConfigurationError::UnknownTemplate(name.to_string()).into());
        }
        let template = Template {
            name: name.to_string(),
            color_mode: frame.color_mode(),
            image: matcher::frame_to_mat(frame)?,
        };
        self.cache
            .insert((name.to_string(), frame.color_mode()), Some(Arc::new(template)));
        Ok(())
    }

    /// Candidate files in lookup order: active locale first, then the default locale
    pub fn candidate_paths(&self, name: &str) -> Vec<PathBuf> {
        let file = format!("{}.png", name);
        let mut paths = vec![self.root.join(&self.language).join(&file)];
        if self.language != DEFAULT_LANGUAGE {
            paths.push(self.root.join(DEFAULT_LANGUAGE).join(&file));
        }
        paths
    }

    /// First candidate file that exists, without loading it
    pub fn locate(&self, name: &str) -> TemplateFile {
        let found = self
            .candidate_paths(name)
            .into_iter()
            .enumerate()
            .find(|(_, path)| path.exists());
        match found {
            Some((0, path)) => TemplateFile::Localized(path),
            Some((_, path)) => TemplateFile::Fallback(path),
            None => TemplateFile::Missing,
        }
    }

    fn load(&self, name: &str, mode: ColorMode) -> Result<Option<Arc<Template>>, PerceptionError> {
        for path in self.candidate_paths(name) {
            if !path.exists() {
                continue;
            }
            let image = read_image(&path, mode)?;
            if image.empty() {
                tracing::warn!("[PERCEPTION] Template empty or unreadable: {:?}", path);
                continue;
            }
            tracing::debug!("[PERCEPTION] Loaded template '{}' from {:?}", name, path);
            return Ok(Some(Arc::new(Template {
                name: name.to_string(),
                color_mode: mode,
                image,
            })));
        }

        tracing::warn!(
            "[PERCEPTION] Template '{}' missing for language '{}' and default '{}'",
            name,
            self.language,
            DEFAULT_LANGUAGE
        );
        Ok(None)
    }
}

fn read_image(path: &Path, mode: ColorMode) -> Result<Mat, PerceptionError> {
    let path_str = path.to_str().ok_or_else(|| {
        opencv::Error::new(opencv::core::StsError, "Invalid path: non-UTF8 characters")
    })?;
    let flags = match mode {
        ColorMode::Grayscale => imgcodecs::IMREAD_GRAYSCALE,
        ColorMode::Color => imgcodecs::IMREAD_COLOR,
    };
    Ok(imgcodecs::imread(path_str, flags)?)
}
