//! Visual perception: turns screen captures into yes/no facts, text and motion

pub mod capture_cache;
pub mod cues;
pub mod matcher;
pub mod motion;
pub mod ocr;
pub mod regions;
pub mod screen_service;
pub mod templates;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use opencv::core::Mat;

use crate::clock::Clock;
use crate::config::Settings;
use crate::error::{ConfigurationError, PerceptionError};
use crate::utils::path::get_images_dir;
use capture_cache::CaptureCache;
use cues::{Cue, Cues, MotionCue, FISH_NAME_REGION};
use motion::MotionDetector;
use ocr::TextReader;
use regions::{Region, RegionCatalog};
use screen_service::CaptureProvider;
use templates::{
    ColorMode, Template, TemplateFile, TemplateStore, KNOWN_TEMPLATES, REQUIRED_TEMPLATES,
};

/// Everything the perception engine needs from the settings tree
#[derive(Debug, Clone)]
pub struct PerceptionOptions {
    pub images_dir: PathBuf,
    pub language: String,
    pub capture_ttl: Duration,
    pub default_threshold: f32,
    pub thresholds: HashMap<String, f32>,
    pub scales: Vec<f32>,
    pub color_templates: HashSet<String>,
}

impl Default for PerceptionOptions {
    fn default() -> Self {
        Self {
            images_dir: get_images_dir(),
            language: templates::DEFAULT_LANGUAGE.to_string(),
            capture_ttl: Duration::from_millis(100),
            default_threshold: 0.8,
            thresholds: HashMap::new(),
            scales: vec![0.8, 0.9, 1.0, 1.1, 1.2],
            color_templates: HashSet::new(),
        }
    }
}

impl PerceptionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            images_dir: get_images_dir(),
            language: settings.general.language.clone(),
            capture_ttl: settings.capture_ttl(),
            default_threshold: settings.general.default_threshold,
            thresholds: KNOWN_TEMPLATES
                .iter()
                .map(|name| (name.to_string(), settings.threshold_for(name)))
                .collect(),
            scales: settings.general.match_scales.clone(),
            color_templates: settings.general.color_templates.iter().cloned().collect(),
        }
    }
}

/// Perception facade over one game surface
pub struct Perception<P, K> {
    clock: K,
    catalog: RegionCatalog,
    templates: TemplateStore,
    cache: CaptureCache<P>,
    motion: MotionDetector,
    reader: TextReader,
    default_threshold: f32,
    thresholds: HashMap<String, f32>,
    scales: Vec<f32>,
    color_templates: HashSet<String>,
}

impl<P: CaptureProvider, K: Clock> Perception<P, K> {
    /// Build the engine, scaling the region catalog to the provider's current viewport
    pub fn new(provider: P, clock: K, options: PerceptionOptions) -> Result<Self, PerceptionError> {
        let viewport = provider.viewport().map_err(PerceptionError::Capture)?;
        tracing::info!(
            "[PERCEPTION] Viewport {} at ({}, {})",
            viewport,
            viewport.left,
            viewport.top
        );

        Ok(Self {
            clock,
            catalog: RegionCatalog::new(viewport),
            templates: TemplateStore::new(&options.images_dir, &options.language),
            cache: CaptureCache::new(provider, options.capture_ttl),
            motion: MotionDetector::new(),
            reader: TextReader::new(&options.language),
            default_threshold: options.default_threshold,
            thresholds: options.thresholds,
            scales: options.scales,
            color_templates: options.color_templates,
        })
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn templates_mut(&mut self) -> &mut TemplateStore {
        &mut self.templates
    }

    /// Underlying screen grabs taken so far
    pub fn capture_count(&self) -> u64 {
        self.cache.grabs()
    }

    pub fn threshold_for(&self, template: &str) -> f32 {
        self.thresholds
            .get(template)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    fn color_mode_for(&self, template: &str) -> ColorMode {
        if self.color_templates.contains(template) {
            ColorMode::Color
        } else {
            ColorMode::Grayscale
        }
    }

    /// Resolve the template and the capture it is matched against.
    /// `None` for a known template with no image on disk.
    fn prepare(
        &mut self,
        template: &str,
        region: Option<Region>,
    ) -> Result<Option<(Mat, Arc<Template>)>, PerceptionError> {
        let mode = self.color_mode_for(template);
        let loaded = self.templates.get(template, mode)?;
        let region = match region {
            Some(region) => self.catalog.check_bounds(region)?,
            None => self.catalog.get(template)?,
        };
        let Some(loaded) = loaded else {
            tracing::trace!("[PERCEPTION] '{}' has no template image", template);
            return Ok(None);
        };

        let now = self.clock.now();
        let frame = self.cache.get(region, mode, now)?;
        let image = matcher::frame_to_mat(frame)?;
        Ok(Some((image, loaded)))
    }

    /// Is the template visible in the region (default: the catalog region of the same name)?
    pub fn detect(
        &mut self,
        template: &str,
        region: Option<Region>,
        threshold: Option<f32>,
    ) -> Result<bool, PerceptionError> {
        let threshold = threshold.unwrap_or_else(|| self.threshold_for(template));
        let Some((image, templ)) = self.prepare(template, region)? else {
            return Ok(false);
        };

        let score = matcher::best_score(&image, templ.mat())?;
        tracing::trace!(
            "[PERCEPTION] '{}' score={:.3} threshold={:.2}",
            template,
            score,
            threshold
        );
        Ok(score >= threshold)
    }

    /// As [`Perception::detect`], retrying the template at each configured scale
    pub fn detect_multi_scale(
        &mut self,
        template: &str,
        region: Option<Region>,
        threshold: Option<f32>,
    ) -> Result<bool, PerceptionError> {
        let threshold = threshold.unwrap_or_else(|| self.threshold_for(template));
        let Some((image, templ)) = self.prepare(template, region)? else {
            return Ok(false);
        };

        let score =
            matcher::best_score_multi_scale(&image, templ.mat(), &self.scales, threshold)?;
        tracing::trace!(
            "[PERCEPTION] '{}' multi-scale score={:.3} threshold={:.2}",
            template,
            score,
            threshold
        );
        Ok(score >= threshold)
    }

    /// OCR one line of text from the region
    pub fn read_text(&mut self, region: Region) -> Result<String, PerceptionError> {
        let region = self.catalog.check_bounds(region)?;
        let now = self.clock.now();
        let gray = self.cache.get(region, ColorMode::Grayscale, now)?.to_gray();
        Ok(self.reader.read(&gray)?)
    }

    /// Did the region change since the previous motion query for it?
    ///
    /// Always captures a new frame: a cached one would compare a frame with itself.
    pub fn detect_motion(
        &mut self,
        region: Region,
        sensitivity: f32,
    ) -> Result<bool, PerceptionError> {
        let region = self.catalog.check_bounds(region)?;
        let now = self.clock.now();
        let gray = self.cache.refresh(region, ColorMode::Grayscale, now)?.to_gray();
        Ok(self.motion.observe(region, gray, sensitivity)?)
    }

    /// Forget the motion baseline of the region
    pub fn reset_motion_baseline(&mut self, region: Region) {
        self.motion.forget(region);
    }

    /// Re-read the client viewport. A resolution change rescales every region and drops all
    /// cached captures and motion baselines. Returns whether the resolution changed.
    pub fn refresh_viewport(&mut self) -> Result<bool, PerceptionError> {
        let viewport = self
            .cache
            .provider()
            .viewport()
            .map_err(PerceptionError::Capture)?;
        if viewport.size() == self.catalog.viewport().size() {
            return Ok(false);
        }

        tracing::info!(
            "[PERCEPTION] Viewport changed {} -> {}, rescaling regions",
            self.catalog.viewport(),
            viewport
        );
        self.catalog.rescale(viewport);
        self.cache.invalidate();
        self.motion.reset();
        Ok(true)
    }

    /// Startup check that template images exist. Images only found in the default locale and
    /// optional templates with no image at all are logged; a required template with no image
    /// is an error.
    pub fn verify_templates(&mut self) -> Result<(), PerceptionError> {
        let mut missing = Vec::new();
        for name in KNOWN_TEMPLATES {
            let mode = self.color_mode_for(name);
            if self.templates.get(name, mode)?.is_some() {
                if let TemplateFile::Fallback(path) = self.templates.locate(name) {
                    tracing::warn!(
                        "[PERCEPTION] No '{}' image for language '{}', using {:?}",
                        name,
                        self.templates.language(),
                        path
                    );
                }
                continue;
            }
            if REQUIRED_TEMPLATES.contains(&name) {
                tracing::error!("[PERCEPTION] Required template '{}' has no image", name);
                missing.push(name);
            } else {
                tracing::warn!("[PERCEPTION] '{}' has no image, its cue never fires", name);
            }
        }

        match missing.first() {
            Some(name) => Err(ConfigurationError::MissingTemplate {
                name: name.to_string(),
                language: self.templates.language().to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Startup check: every cue has a known template and every region it needs lies in the viewport
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for cue in Cue::ALL {
            if !self.templates.is_known(cue.template()) {
                return Err(ConfigurationError::UnknownTemplate(cue.template().to_string()));
            }
            self.catalog.get(cue.template())?;
        }
        for motion in [MotionCue::RodTip, MotionCue::Float] {
            self.catalog.get(motion.region())?;
        }
        self.catalog.get(FISH_NAME_REGION)?;
        for name in &self.color_templates {
            if !self.templates.is_known(name) {
                return Err(ConfigurationError::UnknownTemplate(name.clone()));
            }
        }
        self.catalog.validate()
    }
}

impl<P: CaptureProvider, K: Clock> Cues for Perception<P, K> {
    fn check(&mut self, cue: Cue) -> Result<bool, PerceptionError> {
        if cue.multi_scale() {
            self.detect_multi_scale(cue.template(), None, None)
        } else {
            self.detect(cue.template(), None, None)
        }
    }

    fn moved(&mut self, cue: MotionCue, sensitivity: f32) -> Result<bool, PerceptionError> {
        let region = self.catalog.get(cue.region())?;
        self.detect_motion(region, sensitivity)
    }

    fn reset_motion(&mut self, cue: MotionCue) {
        // validate() guarantees the region exists
        if let Ok(region) = self.catalog.get(cue.region()) {
            self.reset_motion_baseline(region);
        }
    }

    fn fish_name(&mut self) -> Result<String, PerceptionError> {
        let region = self.catalog.get(FISH_NAME_REGION)?;
        self.read_text(region)
    }

    fn revalidate(&mut self) -> Result<(), PerceptionError> {
        self.refresh_viewport()?;
        self.validate()?;
        Ok(())
    }
}
