//! Per-tick memoised captures
//!
//! One decision tick asks several questions about the same regions. A capture is reused for
//! `ttl` after it was taken; only time or a viewport change invalidates it, never a failed match.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use image::{DynamicImage, GrayImage, RgbImage};

use super::regions::Region;
use super::screen_service::CaptureProvider;
use super::templates::ColorMode;
use crate::error::PerceptionError;

/// Captured pixels in the layout a template needs
#[derive(Debug, Clone)]
pub enum Frame {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Frame {
    pub fn color_mode(&self) -> ColorMode {
        match self {
            Frame::Gray(_) => ColorMode::Grayscale,
            Frame::Color(_) => ColorMode::Color,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Frame::Gray(img) => img.dimensions(),
            Frame::Color(img) => img.dimensions(),
        }
    }

    /// Grayscale view, converting color frames on the fly
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Frame::Gray(img) => img.clone(),
            Frame::Color(img) => image::imageops::grayscale(img),
        }
    }
}

struct Entry {
    taken_at: Instant,
    frame: Frame,
}

/// Capture cache keyed by region and color mode
pub struct CaptureCache<P> {
    provider: P,
    ttl: Duration,
    entries: HashMap<(Region, ColorMode), Entry>,
    grabs: u64,
}

impl<P: CaptureProvider> CaptureCache<P> {
    pub fn new(provider: P, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entries: HashMap::new(),
            grabs: 0,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of underlying captures taken so far
    pub fn grabs(&self) -> u64 {
        self.grabs
    }

    /// Cached frame for the region, capturing again once the previous one is older than the TTL
    pub fn get(
        &mut self,
        region: Region,
        mode: ColorMode,
        now: Instant,
    ) -> Result<&Frame, PerceptionError> {
        let key = (region, mode);
        let ttl = self.ttl;
        let fresh = self
            .entries
            .get(&key)
            .is_some_and(|entry| now.saturating_duration_since(entry.taken_at) < ttl);
        if !fresh {
            self.entries
                .retain(|_, entry| now.saturating_duration_since(entry.taken_at) < ttl);
        }

        let entry = match self.entries.entry(key) {
            MapEntry::Occupied(slot) => slot.into_mut(),
            MapEntry::Vacant(slot) => {
                let raw = self
                    .provider
                    .grab(region)
                    .map_err(PerceptionError::Capture)?;
                self.grabs += 1;

                let raw = DynamicImage::ImageRgba8(raw);
                let frame = match mode {
                    ColorMode::Grayscale => Frame::Gray(raw.to_luma8()),
                    ColorMode::Color => Frame::Color(raw.to_rgb8()),
                };
                slot.insert(Entry { taken_at: now, frame })
            }
        };
        Ok(&entry.frame)
    }

    /// Capture the region now, replacing any cached frame for it
    pub fn refresh(
        &mut self,
        region: Region,
        mode: ColorMode,
        now: Instant,
    ) -> Result<&Frame, PerceptionError> {
        self.entries.remove(&(region, mode));
        self.get(region, mode, now)
    }

    /// Drop every cached capture
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }
}
