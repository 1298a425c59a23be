//! Region catalog: named screen rectangles, defined at 1920x1080 and scaled to the game window

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Resolution the built-in regions are defined at
pub const BASE_WIDTH: u32 = 1920;
pub const BASE_HEIGHT: u32 = 1080;

/// Built-in regions at base resolution: `(name, x, y, width, height)`
const DEFAULT_REGIONS: [(&str, u32, u32, u32, u32); 11] = [
    // spool / line counter in the bottom-right HUD
    ("cast_indicator", 1650, 960, 220, 90),
    ("retrieval_done", 1650, 960, 220, 90),
    ("fish_hooked", 860, 900, 200, 120),
    ("fish_captured", 560, 150, 800, 220),
    ("line_snagged", 760, 560, 400, 120),
    ("disconnected", 660, 400, 600, 280),
    ("energy_low", 40, 960, 280, 90),
    ("tag", 1180, 180, 160, 120),
    ("fish_name", 600, 150, 720, 70),
    ("rod_tip", 900, 300, 160, 260),
    ("float", 880, 480, 160, 160),
];

/// Rectangle relative to the client-area origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Non-empty and fully inside the viewport
    pub fn fits(&self, viewport: &Viewport) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= viewport.width as u64
            && self.bottom() <= viewport.height as u64
    }

    /// Linear rescale from one resolution to another
    pub fn scaled(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        let sx = to.0 as f64 / from.0 as f64;
        let sy = to.1 as f64 / from.1 as f64;
        Self {
            x: (self.x as f64 * sx).round() as u32,
            y: (self.y as f64 * sy).round() as u32,
            width: ((self.width as f64 * sx).round() as u32).max(1),
            height: ((self.height as f64 * sy).round() as u32).max(1),
        }
    }
}

/// Client area of the game window: screen origin plus size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    /// Viewport at the base resolution, anchored at the screen origin
    pub fn base() -> Self {
        Self::new(0, 0, BASE_WIDTH, BASE_HEIGHT)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Named regions scaled to the active viewport
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    viewport: Viewport,
    base: HashMap<String, Region>,
    scaled: HashMap<String, Region>,
}

impl RegionCatalog {
    /// Catalog with the built-in regions
    pub fn new(viewport: Viewport) -> Self {
        let base = DEFAULT_REGIONS
            .iter()
            .map(|(name, x, y, w, h)| (name.to_string(), Region::new(*x, *y, *w, *h)))
            .collect();
        Self::with_regions(base, viewport)
    }

    /// Catalog with caller-supplied base-resolution regions
    pub fn with_regions(base: HashMap<String, Region>, viewport: Viewport) -> Self {
        let mut catalog = Self {
            viewport,
            base,
            scaled: HashMap::new(),
        };
        catalog.rescale(viewport);
        catalog
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scaled.contains_key(name)
    }

    /// Scaled region by name
    pub fn get(&self, name: &str) -> Result<Region, ConfigurationError> {
        self.scaled
            .get(name)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownRegion(name.to_string()))
    }

    /// Reject regions that are empty or leave the viewport
    pub fn check_bounds(&self, region: Region) -> Result<Region, ConfigurationError> {
        if region.fits(&self.viewport) {
            Ok(region)
        } else {
            Err(ConfigurationError::RegionOutOfBounds {
                region,
                viewport: self.viewport,
            })
        }
    }

    /// Re-derive every region for a new viewport
    pub fn rescale(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let from = (BASE_WIDTH, BASE_HEIGHT);
        self.scaled = self
            .base
            .iter()
            .map(|(name, region)| (name.clone(), region.scaled(from, viewport.size())))
            .collect();
    }

    /// Every scaled region must lie in the viewport
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for region in self.scaled.values() {
            self.check_bounds(*region)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_regions_fit_base_viewport() {
        let catalog = RegionCatalog::new(Viewport::base());
        assert!(catalog.validate().is_ok());
        assert_eq!(
            catalog.get("fish_name").unwrap(),
            Region::new(600, 150, 720, 70)
        );
    }

    #[test]
    fn test_regions_scale_linearly() {
        let catalog = RegionCatalog::new(Viewport::new(100, 50, 2560, 1440));
        let region = catalog.get("fish_name").unwrap();
        assert_eq!(region, Region::new(800, 200, 960, 93));
        assert!(catalog.validate().is_ok());

        let small = RegionCatalog::new(Viewport::new(0, 0, 1600, 900));
        assert!(small.validate().is_ok());
    }

    #[test]
    fn test_unknown_region() {
        let catalog = RegionCatalog::new(Viewport::base());
        assert!(matches!(
            catalog.get("bobber"),
            Err(ConfigurationError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_region_rejected() {
        let catalog = RegionCatalog::new(Viewport::base());
        assert!(catalog.check_bounds(Region::new(1900, 0, 40, 10)).is_err());
        assert!(catalog.check_bounds(Region::new(0, 0, 0, 10)).is_err());
        assert!(catalog.check_bounds(Region::new(0, 0, 1920, 1080)).is_ok());
    }

    #[test]
    fn test_rescale_follows_viewport() {
        let mut catalog = RegionCatalog::new(Viewport::base());
        catalog.rescale(Viewport::new(0, 0, 960, 540));
        assert_eq!(catalog.get("rod_tip").unwrap(), Region::new(450, 150, 80, 130));
        assert_eq!(catalog.viewport().to_string(), "960x540");
    }
}
