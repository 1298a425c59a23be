//! Screen capture of the game window's client area

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use image::RgbaImage;
use screenshots::Screen;

use super::regions::{Region, Viewport};
use crate::window::get_client_box;

/// Source of raw pixels for regions of the game surface
pub trait CaptureProvider {
    /// Client-area origin and size of the game surface
    fn viewport(&self) -> Result<Viewport>;

    /// Pixels for a region given relative to the client-area origin
    fn grab(&self, region: Region) -> Result<RgbaImage>;
}

/// Captures through the `screenshots` crate, re-locating the game window on every grab
pub struct ScreenService {
    game_title: String,
    retries: u32,
    retry_delay: Duration,
}

impl ScreenService {
    pub fn new(game_title: impl Into<String>) -> Self {
        Self {
            game_title: game_title.into(),
            retries: 3,
            retry_delay: Duration::from_millis(100),
        }
    }

    /// Take a screenshot safely with retries
    fn safe_capture(&self, left: i32, top: i32, width: u32, height: u32) -> Result<RgbaImage> {
        let mut last_error = None;
        for i in 0..self.retries {
            match capture_area(left, top, width, height) {
                Ok(img) => return Ok(img),
                Err(e) => {
                    tracing::warn!(
                        "Screenshot failed: {:#}. Retrying ({}/{})",
                        e,
                        i + 1,
                        self.retries
                    );
                    last_error = Some(e);
                    thread::sleep(self.retry_delay);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("screen capture not attempted")))
    }
}

impl CaptureProvider for ScreenService {
    fn viewport(&self) -> Result<Viewport> {
        get_client_box(&self.game_title)
            .with_context(|| format!("game window '{}' not found", self.game_title))
    }

    fn grab(&self, region: Region) -> Result<RgbaImage> {
        let viewport = self.viewport()?;
        self.safe_capture(
            viewport.left + region.x as i32,
            viewport.top + region.y as i32,
            region.width,
            region.height,
        )
    }
}

/// Capture a rectangle of the primary screen
fn capture_area(left: i32, top: i32, width: u32, height: u32) -> Result<RgbaImage> {
    let screens = Screen::all().context("Failed to get screens")?;
    let screen = screens.first().context("No screens found")?;

    let image = screen
        .capture_area(left, top, width, height)
        .context("Failed to capture area")?;

    RgbaImage::from_raw(image.width(), image.height(), image.to_vec())
        .context("Failed to create image from raw data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_service_defaults() {
        let service = ScreenService::new("Russian Fishing 4");
        assert_eq!(service.game_title, "Russian Fishing 4");
        assert_eq!(service.retries, 3);
    }
}
