//! Frame-difference motion detection for rod tips and floats

use std::collections::HashMap;

use image::GrayImage;
use opencv::core::{absdiff, mean, no_array, Mat};

use super::matcher::gray_image_to_mat;
use super::regions::Region;

/// Mean absolute pixel difference between two equally sized images, in grey levels
pub fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> opencv::Result<f64> {
    let a = gray_image_to_mat(a)?;
    let b = gray_image_to_mat(b)?;
    let mut diff = Mat::default();
    absdiff(&a, &b, &mut diff)?;
    let m = mean(&diff, &no_array())?;
    Ok(m[0])
}

/// Remembers the last capture per region and compares the next one against it
#[derive(Default)]
pub struct MotionDetector {
    baselines: HashMap<Region, GrayImage>,
}

impl MotionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `current` with the previous capture of `region`, then make it the new baseline.
    ///
    /// The first observation of a region only records a baseline and reports no motion. So does
    /// a size change, which happens after the viewport is rescaled.
    pub fn observe(
        &mut self,
        region: Region,
        current: GrayImage,
        sensitivity: f32,
    ) -> opencv::Result<bool> {
        let moved = match self.baselines.get(&region) {
            Some(previous) if previous.dimensions() == current.dimensions() => {
                let diff = mean_abs_diff(previous, &current)?;
                tracing::trace!(
                    "[MOTION] {:?} mean diff {:.2} (sensitivity {:.2})",
                    region,
                    diff,
                    sensitivity
                );
                diff > sensitivity as f64
            }
            _ => false,
        };
        self.baselines.insert(region, current);
        Ok(moved)
    }

    /// Forget the baseline of one region, so its next observation starts over
    pub fn forget(&mut self, region: Region) {
        self.baselines.remove(&region);
    }

    /// Forget every baseline
    pub fn reset(&mut self) {
        self.baselines.clear();
    }
}
