//! Friction brake control loop
//!
//! While a fish is on, the brake is tightened one step each time the adjustment delay elapses,
//! up to `max`. Each fight starts again from `initial`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::FrictionSettings;

/// How quickly the brake is tightened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    /// Minimum time between two adjustments
    pub fn delay(&self) -> Duration {
        match self {
            Sensitivity::Low => Duration::from_millis(1500),
            Sensitivity::Medium => Duration::from_millis(1000),
            Sensitivity::High => Duration::from_millis(500),
        }
    }
}

/// Brake setting bounded to `[min, max]`
#[derive(Debug, Clone)]
pub struct FrictionBrake {
    setting: i32,
    min: i32,
    max: i32,
    initial: i32,
    delay: Duration,
    last_adjusted: Option<Instant>,
}

impl FrictionBrake {
    pub fn new(initial: i32, min: i32, max: i32, delay: Duration) -> Self {
        let initial = initial.clamp(min, max);
        Self {
            setting: initial,
            min,
            max,
            initial,
            delay,
            last_adjusted: None,
        }
    }

    pub fn from_settings(settings: &FrictionSettings) -> Self {
        Self::new(settings.initial, settings.min, settings.max, settings.delay())
    }

    /// Reset to the initial setting and take `now` as the adjustment baseline
    pub fn start_fight(&mut self, now: Instant) {
        self.setting = self.initial;
        self.last_adjusted = Some(now);
        tracing::debug!("[FRICTION] Fight started, brake at {}", self.setting);
    }

    /// One control step. Returns the new setting when the brake was tightened.
    ///
    /// The first call without a baseline only records `now`.
    pub fn adjust(&mut self, now: Instant) -> Option<i32> {
        let Some(last) = self.last_adjusted else {
            self.last_adjusted = Some(now);
            return None;
        };

        if now.saturating_duration_since(last) <= self.delay {
            return None;
        }
        self.last_adjusted = Some(now);

        if self.setting >= self.max {
            return None;
        }
        self.setting += 1;
        tracing::debug!("[FRICTION] Brake tightened to {}", self.setting);
        Some(self.setting)
    }

    pub fn current_brake(&self) -> i32 {
        self.setting
    }

    /// Force the setting, clamped to `[min, max]`
    pub fn set_brake(&mut self, value: i32) {
        self.setting = value.clamp(self.min, self.max);
    }

    pub fn initial(&self) -> i32 {
        self.initial
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Drop the baseline so the next `adjust` only re-arms the loop
    pub fn clear_baseline(&mut self) {
        self.last_adjusted = None;
    }
}
