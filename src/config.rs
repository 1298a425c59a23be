//! Session settings
//!
//! Settings live in `config/settings.json` under the data directory. Every field has a default,
//! so a partial file only overrides what it names. The tree is validated once at startup and
//! treated as frozen for the rest of the session.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::input::Binding;
use crate::perception::templates::KNOWN_TEMPLATES;
use crate::session::friction::Sensitivity;
use crate::session::mode::FishingMode;
use crate::utils::path::get_data_dir;

/// Per-cue confidence thresholds used when the settings file does not name one.
pub static DEFAULT_THRESHOLDS: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("cast_indicator", 0.8);
    m.insert("fish_hooked", 0.8);
    m.insert("fish_captured", 0.8);
    m.insert("line_snagged", 0.8);
    m.insert("retrieval_done", 0.8);
    m.insert("disconnected", 0.9);
    m.insert("energy_low", 0.85);
    m.insert("tag", 0.9);
    m
});

/// Top-level settings tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub keys: KeySettings,
    /// Per-cue threshold overrides, keyed by template name
    pub thresholds: HashMap<String, f32>,
    pub session: SessionSettings,
    pub mode: FishingMode,
    pub friction: FrictionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub game_title: String,
    /// Template locale folder under `images/`
    pub language: String,
    pub tick_interval_ms: u64,
    pub capture_ttl_ms: u64,
    pub default_threshold: f32,
    pub match_scales: Vec<f32>,
    /// Templates matched in color instead of grayscale
    pub color_templates: Vec<String>,
    pub max_recovery_attempts: u32,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            game_title: "Russian Fishing 4".to_string(),
            language: "en".to_string(),
            tick_interval_ms: 100,
            capture_ttl_ms: 100,
            default_threshold: 0.8,
            match_scales: vec![0.8, 0.9, 1.0, 1.1, 1.2],
            color_templates: Vec::new(),
            max_recovery_attempts: 1,
        }
    }
}

/// Key and mouse bindings, as accepted by [`Binding::parse`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    pub start: String,
    pub stop: String,
    pub pause: String,
    pub reset_friction: String,
    pub cast: String,
    pub reel: String,
    pub lift: String,
    pub jig: String,
    pub elevate: String,
    pub keep: String,
    pub release: String,
    pub stimulant: String,
    pub gear_ratio: String,
    pub brake_up: String,
    pub quit_game: String,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            start: "F9".to_string(),
            stop: "F10".to_string(),
            pause: "F11".to_string(),
            reset_friction: "R".to_string(),
            cast: "LMB".to_string(),
            reel: "LMB".to_string(),
            lift: "RMB".to_string(),
            jig: "RMB".to_string(),
            elevate: "SPACE".to_string(),
            keep: "SPACE".to_string(),
            release: "BACKSPACE".to_string(),
            stimulant: "4".to_string(),
            gear_ratio: "G".to_string(),
            brake_up: "UP".to_string(),
            quit_game: "ESC".to_string(),
        }
    }
}

/// What to do once the keepnet is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepnetFullAction {
    /// Stop the session and leave the game running
    #[default]
    Stop,
    /// Stop the session and close the game client
    QuitGame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulantSettings {
    pub enabled: bool,
    pub cooldown_secs: f64,
    pub max_per_fight: u32,
}

impl Default for StimulantSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cooldown_secs: 60.0,
            max_per_fight: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub keepnet_limit: u32,
    /// Fish already in the keepnet when the session starts
    pub fishes_in_keepnet: u32,
    pub keepnet_full_action: KeepnetFullAction,
    pub keep_tagged_only: bool,
    /// Fish names that are always released
    pub release_names: Vec<String>,
    pub cast_power_secs: f64,
    pub cast_timeout_secs: f64,
    pub bite_timeout_secs: f64,
    pub fight_timeout_secs: f64,
    pub retrieval_timeout_secs: f64,
    pub lift: bool,
    pub gear_ratio_switch: bool,
    pub stimulant: StimulantSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            keepnet_limit: 100,
            fishes_in_keepnet: 0,
            keepnet_full_action: KeepnetFullAction::Stop,
            keep_tagged_only: false,
            release_names: Vec::new(),
            cast_power_secs: 1.0,
            cast_timeout_secs: 8.0,
            bite_timeout_secs: 120.0,
            fight_timeout_secs: 300.0,
            retrieval_timeout_secs: 60.0,
            lift: true,
            gear_ratio_switch: false,
            stimulant: StimulantSettings::default(),
        }
    }
}

impl SessionSettings {
    pub fn cast_power(&self) -> Duration {
        Duration::from_secs_f64(self.cast_power_secs)
    }

    pub fn cast_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.cast_timeout_secs)
    }

    pub fn bite_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.bite_timeout_secs)
    }

    pub fn fight_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.fight_timeout_secs)
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.retrieval_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrictionSettings {
    pub enabled: bool,
    pub initial: i32,
    pub min: i32,
    pub max: i32,
    pub sensitivity: Sensitivity,
    /// Explicit adjustment delay in seconds, overriding the sensitivity preset
    pub delay_secs: Option<f64>,
}

impl Default for FrictionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            initial: 28,
            min: 0,
            max: 30,
            sensitivity: Sensitivity::Medium,
            delay_secs: None,
        }
    }
}

impl FrictionSettings {
    pub fn delay(&self) -> Duration {
        match self.delay_secs {
            Some(secs) => Duration::from_secs_f64(secs),
            None => self.sensitivity.delay(),
        }
    }
}

/// Default settings file location
pub fn get_settings_path() -> PathBuf {
    get_data_dir().join("config").join("settings.json")
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::load_from(&get_settings_path())
    }

    /// Load and validate settings from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigurationError> {
        let settings = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str::<Settings>(&content)?
        } else {
            tracing::info!("[CONFIG] No settings at {:?}, using defaults", path);
            Settings::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Threshold for a cue, falling back to the built-in table and then the general default
    pub fn threshold_for(&self, cue: &str) -> f32 {
        self.thresholds
            .get(cue)
            .copied()
            .or_else(|| DEFAULT_THRESHOLDS.get(cue).copied())
            .unwrap_or(self.general.default_threshold)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.general.tick_interval_ms)
    }

    pub fn capture_ttl(&self) -> Duration {
        Duration::from_millis(self.general.capture_ttl_ms)
    }

    /// Check the invariants the session relies on
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |msg: String| Err(ConfigurationError::InvalidSetting(msg));

        let general = &self.general;
        if general.tick_interval_ms == 0 {
            return invalid("general.tick_interval_ms must be positive".into());
        }
        if !(0.0..=1.0).contains(&general.default_threshold) {
            return invalid(format!(
                "general.default_threshold {} is outside [0, 1]",
                general.default_threshold
            ));
        }
        if general.match_scales.is_empty() || general.match_scales.iter().any(|s| *s <= 0.0) {
            return invalid("general.match_scales must be non-empty and positive".into());
        }
        for name in &general.color_templates {
            if !KNOWN_TEMPLATES.contains(&name.as_str()) {
                return Err(ConfigurationError::UnknownTemplate(name.clone()));
            }
        }
        for (cue, threshold) in &self.thresholds {
            if !KNOWN_TEMPLATES.contains(&cue.as_str()) {
                return Err(ConfigurationError::UnknownTemplate(cue.clone()));
            }
            if !(0.0..=1.0).contains(threshold) {
                return invalid(format!("threshold for '{}' is outside [0, 1]", cue));
            }
        }

        let session = &self.session;
        if session.keepnet_limit == 0 {
            return invalid("session.keepnet_limit must be positive".into());
        }
        if session.fishes_in_keepnet >= session.keepnet_limit {
            return invalid(format!(
                "session.fishes_in_keepnet {} must be below keepnet_limit {}",
                session.fishes_in_keepnet, session.keepnet_limit
            ));
        }
        let timings = [
            ("cast_power_secs", session.cast_power_secs),
            ("cast_timeout_secs", session.cast_timeout_secs),
            ("bite_timeout_secs", session.bite_timeout_secs),
            ("fight_timeout_secs", session.fight_timeout_secs),
            ("retrieval_timeout_secs", session.retrieval_timeout_secs),
            ("stimulant.cooldown_secs", session.stimulant.cooldown_secs),
        ];
        for (name, secs) in timings {
            if !secs.is_finite() || secs < 0.0 {
                return invalid(format!("session.{} must be a non-negative number", name));
            }
        }

        let friction = &self.friction;
        if !(friction.min <= friction.initial && friction.initial <= friction.max) {
            return invalid(format!(
                "friction must satisfy min <= initial <= max, got {} / {} / {}",
                friction.min, friction.initial, friction.max
            ));
        }
        if let Some(delay) = friction.delay_secs {
            if !delay.is_finite() || delay <= 0.0 {
                return invalid("friction.delay_secs must be positive".into());
            }
        }

        self.mode.validate()?;
        self.validate_bindings()
    }

    fn validate_bindings(&self) -> Result<(), ConfigurationError> {
        let keys = &self.keys;
        let mut bindings = vec![
            ("cast", &keys.cast),
            ("reel", &keys.reel),
            ("lift", &keys.lift),
            ("jig", &keys.jig),
            ("elevate", &keys.elevate),
            ("keep", &keys.keep),
            ("release", &keys.release),
            ("stimulant", &keys.stimulant),
            ("gear_ratio", &keys.gear_ratio),
            ("brake_up", &keys.brake_up),
            ("quit_game", &keys.quit_game),
        ];
        if let FishingMode::Bottom { rods, .. } = &self.mode {
            bindings.extend(rods.iter().map(|rod| ("bottom rod", rod)));
        }

        for (name, value) in bindings {
            if Binding::parse(value).is_none() {
                return Err(ConfigurationError::InvalidSetting(format!(
                    "unknown {} binding '{}'",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
