//! Fishing modes and their per-mode parameters

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Mean grey-level change that counts as a rod-tip twitch in bottom mode
pub const ROD_TIP_SENSITIVITY: f32 = 4.0;

/// Motion used while jigging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JigMotion {
    /// Raise the rod with the jig binding
    #[default]
    Lift,
    /// Pump the line with the elevate binding
    Elevate,
}

/// Fishing technique for one session. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FishingMode {
    /// Spinning rod with a steady retrieve
    #[default]
    Spin,
    /// Spinning rod with stop-and-go retrieve
    SpinWithPause { reel_burst: f64, pause: f64 },
    /// Feeder/bottom rods watched for rod-tip movement, rotating through `rods`
    Bottom {
        check_delay: f64,
        check_miss_limit: u32,
        rods: Vec<String>,
    },
    /// Jigging: periodic lifts while the bait sinks
    Pirk {
        jig_interval: f64,
        jig_duration: f64,
        #[serde(default)]
        motion: JigMotion,
    },
    /// Float rod without a reel
    Telescopic { sensitivity: f32, drift_timeout: f64 },
    /// Float rod with a reel
    Bolognese { sensitivity: f32, drift_timeout: f64 },
}

/// How the line comes back in after a bite timeout or an escape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetrieveStyle {
    /// Reel held until the retrieval cue
    Steady,
    /// Reel held for `burst`, released for `pause`, repeated
    StopAndGo { burst: Duration, pause: Duration },
    /// One pull of the rod
    SinglePull,
}

impl FishingMode {
    pub fn name(&self) -> &'static str {
        match self {
            FishingMode::Spin => "spin",
            FishingMode::SpinWithPause { .. } => "spin_with_pause",
            FishingMode::Bottom { .. } => "bottom",
            FishingMode::Pirk { .. } => "pirk",
            FishingMode::Telescopic { .. } => "telescopic",
            FishingMode::Bolognese { .. } => "bolognese",
        }
    }

    /// Bite wait limit; float modes use their own drift timeout
    pub fn bite_timeout(&self, session_default: Duration) -> Duration {
        match self {
            FishingMode::Telescopic { drift_timeout, .. }
            | FishingMode::Bolognese { drift_timeout, .. } => {
                Duration::from_secs_f64(*drift_timeout)
            }
            FishingMode::Spin
            | FishingMode::SpinWithPause { .. }
            | FishingMode::Bottom { .. }
            | FishingMode::Pirk { .. } => session_default,
        }
    }

    pub fn retrieve_style(&self) -> RetrieveStyle {
        match self {
            FishingMode::SpinWithPause { reel_burst, pause } => RetrieveStyle::StopAndGo {
                burst: Duration::from_secs_f64(*reel_burst),
                pause: Duration::from_secs_f64(*pause),
            },
            FishingMode::Telescopic { .. } => RetrieveStyle::SinglePull,
            FishingMode::Spin
            | FishingMode::Bottom { .. }
            | FishingMode::Pirk { .. }
            | FishingMode::Bolognese { .. } => RetrieveStyle::Steady,
        }
    }

    /// Telescopic rods have no reel to hold during a fight
    pub fn has_reel(&self) -> bool {
        !matches!(self, FishingMode::Telescopic { .. })
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigurationError::InvalidSetting(format!(
                    "mode.{} must be positive, got {}",
                    name, value
                )))
            }
        };

        match self {
            FishingMode::Spin => Ok(()),
            FishingMode::SpinWithPause { reel_burst, pause } => {
                positive("reel_burst", *reel_burst)?;
                positive("pause", *pause)
            }
            FishingMode::Bottom {
                check_delay,
                check_miss_limit,
                rods,
            } => {
                positive("check_delay", *check_delay)?;
                if *check_miss_limit == 0 {
                    return Err(ConfigurationError::InvalidSetting(
                        "mode.check_miss_limit must be at least 1".into(),
                    ));
                }
                if rods.is_empty() {
                    return Err(ConfigurationError::InvalidSetting(
                        "bottom mode needs at least one rod binding".into(),
                    ));
                }
                Ok(())
            }
            FishingMode::Pirk {
                jig_interval,
                jig_duration,
                ..
            } => {
                positive("jig_interval", *jig_interval)?;
                positive("jig_duration", *jig_duration)
            }
            FishingMode::Telescopic {
                sensitivity,
                drift_timeout,
            }
            | FishingMode::Bolognese {
                sensitivity,
                drift_timeout,
            } => {
                positive("sensitivity", *sensitivity as f64)?;
                positive("drift_timeout", *drift_timeout)
            }
        }
    }
}

impl std::fmt::Display for FishingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_spin() {
        assert_eq!(FishingMode::default(), FishingMode::Spin);
    }

    #[test]
    fn test_tagged_json() {
        let mode: FishingMode = serde_json::from_str(
            r#"{"mode": "pirk", "jig_interval": 3.0, "jig_duration": 0.5, "motion": "elevate"}"#,
        )
        .unwrap();
        assert_eq!(
            mode,
            FishingMode::Pirk {
                jig_interval: 3.0,
                jig_duration: 0.5,
                motion: JigMotion::Elevate
            }
        );

        let mode: FishingMode = serde_json::from_str(r#"{"mode": "spin"}"#).unwrap();
        assert_eq!(mode.to_string(), "spin");
    }

    #[test]
    fn test_float_modes_use_drift_timeout() {
        let default = Duration::from_secs(120);
        let float = FishingMode::Bolognese {
            sensitivity: 6.0,
            drift_timeout: 45.0,
        };
        assert_eq!(float.bite_timeout(default), Duration::from_secs(45));
        assert_eq!(FishingMode::Spin.bite_timeout(default), default);
    }

    #[test]
    fn test_retrieve_styles() {
        assert_eq!(FishingMode::Spin.retrieve_style(), RetrieveStyle::Steady);
        assert_eq!(
            FishingMode::Telescopic {
                sensitivity: 5.0,
                drift_timeout: 30.0
            }
            .retrieve_style(),
            RetrieveStyle::SinglePull
        );
        assert!(matches!(
            FishingMode::SpinWithPause {
                reel_burst: 1.0,
                pause: 0.5
            }
            .retrieve_style(),
            RetrieveStyle::StopAndGo { .. }
        ));
    }

    #[test]
    fn test_validation() {
        assert!(FishingMode::Bottom {
            check_delay: 2.0,
            check_miss_limit: 0,
            rods: vec!["1".into()],
        }
        .validate()
        .is_err());
        assert!(FishingMode::Bottom {
            check_delay: 2.0,
            check_miss_limit: 3,
            rods: vec![],
        }
        .validate()
        .is_err());
        assert!(FishingMode::Telescopic {
            sensitivity: 0.0,
            drift_timeout: 30.0
        }
        .validate()
        .is_err());
        assert!(FishingMode::SpinWithPause {
            reel_burst: 1.0,
            pause: 0.5
        }
        .validate()
        .is_ok());
    }
}
