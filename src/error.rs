//! Error taxonomy shared by the perception engine and the session machine

use thiserror::Error;

use crate::perception::regions::{Region, Viewport};

/// Fatal setup problems. These abort startup and are never retried.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{name}' has no image for language '{language}' or the default")]
    MissingTemplate { name: String, language: String },

    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    #[error("region {region:?} lies outside the {viewport} viewport")]
    RegionOutOfBounds { region: Region, viewport: Viewport },

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures raised while turning the screen into facts.
#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("screen capture failed: {0:#}")]
    Capture(anyhow::Error),

    #[error("image processing failed: {0}")]
    Vision(#[from] opencv::Error),
}

/// Failures reported by the input actuator.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("unknown key binding '{0}'")]
    UnknownBinding(String),

    #[error("input backend failed: {0}")]
    Backend(String),
}

/// Anything a collaborator can throw during one session tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Perception(#[from] PerceptionError),

    #[error(transparent)]
    Input(#[from] InputError),
}

impl TickError {
    /// Configuration problems surfacing mid-session are fatal rather than recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TickError::Perception(PerceptionError::Configuration(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_fatal() {
        let err: TickError =
            PerceptionError::from(ConfigurationError::UnknownTemplate("spool".into())).into();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "unknown template 'spool'");
    }

    #[test]
    fn test_collaborator_failures_are_recoverable() {
        let err: TickError = InputError::Backend("device busy".into()).into();
        assert!(!err.is_fatal());

        let err: TickError =
            PerceptionError::Capture(anyhow::anyhow!("no screens found")).into();
        assert!(!err.is_fatal());
    }
}
