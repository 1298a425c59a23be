//! Keep/release policy for landed fish

use super::base::{Catch, Decision};
use crate::config::SessionSettings;
use crate::utils::spelling::normalize_fish_name;

/// Decides whether a landed fish goes into the keepnet
#[derive(Debug, Clone, Default)]
pub struct CatchPolicy {
    keep_tagged_only: bool,
    release_names: Vec<String>,
}

impl CatchPolicy {
    pub fn new(keep_tagged_only: bool, release_names: &[String]) -> Self {
        Self {
            keep_tagged_only,
            release_names: release_names
                .iter()
                .map(|name| normalize_fish_name(name))
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings.keep_tagged_only, &settings.release_names)
    }

    /// Decide for a fish whose name is already normalised
    pub fn decide(&self, name: &str, tagged: bool) -> Decision {
        if self.keep_tagged_only && !tagged {
            return Decision::Release;
        }
        if self.release_names.iter().any(|n| n == name) {
            return Decision::Release;
        }
        Decision::Keep
    }

    /// Normalise the OCR text of the fish-name banner and decide
    pub fn judge(&self, raw_name: &str, tagged: bool) -> Catch {
        let name = normalize_fish_name(raw_name);
        let decision = self.decide(&name, tagged);
        Catch::new(name, tagged, decision)
    }

    /// Number of names on the release list
    pub fn count(&self) -> usize {
        self.release_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_keeps_everything() {
        let policy = CatchPolicy::default();
        assert_eq!(policy.decide("pike", false), Decision::Keep);
        assert_eq!(policy.count(), 0);
    }

    #[test]
    fn test_release_list_is_normalised() {
        let policy = CatchPolicy::new(false, &["Common Roach".to_string(), "  ".to_string()]);
        assert_eq!(policy.count(), 1);

        let fish = policy.judge("C0mmon  Roach.", false);
        assert_eq!(fish.name, "common_roach");
        assert_eq!(fish.decision, Decision::Release);
        assert_eq!(policy.judge("Pike", false).decision, Decision::Keep);
    }

    #[test]
    fn test_keep_tagged_only() {
        let policy = CatchPolicy::new(true, &[]);
        assert_eq!(policy.decide("pike", false), Decision::Release);
        assert_eq!(policy.decide("pike", true), Decision::Keep);
    }
}
