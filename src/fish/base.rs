//! Base types for landed fish

use serde::{Deserialize, Serialize};

/// What to do with a landed fish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Keep,
    Release,
}

impl Decision {
    /// Get display value
    pub fn value(&self) -> &'static str {
        match self {
            Decision::Keep => "kept",
            Decision::Release => "released",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A fish handled by the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catch {
    /// Normalised name, empty when the banner could not be read
    pub name: String,
    pub tagged: bool,
    pub decision: Decision,
}

impl Catch {
    pub fn new(name: impl Into<String>, tagged: bool, decision: Decision) -> Self {
        Self {
            name: name.into(),
            tagged,
            decision,
        }
    }
}

impl std::fmt::Display for Catch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.name.is_empty() {
            "unknown fish"
        } else {
            &self.name
        };
        if self.tagged {
            write!(f, "{} (tagged, {})", name, self.decision)
        } else {
            write!(f, "{} ({})", name, self.decision)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_value() {
        assert_eq!(Decision::Keep.value(), "kept");
        assert_eq!(Decision::Release.value(), "released");
    }

    #[test]
    fn test_catch_display() {
        let fish = Catch::new("common_roach", false, Decision::Keep);
        assert_eq!(format!("{}", fish), "common_roach (kept)");

        let fish = Catch::new("", true, Decision::Release);
        assert_eq!(format!("{}", fish), "unknown fish (tagged, released)");
    }
}
