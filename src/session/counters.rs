//! Per-session counters

use serde::Serialize;

/// Monotonic tallies for one session, owned by the session machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub kept: u32,
    pub released: u32,
    pub stimulant_uses: u32,
    pub missed_checks: u32,
    pub casts: u32,
}

impl std::fmt::Display for Counters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "casts={} kept={} released={} stimulants={} missed_checks={}",
            self.casts, self.kept, self.released, self.stimulant_uses, self.missed_checks
        )
    }
}
