//! Session states, transition records and the end-of-session result

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::counters::Counters;
use crate::config::KeepnetFullAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Casting,
    Waiting,
    Fighting,
    Retrieving,
    HandlingCatch,
    Paused,
    Error,
    Finished,
}

impl SessionState {
    /// Short text for the status line
    pub fn activity(&self) -> &'static str {
        match self {
            SessionState::Idle => "Getting ready to cast",
            SessionState::Casting => "Casting",
            SessionState::Waiting => "Waiting for a bite",
            SessionState::Fighting => "Fighting a fish",
            SessionState::Retrieving => "Retrieving the line",
            SessionState::HandlingCatch => "Handling the catch",
            SessionState::Paused => "Paused",
            SessionState::Error => "Recovering from an error",
            SessionState::Finished => "Finished",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Why a transition happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionReason {
    Cast,
    CastConfirmed,
    CastTimeout,
    Bite,
    /// No bite within the bite timeout
    Timeout,
    LineSnagged,
    FishCaptured,
    FishEscaped,
    FightTimeout,
    Retrieved,
    RetrievalTimeout,
    CatchHandled,
    KeepnetFull,
    Disconnected,
    Failure(String),
    Recovered,
    RecoveryExhausted,
    Paused,
    Resumed,
    StopRequested,
}

impl std::fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionReason::Cast => write!(f, "cast"),
            TransitionReason::CastConfirmed => write!(f, "cast confirmed"),
            TransitionReason::CastTimeout => write!(f, "cast timeout"),
            TransitionReason::Bite => write!(f, "bite"),
            TransitionReason::Timeout => write!(f, "timeout"),
            TransitionReason::LineSnagged => write!(f, "line snagged"),
            TransitionReason::FishCaptured => write!(f, "fish captured"),
            TransitionReason::FishEscaped => write!(f, "fish escaped"),
            TransitionReason::FightTimeout => write!(f, "fight timeout"),
            TransitionReason::Retrieved => write!(f, "retrieved"),
            TransitionReason::RetrievalTimeout => write!(f, "retrieval timeout"),
            TransitionReason::CatchHandled => write!(f, "catch handled"),
            TransitionReason::KeepnetFull => write!(f, "keepnet full"),
            TransitionReason::Disconnected => write!(f, "disconnected"),
            TransitionReason::Failure(cause) => write!(f, "failure: {}", cause),
            TransitionReason::Recovered => write!(f, "recovered"),
            TransitionReason::RecoveryExhausted => write!(f, "recovery exhausted"),
            TransitionReason::Paused => write!(f, "paused"),
            TransitionReason::Resumed => write!(f, "resumed"),
            TransitionReason::StopRequested => write!(f, "stop requested"),
        }
    }
}

/// One entry of the transition history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    /// Time since the session started
    pub elapsed: Duration,
    pub reason: TransitionReason,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:>8.1}s] {} -> {} ({})",
            self.elapsed.as_secs_f64(),
            self.from,
            self.to,
            self.reason
        )
    }
}

/// How the session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Disposition {
    Stopped,
    CapacityReached(KeepnetFullAction),
    Failed(String),
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Stopped => write!(f, "stopped"),
            Disposition::CapacityReached(action) => {
                write!(f, "keepnet full ({:?})", action)
            }
            Disposition::Failed(cause) => write!(f, "failed: {}", cause),
        }
    }
}

/// External signals sampled at the top of each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub stop: bool,
    pub paused: bool,
}

/// Flat end-of-session record
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub mode: String,
    #[serde(flatten)]
    pub counters: Counters,
    pub disposition: Disposition,
}
