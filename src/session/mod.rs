//! Fishing session: state machine, modes, friction loop and the tick runner

pub mod counters;
pub mod friction;
pub mod machine;
pub mod mode;
pub mod runner;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use counters::Counters;
pub use friction::{FrictionBrake, Sensitivity};
pub use machine::SessionMachine;
pub use mode::FishingMode;
pub use runner::{record_startup_abort, run_session, wait_for_surface, StartupAbort};
pub use state::{Disposition, SessionResult, SessionState, Signals, Transition, TransitionReason};
