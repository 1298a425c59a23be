//! Session thread loop: one tick, then sleep for the tick interval

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::counters::Counters;
use super::machine::SessionMachine;
use super::mode::FishingMode;
use super::state::{Disposition, SessionResult, Signals};
use crate::clock::Clock;
use crate::error::PerceptionError;
use crate::input::InputActuator;
use crate::log_main::ResultSink;
use crate::perception::cues::Cues;
use crate::utils::bot_state::SessionControl;

/// Why a session ended before its first tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupAbort {
    Stopped,
    Failed(String),
}

/// Retry `attempt` until the game surface is ready, a stop is requested, or a configuration
/// error shows that retrying cannot help
pub fn wait_for_surface<T, F>(
    control: &SessionControl,
    retry_interval: Duration,
    mut attempt: F,
) -> Result<T, StartupAbort>
where
    F: FnMut() -> Result<T, PerceptionError>,
{
    let mut failures = 0u32;
    loop {
        if control.stop_requested() {
            return Err(StartupAbort::Stopped);
        }
        match attempt() {
            Ok(ready) => {
                if failures > 0 {
                    tracing::info!("[INIT] Game surface found after {} attempts", failures + 1);
                }
                return Ok(ready);
            }
            Err(e @ PerceptionError::Configuration(_)) => {
                return Err(StartupAbort::Failed(e.to_string()));
            }
            Err(e) => {
                if failures % 10 == 0 {
                    tracing::warn!("[INIT] Game surface not ready, retrying: {}", e);
                }
                failures += 1;
                control.set_activity("Waiting for the game window");
                if !retry_interval.is_zero() {
                    thread::sleep(retry_interval);
                }
            }
        }
    }
}

/// Result record for a session that never ticked, sent to `sink`
pub fn record_startup_abort<S: ResultSink + ?Sized>(
    sink: &mut S,
    mode: &FishingMode,
    started_at: DateTime<Utc>,
    abort: StartupAbort,
) -> SessionResult {
    let disposition = match abort {
        StartupAbort::Stopped => {
            tracing::info!("[SESSION] Stopped before the session started");
            Disposition::Stopped
        }
        StartupAbort::Failed(cause) => {
            tracing::error!("[SESSION] Could not start: {}", cause);
            Disposition::Failed(cause)
        }
    };
    let elapsed = Utc::now().signed_duration_since(started_at);
    let result = SessionResult {
        started_at,
        elapsed_secs: elapsed.num_milliseconds().max(0) as f64 / 1000.0,
        mode: mode.name().to_string(),
        counters: Counters::default(),
        disposition,
    };
    sink.record_session(&result);
    result
}

/// Drive `machine` until it finishes. Control flags are sampled once per tick and mapped into
/// machine signals; catches and the final result go to `sink`.
pub fn run_session<C, A, K, S>(
    machine: &mut SessionMachine<C, A, K>,
    control: &SessionControl,
    tick_interval: Duration,
    sink: &mut S,
) -> Option<SessionResult>
where
    C: Cues,
    A: InputActuator,
    K: Clock,
    S: ResultSink + ?Sized,
{
    tracing::info!(
        "[SESSION] Starting {} session, tick every {:?}",
        machine.mode(),
        tick_interval
    );
    let mut reported = 0;

    while !machine.is_finished() {
        if control.take_friction_reset() {
            machine.reset_friction();
        }

        let signals = Signals {
            stop: control.stop_requested(),
            paused: control.is_paused(),
        };
        machine.tick(signals);
        control.set_activity(machine.state().activity());

        for catch in &machine.catches()[reported..] {
            sink.record_catch(catch);
        }
        reported = machine.catches().len();

        if !machine.is_finished() && !tick_interval.is_zero() {
            thread::sleep(tick_interval);
        }
    }

    tracing::info!("[SESSION] Transition history:");
    for transition in machine.history() {
        tracing::info!("[SESSION]   {}", transition);
    }
    if let Some(cause) = machine.last_error() {
        tracing::info!("[SESSION] Last error: {}", cause);
    }

    let result = machine.result()?;
    sink.record_session(&result);
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Settings;
    use crate::log_main::MemorySink;
    use crate::perception::cues::Cue;
    use crate::error::ConfigurationError;
    use crate::session::state::SessionState;
    use crate::session::testing::{FakeActuator, FakeCues, Screen};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn machine(
        settings: &Settings,
        screen: Rc<RefCell<Screen>>,
    ) -> SessionMachine<FakeCues, FakeActuator, Arc<ManualClock>> {
        SessionMachine::new(
            FakeCues(screen),
            FakeActuator(Rc::new(RefCell::new(Vec::new()))),
            Arc::new(ManualClock::new()),
            settings,
        )
    }

    #[test]
    fn test_runs_until_keepnet_is_full() {
        let mut settings = Settings::default();
        settings.session.keepnet_limit = 1;
        let screen = Rc::new(RefCell::new(Screen::default()));
        {
            let mut s = screen.borrow_mut();
            s.visible.insert(Cue::CastConfirmed);
            s.visible.insert(Cue::FishHooked);
            s.visible.insert(Cue::FishCaptured);
            s.fish_name = "Perch".into();
        }
        let mut machine = machine(&settings, screen);
        let control = SessionControl::new();
        let mut sink = MemorySink::default();

        let result = run_session(&mut machine, &control, Duration::ZERO, &mut sink).unwrap();
        assert_eq!(result.counters.kept, 1);
        assert!(matches!(result.disposition, Disposition::CapacityReached(_)));
        assert_eq!(sink.catches.len(), 1);
        assert_eq!(sink.catches[0].name, "perch");
        assert_eq!(sink.sessions.len(), 1);
        assert_eq!(control.activity(), SessionState::Finished.activity());
    }

    #[test]
    fn test_stop_flag_ends_session() {
        let settings = Settings::default();
        let screen = Rc::new(RefCell::new(Screen::default()));
        let mut machine = machine(&settings, screen.clone());
        let control = SessionControl::new();
        control.request_stop();
        let mut sink = MemorySink::default();

        let result = run_session(&mut machine, &control, Duration::ZERO, &mut sink).unwrap();
        assert_eq!(result.disposition, Disposition::Stopped);
        assert_eq!(machine.ticks(), 1);
        assert_eq!(screen.borrow().queries, 0);
        assert!(sink.catches.is_empty());
    }

    #[test]
    fn test_friction_reset_request_is_applied() {
        let settings = Settings::default();
        let screen = Rc::new(RefCell::new(Screen::default()));
        screen.borrow_mut().misconfigured = true;
        let mut machine = machine(&settings, screen);
        let control = SessionControl::new();
        control.request_friction_reset();
        let mut sink = MemorySink::default();

        let result = run_session(&mut machine, &control, Duration::ZERO, &mut sink).unwrap();
        assert!(matches!(result.disposition, Disposition::Failed(_)));
        assert!(!control.take_friction_reset());
        assert_eq!(machine.brake().current_brake(), 28);
    }

    #[test]
    fn test_wait_for_surface_retries_capture_failures() {
        let control = SessionControl::new();
        let mut calls = 0;
        let ready = wait_for_surface(&control, Duration::ZERO, || {
            calls += 1;
            if calls < 3 {
                Err(PerceptionError::Capture(anyhow::anyhow!("window not found")))
            } else {
                Ok("surface")
            }
        });
        assert_eq!(ready, Ok("surface"));
        assert_eq!(calls, 3);
        assert_eq!(control.activity(), "Waiting for the game window");
    }

    #[test]
    fn test_wait_for_surface_gives_up_on_stop_or_bad_config() {
        let control = SessionControl::new();
        let ready: Result<(), _> = wait_for_surface(&control, Duration::ZERO, || {
            Err(ConfigurationError::UnknownRegion("float".into()).into())
        });
        assert!(matches!(ready, Err(StartupAbort::Failed(cause)) if cause.contains("float")));

        let mut calls = 0;
        let ready: Result<(), _> = wait_for_surface(&control, Duration::ZERO, || {
            calls += 1;
            control.request_stop();
            Err(PerceptionError::Capture(anyhow::anyhow!("window not found")))
        });
        assert_eq!(ready, Err(StartupAbort::Stopped));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_startup_abort_is_recorded() {
        let mut sink = MemorySink::default();
        let mode = FishingMode::Telescopic {
            sensitivity: 5.0,
            drift_timeout: 30.0,
        };
        let result = record_startup_abort(
            &mut sink,
            &mode,
            Utc::now(),
            StartupAbort::Failed("game window not found".into()),
        );

        assert_eq!(
            result.disposition,
            Disposition::Failed("game window not found".into())
        );
        assert_eq!(result.counters, Counters::default());
        assert_eq!(result.mode, "telescopic");
        assert_eq!(sink.sessions.len(), 1);
        assert_eq!(sink.sessions[0].disposition, result.disposition);
    }
}
