//! Session state machine
//!
//! Each [`SessionMachine::tick`] samples the external signals, asks the cue source only what the
//! current state needs, and then either acts through the input actuator or moves to another
//! state. The caller owns scheduling. Nothing here sleeps except blocking key holds.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::counters::Counters;
use super::friction::FrictionBrake;
use super::mode::{FishingMode, JigMotion, RetrieveStyle, ROD_TIP_SENSITIVITY};
use super::state::{
    Disposition, SessionResult, SessionState, Signals, Transition, TransitionReason,
};
use crate::clock::Clock;
use crate::config::{KeySettings, SessionSettings, Settings};
use crate::error::{PerceptionError, TickError};
use crate::fish::{Catch, CatchPolicy, Decision};
use crate::input::{Binding, InputActuator};
use crate::perception::cues::{Cue, Cues, MotionCue};

/// Key bindings the machine presses, parsed once from validated settings
#[derive(Debug, Clone)]
pub struct Bindings {
    pub cast: Binding,
    pub reel: Binding,
    pub lift: Binding,
    pub jig: Binding,
    pub elevate: Binding,
    pub keep: Binding,
    pub release: Binding,
    pub stimulant: Binding,
    pub gear_ratio: Binding,
    pub brake_up: Binding,
    /// Bottom-mode rods in rotation order
    pub rods: Vec<Binding>,
}

impl Bindings {
    pub fn from_settings(keys: &KeySettings, mode: &FishingMode) -> Self {
        let rods = match mode {
            FishingMode::Bottom { rods, .. } => {
                rods.iter().map(|r| Binding::from_validated(r)).collect()
            }
            _ => Vec::new(),
        };
        Self {
            cast: Binding::from_validated(&keys.cast),
            reel: Binding::from_validated(&keys.reel),
            lift: Binding::from_validated(&keys.lift),
            jig: Binding::from_validated(&keys.jig),
            elevate: Binding::from_validated(&keys.elevate),
            keep: Binding::from_validated(&keys.keep),
            release: Binding::from_validated(&keys.release),
            stimulant: Binding::from_validated(&keys.stimulant),
            gear_ratio: Binding::from_validated(&keys.gear_ratio),
            brake_up: Binding::from_validated(&keys.brake_up),
            rods,
        }
    }
}

/// How a bite is recognised while Waiting
#[derive(Debug, Clone, Copy)]
enum BiteWait {
    Hooked,
    Jig {
        interval: Duration,
        duration: Duration,
        motion: JigMotion,
    },
    RodTip {
        check_delay: Duration,
        miss_limit: u32,
    },
    Float {
        sensitivity: f32,
    },
}

#[derive(Debug, Clone, Copy)]
enum ReelPhase {
    Reeling(Instant),
    Pausing(Instant),
}

type Step = Result<Option<(SessionState, TransitionReason)>, TickError>;

pub struct SessionMachine<C, A, K> {
    cues: C,
    actuator: A,
    clock: K,

    mode: FishingMode,
    session: SessionSettings,
    friction_enabled: bool,
    bindings: Bindings,
    policy: CatchPolicy,
    max_recovery_attempts: u32,

    state: SessionState,
    entered_at: Instant,
    paused_from: Option<SessionState>,
    started: Instant,
    started_at: DateTime<Utc>,
    ticks: u64,
    counters: Counters,
    history: Vec<Transition>,
    catches: Vec<Catch>,
    last_error: Option<String>,
    disposition: Option<Disposition>,
    recovery_attempts: u32,
    held: Vec<Binding>,

    brake: FrictionBrake,
    was_hooked: bool,
    fight_stimulants: u32,
    last_stimulant: Option<Instant>,

    consecutive_misses: u32,
    rod_index: usize,
    last_check: Instant,
    last_jig: Instant,
    reel_phase: Option<ReelPhase>,
}

impl<C: Cues, A: InputActuator, K: Clock> SessionMachine<C, A, K> {
    /// New session in Idle. `settings` must already be validated.
    pub fn new(cues: C, actuator: A, clock: K, settings: &Settings) -> Self {
        let now = clock.now();
        Self {
            cues,
            actuator,
            clock,
            mode: settings.mode.clone(),
            session: settings.session.clone(),
            friction_enabled: settings.friction.enabled,
            bindings: Bindings::from_settings(&settings.keys, &settings.mode),
            policy: CatchPolicy::from_settings(&settings.session),
            max_recovery_attempts: settings.general.max_recovery_attempts,
            state: SessionState::Idle,
            entered_at: now,
            paused_from: None,
            started: now,
            started_at: Utc::now(),
            ticks: 0,
            counters: Counters::default(),
            history: Vec::new(),
            catches: Vec::new(),
            last_error: None,
            disposition: None,
            recovery_attempts: 0,
            held: Vec::new(),
            brake: FrictionBrake::from_settings(&settings.friction),
            was_hooked: false,
            fight_stimulants: 0,
            last_stimulant: None,
            consecutive_misses: 0,
            rod_index: 0,
            last_check: now,
            last_jig: now,
            reel_phase: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> &FishingMode {
        &self.mode
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub fn catches(&self) -> &[Catch] {
        &self.catches
    }

    /// Cause of the most recent Error transition
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn disposition(&self) -> Option<&Disposition> {
        self.disposition.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn brake(&self) -> &FrictionBrake {
        &self.brake
    }

    /// Put the brake back to its initial setting, e.g. after a reset hotkey
    pub fn reset_friction(&mut self) {
        self.brake.set_brake(self.brake.initial());
        tracing::info!("[FRICTION] Brake reset to {}", self.brake.current_brake());
    }

    /// Bottom-mode misses since the last bite or rod switch
    pub fn consecutive_misses(&self) -> u32 {
        self.consecutive_misses
    }

    /// End-of-session record, once Finished
    pub fn result(&self) -> Option<SessionResult> {
        let disposition = self.disposition.clone()?;
        let elapsed = self
            .history
            .last()
            .map(|t| t.elapsed)
            .unwrap_or_default();
        Some(SessionResult {
            started_at: self.started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            mode: self.mode.name().to_string(),
            counters: self.counters,
            disposition,
        })
    }

    /// Advance the session by one step. Returns the last transition taken, if any.
    pub fn tick(&mut self, signals: Signals) -> Option<Transition> {
        if self.is_finished() {
            return None;
        }
        self.ticks += 1;
        let recorded = self.history.len();

        if signals.stop {
            self.finish(Disposition::Stopped, TransitionReason::StopRequested);
        } else if signals.paused && self.state != SessionState::Paused {
            self.pause();
        } else if !signals.paused && self.state == SessionState::Paused {
            let outcome = self.resume();
            if let Err(e) = outcome {
                self.fail(e);
            }
        } else {
            match self.state {
                SessionState::Paused | SessionState::Finished => {}
                SessionState::Error => self.recover(),
                _ => {
                    let outcome = self.step();
                    self.settle(outcome);
                }
            }
        }

        if self.history.len() > recorded {
            self.history.last().cloned()
        } else {
            None
        }
    }

    fn step(&mut self) -> Step {
        let now = self.clock.now();
        if self.cues.check(Cue::Disconnected)? {
            return Ok(Some((SessionState::Error, TransitionReason::Disconnected)));
        }

        let in_state = now.saturating_duration_since(self.entered_at);
        match self.state {
            SessionState::Idle => Ok(Some((SessionState::Casting, TransitionReason::Cast))),
            SessionState::Casting => self.step_casting(in_state),
            SessionState::Waiting => self.step_waiting(now, in_state),
            SessionState::Fighting => self.step_fighting(now, in_state),
            SessionState::Retrieving => self.step_retrieving(now, in_state),
            SessionState::HandlingCatch => self.step_handling_catch(),
            SessionState::Paused | SessionState::Error | SessionState::Finished => Ok(None),
        }
    }

    fn step_casting(&mut self, in_state: Duration) -> Step {
        if self.cues.check(Cue::CastConfirmed)? {
            return Ok(Some((SessionState::Waiting, TransitionReason::CastConfirmed)));
        }
        if in_state >= self.session.cast_timeout() {
            return Ok(Some((SessionState::Error, TransitionReason::CastTimeout)));
        }
        Ok(None)
    }

    fn bite_wait(&self) -> BiteWait {
        match &self.mode {
            FishingMode::Spin | FishingMode::SpinWithPause { .. } => BiteWait::Hooked,
            FishingMode::Pirk {
                jig_interval,
                jig_duration,
                motion,
            } => BiteWait::Jig {
                interval: Duration::from_secs_f64(*jig_interval),
                duration: Duration::from_secs_f64(*jig_duration),
                motion: *motion,
            },
            FishingMode::Bottom {
                check_delay,
                check_miss_limit,
                ..
            } => BiteWait::RodTip {
                check_delay: Duration::from_secs_f64(*check_delay),
                miss_limit: *check_miss_limit,
            },
            FishingMode::Telescopic { sensitivity, .. }
            | FishingMode::Bolognese { sensitivity, .. } => BiteWait::Float {
                sensitivity: *sensitivity,
            },
        }
    }

    /// Motion region the current mode watches for bites
    fn watched_motion(&self) -> Option<MotionCue> {
        match self.bite_wait() {
            BiteWait::RodTip { .. } => Some(MotionCue::RodTip),
            BiteWait::Float { .. } => Some(MotionCue::Float),
            BiteWait::Hooked | BiteWait::Jig { .. } => None,
        }
    }

    /// A new wait compares against its own first frame, never one from an earlier cast
    fn start_watching(&mut self) {
        if let Some(cue) = self.watched_motion() {
            self.cues.reset_motion(cue);
        }
    }

    fn step_waiting(&mut self, now: Instant, in_state: Duration) -> Step {
        if self.cues.check(Cue::LineSnagged)? {
            return Ok(Some((SessionState::Error, TransitionReason::LineSnagged)));
        }

        let bite = match self.bite_wait() {
            BiteWait::Hooked => self.cues.check(Cue::FishHooked)?,
            BiteWait::Jig {
                interval,
                duration,
                motion,
            } => {
                let hooked = self.cues.check(Cue::FishHooked)?;
                if !hooked && now.saturating_duration_since(self.last_jig) >= interval {
                    self.jig(duration, motion)?;
                }
                hooked
            }
            BiteWait::RodTip {
                check_delay,
                miss_limit,
            } => self.poll_rod_tip(now, check_delay, miss_limit)?,
            BiteWait::Float { sensitivity } => self.cues.moved(MotionCue::Float, sensitivity)?,
        };
        if bite {
            return Ok(Some((SessionState::Fighting, TransitionReason::Bite)));
        }

        if in_state >= self.mode.bite_timeout(self.session.bite_timeout()) {
            return Ok(Some((SessionState::Retrieving, TransitionReason::Timeout)));
        }
        Ok(None)
    }

    fn jig(&mut self, duration: Duration, motion: JigMotion) -> Result<(), TickError> {
        let binding = match motion {
            JigMotion::Lift => &self.bindings.jig,
            JigMotion::Elevate => &self.bindings.elevate,
        };
        tracing::debug!("[SESSION] Jig {:?} for {:?}", motion, duration);
        self.actuator.hold(binding, duration)?;
        self.last_jig = self.clock.now();
        Ok(())
    }

    /// One bottom-mode check, at most every `check_delay`. Rotates to the next rod after
    /// `miss_limit` consecutive misses.
    fn poll_rod_tip(
        &mut self,
        now: Instant,
        check_delay: Duration,
        miss_limit: u32,
    ) -> Result<bool, TickError> {
        if now.saturating_duration_since(self.last_check) < check_delay {
            return Ok(false);
        }
        self.last_check = now;

        if self.cues.moved(MotionCue::RodTip, ROD_TIP_SENSITIVITY)? {
            self.consecutive_misses = 0;
            return Ok(true);
        }

        self.counters.missed_checks += 1;
        self.consecutive_misses += 1;
        tracing::debug!(
            "[SESSION] Rod tip still ({}/{})",
            self.consecutive_misses,
            miss_limit
        );

        if self.consecutive_misses >= miss_limit {
            self.consecutive_misses = 0;
            if !self.bindings.rods.is_empty() {
                let rod = &self.bindings.rods[self.rod_index % self.bindings.rods.len()];
                tracing::info!("[SESSION] {} missed checks, switching to rod {}", miss_limit, rod);
                self.actuator.press(rod)?;
                self.rod_index = (self.rod_index + 1) % self.bindings.rods.len();
                self.cues.reset_motion(MotionCue::RodTip);
            }
        }
        Ok(false)
    }

    fn step_fighting(&mut self, now: Instant, in_state: Duration) -> Step {
        if in_state >= self.session.fight_timeout() {
            return Ok(Some((SessionState::Error, TransitionReason::FightTimeout)));
        }

        let hooked = self.cues.check(Cue::FishHooked)?;
        if self.was_hooked && self.cues.check(Cue::FishCaptured)? {
            return Ok(Some((
                SessionState::HandlingCatch,
                TransitionReason::FishCaptured,
            )));
        }
        if self.was_hooked && !hooked {
            return Ok(Some((SessionState::Retrieving, TransitionReason::FishEscaped)));
        }
        self.was_hooked = hooked;

        if self.friction_enabled {
            if let Some(setting) = self.brake.adjust(now) {
                tracing::debug!("[FRICTION] Brake up to {}", setting);
                self.actuator.press(&self.bindings.brake_up)?;
            }
        }
        self.use_stimulant(now)?;
        Ok(None)
    }

    fn use_stimulant(&mut self, now: Instant) -> Result<(), TickError> {
        let stimulant = &self.session.stimulant;
        if !stimulant.enabled || self.fight_stimulants >= stimulant.max_per_fight {
            return Ok(());
        }
        let cooldown = Duration::from_secs_f64(stimulant.cooldown_secs);
        if let Some(last) = self.last_stimulant {
            if now.saturating_duration_since(last) < cooldown {
                return Ok(());
            }
        }
        if !self.cues.check(Cue::EnergyLow)? {
            return Ok(());
        }

        self.actuator.press(&self.bindings.stimulant)?;
        self.fight_stimulants += 1;
        self.counters.stimulant_uses += 1;
        self.last_stimulant = Some(now);
        tracing::info!(
            "[SESSION] Energy low, stimulant used ({} this fight)",
            self.fight_stimulants
        );
        Ok(())
    }

    fn step_retrieving(&mut self, now: Instant, in_state: Duration) -> Step {
        if self.cues.check(Cue::RetrievalComplete)? {
            return Ok(Some((SessionState::Idle, TransitionReason::Retrieved)));
        }

        if in_state >= self.session.retrieval_timeout() {
            tracing::warn!(
                "[SESSION] Retrieval not confirmed after {:.0}s, assuming the line is in",
                in_state.as_secs_f64()
            );
            if self.session.gear_ratio_switch {
                self.actuator.press(&self.bindings.gear_ratio)?;
            }
            return Ok(Some((SessionState::Idle, TransitionReason::RetrievalTimeout)));
        }

        if let RetrieveStyle::StopAndGo { burst, pause } = self.mode.retrieve_style() {
            self.cycle_reel(now, burst, pause)?;
        }
        Ok(None)
    }

    fn cycle_reel(&mut self, now: Instant, burst: Duration, pause: Duration) -> Result<(), TickError> {
        match self.reel_phase {
            Some(ReelPhase::Reeling(since)) if now.saturating_duration_since(since) >= burst => {
                let reel = self.bindings.reel.clone();
                self.release_binding(&reel)?;
                self.reel_phase = Some(ReelPhase::Pausing(now));
            }
            Some(ReelPhase::Pausing(since)) if now.saturating_duration_since(since) >= pause => {
                let reel = self.bindings.reel.clone();
                self.hold_down(reel)?;
                self.reel_phase = Some(ReelPhase::Reeling(now));
            }
            _ => {}
        }
        Ok(())
    }

    fn step_handling_catch(&mut self) -> Step {
        let raw_name = self.cues.fish_name()?;
        let tagged = self.cues.check(Cue::FishTagged)?;
        let catch = self.policy.judge(&raw_name, tagged);

        let key = match catch.decision {
            Decision::Keep => &self.bindings.keep,
            Decision::Release => &self.bindings.release,
        };
        self.actuator.press(key)?;
        match catch.decision {
            Decision::Keep => self.counters.kept += 1,
            Decision::Release => self.counters.released += 1,
        }
        tracing::info!("[SESSION] Landed {}", catch);
        self.catches.push(catch);

        let in_keepnet = self.session.fishes_in_keepnet + self.counters.kept;
        if in_keepnet >= self.session.keepnet_limit {
            tracing::info!(
                "[SESSION] Keepnet full ({}/{})",
                in_keepnet,
                self.session.keepnet_limit
            );
            self.finish(
                Disposition::CapacityReached(self.session.keepnet_full_action),
                TransitionReason::KeepnetFull,
            );
            return Ok(None);
        }
        Ok(Some((SessionState::Idle, TransitionReason::CatchHandled)))
    }

    fn settle(&mut self, outcome: Step) {
        let result = match outcome {
            Ok(Some((to, reason))) => self.transition(to, reason),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.fail(e);
        }
    }

    /// Collaborator failure: configuration problems end the session, anything else goes to Error
    fn fail(&mut self, error: TickError) {
        let cause = error.to_string();
        if error.is_fatal() {
            tracing::error!(
                "[SESSION] Fatal error in {} at tick {}: {}",
                self.state,
                self.ticks,
                cause
            );
            self.last_error = Some(cause.clone());
            self.finish(Disposition::Failed(cause.clone()), TransitionReason::Failure(cause));
            return;
        }

        tracing::error!(
            "[SESSION] {} failed at tick {}: {}",
            self.state,
            self.ticks,
            cause
        );
        self.enter(SessionState::Error, TransitionReason::Failure(cause));
    }

    fn recover(&mut self) {
        if self.recovery_attempts >= self.max_recovery_attempts {
            self.give_up();
            return;
        }
        self.recovery_attempts += 1;
        tracing::info!(
            "[SESSION] Recovery attempt {}/{}",
            self.recovery_attempts,
            self.max_recovery_attempts
        );

        match self.cues.revalidate() {
            Ok(()) => self.enter(SessionState::Idle, TransitionReason::Recovered),
            Err(e @ PerceptionError::Configuration(_)) => self.fail(e.into()),
            Err(e) => {
                tracing::warn!("[SESSION] Recovery failed: {}", e);
                if self.recovery_attempts >= self.max_recovery_attempts {
                    self.give_up();
                }
            }
        }
    }

    fn give_up(&mut self) {
        let cause = self
            .last_error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        self.finish(Disposition::Failed(cause), TransitionReason::RecoveryExhausted);
    }

    fn pause(&mut self) {
        self.paused_from = Some(self.state);
        self.enter(SessionState::Paused, TransitionReason::Paused);
    }

    /// Back to the state that was paused, with its timers restarted
    fn resume(&mut self) -> Result<(), TickError> {
        let previous = self.paused_from.take().unwrap_or(SessionState::Idle);
        self.enter(previous, TransitionReason::Resumed);

        let now = self.entered_at;
        match previous {
            SessionState::Waiting => {
                self.last_check = now;
                self.last_jig = now;
                self.start_watching();
            }
            SessionState::Fighting => {
                self.brake.clear_baseline();
                self.hold_fight_inputs()?;
            }
            SessionState::Retrieving => self.hold_retrieve_inputs(now, false)?,
            _ => {}
        }
        Ok(())
    }

    /// Record a transition and switch state, running entry actions
    fn transition(&mut self, to: SessionState, reason: TransitionReason) -> Result<(), TickError> {
        self.enter(to, reason);
        let now = self.entered_at;

        match to {
            SessionState::Casting => {
                self.counters.casts += 1;
                tracing::debug!("[SESSION] Cast #{}", self.counters.casts);
                self.actuator
                    .hold(&self.bindings.cast, self.session.cast_power())?;
                self.entered_at = self.clock.now();
            }
            SessionState::Waiting => {
                self.recovery_attempts = 0;
                self.consecutive_misses = 0;
                self.last_check = now;
                self.last_jig = now;
                self.start_watching();
            }
            SessionState::Fighting => {
                self.brake.start_fight(now);
                self.was_hooked = false;
                self.fight_stimulants = 0;
                self.hold_fight_inputs()?;
            }
            SessionState::Retrieving => self.hold_retrieve_inputs(now, true)?,
            SessionState::Idle
            | SessionState::HandlingCatch
            | SessionState::Paused
            | SessionState::Error
            | SessionState::Finished => {}
        }
        Ok(())
    }

    /// Bookkeeping shared by every state change: release held inputs, record, switch
    fn enter(&mut self, to: SessionState, reason: TransitionReason) {
        let now = self.clock.now();
        self.release_held();
        if to == SessionState::Error {
            self.last_error = Some(reason.to_string());
        }

        let transition = Transition {
            from: self.state,
            to,
            elapsed: now.saturating_duration_since(self.started),
            reason,
        };
        if to == SessionState::Error {
            tracing::warn!("[SESSION] {}", transition);
        } else {
            tracing::info!("[SESSION] {}", transition);
        }
        self.history.push(transition);
        self.state = to;
        self.entered_at = now;
    }

    fn finish(&mut self, disposition: Disposition, reason: TransitionReason) {
        self.paused_from = None;
        self.enter(SessionState::Finished, reason);
        tracing::info!(
            "[SESSION] Finished ({}) after {} ticks: {}",
            disposition,
            self.ticks,
            self.counters
        );
        self.disposition = Some(disposition);
    }

    fn hold_fight_inputs(&mut self) -> Result<(), TickError> {
        if self.mode.has_reel() {
            self.hold_down(self.bindings.reel.clone())?;
        }
        if self.session.lift || !self.mode.has_reel() {
            self.hold_down(self.bindings.lift.clone())?;
        }
        Ok(())
    }

    /// `first` is false when resuming, so a single pull is not repeated
    fn hold_retrieve_inputs(&mut self, now: Instant, first: bool) -> Result<(), TickError> {
        match self.mode.retrieve_style() {
            RetrieveStyle::Steady => self.hold_down(self.bindings.reel.clone())?,
            RetrieveStyle::StopAndGo { .. } => {
                self.hold_down(self.bindings.reel.clone())?;
                self.reel_phase = Some(ReelPhase::Reeling(now));
            }
            RetrieveStyle::SinglePull => {
                if first {
                    self.actuator.press(&self.bindings.reel)?;
                }
            }
        }
        Ok(())
    }

    fn hold_down(&mut self, binding: Binding) -> Result<(), TickError> {
        if self.held.contains(&binding) {
            return Ok(());
        }
        self.actuator.key_down(&binding)?;
        self.held.push(binding);
        Ok(())
    }

    fn release_binding(&mut self, binding: &Binding) -> Result<(), TickError> {
        if let Some(pos) = self.held.iter().position(|b| b == binding) {
            self.held.remove(pos);
            self.actuator.release(binding)?;
        }
        Ok(())
    }

    /// Best-effort release of everything held; failures are only logged
    fn release_held(&mut self) {
        for binding in self.held.drain(..) {
            if let Err(e) = self.actuator.release(&binding) {
                tracing::warn!("[SESSION] Failed to release {}: {}", binding, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::KeepnetFullAction;
    use crate::session::testing::{FakeActuator, FakeCues, Screen};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    struct Harness {
        machine: SessionMachine<FakeCues, FakeActuator, Arc<ManualClock>>,
        screen: Rc<RefCell<Screen>>,
        inputs: Rc<RefCell<Vec<String>>>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn new(settings: Settings) -> Self {
            let screen = Rc::new(RefCell::new(Screen::default()));
            let inputs = Rc::new(RefCell::new(Vec::new()));
            let clock = Arc::new(ManualClock::new());
            let machine = SessionMachine::new(
                FakeCues(screen.clone()),
                FakeActuator(inputs.clone()),
                clock.clone(),
                &settings,
            );
            Self {
                machine,
                screen,
                inputs,
                clock,
            }
        }

        fn tick(&mut self) -> Option<Transition> {
            self.machine.tick(Signals::default())
        }

        fn tick_after(&mut self, secs: f64) -> Option<Transition> {
            self.clock.advance_secs(secs);
            self.tick()
        }

        fn show(&self, cue: Cue) {
            self.screen.borrow_mut().visible.insert(cue);
        }

        fn hide(&self, cue: Cue) {
            self.screen.borrow_mut().visible.remove(&cue);
        }

        fn pressed(&self, what: &str) -> usize {
            self.inputs.borrow().iter().filter(|i| *i == what).count()
        }

        fn states(&self) -> Vec<SessionState> {
            self.machine.history().iter().map(|t| t.to).collect()
        }

        /// Idle -> Casting -> Waiting
        fn reach_waiting(&mut self) {
            self.show(Cue::CastConfirmed);
            self.tick();
            self.tick();
            self.hide(Cue::CastConfirmed);
            assert_eq!(self.machine.state(), SessionState::Waiting);
        }

        /// Waiting -> Fighting with the fish hooked for one tick
        fn reach_fighting(&mut self) {
            self.reach_waiting();
            self.show(Cue::FishHooked);
            self.tick();
            self.tick();
            assert_eq!(self.machine.state(), SessionState::Fighting);
        }
    }

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn test_line_cast_reaches_fighting_in_three_ticks() {
        let mut h = Harness::new(settings());
        h.show(Cue::CastConfirmed);
        h.show(Cue::FishHooked);

        let first = h.tick().unwrap();
        assert_eq!((first.from, first.to), (SessionState::Idle, SessionState::Casting));
        h.tick();
        h.tick();

        assert_eq!(
            h.states(),
            vec![
                SessionState::Casting,
                SessionState::Waiting,
                SessionState::Fighting
            ]
        );
        assert_eq!(h.machine.counters().casts, 1);
        assert_eq!(h.pressed("hold LMB"), 1);
        assert_eq!(h.machine.ticks(), 3);
    }

    #[test]
    fn test_bite_timeout_retrieves_exactly_once() {
        let mut h = Harness::new(settings());
        h.reach_waiting();

        assert!(h.tick_after(119.0).is_none());
        let transition = h.tick_after(2.0).unwrap();
        assert_eq!(transition.to, SessionState::Retrieving);
        assert_eq!(transition.reason.to_string(), "timeout");

        h.tick_after(1.0);
        h.tick_after(1.0);
        let retrievals = h
            .machine
            .history()
            .iter()
            .filter(|t| t.to == SessionState::Retrieving)
            .count();
        assert_eq!(retrievals, 1);
        assert!(!h.states().contains(&SessionState::Error));
    }

    #[test]
    fn test_escaped_fish_is_not_counted() {
        let mut h = Harness::new(settings());
        h.reach_fighting();
        h.tick();
        h.tick();

        h.hide(Cue::FishHooked);
        let transition = h.tick().unwrap();
        assert_eq!(transition.to, SessionState::Retrieving);
        assert_eq!(transition.reason, TransitionReason::FishEscaped);
        assert_eq!(h.machine.counters().kept, 0);
        // reel and lift were let go when the fight ended
        assert_eq!(h.pressed("up LMB"), 1);
        assert_eq!(h.pressed("up RMB"), 1);
    }

    #[test]
    fn test_captured_fish_is_kept() {
        let mut h = Harness::new(settings());
        h.screen.borrow_mut().fish_name = "C0mmon Roach".into();
        h.reach_fighting();

        h.hide(Cue::FishHooked);
        h.show(Cue::FishCaptured);
        assert_eq!(h.tick().unwrap().to, SessionState::HandlingCatch);

        let transition = h.tick().unwrap();
        assert_eq!(transition.to, SessionState::Idle);
        assert_eq!(h.machine.counters().kept, 1);
        assert_eq!(h.pressed("press SPACE"), 1);
        assert_eq!(h.machine.catches()[0].name, "common_roach");
    }

    #[test]
    fn test_release_list_releases() {
        let mut settings = settings();
        settings.session.release_names = vec!["Pike".into()];
        let mut h = Harness::new(settings);
        h.screen.borrow_mut().fish_name = "pike".into();
        h.reach_fighting();

        h.show(Cue::FishCaptured);
        h.tick();
        h.tick();
        assert_eq!(h.machine.counters().released, 1);
        assert_eq!(h.machine.counters().kept, 0);
        assert_eq!(h.pressed("press BACKSPACE"), 1);
    }

    #[test]
    fn test_full_keepnet_finishes_session() {
        let mut settings = settings();
        settings.session.keepnet_limit = 3;
        settings.session.fishes_in_keepnet = 2;
        settings.session.keepnet_full_action = KeepnetFullAction::QuitGame;
        let mut h = Harness::new(settings);
        h.reach_fighting();

        h.show(Cue::FishCaptured);
        h.tick();
        let transition = h.tick().unwrap();
        assert_eq!(transition.to, SessionState::Finished);
        assert_eq!(transition.reason, TransitionReason::KeepnetFull);

        let result = h.machine.result().unwrap();
        assert_eq!(
            result.disposition,
            Disposition::CapacityReached(KeepnetFullAction::QuitGame)
        );
        assert_eq!(result.counters.kept, 1);
        assert!(h.tick().is_none());
    }

    #[test]
    fn test_bottom_mode_rotates_rods_without_transition() {
        let mut settings = settings();
        settings.mode = FishingMode::Bottom {
            check_delay: 2.0,
            check_miss_limit: 3,
            rods: vec!["1".into(), "2".into(), "3".into()],
        };
        let mut h = Harness::new(settings);
        h.reach_waiting();
        let transitions = h.machine.history().len();

        // checks only happen every check_delay
        h.tick_after(1.0);
        assert_eq!(h.machine.counters().missed_checks, 0);

        h.tick_after(1.0);
        h.tick_after(2.0);
        assert_eq!(h.machine.consecutive_misses(), 2);
        assert_eq!(h.pressed("press 1"), 0);

        h.tick_after(2.0);
        assert_eq!(h.machine.counters().missed_checks, 3);
        assert_eq!(h.machine.consecutive_misses(), 0);
        assert_eq!(h.pressed("press 1"), 1);
        assert_eq!(h.machine.state(), SessionState::Waiting);
        assert_eq!(h.machine.history().len(), transitions);

        for _ in 0..3 {
            h.tick_after(2.0);
        }
        assert_eq!(h.pressed("press 2"), 1);
        assert_eq!(h.machine.counters().missed_checks, 6);
    }

    #[test]
    fn test_bottom_mode_bite_on_rod_tip() {
        let mut settings = settings();
        settings.mode = FishingMode::Bottom {
            check_delay: 2.0,
            check_miss_limit: 3,
            rods: vec!["1".into()],
        };
        let mut h = Harness::new(settings);
        h.reach_waiting();
        h.screen.borrow_mut().moving.insert(MotionCue::RodTip);

        assert_eq!(h.tick_after(2.0).unwrap().to, SessionState::Fighting);
    }

    #[test]
    fn test_every_wait_and_rod_switch_restarts_motion_baseline() {
        let mut settings = settings();
        settings.mode = FishingMode::Bottom {
            check_delay: 1.0,
            check_miss_limit: 2,
            rods: vec!["1".into(), "2".into()],
        };
        let mut h = Harness::new(settings);
        h.reach_waiting();
        assert_eq!(h.screen.borrow().motion_resets, vec![MotionCue::RodTip]);

        h.tick_after(1.0);
        h.tick_after(1.0);
        assert_eq!(h.pressed("press 1"), 1);
        assert_eq!(h.screen.borrow().motion_resets.len(), 2);

        // second cast after the bite timeout
        h.tick_after(120.0);
        h.show(Cue::RetrievalComplete);
        h.tick();
        h.hide(Cue::RetrievalComplete);
        h.reach_waiting();
        assert_eq!(h.screen.borrow().motion_resets.len(), 3);
    }

    #[test]
    fn test_float_wait_restarts_motion_baseline() {
        let mut settings = settings();
        settings.mode = FishingMode::Bolognese {
            sensitivity: 5.0,
            drift_timeout: 10.0,
        };
        let mut h = Harness::new(settings);
        h.reach_waiting();
        assert_eq!(h.screen.borrow().motion_resets, vec![MotionCue::Float]);

        let paused = Signals {
            stop: false,
            paused: true,
        };
        h.machine.tick(paused);
        h.tick();
        assert_eq!(h.machine.state(), SessionState::Waiting);
        assert_eq!(
            h.screen.borrow().motion_resets,
            vec![MotionCue::Float, MotionCue::Float]
        );

        let mut h = Harness::new(Settings::default());
        h.reach_waiting();
        assert!(h.screen.borrow().motion_resets.is_empty());
    }

    #[test]
    fn test_float_mode_bites_on_movement_and_drift_timeout() {
        let mut settings = settings();
        settings.mode = FishingMode::Telescopic {
            sensitivity: 6.0,
            drift_timeout: 30.0,
        };
        let mut h = Harness::new(settings.clone());
        h.reach_waiting();
        assert_eq!(
            h.tick_after(31.0).unwrap().reason,
            TransitionReason::Timeout
        );
        // telescopic retrieval is a single pull
        assert_eq!(h.pressed("press LMB"), 1);

        let mut h = Harness::new(settings);
        h.reach_waiting();
        h.screen.borrow_mut().moving.insert(MotionCue::Float);
        assert_eq!(h.tick().unwrap().to, SessionState::Fighting);
        // no reel on a telescopic rod: the fight is the lift alone
        assert_eq!(h.pressed("down RMB"), 1);
        assert_eq!(h.pressed("down LMB"), 0);
    }

    #[test]
    fn test_pirk_jigs_while_waiting() {
        let mut settings = settings();
        settings.mode = FishingMode::Pirk {
            jig_interval: 3.0,
            jig_duration: 0.5,
            motion: JigMotion::Elevate,
        };
        let mut h = Harness::new(settings);
        h.reach_waiting();

        h.tick_after(1.0);
        assert_eq!(h.pressed("hold SPACE"), 0);
        h.tick_after(2.0);
        assert_eq!(h.pressed("hold SPACE"), 1);
        h.tick_after(1.0);
        assert_eq!(h.pressed("hold SPACE"), 1);
        h.tick_after(2.0);
        assert_eq!(h.pressed("hold SPACE"), 2);
        assert_eq!(h.machine.state(), SessionState::Waiting);
    }

    #[test]
    fn test_friction_tightens_during_fight() {
        let mut h = Harness::new(settings());
        h.reach_fighting();
        assert_eq!(h.machine.brake().current_brake(), 28);

        h.tick_after(0.5);
        assert_eq!(h.pressed("press UP"), 0);
        h.tick_after(0.6);
        assert_eq!(h.pressed("press UP"), 1);
        assert_eq!(h.machine.brake().current_brake(), 29);
    }

    #[test]
    fn test_stimulant_respects_cooldown_and_limit() {
        let mut settings = settings();
        settings.session.stimulant.enabled = true;
        settings.session.stimulant.cooldown_secs = 10.0;
        settings.session.stimulant.max_per_fight = 2;
        let mut h = Harness::new(settings);
        h.reach_fighting();
        h.show(Cue::EnergyLow);

        h.tick();
        h.tick_after(5.0);
        assert_eq!(h.pressed("press 4"), 1);
        h.tick_after(6.0);
        assert_eq!(h.pressed("press 4"), 2);
        h.tick_after(11.0);
        assert_eq!(h.pressed("press 4"), 2);
        assert_eq!(h.machine.counters().stimulant_uses, 2);
    }

    #[test]
    fn test_retrieval_timeout_is_degraded_success() {
        let mut settings = settings();
        settings.session.gear_ratio_switch = true;
        let mut h = Harness::new(settings);
        h.reach_waiting();
        h.tick_after(121.0);
        assert_eq!(h.machine.state(), SessionState::Retrieving);

        let transition = h.tick_after(61.0).unwrap();
        assert_eq!(transition.to, SessionState::Idle);
        assert_eq!(transition.reason, TransitionReason::RetrievalTimeout);
        assert_eq!(h.pressed("press G"), 1);
    }

    #[test]
    fn test_stop_finishes_before_any_perception() {
        let mut h = Harness::new(settings());
        h.reach_fighting();
        let queries = h.screen.borrow().queries;

        let transition = h
            .machine
            .tick(Signals {
                stop: true,
                paused: false,
            })
            .unwrap();
        assert_eq!(transition.to, SessionState::Finished);
        assert_eq!(h.screen.borrow().queries, queries);
        assert_eq!(h.machine.disposition(), Some(&Disposition::Stopped));
        assert_eq!(h.pressed("up LMB"), 1);
    }

    #[test]
    fn test_pause_restarts_state_timer() {
        let mut h = Harness::new(settings());
        h.reach_waiting();
        h.tick_after(100.0);

        let paused = Signals {
            stop: false,
            paused: true,
        };
        assert_eq!(h.machine.tick(paused).unwrap().to, SessionState::Paused);
        let queries = h.screen.borrow().queries;
        h.clock.advance_secs(50.0);
        assert!(h.machine.tick(paused).is_none());
        assert_eq!(h.screen.borrow().queries, queries);

        assert_eq!(h.tick().unwrap().to, SessionState::Waiting);
        assert!(h.tick_after(30.0).is_none());
        assert_eq!(h.machine.state(), SessionState::Waiting);
    }

    #[test]
    fn test_collaborator_failure_recovers_through_error() {
        let mut h = Harness::new(settings());
        h.reach_waiting();

        h.screen.borrow_mut().capture_broken = true;
        let transition = h.tick().unwrap();
        assert_eq!(transition.to, SessionState::Error);
        assert!(h.machine.last_error().unwrap().contains("capture device lost"));

        h.screen.borrow_mut().capture_broken = false;
        let transition = h.tick().unwrap();
        assert_eq!(transition.to, SessionState::Idle);
        assert_eq!(transition.reason, TransitionReason::Recovered);
    }

    #[test]
    fn test_exhausted_recovery_fails_session() {
        let mut h = Harness::new(settings());
        h.reach_waiting();
        h.screen.borrow_mut().capture_broken = true;
        h.screen.borrow_mut().window_lost = true;
        h.tick();

        let transition = h.tick().unwrap();
        assert_eq!(transition.to, SessionState::Finished);
        match h.machine.disposition() {
            Some(Disposition::Failed(cause)) => assert!(cause.contains("capture device lost")),
            other => panic!("unexpected disposition {:?}", other),
        }
    }

    #[test]
    fn test_configuration_error_is_fatal() {
        let mut h = Harness::new(settings());
        h.screen.borrow_mut().misconfigured = true;
        h.tick();
        h.tick();
        assert!(h.machine.is_finished());
        assert!(!h.states().contains(&SessionState::Error));
        assert!(matches!(
            h.machine.result().unwrap().disposition,
            Disposition::Failed(_)
        ));
    }

    #[test]
    fn test_disconnect_forces_error() {
        let mut h = Harness::new(settings());
        h.reach_fighting();
        h.show(Cue::Disconnected);

        let transition = h.tick().unwrap();
        assert_eq!(transition.to, SessionState::Error);
        assert_eq!(transition.reason, TransitionReason::Disconnected);
        assert_eq!(h.machine.last_error(), Some("disconnected"));
    }

    #[test]
    fn test_snagged_line_is_an_error() {
        let mut h = Harness::new(settings());
        h.reach_waiting();
        h.show(Cue::LineSnagged);
        h.show(Cue::FishHooked);

        let transition = h.tick().unwrap();
        assert_eq!(transition.to, SessionState::Error);
        assert_eq!(transition.reason, TransitionReason::LineSnagged);
        assert_eq!(h.machine.last_error(), Some("line snagged"));
    }

    #[test]
    fn test_fight_timeout_is_an_error() {
        let mut h = Harness::new(settings());
        h.reach_fighting();

        assert!(h.tick_after(299.0).is_none());
        let transition = h.tick_after(2.0).unwrap();
        assert_eq!(transition.to, SessionState::Error);
        assert_eq!(transition.reason, TransitionReason::FightTimeout);
        assert_eq!(h.pressed("up LMB"), 1);
        assert_eq!(h.pressed("up RMB"), 1);
    }

    #[test]
    fn test_stop_and_go_retrieve_cycles_the_reel() {
        let mut settings = settings();
        settings.mode = FishingMode::SpinWithPause {
            reel_burst: 1.0,
            pause: 0.5,
        };
        let mut h = Harness::new(settings);
        h.reach_waiting();

        assert_eq!(h.tick_after(121.0).unwrap().to, SessionState::Retrieving);
        assert_eq!(h.pressed("down LMB"), 1);

        h.tick_after(0.5);
        assert_eq!(h.pressed("up LMB"), 0);
        h.tick_after(0.6);
        assert_eq!(h.pressed("up LMB"), 1);
        h.tick_after(0.6);
        assert_eq!(h.pressed("down LMB"), 2);
        h.tick_after(1.1);
        assert_eq!(h.pressed("up LMB"), 2);
        assert_eq!(h.machine.state(), SessionState::Retrieving);
    }

    #[test]
    fn test_resumed_fight_holds_inputs_and_rearms_brake() {
        let mut h = Harness::new(settings());
        h.reach_fighting();
        assert_eq!(h.pressed("down LMB"), 1);
        assert_eq!(h.pressed("down RMB"), 1);

        let paused = Signals {
            stop: false,
            paused: true,
        };
        assert_eq!(h.machine.tick(paused).unwrap().to, SessionState::Paused);
        assert_eq!(h.pressed("up LMB"), 1);
        assert_eq!(h.pressed("up RMB"), 1);

        h.clock.advance_secs(5.0);
        assert_eq!(h.tick().unwrap().to, SessionState::Fighting);
        assert_eq!(h.pressed("down LMB"), 2);
        assert_eq!(h.pressed("down RMB"), 2);

        // the first adjustment after resuming only re-arms the loop
        h.tick_after(1.5);
        assert_eq!(h.pressed("press UP"), 0);
        h.tick_after(1.1);
        assert_eq!(h.pressed("press UP"), 1);
        assert_eq!(h.machine.brake().current_brake(), 29);
    }

    #[test]
    fn test_cast_timeout_is_an_error() {
        let mut h = Harness::new(settings());
        h.tick();
        assert!(h.tick_after(5.0).is_none());
        let transition = h.tick_after(4.0).unwrap();
        assert_eq!(transition.to, SessionState::Error);
        assert_eq!(transition.reason, TransitionReason::CastTimeout);
    }
}
