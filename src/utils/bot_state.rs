//! Control flags shared between the hotkey listener and the session thread

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

/// External signals for one session. Owned by `main` behind an `Arc` and handed to the
/// hotkey listener and the runner; the session machine itself never reads it directly.
#[derive(Debug, Default)]
pub struct SessionControl {
    started: AtomicBool,
    stop_requested: AtomicBool,
    paused: AtomicBool,
    friction_reset: AtomicBool,
    activity: RwLock<String>,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session as started
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Ask the session to stop at the top of its next tick
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Request a friction brake reset
    pub fn request_friction_reset(&self) {
        self.friction_reset.store(true, Ordering::SeqCst);
    }

    /// Consume a pending friction brake reset request
    pub fn take_friction_reset(&self) -> bool {
        self.friction_reset.swap(false, Ordering::SeqCst)
    }

    pub fn set_activity(&self, activity: impl Into<String>) {
        *self.activity.write() = activity.into();
    }

    pub fn activity(&self) -> String {
        self.activity.read().clone()
    }
}
