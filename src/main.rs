//! Auto Angler - automated fishing sessions driven by screen perception
//!
//! Start the game, press the start hotkey, and the session runs until it is stopped, the keepnet
//! fills up, or it fails to recover from an error. Results are appended to `logs/sessions.json`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

use auto_angler::clock::SystemClock;
use auto_angler::config::{KeepnetFullAction, Settings};
use auto_angler::input::{Binding, EnigoActuator, InputActuator};
use auto_angler::log_main::JsonFileSink;
use auto_angler::perception::screen_service::ScreenService;
use auto_angler::perception::{Perception, PerceptionOptions};
use auto_angler::session::{
    record_startup_abort, run_session, wait_for_surface, Disposition, SessionMachine,
    StartupAbort,
};
use auto_angler::utils::bot_state::SessionControl;
use auto_angler::utils::keybinds::{HotkeyAction, Hotkeys};
use auto_angler::utils::logging::init_logging;
use auto_angler::utils::path::get_data_dir;
use auto_angler::window::{activate_window, pump_messages};

const CHECK_INTERVAL: Duration = Duration::from_millis(50);
const WINDOW_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Build the perception engine and actuator for the game window and run one session.
/// A session that cannot start still leaves a result record.
fn run_fishing(settings: Settings, control: Arc<SessionControl>) -> Result<()> {
    let started_at = Utc::now();
    let mut sink = JsonFileSink::default();
    let title = settings.general.game_title.clone();
    control.set_activity("Looking for the game window");
    let activated = activate_window(&title);
    if !activated {
        tracing::warn!("[INIT] '{}' is not open, waiting for it", title);
    }

    let options = PerceptionOptions::from_settings(&settings);
    let ready = wait_for_surface(&control, WINDOW_RETRY_INTERVAL, || {
        let mut perception =
            Perception::new(ScreenService::new(&title), SystemClock, options.clone())?;
        perception.validate()?;
        perception.verify_templates()?;
        Ok(perception)
    });
    let perception = match ready {
        Ok(perception) => perception,
        Err(abort) => {
            record_startup_abort(&mut sink, &settings.mode, started_at, abort);
            return Ok(());
        }
    };
    if !activated {
        activate_window(&title);
    }

    let actuator = match EnigoActuator::new() {
        Ok(actuator) => actuator,
        Err(e) => {
            let cause = format!("input simulation unavailable: {}", e);
            let abort = StartupAbort::Failed(cause);
            record_startup_abort(&mut sink, &settings.mode, started_at, abort);
            return Err(e).context("Failed to start input simulation");
        }
    };
    let mut machine = SessionMachine::new(perception, actuator, SystemClock, &settings);

    let Some(result) = run_session(&mut machine, &control, settings.tick_interval(), &mut sink)
    else {
        return Ok(());
    };

    println!(
        "Session finished after {:.0}s: {} ({})",
        result.elapsed_secs, result.counters, result.disposition
    );

    if result.disposition == Disposition::CapacityReached(KeepnetFullAction::QuitGame) {
        tracing::info!("[SESSION] Keepnet full, closing the game");
        let mut actuator = EnigoActuator::new().context("Failed to start input simulation")?;
        let quit = Binding::parse(&settings.keys.quit_game).context("Invalid quit_game binding")?;
        actuator.press(&quit)?;
    }
    Ok(())
}

fn start_session(settings: &Settings, control: &Arc<SessionControl>) -> Option<JoinHandle<()>> {
    if control.is_started() {
        tracing::debug!("[INIT] Session already running");
        return None;
    }
    control.start();

    let settings = settings.clone();
    let control = control.clone();
    Some(thread::spawn(move || {
        if let Err(e) = run_fishing(settings, control.clone()) {
            tracing::error!("[SESSION] {:#}", e);
        }
        control.set_activity("Stopped");
    }))
}

fn main() -> Result<()> {
    init_logging();

    println!("Auto Angler {}", env!("CARGO_PKG_VERSION"));
    println!("================================");

    let settings = Settings::load().context("Failed to load settings")?;
    tracing::info!(
        "[CONFIG] Data folder {:?}, mode {}, keepnet {}/{}",
        get_data_dir(),
        settings.mode,
        settings.session.fishes_in_keepnet,
        settings.session.keepnet_limit
    );

    let control = Arc::new(SessionControl::new());
    control.set_activity("Waiting for start");

    // Hotkeys must be registered and pumped on the main thread
    let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
    let hotkeys = Hotkeys::register(&manager, &settings.keys);
    println!(
        "Hotkeys: START={}, STOP={}, PAUSE={}, RESET FRICTION={}",
        settings.keys.start, settings.keys.stop, settings.keys.pause, settings.keys.reset_friction
    );

    let receiver = GlobalHotKeyEvent::receiver();
    let mut session: Option<JoinHandle<()>> = None;
    let mut shown_activity = String::new();

    loop {
        pump_messages();

        while let Ok(event) = receiver.try_recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            match hotkeys.action_for(event.id) {
                Some(HotkeyAction::Start) => {
                    if let Some(handle) = start_session(&settings, &control) {
                        session = Some(handle);
                    }
                }
                Some(HotkeyAction::Stop) => {
                    tracing::info!("[INIT] Stop requested");
                    control.request_stop();
                }
                Some(HotkeyAction::Pause) => {
                    let paused = control.toggle_pause();
                    tracing::info!("[INIT] {}", if paused { "Paused" } else { "Resumed" });
                }
                Some(HotkeyAction::ResetFriction) => control.request_friction_reset(),
                None => {}
            }
        }

        let activity = control.activity();
        if activity != shown_activity {
            println!("Status: {}", activity);
            shown_activity = activity;
        }

        if session.as_ref().is_some_and(|h| h.is_finished()) {
            break;
        }
        thread::sleep(CHECK_INTERVAL);
    }

    if let Some(handle) = session {
        let _ = handle.join();
    }
    println!("App is closing, cleaning up...");
    Ok(())
}
