//! Standalone friction brake helper
//!
//! Watches the hooked-fish indicator and tightens the brake while a fish is on, without running
//! a fishing session. The reset hotkey puts the brake back to its initial setting, the stop
//! hotkey exits.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

use auto_angler::clock::{Clock, SystemClock};
use auto_angler::config::Settings;
use auto_angler::error::PerceptionError;
use auto_angler::input::{Binding, EnigoActuator, InputActuator};
use auto_angler::perception::cues::{Cue, Cues};
use auto_angler::perception::screen_service::ScreenService;
use auto_angler::perception::{Perception, PerceptionOptions};
use auto_angler::session::FrictionBrake;
use auto_angler::utils::keybinds::{HotkeyAction, Hotkeys};
use auto_angler::utils::logging::init_logging;
use auto_angler::window::pump_messages;

fn main() -> Result<()> {
    init_logging();
    println!("Auto Angler friction brake {}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load().context("Failed to load settings")?;
    let brake_up = Binding::parse(&settings.keys.brake_up).context("Invalid brake_up binding")?;

    let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
    let hotkeys = Hotkeys::register(&manager, &settings.keys);
    println!(
        "Hotkeys: RESET={}, STOP={}",
        settings.keys.reset_friction, settings.keys.stop
    );

    let clock = SystemClock;
    let mut perception = Perception::new(
        ScreenService::new(&settings.general.game_title),
        clock,
        PerceptionOptions::from_settings(&settings),
    )
    .context("Failed to start the perception engine")?;
    let mut actuator = EnigoActuator::new().context("Failed to start input simulation")?;

    let mut brake = FrictionBrake::from_settings(&settings.friction);
    tracing::info!(
        "[FRICTION] Brake at {}, stepping every {:?}",
        brake.current_brake(),
        brake.delay()
    );

    let receiver = GlobalHotKeyEvent::receiver();
    let tick = settings.tick_interval().max(Duration::from_millis(50));
    let mut hooked = false;

    'run: loop {
        pump_messages();

        while let Ok(event) = receiver.try_recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            match hotkeys.action_for(event.id) {
                Some(HotkeyAction::ResetFriction) => {
                    brake.set_brake(brake.initial());
                    brake.clear_baseline();
                    tracing::info!("[FRICTION] Brake reset to {}", brake.current_brake());
                }
                Some(HotkeyAction::Stop) => break 'run,
                _ => {}
            }
        }

        let now = clock.now();
        match perception.check(Cue::FishHooked) {
            Ok(true) => {
                if !hooked {
                    brake.start_fight(now);
                    hooked = true;
                } else if brake.adjust(now).is_some() {
                    if let Err(e) = actuator.press(&brake_up) {
                        tracing::warn!("[FRICTION] Failed to press {}: {}", brake_up, e);
                    }
                }
            }
            Ok(false) => {
                if hooked {
                    tracing::info!("[FRICTION] Fish off, brake ended at {}", brake.current_brake());
                }
                hooked = false;
            }
            Err(e @ PerceptionError::Configuration(_)) => {
                return Err(e).context("Perception is misconfigured");
            }
            Err(e) => tracing::warn!("[FRICTION] Perception failed: {}", e),
        }

        thread::sleep(tick);
    }

    println!("Friction brake stopped at {}", brake.current_brake());
    Ok(())
}
