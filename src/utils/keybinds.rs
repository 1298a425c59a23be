//! Key name validation and global hotkey registration

use global_hotkey::hotkey::{Code, HotKey};
use global_hotkey::GlobalHotKeyManager;

use crate::config::KeySettings;

/// Resolve a key name string to a validated, upper-cased key string
pub fn resolve_key(key_name: &str) -> Option<String> {
    if key_name.is_empty() {
        return None;
    }

    let key_upper = key_name.trim().to_uppercase();

    let special_keys = [
        "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
        "ESC", "ESCAPE", "ENTER", "RETURN", "SPACE", "TAB", "BACKSPACE",
        "UP", "DOWN", "LEFT", "RIGHT",
        "HOME", "END", "PAGEUP", "PAGEDOWN", "DELETE",
        "SHIFT", "CTRL", "CONTROL", "ALT", "CAPSLOCK",
    ];

    if special_keys.contains(&key_upper.as_str()) {
        return Some(key_upper);
    }

    let mut chars = key_upper.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(key_upper),
        _ => None,
    }
}

/// Session control hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Start,
    Stop,
    Pause,
    ResetFriction,
}

/// Registered control hotkeys and their ids
pub struct Hotkeys {
    bound: Vec<(u32, HotkeyAction)>,
}

impl Hotkeys {
    /// Register the control hotkeys named in the settings. Unknown names are skipped with a warning.
    pub fn register(manager: &GlobalHotKeyManager, keys: &KeySettings) -> Self {
        let wanted = [
            (&keys.start, HotkeyAction::Start),
            (&keys.stop, HotkeyAction::Stop),
            (&keys.pause, HotkeyAction::Pause),
            (&keys.reset_friction, HotkeyAction::ResetFriction),
        ];

        let mut bound = Vec::new();
        for (name, action) in wanted {
            let Some(code) = string_to_code(name) else {
                tracing::warn!("[INIT] Unsupported hotkey '{}' for {:?}", name, action);
                continue;
            };
            let hotkey = HotKey::new(None, code);
            match manager.register(hotkey) {
                Ok(()) => bound.push((hotkey.id(), action)),
                Err(e) => tracing::warn!("[INIT] Failed to register {:?} hotkey: {}", action, e),
            }
        }
        Self { bound }
    }

    /// Map a hotkey event id back to its action
    pub fn action_for(&self, id: u32) -> Option<HotkeyAction> {
        self.bound
            .iter()
            .find(|(bound_id, _)| *bound_id == id)
            .map(|(_, action)| *action)
    }
}

/// Convert key string to global_hotkey Code
pub fn string_to_code(key: &str) -> Option<Code> {
    let key_upper = key.to_uppercase();
    match key_upper.as_str() {
        "A" => Some(Code::KeyA),
        "B" => Some(Code::KeyB),
        "C" => Some(Code::KeyC),
        "D" => Some(Code::KeyD),
        "E" => Some(Code::KeyE),
        "F" => Some(Code::KeyF),
        "G" => Some(Code::KeyG),
        "H" => Some(Code::KeyH),
        "I" => Some(Code::KeyI),
        "J" => Some(Code::KeyJ),
        "K" => Some(Code::KeyK),
        "L" => Some(Code::KeyL),
        "M" => Some(Code::KeyM),
        "N" => Some(Code::KeyN),
        "O" => Some(Code::KeyO),
        "P" => Some(Code::KeyP),
        "Q" => Some(Code::KeyQ),
        "R" => Some(Code::KeyR),
        "S" => Some(Code::KeyS),
        "T" => Some(Code::KeyT),
        "U" => Some(Code::KeyU),
        "V" => Some(Code::KeyV),
        "W" => Some(Code::KeyW),
        "X" => Some(Code::KeyX),
        "Y" => Some(Code::KeyY),
        "Z" => Some(Code::KeyZ),
        "0" => Some(Code::Digit0),
        "1" => Some(Code::Digit1),
        "2" => Some(Code::Digit2),
        "3" => Some(Code::Digit3),
        "4" => Some(Code::Digit4),
        "5" => Some(Code::Digit5),
        "6" => Some(Code::Digit6),
        "7" => Some(Code::Digit7),
        "8" => Some(Code::Digit8),
        "9" => Some(Code::Digit9),
        "F1" => Some(Code::F1),
        "F2" => Some(Code::F2),
        "F3" => Some(Code::F3),
        "F4" => Some(Code::F4),
        "F5" => Some(Code::F5),
        "F6" => Some(Code::F6),
        "F7" => Some(Code::F7),
        "F8" => Some(Code::F8),
        "F9" => Some(Code::F9),
        "F10" => Some(Code::F10),
        "F11" => Some(Code::F11),
        "F12" => Some(Code::F12),
        "ESC" | "ESCAPE" => Some(Code::Escape),
        "ENTER" | "RETURN" => Some(Code::Enter),
        "SPACE" => Some(Code::Space),
        "TAB" => Some(Code::Tab),
        "BACKSPACE" => Some(Code::Backspace),
        "UP" => Some(Code::ArrowUp),
        "DOWN" => Some(Code::ArrowDown),
        "LEFT" => Some(Code::ArrowLeft),
        "RIGHT" => Some(Code::ArrowRight),
        _ => None,
    }
}
