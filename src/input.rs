//! Input actuator: keyboard and mouse commands sent to the game client

use std::thread;
use std::time::Duration;

#[cfg(windows)]
use enigo::{Button, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use crate::error::InputError;

/// Mouse buttons the session uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

/// A named key or mouse button
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    Key(String),
    Mouse(MouseButton),
}

impl Binding {
    /// Parse a binding name such as `LMB`, `F9`, `SPACE` or `4`
    pub fn parse(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        match upper.as_str() {
            "LMB" | "MOUSE_LEFT" => Some(Binding::Mouse(MouseButton::Left)),
            "RMB" | "MOUSE_RIGHT" => Some(Binding::Mouse(MouseButton::Right)),
            _ => crate::utils::keybinds::resolve_key(&upper).map(Binding::Key),
        }
    }

    /// Parse a binding that was already validated at startup
    pub(crate) fn from_validated(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| Binding::Key(name.to_uppercase()))
    }
}

impl std::fmt::Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Key(key) => write!(f, "{}", key),
            Binding::Mouse(MouseButton::Left) => write!(f, "LMB"),
            Binding::Mouse(MouseButton::Right) => write!(f, "RMB"),
        }
    }
}

/// Discrete input commands. Implementations never expose raw device handles.
pub trait InputActuator {
    /// Press and release
    fn press(&mut self, binding: &Binding) -> Result<(), InputError>;

    /// Push down and leave held until [`InputActuator::release`]
    fn key_down(&mut self, binding: &Binding) -> Result<(), InputError>;

    /// Release a held binding
    fn release(&mut self, binding: &Binding) -> Result<(), InputError>;

    /// Hold for a fixed duration. Blocks until the binding is released again.
    fn hold(&mut self, binding: &Binding, duration: Duration) -> Result<(), InputError> {
        self.key_down(binding)?;
        thread::sleep(duration);
        self.release(binding)
    }
}

/// Actuator backed by enigo
#[cfg(windows)]
pub struct EnigoActuator {
    enigo: Enigo,
}

#[cfg(windows)]
impl EnigoActuator {
    pub fn new() -> Result<Self, InputError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| InputError::Backend(format!("failed to create enigo: {:?}", e)))?;
        Ok(Self { enigo })
    }

    fn send(&mut self, binding: &Binding, direction: Direction) -> Result<(), InputError> {
        let result = match binding {
            Binding::Mouse(button) => {
                let button = match button {
                    MouseButton::Left => Button::Left,
                    MouseButton::Right => Button::Right,
                };
                self.enigo.button(button, direction)
            }
            Binding::Key(name) => {
                let key = string_to_enigo_key(name)
                    .ok_or_else(|| InputError::UnknownBinding(name.clone()))?;
                self.enigo.key(key, direction)
            }
        };
        result.map_err(|e| InputError::Backend(format!("'{}': {:?}", binding, e)))
    }
}

#[cfg(windows)]
impl InputActuator for EnigoActuator {
    fn press(&mut self, binding: &Binding) -> Result<(), InputError> {
        thread::sleep(Duration::from_millis(50));
        tracing::trace!("[INPUT] press {}", binding);
        self.send(binding, Direction::Click)
    }

    fn key_down(&mut self, binding: &Binding) -> Result<(), InputError> {
        tracing::trace!("[INPUT] down {}", binding);
        self.send(binding, Direction::Press)
    }

    fn release(&mut self, binding: &Binding) -> Result<(), InputError> {
        tracing::trace!("[INPUT] release {}", binding);
        self.send(binding, Direction::Release)
    }
}

/// Actuator used where input simulation is unavailable; logs and succeeds
#[cfg(not(windows))]
pub struct EnigoActuator;

#[cfg(not(windows))]
impl EnigoActuator {
    pub fn new() -> Result<Self, InputError> {
        tracing::warn!("Input simulation not implemented on this platform");
        Ok(Self)
    }
}

#[cfg(not(windows))]
impl InputActuator for EnigoActuator {
    fn press(&mut self, binding: &Binding) -> Result<(), InputError> {
        tracing::warn!("press({}) not implemented on this platform", binding);
        Ok(())
    }

    fn key_down(&mut self, binding: &Binding) -> Result<(), InputError> {
        tracing::warn!("key_down({}) not implemented on this platform", binding);
        Ok(())
    }

    fn release(&mut self, binding: &Binding) -> Result<(), InputError> {
        tracing::warn!("release({}) not implemented on this platform", binding);
        Ok(())
    }
}

/// Convert string key name to enigo Key
#[cfg(windows)]
fn string_to_enigo_key(key: &str) -> Option<Key> {
    // Single characters go through lowercase to avoid keyboard layout mapping issues
    if key.chars().count() == 1 {
        let c = key.chars().next()?.to_ascii_lowercase();
        return Some(Key::Unicode(c));
    }

    match key.to_uppercase().as_str() {
        "F1" => Some(Key::F1),
        "F2" => Some(Key::F2),
        "F3" => Some(Key::F3),
        "F4" => Some(Key::F4),
        "F5" => Some(Key::F5),
        "F6" => Some(Key::F6),
        "F7" => Some(Key::F7),
        "F8" => Some(Key::F8),
        "F9" => Some(Key::F9),
        "F10" => Some(Key::F10),
        "F11" => Some(Key::F11),
        "F12" => Some(Key::F12),
        "ESC" | "ESCAPE" => Some(Key::Escape),
        "ENTER" | "RETURN" => Some(Key::Return),
        "SPACE" => Some(Key::Space),
        "TAB" => Some(Key::Tab),
        "BACKSPACE" => Some(Key::Backspace),
        "UP" => Some(Key::UpArrow),
        "DOWN" => Some(Key::DownArrow),
        "LEFT" => Some(Key::LeftArrow),
        "RIGHT" => Some(Key::RightArrow),
        "HOME" => Some(Key::Home),
        "END" => Some(Key::End),
        "PAGEUP" => Some(Key::PageUp),
        "PAGEDOWN" => Some(Key::PageDown),
        "DELETE" => Some(Key::Delete),
        "SHIFT" => Some(Key::Shift),
        "CTRL" | "CONTROL" => Some(Key::Control),
        "ALT" => Some(Key::Alt),
        "CAPSLOCK" => Some(Key::CapsLock),
        _ => None,
    }
}
