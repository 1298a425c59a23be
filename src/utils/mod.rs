//! Shared helpers: data paths, key bindings, control flags, logging and OCR clean-up

pub mod bot_state;
pub mod keybinds;
pub mod logging;
pub mod path;
pub mod spelling;
