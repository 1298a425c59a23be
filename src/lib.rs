//! Auto Angler - screen-driven fishing automation
//!
//! A visual perception engine turns captures of the game window into yes/no facts, fish-name text
//! and motion, and a session state machine turns those facts plus elapsed time into key and mouse
//! input across six fishing modes.

pub mod clock;
pub mod config;
pub mod error;
pub mod fish;
pub mod input;
pub mod log_main;
pub mod perception;
pub mod session;
pub mod utils;
pub mod window;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Settings;
pub use error::{ConfigurationError, InputError, PerceptionError, TickError};
pub use fish::{Catch, CatchPolicy, Decision};
pub use log_main::{JsonFileSink, MemorySink, ResultSink};
pub use perception::{Perception, PerceptionOptions};
pub use session::{run_session, FishingMode, SessionMachine, SessionResult, SessionState};
pub use utils::{bot_state::SessionControl, path::get_data_dir};
