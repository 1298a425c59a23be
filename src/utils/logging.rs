//! Tracing setup shared by the binaries

use std::fs::OpenOptions;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use super::path::get_data_dir;

// Log filter configuration:
// - Sets default level to 'info'
// - Quietens the capture and hotkey crates
const LOG_FILTER: &str = "info,auto_angler=info,screenshots=warn,global_hotkey=warn,enigo=warn";

/// Log to stdout and to `debug/log/debug.log` under the data directory.
///
/// `RUST_LOG` overrides the default filter. Falls back to stdout only when the log file cannot
/// be opened.
pub fn init_logging() {
    let log_dir = get_data_dir().join("debug").join("log");
    let _ = std::fs::create_dir_all(&log_dir);

    let log_file_path = log_dir.join("debug.log");
    let file_result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LOG_FILTER));

    match file_result {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE);

            let stdout_layer = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(stdout_layer)
                .init();

            tracing::info!("[INIT] Logging initialized, file: {:?}", log_file_path);
        }
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            eprintln!(
                "[INIT] Failed to create debug log file at {:?}: {}",
                log_file_path, e
            );
        }
    }
}
