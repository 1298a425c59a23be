//! Data directory discovery

use std::env;
use std::path::PathBuf;

/// Environment variable that pins the data directory
pub const DATA_DIR_ENV: &str = "AUTO_ANGLER_HOME";

/// Returns the folder holding `config/`, `images/` and `logs/`.
///
/// Resolution order: `AUTO_ANGLER_HOME`, the executable's folder when it ships with a
/// `config/` folder next to it, then the current working directory.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Ok(exe_path) = env::current_exe() {
        if let Some(parent) = exe_path.parent() {
            if parent.join("config").exists() {
                return parent.to_path_buf();
            }
        }
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Root of the per-language template folders
pub fn get_images_dir() -> PathBuf {
    get_data_dir().join("images")
}

/// Folder for session and catch logs
pub fn get_logs_dir() -> PathBuf {
    get_data_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir() {
        let dir = get_data_dir();
        assert!(dir.exists() || dir == PathBuf::from(".") || env::var_os(DATA_DIR_ENV).is_some());
    }

    #[test]
    fn test_subdirectories_hang_off_data_dir() {
        assert!(get_images_dir().ends_with("images"));
        assert!(get_logs_dir().ends_with("logs"));
    }
}
