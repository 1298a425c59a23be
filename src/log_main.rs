//! Session and catch logging

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::fish::Catch;
use crate::session::SessionResult;
use crate::utils::path::get_logs_dir;

/// Receives catches as they are landed and the result record once the session ends
pub trait ResultSink {
    fn record_catch(&mut self, catch: &Catch);

    fn record_session(&mut self, result: &SessionResult);
}

/// Log entry for a landed fish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchLogEntry {
    pub timestamp: String,
    pub fish_type: String,
    pub tagged: bool,
    pub decision: String,
}

/// Appends to `sessions.json` and `fishing_log.json` under the logs folder
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.dir.join("sessions.json")
    }

    pub fn catches_path(&self) -> PathBuf {
        self.dir.join("fishing_log.json")
    }
}

impl Default for JsonFileSink {
    fn default() -> Self {
        Self::new(get_logs_dir())
    }
}

impl ResultSink for JsonFileSink {
    fn record_catch(&mut self, catch: &Catch) {
        let entry = CatchLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            fish_type: catch.name.clone(),
            tagged: catch.tagged,
            decision: catch.decision.value().to_string(),
        };
        append_entry(&self.catches_path(), entry);
    }

    fn record_session(&mut self, result: &SessionResult) {
        append_entry(&self.sessions_path(), result);
    }
}

/// Load a JSON array log, empty if missing or unreadable
pub fn load_entries<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    if path.exists() {
        if let Ok(content) = fs::read_to_string(path) {
            if let Ok(entries) = serde_json::from_str(&content) {
                return entries;
            }
        }
    }

    Vec::new()
}

/// Append one entry to a JSON array log. Failures are logged, never raised.
fn append_entry<T: Serialize>(path: &Path, entry: T) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut data: Vec<serde_json::Value> = load_entries(path);
    match serde_json::to_value(entry) {
        Ok(value) => data.push(value),
        Err(e) => {
            tracing::warn!("Failed to serialize log entry for {:?}: {}", path, e);
            return;
        }
    }

    if let Ok(content) = serde_json::to_string_pretty(&data) {
        if let Err(e) = fs::write(path, content) {
            tracing::warn!("Failed to write {:?}: {}", path, e);
        }
    }
}

/// Sink that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub catches: Vec<Catch>,
    pub sessions: Vec<SessionResult>,
}

impl ResultSink for MemorySink {
    fn record_catch(&mut self, catch: &Catch) {
        self.catches.push(catch.clone());
    }

    fn record_session(&mut self, result: &SessionResult) {
        self.sessions.push(result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fish::Decision;
    use crate::session::{Counters, Disposition};

    fn temp_logs(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("auto-angler-logs-{}", name));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_load_entries_missing_file() {
        let dir = temp_logs("missing");
        let entries: Vec<CatchLogEntry> = load_entries(&dir.join("fishing_log.json"));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_catches_are_appended() {
        let dir = temp_logs("catches");
        let mut sink = JsonFileSink::new(&dir);
        sink.record_catch(&Catch::new("pike".into(), false, Decision::Keep));
        sink.record_catch(&Catch::new("roach".into(), true, Decision::Release));

        let entries: Vec<CatchLogEntry> = load_entries(&sink.catches_path());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].fish_type, "pike");
        assert_eq!(entries[1].decision, "released");
        assert!(entries[1].tagged);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_session_result_is_appended() {
        let dir = temp_logs("sessions");
        let mut sink = JsonFileSink::new(&dir);
        let result = SessionResult {
            started_at: Utc::now(),
            elapsed_secs: 42.0,
            mode: "bottom".into(),
            counters: Counters {
                kept: 3,
                ..Counters::default()
            },
            disposition: Disposition::Stopped,
        };
        sink.record_session(&result);
        sink.record_session(&result);

        let entries: Vec<serde_json::Value> = load_entries(&sink.sessions_path());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["mode"], "bottom");
        assert_eq!(entries[0]["kept"], 3);
        assert_eq!(entries[0]["disposition"]["kind"], "stopped");
        let _ = fs::remove_dir_all(&dir);
    }
}
