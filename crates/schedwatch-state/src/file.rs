//! FileStateStore — JSON snapshot on the local filesystem.
//!
//! Writes go to a sibling temporary file which is synced and then renamed
//! over the target, so a reader never observes a half-written document.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use schedwatch_core::{DEFAULT_STATE_FILE, HealthStatus};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::StateStore;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_FILE)
    }
}

impl StateStore for FileStateStore {
    fn write(&self, status: &HealthStatus) -> StateResult<()> {
        let body = serde_json::to_vec_pretty(status).map_err(map_err!(Serialize))?;
        let tmp = self.temp_path();
        {
            let mut file = File::create(&tmp).map_err(map_err!(Write))?;
            file.write_all(&body).map_err(map_err!(Write))?;
            file.sync_all().map_err(map_err!(Write))?;
        }
        fs::rename(&tmp, &self.path).map_err(map_err!(Write))?;
        debug!(path = ?self.path, "snapshot written");
        Ok(())
    }

    fn read(&self) -> StateResult<Option<HealthStatus>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::Read(e.to_string())),
        };
        let status: HealthStatus = serde_json::from_slice(&bytes).map_err(map_err!(Corrupt))?;
        status.validate().map_err(StateError::Corrupt)?;
        Ok(Some(status))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample() -> HealthStatus {
        HealthStatus {
            timestamp: Utc::now(),
            is_alive: true,
            last_execution: Some(Utc::now()),
            error_count: 1,
            last_error: Some("2024-11-20T10:14:00Z: API rate limit exceeded".to_string()),
            uptime_seconds: 12.25,
            active_jobs: 1,
            total_executions: 7,
        }
    }

    #[test]
    fn default_path() {
        assert_eq!(
            FileStateStore::default().path(),
            Path::new("/tmp/scheduler_state.json")
        );
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));
        let status = sample();

        store.write(&status).unwrap();
        assert_eq!(store.read().unwrap(), Some(status));
    }

    #[test]
    fn write_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));

        store.write(&sample()).unwrap();
        let newer = HealthStatus {
            total_executions: 8,
            ..sample()
        };
        store.write(&newer).unwrap();

        assert_eq!(store.read().unwrap().unwrap().total_executions, 8);
        // The temporary file does not linger.
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileStateStore::new(&path).read().unwrap_err();
        assert!(matches!(err, StateError::Corrupt(_)));
    }

    #[test]
    fn missing_field_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"timestamp": "2024-11-20T10:15:30Z", "is_alive": true}"#).unwrap();

        let err = FileStateStore::new(&path).read().unwrap_err();
        assert!(matches!(err, StateError::Corrupt(_)));
    }

    #[test]
    fn negative_uptime_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut value = serde_json::to_value(sample()).unwrap();
        value["uptime_seconds"] = serde_json::json!(-5.0);
        fs::write(&path, value.to_string()).unwrap();

        let err = FileStateStore::new(&path).read().unwrap_err();
        assert!(matches!(err, StateError::Corrupt(_)));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("missing").join("state.json"));
        let err = store.write(&sample()).unwrap_err();
        assert!(matches!(err, StateError::Write(_)));
    }
}
