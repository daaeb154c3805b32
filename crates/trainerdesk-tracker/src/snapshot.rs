//! Snapshot stores for resuming a tracked task across restarts.
//!
//! A snapshot is a hint: the tracker re-validates it by polling and never
//! treats it as the authoritative state of a task. Stores are decoupled from
//! any particular storage so the tracker can run with [`NoSnapshots`] in
//! tests and a [`FileSnapshotStore`] in the CLI.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::status::TaskStatus;
use crate::task::TaskId;

/// Last known state of the tracked task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Task being tracked.
    pub task_id: TaskId,
    /// Last status seen, if any.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// When the snapshot was written.
    pub saved_at: DateTime<Utc>,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(task_id: TaskId, status: Option<TaskStatus>) -> Self {
        Self {
            task_id,
            status,
            saved_at: Utc::now(),
        }
    }

    /// Age of the snapshot relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.saved_at)
    }
}

/// Storage for the single in-flight task snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Load the stored snapshot, if any.
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Remove the stored snapshot. Removing nothing is not an error.
    fn clear(&self) -> Result<()>;
}

/// A store that keeps nothing.
#[derive(Debug, Clone, Default)]
pub struct NoSnapshots;

impl SnapshotStore for NoSnapshots {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(None)
    }

    fn save(&self, _snapshot: &Snapshot) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// In-process store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
        }
    }

    /// Current contents without going through the trait.
    pub fn peek(&self) -> Option<Snapshot> {
        self.slot.lock().clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.slot.lock() = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// JSON file store.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, op: &str, e: std::io::Error) -> Error {
        Error::Snapshot(format!("failed to {} {}: {}", op, self.path.display(), e))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("read", e)),
        };
        serde_json::from_str(&contents).map(Some).map_err(|e| {
            Error::Snapshot(format!("corrupt snapshot {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", e))?;
        }
        let contents = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::Snapshot(format!("failed to serialize snapshot: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| self.io_error("write", e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error("replace", e))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ProgressInfo;

    fn sample() -> Snapshot {
        Snapshot::new(
            TaskId::parse("abc123").unwrap(),
            Some(TaskStatus::Progress(ProgressInfo {
                current: Some(2),
                total: Some(5),
                status: Some("Processed 2/5 files".to_string()),
                step: None,
            })),
        )
    }

    #[test]
    fn test_no_snapshots() {
        let store = NoSnapshots;
        store.save(&sample()).unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&sample()).unwrap();
        assert_eq!(store.peek().unwrap().task_id.as_str(), "abc123");
        store.clear().unwrap();
        assert!(store.peek().is_none());
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("cache").join("upload.json"));

        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();

        let snapshot = sample();
        store.save(&snapshot).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), Some(snapshot));

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("upload.json"));
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(Error::Snapshot(_))));
    }

    #[test]
    fn test_file_store_rejects_sentinel_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("upload.json"));
        std::fs::write(
            store.path(),
            r#"{"task_id":"undefined","status":null,"saved_at":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn test_snapshot_age() {
        let snapshot = sample();
        let later = snapshot.saved_at + chrono::Duration::minutes(5);
        assert_eq!(snapshot.age(later), chrono::Duration::minutes(5));
    }
}
