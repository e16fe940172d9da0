//! Durable storage slots for the task collection.
//!
//! The store never talks to the filesystem directly. It holds a
//! [`TaskStorage`] and hands it the full collection after every mutation.
//! Two slots are provided: a JSON file on disk and an in-process buffer.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::task::Task;

/// Persistence port: read the snapshot once at startup, overwrite it on every change.
pub trait TaskStorage {
    /// Load the stored collection. `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Vec<Task>>>;

    /// Replace the stored collection with `tasks`.
    fn save(&self, tasks: &[Task]) -> Result<()>;
}

/// A single JSON file holding the array of all tasks.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<Vec<Task>>> {
        let buf = match fs::read_to_string(&self.path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let tasks = serde_json::from_str(&buf)?;
        Ok(Some(tasks))
    }

    /// Atomic-ish write via temp file + rename.
    fn save(&self, tasks: &[Task]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(tasks)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process slot holding the serialised snapshot.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with raw contents, as if written by an earlier run.
    pub fn with_contents(raw: impl Into<String>) -> Self {
        let storage = Self::default();
        *storage.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw.into());
        storage
    }

    /// Raw slot contents.
    pub fn contents(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TaskStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<Task>>> {
        match self.contents() {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        }
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        let data = serde_json::to_string(tasks)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(data);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<S: TaskStorage + ?Sized> TaskStorage for Box<S> {
    fn load(&self) -> Result<Option<Vec<Task>>> {
        (**self).load()
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        (**self).save(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fields::QuadrantType;
    use chrono::NaiveDate;

    fn sample(id: &str) -> Task {
        Task {
            id: id.into(),
            name: format!("task {id}"),
            description: String::new(),
            due_date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            labels: vec!["ops".into()],
            completed: false,
            quadrant: QuadrantType::Delegate,
            created_at: 0,
        }
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("tasks.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn file_round_trip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");
        let storage = JsonFileStorage::new(&path);
        storage.save(&[sample("a"), sample("b")]).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded, vec![sample("a"), sample("b")]);
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStorage::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn memory_storage_shares_slot_between_clones() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();
        storage.save(&[sample("x")]).unwrap();
        assert_eq!(handle.save_count(), 1);
        assert_eq!(handle.load().unwrap().unwrap(), vec![sample("x")]);
    }
}
