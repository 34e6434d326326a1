//! Append-only generation history.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use lightbox_core::persist;
use lightbox_core::{HistoryEntry, LightboxError, Result};

/// Per-profile log of completed generations, newest first.
///
/// Entries are immutable once appended. The only removals are bulk
/// deletion by entry id and clearing the whole log; there is no
/// single-entry edit path.
pub struct HistoryLog {
    path: PathBuf,
    capacity: usize,
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryLog {
    /// Loads the log at `path`, falling back to its backup and then to an
    /// empty log. A capacity below the stored count trims the oldest
    /// entries on open.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let mut entries: Vec<HistoryEntry> = persist::load_json_or_default(&path);
        if entries.len() > capacity {
            entries.truncate(capacity);
        }
        debug!(path = %path.display(), count = entries.len(), "Opened history log");
        Self {
            path,
            capacity,
            entries: Mutex::new(entries),
        }
    }

    /// Appends one entry at the front, evicting past capacity.
    pub fn append(&self, entry: HistoryEntry) -> Result<()> {
        let capacity = self.capacity;
        self.mutate(|entries| {
            entries.insert(0, entry);
            entries.truncate(capacity);
        })
    }

    /// Every entry, newest first.
    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.lock()?.clone())
    }

    /// Removes the entries with the given ids. Returns how many were
    /// actually present.
    pub fn remove_entries(&self, ids: &[Uuid]) -> Result<usize> {
        let doomed: HashSet<Uuid> = ids.iter().copied().collect();
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|e| !doomed.contains(&e.id));
            before - entries.len()
        })
    }

    /// Empties the log.
    pub fn clear(&self) -> Result<()> {
        self.mutate(|entries| entries.clear())
    }

    /// Replaces the whole log, for import. Respects capacity.
    pub fn replace_all(&self, entries: Vec<HistoryEntry>) -> Result<()> {
        let capacity = self.capacity;
        self.mutate(|current| {
            *current = entries;
            current.truncate(capacity);
        })
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<HistoryEntry>) -> T) -> Result<T> {
        let mut entries = self.lock()?;
        let out = f(&mut entries);
        persist::write_json_atomic(&self.path, &*entries)?;
        Ok(out)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<HistoryEntry>>> {
        self.entries
            .lock()
            .map_err(|e| LightboxError::Storage(format!("History log lock poisoned: {}", e)))
    }
}

impl std::fmt::Debug for HistoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLog")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
