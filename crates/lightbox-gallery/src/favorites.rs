//! Ordered favorites index with write-through persistence.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use lightbox_core::persist;
use lightbox_core::{ImageId, LightboxError, Result};

/// What a [`FavoritesIndex::set`] call actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The id was absent and is now favorited.
    Added,
    /// The id was favorited and is now removed.
    Removed,
    /// The index already matched the requested state.
    Unchanged,
}

/// Ids of favorited images, most recently toggled first.
///
/// The index is the source of truth for favorite membership; the
/// per-record flag carried by the stores is a denormalized copy.
pub struct FavoritesIndex {
    path: PathBuf,
    capacity: usize,
    ids: Mutex<Vec<ImageId>>,
}

impl FavoritesIndex {
    /// Loads the index at `path`, trimming to `capacity` if the stored
    /// list is longer.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let mut ids: Vec<ImageId> = persist::load_json_or_default(&path);
        if ids.len() > capacity {
            ids.truncate(capacity);
        }
        debug!(path = %path.display(), count = ids.len(), "Opened favorites index");
        Self {
            path,
            capacity,
            ids: Mutex::new(ids),
        }
    }

    /// Drives the index toward `favorite` for `id`. Requests that match
    /// the current state are no-ops and report [`ToggleOutcome::Unchanged`].
    pub fn set(&self, id: &ImageId, favorite: bool) -> Result<ToggleOutcome> {
        let capacity = self.capacity;
        self.mutate(|ids| {
            let present = ids.iter().any(|existing| existing == id);
            match (favorite, present) {
                (true, false) => {
                    ids.insert(0, id.clone());
                    ids.truncate(capacity);
                    ToggleOutcome::Added
                }
                (false, true) => {
                    ids.retain(|existing| existing != id);
                    ToggleOutcome::Removed
                }
                _ => ToggleOutcome::Unchanged,
            }
        })
    }

    /// Favorited ids, most recently toggled first.
    pub fn ids(&self) -> Result<Vec<ImageId>> {
        Ok(self.lock()?.clone())
    }

    /// Membership set for overlaying onto merged gallery views.
    pub fn id_set(&self) -> Result<HashSet<ImageId>> {
        Ok(self.lock()?.iter().cloned().collect())
    }

    pub fn contains(&self, id: &ImageId) -> Result<bool> {
        Ok(self.lock()?.iter().any(|existing| existing == id))
    }

    /// Drops every listed id, returning the ones that were present.
    pub fn remove_many(&self, ids: &[ImageId]) -> Result<Vec<ImageId>> {
        let doomed: HashSet<&ImageId> = ids.iter().collect();
        self.mutate(|current| {
            let mut removed = Vec::new();
            current.retain(|existing| {
                if doomed.contains(existing) {
                    removed.push(existing.clone());
                    false
                } else {
                    true
                }
            });
            removed
        })
    }

    /// Replaces the whole index, for import. Respects capacity.
    pub fn replace_all(&self, ids: Vec<ImageId>) -> Result<()> {
        let capacity = self.capacity;
        self.mutate(|current| {
            *current = ids;
            current.truncate(capacity);
        })
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<ImageId>) -> T) -> Result<T> {
        let mut ids = self.lock()?;
        let out = f(&mut ids);
        persist::write_json_atomic(&self.path, &*ids)?;
        Ok(out)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ImageId>>> {
        self.ids
            .lock()
            .map_err(|e| LightboxError::Storage(format!("Favorites index lock poisoned: {}", e)))
    }
}

impl std::fmt::Debug for FavoritesIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesIndex")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
