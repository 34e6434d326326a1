//! JSON file storage tier.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use lightbox_core::persist;
use lightbox_core::{ImageId, ImageRecord, LightboxError, Result, SourceTier};

use crate::tier::TierStore;

/// Adapter backed by a single JSON document on disk.
///
/// The whole record list is held in memory and written through on every
/// mutation with an atomic replace, so a crash mid-write leaves either the
/// previous document or the new one, never a torn file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    capacity: usize,
    records: Mutex<Vec<ImageRecord>>,
}

impl JsonFileStore {
    /// Loads the document at `path`, falling back to its backup and then to
    /// an empty list. A capacity lower than the stored count trims on open.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();
        let mut records: Vec<ImageRecord> = persist::load_json_or_default(&path);
        if records.len() > capacity {
            records.truncate(capacity);
        }
        debug!(path = %path.display(), count = records.len(), "Opened file tier");
        Ok(Self {
            path,
            capacity,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<ImageRecord>) -> T) -> Result<T> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| LightboxError::Storage(format!("File store lock poisoned: {}", e)))?;
        let out = f(&mut records);
        persist::write_json_atomic(&self.path, &*records)?;
        Ok(out)
    }
}

impl TierStore for JsonFileStore {
    fn tier(&self) -> SourceTier {
        SourceTier::File
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn save(&self, record: &ImageRecord) -> Result<()> {
        record.validate()?;
        let capacity = self.capacity;
        self.mutate(|records| {
            records.retain(|r| r.id != record.id);
            records.insert(0, record.clone());
            records.truncate(capacity);
        })
    }

    fn get_all(&self) -> Result<Vec<ImageRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| LightboxError::Storage(format!("File store lock poisoned: {}", e)))?;
        Ok(records.clone())
    }

    fn delete(&self, id: &ImageId) -> Result<bool> {
        self.mutate(|records| {
            let before = records.len();
            records.retain(|r| &r.id != id);
            records.len() < before
        })
    }

    fn update_favorite(&self, id: &ImageId, favorite: bool) -> Result<bool> {
        self.mutate(|records| match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.is_favorite = favorite;
                true
            }
            None => false,
        })
    }

    fn clear(&self) -> Result<()> {
        self.mutate(|records| records.clear())
    }
}
