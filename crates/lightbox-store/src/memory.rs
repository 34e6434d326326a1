//! In-memory storage tier.

use std::sync::Mutex;

use lightbox_core::{ImageId, ImageRecord, LightboxError, Result, SourceTier};

use crate::tier::TierStore;

/// Volatile adapter holding records in a front-is-newest vector.
///
/// Lowest priority tier. Everything is lost on drop; it exists so reads
/// stay warm when the durable tiers are slow or unavailable.
#[derive(Debug)]
pub struct MemoryStore {
    capacity: usize,
    records: Mutex<Vec<ImageRecord>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(Vec::new()),
        }
    }

    fn with_records<T>(&self, f: impl FnOnce(&mut Vec<ImageRecord>) -> T) -> Result<T> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| LightboxError::Storage(format!("Memory store lock poisoned: {}", e)))?;
        Ok(f(&mut records))
    }
}

impl TierStore for MemoryStore {
    fn tier(&self) -> SourceTier {
        SourceTier::Memory
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn save(&self, record: &ImageRecord) -> Result<()> {
        record.validate()?;
        let capacity = self.capacity;
        self.with_records(|records| {
            records.retain(|r| r.id != record.id);
            records.insert(0, record.clone());
            records.truncate(capacity);
        })
    }

    fn get_all(&self) -> Result<Vec<ImageRecord>> {
        self.with_records(|records| records.clone())
    }

    fn delete(&self, id: &ImageId) -> Result<bool> {
        self.with_records(|records| {
            let before = records.len();
            records.retain(|r| &r.id != id);
            records.len() < before
        })
    }

    fn update_favorite(&self, id: &ImageId, favorite: bool) -> Result<bool> {
        self.with_records(|records| match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.is_favorite = favorite;
                true
            }
            None => false,
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_records(|records| records.clear())
    }
}
