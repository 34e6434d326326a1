//! Fan-out writes and snapshot reads over the registered tiers.

use std::sync::Arc;

use tracing::{debug, warn};

use lightbox_core::config::TiersConfig;
use lightbox_core::{ImageId, ImageRecord, Result, SourceTier};

use crate::file::JsonFileStore;
use crate::memory::MemoryStore;
use crate::namespace::Namespace;
use crate::sqlite::SqliteStore;
use crate::tier::{FanoutReport, TierStore, TierWriteOutcome, TierWriteStatus};

/// Holds every local tier in descending priority order and runs each
/// mutation against all of them.
///
/// One adapter failing never aborts the others; the per-tier outcomes are
/// collected into a [`FanoutReport`] and the caller decides what the
/// overall disposition means.
pub struct TierRegistry {
    stores: Vec<Arc<dyn TierStore>>,
}

impl TierRegistry {
    /// `stores` must already be in descending priority order.
    pub fn new(stores: Vec<Arc<dyn TierStore>>) -> Self {
        Self { stores }
    }

    /// Opens the standard local stack for a profile: database, then JSON
    /// file, then memory.
    pub fn open(namespace: &Namespace, tiers: &TiersConfig) -> Result<Self> {
        let sqlite = SqliteStore::open(&namespace.database_path(), tiers.database_capacity)?;
        let file = JsonFileStore::open(namespace.gallery_path(), tiers.file_capacity)?;
        let memory = MemoryStore::new(tiers.memory_capacity);

        Ok(Self::new(vec![
            Arc::new(sqlite),
            Arc::new(file),
            Arc::new(memory),
        ]))
    }

    pub fn stores(&self) -> &[Arc<dyn TierStore>] {
        &self.stores
    }

    pub fn tiers(&self) -> Vec<SourceTier> {
        self.stores.iter().map(|s| s.tier()).collect()
    }

    /// Writes the record to every tier.
    pub fn fan_out_save(&self, record: &ImageRecord) -> FanoutReport {
        let report = self.fan_out(|store| store.save(record).map(|()| true));
        debug!(
            id = %record.id,
            applied = report.applied(),
            failed = report.failed(),
            "Fanned out save"
        );
        report
    }

    /// Deletes the id from every tier. `Applied` outcomes mark the tiers
    /// that actually held it.
    pub fn fan_out_delete(&self, id: &ImageId) -> FanoutReport {
        let report = self.fan_out(|store| store.delete(id));
        debug!(
            id = %id,
            applied = report.applied(),
            failed = report.failed(),
            "Fanned out delete"
        );
        report
    }

    /// Updates the favorite flag in every tier that holds the id.
    pub fn fan_out_favorite(&self, id: &ImageId, favorite: bool) -> FanoutReport {
        self.fan_out(|store| store.update_favorite(id, favorite))
    }

    /// Replaces the contents of every tier, for import.
    pub fn fan_out_replace_all(&self, records: &[ImageRecord]) -> FanoutReport {
        self.fan_out(|store| store.replace_all(records).map(|()| true))
    }

    fn fan_out(&self, op: impl Fn(&dyn TierStore) -> Result<bool>) -> FanoutReport {
        let mut outcomes = Vec::with_capacity(self.stores.len());
        for store in &self.stores {
            let status = match op(store.as_ref()) {
                Ok(true) => TierWriteStatus::Applied,
                Ok(false) => TierWriteStatus::NotFound,
                Err(e) => {
                    warn!(tier = store.tier().as_str(), error = %e, "Tier write failed");
                    TierWriteStatus::Failed(e.to_string())
                }
            };
            outcomes.push(TierWriteOutcome {
                tier: store.tier(),
                status,
            });
        }
        FanoutReport::new(outcomes)
    }

    /// Looks up a record, walking tiers in priority order. Read failures
    /// are absorbed so a dead tier cannot mask a live one below it.
    pub fn find_record(&self, id: &ImageId) -> Option<ImageRecord> {
        for store in &self.stores {
            match store.find(id) {
                Ok(Some(mut record)) => {
                    record.source = Some(store.tier());
                    return Some(record);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(tier = store.tier().as_str(), error = %e, "Tier lookup failed")
                }
            }
        }
        None
    }

    /// Reads every tier, in priority order, for merging. A tier that fails
    /// to read is dropped from the snapshot rather than failing the whole
    /// read.
    pub fn snapshot_tiers(&self) -> Vec<(SourceTier, Vec<ImageRecord>)> {
        self.stores
            .iter()
            .filter_map(|store| match store.get_all() {
                Ok(records) => Some((store.tier(), records)),
                Err(e) => {
                    warn!(tier = store.tier().as_str(), error = %e, "Tier read failed");
                    None
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for TierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierRegistry")
            .field("tiers", &self.tiers())
            .finish()
    }
}
