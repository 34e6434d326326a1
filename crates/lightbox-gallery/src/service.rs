//! The gallery engine: generation intake, merged reads, favorites,
//! deletion, stats, and archive transfer for the active profile.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use lightbox_core::config::LightboxConfig;
use lightbox_core::{
    HistoryEntry, ImageId, ImageRecord, LightboxError, RecordDraft, Result, SourceTier, StatsEvent,
    Timestamp,
};
use lightbox_remote::{NullRemote, RemoteQuery, RemoteSource};
use lightbox_stats::{StatsBus, StatsOverview, StatsSnapshot, StorageUsage, SubscriberId, TierUsage};
use lightbox_store::{merge_sources, resolve_data_dir, FanoutReport, NamespaceManager};

use crate::archive::GalleryArchive;
use crate::context::ProfileContext;
use crate::favorites::ToggleOutcome;
use crate::query::{run_query, GalleryPage, GalleryQuery};

/// A completed generation: the resolved record plus the per-tier write
/// outcomes.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub record: ImageRecord,
    pub report: FanoutReport,
}

/// Outcome of deleting one record across the tiers and the remote.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub report: FanoutReport,
    pub remote_deleted: bool,
    /// True when a configured remote could not be consulted.
    pub degraded: bool,
}

/// Outcome of a bulk delete. Ids absent everywhere are reported in
/// `missing` rather than failing the batch.
#[derive(Debug, Clone)]
pub struct BulkDeleteOutcome {
    pub deleted: Vec<ImageId>,
    pub missing: Vec<ImageId>,
    pub degraded: bool,
}

/// Outcome of a favorite toggle: what the index did, how the flag
/// propagated to the tiers, and whether the remote confirmed it.
#[derive(Debug, Clone)]
pub struct ToggleReport {
    pub outcome: ToggleOutcome,
    pub favorite: bool,
    pub report: FanoutReport,
    pub remote_updated: bool,
    pub degraded: bool,
}

/// Outcome of a bulk favorite toggle. Ids unknown everywhere are
/// reported in `missing` rather than failing the batch.
#[derive(Debug, Clone)]
pub struct BulkToggleOutcome {
    pub toggled: Vec<ImageId>,
    pub missing: Vec<ImageId>,
    pub degraded: bool,
}

/// Today's generation budget, measured against the configured daily
/// limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationAllowance {
    pub allowed: bool,
    pub used: u64,
    pub limit: u64,
    /// Start of the next UTC day, when the counter resets.
    pub resets_at: Timestamp,
}

/// What an import actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub images: usize,
    pub history: usize,
    pub favorites: usize,
}

/// The engine owning the active profile.
///
/// All state lives in the [`ProfileContext`]; switching identity swaps
/// the whole context while the bus and its subscribers stay. Writes fan
/// out to every local tier and are accepted while at least one tier
/// applied them; the remote is best-effort on every path and its
/// failures only ever degrade, never abort.
pub struct GalleryService<R: RemoteSource = NullRemote> {
    config: LightboxConfig,
    manager: NamespaceManager,
    bus: StatsBus,
    remote: Option<R>,
    context: ProfileContext,
}

impl GalleryService<NullRemote> {
    /// An engine with no remote source. Reads are never degraded.
    pub fn local(config: LightboxConfig) -> Result<Self> {
        Self::build(config, None)
    }
}

impl<R: RemoteSource> GalleryService<R> {
    /// An engine backed by `remote`, honoring the config switch that
    /// disables remote reads entirely.
    pub fn with_remote(config: LightboxConfig, remote: R) -> Result<Self> {
        let remote = config.remote.enabled.then_some(remote);
        Self::build(config, remote)
    }

    fn build(config: LightboxConfig, remote: Option<R>) -> Result<Self> {
        let manager = NamespaceManager::new(resolve_data_dir(&config.general.data_dir));
        let bus = StatsBus::new();
        let namespace = manager.resume()?;
        let context = ProfileContext::open(namespace, &config, bus.clone())?;

        Ok(Self {
            config,
            manager,
            bus,
            remote,
            context,
        })
    }

    pub fn config(&self) -> &LightboxConfig {
        &self.config
    }

    pub fn identity(&self) -> &str {
        self.context.identity()
    }

    pub fn bus(&self) -> &StatsBus {
        &self.bus
    }

    /// Registers a stats listener. It receives the new snapshot after
    /// every mutation, on whichever profile is active.
    pub fn subscribe(
        &self,
        listener: impl Fn(&StatsSnapshot) + Send + Sync + 'static,
    ) -> SubscriberId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Swaps the active profile, creating its stores on first use and
    /// recording it as the current identity. Subscribers are notified
    /// with the new profile's counters.
    pub fn switch_profile(&mut self, identity: &str) -> Result<()> {
        if identity.trim() == self.context.identity() {
            return Ok(());
        }

        let namespace = self.manager.open(identity)?;
        let next = ProfileContext::open(namespace, &self.config, self.bus.clone())?;
        // Drop the old context first so its cache subscription is gone
        // before the new profile's snapshot goes out.
        let previous = std::mem::replace(&mut self.context, next);
        drop(previous);

        let snapshot = self.context.ledger.snapshot()?;
        self.bus.publish(&snapshot);
        info!(identity = self.context.identity(), "Switched profile");
        Ok(())
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Accepts a completed generation: resolves defaults, enforces the
    /// daily limit, fans the record out to every tier, and logs it.
    ///
    /// Fails with `QuotaExceeded` when today's budget is spent and with
    /// `AllBackendsFailed` when no tier accepted the record. History and
    /// stats failures are absorbed; the record is already durable by
    /// then.
    pub fn record_generation(&self, draft: RecordDraft) -> Result<GenerationOutcome> {
        let allowance = self.generation_allowance()?;
        if !allowance.allowed {
            return Err(LightboxError::QuotaExceeded(format!(
                "daily limit of {} generations reached",
                allowance.limit
            )));
        }

        let record = draft.into_record();
        record.validate()?;

        let report = self.context.registry.fan_out_save(&record);
        if !report.any_applied() {
            return Err(LightboxError::AllBackendsFailed);
        }

        if let Err(e) = self.context.history.append(HistoryEntry::for_record(&record)) {
            warn!(id = %record.id, error = %e, "History append failed");
        }
        self.record_stat(StatsEvent::ImageGenerated {
            bytes: record.file_size_bytes,
            created_at: record.created_at,
        });

        info!(
            id = %record.id,
            disposition = ?report.disposition(),
            "Recorded generation"
        );
        Ok(GenerationOutcome { record, report })
    }

    /// Today's usage against the configured daily limit.
    pub fn generation_allowance(&self) -> Result<GenerationAllowance> {
        let now = Timestamp::now();
        let snapshot = self.context.ledger.snapshot()?;
        let used = if snapshot.daily_date == now.day_key() {
            snapshot.generated_today
        } else {
            0
        };
        let limit = self.config.stats.daily_limit as u64;

        Ok(GenerationAllowance {
            allowed: used < limit,
            used,
            limit,
            resets_at: now.next_utc_midnight(),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Serves one gallery page: remote page (when configured) merged over
    /// every local tier, then search, filter, sort, and pagination.
    ///
    /// A remote failure or timeout never fails the read; the page is
    /// served from local tiers alone and flagged degraded.
    pub async fn gallery_page(&self, query: &GalleryQuery) -> Result<GalleryPage> {
        let mut degraded = false;
        let mut sources: Vec<(SourceTier, Vec<ImageRecord>)> = Vec::new();

        if let Some(remote) = &self.remote {
            let mut remote_query = RemoteQuery::page(
                query.page.max(1),
                query.limit.clamp(1, self.config.gallery.max_page_size),
            );
            if let Some(search) = &query.search {
                if !search.trim().is_empty() {
                    remote_query.search = Some(search.trim().to_string());
                }
            }

            match self.with_timeout(remote.fetch_page(&remote_query)).await {
                Some(page) => sources.push((SourceTier::Remote, page.records)),
                None => degraded = true,
            }
        }

        sources.extend(self.context.registry.snapshot_tiers());
        let mut records = merge_sources(sources);

        // A record counts as favorite when either its flag or the index
        // says so.
        let favorite_ids = self.context.favorites.id_set()?;
        for record in &mut records {
            if favorite_ids.contains(&record.id) {
                record.is_favorite = true;
            }
        }

        let mut page = run_query(
            records,
            query,
            Timestamp::now(),
            self.config.gallery.max_page_size,
        );
        page.degraded = degraded;
        Ok(page)
    }

    /// Looks one record up across the local tiers, with the favorite
    /// overlay applied.
    pub fn find_image(&self, id: &ImageId) -> Result<Option<ImageRecord>> {
        let mut record = self.context.registry.find_record(id);
        if let Some(record) = &mut record {
            if !record.is_favorite && self.context.favorites.contains(id)? {
                record.is_favorite = true;
            }
        }
        Ok(record)
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Removes one record from every tier that holds it and, when
    /// configured, from the remote. The lifetime counters are refunded
    /// exactly once however many tiers held a copy.
    ///
    /// Fails with `RecordNotFound` when nothing held the id.
    pub async fn delete_image(&self, id: &ImageId) -> Result<DeleteOutcome> {
        let local = self.context.registry.find_record(id);
        let report = self.context.registry.fan_out_delete(id);

        let mut degraded = false;
        let mut remote_deleted = false;
        if let Some(remote) = &self.remote {
            match self.with_timeout(remote.delete(id)).await {
                Some(removed) => remote_deleted = removed,
                None => degraded = true,
            }
        }

        if !report.any_applied() && !remote_deleted {
            return Err(LightboxError::RecordNotFound {
                id: id.as_str().to_string(),
            });
        }

        if report.any_applied() {
            if let Some(record) = &local {
                self.record_stat(StatsEvent::ImageDeleted {
                    bytes: record.file_size_bytes,
                    created_at: record.created_at,
                });
            }
        }
        self.unfavorite_quietly(id);

        info!(id = %id, remote_deleted, degraded, "Deleted image");
        Ok(DeleteOutcome {
            report,
            remote_deleted,
            degraded,
        })
    }

    /// Deletes a batch. Per-id misses land in `missing` instead of
    /// failing the rest of the batch.
    pub async fn delete_images(&self, ids: &[ImageId]) -> Result<BulkDeleteOutcome> {
        let mut degraded = false;
        let mut remote_removed: HashSet<ImageId> = HashSet::new();
        if let Some(remote) = &self.remote {
            match self.with_timeout(remote.delete_many(ids)).await {
                Some(removed) => remote_removed = removed.into_iter().collect(),
                None => degraded = true,
            }
        }

        let mut deleted = Vec::new();
        let mut missing = Vec::new();
        for id in ids {
            let local = self.context.registry.find_record(id);
            let report = self.context.registry.fan_out_delete(id);

            if report.any_applied() {
                if let Some(record) = &local {
                    self.record_stat(StatsEvent::ImageDeleted {
                        bytes: record.file_size_bytes,
                        created_at: record.created_at,
                    });
                }
            }

            if report.any_applied() || remote_removed.contains(id) {
                self.unfavorite_quietly(id);
                deleted.push(id.clone());
            } else {
                missing.push(id.clone());
            }
        }

        info!(
            deleted = deleted.len(),
            missing = missing.len(),
            degraded,
            "Bulk delete finished"
        );
        Ok(BulkDeleteOutcome {
            deleted,
            missing,
            degraded,
        })
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Drives the favorite state of `id` toward `favorite`: updates the
    /// index, adjusts the counter when the index actually changed, then
    /// propagates the flag to every tier holding a copy and to the
    /// remote.
    ///
    /// Repeating a toggle is a no-op. Fails with `RecordNotFound` only
    /// when the id is unknown to every tier, the index, and the remote.
    pub async fn toggle_favorite(&self, id: &ImageId, favorite: bool) -> Result<ToggleReport> {
        let local_known = self.context.registry.find_record(id).is_some();
        let in_list = self.context.favorites.contains(id)?;

        let mut degraded = false;
        let mut remote_updated = false;
        if let Some(remote) = &self.remote {
            match self.with_timeout(remote.set_favorite(id, favorite)).await {
                Some(updated) => remote_updated = updated,
                None => degraded = true,
            }
        }

        if !local_known && !in_list && !remote_updated {
            return Err(LightboxError::RecordNotFound {
                id: id.as_str().to_string(),
            });
        }

        let outcome = self.context.favorites.set(id, favorite)?;
        match outcome {
            ToggleOutcome::Added => self.record_stat(StatsEvent::FavoriteAdded {
                timestamp: Timestamp::now(),
            }),
            ToggleOutcome::Removed => self.record_stat(StatsEvent::FavoriteRemoved {
                timestamp: Timestamp::now(),
            }),
            ToggleOutcome::Unchanged => {}
        }

        let report = self.context.registry.fan_out_favorite(id, favorite);
        debug!(id = %id, ?outcome, favorite, "Toggled favorite");
        Ok(ToggleReport {
            outcome,
            favorite,
            report,
            remote_updated,
            degraded,
        })
    }

    /// Toggles a batch toward `favorite`. Per-id misses land in
    /// `missing` instead of failing the rest of the batch; counters move
    /// only for ids whose index entry actually changed.
    pub async fn toggle_favorites(
        &self,
        ids: &[ImageId],
        favorite: bool,
    ) -> Result<BulkToggleOutcome> {
        let mut degraded = false;
        let mut remote_updated: HashSet<ImageId> = HashSet::new();
        if let Some(remote) = &self.remote {
            match self.with_timeout(remote.set_favorite_many(ids, favorite)).await {
                Some(updated) => remote_updated = updated.into_iter().collect(),
                None => degraded = true,
            }
        }

        let mut toggled = Vec::new();
        let mut missing = Vec::new();
        for id in ids {
            let local_known = self.context.registry.find_record(id).is_some();
            let in_list = self.context.favorites.contains(id)?;
            if !local_known && !in_list && !remote_updated.contains(id) {
                missing.push(id.clone());
                continue;
            }

            match self.context.favorites.set(id, favorite)? {
                ToggleOutcome::Added => self.record_stat(StatsEvent::FavoriteAdded {
                    timestamp: Timestamp::now(),
                }),
                ToggleOutcome::Removed => self.record_stat(StatsEvent::FavoriteRemoved {
                    timestamp: Timestamp::now(),
                }),
                ToggleOutcome::Unchanged => {}
            }
            self.context.registry.fan_out_favorite(id, favorite);
            toggled.push(id.clone());
        }

        info!(
            toggled = toggled.len(),
            missing = missing.len(),
            favorite,
            degraded,
            "Bulk toggle finished"
        );
        Ok(BulkToggleOutcome {
            toggled,
            missing,
            degraded,
        })
    }

    /// Favorited ids, most recently toggled first.
    pub fn favorite_ids(&self) -> Result<Vec<ImageId>> {
        self.context.favorites.ids()
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Generation history, newest first.
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.context.history.entries()
    }

    /// Removes history entries by id, returning how many existed.
    pub fn remove_history_entries(&self, ids: &[Uuid]) -> Result<usize> {
        self.context.history.remove_entries(ids)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.context.history.clear()
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// The persisted counters, as of the last mutation.
    pub fn stats_snapshot(&self) -> Result<StatsSnapshot> {
        self.context.ledger.snapshot()
    }

    /// The dashboard view: persisted counters with stale windows zeroed
    /// and the remaining daily budget attached.
    pub fn stats_overview(&self) -> Result<StatsOverview> {
        let snapshot = self.context.ledger.snapshot()?;
        Ok(StatsOverview::project(
            &snapshot,
            self.config.stats.daily_limit as u64,
            Timestamp::now(),
        ))
    }

    /// The cross-tier storage footprint, served from the TTL cache. Every
    /// stats mutation invalidates the cache, so a post-write read always
    /// recomputes.
    pub fn storage_usage(&self) -> StorageUsage {
        self.context.usage_cache.get_or_compute(|| {
            let sources = self.context.registry.snapshot_tiers();
            let tiers: Vec<TierUsage> = sources
                .iter()
                .map(|(tier, records)| TierUsage::from_records(*tier, records))
                .collect();
            let merged = merge_sources(sources);
            StorageUsage::compute(&merged, tiers, self.config.stats.storage_quota_mb)
        })
    }

    // =========================================================================
    // Archive
    // =========================================================================

    /// Packages the whole profile, as the gallery sees it, into one
    /// archive document.
    pub fn export_archive(&self) -> Result<GalleryArchive> {
        let mut records = merge_sources(self.context.registry.snapshot_tiers());

        let favorite_ids = self.context.favorites.id_set()?;
        for record in &mut records {
            if favorite_ids.contains(&record.id) {
                record.is_favorite = true;
            }
        }

        let archive = GalleryArchive::new(
            records,
            self.context.ledger.snapshot()?,
            self.context.history.entries()?,
            self.context.favorites.ids()?,
        );
        info!(
            images = archive.images.len(),
            history = archive.history.len(),
            "Exported archive"
        );
        Ok(archive)
    }

    /// Replaces the profile's stores wholesale with the archive contents.
    ///
    /// All-or-nothing: the version and every record are checked before
    /// any store is touched, and a rejected archive leaves the profile
    /// untouched.
    pub fn import_archive(&self, archive: GalleryArchive) -> Result<ImportOutcome> {
        archive.validate()?;
        for record in &archive.images {
            record.validate()?;
        }

        let report = self.context.registry.fan_out_replace_all(&archive.images);
        if !report.any_applied() {
            return Err(LightboxError::AllBackendsFailed);
        }

        let outcome = ImportOutcome {
            images: archive.images.len(),
            history: archive.history.len(),
            favorites: archive.favorites.len(),
        };
        self.context.history.replace_all(archive.history)?;
        self.context.favorites.replace_all(archive.favorites)?;
        // Restored last so the notification carries the final state.
        self.context.ledger.restore(archive.stats)?;

        info!(
            images = outcome.images,
            history = outcome.history,
            favorites = outcome.favorites,
            "Imported archive"
        );
        Ok(outcome)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Option<T> {
        let timeout = Duration::from_millis(self.config.remote.timeout_ms);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(error = %e, "Remote call failed");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.remote.timeout_ms,
                    "Remote call timed out"
                );
                None
            }
        }
    }

    fn record_stat(&self, event: StatsEvent) {
        if let Err(e) = self.context.ledger.record(event) {
            warn!(error = %e, "Stats update failed");
        }
    }

    /// Drops `id` from the favorites index after a successful delete,
    /// refunding the counter when it was actually listed.
    fn unfavorite_quietly(&self, id: &ImageId) {
        match self.context.favorites.set(id, false) {
            Ok(ToggleOutcome::Removed) => self.record_stat(StatsEvent::FavoriteRemoved {
                timestamp: Timestamp::now(),
            }),
            Ok(_) => {}
            Err(e) => warn!(id = %id, error = %e, "Favorites cleanup failed"),
        }
    }
}

impl<R: RemoteSource> std::fmt::Debug for GalleryService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GalleryService")
            .field("identity", &self.context.identity())
            .field("remote", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}
