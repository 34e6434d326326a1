//! Event-driven mutation and persistence of the stats snapshot.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use lightbox_core::persist;
use lightbox_core::{LightboxError, Result, StatsEvent, Timestamp};

use crate::bus::StatsBus;
use crate::snapshot::StatsSnapshot;

/// Owns the stats snapshot for one profile.
///
/// Every mutation rolls stale windowed counters, applies the event delta,
/// persists the whole snapshot atomically, and only then publishes the
/// new snapshot on the bus. A failed persist leaves the in-memory
/// counters untouched, so memory and disk never diverge.
pub struct StatsLedger {
    path: PathBuf,
    snapshot: Mutex<StatsSnapshot>,
    bus: StatsBus,
}

impl StatsLedger {
    /// Loads the snapshot at `path`, falling back to its backup and then
    /// to zeroed counters.
    pub fn open(path: impl Into<PathBuf>, bus: StatsBus) -> Self {
        let path = path.into();
        let snapshot: StatsSnapshot = persist::load_json_or_default(&path);
        debug!(
            path = %path.display(),
            total_generated = snapshot.total_generated,
            "Opened stats ledger"
        );
        Self {
            path,
            snapshot: Mutex::new(snapshot),
            bus,
        }
    }

    pub fn bus(&self) -> &StatsBus {
        &self.bus
    }

    /// Current counters, as last persisted.
    pub fn snapshot(&self) -> Result<StatsSnapshot> {
        Ok(self.lock()?.clone())
    }

    /// Applies one event at the current wall clock.
    pub fn record(&self, event: StatsEvent) -> Result<()> {
        self.record_at(event, Timestamp::now())
    }

    /// Applies one event with an injected clock. `now` drives window
    /// rolling and the `last_updated` stamp; the event's own timestamp
    /// decides which windows its delta lands in.
    pub fn record_at(&self, event: StatsEvent, now: Timestamp) -> Result<()> {
        let published = {
            let mut snapshot = self.lock()?;
            let mut next = snapshot.clone();
            next.roll_buckets(now);
            apply_event(&mut next, &event);
            next.last_updated = now;

            persist::write_json_atomic(&self.path, &next)?;
            *snapshot = next.clone();
            next
        };

        self.bus.publish(&published);
        Ok(())
    }

    /// Replaces the counters wholesale, for import. Subscribers are
    /// notified the same way as for any other mutation.
    pub fn restore(&self, snapshot: StatsSnapshot) -> Result<()> {
        {
            let mut guard = self.lock()?;
            persist::write_json_atomic(&self.path, &snapshot)?;
            *guard = snapshot.clone();
        }

        self.bus.publish(&snapshot);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StatsSnapshot>> {
        self.snapshot
            .lock()
            .map_err(|e| LightboxError::Storage(format!("Stats ledger lock poisoned: {}", e)))
    }
}

impl std::fmt::Debug for StatsLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsLedger")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Counter deltas per event. Decrements clamp at zero rather than wrap.
/// Window counters only move when the event's own timestamp falls inside
/// the freshly rolled bucket, so deleting an old image refunds the
/// lifetime totals but not today's count.
fn apply_event(snapshot: &mut StatsSnapshot, event: &StatsEvent) {
    match event {
        StatsEvent::ImageGenerated { bytes, created_at } => {
            snapshot.total_generated += 1;
            snapshot.storage_bytes += bytes;
            if created_at.day_key() == snapshot.daily_date {
                snapshot.generated_today += 1;
            }
            if created_at.week_key() == snapshot.week_key {
                snapshot.generated_this_week += 1;
            }
            if created_at.month_key() == snapshot.month_key {
                snapshot.generated_this_month += 1;
            }
        }
        StatsEvent::ImageDeleted { bytes, created_at } => {
            snapshot.total_generated = snapshot.total_generated.saturating_sub(1);
            snapshot.storage_bytes = snapshot.storage_bytes.saturating_sub(*bytes);
            if created_at.day_key() == snapshot.daily_date {
                snapshot.generated_today = snapshot.generated_today.saturating_sub(1);
            }
            if created_at.week_key() == snapshot.week_key {
                snapshot.generated_this_week = snapshot.generated_this_week.saturating_sub(1);
            }
            if created_at.month_key() == snapshot.month_key {
                snapshot.generated_this_month = snapshot.generated_this_month.saturating_sub(1);
            }
        }
        StatsEvent::FavoriteAdded { .. } => {
            snapshot.favorite_count += 1;
        }
        StatsEvent::FavoriteRemoved { .. } => {
            snapshot.favorite_count = snapshot.favorite_count.saturating_sub(1);
        }
        // `StatsEvent` is `#[non_exhaustive]`; variants we don't know about
        // carry no counter deltas.
        _ => {}
    }
}
