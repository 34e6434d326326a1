//! Persisted usage counters and the payloads derived from them.

use serde::{Deserialize, Serialize};

use lightbox_core::{ImageRecord, SourceTier, Timestamp};

/// The full counter state persisted to stats.json.
///
/// Windowed counters carry the bucket key they were accumulated under
/// (`daily_date`, `week_key`, `month_key`). A counter whose key no longer
/// matches the current time is stale and reads as zero until the next
/// mutation rolls it. Deserializing tolerates missing fields so snapshots
/// written by older builds still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub total_generated: u64,
    pub favorite_count: u64,
    pub storage_bytes: u64,
    pub generated_today: u64,
    pub generated_this_week: u64,
    pub generated_this_month: u64,
    pub daily_date: String,
    pub week_key: String,
    pub month_key: String,
    pub last_updated: Timestamp,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self {
            total_generated: 0,
            favorite_count: 0,
            storage_bytes: 0,
            generated_today: 0,
            generated_this_week: 0,
            generated_this_month: 0,
            daily_date: String::new(),
            week_key: String::new(),
            month_key: String::new(),
            last_updated: Timestamp(0),
        }
    }
}

impl StatsSnapshot {
    /// Resets any windowed counter whose bucket key does not match `now`
    /// and stamps the new keys. Called before every mutation.
    pub fn roll_buckets(&mut self, now: Timestamp) {
        let day = now.day_key();
        if self.daily_date != day {
            self.generated_today = 0;
            self.daily_date = day;
        }

        let week = now.week_key();
        if self.week_key != week {
            self.generated_this_week = 0;
            self.week_key = week;
        }

        let month = now.month_key();
        if self.month_key != month {
            self.generated_this_month = 0;
            self.month_key = month;
        }
    }
}

/// Read-side view of the counters, with stale windows already zeroed and
/// the daily allowance worked out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsOverview {
    pub total_generated: u64,
    pub favorite_count: u64,
    pub generated_today: u64,
    pub generated_this_week: u64,
    pub generated_this_month: u64,
    pub daily_limit: u64,
    pub daily_remaining: u64,
    /// Generations per day, averaged over the current week.
    pub generation_rate: f64,
    /// Favorites as a percentage of everything ever generated.
    pub favorite_percent: f64,
    pub storage_bytes: u64,
    pub last_updated: Timestamp,
}

impl StatsOverview {
    /// Projects a snapshot to `now` without mutating it. Stale windows
    /// read as zero; the snapshot itself only rolls on the next write.
    pub fn project(snapshot: &StatsSnapshot, daily_limit: u64, now: Timestamp) -> Self {
        let generated_today = if snapshot.daily_date == now.day_key() {
            snapshot.generated_today
        } else {
            0
        };
        let generated_this_week = if snapshot.week_key == now.week_key() {
            snapshot.generated_this_week
        } else {
            0
        };
        let generated_this_month = if snapshot.month_key == now.month_key() {
            snapshot.generated_this_month
        } else {
            0
        };

        let favorite_percent = if snapshot.total_generated == 0 {
            0.0
        } else {
            (snapshot.favorite_count as f64 / snapshot.total_generated as f64) * 100.0
        };

        Self {
            total_generated: snapshot.total_generated,
            favorite_count: snapshot.favorite_count,
            generated_today,
            generated_this_week,
            generated_this_month,
            daily_limit,
            daily_remaining: daily_limit.saturating_sub(generated_today),
            generation_rate: generated_this_week as f64 / 7.0,
            favorite_percent,
            storage_bytes: snapshot.storage_bytes,
            last_updated: snapshot.last_updated,
        }
    }
}

/// Footprint of a single tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierUsage {
    pub tier: SourceTier,
    pub object_count: usize,
    pub total_bytes: u64,
}

impl TierUsage {
    pub fn from_records(tier: SourceTier, records: &[ImageRecord]) -> Self {
        Self {
            tier,
            object_count: records.len(),
            total_bytes: records.iter().map(|r| r.file_size_bytes).sum(),
        }
    }
}

/// Aggregate storage footprint across the merged view, plus the per-tier
/// breakdown it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub object_count: usize,
    pub total_bytes: u64,
    pub total_mb: f64,
    pub quota_mb: u64,
    pub percent_used: f64,
    pub tiers: Vec<TierUsage>,
}

impl StorageUsage {
    /// `merged` must already be deduplicated; duplicates across tiers
    /// would otherwise count twice in the totals.
    pub fn compute(merged: &[ImageRecord], tiers: Vec<TierUsage>, quota_mb: u64) -> Self {
        let total_bytes: u64 = merged.iter().map(|r| r.file_size_bytes).sum();
        let total_mb = total_bytes as f64 / (1024.0 * 1024.0);
        let percent_used = if quota_mb == 0 {
            0.0
        } else {
            (total_mb / quota_mb as f64) * 100.0
        };

        Self {
            object_count: merged.len(),
            total_bytes,
            total_mb,
            quota_mb,
            percent_used,
            tiers,
        }
    }
}
