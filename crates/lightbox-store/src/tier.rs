//! The storage adapter contract shared by every tier.

use lightbox_core::{ImageId, ImageRecord, Result, SourceTier};

/// Uniform interface over one storage tier.
///
/// Adapters keep records in write-recency order: a save lands at the front,
/// a save for an id that already exists replaces it and moves it to the
/// front, and anything past `capacity` is evicted from the back. Reads are
/// never required to touch other tiers.
pub trait TierStore: Send + Sync {
    /// The tier this adapter persists to.
    fn tier(&self) -> SourceTier;

    /// Maximum number of records retained before eviction.
    fn capacity(&self) -> usize;

    /// Writes one record at the front, replacing any existing record with
    /// the same id, then evicts past capacity.
    fn save(&self, record: &ImageRecord) -> Result<()>;

    /// Every record in this tier, newest write first.
    fn get_all(&self) -> Result<Vec<ImageRecord>>;

    /// Looks up a single record by id.
    fn find(&self, id: &ImageId) -> Result<Option<ImageRecord>> {
        Ok(self.get_all()?.into_iter().find(|r| &r.id == id))
    }

    /// Removes the record. Returns `Ok(false)` when the id is not present.
    fn delete(&self, id: &ImageId) -> Result<bool>;

    /// Flips the favorite flag in place without disturbing write order.
    /// Returns `Ok(false)` when the id is not present.
    fn update_favorite(&self, id: &ImageId, favorite: bool) -> Result<bool>;

    /// Removes every record.
    fn clear(&self) -> Result<()>;

    /// Replaces the whole tier with `records`, preserving their order
    /// (`records[0]` ends up newest) and applying capacity.
    fn replace_all(&self, records: &[ImageRecord]) -> Result<()> {
        self.clear()?;
        for record in records.iter().rev() {
            self.save(record)?;
        }
        Ok(())
    }
}

/// How one adapter fared in a fan-out operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierWriteStatus {
    /// The adapter applied the operation.
    Applied,
    /// The target id was not present (delete and favorite paths).
    NotFound,
    /// The adapter failed. The message is kept for diagnostics only.
    Failed(String),
}

/// One adapter's outcome within a [`FanoutReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierWriteOutcome {
    pub tier: SourceTier,
    pub status: TierWriteStatus,
}

/// Overall standing of a fan-out operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDisposition {
    /// No adapter failed.
    Durable,
    /// At least one adapter applied the operation and at least one failed.
    Degraded,
    /// Every adapter that could have applied the operation failed.
    Failed,
}

/// Per-adapter results of a fan-out write, in tier priority order.
///
/// A fan-out succeeds as long as one adapter accepted the operation;
/// individual failures are demotions, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    pub outcomes: Vec<TierWriteOutcome>,
}

impl FanoutReport {
    pub fn new(outcomes: Vec<TierWriteOutcome>) -> Self {
        Self { outcomes }
    }

    /// Number of adapters that applied the operation.
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == TierWriteStatus::Applied)
            .count()
    }

    /// Number of adapters that failed outright.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TierWriteStatus::Failed(_)))
            .count()
    }

    /// True when at least one adapter applied the operation.
    pub fn any_applied(&self) -> bool {
        self.applied() > 0
    }

    pub fn disposition(&self) -> WriteDisposition {
        if self.failed() == 0 {
            WriteDisposition::Durable
        } else if self.any_applied() {
            WriteDisposition::Degraded
        } else {
            WriteDisposition::Failed
        }
    }
}
