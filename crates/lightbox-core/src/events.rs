use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Mutation events applied to the stats ledger.
///
/// Each event names the counter delta it carries. Image events carry the
/// record's own `created_at` rather than the wall clock, so a deletion can
/// refund the day/week/month buckets only when the record still falls inside
/// the current bucket. Events are emitted by the gallery service and consumed
/// by the ledger, which re-publishes the resulting snapshot on its bus.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StatsEvent {
    /// A generation completed and its record was fanned out to the tiers.
    ImageGenerated {
        bytes: u64,
        created_at: Timestamp,
    },

    /// A record was removed from every tier that held it.
    ImageDeleted {
        bytes: u64,
        created_at: Timestamp,
    },

    /// An id entered the favorites list.
    FavoriteAdded { timestamp: Timestamp },

    /// An id left the favorites list.
    FavoriteRemoved { timestamp: Timestamp },
}

impl StatsEvent {
    /// The timestamp the event's deltas are evaluated against.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            StatsEvent::ImageGenerated { created_at, .. }
            | StatsEvent::ImageDeleted { created_at, .. } => *created_at,
            StatsEvent::FavoriteAdded { timestamp }
            | StatsEvent::FavoriteRemoved { timestamp } => *timestamp,
        }
    }

    /// Stable snake_case name for logs and diagnostics.
    pub fn event_name(&self) -> &'static str {
        match self {
            StatsEvent::ImageGenerated { .. } => "image_generated",
            StatsEvent::ImageDeleted { .. } => "image_deleted",
            StatsEvent::FavoriteAdded { .. } => "favorite_added",
            StatsEvent::FavoriteRemoved { .. } => "favorite_removed",
        }
    }
}
