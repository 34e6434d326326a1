//! Lightbox Stats - Usage counters, event delivery, and derived aggregates.
//!
//! The ledger folds stats events into a persisted snapshot, the bus fans
//! those events out to listeners, and the TTL cache keeps derived
//! aggregates cheap between mutations.

pub mod bus;
pub mod cache;
pub mod ledger;
pub mod snapshot;

pub use bus::{StatsBus, SubscriberId};
pub use cache::TtlCache;
pub use ledger::StatsLedger;
pub use snapshot::{StatsOverview, StatsSnapshot, StorageUsage, TierUsage};
