//! Lightbox Store - Tiered persistence for the image gallery.
//!
//! Records fan out across descending-priority tiers (SQLite, JSON file,
//! in-memory), each behind the same adapter contract, and reads merge the
//! tiers back into one deduplicated view. Profiles keep every identity's
//! stores in their own namespace directory.

pub mod db;
pub mod file;
pub mod memory;
pub mod merge;
pub mod migrations;
pub mod namespace;
pub mod registry;
pub mod sqlite;
pub mod tier;

pub use db::Database;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use merge::merge_sources;
pub use namespace::{resolve_data_dir, Namespace, NamespaceManager, DEFAULT_IDENTITY};
pub use registry::TierRegistry;
pub use sqlite::SqliteStore;
pub use tier::{FanoutReport, TierStore, TierWriteOutcome, TierWriteStatus, WriteDisposition};
