//! Lightbox Gallery - The engine tying the tiers, stats, and remote
//! together.
//!
//! Owns the active profile's stores, fans writes out across them,
//! merges reads with the optional remote source, and layers the query
//! pipeline on top. The [`GalleryService`] is the one entry point the
//! surrounding application talks to.

pub mod archive;
pub mod context;
pub mod favorites;
pub mod history;
pub mod query;
pub mod service;

pub use archive::{GalleryArchive, ARCHIVE_VERSION};
pub use context::ProfileContext;
pub use favorites::{FavoritesIndex, ToggleOutcome};
pub use history::HistoryLog;
pub use query::{run_query, GalleryPage, GalleryQuery};
pub use service::{
    BulkDeleteOutcome, BulkToggleOutcome, DeleteOutcome, GalleryService, GenerationAllowance,
    GenerationOutcome, ImportOutcome, ToggleReport,
};
