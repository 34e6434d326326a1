//! Versioned export/import document for a whole profile.

use serde::{Deserialize, Serialize};

use lightbox_core::{HistoryEntry, ImageId, ImageRecord, LightboxError, Result, Timestamp};
use lightbox_stats::StatsSnapshot;

/// Format version written by exports and required by imports.
pub const ARCHIVE_VERSION: &str = "1.0";

/// Everything a profile owns, as one self-describing document.
///
/// Imports are all-or-nothing: a version or record problem rejects the
/// whole archive before any store is touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryArchive {
    pub version: String,
    pub export_date: Timestamp,
    pub images: Vec<ImageRecord>,
    pub stats: StatsSnapshot,
    pub history: Vec<HistoryEntry>,
    pub favorites: Vec<ImageId>,
}

impl GalleryArchive {
    /// Builds an archive stamped with the current format version.
    pub fn new(
        images: Vec<ImageRecord>,
        stats: StatsSnapshot,
        history: Vec<HistoryEntry>,
        favorites: Vec<ImageId>,
    ) -> Self {
        Self {
            version: ARCHIVE_VERSION.to_string(),
            export_date: Timestamp::now(),
            images,
            stats,
            history,
            favorites,
        }
    }

    /// Rejects archives written by an unknown format version.
    pub fn validate(&self) -> Result<()> {
        if self.version != ARCHIVE_VERSION {
            return Err(LightboxError::ImportFormatInvalid(format!(
                "unsupported version {}",
                self.version
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses an archive document. Malformed JSON is an import format
    /// error, not a serialization error, so callers surface one variant
    /// for every rejected archive.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LightboxError::ImportFormatInvalid(format!("malformed archive: {}", e)))
    }
}
