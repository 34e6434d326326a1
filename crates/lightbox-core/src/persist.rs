//! Atomic JSON persistence helpers shared by the ledger, the favorites and
//! history stores, and the JSON file tier.
//!
//! Writes go to a `.tmp` sibling which is renamed over the target, keeping a
//! `.backup` of the previous version. Reads fall back to the backup when the
//! main file is corrupt, and to `T::default()` when neither parses, so a
//! half-written file can never wedge a store.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Serialize `value` to `path` atomically.
///
/// The previous file contents, if any, survive as `<path>.backup`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = sibling(path, ".tmp");
    let content = serde_json::to_string_pretty(value)?;
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    if path.exists() {
        let backup = sibling(path, ".backup");
        if let Err(e) = std::fs::copy(path, &backup) {
            warn!(path = %path.display(), error = %e, "Failed to refresh backup before replace");
        }
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Parse `path` as JSON, propagating read and parse errors.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse `path` as JSON, recovering from the `.backup` sibling when the main
/// file is corrupt and from `T::default()` when neither file parses or the
/// file does not exist yet.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    match load_json(path) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt store file, trying backup");
            let backup = sibling(path, ".backup");
            match load_json(&backup) {
                Ok(value) => value,
                Err(backup_err) => {
                    warn!(
                        path = %backup.display(),
                        error = %backup_err,
                        "Backup unusable, starting from empty state"
                    );
                    T::default()
                }
            }
        }
    }
}
