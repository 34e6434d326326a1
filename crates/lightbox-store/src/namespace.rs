//! Profile isolation for multi-identity data directories.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use lightbox_core::{LightboxError, Result};

/// Identity used before anyone has signed in.
pub const DEFAULT_IDENTITY: &str = "default";

/// Name of the slot file recording the last-used identity. Lives at the
/// data directory root, outside any profile, so it survives switches.
const CURRENT_IDENTITY_FILE: &str = "current_identity";

/// Expands a leading `~/` to the user's home directory.
pub fn resolve_data_dir(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
        if let Some(profile) = std::env::var_os("USERPROFILE") {
            return PathBuf::from(profile).join(rest);
        }
    }
    PathBuf::from(raw)
}

/// A resolved per-identity directory holding every store for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    identity: String,
    suffix: String,
    dir: PathBuf,
}

impl Namespace {
    /// The identity as given, before sanitizing.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The filesystem-safe form of the identity.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.dir.join("gallery.db")
    }

    pub fn gallery_path(&self) -> PathBuf {
        self.dir.join("gallery.json")
    }

    pub fn stats_path(&self) -> PathBuf {
        self.dir.join("stats.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join("history.json")
    }

    pub fn favorites_path(&self) -> PathBuf {
        self.dir.join("favorites.json")
    }
}

/// Hands out [`Namespace`]s under a data directory and remembers the last
/// identity used across restarts.
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    data_dir: PathBuf,
}

impl NamespaceManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Maps an identity onto a filesystem-safe suffix. Anything outside
    /// `[A-Za-z0-9@.]` becomes `_`, which keeps email addresses readable
    /// and stable. The mapping is lossy: distinct identities can share a
    /// suffix, and then they share a profile.
    pub fn sanitize_identity(identity: &str) -> String {
        identity
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '@' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Opens the namespace for `identity`, creating its directory and
    /// recording it as the current identity.
    pub fn open(&self, identity: &str) -> Result<Namespace> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(LightboxError::Namespace(
                "identity must not be empty".to_string(),
            ));
        }

        let suffix = Self::sanitize_identity(identity);
        let dir = self.data_dir.join("profiles").join(&suffix);
        fs::create_dir_all(&dir)?;
        self.set_current(identity)?;
        info!(identity, suffix = %suffix, "Opened namespace");

        Ok(Namespace {
            identity: identity.to_string(),
            suffix,
            dir,
        })
    }

    /// Opens whatever identity was last in use, or the default when the
    /// slot is missing or unreadable.
    pub fn resume(&self) -> Result<Namespace> {
        let identity = self
            .current_identity()
            .unwrap_or_else(|| DEFAULT_IDENTITY.to_string());
        self.open(&identity)
    }

    /// The identity recorded by the last [`open`](Self::open), if any.
    /// Stored raw, not sanitized, so it can be shown back to the user.
    pub fn current_identity(&self) -> Option<String> {
        let raw = fs::read_to_string(self.data_dir.join(CURRENT_IDENTITY_FILE)).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn set_current(&self, identity: &str) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.data_dir.join(CURRENT_IDENTITY_FILE), identity)?;
        Ok(())
    }
}
