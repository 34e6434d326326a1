use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Lightbox engine.
///
/// Loaded from `~/.lightbox/config.toml` by default. Each section corresponds
/// to one component group or cross-cutting concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightboxConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub tiers: TiersConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl Default for LightboxConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            tiers: TiersConfig::default(),
            stats: StatsConfig::default(),
            gallery: GalleryConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl LightboxConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LightboxConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding per-identity profile stores.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.lightbox/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Capacity bounds for the storage tiers, in records.
///
/// Priority order is fixed (database, file, memory); only capacities are
/// configurable. Each tier evicts its oldest writes beyond its bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TiersConfig {
    /// SQLite structured store capacity.
    pub database_capacity: usize,
    /// JSON file store capacity.
    pub file_capacity: usize,
    /// In-process memory cache capacity.
    pub memory_capacity: usize,
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            database_capacity: 1000,
            file_capacity: 200,
            memory_capacity: 50,
        }
    }
}

/// Statistics and aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// TTL for cached cross-tier aggregations, in seconds.
    pub usage_cache_ttl_secs: u64,
    /// Generations allowed per UTC day.
    pub daily_limit: u32,
    /// Storage quota used for the derived usage percentage, in MB.
    pub storage_quota_mb: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            usage_cache_ttl_secs: 300,
            daily_limit: 5,
            storage_quota_mb: 500,
        }
    }
}

/// Gallery view and retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Default page size for gallery queries.
    pub page_size: usize,
    /// Hard cap on caller-supplied page sizes.
    pub max_page_size: usize,
    /// Maximum ids retained in the favorites list.
    pub favorites_capacity: usize,
    /// Maximum entries retained in the generation history log.
    pub history_capacity: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_page_size: 50,
            favorites_capacity: 50,
            history_capacity: 100,
        }
    }
}

/// Remote source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Whether gallery reads consult the remote source at all.
    pub enabled: bool,
    /// Timeout for a single remote call, in milliseconds. On expiry the
    /// operation degrades to adapter-only.
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5000,
        }
    }
}
