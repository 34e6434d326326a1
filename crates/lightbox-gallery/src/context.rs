//! Per-profile runtime state.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use lightbox_core::config::LightboxConfig;
use lightbox_core::Result;
use lightbox_stats::{StatsBus, StatsLedger, StorageUsage, SubscriberId, TtlCache};
use lightbox_store::{Namespace, TierRegistry};

use crate::favorites::FavoritesIndex;
use crate::history::HistoryLog;

/// Everything owned by the active profile: the tier stack, the stats
/// ledger, the history log, the favorites index, and the usage cache.
///
/// Switching profiles replaces the whole context, so no store handle can
/// outlive its namespace. The usage cache subscribes to the stats bus and
/// drops its slot on every mutation; the subscription is released when
/// the context is.
pub struct ProfileContext {
    pub(crate) namespace: Namespace,
    pub(crate) registry: TierRegistry,
    pub(crate) ledger: StatsLedger,
    pub(crate) history: HistoryLog,
    pub(crate) favorites: FavoritesIndex,
    pub(crate) usage_cache: Arc<TtlCache<StorageUsage>>,
    cache_subscription: SubscriberId,
    bus: StatsBus,
}

impl ProfileContext {
    /// Opens every store for `namespace` and wires the usage cache to the
    /// bus.
    pub fn open(namespace: Namespace, config: &LightboxConfig, bus: StatsBus) -> Result<Self> {
        let registry = TierRegistry::open(&namespace, &config.tiers)?;
        let ledger = StatsLedger::open(namespace.stats_path(), bus.clone());
        let history = HistoryLog::open(namespace.history_path(), config.gallery.history_capacity);
        let favorites = FavoritesIndex::open(
            namespace.favorites_path(),
            config.gallery.favorites_capacity,
        );

        let usage_cache = Arc::new(TtlCache::new(Duration::from_secs(
            config.stats.usage_cache_ttl_secs,
        )));
        let cache = Arc::clone(&usage_cache);
        let cache_subscription = bus.subscribe(move |_| cache.invalidate());

        info!(identity = namespace.identity(), "Opened profile context");
        Ok(Self {
            namespace,
            registry,
            ledger,
            history,
            favorites,
            usage_cache,
            cache_subscription,
            bus,
        })
    }

    pub fn identity(&self) -> &str {
        self.namespace.identity()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

impl Drop for ProfileContext {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.cache_subscription);
    }
}

impl std::fmt::Debug for ProfileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileContext")
            .field("identity", &self.namespace.identity())
            .field("tiers", &self.registry.tiers())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightbox_store::NamespaceManager;

    fn make_config(data_dir: &std::path::Path) -> LightboxConfig {
        let mut config = LightboxConfig::default();
        config.general.data_dir = data_dir.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_open_wires_cache_invalidation_to_bus() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());
        let manager = NamespaceManager::new(dir.path());
        let namespace = manager.open("alice@example.com").unwrap();

        let bus = StatsBus::new();
        let context = ProfileContext::open(namespace, &config, bus.clone()).unwrap();
        assert_eq!(bus.subscriber_count(), 1);

        context.usage_cache.put(StorageUsage::compute(&[], vec![], 500));
        assert!(context.usage_cache.get().is_some());

        bus.publish(&lightbox_stats::StatsSnapshot::default());
        assert!(context.usage_cache.get().is_none());
    }

    #[test]
    fn test_drop_releases_bus_subscription() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());
        let manager = NamespaceManager::new(dir.path());

        let bus = StatsBus::new();
        {
            let namespace = manager.open("alice").unwrap();
            let _context = ProfileContext::open(namespace, &config, bus.clone()).unwrap();
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_identity_is_preserved_raw() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());
        let manager = NamespaceManager::new(dir.path());
        let namespace = manager.open("alice@example.com").unwrap();

        let context = ProfileContext::open(namespace, &config, StatsBus::new()).unwrap();
        assert_eq!(context.identity(), "alice@example.com");
    }
}
