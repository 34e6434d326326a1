//! Synchronous change notification with per-listener isolation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::snapshot::StatsSnapshot;

type Listener = Arc<dyn Fn(&StatsSnapshot) + Send + Sync>;

/// Handle returned by [`StatsBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct BusInner {
    next_id: u64,
    listeners: Vec<(SubscriberId, Listener)>,
}

/// Delivers the freshly persisted [`StatsSnapshot`] to every subscriber
/// after each ledger mutation.
///
/// Delivery is synchronous and in subscription order. A listener that
/// panics is logged and skipped; it never stops delivery to the others
/// and never reaches the publisher. Clones share one registry.
#[derive(Clone)]
pub struct StatsBus {
    inner: Arc<Mutex<BusInner>>,
}

impl StatsBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Registers a listener and returns its id.
    pub fn subscribe(
        &self,
        listener: impl Fn(&StatsSnapshot) + Send + Sync + 'static,
    ) -> SubscriberId {
        let mut inner = self.lock_inner();
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns false when the id was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut inner = self.lock_inner();
        let before = inner.listeners.len();
        inner.listeners.retain(|(lid, _)| *lid != id);
        inner.listeners.len() < before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_inner().listeners.len()
    }

    /// Delivers `snapshot` to every listener registered at call time.
    pub fn publish(&self, snapshot: &StatsSnapshot) {
        // Listeners run outside the lock so one of them subscribing or
        // unsubscribing mid-delivery cannot deadlock.
        let listeners: Vec<(SubscriberId, Listener)> = self.lock_inner().listeners.clone();

        for (id, listener) in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(snapshot)));
            if outcome.is_err() {
                warn!(subscriber = id.0, "Stats listener panicked");
            }
        }
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, BusInner> {
        // Listeners run outside the lock, so a panicking listener cannot
        // poison it; recover rather than propagate if it ever happens.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for StatsBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatsBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
