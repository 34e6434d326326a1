//! TTL cache for derived aggregates.

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Cached<T> {
    value: T,
    computed_at: Instant,
}

/// Single-slot cache that serves a computed value until it ages past the
/// TTL or a mutation invalidates it.
///
/// Concurrent misses may compute twice; the later write wins, which is
/// harmless for the derived aggregates this holds.
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<Cached<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The cached value, unless the slot is empty or stale.
    pub fn get(&self) -> Option<T> {
        let slot = self.lock();
        match slot.as_ref() {
            Some(cached) if cached.computed_at.elapsed() < self.ttl => Some(cached.value.clone()),
            _ => None,
        }
    }

    pub fn put(&self, value: T) {
        *self.lock() = Some(Cached {
            value,
            computed_at: Instant::now(),
        });
    }

    /// Serves the cached value or computes, stores, and returns a fresh
    /// one. The closure runs outside the lock.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> T {
        if let Some(value) = self.get() {
            return value;
        }
        let value = compute();
        self.put(value.clone());
        value
    }

    /// Empties the slot so the next read recomputes.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Cached<T>>> {
        // Nothing user-supplied runs under this lock, so poisoning is
        // unreachable; recover rather than panic if it ever happens.
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
