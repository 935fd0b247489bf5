//! Bounded, insertion-ordered fingerprint store.
//!
//! Remembers the most recent `capacity` fingerprints and evicts the oldest
//! one when a new fingerprint would exceed the bound.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::instrument;

use super::fingerprint::Fingerprint;

/// Store of previously seen fingerprints.
///
/// # How it works
///
/// 1. Backed by an `LruCache` that is only ever written with `push` and read
///    with `contains`, neither of which promotes an entry, so the cache's
///    recency order is the insertion order
/// 2. [`try_insert`](Self::try_insert) checks and inserts under one lock
///    acquisition
/// 3. When the cache is full, `push` hands back the oldest entry, which is the
///    single eviction for that insert
///
/// # Thread Safety
///
/// All access goes through one `Mutex`. The lock is never held across an
/// `.await`, so callers on async tasks only contend for the duration of one
/// hash lookup and insert.
///
/// # Lock Poisoning
///
/// A poisoned lock is recovered and used as-is. Every critical section is a
/// single `lru` call, so a panic elsewhere cannot leave the cache half-updated.
///
/// # Example
///
/// ```rust
/// use dedupbot::{DeduplicationStore, Fingerprint};
/// use std::num::NonZeroUsize;
///
/// let store = DeduplicationStore::new(NonZeroUsize::new(2).unwrap());
/// assert!(store.try_insert(Fingerprint::new("1:text:a")));
/// assert!(!store.try_insert(Fingerprint::new("1:text:a")));
/// ```
#[derive(Debug)]
pub struct DeduplicationStore {
    cache: Mutex<LruCache<Fingerprint, ()>>,
    capacity: NonZeroUsize,
}

impl DeduplicationStore {
    /// Default number of remembered fingerprints.
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// Creates an empty store holding at most `capacity` fingerprints.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    /// Creates a store from a plain capacity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> crate::Result<Self> {
        NonZeroUsize::new(capacity).map(Self::new).ok_or_else(|| {
            crate::Error::Configuration("deduplication history size must be > 0".to_string())
        })
    }

    /// Inserts a fingerprint unless it is already present.
    ///
    /// Returns `true` if the fingerprint was new and is now remembered, `false`
    /// if it was already present. A repeat does not change eviction order.
    #[instrument(skip_all, fields(operation = "store_try_insert"))]
    pub fn try_insert(&self, fingerprint: Fingerprint) -> bool {
        let (inserted, evicted, len) = {
            let mut cache = self.lock();
            if cache.contains(&fingerprint) {
                (false, None, cache.len())
            } else {
                let evicted = cache.push(fingerprint, ()).map(|(key, ())| key);
                (true, evicted, cache.len())
            }
        };

        if let Some(old) = evicted {
            tracing::trace!(evicted = %old, "Evicted oldest fingerprint");
            metrics::counter!("dedup_store_evictions_total").increment(1);
        }
        metrics::gauge!("dedup_store_size").set(len as f64);
        tracing::debug!(inserted, store_size = len, "Store check-and-insert");

        inserted
    }

    /// Returns true if the fingerprint is currently remembered.
    ///
    /// Diagnostic only; the duplicate decision goes through
    /// [`try_insert`](Self::try_insert).
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().contains(fingerprint)
    }

    /// Returns the remembered fingerprints, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Fingerprint> {
        self.lock().iter().rev().map(|(key, ())| key.clone()).collect()
    }

    /// Returns the number of remembered fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Forgets every fingerprint.
    #[cfg(test)]
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Fingerprint, ()>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DeduplicationStore {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(Self::DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
