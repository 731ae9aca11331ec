//! Identity-keyed cache of built composites
//!
//! Reuses one [`Composite`] per identity across repeated requests and drops it
//! when the owner signals a lifecycle event (for example, a disconnect) via
//! [`CompositeCache::invalidate`].
//!
//! Each identity owns a once-cell, so concurrent requests for the same key run
//! the build at most once while requests for other keys proceed independently.
//! The map lock is never held while a build runs.
//!
//! A slot whose build is still running is never dropped from the map, neither
//! by eviction nor by invalidation; dropping it would let the next request for
//! that key start a second build alongside the first.

use bindproxy_core::{BuildError, Composite};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::config::CacheConfig;

type Slot = Arc<OnceCell<Composite>>;

/// Cache of composites keyed by an external identity
pub struct CompositeCache<K> {
    entries: Mutex<IndexMap<K, Slot>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    evictions: AtomicU64,
}

impl<K> CompositeCache<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Unbounded cache
    pub fn new() -> Self {
        Self::with_config(CacheConfig::unbounded())
    }

    /// Cache using `config`
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the composite cached for `key`, building it with `build` if
    /// absent.
    ///
    /// Concurrent callers for the same key wait for a single build. A failed
    /// build caches nothing and its error is returned to the caller that ran
    /// it; the next waiting caller then retries in the same slot with its own
    /// `build`.
    pub fn get_or_build<F>(&self, key: K, build: F) -> Result<Composite, BuildError>
    where
        F: FnOnce() -> Result<Composite, BuildError>,
    {
        let slot = {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(slot) => {
                    if let Some(composite) = slot.get() {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        return Ok(composite.clone());
                    }
                    Arc::clone(slot)
                }
                None => {
                    self.make_room(&mut entries);
                    let slot = Slot::default();
                    entries.insert(key.clone(), Arc::clone(&slot));
                    slot
                }
            }
        };
        self.misses.fetch_add(1, Ordering::Relaxed);

        let result = slot.get_or_try_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            let composite = build()?;
            debug!(?key, composite = %composite.id(), "cached composite");
            Ok(composite)
        });

        match result {
            Ok(composite) => Ok(composite.clone()),
            Err(err) => {
                // Drop the slot only when the map and this caller are its sole
                // holders; a waiter still holding it retries in place. New
                // callers need the map lock to reach it.
                let mut entries = self.entries.lock();
                let abandoned = entries.get(&key).is_some_and(|current| {
                    Arc::ptr_eq(current, &slot)
                        && current.get().is_none()
                        && Arc::strong_count(&slot) == 2
                });
                if abandoned {
                    entries.shift_remove(&key);
                }
                debug!(?key, error = %err, "composite build failed");
                Err(err)
            }
        }
    }

    /// Cached composite for `key`, if one has been built
    pub fn get(&self, key: &K) -> Option<Composite> {
        let composite = self.entries.lock().get(key).and_then(|slot| slot.get().cloned());
        let counter = if composite.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        composite
    }

    /// Whether a built composite is cached for `key`
    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Drop the composite for `key`.
    ///
    /// Returns whether a built composite was removed. Holders of the
    /// composite keep their handle; the next request for `key` builds anew.
    /// A build still running for `key` is left in place and its result is
    /// cached when it completes.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut entries = self.entries.lock();
        let built = entries.get(key).is_some_and(|slot| slot.get().is_some());
        if built {
            entries.shift_remove(key);
            debug!(?key, "invalidated composite");
        }
        built
    }

    /// Drop every built composite, leaving running builds in place
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, slot| slot.get().is_none());
        debug!(
            invalidated = before - entries.len(),
            building = entries.len(),
            "invalidated all composites"
        );
    }

    /// Number of built composites held
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Whether no built composite is held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of cache counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.config.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Evict the oldest built composites until a new key fits.
    ///
    /// Slots still building are skipped; when nothing built remains the map
    /// temporarily exceeds its capacity.
    fn make_room(&self, entries: &mut IndexMap<K, Slot>) {
        let Some(max) = self.config.max_entries else {
            return;
        };
        while entries.len() >= max.max(1) {
            let Some(index) = entries.values().position(|slot| slot.get().is_some()) else {
                debug!(entries = entries.len(), max, "cache over capacity while building");
                break;
            };
            if let Some((key, _)) = entries.shift_remove_index(index) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(?key, "evicted composite");
            }
        }
    }
}

impl<K> Default for CompositeCache<K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Debug for CompositeCache<K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Cache counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Built composites currently held
    pub entries: usize,
    /// Configured bound, if any
    pub capacity: Option<usize>,
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests that found no built composite
    pub misses: u64,
    /// Build closures run, including failed ones
    pub builds: u64,
    /// Entries dropped to make room
    pub evictions: u64,
}
