use super::{CacheStats, StructuralKey};
use crate::backend::LaunchGeometry;
use crate::error::Result;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Best kernel found for one structural key.
#[derive(Debug)]
pub struct CacheEntry<K> {
    pub name: String,
    pub kernel: K,
    pub geometry: LaunchGeometry,
    pub runtime: Duration,
}

type Slot<K> = Arc<OnceCell<Arc<CacheEntry<K>>>>;

/// Map from structural key to the winning kernel.
///
/// Entries are written once and never evicted. At most one build runs per
/// key: concurrent callers for the same missing key block on that key's slot
/// until the build finishes. Builds for distinct keys do not wait on each
/// other. A failed build leaves the slot empty so a later call can retry.
pub struct KernelCache<K> {
    slots: Mutex<HashMap<StructuralKey, Slot<K>>>,
    stats: CacheStats,
}

impl<K> Default for KernelCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KernelCache<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            stats: CacheStats::new(),
        }
    }

    /// Existing entry for `key`, without building.
    pub fn get(&self, key: &StructuralKey) -> Option<Arc<CacheEntry<K>>> {
        self.lock().get(key).and_then(|slot| slot.get().cloned())
    }

    /// Return the entry for `key`, running `build` exactly once on a miss.
    pub fn get_or_build<F>(&self, key: &StructuralKey, build: F) -> Result<Arc<CacheEntry<K>>>
    where
        F: FnOnce() -> Result<CacheEntry<K>>,
    {
        let slot = Arc::clone(self.lock().entry(*key).or_default());

        if let Some(entry) = slot.get() {
            log::debug!("kernel cache hit for {key}");
            self.stats.inc_hit();
            return Ok(Arc::clone(entry));
        }

        let mut built = false;
        let result = slot.get_or_try_init(|| {
            built = true;
            self.stats.inc_miss();
            let entry = build()?;
            self.stats.inc_build();
            Ok::<_, crate::error::SpmmError>(Arc::new(entry))
        });
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                self.discard_empty(key, &slot);
                return Err(e);
            }
        };
        if !built {
            // another caller finished the build while we waited
            self.stats.inc_hit();
        }
        Ok(Arc::clone(entry))
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &StructuralKey) -> bool {
        self.get(key).is_some()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Drop `slot` from the map if it is still the empty slot for `key`.
    fn discard_empty(&self, key: &StructuralKey, slot: &Slot<K>) {
        let mut slots = self.lock();
        let stale = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if stale {
            slots.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StructuralKey, Slot<K>>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpmmError;
    use crate::types::OperandId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn key(ldb: usize) -> StructuralKey {
        StructuralKey::new(OperandId::fresh(), 1.0, 0.0, None, ldb, ldb)
    }

    fn entry(runtime_ms: u64) -> CacheEntry<u32> {
        CacheEntry {
            name: "k".to_string(),
            kernel: 7,
            geometry: LaunchGeometry::linear(1, 32),
            runtime: Duration::from_millis(runtime_ms),
        }
    }

    #[test]
    fn test_build_runs_once() {
        let cache = KernelCache::new();
        let k = key(4);
        let mut builds = 0;
        let first = cache
            .get_or_build(&k, || {
                builds += 1;
                Ok(entry(3))
            })
            .unwrap();
        let second = cache
            .get_or_build(&k, || {
                builds += 1;
                Ok(entry(1))
            })
            .unwrap();
        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.runtime, Duration::from_millis(3));

        let stats = cache.stats().snapshot();
        assert_eq!((stats.hits, stats.misses, stats.builds), (1, 1, 1));
    }

    #[test]
    fn test_failed_build_leaves_no_entry() {
        let cache: KernelCache<u32> = KernelCache::new();
        let k = key(4);
        let err = cache
            .get_or_build(&k, || Err(SpmmError::NotSuitable("nope".into())))
            .unwrap_err();
        assert!(err.is_not_suitable());
        assert!(!cache.contains(&k));
        assert!(cache.is_empty());
        assert!(cache.lock().is_empty());

        cache.get_or_build(&k, || Ok(entry(2))).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_same_key_single_flight() {
        let cache: KernelCache<u32> = KernelCache::new();
        let k = key(4);
        let builds = AtomicUsize::new(0);
        let barrier = Barrier::new(4);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    barrier.wait();
                    cache
                        .get_or_build(&k, || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            Ok(entry(1))
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        let stats = cache.stats().snapshot();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 3);
    }

    #[test]
    fn test_distinct_keys_build_separately() {
        let cache = KernelCache::new();
        cache.get_or_build(&key(4), || Ok(entry(1))).unwrap();
        cache.get_or_build(&key(8), || Ok(entry(1))).unwrap();
        assert_eq!(cache.len(), 2);
    }
}
