//! TTL caches with single-flight fills.
//!
//! Reads of a fresh entry take only a short read lock. On a miss, the first
//! caller for a key computes the value while later callers for the same key
//! wait on that key's fill lock and then reuse the stored result. Failed
//! computations are not stored.
//!
//! Expired slots are swept at most once per lifetime, on the miss path, so
//! keys that are never asked for again do not accumulate.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups served from a fresh entry.
    pub hits: u64,
    /// Lookups that ran the computation.
    pub misses: u64,
    /// Slots currently held, fresh or not.
    pub entries: usize,
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

struct Slot<V> {
    entry: RwLock<Option<Entry<V>>>,
    fill: tokio::sync::Mutex<()>,
}

impl<V: Clone> Slot<V> {
    fn new() -> Self {
        Self {
            entry: RwLock::new(None),
            fill: tokio::sync::Mutex::new(()),
        }
    }

    fn fresh(&self, ttl: Duration) -> Option<V> {
        self.entry
            .read()
            .as_ref()
            .filter(|e| e.stored_at.elapsed() < ttl)
            .map(|e| e.value.clone())
    }

    fn store(&self, value: V) {
        *self.entry.write() = Some(Entry {
            value,
            stored_at: Instant::now(),
        });
    }
}

/// A concurrent cache whose entries expire after a fixed lifetime.
///
/// Expired entries are recomputed lazily on the next lookup; nothing
/// refreshes in the background.
pub struct TtlCache<K, V> {
    slots: DashMap<K, Arc<Slot<V>>>,
    ttl: Duration,
    last_sweep: Mutex<Instant>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
            last_sweep: Mutex::new(Instant::now()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.slots.get(key).and_then(|slot| slot.fresh(self.ttl))
    }

    /// Returns the fresh value for `key`, computing it with `init` on a miss.
    ///
    /// Concurrent callers for the same key share one computation. The
    /// boolean is true when the value came from the cache.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, init: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((value, true));
        }
        self.sweep_if_due();

        let slot = self
            .slots
            .entry(key)
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone();

        let _fill = slot.fill.lock().await;
        if let Some(value) = slot.fresh(self.ttl) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((value, true));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = init().await?;
        slot.store(value.clone());
        Ok((value, false))
    }

    /// Stores a value unless a fresh one is already present.
    pub fn insert_if_stale(&self, key: K, value: V) {
        self.sweep_if_due();
        let slot = self
            .slots
            .entry(key)
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone();
        if slot.fresh(self.ttl).is_none() {
            slot.store(value);
        }
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        self.slots.clear();
    }

    /// Drops a single entry.
    pub fn invalidate(&self, key: &K) {
        self.slots.remove(key);
    }

    /// Drops expired entries that nobody is currently filling.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.slots
            .retain(|_, slot| slot.fresh(ttl).is_some() || slot.fill.try_lock().is_err());
    }

    /// Purges expired entries if a full lifetime has passed since the last
    /// sweep.
    fn sweep_if_due(&self) {
        {
            let mut last = self.last_sweep.lock();
            if last.elapsed() < self.ttl {
                return;
            }
            *last = Instant::now();
        }
        let before = self.slots.len();
        self.purge_expired();
        let dropped = before.saturating_sub(self.slots.len());
        if dropped > 0 {
            tracing::debug!(dropped, remaining = self.slots.len(), "Swept expired cache entries");
        }
    }

    /// Number of slots held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no slots are held.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.slots.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_hit_after_miss() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));

        let (v, hit) = cache
            .get_or_try_insert_with("a", || async { Ok::<_, ()>(1) })
            .await
            .unwrap();
        assert_eq!((v, hit), (1, false));

        let (v, hit) = cache
            .get_or_try_insert_with("a", || async { Ok::<_, ()>(2) })
            .await
            .unwrap();
        assert_eq!((v, hit), (1, true));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_millis(20));
        cache.insert_if_stale("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get(&"a"), None);

        let (v, hit) = cache
            .get_or_try_insert_with("a", || async { Ok::<_, ()>(2) })
            .await
            .unwrap();
        assert_eq!((v, hit), (2, false));

        cache.invalidate(&"a");
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.insert_if_stale("b", 3);
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_slots_swept_on_miss() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_millis(200));
        for day in 0..50 {
            cache
                .get_or_try_insert_with(day, || async move { Ok::<_, ()>(day) })
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 50);

        tokio::time::sleep(Duration::from_millis(300)).await;
        cache
            .get_or_try_insert_with(99, || async { Ok::<_, ()>(99) })
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&99), Some(99));

        tokio::time::sleep(Duration::from_millis(300)).await;
        cache.insert_if_stale(7, 7);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));

        let failed = cache
            .get_or_try_insert_with("a", || async { Err::<u32, _>("boom") })
            .await;
        assert_eq!(failed, Err("boom"));
        assert_eq!(cache.get(&"a"), None);

        let (v, _) = cache
            .get_or_try_insert_with("a", || async { Ok::<_, &str>(5) })
            .await
            .unwrap();
        assert_eq!(v, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight() {
        let cache: Arc<TtlCache<String, usize>> = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let computations = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let computations = Arc::clone(&computations);
                tokio::spawn(async move {
                    cache
                        .get_or_try_insert_with("AAPL|MSFT".to_string(), || async {
                            computations.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(30)).await;
                            Ok::<_, ()>(42)
                        })
                        .await
                        .unwrap()
                        .0
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }
        assert_eq!(computations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalidate_all() {
        let cache: TtlCache<u8, u8> = TtlCache::new(Duration::from_secs(60));
        cache.insert_if_stale(1, 1);
        cache.insert_if_stale(2, 2);
        cache.insert_if_stale(2, 9);
        assert_eq!(cache.get(&2), Some(2));

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
