// Bounded LRU cache with TTL and memory-pressure eviction (component B).
//
// Shape is grounded on the teacher's `StateStore`: a `DashMap` holds the
// entries so concurrent `get`/`set` from different tokio tasks never block
// each other's shard, same as `state::window::StateStore::accounts`. The
// teacher's map never evicts (accounts only expire old *events*, not the
// account entry itself), so the LRU/TTL/pressure machinery here is new,
// built in the same concurrency idiom (DashMap + a `parking_lot::Mutex` for
// the one piece of strictly-ordered state, matching `next_cluster`).

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

struct Entry<V> {
    value:      V,
    inserted_at: Instant,
    ttl:        Option<Duration>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(self.inserted_at) >= ttl,
            None => false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits:        u64,
    pub misses:      u64,
    pub evictions:   u64,
    pub expirations: u64,
    pub len:         usize,
}

/// `K` must be cheap to clone — it is stored both in the map and in the LRU
/// order queue, matching the spirit of the teacher's account-id-keyed
/// indexes (strings cloned into multiple `DashMap`s in `StateStore::ingest`).
pub struct BoundedCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    capacity: usize,
    default_ttl: Option<Duration>,
    map:   DashMap<K, Entry<V>>,
    order: Mutex<VecDeque<K>>,

    hits:        AtomicU64,
    misses:      AtomicU64,
    evictions:   AtomicU64,
    expirations: AtomicU64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            capacity: capacity.max(1),
            default_ttl,
            map: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let hit = match self.map.get(key) {
            Some(entry) if entry.is_expired(now) => None,
            Some(entry) => Some(entry.value.clone()),
            None => None,
        };

        match hit {
            Some(v) => {
                self.touch(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            None => {
                if self.map.remove(key).is_some() {
                    self.expirations.fetch_add(1, Ordering::Relaxed);
                    self.remove_from_order(key);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let is_new = !self.map.contains_key(&key);
        self.map.insert(key.clone(), Entry {
            value,
            inserted_at: Instant::now(),
            ttl: ttl.or(self.default_ttl),
        });

        {
            let mut order = self.order.lock();
            if !is_new {
                order.retain(|k| k != &key);
            }
            order.push_back(key);
        }

        if is_new {
            self.evict_if_over_capacity();
        }
    }

    fn touch(&self, key: &K) {
        let mut order = self.order.lock();
        if let Some(pos) = order.iter().position(|k| k == key) {
            let k = order.remove(pos).unwrap();
            order.push_back(k);
        }
    }

    fn remove_from_order(&self, key: &K) {
        let mut order = self.order.lock();
        order.retain(|k| k != key);
    }

    fn evict_if_over_capacity(&self) {
        while self.map.len() > self.capacity {
            let oldest = self.order.lock().pop_front();
            if let Some(k) = oldest {
                if self.map.remove(&k).is_some() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            } else {
                break;
            }
        }
    }

    pub fn clear(&self) {
        self.map.clear();
        self.order.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits:        self.hits.load(Ordering::Relaxed),
            misses:      self.misses.load(Ordering::Relaxed),
            evictions:   self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            len:         self.map.len(),
        }
    }

    /// Memory-pressure hook: non-aggressive drops the oldest half, aggressive
    /// clears everything. Never blocks — caller is expected to invoke this
    /// from a background monitor loop, never from the request path.
    pub fn on_pressure(&self, aggressive: bool) {
        if aggressive {
            self.clear();
            return;
        }
        let to_drop = self.map.len() / 2;
        for _ in 0..to_drop {
            let oldest = self.order.lock().pop_front();
            match oldest {
                Some(k) => {
                    if self.map.remove(&k).is_some() {
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }
}

impl<K, V> crate::monitor::PressureAware for BoundedCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn on_pressure(&self, aggressive: bool) {
        BoundedCache::on_pressure(self, aggressive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn set_then_get_hits_immediately() {
        let cache: BoundedCache<String, i32> = BoundedCache::new(4, None);
        cache.set("a".into(), 1, None);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn ttl_expires_entry() {
        let cache: BoundedCache<String, i32> = BoundedCache::new(4, None);
        cache.set("a".into(), 1, Some(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let cache: BoundedCache<String, i32> = BoundedCache::new(2, None);
        cache.set("a".into(), 1, None);
        cache.set("b".into(), 2, None);
        // touch "a" so "b" becomes the least-recently-used
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        cache.set("c".into(), 3, None);
        assert_eq!(cache.get(&"b".to_string()), None);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"c".to_string()), Some(3));
    }

    #[test]
    fn pressure_non_aggressive_drops_half() {
        let cache: BoundedCache<String, i32> = BoundedCache::new(100, None);
        for i in 0..10 {
            cache.set(format!("k{i}"), i, None);
        }
        cache.on_pressure(false);
        assert_eq!(cache.len(), 5);
    }

    #[test]
    fn pressure_aggressive_clears() {
        let cache: BoundedCache<String, i32> = BoundedCache::new(100, None);
        cache.set("a".into(), 1, None);
        cache.on_pressure(true);
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_set_get_does_not_corrupt_counts() {
        let cache = std::sync::Arc::new(BoundedCache::<String, i32>::new(1000, None));
        let mut handles = vec![];
        for t in 0..8 {
            let c = cache.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let k = format!("t{t}-{i}");
                    c.set(k.clone(), i, None);
                    c.get(&k);
                }
            }));
        }
        for h in handles { h.join().unwrap(); }
        assert!(cache.len() <= 1000);
    }
}
