use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Bounded least-recently-used map.
///
/// Recency is a monotonically increasing stamp per access; eviction scans
/// for the oldest stamp, which is cheap at the sizes used for opcodes.
#[derive(Debug)]
pub struct LruCache<K, V> {
    entries: HashMap<K, (V, u64)>,
    capacity: usize,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity.min(1024)),
            capacity,
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Get a value and mark it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let stamp = self.tick();
        let (value, last_used) = self.entries.get_mut(key)?;
        *last_used = stamp;
        Some(value.clone())
    }

    /// Insert a value, evicting the least recently used entry when full.
    ///
    /// Returns the evicted key, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<K> {
        let stamp = self.tick();
        if let Some(entry) = self.entries.get_mut(&key) {
            *entry = (value, stamp);
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.oldest_key().inspect(|oldest| {
                self.entries.remove(oldest);
            })
        } else {
            None
        };
        self.entries.insert(key, (value, stamp));
        evicted
    }

    fn oldest_key(&self) -> Option<K> {
        self.entries
            .iter()
            .min_by_key(|(_, (_, last_used))| *last_used)
            .map(|(key, _)| key.clone())
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get("a"), Some(1));

        let evicted = cache.put("c", 3);
        assert_eq!(evicted, Some("b"));
        assert!(cache.contains("a"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overwrite_does_not_evict() {
        let mut cache = LruCache::new(1);
        cache.put("a", 1);
        assert_eq!(cache.put("a", 2), None);
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let mut cache = LruCache::new(0);
        cache.put(1u32, "x");
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.get(&1u32), Some("x"));
    }
}
