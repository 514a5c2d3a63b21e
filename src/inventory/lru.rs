//! Bounded least-recently-used map
//!
//! Building block for the inventory caches: a `HashMap` paired with a
//! recency queue. Every access pushes a fresh stamp onto the queue; eviction
//! pops stale queue entries until it finds the key whose stamp is current.
//! Amortized O(1), memory bounded by `capacity` live entries plus a small
//! multiple of stale queue slots.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

struct Entry<V> {
    value: V,
    stamp: u64,
}

pub(crate) struct LruMap<K, V> {
    capacity: usize,
    stamp: u64,
    entries: HashMap<K, Entry<V>>,
    order: VecDeque<(K, u64)>,
}

impl<K: Eq + Hash + Clone, V> LruMap<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            stamp: 0,
            entries: HashMap::with_capacity(capacity / 10 + 1),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        self.stamp += 1;
        let stamp = self.stamp;

        if !self.entries.contains_key(key) {
            return None;
        }

        self.order.push_back((key.clone(), stamp));
        self.maybe_compact();

        let entry = self.entries.get_mut(key)?;
        entry.stamp = stamp;
        Some(&entry.value)
    }

    pub(crate) fn insert(&mut self, key: K, value: V) {
        self.stamp += 1;
        let stamp = self.stamp;

        self.order.push_back((key.clone(), stamp));
        let inserted = self.entries.insert(key, Entry { value, stamp }).is_none();

        if inserted && self.entries.len() > self.capacity {
            self.evict_one();
        }
        self.maybe_compact();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn evict_one(&mut self) {
        while let Some((key, stamp)) = self.order.pop_front() {
            let live = self
                .entries
                .get(&key)
                .map(|entry| entry.stamp == stamp)
                .unwrap_or(false);

            if live {
                self.entries.remove(&key);
                return;
            }
        }
    }

    // Drop stale queue slots once they clearly dominate the live entries.
    fn maybe_compact(&mut self) {
        if self.order.len() > self.capacity.saturating_mul(4).max(64) {
            let entries = &self.entries;
            self.order.retain(|(key, stamp)| {
                entries
                    .get(key)
                    .map(|entry| entry.stamp == *stamp)
                    .unwrap_or(false)
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut map = LruMap::new(2);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a"), None);
        assert_eq!(map.get(&"b"), Some(&2));
        assert_eq!(map.get(&"c"), Some(&3));
    }

    #[test]
    fn access_refreshes_recency() {
        let mut map = LruMap::new(2);
        map.insert("a", 1);
        map.insert("b", 2);

        // Touch "a" so "b" becomes the eviction victim.
        assert_eq!(map.get(&"a"), Some(&1));
        map.insert("c", 3);

        assert_eq!(map.get(&"a"), Some(&1));
        assert_eq!(map.get(&"b"), None);
        assert_eq!(map.get(&"c"), Some(&3));
    }

    #[test]
    fn overwrite_does_not_grow_the_map() {
        let mut map = LruMap::new(2);
        map.insert("a", 1);
        map.insert("a", 2);
        map.insert("b", 3);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a"), Some(&2));
    }

    #[test]
    fn survives_many_reinserts_of_same_key() {
        let mut map = LruMap::new(4);
        for i in 0..10_000 {
            map.insert("hot", i);
        }
        assert_eq!(map.get(&"hot"), Some(&9_999));
        assert_eq!(map.len(), 1);
    }
}
