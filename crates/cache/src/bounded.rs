use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;

use crate::CacheError;

type Weigher<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;

/// Byte-bounded map that evicts least-recently-added entries.
///
/// Every value is weighed once on insert. When a new entry does not fit,
/// the oldest entries are dropped until it does. Iteration order is
/// oldest → newest.
pub struct BoundedCache<K, V> {
    entries: HashMap<K, (V, usize)>,
    order: VecDeque<K>,
    capacity: usize,
    used: usize,
    weigher: Weigher<V>,
}

/// Snapshot of how full a cache is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheUsage {
    pub used: usize,
    pub capacity: usize,
    pub percent: f64,
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    /// Create an empty cache holding at most `capacity` weighed bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, weigher: impl Fn(&V) -> usize + Send + Sync + 'static) -> Self {
        assert!(capacity > 0, "BoundedCache capacity must be > 0");
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            used: 0,
            weigher: Box::new(weigher),
        }
    }

    /// Insert or replace `key`, returning the entries evicted to make room.
    ///
    /// An entry heavier than the whole capacity is rejected and the cache is
    /// left untouched.
    pub fn set(&mut self, key: K, value: V) -> Result<Vec<(K, V)>, CacheError> {
        let size = (self.weigher)(&value);
        if size > self.capacity {
            return Err(CacheError::TooLarge {
                size,
                capacity: self.capacity,
            });
        }

        self.evict(&key);
        let mut evicted = Vec::new();
        while self.used + size > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some((v, w)) = self.entries.remove(&oldest) {
                self.used -= w;
                evicted.push((oldest, v));
            }
        }

        self.used += size;
        self.order.push_back(key.clone());
        self.entries.insert(key, (value, size));
        Ok(evicted)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(v, _)| v)
    }

    /// Remove `key`, returning its value.
    pub fn evict(&mut self, key: &K) -> Option<V> {
        let (value, size) = self.entries.remove(key)?;
        self.used -= size;
        self.order.retain(|k| k != key);
        Some(value)
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).map(|(v, _)| (k, v)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weighed bytes currently stored.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn usage(&self) -> CacheUsage {
        CacheUsage {
            used: self.used,
            capacity: self.capacity,
            percent: self.used as f64 * 100.0 / self.capacity as f64,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.used = 0;
    }
}

impl<K: fmt::Debug, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("keys", &self.order)
            .field("used", &self.used)
            .field("capacity", &self.capacity)
            .finish()
    }
}
