//! Bounded, time-expiring LRU cache.
//!
//! Entries are kept in an [`IndexMap`] ordered from least to most recently
//! used, so eviction pops the front and a hit moves the entry to the back.
//! Expiry is lazy: an entry past its time-to-live is dropped when it is next
//! looked up, or by an explicit [`BoundedCache::cleanup_expired`] sweep.
//! Nothing runs in the background.

use std::time::{Duration, Instant};

use indexmap::IndexMap;

/// A cached value with its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,
    /// When this entry was (re)inserted
    pub created_at: Instant,
    /// How long the entry stays valid
    pub ttl: Duration,
    /// Number of hits served
    pub access_count: u64,
}

impl<V> CacheEntry<V> {
    /// Create a fresh entry
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            access_count: 0,
        }
    }

    /// Age of this entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// An entry whose age has reached its ttl is expired; a zero ttl is
    /// therefore expired immediately.
    pub fn is_expired(&self) -> bool {
        self.age() >= self.ttl
    }
}

/// Capacity-bounded, recency-ordered map with per-entry time-to-live
#[derive(Debug, Clone)]
pub struct BoundedCache<V> {
    /// Maximum number of entries
    capacity: usize,
    /// Front = least recently used
    entries: IndexMap<String, CacheEntry<V>>,
}

impl<V> BoundedCache<V> {
    /// Creates a new cache with the given capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is present, without touching recency or expiry
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Hits served by the entry under `key`
    pub fn access_count(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|e| e.access_count)
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Gets the value for `key`.
    ///
    /// An expired entry is removed and reported as absent. A hit marks the
    /// entry most recently used and bumps its access counter.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let (key, mut entry) = self.entries.shift_remove_entry(key)?;
        if entry.is_expired() {
            return None;
        }

        entry.access_count += 1;
        let (index, _) = self.entries.insert_full(key, entry);
        self.entries.get_index(index).map(|(_, e)| &e.value)
    }

    /// Inserts or replaces `key`.
    ///
    /// Replacing resets the timestamp, ttl and access counter. Inserting a
    /// new key into a full cache evicts the least recently used entry first;
    /// its key is returned.
    pub fn put(&mut self, key: impl Into<String>, value: V, ttl: Duration) -> Option<String> {
        let key = key.into();
        let mut evicted = None;

        if self.entries.shift_remove(&key).is_none() && self.entries.len() >= self.capacity {
            evicted = self.entries.shift_remove_index(0).map(|(k, _)| k);
        }

        self.entries.insert(key, CacheEntry::new(value, ttl));
        evicted
    }

    /// Removes a single entry
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.shift_remove(key).map(|e| e.value)
    }

    /// Clears everything when `pattern` is `None`, otherwise removes every
    /// key containing `pattern` as a substring. Returns how many went.
    pub fn invalidate(&mut self, pattern: Option<&str>) -> usize {
        match pattern {
            None => {
                let removed = self.entries.len();
                self.entries.clear();
                removed
            }
            Some(pattern) => self.invalidate_where(|key| key.contains(pattern)),
        }
    }

    /// Removes every key for which `matches` returns true
    pub fn invalidate_where<F>(&mut self, matches: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, _| !matches(key));
        before - self.entries.len()
    }

    /// Removes every expired entry, returning how many were dropped
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }
}
