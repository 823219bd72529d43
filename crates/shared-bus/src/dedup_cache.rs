//! # Time-Bounded Dedup Cache
//!
//! Notification targets use this to drop redeliveries of an event they
//! already applied. Keys are contract-context digests.
//!
//! - Entries live for `window_secs` after first sight
//! - Expired entries are garbage-collected every `gc_interval_secs`
//! - At `max_entries` the oldest entry is evicted, so memory stays bounded

use shared_types::entities::Hash;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from dedup cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DedupError {
    /// The key was seen within the window.
    #[error("Duplicate delivery of {key} (first seen at {first_seen})")]
    Duplicate { key: String, first_seen: u64 },
}

/// Bounded, time-windowed set of recently seen keys.
#[derive(Debug)]
pub struct TimeBoundedDedupCache {
    cache: HashMap<Hash, u64>,
    window_secs: u64,
    max_entries: usize,
    last_gc: u64,
    gc_interval_secs: u64,
}

impl TimeBoundedDedupCache {
    /// Default dedup window.
    pub const DEFAULT_WINDOW: u64 = 600;

    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL: u64 = 10;

    /// Default entry bound.
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

    /// Create a cache with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_WINDOW, Self::DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with a custom window and bound.
    #[must_use]
    pub fn with_config(window_secs: u64, max_entries: usize) -> Self {
        Self {
            cache: HashMap::new(),
            window_secs,
            max_entries: max_entries.max(1),
            last_gc: 0,
            gc_interval_secs: Self::DEFAULT_GC_INTERVAL,
        }
    }

    /// Record `key` at `now`, or report it as a duplicate.
    pub fn check_and_add(&mut self, key: Hash, now: u64) -> Result<(), DedupError> {
        if now.saturating_sub(self.last_gc) > self.gc_interval_secs {
            self.garbage_collect(now);
            self.last_gc = now;
        }

        if let Some(&first_seen) = self.cache.get(&key) {
            if now.saturating_sub(first_seen) < self.window_secs {
                return Err(DedupError::Duplicate {
                    key: hex_prefix(&key),
                    first_seen,
                });
            }
        }

        if self.cache.len() >= self.max_entries && !self.cache.contains_key(&key) {
            self.evict_oldest();
        }

        self.cache.insert(key, now);
        Ok(())
    }

    /// Check if a key is cached without adding it.
    #[must_use]
    pub fn contains(&self, key: &Hash) -> bool {
        self.cache.contains_key(key)
    }

    /// Get the number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn garbage_collect(&mut self, now: u64) {
        let window = self.window_secs;
        self.cache
            .retain(|_, &mut seen| now.saturating_sub(seen) < window);
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .cache
            .iter()
            .min_by_key(|(_, &seen)| seen)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.cache.remove(&key);
        }
    }
}

impl Default for TimeBoundedDedupCache {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_prefix(key: &Hash) -> String {
    key[..6].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_duplicate_rejected_within_window() {
        let mut cache = TimeBoundedDedupCache::new();
        assert!(cache.check_and_add([1u8; 32], NOW).is_ok());
        assert!(matches!(
            cache.check_and_add([1u8; 32], NOW + 5),
            Err(DedupError::Duplicate { first_seen: NOW, .. })
        ));
        assert!(cache.check_and_add([2u8; 32], NOW + 5).is_ok());
    }

    #[test]
    fn test_key_accepted_after_window() {
        let mut cache = TimeBoundedDedupCache::with_config(60, 100);
        cache.check_and_add([1u8; 32], NOW).unwrap();
        assert!(cache.check_and_add([1u8; 32], NOW + 61).is_ok());
    }

    #[test]
    fn test_garbage_collection() {
        let mut cache = TimeBoundedDedupCache::with_config(60, 100);
        cache.check_and_add([1u8; 32], NOW).unwrap();
        cache.check_and_add([2u8; 32], NOW + 100).unwrap();
        assert!(!cache.contains(&[1u8; 32]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let mut cache = TimeBoundedDedupCache::with_config(600, 2);
        cache.check_and_add([1u8; 32], NOW).unwrap();
        cache.check_and_add([2u8; 32], NOW + 1).unwrap();
        cache.check_and_add([3u8; 32], NOW + 2).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&[1u8; 32]));
        assert!(cache.contains(&[3u8; 32]));
    }
}
