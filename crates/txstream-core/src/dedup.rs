//! Time-bounded set of already forwarded transaction hashes.
//!
//! Entries expire a fixed TTL after insertion, regardless of lookups.
//! Expiry is driven by the `now` passed to each call, so the cache never
//! needs a background sweeper and behaves deterministically in tests.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Expiry-ordered queue plus a presence index.
#[derive(Debug)]
pub struct DedupCache {
    ttl: Duration,
    capacity: usize,
    /// `(expires_at, hash)`, oldest first. With a fixed TTL and monotonic
    /// `now` this is also expiry order.
    queue: VecDeque<(Instant, String)>,
    index: HashSet<String>,
}

impl DedupCache {
    /// Create a cache holding each hash for `ttl`, with at most `capacity`
    /// live entries (oldest evicted first). A zero capacity is treated as one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            queue: VecDeque::new(),
            index: HashSet::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns `true` if `hash` was inserted within the last TTL.
    pub fn contains(&mut self, hash: &str, now: Instant) -> bool {
        self.expire(now);
        self.index.contains(hash)
    }

    /// Insert `hash` with a fresh TTL. Returns `false` if it was already live;
    /// an existing entry keeps its original expiry.
    pub fn insert(&mut self, hash: impl Into<String>, now: Instant) -> bool {
        self.expire(now);
        let hash = hash.into();
        if self.index.contains(&hash) {
            return false;
        }
        while self.queue.len() >= self.capacity {
            if let Some((_, oldest)) = self.queue.pop_front() {
                tracing::trace!(hash = %oldest, "dedup cache full, evicting oldest");
                self.index.remove(&oldest);
            }
        }
        self.index.insert(hash.clone());
        self.queue.push_back((now + self.ttl, hash));
        true
    }

    /// Insert `hash` if absent. Returns `true` if the caller should forward it.
    pub fn check_and_insert(&mut self, hash: &str, now: Instant) -> bool {
        if self.contains(hash, now) {
            return false;
        }
        self.insert(hash, now)
    }

    /// Number of entries, including any not yet swept.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn expire(&mut self, now: Instant) {
        while let Some((expires_at, _)) = self.queue.front() {
            if *expires_at > now {
                break;
            }
            if let Some((_, hash)) = self.queue.pop_front() {
                self.index.remove(&hash);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn first_sighting_is_forwarded_once() {
        let now = Instant::now();
        let mut cache = DedupCache::new(TTL, 16);
        assert!(cache.check_and_insert("0xaaa", now));
        assert!(!cache.check_and_insert("0xaaa", now + Duration::from_secs(1)));
        assert!(cache.check_and_insert("0xbbb", now + Duration::from_secs(2)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let t0 = Instant::now();
        let mut cache = DedupCache::new(TTL, 16);
        cache.insert("0xaaa", t0);
        assert!(cache.contains("0xaaa", t0 + TTL - Duration::from_millis(1)));
        assert!(!cache.contains("0xaaa", t0 + TTL));
        assert!(cache.is_empty());
        assert!(cache.check_and_insert("0xaaa", t0 + TTL));
    }

    #[test]
    fn lookups_do_not_extend_expiry() {
        let t0 = Instant::now();
        let mut cache = DedupCache::new(TTL, 16);
        cache.insert("0xaaa", t0);
        for s in 1..60 {
            assert!(cache.contains("0xaaa", t0 + Duration::from_secs(s)));
        }
        assert!(!cache.contains("0xaaa", t0 + Duration::from_secs(60)));
    }

    #[test]
    fn reinsert_keeps_original_expiry() {
        let t0 = Instant::now();
        let mut cache = DedupCache::new(TTL, 16);
        assert!(cache.insert("0xaaa", t0));
        assert!(!cache.insert("0xaaa", t0 + Duration::from_secs(30)));
        assert!(!cache.contains("0xaaa", t0 + TTL));
    }

    #[test]
    fn expires_in_insertion_order() {
        let t0 = Instant::now();
        let mut cache = DedupCache::new(TTL, 16);
        cache.insert("0x1", t0);
        cache.insert("0x2", t0 + Duration::from_secs(10));
        cache.insert("0x3", t0 + Duration::from_secs(20));

        let at = t0 + TTL + Duration::from_secs(10);
        assert!(!cache.contains("0x1", at));
        assert!(!cache.contains("0x2", at));
        assert!(cache.contains("0x3", at));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let now = Instant::now();
        let mut cache = DedupCache::new(TTL, 2);
        cache.insert("0x1", now);
        cache.insert("0x2", now);
        cache.insert("0x3", now);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("0x1", now));
        assert!(cache.contains("0x2", now));
        assert!(cache.contains("0x3", now));
    }
}
