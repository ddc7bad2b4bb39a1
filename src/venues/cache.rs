//! Bounded read-through cache for venue records
//!
//! Only display paths read through it. Anything that decides ownership or moves
//! money goes to the store.

use crate::common::types::Venue;
use crate::games::types::VenueKey;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

struct CachedVenue {
    venue: Venue,
    cached_at: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    pub capacity: usize,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

pub struct VenueCache {
    entries: Mutex<LruCache<VenueKey, CachedVenue>>,
    capacity: NonZeroUsize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl VenueCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<VenueKey, CachedVenue>> {
        // entries are replaced whole, so a poisoned lock is still consistent
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &VenueKey) -> Option<Venue> {
        let mut entries = self.lock();
        let fresh = entries
            .get(key)
            .map(|entry| entry.cached_at.elapsed() <= self.ttl);

        match fresh {
            Some(true) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                entries.get(key).map(|entry| entry.venue.clone())
            }
            Some(false) => {
                entries.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, venue: Venue) {
        self.lock().put(
            venue.key.clone(),
            CachedVenue {
                venue,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &VenueKey) {
        self.lock().pop(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            capacity: self.capacity.get(),
            size: self.lock().len(),
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}
