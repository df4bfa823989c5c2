//! Time-bounded cache for fetched record sets.
//!
//! The cache is keyed by the requested year set and is kept separate from the
//! client. Callers pass `now` in, so expiry can be tested deterministically.
//! An outcome with any transport error is never stored, and a zero TTL stores
//! nothing at all.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

use crate::data::client::FetchOutcome;
use crate::domain::RawRecord;

/// Normalized year set: sorted and deduplicated. Empty means "all periods".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<i32>);

impl CacheKey {
    pub fn new(years: &[i32]) -> Self {
        let mut years = years.to_vec();
        years.sort_unstable();
        years.dedup();
        Self(years)
    }

    pub fn years(&self) -> &[i32] {
        &self.0
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Vec<RawRecord>,
    inserted_at: Instant,
}

/// Where a `get_or_fetch` result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

#[derive(Debug)]
pub struct FetchCache {
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records for `key` if inserted less than `ttl` before `now`.
    pub fn get(&self, key: &CacheKey, now: Instant) -> Option<&[RawRecord]> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.inserted_at) < self.ttl {
            Some(&entry.records)
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: CacheKey, records: Vec<RawRecord>, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                records,
                inserted_at: now,
            },
        );
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.inserted_at) < ttl);
        before - self.entries.len()
    }

    /// Return cached records for `key`, or run `fetch` and cache a clean result.
    ///
    /// The full `FetchOutcome` is returned on a miss so callers can report
    /// per-year errors; on a hit the outcome carries no requests or errors.
    pub fn get_or_fetch<F>(&mut self, key: &CacheKey, now: Instant, fetch: F) -> (FetchOutcome, CacheStatus)
    where
        F: FnOnce(&[i32]) -> FetchOutcome,
    {
        if let Some(records) = self.get(key, now) {
            debug!("Cache hit for years {:?}", key.years());
            let outcome = FetchOutcome {
                records: records.to_vec(),
                ..FetchOutcome::default()
            };
            return (outcome, CacheStatus::Hit);
        }

        let outcome = fetch(key.years());
        if self.ttl.is_zero() {
            debug!("Caching disabled; not storing years {:?}", key.years());
        } else if outcome.is_complete() {
            self.insert(key.clone(), outcome.records.clone(), now);
        } else {
            debug!("Not caching years {:?}: {} pass(es) failed", key.years(), outcome.errors.len());
        }
        (outcome, CacheStatus::Miss)
    }
}
