//! In-memory, coordinate-keyed weather cache.
//!
//! Entries are keyed by latitude and longitude rounded to 4 decimal places
//! (roughly 11 m), so nearby points share an entry. An entry is fresh while
//! `now - fetched_at < ttl`; stale entries are invisible to [`WeatherCache::get`]
//! and are dropped by [`WeatherCache::sweep`].

use std::collections::HashMap;

use crate::model::WeatherSnapshot;

pub const DEFAULT_TTL_MILLIS: i64 = 5 * 60 * 1000;
pub const DEFAULT_SWEEP_INTERVAL_MILLIS: i64 = 10 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub snapshot: WeatherSnapshot,
    pub fetched_at_millis: i64,
}

#[derive(Debug)]
pub struct WeatherCache {
    ttl_millis: i64,
    entries: HashMap<String, CacheEntry>,
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_MILLIS)
    }
}

impl WeatherCache {
    pub fn new(ttl_millis: i64) -> Self {
        Self { ttl_millis, entries: HashMap::new() }
    }

    /// Cache key for a coordinate pair.
    pub fn key(lat: f64, lon: f64) -> String {
        format!("{},{}", round4(lat), round4(lon))
    }

    /// Returns the snapshot only if an entry exists and is still fresh.
    pub fn get(&self, lat: f64, lon: f64, now_millis: i64) -> Option<WeatherSnapshot> {
        self.entries
            .get(&Self::key(lat, lon))
            .filter(|entry| self.is_fresh(entry, now_millis))
            .map(|entry| entry.snapshot.clone())
    }

    /// Inserts or overwrites the entry for the rounded key.
    pub fn put(&mut self, lat: f64, lon: f64, snapshot: WeatherSnapshot, now_millis: i64) {
        let key = Self::key(lat, lon);
        self.entries.insert(
            key.clone(),
            CacheEntry { key, snapshot, fetched_at_millis: now_millis },
        );
    }

    /// Removes every entry that is no longer fresh. Returns how many were removed.
    pub fn sweep(&mut self, now_millis: i64) -> usize {
        let ttl = self.ttl_millis;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now_millis - entry.fetched_at_millis < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, lat: f64, lon: f64) -> Option<&CacheEntry> {
        self.entries.get(&Self::key(lat, lon))
    }

    fn is_fresh(&self, entry: &CacheEntry, now_millis: i64) -> bool {
        now_millis - entry.fetched_at_millis < self.ttl_millis
    }
}

fn round4(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    // -0.0 would otherwise key differently from 0.0
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.4}")
}
