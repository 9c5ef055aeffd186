//! Single-entry dataset cache with a time-to-live.
//!
//! There is one global dataset, so the cache has no key: it holds at most
//! one normalized [`Dataset`] and the instant it was loaded. Callers receive
//! `Arc<Dataset>` handles; the dataset itself is never mutated, and a reload
//! replaces the entry rather than touching the shared value.
//!
//! Time is passed in by the caller so expiry is deterministic under test.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ReconError;
use crate::model::Dataset;

#[derive(Debug)]
struct CacheEntry {
    loaded_at: DateTime<Utc>,
    dataset: Arc<Dataset>,
}

#[derive(Debug)]
pub struct DatasetCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached dataset if it is still fresh at `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<Arc<Dataset>> {
        self.entry
            .as_ref()
            .filter(|e| self.is_fresh(e, now))
            .map(|e| Arc::clone(&e.dataset))
    }

    /// Return the fresh dataset, or call `load` and cache its result.
    ///
    /// A failed load leaves any previous (stale) entry in place but does not
    /// serve it; the error is returned to the caller.
    pub fn get_or_load<F>(&mut self, now: DateTime<Utc>, load: F) -> Result<Arc<Dataset>, ReconError>
    where
        F: FnOnce() -> Result<Dataset, ReconError>,
    {
        if let Some(dataset) = self.get(now) {
            log::debug!("dataset cache hit (expires {:?})", self.expires_at());
            return Ok(dataset);
        }

        log::info!("dataset cache miss, loading");
        let dataset = Arc::new(load()?);
        self.entry = Some(CacheEntry {
            loaded_at: now,
            dataset: Arc::clone(&dataset),
        });
        Ok(dataset)
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|e| e.loaded_at)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.ttl).ok()?;
        self.entry.as_ref().and_then(|e| e.loaded_at.checked_add_signed(ttl))
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards yields a negative age; treat it as zero.
        let age = now
            .signed_duration_since(entry.loaded_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age < self.ttl
    }
}
