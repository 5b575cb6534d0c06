//! Freshness metadata for cache reads.
//!
//! Every read returns a [`CacheRead<V>`] that records where the value came
//! from, so callers can tell a fresh network result from a stale fallback.

use std::time::Duration;
use tokio::time::Instant;
use vantage_core::FetchError;

/// A cached value together with its age bookkeeping.
///
/// An entry is fresh while `now - fetched_at < ttl` and it has not been
/// invalidated. Stale entries are kept: they are the fallback when a
/// refresh fails.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
    ttl: Duration,
    invalidated: bool,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, fetched_at: Instant, ttl: Duration) -> Self {
        debug_assert!(!ttl.is_zero(), "cache TTL must be positive");
        Self {
            value,
            fetched_at,
            ttl,
            invalidated: false,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check whether the entry may be served without a network call.
    pub fn is_fresh(&self, now: Instant) -> bool {
        !self.invalidated && now.saturating_duration_since(self.fetched_at) < self.ttl
    }

    /// Force the entry stale without discarding it.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }
}

/// Where a [`CacheRead`] value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSource {
    /// Served from a fresh entry, no network call.
    Cache,
    /// Fetched from the network by this (or a coalesced) call.
    Network,
    /// The network call failed and an older entry was served instead.
    Stale { error: FetchError },
}

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<V> {
    value: V,
    fetched_at: Instant,
    source: ReadSource,
}

impl<V: Clone> CacheRead<V> {
    pub(crate) fn cached(entry: &CacheEntry<V>) -> Self {
        Self {
            value: entry.value.clone(),
            fetched_at: entry.fetched_at,
            source: ReadSource::Cache,
        }
    }

    pub(crate) fn fetched(entry: &CacheEntry<V>) -> Self {
        Self {
            value: entry.value.clone(),
            fetched_at: entry.fetched_at,
            source: ReadSource::Network,
        }
    }

    pub(crate) fn stale(entry: &CacheEntry<V>, error: FetchError) -> Self {
        Self {
            value: entry.value.clone(),
            fetched_at: entry.fetched_at,
            source: ReadSource::Stale { error },
        }
    }
}

impl<V> CacheRead<V> {
    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> V {
        self.value
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn source(&self) -> &ReadSource {
        &self.source
    }

    /// When the value was obtained from the network.
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// How long ago the value was fetched.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }

    pub fn was_cache_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.source, ReadSource::Stale { .. })
    }

    /// The error that forced a stale fallback, if any.
    pub fn stale_error(&self) -> Option<&FetchError> {
        match &self.source {
            ReadSource::Stale { error } => Some(error),
            _ => None,
        }
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(V) -> U,
    {
        CacheRead {
            value: f(self.value),
            fetched_at: self.fetched_at,
            source: self.source,
        }
    }
}

impl<V> AsRef<V> for CacheRead<V> {
    fn as_ref(&self) -> &V {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_freshness_window() {
        let entry = CacheEntry::new(7u32, Instant::now(), Duration::from_secs(10));
        assert!(entry.is_fresh(Instant::now()));

        tokio::time::advance(Duration::from_millis(9_999)).await;
        assert!(entry.is_fresh(Instant::now()));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!entry.is_fresh(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_entry_is_stale() {
        let mut entry = CacheEntry::new("v", Instant::now(), Duration::from_secs(60));
        entry.invalidate();
        assert!(!entry.is_fresh(Instant::now()));
        assert_eq!(*entry.value(), "v");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_read_sources() {
        let entry = CacheEntry::new(1u8, Instant::now(), Duration::from_secs(1));

        let hit = CacheRead::cached(&entry);
        assert!(hit.was_cache_hit());
        assert!(!hit.is_stale());

        let fetched = CacheRead::fetched(&entry);
        assert_eq!(fetched.source(), &ReadSource::Network);

        let stale = CacheRead::stale(&entry, FetchError::transport("health", "refused"));
        assert!(stale.is_stale());
        assert_eq!(stale.stale_error().map(|e| e.resource()), Some("health"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_read_map_and_age() {
        let entry = CacheEntry::new(42i32, Instant::now(), Duration::from_secs(5));
        let read = CacheRead::fetched(&entry);
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(read.age(), Duration::from_secs(3));

        let mapped = read.map(|v| v.to_string());
        assert_eq!(mapped.into_value(), "42");
    }
}
