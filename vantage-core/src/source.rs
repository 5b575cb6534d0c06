//! Backend data source abstraction.

use async_trait::async_trait;

use crate::agent::Agent;
use crate::error::{FetchError, FetchResult};
use crate::health::{SearchIndexStatus, SystemHealth, SystemMetrics};
use crate::snapshot::{Alert, DashboardMetrics, DashboardSnapshot, SearchHit};

/// A section value together with how it was obtained.
///
/// `stale` is set when the live request failed and a previously cached
/// value was served in its place.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub stale: Option<FetchError>,
}

impl<T> Fetched<T> {
    pub fn fresh(value: T) -> Self {
        Self { value, stale: None }
    }

    pub fn stale(value: T, error: FetchError) -> Self {
        Self {
            value,
            stale: Some(error),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.is_some()
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U, F>(self, f: F) -> Fetched<U>
    where
        F: FnOnce(T) -> U,
    {
        Fetched {
            value: f(self.value),
            stale: self.stale,
        }
    }
}

/// Read access to the backend sections a dashboard snapshot is built from.
///
/// The HTTP gateway is the production implementation; tests substitute an
/// in-memory source. Implementations are expected to apply their own caching
/// so repeated calls within a resource's TTL stay off the network, and to
/// report a cached fallback through [`Fetched::stale`] rather than as a
/// live read.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Fetch the composite snapshot in a single call.
    async fn complete(&self) -> FetchResult<Fetched<DashboardSnapshot>>;

    async fn health(&self) -> FetchResult<Fetched<SystemHealth>>;

    async fn agents(&self) -> FetchResult<Fetched<Vec<Agent>>>;

    async fn stats(&self) -> FetchResult<Fetched<DashboardMetrics>>;

    async fn alerts(&self) -> FetchResult<Fetched<Vec<Alert>>>;

    async fn search_health(&self) -> FetchResult<Fetched<SearchIndexStatus>>;

    async fn system_metrics(&self) -> FetchResult<Fetched<SystemMetrics>>;

    /// Best-effort semantic search; failures yield an empty list.
    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit>;

    /// Mark every cached section stale so the next read goes to the network.
    fn invalidate(&self);
}
