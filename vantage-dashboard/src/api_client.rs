//! HTTP gateway for the operations backend.
//!
//! Every read goes through the shared [`CacheStore`] using the TTL of the
//! resource being read. Search is the one exception: it is never cached.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use vantage_core::{
    Agent, Alert, DashboardMetrics, DashboardSnapshot, DashboardSource, FetchError, FetchResult,
    Fetched, Listing, SearchHit, SearchIndexStatus, SystemHealth, SystemMetrics,
};
use vantage_storage::{CacheRead, CacheStore};

use crate::config::DashboardConfig;
use crate::error::DashboardError;

/// Path of the semantic search endpoint (POST, uncached).
pub const SEARCH_PATH: &str = "/api/leann/search";

const MAX_ERROR_BODY: usize = 512;

/// Logical backend resources with a fixed path and cache TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Health,
    SystemMetrics,
    AgentsList,
    DashboardStats,
    DashboardAlerts,
    DashboardComplete,
    SearchHealth,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Health,
        Resource::SystemMetrics,
        Resource::AgentsList,
        Resource::DashboardStats,
        Resource::DashboardAlerts,
        Resource::DashboardComplete,
        Resource::SearchHealth,
    ];

    /// Cache key and log name.
    pub fn key(&self) -> &'static str {
        match self {
            Resource::Health => "health",
            Resource::SystemMetrics => "systemMetrics",
            Resource::AgentsList => "agentsList",
            Resource::DashboardStats => "dashboardStats",
            Resource::DashboardAlerts => "dashboardAlerts",
            Resource::DashboardComplete => "dashboardComplete",
            Resource::SearchHealth => "searchHealth",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Resource::Health => "/api/health",
            Resource::SystemMetrics => "/api/system/metrics",
            Resource::AgentsList => "/api/agents/list",
            Resource::DashboardStats => "/api/dashboard/stats",
            Resource::DashboardAlerts => "/api/dashboard/alerts",
            Resource::DashboardComplete => "/api/dashboard/complete",
            Resource::SearchHealth => "/api/leann/health",
        }
    }

    pub fn ttl(&self) -> Duration {
        match self {
            Resource::Health => Duration::from_secs(10),
            Resource::SystemMetrics => Duration::from_secs(30),
            Resource::AgentsList => Duration::from_secs(300),
            Resource::DashboardStats => Duration::from_secs(60),
            Resource::DashboardAlerts => Duration::from_secs(30),
            Resource::DashboardComplete => Duration::from_secs(10),
            Resource::SearchHealth => Duration::from_secs(60),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    limit: usize,
}

/// Cached, deduplicating client for the backend's read endpoints.
#[derive(Clone)]
pub struct RemoteDataGateway {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    cache: CacheStore<serde_json::Value>,
}

impl RemoteDataGateway {
    pub fn new(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, &config.api_base_url, timeout))
    }

    /// Build a gateway around an existing client.
    pub fn with_client(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            cache: CacheStore::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &CacheStore<serde_json::Value> {
        &self.cache
    }

    /// Read a resource as raw JSON through the cache.
    pub async fn get(&self, resource: Resource) -> FetchResult<CacheRead<serde_json::Value>> {
        self.read::<serde_json::Value>(resource).await
    }

    /// Read a resource through the cache and decode it as `T`.
    ///
    /// The payload is validated against `T` before it is cached, so a
    /// malformed response counts as a fetch failure and leaves the previous
    /// entry in place as a stale fallback. A fallback read is returned with
    /// [`Fetched::stale`] set to the error of the failed live request.
    pub async fn get_as<T>(&self, resource: Resource) -> FetchResult<Fetched<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let read = self.read::<T>(resource).await?;
        let value =
            T::deserialize(read.value()).map_err(|e| FetchError::decode(resource.key(), e))?;
        match read.stale_error() {
            Some(err) => {
                tracing::debug!(
                    resource = resource.key(),
                    age = ?read.age(),
                    error = %err,
                    "using stale payload"
                );
                Ok(Fetched::stale(value, err.clone()))
            }
            None => Ok(Fetched::fresh(value)),
        }
    }

    /// Read a list resource, decoding each record on its own.
    ///
    /// Records that do not decode are skipped with a warning so one bad
    /// entry does not blank the whole section.
    pub async fn get_list<T>(&self, resource: Resource) -> FetchResult<Fetched<Vec<T>>>
    where
        T: DeserializeOwned,
    {
        let read = self.get_as::<Listing<serde_json::Value>>(resource).await?;
        Ok(read.map(|listing| decode_records(resource, listing.into_vec())))
    }

    /// Semantic search against the index. Never cached; failures yield no hits.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        match self.try_search(query, limit).await {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(error = %err, query, "search failed, returning no results");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, query: &str, limit: usize) -> FetchResult<Vec<SearchHit>> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let response = self
            .client
            .post(url)
            .json(&SearchRequest { q: query, limit })
            .send()
            .await
            .map_err(|e| transport_error("search", e, self.timeout))?;
        let value = parse_response("search", response, self.timeout).await?;
        let listing = Listing::<SearchHit>::deserialize(&value)
            .map_err(|e| FetchError::decode("search", e))?;
        Ok(listing.into_vec())
    }

    async fn read<T: DeserializeOwned + 'static>(
        &self,
        resource: Resource,
    ) -> FetchResult<CacheRead<serde_json::Value>> {
        let client = self.client.clone();
        let url = format!("{}{}", self.base_url, resource.path());
        let timeout = self.timeout;
        self.cache
            .get_or_fetch(resource.key(), resource.ttl(), move || {
                fetch_json::<T>(client, url, resource.key(), timeout)
            })
            .await
    }
}

fn decode_records<T: DeserializeOwned>(
    resource: Resource,
    records: Vec<serde_json::Value>,
) -> Vec<T> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match T::deserialize(record) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::warn!(resource = resource.key(), index, error = %err, "skipping malformed record");
                None
            }
        })
        .collect()
}

async fn fetch_json<T: DeserializeOwned + 'static>(
    client: reqwest::Client,
    url: String,
    resource: &'static str,
    timeout: Duration,
) -> FetchResult<serde_json::Value> {
    tracing::debug!(resource, %url, "fetching");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| transport_error(resource, e, timeout))?;
    let value = parse_response(resource, response, timeout).await?;
    T::deserialize(&value).map_err(|e| FetchError::decode(resource, e))?;
    Ok(value)
}

async fn parse_response(
    resource: &str,
    response: reqwest::Response,
    timeout: Duration,
) -> FetchResult<serde_json::Value> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| FetchError::decode(resource, e))
    } else {
        let mut body = response
            .text()
            .await
            .map_err(|e| transport_error(resource, e, timeout))?;
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(FetchError::Status {
            resource: resource.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

fn transport_error(resource: &str, err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            resource: resource.to_string(),
            timeout,
        }
    } else {
        FetchError::transport(resource, err)
    }
}

#[async_trait]
impl DashboardSource for RemoteDataGateway {
    async fn complete(&self) -> FetchResult<Fetched<DashboardSnapshot>> {
        self.get_as(Resource::DashboardComplete).await
    }

    async fn health(&self) -> FetchResult<Fetched<SystemHealth>> {
        self.get_as(Resource::Health).await
    }

    async fn agents(&self) -> FetchResult<Fetched<Vec<Agent>>> {
        self.get_list(Resource::AgentsList).await
    }

    async fn stats(&self) -> FetchResult<Fetched<DashboardMetrics>> {
        self.get_as(Resource::DashboardStats).await
    }

    async fn alerts(&self) -> FetchResult<Fetched<Vec<Alert>>> {
        self.get_list(Resource::DashboardAlerts).await
    }

    async fn search_health(&self) -> FetchResult<Fetched<SearchIndexStatus>> {
        self.get_as(Resource::SearchHealth).await
    }

    async fn system_metrics(&self) -> FetchResult<Fetched<SystemMetrics>> {
        self.get_as(Resource::SystemMetrics).await
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        RemoteDataGateway::search(self, query, limit).await
    }

    fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}
