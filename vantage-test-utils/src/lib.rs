//! Vantage Test Utilities
//!
//! Shared test infrastructure for the Vantage workspace:
//! - A scriptable in-memory `DashboardSource`
//! - Proptest generators for agents and filter criteria
//! - Fixtures for common dashboard scenarios
//! - Assertions for snapshot degradation

pub use vantage_core::{
    Agent, AgentStatus, AggregationError, Alert, AlertType, CategoryFilter, DashboardMetrics,
    DashboardSnapshot, DashboardSource, FetchError, FetchResult, Fetched, FilterCriteria,
    FilterUpdate,
    HealthStatus, SearchHit, SearchIndexStatus, Section, SortKey, SystemHealth, SystemMetrics,
    Timestamp,
};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

// ============================================================================
// MOCK SOURCE
// ============================================================================

/// One scripted endpoint: a canned response plus a call counter.
#[derive(Debug)]
pub struct Endpoint<T> {
    name: &'static str,
    response: Mutex<FetchResult<Fetched<T>>>,
    calls: AtomicUsize,
}

impl<T: Clone> Endpoint<T> {
    fn failing(name: &'static str) -> Self {
        Self {
            name,
            response: Mutex::new(Err(FetchError::transport(name, "connection refused"))),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer every following call with `value`.
    pub fn succeed(&self, value: T) {
        *lock(&self.response) = Ok(Fetched::fresh(value));
    }

    /// Answer every following call with a cached `value` standing in for a
    /// failed live request.
    pub fn serve_stale(&self, value: T, reason: &str) {
        *lock(&self.response) = Ok(Fetched::stale(value, FetchError::transport(self.name, reason)));
    }

    /// Answer every following call with a transport error.
    pub fn fail(&self, reason: &str) {
        *lock(&self.response) = Err(FetchError::transport(self.name, reason));
    }

    pub fn respond(&self, response: FetchResult<T>) {
        *lock(&self.response) = response.map(Fetched::fresh);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn call(&self, latency: Duration) -> FetchResult<Fetched<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        lock(&self.response).clone()
    }
}

/// In-memory [`DashboardSource`] with scripted responses.
///
/// Every endpoint starts out failing. Responses can be changed between
/// calls, and every call is counted.
#[derive(Debug)]
pub struct MockSource {
    pub complete: Endpoint<DashboardSnapshot>,
    pub health: Endpoint<SystemHealth>,
    pub agents: Endpoint<Vec<Agent>>,
    pub stats: Endpoint<DashboardMetrics>,
    pub alerts: Endpoint<Vec<Alert>>,
    pub search_health: Endpoint<SearchIndexStatus>,
    pub system_metrics: Endpoint<SystemMetrics>,
    search_hits: Mutex<Vec<SearchHit>>,
    search_calls: AtomicUsize,
    invalidations: AtomicUsize,
    latency: Mutex<Duration>,
}

impl MockSource {
    /// A source whose every endpoint fails.
    pub fn new() -> Self {
        Self {
            complete: Endpoint::failing("dashboardComplete"),
            health: Endpoint::failing("health"),
            agents: Endpoint::failing("agentsList"),
            stats: Endpoint::failing("dashboardStats"),
            alerts: Endpoint::failing("dashboardAlerts"),
            search_health: Endpoint::failing("searchHealth"),
            system_metrics: Endpoint::failing("systemMetrics"),
            search_hits: Mutex::new(Vec::new()),
            search_calls: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Composite endpoint down, every individual section healthy.
    pub fn with_sections() -> Self {
        let source = Self::new();
        source.health.succeed(fixtures::healthy());
        source.agents.succeed(fixtures::sample_agents());
        source.stats.succeed(fixtures::sample_metrics());
        source.alerts.succeed(fixtures::sample_alerts());
        source.search_health.succeed(fixtures::search_index_ready());
        source.system_metrics.succeed(SystemMetrics::default());
        source
    }

    /// Delay every endpoint call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    pub fn set_search_hits(&self, hits: Vec<SearchHit>) {
        *lock(&self.search_hits) = hits;
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Number of snapshot builds observed, counted by composite calls.
    pub fn builds(&self) -> usize {
        self.complete.calls()
    }

    fn latency(&self) -> Duration {
        *lock(&self.latency)
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DashboardSource for MockSource {
    async fn complete(&self) -> FetchResult<Fetched<DashboardSnapshot>> {
        self.complete.call(self.latency()).await
    }

    async fn health(&self) -> FetchResult<Fetched<SystemHealth>> {
        self.health.call(self.latency()).await
    }

    async fn agents(&self) -> FetchResult<Fetched<Vec<Agent>>> {
        self.agents.call(self.latency()).await
    }

    async fn stats(&self) -> FetchResult<Fetched<DashboardMetrics>> {
        self.stats.call(self.latency()).await
    }

    async fn alerts(&self) -> FetchResult<Fetched<Vec<Alert>>> {
        self.alerts.call(self.latency()).await
    }

    async fn search_health(&self) -> FetchResult<Fetched<SearchIndexStatus>> {
        self.search_health.call(self.latency()).await
    }

    async fn system_metrics(&self) -> FetchResult<Fetched<SystemMetrics>> {
        self.system_metrics.call(self.latency()).await
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let needle = query.to_lowercase();
        lock(&self.search_hits)
            .iter()
            .filter(|hit| hit.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for dashboard types.

    use super::*;
    use proptest::prelude::*;

    /// Generate an AgentStatus variant.
    pub fn arb_agent_status() -> impl Strategy<Value = AgentStatus> {
        prop_oneof![
            Just(AgentStatus::Online),
            Just(AgentStatus::Busy),
            Just(AgentStatus::Offline),
            Just(AgentStatus::Error),
        ]
    }

    /// Generate one of a small set of categories so groups collide.
    pub fn arb_category() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("analysis".to_string()),
            Just("Analysis".to_string()),
            Just("ops".to_string()),
            Just("search".to_string()),
            Just(String::new()),
        ]
    }

    pub fn arb_agent() -> impl Strategy<Value = Agent> {
        (
            "[a-z0-9]{1,8}",
            "[A-Za-z ]{0,12}",
            "[A-Za-z ]{0,24}",
            arb_category(),
            arb_agent_status(),
            proptest::option::of(0.0f64..=1.0),
        )
            .prop_map(|(id, name, description, category, status, rate)| {
                let agent = Agent::new(id, name, category, status).with_description(description);
                match rate {
                    Some(rate) => agent.with_success_rate(rate),
                    None => agent,
                }
            })
    }

    pub fn arb_agents(max: usize) -> impl Strategy<Value = Vec<Agent>> {
        prop::collection::vec(arb_agent(), 0..max)
    }

    pub fn arb_sort_key() -> impl Strategy<Value = SortKey> {
        prop_oneof![
            Just(SortKey::Name),
            Just(SortKey::Status),
            Just(SortKey::Category),
            Just(SortKey::Performance),
        ]
    }

    pub fn arb_filter_criteria() -> impl Strategy<Value = FilterCriteria> {
        (
            "[a-zA-Z]{0,3}",
            prop_oneof![
                Just(CategoryFilter::All),
                arb_category().prop_map(CategoryFilter::Named),
            ],
            arb_sort_key(),
        )
            .prop_map(|(text, category, sort_key)| FilterCriteria {
                text,
                category,
                sort_key,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built dashboard data.

    use super::*;
    use chrono::Utc;

    pub fn healthy() -> SystemHealth {
        SystemHealth {
            version: Some("2.4.1".to_string()),
            uptime_seconds: Some(86_400),
            ..SystemHealth::new(HealthStatus::Healthy)
        }
        .with_service("database", HealthStatus::Healthy)
        .with_service("search", HealthStatus::Healthy)
    }

    /// Four agents across three categories; two are online.
    pub fn sample_agents() -> Vec<Agent> {
        vec![
            Agent::new("a-1", "Planner", "analysis", AgentStatus::Online)
                .with_description("Breaks work into steps")
                .with_success_rate(0.92)
                .with_total_executions(340),
            Agent::new("a-2", "indexer", "search", AgentStatus::Busy)
                .with_description("Maintains the vector index")
                .with_success_rate(0.71),
            Agent::new("a-3", "Reviewer", "analysis", AgentStatus::Online)
                .with_capabilities(["review", "lint"]),
            Agent::new("a-4", "Deployer", "ops", AgentStatus::Offline)
                .with_success_rate(0.99)
                .with_total_executions(12),
        ]
    }

    pub fn sample_metrics() -> DashboardMetrics {
        DashboardMetrics {
            total_agents: 4,
            active_agents: 3,
            total_executions: 352,
            success_rate: 0.9,
            avg_response_time_ms: 120.0,
            requests_per_minute: 14.5,
        }
    }

    /// One alert of each type.
    pub fn sample_alerts() -> Vec<Alert> {
        vec![
            alert("al-1", AlertType::Info, "Nightly reindex finished"),
            alert("al-2", AlertType::Warning, "Queue depth above 80%"),
            alert("al-3", AlertType::Error, "Deployer offline"),
        ]
    }

    pub fn alert(id: &str, alert_type: AlertType, message: &str) -> Alert {
        Alert {
            id: id.to_string(),
            alert_type,
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn search_index_ready() -> SearchIndexStatus {
        SearchIndexStatus {
            status: HealthStatus::Healthy,
            indexed_documents: Some(1_024),
            last_indexed_at: None,
        }
    }

    /// A complete, non-degraded snapshot built from the other fixtures.
    pub fn healthy_snapshot() -> DashboardSnapshot {
        DashboardSnapshot {
            health: healthy(),
            metrics: sample_metrics(),
            agents: sample_agents(),
            search_index_status: search_index_ready(),
            alerts: sample_alerts(),
            captured_at: Utc::now(),
            degraded_sections: Vec::new(),
            stale_sections: Vec::new(),
        }
    }

    pub fn search_hit(id: &str, title: &str, score: f64) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            title: title.to_string(),
            content: format!("{} content", title),
            score,
            metadata: serde_json::Map::new(),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for snapshot degradation.

    use super::*;

    /// Assert that exactly `expected` sections are placeholders, in any order.
    #[track_caller]
    pub fn assert_degraded(snapshot: &DashboardSnapshot, expected: &[Section]) {
        let mut actual = snapshot.degraded_sections.clone();
        let mut expected = expected.to_vec();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected, "unexpected degraded sections");
    }

    /// Assert that an aggregation failed for every core section.
    #[track_caller]
    pub fn assert_total_failure<T: std::fmt::Debug>(result: &Result<T, AggregationError>) {
        match result {
            Err(AggregationError::TotalFailure { failures }) => {
                assert_eq!(failures.len(), Section::CORE.len(), "failures: {:?}", failures);
            }
            other => panic!("Expected TotalFailure, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vantage_core::filter::{apply, group_by_category};

    #[test]
    fn test_assertion_total_failure() {
        let result: Result<(), AggregationError> = Err(AggregationError::TotalFailure {
            failures: Section::CORE
                .iter()
                .map(|section| (*section, FetchError::transport(section.as_str(), "refused")))
                .collect(),
        });
        assertions::assert_total_failure(&result);
    }

    #[test]
    fn test_assertion_degraded_ignores_order() {
        let mut snapshot = fixtures::healthy_snapshot();
        snapshot.degraded_sections = vec![Section::Alerts, Section::Health];
        assertions::assert_degraded(&snapshot, &[Section::Health, Section::Alerts]);
    }

    #[test]
    fn test_endpoint_scripting() {
        let source = MockSource::with_sections();
        source.alerts.serve_stale(fixtures::sample_alerts(), "timeout");
        let stale = lock(&source.alerts.response).clone().unwrap();
        assert!(stale.is_stale());
        assert_eq!(stale.value.len(), 3);

        source.alerts.respond(Err(FetchError::decode("dashboardAlerts", "bad")));
        assert!(lock(&source.alerts.response).is_err());
        assert_eq!(source.alerts.calls(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_generated_filter_returns_matching_subset(
            agents in generators::arb_agents(20),
            criteria in generators::arb_filter_criteria(),
        ) {
            let original = agents.clone();
            let result = apply(&agents, &criteria);

            prop_assert_eq!(&agents, &original);
            prop_assert!(result.len() <= agents.len());
            for agent in &result {
                prop_assert!(agents.contains(agent));
                prop_assert!(criteria.category.matches(&agent.category));
            }
        }

        #[test]
        fn prop_generated_unfiltered_result_is_permutation(
            agents in generators::arb_agents(20),
            sort_key in generators::arb_sort_key(),
        ) {
            let criteria = FilterCriteria { sort_key, ..FilterCriteria::default() };
            let result = apply(&agents, &criteria);
            prop_assert_eq!(result.len(), agents.len());
            for agent in &agents {
                prop_assert!(result.contains(agent));
            }
        }

        #[test]
        fn prop_generated_category_filter_is_exact(
            agents in generators::arb_agents(20),
            category in generators::arb_category(),
        ) {
            let criteria = FilterCriteria {
                category: CategoryFilter::named(category.clone()),
                ..FilterCriteria::default()
            };
            let result = apply(&agents, &criteria);
            prop_assert_eq!(
                result.len(),
                agents.iter().filter(|agent| agent.category == category).count()
            );
        }

        #[test]
        fn prop_generated_performance_sort_is_non_increasing(agents in generators::arb_agents(20)) {
            let criteria = FilterCriteria { sort_key: SortKey::Performance, ..FilterCriteria::default() };
            let rates: Vec<f64> = apply(&agents, &criteria)
                .iter()
                .map(|agent| agent.success_rate.unwrap_or(f64::NEG_INFINITY))
                .collect();
            prop_assert!(rates.windows(2).all(|pair| pair[0] >= pair[1]));
        }

        #[test]
        fn prop_generated_text_filter_is_case_insensitive(
            agents in generators::arb_agents(20),
            needle in "[a-z]{1,2}",
        ) {
            let lower = apply(&agents, &FilterCriteria { text: needle.clone(), ..FilterCriteria::default() });
            let upper = apply(&agents, &FilterCriteria { text: needle.to_uppercase(), ..FilterCriteria::default() });
            prop_assert_eq!(lower, upper);
        }

        #[test]
        fn prop_generated_grouping_preserves_every_agent(agents in generators::arb_agents(20)) {
            let groups = group_by_category(&agents);
            let total: usize = groups.values().map(Vec::len).sum();
            prop_assert_eq!(total, agents.len());
            for (category, members) in &groups {
                prop_assert!(members.iter().all(|agent| &agent.category == category));
            }
        }

        #[test]
        fn prop_generated_agent_status(status in generators::arb_agent_status()) {
            match status {
                AgentStatus::Online
                | AgentStatus::Busy
                | AgentStatus::Offline
                | AgentStatus::Error => {}
            }
        }
    }
}
