//! The dashboard facade.
//!
//! Ties the gateway, aggregator, scheduler and state store together behind
//! one cloneable handle. Each [`Dashboard`] is independent; there is no
//! process-wide instance.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use vantage_core::{
    Agent, DashboardSnapshot, DashboardSource, FetchResult, Fetched, FilterUpdate, SearchHit,
    SystemMetrics,
};

use crate::aggregate::Aggregator;
use crate::api_client::RemoteDataGateway;
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::scheduler::{RefreshGuard, RefreshScheduler, SchedulerState};
use crate::selectors::{self, SystemStatus};
use crate::state::{DashboardState, RefreshOutcome, StateStore, Subscription};

/// Shortest interval the timer will run at.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

struct DashboardInner {
    source: Arc<dyn DashboardSource>,
    aggregator: Aggregator,
    store: StateStore,
    scheduler: RefreshScheduler,
}

#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

impl Dashboard {
    pub fn new(source: Arc<dyn DashboardSource>, refresh_interval: Duration) -> Self {
        let state = DashboardState {
            refresh_interval: refresh_interval.max(MIN_REFRESH_INTERVAL),
            ..DashboardState::default()
        };
        Self {
            inner: Arc::new(DashboardInner {
                aggregator: Aggregator::new(Arc::clone(&source)),
                source,
                store: StateStore::new(state),
                scheduler: RefreshScheduler::new(RefreshGuard::new()),
            }),
        }
    }

    /// Build a dashboard backed by the HTTP gateway.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let gateway = RemoteDataGateway::new(config)?;
        Ok(Self::new(
            Arc::new(gateway),
            Duration::from_millis(config.refresh_interval_ms),
        ))
    }

    /// Build and apply a snapshot, serving cached sections where fresh.
    pub async fn fetch(&self) -> RefreshOutcome {
        self.run_build(false).await
    }

    /// Mark every cached section stale, then build and apply a snapshot.
    ///
    /// Stale entries are kept, so a section whose endpoint fails still
    /// falls back to its last good value.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.run_build(true).await
    }

    async fn run_build(&self, invalidate: bool) -> RefreshOutcome {
        let inner = Arc::clone(&self.inner);
        let outcome = self
            .inner
            .scheduler
            .run_exclusive(move || async move {
                if invalidate {
                    inner.source.invalidate();
                }
                inner.store.fetch(&inner.aggregator).await
            })
            .await;
        outcome.unwrap_or_else(|| {
            tracing::debug!(invalidate, "refresh skipped, build already running");
            RefreshOutcome::Skipped
        })
    }

    /// Turn periodic refresh on or off. Must be called within a Tokio runtime.
    pub fn set_auto_refresh(&self, enabled: bool) {
        self.inner.store.update(|state| state.auto_refresh = enabled);
        if enabled {
            self.start_timer(self.inner.store.with_state(|s| s.refresh_interval));
        } else {
            self.inner.scheduler.stop();
        }
    }

    /// Change the polling interval, restarting the timer if it is running.
    ///
    /// Intervals below [`MIN_REFRESH_INTERVAL`] are raised to it.
    pub fn set_refresh_interval(&self, interval: Duration) {
        let interval = if interval < MIN_REFRESH_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "refresh interval too short, using minimum"
            );
            MIN_REFRESH_INTERVAL
        } else {
            interval
        };
        self.inner.store.update(|state| state.refresh_interval = interval);
        if self.inner.store.with_state(|s| s.auto_refresh) {
            self.start_timer(interval);
        }
    }

    fn start_timer(&self, interval: Duration) {
        let weak: Weak<DashboardInner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.start(interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.store.fetch(&inner.aggregator).await;
                }
            }
        });
    }

    /// Merge a partial filter update into the active criteria.
    pub fn set_filter(&self, update: FilterUpdate) {
        self.inner.store.update(|state| state.filter.merge(update));
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DashboardState) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(listener)
    }

    pub fn watch(&self) -> tokio::sync::watch::Receiver<DashboardState> {
        self.inner.store.watch()
    }

    pub fn state(&self) -> DashboardState {
        self.inner.store.state()
    }

    pub fn snapshot(&self) -> Option<Arc<DashboardSnapshot>> {
        self.inner.store.snapshot()
    }

    pub fn filtered_agents(&self) -> Vec<Agent> {
        self.inner.store.with_state(selectors::filtered_agents)
    }

    pub fn agents_by_category(&self) -> BTreeMap<String, Vec<Agent>> {
        self.inner.store.with_state(selectors::agents_by_category)
    }

    pub fn system_status(&self) -> SystemStatus {
        self.inner.store.with_state(selectors::system_status)
    }

    pub fn active_alerts_count(&self) -> usize {
        self.inner.store.with_state(selectors::active_alerts_count)
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.scheduler.state()
    }

    /// Semantic search. Never cached; failures yield no hits.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.inner.source.search(query, limit).await
    }

    /// Host resource usage, read through the source's cache.
    ///
    /// Not part of the snapshot; the state store is left untouched.
    pub async fn system_metrics(&self) -> FetchResult<Fetched<SystemMetrics>> {
        self.inner.source.system_metrics().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_test_utils::{fixtures, MockSource};

    fn dashboard(source: &Arc<MockSource>) -> Dashboard {
        Dashboard::new(
            Arc::clone(source) as Arc<dyn DashboardSource>,
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_interval_clamped() {
        let source = Arc::new(MockSource::new());
        let dashboard = Dashboard::new(source, Duration::ZERO);
        assert_eq!(dashboard.state().refresh_interval, MIN_REFRESH_INTERVAL);
    }

    #[tokio::test]
    async fn test_refresh_now_invalidates_source() {
        let source = Arc::new(MockSource::new());
        source.complete.succeed(fixtures::healthy_snapshot());
        let dashboard = dashboard(&source);

        assert_eq!(dashboard.fetch().await, RefreshOutcome::Applied);
        assert_eq!(source.invalidations(), 0);
        assert_eq!(dashboard.refresh_now().await, RefreshOutcome::Applied);
        assert_eq!(source.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_set_filter_merges() {
        let source = Arc::new(MockSource::new());
        source.complete.succeed(fixtures::healthy_snapshot());
        let dashboard = dashboard(&source);
        dashboard.fetch().await;

        dashboard.set_filter(FilterUpdate::category("analysis"));
        dashboard.set_filter(FilterUpdate::text("plan"));
        let names: Vec<String> = dashboard.filtered_agents().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["Planner"]);
        assert_eq!(dashboard.agents_by_category().len(), 3);
    }

    #[tokio::test]
    async fn test_search_passthrough() {
        let source = Arc::new(MockSource::new());
        source.set_search_hits(vec![
            fixtures::search_hit("d-1", "GPU scheduling", 0.9),
            fixtures::search_hit("d-2", "Disk quotas", 0.4),
        ]);
        let dashboard = dashboard(&source);

        let hits = dashboard.search("gpu", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "d-1");
        assert_eq!(source.search_calls(), 1);
    }

    #[tokio::test]
    async fn test_system_metrics_passthrough() {
        let source = Arc::new(MockSource::new());
        let dashboard = dashboard(&source);
        assert!(dashboard.system_metrics().await.is_err());

        source.system_metrics.serve_stale(
            SystemMetrics {
                cpu_percent: 41.5,
                ..SystemMetrics::default()
            },
            "timeout",
        );
        let metrics = dashboard.system_metrics().await.unwrap();
        assert!(metrics.is_stale());
        assert_eq!(metrics.value.cpu_percent, 41.5);
        assert_eq!(source.system_metrics.calls(), 2);
        assert!(dashboard.state().snapshot.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_toggle() {
        let source = Arc::new(MockSource::new());
        source.complete.succeed(fixtures::healthy_snapshot());
        let dashboard = dashboard(&source);

        dashboard.set_auto_refresh(true);
        assert_eq!(
            dashboard.scheduler_state(),
            SchedulerState::Running {
                interval: Duration::from_secs(30)
            }
        );
        tokio::time::sleep(Duration::from_millis(30_001)).await;
        assert_eq!(source.builds(), 1);

        dashboard.set_refresh_interval(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(5_001)).await;
        assert_eq!(source.builds(), 2);

        dashboard.set_auto_refresh(false);
        assert_eq!(dashboard.scheduler_state(), SchedulerState::Stopped);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.builds(), 2);
        assert!(!dashboard.state().auto_refresh);
    }
}
