//! Snapshot assembly with per-section fallback.
//!
//! The composite endpoint is tried first. When it fails, the core sections
//! are fetched concurrently and each failure is absorbed into a placeholder,
//! so one broken endpoint never blanks the whole dashboard. A composite
//! served from an outdated cache entry counts as a failure; it is only used
//! when every section fails as well.

use chrono::Utc;
use std::sync::Arc;
use vantage_core::{
    AggregationError, DashboardMetrics, DashboardSnapshot, DashboardSource, FetchError,
    FetchResult, Fetched, SearchIndexStatus, Section, SystemHealth,
};

/// Builds [`DashboardSnapshot`]s from a [`DashboardSource`].
#[derive(Clone)]
pub struct Aggregator {
    source: Arc<dyn DashboardSource>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn DashboardSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn DashboardSource> {
        &self.source
    }

    /// Build a snapshot, preferring a live composite response.
    ///
    /// Fails only when every core section (health, agents, metrics, alerts)
    /// fails and no cached composite is available.
    pub async fn build_snapshot(&self) -> Result<DashboardSnapshot, AggregationError> {
        let cached_composite = match self.source.complete().await {
            Ok(Fetched {
                value: mut snapshot,
                stale: None,
            }) => {
                snapshot.captured_at = Utc::now();
                tracing::debug!(agents = snapshot.agents.len(), "composite snapshot loaded");
                return Ok(snapshot);
            }
            Ok(Fetched {
                value,
                stale: Some(err),
            }) => {
                tracing::info!(error = %err, "composite endpoint failed, assembling sections");
                Some(value)
            }
            Err(err) => {
                tracing::info!(error = %err, "composite endpoint unavailable, assembling sections");
                None
            }
        };

        match self.assemble().await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => match cached_composite {
                Some(snapshot) => {
                    tracing::warn!(error = %err, "every section failed, serving cached composite");
                    Ok(served_from_cache(snapshot))
                }
                None => Err(err),
            },
        }
    }

    async fn assemble(&self) -> Result<DashboardSnapshot, AggregationError> {
        let (health, agents, metrics, alerts, search_index_status) = tokio::join!(
            self.source.health(),
            self.source.agents(),
            self.source.stats(),
            self.source.alerts(),
            self.source.search_health(),
        );

        let mut outcomes = SectionOutcomes::default();
        let health = outcomes.take(Section::Health, health, || {
            SystemHealth::unavailable("health endpoint unavailable")
        });
        let agents = outcomes.take(Section::Agents, agents, Vec::new);
        let metrics = outcomes.take(Section::Metrics, metrics, DashboardMetrics::default);
        let alerts = outcomes.take(Section::Alerts, alerts, Vec::new);

        if outcomes.failures.len() == Section::CORE.len() {
            tracing::error!(sections = outcomes.failures.len(), "every dashboard section failed");
            return Err(AggregationError::TotalFailure {
                failures: outcomes.failures,
            });
        }

        let mut degraded_sections: Vec<Section> = outcomes
            .failures
            .iter()
            .map(|(section, _)| *section)
            .collect();
        let search_index_status = match search_index_status {
            Ok(read) => {
                if read.is_stale() {
                    outcomes.stale.push(Section::SearchIndex);
                }
                read.value
            }
            Err(err) => {
                tracing::debug!(error = %err, "search index status unavailable");
                degraded_sections.push(Section::SearchIndex);
                SearchIndexStatus::default()
            }
        };

        if !outcomes.failures.is_empty() {
            let sections: Vec<&str> = outcomes.failures.iter().map(|(s, _)| s.as_str()).collect();
            tracing::warn!(?sections, "dashboard snapshot built with placeholder sections");
        }
        if !outcomes.stale.is_empty() {
            let sections: Vec<&str> = outcomes.stale.iter().map(Section::as_str).collect();
            tracing::warn!(?sections, "dashboard snapshot built with stale sections");
        }

        Ok(DashboardSnapshot {
            health,
            metrics,
            agents,
            search_index_status,
            alerts,
            captured_at: Utc::now(),
            degraded_sections,
            stale_sections: outcomes.stale,
        })
    }
}

#[derive(Default)]
struct SectionOutcomes {
    failures: Vec<(Section, FetchError)>,
    stale: Vec<Section>,
}

impl SectionOutcomes {
    fn take<T>(
        &mut self,
        section: Section,
        result: FetchResult<Fetched<T>>,
        placeholder: impl FnOnce() -> T,
    ) -> T {
        match result {
            Ok(read) => {
                if let Some(err) = &read.stale {
                    tracing::debug!(section = section.as_str(), error = %err, "section served stale");
                    self.stale.push(section);
                }
                read.value
            }
            Err(err) => {
                tracing::debug!(section = section.as_str(), error = %err, "section failed");
                self.failures.push((section, err));
                placeholder()
            }
        }
    }
}

/// Mark every non-placeholder section of a cached composite as stale.
fn served_from_cache(mut snapshot: DashboardSnapshot) -> DashboardSnapshot {
    snapshot.stale_sections = Section::ALL
        .into_iter()
        .filter(|section| !snapshot.degraded_sections.contains(section))
        .collect();
    snapshot.captured_at = Utc::now();
    snapshot
}
