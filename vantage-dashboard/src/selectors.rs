//! Derived views over [`DashboardState`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use vantage_core::{filter, Agent, HealthStatus};

use crate::state::DashboardState;

/// Overall status shown in the dashboard header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Healthy => "healthy",
            SystemStatus::Degraded => "degraded",
            SystemStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agents of the current snapshot after the active filter.
pub fn filtered_agents(state: &DashboardState) -> Vec<Agent> {
    match &state.snapshot {
        Some(snapshot) => filter::apply(&snapshot.agents, &state.filter),
        None => Vec::new(),
    }
}

/// Every agent of the current snapshot grouped by category, ignoring the filter.
pub fn agents_by_category(state: &DashboardState) -> BTreeMap<String, Vec<Agent>> {
    match &state.snapshot {
        Some(snapshot) => filter::group_by_category(&snapshot.agents),
        None => BTreeMap::new(),
    }
}

/// Roll up backend health, placeholder sections and the last refresh error.
///
/// Without a snapshot the backend has never been reached, which reads as
/// unhealthy. A healthy backend is downgraded to degraded when any section
/// is a placeholder, any section was served stale, or the latest refresh
/// failed.
pub fn system_status(state: &DashboardState) -> SystemStatus {
    let Some(snapshot) = &state.snapshot else {
        return SystemStatus::Unhealthy;
    };
    match snapshot.health.status {
        HealthStatus::Unhealthy => SystemStatus::Unhealthy,
        HealthStatus::Degraded | HealthStatus::Unknown => SystemStatus::Degraded,
        HealthStatus::Healthy
            if snapshot.is_degraded() || snapshot.is_stale() || state.error.is_some() =>
        {
            SystemStatus::Degraded
        }
        HealthStatus::Healthy => SystemStatus::Healthy,
    }
}

/// Warning and error alerts in the current snapshot.
pub fn active_alerts_count(state: &DashboardState) -> usize {
    state
        .snapshot
        .as_ref()
        .map_or(0, |snapshot| snapshot.active_alerts_count())
}
