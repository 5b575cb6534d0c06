//! Dashboard snapshot and the section payloads it is assembled from.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::{Agent, AgentStatus};
use crate::health::{SearchIndexStatus, SystemHealth};
use crate::Timestamp;

/// Aggregate counters from `/api/dashboard/stats`.
///
/// `Default` doubles as the zero-valued placeholder used when the stats
/// endpoint is unavailable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardMetrics {
    pub total_agents: u64,
    pub active_agents: u64,
    pub total_executions: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: f64,
    pub requests_per_minute: f64,
}

/// Severity of an operator alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Info,
    Warning,
    Error,
}

/// Operator alert from `/api/dashboard/alerts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub timestamp: Timestamp,
}

impl Alert {
    /// Warnings and errors need operator attention; info alerts do not.
    pub fn is_active(&self) -> bool {
        matches!(self.alert_type, AlertType::Warning | AlertType::Error)
    }
}

/// One independently fetched part of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Health,
    Agents,
    Metrics,
    Alerts,
    SearchIndex,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Health,
        Section::Agents,
        Section::Metrics,
        Section::Alerts,
        Section::SearchIndex,
    ];

    /// Sections whose combined failure means no snapshot can be built.
    pub const CORE: [Section; 4] = [
        Section::Health,
        Section::Agents,
        Section::Metrics,
        Section::Alerts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Health => "health",
            Section::Agents => "agents",
            Section::Metrics => "metrics",
            Section::Alerts => "alerts",
            Section::SearchIndex => "searchIndex",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite view of the backend at one point in time.
///
/// Snapshots are immutable once built. `degraded_sections` names every
/// section that holds a placeholder instead of live data; `stale_sections`
/// names every section served from an earlier cached read because the live
/// request failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub health: SystemHealth,
    #[serde(default)]
    pub metrics: DashboardMetrics,
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub search_index_status: SearchIndexStatus,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default = "Utc::now")]
    pub captured_at: Timestamp,
    #[serde(default)]
    pub degraded_sections: Vec<Section>,
    #[serde(default)]
    pub stale_sections: Vec<Section>,
}

impl DashboardSnapshot {
    /// True when at least one section is a placeholder.
    pub fn is_degraded(&self) -> bool {
        !self.degraded_sections.is_empty()
    }

    /// True when at least one section was served from an outdated cache entry.
    pub fn is_stale(&self) -> bool {
        !self.stale_sections.is_empty()
    }

    /// True when `section` holds data from a successful live request.
    pub fn is_live(&self, section: Section) -> bool {
        !self.degraded_sections.contains(&section) && !self.stale_sections.contains(&section)
    }

    pub fn active_alerts_count(&self) -> usize {
        self.alerts.iter().filter(|alert| alert.is_active()).count()
    }

    pub fn agents_with_status(&self, status: AgentStatus) -> usize {
        self.agents.iter().filter(|agent| agent.status == status).count()
    }
}

/// One result of a semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// List payload that is either a bare array or an object wrapping one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "agents", alias = "alerts", alias = "results")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { items } => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthStatus;

    fn alert(id: &str, alert_type: AlertType) -> Alert {
        Alert {
            id: id.to_string(),
            alert_type,
            message: format!("alert {}", id),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_composite_payload_decodes_with_defaults() {
        let json = r#"{
            "health": {"status": "healthy"},
            "agents": [{"id": "a", "name": "A", "status": "online"}]
        }"#;
        let snapshot: DashboardSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.health.status, HealthStatus::Healthy);
        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.metrics, DashboardMetrics::default());
        assert!(snapshot.alerts.is_empty());
        assert!(!snapshot.is_degraded());
        assert!(!snapshot.is_stale());
    }

    #[test]
    fn test_alert_type_field_renamed() {
        let json = r#"{"id":"x","type":"warning","message":"disk","timestamp":"2024-05-01T10:00:00Z"}"#;
        let decoded: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.alert_type, AlertType::Warning);
        assert!(decoded.is_active());
    }

    #[test]
    fn test_active_alerts_excludes_info() {
        let snapshot = DashboardSnapshot {
            health: SystemHealth::new(HealthStatus::Healthy),
            metrics: DashboardMetrics::default(),
            agents: Vec::new(),
            search_index_status: SearchIndexStatus::default(),
            alerts: vec![
                alert("1", AlertType::Info),
                alert("2", AlertType::Warning),
                alert("3", AlertType::Error),
            ],
            captured_at: Utc::now(),
            degraded_sections: vec![Section::Agents],
            stale_sections: vec![Section::Alerts],
        };
        assert_eq!(snapshot.active_alerts_count(), 2);
        assert!(snapshot.is_degraded());
        assert!(snapshot.is_stale());
        assert!(!snapshot.is_live(Section::Agents));
        assert!(!snapshot.is_live(Section::Alerts));
        assert!(snapshot.is_live(Section::Health));
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let bare: Listing<u32> = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(bare.into_vec(), vec![1, 2, 3]);

        let wrapped: Listing<u32> = serde_json::from_str(r#"{"alerts": [4]}"#).unwrap();
        assert_eq!(wrapped.into_vec(), vec![4]);

        let results: Listing<u32> = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(results.into_vec().is_empty());
    }
}
