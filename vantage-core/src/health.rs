//! Health and system-level status types
//!
//! These mirror the payloads of `/api/health`, `/api/system/metrics` and
//! `/api/leann/health`. Every optional field defaults so that a backend
//! reporting a subset of fields still decodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Timestamp;

/// Health status for the backend or one of its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is fully operational
    #[serde(alias = "ok")]
    Healthy,
    /// Component is operational but degraded
    Degraded,
    /// Component is not operational
    Unhealthy,
    /// Health status is unknown (e.g., not yet checked)
    #[default]
    #[serde(other)]
    Unknown,
}

/// Backend health as reported by `/api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    /// Overall health status
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    /// Detailed status message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Per-service status, keyed by service name
    #[serde(default)]
    pub services: BTreeMap<String, HealthStatus>,
}

impl SystemHealth {
    /// Create a health report with the given status and nothing else.
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            version: None,
            uptime_seconds: None,
            message: None,
            services: BTreeMap::new(),
        }
    }

    /// Placeholder used when the health endpoint could not be reached.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            message: Some(reason.into()),
            ..Self::new(HealthStatus::Degraded)
        }
    }

    pub fn with_service(mut self, name: impl Into<String>, status: HealthStatus) -> Self {
        self.services.insert(name.into(), status);
        self
    }
}

/// Host-level resource usage from `/api/system/metrics`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub uptime_seconds: u64,
}

/// Status of the semantic search index from `/api/leann/health`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndexStatus {
    #[serde(default)]
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_documents: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_indexed_at: Option<Timestamp>,
}
