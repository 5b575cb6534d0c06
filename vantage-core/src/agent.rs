//! Agent records as reported by `/api/agents/list`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Agent is idle and accepting work
    Online,
    /// Agent is executing a task
    Busy,
    /// Agent is not reachable
    Offline,
    /// Agent reported a failure
    Error,
}

impl AgentStatus {
    /// Wire name, also used as the lexicographic sort key.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Online => "online",
            AgentStatus::Busy => "busy",
            AgentStatus::Offline => "offline",
            AgentStatus::Error => "error",
        }
    }

    /// Online and busy agents count as active.
    pub fn is_active(&self) -> bool {
        matches!(self, AgentStatus::Online | AgentStatus::Busy)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent known to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: AgentStatus,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_executions: Option<u64>,
}

impl Agent {
    /// Create an agent with the required fields; optional stats are unset.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        status: AgentStatus,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            status,
            category: category.into(),
            capabilities: Vec::new(),
            success_rate: None,
            total_executions: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = Some(rate);
        self
    }

    pub fn with_total_executions(mut self, total: u64) -> Self {
        self.total_executions = Some(total);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_deserializes_camel_case() {
        let json = r#"{
            "id": "a-1",
            "name": "Scanner",
            "description": "Scans things",
            "status": "busy",
            "category": "security",
            "capabilities": ["scan", "report"],
            "successRate": 97.5,
            "totalExecutions": 1200
        }"#;
        let agent: Agent = serde_json::from_str(json).unwrap();
        assert_eq!(agent.status, AgentStatus::Busy);
        assert_eq!(agent.success_rate, Some(97.5));
        assert_eq!(agent.total_executions, Some(1200));
        assert_eq!(agent.capabilities, vec!["scan", "report"]);
    }

    #[test]
    fn test_agent_optional_fields_default() {
        let json = r#"{"id": "a-2", "name": "Bare", "status": "offline"}"#;
        let agent: Agent = serde_json::from_str(json).unwrap();
        assert!(agent.description.is_empty());
        assert!(agent.category.is_empty());
        assert!(agent.capabilities.is_empty());
        assert!(agent.success_rate.is_none());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let json = r#"{"id": "a-3", "name": "Odd", "status": "sleeping"}"#;
        assert!(serde_json::from_str::<Agent>(json).is_err());
    }

    #[test]
    fn test_status_activity() {
        assert!(AgentStatus::Online.is_active());
        assert!(AgentStatus::Busy.is_active());
        assert!(!AgentStatus::Offline.is_active());
        assert!(!AgentStatus::Error.is_active());
        assert_eq!(AgentStatus::Error.to_string(), "error");
    }
}
