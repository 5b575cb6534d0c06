//! Error types for Vantage data synchronization

use std::time::Duration;
use thiserror::Error;

use crate::snapshot::Section;

/// Failure of a single endpoint call.
///
/// Clone-able so that one in-flight outcome can be handed to every caller
/// waiting on the same cache key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {resource} failed: {reason}")]
    Transport { resource: String, reason: String },

    #[error("Request to {resource} returned HTTP {status}: {body}")]
    Status {
        resource: String,
        status: u16,
        body: String,
    },

    #[error("Invalid payload from {resource}: {reason}")]
    Decode { resource: String, reason: String },

    #[error("Request to {resource} timed out after {timeout:?}")]
    Timeout { resource: String, timeout: Duration },

    #[error("Fetch task for {resource} was interrupted: {reason}")]
    Interrupted { resource: String, reason: String },
}

impl FetchError {
    pub fn transport(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// The logical resource (or cache key) the failing call targeted.
    pub fn resource(&self) -> &str {
        match self {
            Self::Transport { resource, .. }
            | Self::Status { resource, .. }
            | Self::Decode { resource, .. }
            | Self::Timeout { resource, .. }
            | Self::Interrupted { resource, .. } => resource,
        }
    }
}

/// Result type for endpoint calls.
pub type FetchResult<T> = Result<T, FetchError>;

/// Snapshot aggregation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// Every independent section call failed; no snapshot can be built.
    #[error("All dashboard sections failed ({})", describe(.failures))]
    TotalFailure { failures: Vec<(Section, FetchError)> },
}

fn describe(failures: &[(Section, FetchError)]) -> String {
    failures
        .iter()
        .map(|(section, err)| format!("{}: {}", section, err))
        .collect::<Vec<_>>()
        .join("; ")
}
