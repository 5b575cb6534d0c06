//! Vantage Core - Dashboard Data Types
//!
//! Pure data structures shared by the cache, the gateway and the dashboard
//! state store. The only behavior here is the agent filter engine, which is
//! a pure function over these types.

use chrono::{DateTime, Utc};

pub mod agent;
pub mod error;
pub mod filter;
pub mod health;
pub mod snapshot;
pub mod source;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

pub use agent::{Agent, AgentStatus};
pub use error::{AggregationError, FetchError, FetchResult};
pub use filter::{CategoryFilter, FilterCriteria, FilterUpdate, SortKey};
pub use health::{HealthStatus, SearchIndexStatus, SystemHealth, SystemMetrics};
pub use snapshot::{
    Alert, AlertType, DashboardMetrics, DashboardSnapshot, Listing, SearchHit, Section,
};
pub use source::{DashboardSource, Fetched};
