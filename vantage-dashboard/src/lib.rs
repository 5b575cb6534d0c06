//! Vantage dashboard client library exports.
//!
//! A cached HTTP gateway feeds an aggregator that tolerates partial backend
//! outages. Snapshots land in an observable state store, refreshed on demand
//! or by a single-flight timer.

pub mod aggregate;
pub mod api_client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod scheduler;
pub mod selectors;
pub mod state;
pub mod telemetry;

pub use dashboard::Dashboard;
pub use error::DashboardError;
pub use selectors::SystemStatus;
pub use state::{DashboardState, RefreshOutcome, Subscription};
