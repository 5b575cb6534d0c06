//! Vantage Storage - process-local caching for dashboard data.
//!
//! Nothing here outlives the process; the cache exists to keep repeated
//! dashboard refreshes off the network and to ride out backend failures.

pub mod cache;

pub use cache::{CacheEntry, CacheRead, CacheStats, CacheStore, ReadSource};
