//! In-memory cache layer for backend reads.
//!
//! Entries carry a per-key TTL. Staleness only decides whether a network
//! call is attempted: stale entries are never evicted for being old, and
//! they answer for the key whenever a refresh fails.
//!
//! # Example
//!
//! ```ignore
//! let cache: CacheStore<serde_json::Value> = CacheStore::new();
//! let read = cache
//!     .get_or_fetch("health", Duration::from_secs(10), || fetch_health())
//!     .await?;
//!
//! if read.is_stale() {
//!     tracing::warn!(age = ?read.age(), "showing stale health");
//! }
//! ```

pub mod freshness;
pub mod stats;
pub mod store;

pub use freshness::{CacheEntry, CacheRead, ReadSource};
pub use stats::CacheStats;
pub use store::CacheStore;
