//! An adaptive, in-memory cache for memoizing expensive or rate-limited
//! lookups.
//!
//! # Features
//! - **Bounded**: a hard cap on the number of entries plus an optional cap on
//!   their summed cost; eviction restores both after every write.
//! - **Policies**: LRU, LFU (frequency first, recency as tiebreaker) and FIFO.
//! - **Expiry**: per-entry or default TTL with lazy deletion on access and an
//!   explicit `purge_expired` sweep.
//! - **Tags**: coarse-grained group invalidation.
//! - **Warm-up**: pre-population from a plan of sync or async loaders with
//!   bounded parallelism, typically built from a persisted snapshot.
//! - **Observability**: hit/miss/warm-up/eviction/load counters.
//! - **Persistence**: `snapshot()` copies live entries; with the `serde`
//!   feature the snapshot entries are serializable.

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod handles;
pub mod listener;
pub mod metrics;
pub mod policy;
pub mod snapshot;
pub mod time;
pub mod warmup;

// Internal, crate-only modules
mod entry;
mod loader;
mod store;

// Re-export the primary user-facing types for convenience
pub use builder::CacheBuilder;
pub use error::{BoxError, BuildError};
pub use handles::{AdaptiveCache, SetOptions};
pub use listener::{EvictionListener, EvictionReason};
pub use metrics::CacheStats;
pub use policy::EvictionPolicy;
pub use snapshot::SnapshotEntry;
pub use time::{Clock, ManualClock, MonotonicClock};
pub use warmup::{WarmupEntry, WarmupErrorHandler, WarmupPlan};
