//! A tiered key-value cache with per-entry TTL expiry and hit/miss telemetry.
//!
//! # Features
//! - **Three independent tiers**: an in-process memory tier, a durable-local
//!   tier that survives restarts and a durable-session tier, selected per call.
//! - **TTL expiry**: expired entries are never returned. They are removed on
//!   access and by a periodic background sweep.
//! - **Never fails the caller**: storage and serialization failures are
//!   logged with `tracing` and reported to an optional [`ErrorListener`];
//!   the operation simply has no effect or counts as a miss.
//! - **Cache warming**: populate many keys from async fetchers at once,
//!   tolerating individual failures.
//! - **Observability**: hits, misses, sets, deletes, hit rate and live entry
//!   counts per tier.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tiered_cache::{CacheBuilder, SetOptions, Tier};
//!
//! let cache = CacheBuilder::<String>::new()
//!   .namespace("navigation")
//!   .local_storage_path("cache/local.json")
//!   .build()
//!   .unwrap();
//!
//! cache.set(
//!   "last-page",
//!   "/courses/42".to_string(),
//!   SetOptions::new().tier(Tier::DurableLocal).ttl(Duration::from_secs(3600)),
//! );
//! assert!(cache.get("last-page", Tier::DurableLocal).is_some());
//! ```

// Public modules that form the API
pub mod backend;
pub mod builder;
pub mod config;
pub mod error;
pub mod expiry;
pub mod handles;
pub mod listener;
pub mod metrics;
pub mod tier;
pub mod time;
pub mod warm;

// Internal, crate-only modules
mod adapter;
mod entry;
mod shared;
mod store;
mod task;

// Re-export the primary user-facing types for convenience
pub use backend::{FileBackend, MemoryBackend, StorageBackend, StorageError};
pub use builder::CacheBuilder;
pub use config::CacheConfig;
pub use error::{BuildError, CacheError, FetchError};
pub use expiry::SweepOutcome;
pub use handles::{SetOptions, TieredCache};
pub use listener::ErrorListener;
pub use metrics::{MetricsSnapshot, SizeByTier};
pub use task::janitor::DEFAULT_SWEEP_INTERVAL;
pub use tier::Tier;
pub use time::{Clock, ManualClock, SystemClock};
pub use warm::{WarmEntry, WarmReport};
