use crate::backend::StorageError;
use crate::Tier;

use thiserror::Error;

/// Boxed error produced by a warm-up fetcher.
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure absorbed by the cache.
///
/// These never escape the [`TieredCache`](crate::TieredCache) operations.
/// They are logged and handed to the registered
/// [`ErrorListener`](crate::ErrorListener), if any.
#[derive(Debug, Error)]
pub enum CacheError {
  /// The tier's backing storage failed (quota exceeded, disabled, I/O).
  #[error("{tier} storage failed for key '{key}': {source}")]
  Storage {
    tier: Tier,
    key: String,
    #[source]
    source: StorageError,
  },

  /// A value could not be encoded, or a stored blob could not be decoded.
  #[error("{tier} entry '{key}' could not be (de)serialized: {source}")]
  Serialization {
    tier: Tier,
    key: String,
    #[source]
    source: serde_json::Error,
  },

  /// A warm-up fetcher failed; only that entry is skipped.
  #[error("warm-up fetcher for key '{key}' failed: {source}")]
  Fetcher {
    key: String,
    #[source]
    source: FetchError,
  },
}

impl CacheError {
  /// The key the failure relates to.
  pub fn key(&self) -> &str {
    match self {
      CacheError::Storage { key, .. }
      | CacheError::Serialization { key, .. }
      | CacheError::Fetcher { key, .. } => key,
    }
  }

  /// The tier the failure happened in. Fetcher failures happen before any
  /// tier is touched.
  pub fn tier(&self) -> Option<Tier> {
    match self {
      CacheError::Storage { tier, .. } | CacheError::Serialization { tier, .. } => Some(*tier),
      CacheError::Fetcher { .. } => None,
    }
  }
}

/// Errors that can occur when building a cache.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The memory tier was configured with zero shards.
  #[error("shard count cannot be zero")]
  ZeroShards,

  /// Background sweeping was enabled with a zero interval.
  #[error("sweep interval cannot be zero")]
  ZeroSweepInterval,

  /// The namespace is empty or contains the `:` key separator, which would
  /// let one namespace see into another.
  #[error("invalid namespace '{0}': must be non-empty and must not contain ':'")]
  InvalidNamespace(String),

  /// The configured durable storage could not be opened.
  #[error("failed to open durable storage: {0}")]
  Storage(#[from] StorageError),

  /// The configuration could not be read or parsed.
  #[error("invalid cache configuration: {0}")]
  Config(String),
}

/// A specialized `Result` type for building caches.
pub type Result<T, E = BuildError> = std::result::Result<T, E>;
