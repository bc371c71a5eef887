use crate::error::FetchError;
use crate::handles::SetOptions;
use crate::Tier;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub(crate) type BoxFetch<V> = Pin<Box<dyn Future<Output = Result<V, FetchError>> + Send>>;

/// One entry to populate with [`TieredCache::warm`](crate::TieredCache::warm).
///
/// The fetcher is a future, so nothing runs until the cache polls it.
pub struct WarmEntry<V> {
  pub(crate) key: String,
  pub(crate) fetcher: BoxFetch<V>,
  pub(crate) options: SetOptions,
}

impl<V> WarmEntry<V> {
  /// Creates an entry that stores the fetcher's output under `key` in the
  /// memory tier, without a TTL.
  pub fn new<F, E>(key: impl Into<String>, fetcher: F) -> Self
  where
    V: 'static,
    F: Future<Output = Result<V, E>> + Send + 'static,
    E: Into<FetchError> + 'static,
  {
    Self {
      key: key.into(),
      fetcher: Box::pin(async move { fetcher.await.map_err(Into::into) }),
      options: SetOptions::default(),
    }
  }

  pub fn tier(mut self, tier: Tier) -> Self {
    self.options.tier = tier;
    self
  }

  pub fn ttl(mut self, ttl: Duration) -> Self {
    self.options.ttl = Some(ttl);
    self
  }

  pub fn key(&self) -> &str {
    &self.key
  }
}

impl<V> fmt::Debug for WarmEntry<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WarmEntry")
      .field("key", &self.key)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

/// What a warm-up run achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmReport {
  /// Fetchers that succeeded and whose values were handed to `set`.
  pub loaded: usize,
  /// Fetchers that failed. Their entries were skipped.
  pub failed: usize,
}
