use crate::adapter::{DurableTier, MemoryTier, NAMESPACE_SEPARATOR};
use crate::backend::{FileBackend, MemoryBackend, StorageBackend};
use crate::config::CacheConfig;
use crate::error::BuildError;
use crate::handles::TieredCache;
use crate::metrics::Metrics;
use crate::shared::CacheShared;
use crate::task::janitor::DEFAULT_SWEEP_INTERVAL;
use crate::time::{Clock, SystemClock};
use crate::{ErrorListener, Tier};

use core::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A builder for creating [`TieredCache`] instances.
pub struct CacheBuilder<V> {
  pub(crate) shards: usize,
  pub(crate) namespace: Option<String>,
  pub(crate) sweep_interval: Duration,
  pub(crate) background_sweep: bool,
  clock: Option<Arc<dyn Clock>>,
  local_backend: Option<Arc<dyn StorageBackend>>,
  local_storage_path: Option<PathBuf>,
  local_quota_bytes: Option<usize>,
  session_backend: Option<Arc<dyn StorageBackend>>,
  session_quota_bytes: Option<usize>,
  error_listener: Option<Arc<dyn ErrorListener>>,
  _value_marker: PhantomData<fn() -> V>,
}

// Manual Debug implementation for CacheBuilder.
impl<V> fmt::Debug for CacheBuilder<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("shards", &self.shards)
      .field("namespace", &self.namespace)
      .field("sweep_interval", &self.sweep_interval)
      .field("background_sweep", &self.background_sweep)
      .field("local_storage_path", &self.local_storage_path)
      .field("has_local_backend", &self.local_backend.is_some())
      .field("has_session_backend", &self.session_backend.is_some())
      .field("has_error_listener", &self.error_listener.is_some())
      .finish_non_exhaustive()
  }
}

impl<V> Default for CacheBuilder<V> {
  fn default() -> Self {
    Self::new()
  }
}

// --- General Configuration Methods ---
// This impl block has no bounds on V.
impl<V> CacheBuilder<V> {
  /// Creates a new `CacheBuilder` with default settings: memory-backed
  /// durable tiers, no namespace, the system clock and a background sweep
  /// every five minutes.
  pub fn new() -> Self {
    Self {
      shards: (num_cpus::get() * 4).max(1).next_power_of_two(),
      namespace: None,
      sweep_interval: DEFAULT_SWEEP_INTERVAL,
      background_sweep: true,
      clock: None,
      local_backend: None,
      local_storage_path: None,
      local_quota_bytes: None,
      session_backend: None,
      session_quota_bytes: None,
      error_listener: None,
      _value_marker: PhantomData,
    }
  }

  /// Applies every setting present in `config` on top of the defaults.
  pub fn from_config(config: &CacheConfig) -> Self {
    let mut builder = Self::new();
    if let Some(namespace) = &config.namespace {
      builder = builder.namespace(namespace.clone());
    }
    if let Some(shards) = config.shards {
      builder = builder.shards(shards);
    }
    builder.sweep_interval = config.sweep_interval;
    builder.background_sweep = config.background_sweep;
    if let Some(local) = &config.local_storage {
      builder.local_storage_path = Some(local.path.clone());
      builder.local_quota_bytes = local.quota_bytes;
    }
    builder.session_quota_bytes = config.session_quota_bytes;
    builder
  }

  /// Sets the number of memory tier shards, rounded up to a power of two.
  pub fn shards(mut self, shards: usize) -> Self {
    self.shards = if shards == 0 { 0 } else { shards.next_power_of_two() };
    self
  }

  /// Prefixes every durable key with `"{namespace}:"` so several caches can
  /// share the same durable storage without clobbering each other.
  ///
  /// `build` rejects an empty namespace or one containing `:`.
  pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = Some(namespace.into());
    self
  }

  /// Sets the clock used to timestamp and expire entries.
  pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
    self.clock = Some(Arc::new(clock));
    self
  }

  /// Like [`clock`](Self::clock), for a clock the caller keeps a handle to.
  pub fn shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = Some(clock);
    self
  }

  /// Sets the pause between background sweeps. Defaults to 5 minutes.
  pub fn sweep_interval(mut self, interval: Duration) -> Self {
    self.sweep_interval = interval;
    self
  }

  /// Enables or disables the background sweep started by `build`.
  /// Expired entries are still removed on access and by `clear_expired`.
  pub fn background_sweep(mut self, enabled: bool) -> Self {
    self.background_sweep = enabled;
    self
  }

  /// Backs the durable-local tier with `backend`.
  pub fn local_backend<B: StorageBackend + 'static>(mut self, backend: B) -> Self {
    self.local_backend = Some(Arc::new(backend));
    self
  }

  /// Backs the durable-local tier with a JSON document at `path`. Ignored if
  /// a `local_backend` was also given.
  ///
  /// Caches built on the same path share one open document, so they can use
  /// different namespaces without overwriting each other.
  pub fn local_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.local_storage_path = Some(path.into());
    self
  }

  /// Limits the durable-local storage opened from `local_storage_path`.
  pub fn local_quota(mut self, bytes: usize) -> Self {
    self.local_quota_bytes = Some(bytes);
    self
  }

  /// Backs the durable-session tier with `backend`.
  pub fn session_backend<B: StorageBackend + 'static>(mut self, backend: B) -> Self {
    self.session_backend = Some(Arc::new(backend));
    self
  }

  /// Limits the default in-memory session storage.
  pub fn session_quota(mut self, bytes: usize) -> Self {
    self.session_quota_bytes = Some(bytes);
    self
  }

  /// Registers a hook that receives every failure the cache absorbs.
  pub fn error_listener<Listener>(mut self, listener: Listener) -> Self
  where
    Listener: ErrorListener + 'static,
  {
    self.error_listener = Some(Arc::new(listener));
    self
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.shards == 0 {
      return Err(BuildError::ZeroShards);
    }
    if self.background_sweep && self.sweep_interval.is_zero() {
      return Err(BuildError::ZeroSweepInterval);
    }
    if let Some(namespace) = &self.namespace {
      if namespace.is_empty() || namespace.contains(NAMESPACE_SEPARATOR) {
        return Err(BuildError::InvalidNamespace(namespace.clone()));
      }
    }
    Ok(())
  }
}

// --- Build Methods ---
impl<V> CacheBuilder<V>
where
  V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
  /// Builds the cache and, unless disabled, starts its background sweep.
  pub fn build(mut self) -> Result<TieredCache<V>, BuildError> {
    self.validate()?;

    let local_backend = self.open_local_backend()?;
    let session_backend = self
      .session_backend
      .take()
      .unwrap_or_else(|| Arc::new(quota_memory(self.session_quota_bytes)));

    let namespace = self.namespace.take();
    let shared = Arc::new(CacheShared {
      memory: MemoryTier::new(self.shards),
      local: DurableTier::new(Tier::DurableLocal, local_backend, namespace.as_deref()),
      session: DurableTier::new(Tier::DurableSession, session_backend, namespace.as_deref()),
      metrics: Metrics::new(),
      clock: self.clock.take().unwrap_or_else(|| Arc::new(SystemClock)),
      error_listener: self.error_listener.take(),
      namespace,
      sweep_interval: self.sweep_interval,
      janitor: Mutex::new(None),
    });

    let cache = TieredCache { shared };
    if self.background_sweep {
      cache.start_background_sweep();
    }
    Ok(cache)
  }

  /// An explicit backend wins over a storage path; memory is the fallback.
  fn open_local_backend(&mut self) -> Result<Arc<dyn StorageBackend>, BuildError> {
    if let Some(backend) = self.local_backend.take() {
      return Ok(backend);
    }

    let Some(path) = &self.local_storage_path else {
      return Ok(Arc::new(quota_memory(self.local_quota_bytes)));
    };

    let backend: Arc<dyn StorageBackend> = FileBackend::open_shared(path, self.local_quota_bytes)?;
    Ok(backend)
  }
}

fn quota_memory(quota: Option<usize>) -> MemoryBackend {
  match quota {
    Some(bytes) => MemoryBackend::new().with_quota(bytes),
    None => MemoryBackend::new(),
  }
}
