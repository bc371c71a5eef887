#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tiered_cache::{CacheBuilder, CacheError, ManualClock, MemoryBackend, TieredCache};

/// Start of the manual clock in tests, far from zero so ages never saturate.
pub const T0: u64 = 1_700_000_000_000;

/// Everything a test needs to drive a cache deterministically.
pub struct Harness<V> {
  pub cache: TieredCache<V>,
  pub clock: Arc<ManualClock>,
  pub local: MemoryBackend,
  pub session: MemoryBackend,
  pub errors: Arc<Mutex<Vec<String>>>,
}

impl<V> Harness<V> {
  pub fn errors(&self) -> Vec<String> {
    self.errors.lock().unwrap().clone()
  }
}

/// A cache on a manual clock, with inspectable memory-backed durable tiers
/// and no background sweep.
pub fn harness<V>() -> Harness<V>
where
  V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
  harness_with(CacheBuilder::new(), MemoryBackend::new(), MemoryBackend::new())
}

pub fn harness_with<V>(
  builder: CacheBuilder<V>,
  local: MemoryBackend,
  session: MemoryBackend,
) -> Harness<V>
where
  V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
  let clock = Arc::new(ManualClock::new(T0));
  let errors = Arc::new(Mutex::new(Vec::new()));
  let sink = errors.clone();

  let cache = builder
    .shards(4)
    .background_sweep(false)
    .shared_clock(clock.clone())
    .local_backend(local.clone())
    .session_backend(session.clone())
    .error_listener(move |e: &CacheError| sink.lock().unwrap().push(e.to_string()))
    .build()
    .unwrap();

  Harness {
    cache,
    clock,
    local,
    session,
    errors,
  }
}

/// Installs a test subscriber so `RUST_LOG=tiered_cache=debug` shows the
/// cache's own logging. Safe to call more than once.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}
