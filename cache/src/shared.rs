use crate::adapter::{DurableTier, MemoryTier, TierAdapter};
use crate::error::CacheError;
use crate::expiry::{self, SweepOutcome};
use crate::metrics::{Metrics, SizeByTier};
use crate::task::janitor::Janitor;
use crate::time::Clock;
use crate::{ErrorListener, Tier};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// The internal, thread-safe core of the cache.
///
/// Owns the statistics and the three tiers; each tier owns its own entry store.
pub(crate) struct CacheShared<V> {
  pub(crate) memory: MemoryTier<V>,
  pub(crate) local: DurableTier<V>,
  pub(crate) session: DurableTier<V>,
  pub(crate) metrics: Metrics,
  pub(crate) clock: Arc<dyn Clock>,
  pub(crate) error_listener: Option<Arc<dyn ErrorListener>>,
  pub(crate) namespace: Option<String>,
  pub(crate) sweep_interval: Duration,
  pub(crate) janitor: Mutex<Option<Janitor>>,
}

impl<V> fmt::Debug for CacheShared<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("namespace", &self.namespace)
      .field("sweep_interval", &self.sweep_interval)
      .field("has_error_listener", &self.error_listener.is_some())
      .field("background_sweep", &self.janitor.lock().is_some())
      .finish_non_exhaustive()
  }
}

impl<V> Drop for CacheShared<V> {
  fn drop(&mut self) {
    if let Some(janitor) = self.janitor.get_mut().take() {
      janitor.stop();
    }
  }
}

impl<V> CacheShared<V>
where
  V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
  #[inline]
  pub(crate) fn now(&self) -> u64 {
    self.clock.now_millis()
  }

  #[inline]
  pub(crate) fn adapter(&self, tier: Tier) -> &dyn TierAdapter<V> {
    match tier {
      Tier::Memory => &self.memory,
      Tier::DurableLocal => &self.local,
      Tier::DurableSession => &self.session,
    }
  }

  /// Logs an absorbed failure and forwards it to the listener.
  pub(crate) fn report(&self, error: CacheError) {
    warn!(
      namespace = self.namespace.as_deref().unwrap_or("-"),
      tier = error.tier().map_or("-", |t| t.as_str()),
      key = error.key(),
      error = %error,
      "cache operation failed; continuing without it"
    );
    if let Some(listener) = &self.error_listener {
      listener.on_error(&error);
    }
  }

  /// Sweeps expired entries out of every tier.
  pub(crate) fn sweep_all(&self) -> SweepOutcome {
    let now = self.now();
    let mut total = SweepOutcome::default();
    for tier in Tier::ALL {
      let outcome = expiry::sweep_expired(self.adapter(tier), now, |e| self.report(e));
      total.merge(outcome);
    }
    debug!(
      namespace = self.namespace.as_deref().unwrap_or("-"),
      scanned = total.scanned,
      evicted = total.evicted,
      failed = total.failed,
      "expiry sweep finished"
    );
    total
  }

  pub(crate) fn size_by_tier(&self) -> SizeByTier {
    let now = self.now();
    let live = |tier: Tier| match self.adapter(tier).live_len(now) {
      Ok(len) => len,
      Err(e) => {
        self.report(e);
        0
      }
    };

    SizeByTier {
      memory: live(Tier::Memory),
      durable_local: live(Tier::DurableLocal),
      durable_session: live(Tier::DurableSession),
    }
  }
}
