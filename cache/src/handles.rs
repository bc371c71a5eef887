use futures_util::future;

use crate::error::CacheError;
use crate::shared::CacheShared;
use crate::task::janitor::Janitor;
use crate::warm::{WarmEntry, WarmReport};
use crate::{MetricsSnapshot, Tier};

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Where and for how long [`TieredCache::set`] stores a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
  /// Defaults to [`Tier::Memory`].
  pub tier: Tier,
  /// `None` (or a zero duration) never expires.
  pub ttl: Option<Duration>,
}

impl SetOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn tier(mut self, tier: Tier) -> Self {
    self.tier = tier;
    self
  }

  pub fn ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  /// Rounds up, so a sub-millisecond TTL still expires.
  #[inline]
  fn ttl_millis(&self) -> u64 {
    self.ttl.map_or(0, |d| {
      u64::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
    })
  }
}

impl From<Tier> for SetOptions {
  fn from(tier: Tier) -> Self {
    Self { tier, ttl: None }
  }
}

/// A tiered key-value cache with TTL expiry and hit/miss statistics.
///
/// Handles are cheap to clone and share the same underlying cache. Construct
/// one per feature (optionally with its own namespace) with
/// [`CacheBuilder`](crate::CacheBuilder) and inject it where it is needed.
///
/// No operation on this type returns an error or panics because of a storage
/// or serialization failure. Such failures make the operation a no-op (or a
/// miss), are logged with `tracing`, and are handed to the registered
/// [`ErrorListener`](crate::ErrorListener).
#[derive(Debug)]
pub struct TieredCache<V> {
  pub(crate) shared: Arc<CacheShared<V>>,
}

impl<V> Clone for TieredCache<V> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<V> TieredCache<V>
where
  V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
  /// Stores `value` under `key` in the tier and with the TTL given by `options`.
  ///
  /// Overwrites any existing entry for `key` in that tier. The write counts
  /// towards `sets` even if a durable tier failed to store it.
  pub fn set(&self, key: &str, value: V, options: impl Into<SetOptions>) {
    let options = options.into();
    let now = self.shared.now();
    if let Err(e) = self
      .shared
      .adapter(options.tier)
      .set(key, value, options.ttl_millis(), now)
    {
      self.shared.report(e);
    }
    self.shared.metrics.record_set();
  }

  /// Stores `value` in the memory tier without a TTL.
  pub fn insert(&self, key: &str, value: V) {
    self.set(key, value, SetOptions::default());
  }

  /// Stores `value` in `tier`, expiring after `ttl` if one is given.
  pub fn set_in(&self, key: &str, value: V, tier: Tier, ttl: Option<Duration>) {
    self.set(key, value, SetOptions { tier, ttl });
  }

  /// Returns the live value for `key` in `tier`.
  ///
  /// Absent, expired and undecodable entries are all misses. Expired and
  /// undecodable entries are removed on the way.
  pub fn get(&self, key: &str, tier: Tier) -> Option<Arc<V>> {
    match self.lookup(key, tier) {
      Some(value) => {
        self.shared.metrics.record_hit();
        Some(value)
      }
      None => {
        self.shared.metrics.record_miss();
        None
      }
    }
  }

  /// Like [`get`](Self::get), but does not touch the statistics.
  pub fn peek(&self, key: &str, tier: Tier) -> Option<Arc<V>> {
    self.lookup(key, tier)
  }

  /// Whether a live entry exists for `key` in `tier`. Does not touch the
  /// statistics.
  pub fn contains_key(&self, key: &str, tier: Tier) -> bool {
    self.lookup(key, tier).is_some()
  }

  fn lookup(&self, key: &str, tier: Tier) -> Option<Arc<V>> {
    let now = self.shared.now();
    match self.shared.adapter(tier).get(key, now) {
      Ok(value) => value,
      Err(e) => {
        self.shared.report(e);
        None
      }
    }
  }

  /// Removes `key` from `tier`, returning whether an entry was removed.
  pub fn delete(&self, key: &str, tier: Tier) -> bool {
    match self.shared.adapter(tier).delete(key) {
      Ok(true) => {
        self.shared.metrics.record_delete();
        true
      }
      Ok(false) => false,
      Err(e) => {
        self.shared.report(e);
        false
      }
    }
  }

  /// Keys of the live entries in `tier`. Nothing is evicted.
  pub fn keys(&self, tier: Tier) -> Vec<String> {
    let now = self.shared.now();
    self.shared.adapter(tier).live_keys(now).unwrap_or_else(|e| {
      self.shared.report(e);
      Vec::new()
    })
  }

  /// Empties every tier and resets the statistics.
  pub fn clear_all(&self) {
    let mut removed = 0;
    for tier in Tier::ALL {
      removed += self.shared.adapter(tier).clear(&mut |e| self.shared.report(e));
    }
    self.shared.metrics.reset();
    debug!(
      namespace = self.shared.namespace.as_deref().unwrap_or("-"),
      removed, "cleared all tiers"
    );
  }

  /// Removes every expired entry from every tier now, returning how many
  /// were removed. Undecodable durable entries are removed as well.
  pub fn clear_expired(&self) -> usize {
    self.shared.sweep_all().evicted
  }

  /// Populates the cache from asynchronous fetchers.
  ///
  /// All fetchers are driven concurrently. Each successful result is stored
  /// with [`set`](Self::set) as soon as it arrives; a failed fetcher is
  /// reported and skipped without affecting the others. Resolves once every
  /// fetcher has finished, whatever the outcome.
  pub async fn warm<I>(&self, entries: I) -> WarmReport
  where
    I: IntoIterator<Item = WarmEntry<V>>,
  {
    let attempts = entries.into_iter().map(|entry| async move {
      let WarmEntry {
        key,
        fetcher,
        options,
      } = entry;
      match fetcher.await {
        Ok(value) => {
          self.set(&key, value, options);
          true
        }
        Err(source) => {
          self.shared.report(CacheError::Fetcher { key, source });
          false
        }
      }
    });

    let outcomes = future::join_all(attempts).await;
    let loaded = outcomes.iter().filter(|ok| **ok).count();
    let report = WarmReport {
      loaded,
      failed: outcomes.len() - loaded,
    };
    debug!(loaded = report.loaded, failed = report.failed, "cache warm-up finished");
    report
  }

  /// A point-in-time view of the statistics, with live entry counts per tier.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot(self.shared.size_by_tier())
  }

  /// Zeroes the hit, miss, set and delete counters. Entries are kept.
  pub fn reset_metrics(&self) {
    self.shared.metrics.reset();
  }

  /// Starts the background sweep if it is not already running.
  ///
  /// The sweep runs once immediately and then every configured interval.
  /// Returns `false` if a sweep was already scheduled for this cache (or the
  /// thread could not be started), so calling this repeatedly never starts
  /// competing sweepers.
  pub fn start_background_sweep(&self) -> bool {
    let mut janitor = self.shared.janitor.lock();
    if janitor.is_some() {
      return false;
    }

    match Janitor::spawn(Arc::downgrade(&self.shared), self.shared.sweep_interval) {
      Ok(spawned) => {
        *janitor = Some(spawned);
        true
      }
      Err(e) => {
        warn!(error = %e, "failed to start the background sweep; expired entries are only removed on access");
        false
      }
    }
  }

  /// Stops the background sweep. Returns whether one was running.
  pub fn stop_background_sweep(&self) -> bool {
    match self.shared.janitor.lock().take() {
      Some(janitor) => {
        janitor.stop();
        true
      }
      None => false,
    }
  }

  /// The namespace durable keys are prefixed with, if any.
  pub fn namespace(&self) -> Option<&str> {
    self.shared.namespace.as_deref()
  }
}
