use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

/// A thread-safe, internal statistics collector for the cache.
/// Counters are atomic so recording never takes a lock.
#[derive(Debug)]
pub(crate) struct Metrics {
  hits: CachePadded<AtomicU64>,
  misses: CachePadded<AtomicU64>,
  sets: CachePadded<AtomicU64>,
  deletes: CachePadded<AtomicU64>,

  // Snapshots read under the shared side, resets take the exclusive side,
  // so no snapshot observes a partially zeroed set of counters.
  reset_gate: RwLock<()>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      sets: CachePadded::new(AtomicU64::new(0)),
      deletes: CachePadded::new(AtomicU64::new(0)),
      reset_gate: RwLock::new(()),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn record_set(&self) {
    self.sets.fetch_add(1, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn record_hit(&self) {
    self.hits.fetch_add(1, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn record_miss(&self) {
    self.misses.fetch_add(1, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn record_delete(&self) {
    self.deletes.fetch_add(1, Ordering::Relaxed);
  }

  /// Zeroes all four counters.
  pub(crate) fn reset(&self) {
    let _gate = self.reset_gate.write();
    self.hits.store(0, Ordering::Relaxed);
    self.misses.store(0, Ordering::Relaxed);
    self.sets.store(0, Ordering::Relaxed);
    self.deletes.store(0, Ordering::Relaxed);
  }

  /// Creates a point-in-time snapshot of the counters.
  pub(crate) fn snapshot(&self, size_by_tier: SizeByTier) -> MetricsSnapshot {
    let _gate = self.reset_gate.read();
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      sets: self.sets.load(Ordering::Relaxed),
      deletes: self.deletes.load(Ordering::Relaxed),
      hit_rate: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      size_by_tier,
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// Live entry counts per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeByTier {
  pub memory: usize,
  pub durable_local: usize,
  pub durable_session: usize,
}

impl SizeByTier {
  pub fn total(&self) -> usize {
    self.memory + self.durable_local + self.durable_session
  }
}

/// A point-in-time, public-facing snapshot of the cache's statistics.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// The number of lookups that returned a live value.
  pub hits: u64,
  /// The number of lookups that found nothing, an expired entry or an
  /// undecodable one.
  pub misses: u64,
  /// The number of `set` calls.
  pub sets: u64,
  /// The number of deletes that actually removed an entry.
  pub deletes: u64,
  /// `hits / (hits + misses)`, or `0.0` before any lookup.
  pub hit_rate: f64,
  /// Live entries per tier at the time of the snapshot.
  pub size_by_tier: SizeByTier,
  /// The number of seconds the cache has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("sets", &self.sets)
      .field("deletes", &self.deletes)
      .field("hit_rate", &format!("{:.2}%", self.hit_rate * 100.0))
      .field("size_by_tier", &self.size_by_tier)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
