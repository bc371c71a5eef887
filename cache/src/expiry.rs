//! Expiry policy shared by every tier: one liveness predicate and one sweep.

use crate::adapter::TierAdapter;
use crate::error::CacheError;

use tracing::trace;

/// An entry is live iff it has no TTL or its age does not exceed the TTL.
///
/// The boundary is inclusive: an entry whose age equals its TTL is still live.
/// A clock that moved backwards yields an age of zero.
#[inline]
pub fn is_live(inserted_at: u64, ttl_millis: u64, now: u64) -> bool {
  ttl_millis == 0 || now.saturating_sub(inserted_at) <= ttl_millis
}

/// Result of sweeping a single tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
  /// Keys inspected.
  pub scanned: usize,
  /// Keys removed because they were expired or undecodable.
  pub evicted: usize,
  /// Keys whose inspection or removal failed.
  pub failed: usize,
}

impl SweepOutcome {
  pub(crate) fn merge(&mut self, other: SweepOutcome) {
    self.scanned += other.scanned;
    self.evicted += other.evicted;
    self.failed += other.failed;
  }
}

/// Enumerates every key of `adapter` and evicts the non-live ones.
///
/// A failure on one key is handed to `report` and does not stop the sweep of
/// the remaining keys. A failure to enumerate keys ends the sweep early.
pub(crate) fn sweep_expired<V, F>(adapter: &dyn TierAdapter<V>, now: u64, mut report: F) -> SweepOutcome
where
  F: FnMut(CacheError),
{
  let mut outcome = SweepOutcome::default();

  let keys = match adapter.keys() {
    Ok(keys) => keys,
    Err(e) => {
      outcome.failed += 1;
      report(e);
      return outcome;
    }
  };

  for key in keys {
    outcome.scanned += 1;
    match adapter.evict_if_expired(&key, now) {
      Ok(true) => {
        trace!(tier = %adapter.tier(), key = %key, "evicted expired entry");
        outcome.evicted += 1;
      }
      Ok(false) => {}
      Err(e) => {
        outcome.failed += 1;
        report(e);
      }
    }
  }

  outcome
}
