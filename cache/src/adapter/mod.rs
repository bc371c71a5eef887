//! Bridges between the tier-agnostic facade and each tier's entry store.

mod durable;
mod memory;

pub(crate) use durable::{DurableTier, NAMESPACE_SEPARATOR};
pub(crate) use memory::MemoryTier;

use crate::error::CacheError;
use crate::Tier;

use std::sync::Arc;

/// Uniform operations over one tier.
///
/// Adapters return their failures; turning those into log lines and misses
/// is the facade's job.
pub(crate) trait TierAdapter<V>: Send + Sync {
  fn tier(&self) -> Tier;

  /// Stores `value` written at `now`. A `ttl_millis` of 0 never expires.
  fn set(&self, key: &str, value: V, ttl_millis: u64, now: u64) -> Result<(), CacheError>;

  /// Returns the live value for `key`. Expired entries are removed and
  /// reported as absent; undecodable ones are removed and reported as errors.
  fn get(&self, key: &str, now: u64) -> Result<Option<Arc<V>>, CacheError>;

  /// Returns whether an entry was actually removed.
  fn delete(&self, key: &str) -> Result<bool, CacheError>;

  /// Every stored key, live or not, as seen by the caller (without any
  /// namespace prefix).
  fn keys(&self) -> Result<Vec<String>, CacheError>;

  /// Removes `key` if it is expired (or cannot be decoded). Returns whether
  /// it was removed.
  fn evict_if_expired(&self, key: &str, now: u64) -> Result<bool, CacheError>;

  /// Keys of entries that are live at `now`. Nothing is removed.
  fn live_keys(&self, now: u64) -> Result<Vec<String>, CacheError>;

  fn live_len(&self, now: u64) -> Result<usize, CacheError> {
    self.live_keys(now).map(|keys| keys.len())
  }

  /// Removes every entry, reporting per-key failures without stopping.
  /// Returns the number of entries removed.
  fn clear(&self, report: &mut dyn FnMut(CacheError)) -> usize {
    let keys = match self.keys() {
      Ok(keys) => keys,
      Err(e) => {
        report(e);
        return 0;
      }
    };

    keys
      .iter()
      .filter(|key| match self.delete(key) {
        Ok(removed) => removed,
        Err(e) => {
          report(e);
          false
        }
      })
      .count()
  }
}
