use crate::expiry;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A value in the memory tier, holding all necessary metadata.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
  /// The user's value, wrapped in an Arc for shared ownership.
  value: Arc<V>,
  /// Write timestamp in milliseconds since the Unix epoch.
  pub(crate) inserted_at: u64,
  /// 0 means no TTL.
  pub(crate) ttl_millis: u64,
}

impl<V> CacheEntry<V> {
  pub(crate) fn new(value: V, inserted_at: u64, ttl_millis: u64) -> Self {
    Self {
      value: Arc::new(value),
      inserted_at,
      ttl_millis,
    }
  }

  /// Returns a clone of the `Arc` containing the value.
  #[inline]
  pub(crate) fn value(&self) -> Arc<V> {
    self.value.clone()
  }

  #[inline]
  pub(crate) fn is_live(&self, now: u64) -> bool {
    expiry::is_live(self.inserted_at, self.ttl_millis, now)
  }
}

/// The persisted JSON shape of a durable entry:
/// `{"value": ..., "insertedAt": ..., "ttlMillis": ...}`.
///
/// Renaming or adding fields orphans everything already written by older
/// versions, so this layout is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredEntry<T> {
  pub(crate) value: T,
  pub(crate) inserted_at: u64,
  pub(crate) ttl_millis: u64,
}

impl<T> StoredEntry<T> {
  #[inline]
  pub(crate) fn is_live(&self, now: u64) -> bool {
    expiry::is_live(self.inserted_at, self.ttl_millis, now)
  }
}

/// Only the timing metadata of a stored blob. Used by the sweep, which
/// must not require `V` to decode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredHeader {
  pub(crate) inserted_at: u64,
  pub(crate) ttl_millis: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stored_entry_has_stable_json_shape() {
    let entry = StoredEntry {
      value: vec![1, 2, 3],
      inserted_at: 42,
      ttl_millis: 0,
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(
      json,
      serde_json::json!({ "value": [1, 2, 3], "insertedAt": 42, "ttlMillis": 0 })
    );
  }

  #[test]
  fn header_ignores_value() {
    let header: StoredHeader =
      serde_json::from_str(r#"{"value":{"deep":[1]},"insertedAt":7,"ttlMillis":9}"#).unwrap();
    assert_eq!(header.inserted_at, 7);
    assert_eq!(header.ttl_millis, 9);
  }
}
