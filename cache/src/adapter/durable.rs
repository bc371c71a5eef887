use super::TierAdapter;
use crate::backend::{StorageBackend, StorageError};
use crate::entry::{StoredEntry, StoredHeader};
use crate::error::CacheError;
use crate::Tier;

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Separates the namespace from the key in physical durable keys.
pub(crate) const NAMESPACE_SEPARATOR: char = ':';

/// A tier backed by a string key/value [`StorageBackend`]. Entries are stored
/// as JSON `{"value", "insertedAt", "ttlMillis"}` documents.
///
/// With a namespace, physical keys are `"{namespace}:{key}"` and only keys
/// under that prefix are visible to `keys`, sweeps and `clear`. Without one,
/// the tier owns the whole key space of its backend.
pub(crate) struct DurableTier<V> {
  tier: Tier,
  backend: Arc<dyn StorageBackend>,
  prefix: Option<String>,
  _value_marker: PhantomData<fn() -> V>,
}

impl<V> DurableTier<V> {
  pub(crate) fn new(tier: Tier, backend: Arc<dyn StorageBackend>, namespace: Option<&str>) -> Self {
    debug_assert!(tier.is_durable());
    Self {
      tier,
      backend,
      prefix: namespace.map(|ns| format!("{ns}{NAMESPACE_SEPARATOR}")),
      _value_marker: PhantomData,
    }
  }

  fn physical_key<'a>(&self, key: &'a str) -> std::borrow::Cow<'a, str> {
    match &self.prefix {
      Some(prefix) => format!("{prefix}{key}").into(),
      None => key.into(),
    }
  }

  fn storage_error(&self, key: &str, source: StorageError) -> CacheError {
    CacheError::Storage {
      tier: self.tier,
      key: key.to_string(),
      source,
    }
  }

  fn serialization_error(&self, key: &str, source: serde_json::Error) -> CacheError {
    CacheError::Serialization {
      tier: self.tier,
      key: key.to_string(),
      source,
    }
  }

  fn read_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
    self
      .backend
      .get_item(&self.physical_key(key))
      .map_err(|e| self.storage_error(key, e))
  }

  fn remove_raw(&self, key: &str) -> Result<bool, CacheError> {
    self
      .backend
      .remove_item(&self.physical_key(key))
      .map_err(|e| self.storage_error(key, e))
  }
}

impl<V> TierAdapter<V> for DurableTier<V>
where
  V: Serialize + DeserializeOwned + Send + Sync,
{
  fn tier(&self) -> Tier {
    self.tier
  }

  fn set(&self, key: &str, value: V, ttl_millis: u64, now: u64) -> Result<(), CacheError> {
    let entry = StoredEntry {
      value: &value,
      inserted_at: now,
      ttl_millis,
    };
    let encoded = serde_json::to_string(&entry).map_err(|e| self.serialization_error(key, e))?;

    self
      .backend
      .set_item(&self.physical_key(key), &encoded)
      .map_err(|e| self.storage_error(key, e))
  }

  fn get(&self, key: &str, now: u64) -> Result<Option<Arc<V>>, CacheError> {
    let Some(raw) = self.read_raw(key)? else {
      return Ok(None);
    };

    let entry: StoredEntry<V> = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        // A blob that cannot be decoded is dropped so it does not fail every
        // subsequent read. The decode error is the one worth reporting.
        if let Err(remove_err) = self.remove_raw(key) {
          debug!(tier = %self.tier, key, error = %remove_err, "failed to drop undecodable entry");
        }
        return Err(self.serialization_error(key, e));
      }
    };

    if !entry.is_live(now) {
      self.remove_raw(key)?;
      return Ok(None);
    }

    Ok(Some(Arc::new(entry.value)))
  }

  fn delete(&self, key: &str) -> Result<bool, CacheError> {
    self.remove_raw(key)
  }

  fn keys(&self) -> Result<Vec<String>, CacheError> {
    let keys = self
      .backend
      .keys()
      .map_err(|e| self.storage_error("*", e))?;

    Ok(match &self.prefix {
      Some(prefix) => keys
        .into_iter()
        .filter_map(|k| k.strip_prefix(prefix.as_str()).map(str::to_string))
        .collect(),
      None => keys,
    })
  }

  fn evict_if_expired(&self, key: &str, now: u64) -> Result<bool, CacheError> {
    let Some(raw) = self.read_raw(key)? else {
      return Ok(false);
    };

    let expired = match serde_json::from_str::<StoredHeader>(&raw) {
      Ok(header) => !crate::expiry::is_live(header.inserted_at, header.ttl_millis, now),
      Err(_) => true,
    };

    if expired {
      self.remove_raw(key)
    } else {
      Ok(false)
    }
  }

  fn live_keys(&self, now: u64) -> Result<Vec<String>, CacheError> {
    let mut live = Vec::new();
    for key in self.keys()? {
      // Keys that vanish or fail to read mid-scan are simply not counted.
      let Ok(Some(raw)) = self.read_raw(&key) else {
        continue;
      };
      if let Ok(header) = serde_json::from_str::<StoredHeader>(&raw) {
        if crate::expiry::is_live(header.inserted_at, header.ttl_millis, now) {
          live.push(key);
        }
      }
    }
    Ok(live)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::MemoryBackend;

  fn tier_with(backend: &MemoryBackend, namespace: Option<&str>) -> DurableTier<Vec<u32>> {
    DurableTier::new(Tier::DurableLocal, Arc::new(backend.clone()), namespace)
  }

  #[test]
  fn writes_stable_json_under_namespace() {
    let backend = MemoryBackend::new();
    let tier = tier_with(&backend, Some("nav"));
    tier.set("history", vec![1, 2], 30, 500).unwrap();

    let raw = backend.get_item("nav:history").unwrap().unwrap();
    assert_eq!(raw, r#"{"value":[1,2],"insertedAt":500,"ttlMillis":30}"#);
    assert_eq!(tier.keys().unwrap(), vec!["history".to_string()]);
  }

  #[test]
  fn corrupt_entry_is_removed_and_reported() {
    let backend = MemoryBackend::new();
    backend.set_item("bad", "not json").unwrap();
    let tier = tier_with(&backend, None);

    let err = tier.get("bad", 0).unwrap_err();
    assert!(matches!(err, CacheError::Serialization { .. }));
    assert_eq!(backend.get_item("bad").unwrap(), None);
  }

  #[test]
  fn namespaces_do_not_see_each_other() {
    let backend = MemoryBackend::new();
    let a = tier_with(&backend, Some("a"));
    let b = tier_with(&backend, Some("b"));
    a.set("k", vec![1], 0, 0).unwrap();

    assert_eq!(b.get("k", 0).unwrap(), None);
    assert!(b.keys().unwrap().is_empty());
    assert_eq!(a.get("k", 0).unwrap().as_deref(), Some(&vec![1]));
  }

  #[test]
  fn sweep_helper_drops_undecodable_blobs() {
    let backend = MemoryBackend::new();
    backend.set_item("junk", "{").unwrap();
    let tier = tier_with(&backend, None);
    assert!(tier.evict_if_expired("junk", 0).unwrap());
    assert!(backend.is_empty());
  }
}
