use super::TierAdapter;
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::store::ShardedStore;
use crate::Tier;

use std::sync::Arc;

/// The process-lifetime tier. Values are kept as-is and never serialized,
/// so none of its operations can fail.
#[derive(Debug)]
pub(crate) struct MemoryTier<V> {
  store: ShardedStore<V>,
}

impl<V> MemoryTier<V> {
  pub(crate) fn new(shards: usize) -> Self {
    Self {
      store: ShardedStore::new(shards),
    }
  }
}

impl<V: Send + Sync> TierAdapter<V> for MemoryTier<V> {
  fn tier(&self) -> Tier {
    Tier::Memory
  }

  fn set(&self, key: &str, value: V, ttl_millis: u64, now: u64) -> Result<(), CacheError> {
    self.store.write(key, CacheEntry::new(value, now, ttl_millis));
    Ok(())
  }

  fn get(&self, key: &str, now: u64) -> Result<Option<Arc<V>>, CacheError> {
    match self.store.read(key, |entry| entry.is_live(now).then(|| entry.value())) {
      Some(Some(value)) => Ok(Some(value)),
      Some(None) => {
        // Re-check under the write lock: the key may have been rewritten
        // between the read and now.
        self.store.remove_if(key, |entry| !entry.is_live(now));
        Ok(None)
      }
      None => Ok(None),
    }
  }

  fn delete(&self, key: &str) -> Result<bool, CacheError> {
    Ok(self.store.remove(key).is_some())
  }

  fn keys(&self) -> Result<Vec<String>, CacheError> {
    Ok(self.store.keys())
  }

  fn evict_if_expired(&self, key: &str, now: u64) -> Result<bool, CacheError> {
    Ok(self.store.remove_if(key, |entry| !entry.is_live(now)))
  }

  fn live_keys(&self, now: u64) -> Result<Vec<String>, CacheError> {
    Ok(
      self
        .store
        .keys()
        .into_iter()
        .filter(|key| self.store.read(key, |entry| entry.is_live(now)).unwrap_or(false))
        .collect(),
    )
  }

  fn live_len(&self, now: u64) -> Result<usize, CacheError> {
    Ok(self.store.count_where(|entry| entry.is_live(now)))
  }

  fn clear(&self, _report: &mut dyn FnMut(CacheError)) -> usize {
    let removed = self.store.keys().len();
    self.store.clear();
    removed
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expired_read_removes_entry() {
    let tier = MemoryTier::new(4);
    tier.set("a", 1, 10, 1_000).unwrap();
    assert_eq!(tier.get("a", 1_010).unwrap().as_deref(), Some(&1));
    assert_eq!(tier.get("a", 1_011).unwrap(), None);
    assert!(tier.keys().unwrap().is_empty());
  }

  #[test]
  fn live_len_skips_stale_entries() {
    let tier = MemoryTier::new(4);
    tier.set("live", 1, 0, 0).unwrap();
    tier.set("stale", 2, 5, 0).unwrap();
    assert_eq!(tier.live_len(100).unwrap(), 1);
    assert_eq!(tier.live_keys(100).unwrap(), vec!["live".to_string()]);
    // Counting does not evict.
    assert_eq!(tier.keys().unwrap().len(), 2);
  }
}
