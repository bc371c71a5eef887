use super::{item_size, StorageBackend, StorageError};

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Inner {
  items: BTreeMap<String, String>,
  used_bytes: usize,
}

/// An in-process string store.
///
/// Clones share the same storage, so a clone kept outside a cache instance
/// outlives it. This is how a session store that survives page navigation
/// (or a restart in tests) is modelled.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
  inner: Arc<Mutex<Inner>>,
  quota_bytes: Option<usize>,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Limits the total size (keys + values) of stored items.
  pub fn with_quota(mut self, quota_bytes: usize) -> Self {
    self.quota_bytes = Some(quota_bytes);
    self
  }

  /// Total size of stored keys and values in bytes.
  pub fn used_bytes(&self) -> usize {
    self.inner.lock().used_bytes
  }

  pub fn len(&self) -> usize {
    self.inner.lock().items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl StorageBackend for MemoryBackend {
  fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
    Ok(self.inner.lock().items.get(key).cloned())
  }

  fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut inner = self.inner.lock();
    let old_size = inner.items.get(key).map_or(0, |old| item_size(key, old));
    let needed = inner.used_bytes - old_size + item_size(key, value);

    if let Some(limit) = self.quota_bytes {
      if needed > limit {
        return Err(StorageError::QuotaExceeded { needed, limit });
      }
    }

    inner.items.insert(key.to_string(), value.to_string());
    inner.used_bytes = needed;
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<bool, StorageError> {
    let mut inner = self.inner.lock();
    match inner.items.remove(key) {
      Some(old) => {
        inner.used_bytes -= item_size(key, &old);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  fn keys(&self) -> Result<Vec<String>, StorageError> {
    Ok(self.inner.lock().items.keys().cloned().collect())
  }
}
