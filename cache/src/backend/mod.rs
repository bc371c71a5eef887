//! String-keyed host storage used by the durable tiers.
//!
//! A backend is an opaque collaborator: it stores strings under string keys
//! and may fail on any call (quota exceeded, storage disabled, I/O errors).

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a [`StorageBackend`].
#[derive(Debug, Error)]
pub enum StorageError {
  #[error("storage quota exceeded: {needed} bytes needed, {limit} bytes allowed")]
  QuotaExceeded { needed: usize, limit: usize },

  #[error("storage I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("storage document '{}' is corrupt: {source}", .path.display())]
  Corrupt {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("storage unavailable: {0}")]
  Unavailable(String),
}

/// A synchronous string key/value store, modelled on browser-style
/// local and session storage.
pub trait StorageBackend: Send + Sync {
  fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

  /// Unconditionally overwrites `key`.
  fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

  /// Removes `key`, returning whether it was present. Removing an absent
  /// key is not an error.
  fn remove_item(&self, key: &str) -> Result<bool, StorageError>;

  /// Every key currently stored, read from the backend itself.
  fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Bytes a single item counts against a quota.
#[inline]
pub(crate) fn item_size(key: &str, value: &str) -> usize {
  key.len() + value.len()
}

/// Lets several caches share one backend instance.
impl<T: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<T> {
  fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
    (**self).get_item(key)
  }

  fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
    (**self).set_item(key, value)
  }

  fn remove_item(&self, key: &str) -> Result<bool, StorageError> {
    (**self).remove_item(key)
  }

  fn keys(&self) -> Result<Vec<String>, StorageError> {
    (**self).keys()
  }
}
