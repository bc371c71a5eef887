use super::{item_size, StorageBackend, StorageError};

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Documents opened through [`FileBackend::open_shared`], by resolved path.
static OPEN_DOCUMENTS: Lazy<Mutex<HashMap<PathBuf, Weak<FileBackend>>>> =
  Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Default)]
struct Inner {
  items: BTreeMap<String, String>,
  used_bytes: usize,
}

/// Durable storage kept in a single JSON document on disk.
///
/// The document is read once at [`open`](FileBackend::open). Every mutation
/// rewrites it synchronously: the new document is written to a temporary
/// sibling and renamed over the old one, so a crash mid-write never leaves a
/// truncated document behind. If the write fails, the temporary file is
/// removed, the in-memory view is rolled back and the error returned.
///
/// Each backend rewrites the whole document from its own view, so two
/// backends opened separately on one path overwrite each other's items.
/// Caches that share a document should share one backend, which
/// [`open_shared`](FileBackend::open_shared) does per path.
#[derive(Debug)]
pub struct FileBackend {
  path: PathBuf,
  inner: Mutex<Inner>,
  quota_bytes: Option<usize>,
}

impl FileBackend {
  /// Opens (or lazily creates) the document at `path`.
  pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
    let path = path.as_ref().to_path_buf();

    let items: BTreeMap<String, String> = match fs::read_to_string(&path) {
      Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
      Ok(contents) => serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
        path: path.clone(),
        source,
      })?,
      Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
      Err(e) => return Err(e.into()),
    };

    let used_bytes = items.iter().map(|(k, v)| item_size(k, v)).sum();
    debug!(path = %path.display(), items = items.len(), "opened file storage");

    Ok(Self {
      path,
      inner: Mutex::new(Inner { items, used_bytes }),
      quota_bytes: None,
    })
  }

  /// Returns the backend this process already has open for `path`, or opens
  /// a new one. The document is released once the last handle is dropped.
  ///
  /// `quota_bytes` only applies when the document is first opened.
  pub fn open_shared(
    path: impl AsRef<Path>,
    quota_bytes: Option<usize>,
  ) -> Result<Arc<Self>, StorageError> {
    let resolved = resolve_document_path(path.as_ref())?;
    let mut open = OPEN_DOCUMENTS.lock();

    if let Some(existing) = open.get(&resolved).and_then(Weak::upgrade) {
      if existing.quota_bytes != quota_bytes {
        warn!(
          path = %resolved.display(),
          requested = ?quota_bytes,
          current = ?existing.quota_bytes,
          "file storage already open with a different quota; keeping the current one"
        );
      }
      return Ok(existing);
    }

    open.retain(|_, backend| backend.strong_count() > 0);
    let mut backend = Self::open(&resolved)?;
    backend.quota_bytes = quota_bytes;
    let backend = Arc::new(backend);
    open.insert(resolved, Arc::downgrade(&backend));
    Ok(backend)
  }

  /// Limits the total size (keys + values) of stored items.
  pub fn with_quota(mut self, quota_bytes: usize) -> Self {
    self.quota_bytes = Some(quota_bytes);
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
    let dir = match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let document = serde_json::to_vec(items).map_err(|source| StorageError::Corrupt {
      path: self.path.clone(),
      source,
    })?;

    // Dropping the temporary file on any error path deletes it.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&document)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&self.path).map_err(|e| e.error)?;
    Ok(())
  }
}

/// Absolute path with the directory part canonicalized. The document itself
/// may not exist yet.
fn resolve_document_path(path: &Path) -> io::Result<PathBuf> {
  let absolute = if path.is_absolute() {
    path.to_path_buf()
  } else {
    env::current_dir()?.join(path)
  };

  Ok(match (absolute.parent(), absolute.file_name()) {
    (Some(parent), Some(name)) => match fs::canonicalize(parent) {
      Ok(parent) => parent.join(name),
      Err(_) => absolute,
    },
    _ => absolute,
  })
}

impl StorageBackend for FileBackend {
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

    let previous = inner.items.insert(key.to_string(), value.to_string());
    if let Err(e) = self.persist(&inner.items) {
      match previous {
        Some(old) => inner.items.insert(key.to_string(), old),
        None => inner.items.remove(key),
      };
      return Err(e);
    }
    inner.used_bytes = needed;
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<bool, StorageError> {
    let mut inner = self.inner.lock();
    let Some(old) = inner.items.remove(key) else {
      return Ok(false);
    };

    if let Err(e) = self.persist(&inner.items) {
      inner.items.insert(key.to_string(), old);
      return Err(e);
    }
    inner.used_bytes -= item_size(key, &old);
    Ok(true)
  }

  fn keys(&self) -> Result<Vec<String>, StorageError> {
    Ok(self.inner.lock().items.keys().cloned().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reopen_sees_previous_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("local.json");

    let backend = FileBackend::open(&path).unwrap();
    backend.set_item("a", "1").unwrap();
    backend.set_item("b", "2").unwrap();
    assert!(backend.remove_item("a").unwrap());
    drop(backend);

    let reopened = FileBackend::open(&path).unwrap();
    assert_eq!(reopened.keys().unwrap(), vec!["b".to_string()]);
    assert_eq!(reopened.get_item("b").unwrap().as_deref(), Some("2"));
  }

  #[test]
  fn corrupt_document_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.json");
    fs::write(&path, "{not json").unwrap();

    let err = FileBackend::open(&path).unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { .. }));
  }

  #[test]
  fn failed_write_leaves_no_temporary_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.json");
    let backend = FileBackend::open(&path).unwrap();

    // A non-empty directory in the document's place makes the final rename fail.
    fs::create_dir(&path).unwrap();
    fs::write(path.join("occupied"), "x").unwrap();

    assert!(matches!(backend.set_item("a", "1"), Err(StorageError::Io(_))));
    assert!(backend.keys().unwrap().is_empty());

    let entries: Vec<_> = fs::read_dir(dir.path())
      .unwrap()
      .map(|entry| entry.unwrap().file_name())
      .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("local.json")]);
  }

  #[test]
  fn open_shared_reuses_the_open_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.json");

    let first = FileBackend::open_shared(&path, Some(1024)).unwrap();
    let second = FileBackend::open_shared(dir.path().join(".").join("local.json"), None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.quota_bytes, Some(1024));

    first.set_item("a", "1").unwrap();
    second.set_item("b", "2").unwrap();
    drop((first, second));

    let reopened = FileBackend::open_shared(&path, None).unwrap();
    assert_eq!(reopened.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(reopened.quota_bytes, None);
  }

  #[test]
  fn quota_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(dir.path().join("local.json"))
      .unwrap()
      .with_quota(4);
    backend.set_item("ab", "cd").unwrap();
    assert!(matches!(
      backend.set_item("x", "y"),
      Err(StorageError::QuotaExceeded { needed: 6, limit: 4 })
    ));
    assert_eq!(backend.keys().unwrap().len(), 1);
  }
}
