use crate::entry::CacheEntry;

use core::fmt;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

type Shard<V> = RwLock<HashMap<String, CacheEntry<V>, ahash::RandomState>>;

/// A helper function to hash a key using a `BuildHasher`.
#[inline]
fn hash_key<Q: Hash + ?Sized, H: BuildHasher>(hasher: &H, key: &Q) -> u64 {
  let mut state = hasher.build_hasher();
  key.hash(&mut state);
  state.finish()
}

/// The memory tier's entry store, partitioned into independently locked shards.
///
/// The store knows nothing about expiry: reads return the raw entry and the
/// tier adapter decides whether it is still live.
pub(crate) struct ShardedStore<V> {
  shards: Box<[CachePadded<Shard<V>>]>,
  hasher: ahash::RandomState,
}

impl<V> fmt::Debug for ShardedStore<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardedStore")
      .field("num_shards", &self.shards.len())
      .finish()
  }
}

impl<V> ShardedStore<V> {
  /// Creates a store with `num_shards` shards. The count must be a power of two.
  pub(crate) fn new(num_shards: usize) -> Self {
    debug_assert!(num_shards.is_power_of_two());
    let hasher = ahash::RandomState::new();
    let shards = (0..num_shards)
      .map(|_| CachePadded::new(RwLock::new(HashMap::with_hasher(hasher.clone()))))
      .collect::<Vec<_>>();

    Self {
      shards: shards.into_boxed_slice(),
      hasher,
    }
  }

  #[inline]
  fn shard(&self, key: &str) -> &Shard<V> {
    let index = hash_key(&self.hasher, key) as usize & (self.shards.len() - 1);
    &self.shards[index]
  }

  /// Unconditional overwrite. Returns the replaced entry, if any.
  pub(crate) fn write(&self, key: &str, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
    self.shard(key).write().insert(key.to_string(), entry)
  }

  /// Applies `f` to the raw entry under the shard's read lock.
  pub(crate) fn read<F, R>(&self, key: &str, f: F) -> Option<R>
  where
    F: FnOnce(&CacheEntry<V>) -> R,
  {
    self.shard(key).read().get(key).map(f)
  }

  /// Removes `key`. Idempotent.
  pub(crate) fn remove(&self, key: &str) -> Option<CacheEntry<V>> {
    self.shard(key).write().remove(key)
  }

  /// Removes `key` only if `predicate` holds for its entry, under a single
  /// write lock so a concurrent overwrite cannot be lost.
  pub(crate) fn remove_if<F>(&self, key: &str, predicate: F) -> bool
  where
    F: FnOnce(&CacheEntry<V>) -> bool,
  {
    let mut guard = self.shard(key).write();
    match guard.get(key) {
      Some(entry) if predicate(entry) => {
        guard.remove(key);
        true
      }
      _ => false,
    }
  }

  pub(crate) fn keys(&self) -> Vec<String> {
    self
      .shards
      .iter()
      .flat_map(|shard| shard.read().keys().cloned().collect::<Vec<_>>())
      .collect()
  }

  /// Counts the entries for which `predicate` holds without removing anything.
  pub(crate) fn count_where<F>(&self, mut predicate: F) -> usize
  where
    F: FnMut(&CacheEntry<V>) -> bool,
  {
    self
      .shards
      .iter()
      .map(|shard| shard.read().values().filter(|e| predicate(e)).count())
      .sum()
  }

  pub(crate) fn clear(&self) {
    for shard in self.shards.iter() {
      shard.write().clear();
    }
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.shards.iter().map(|shard| shard.read().len()).sum()
  }
}
