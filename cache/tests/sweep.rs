mod common;

use common::{harness, harness_with, T0};
use std::thread;
use std::time::{Duration, Instant};
use tiered_cache::{CacheBuilder, MemoryBackend, SetOptions, StorageBackend, Tier};

fn ttl(ms: u64) -> SetOptions {
  SetOptions::new().ttl(Duration::from_millis(ms))
}

#[test]
fn test_clear_expired_keeps_only_live_entries() {
  for tier in Tier::ALL {
    let h = harness::<u32>();
    h.cache.set("live1", 1, ttl(0).tier(tier));
    h.cache.set("expired1", 2, ttl(10).tier(tier));
    h.cache.set("expired2", 3, ttl(20).tier(tier));
    h.cache.set("live2", 4, ttl(1_000).tier(tier));

    h.clock.set(T0 + 500);
    assert_eq!(h.cache.clear_expired(), 2, "{tier}");

    assert_eq!(h.cache.get("live1", tier).as_deref(), Some(&1));
    assert_eq!(h.cache.get("live2", tier).as_deref(), Some(&4));
    assert!(h.cache.get("expired1", tier).is_none());
    assert!(h.cache.get("expired2", tier).is_none());

    let mut remaining = h.cache.keys(tier);
    remaining.sort();
    assert_eq!(remaining, vec!["live1", "live2"]);
  }
}

#[test]
fn test_sweep_removes_expired_keys_from_the_backend() {
  let h = harness::<u32>();
  h.cache.set("old", 1, ttl(5).tier(Tier::DurableLocal));
  h.cache.set("new", 2, ttl(0).tier(Tier::DurableLocal));
  h.clock.advance(Duration::from_millis(6));

  // Not yet read, so still physically stored.
  assert_eq!(h.local.len(), 2);
  h.cache.clear_expired();
  assert_eq!(h.local.keys().unwrap(), vec!["new"]);
}

#[test]
fn test_sweep_continues_past_undecodable_entries() {
  let h = harness::<u32>();
  h.local.set_item("garbage", "%%%").unwrap();
  h.cache.set("expired", 1, ttl(1).tier(Tier::DurableLocal));
  h.cache.set("kept", 2, Tier::DurableLocal);
  h.clock.advance(Duration::from_millis(2));

  assert_eq!(h.cache.clear_expired(), 2);
  assert_eq!(h.local.keys().unwrap(), vec!["kept"]);
}

#[test]
fn test_background_sweep_evicts_without_reads() {
  let local = MemoryBackend::new();
  let h = harness_with::<u32>(
    CacheBuilder::new().sweep_interval(Duration::from_millis(10)),
    local.clone(),
    MemoryBackend::new(),
  );
  h.cache.set("k", 1, ttl(5).tier(Tier::DurableLocal));
  h.clock.advance(Duration::from_millis(50));

  assert!(h.cache.start_background_sweep());

  let deadline = Instant::now() + Duration::from_secs(2);
  while !local.is_empty() {
    if Instant::now() > deadline {
      panic!("background sweep did not evict the expired entry in time");
    }
    thread::sleep(Duration::from_millis(10));
  }

  assert!(h.cache.stop_background_sweep());
  assert!(!h.cache.stop_background_sweep());
}

#[test]
fn test_background_sweep_starts_only_once() {
  let cache = CacheBuilder::<u32>::new()
    .sweep_interval(Duration::from_secs(60))
    .build()
    .unwrap();

  // `build` already started it.
  assert!(!cache.start_background_sweep());
  assert!(!cache.clone().start_background_sweep());

  assert!(cache.stop_background_sweep());
  assert!(cache.start_background_sweep());
}

#[test]
fn test_dropping_the_cache_stops_the_sweep() {
  let local = MemoryBackend::new();
  let cache = CacheBuilder::<u32>::new()
    .sweep_interval(Duration::from_millis(5))
    .local_backend(local.clone())
    .build()
    .unwrap();
  drop(cache);

  // Give a lingering janitor a chance to run; it must not touch the backend.
  thread::sleep(Duration::from_millis(30));
  local.set_item("foreign", "{").unwrap();
  thread::sleep(Duration::from_millis(30));
  assert_eq!(local.keys().unwrap(), vec!["foreign"]);
}
