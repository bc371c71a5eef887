mod common;

use common::{harness, harness_with};
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use tiered_cache::{
  CacheBuilder, FileBackend, ManualClock, MemoryBackend, SetOptions, StorageBackend, Tier,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
  a: u32,
  b: Vec<u32>,
}

#[test]
fn test_local_tier_survives_a_restart() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("local.json");
  let value = Payload { a: 1, b: vec![1, 2, 3] };

  {
    let cache = CacheBuilder::<Payload>::new()
      .background_sweep(false)
      .local_storage_path(&path)
      .build()
      .unwrap();
    cache.set("course", value.clone(), Tier::DurableLocal);
  }

  let restarted = CacheBuilder::<Payload>::new()
    .background_sweep(false)
    .local_storage_path(&path)
    .build()
    .unwrap();

  assert_eq!(restarted.get("course", Tier::DurableLocal).as_deref(), Some(&value));
  // Memory does not survive.
  assert_eq!(restarted.get("course", Tier::Memory), None);
}

#[test]
fn test_namespaces_on_one_storage_path_survive_a_restart() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("local.json");
  let build = |namespace: &str| {
    CacheBuilder::<u32>::new()
      .background_sweep(false)
      .namespace(namespace)
      .local_storage_path(&path)
      .build()
      .unwrap()
  };

  {
    let a = build("a");
    let b = build("b");
    a.set("k", 1, Tier::DurableLocal);
    b.set("k", 2, Tier::DurableLocal);
  }

  let stored: BTreeMap<String, serde_json::Value> =
    serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
  assert_eq!(stored.keys().collect::<Vec<_>>(), vec!["a:k", "b:k"]);

  assert_eq!(build("a").get("k", Tier::DurableLocal).as_deref(), Some(&1));
  assert_eq!(build("b").get("k", Tier::DurableLocal).as_deref(), Some(&2));
}

#[test]
fn test_restart_keeps_original_insertion_time() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("local.json");

  let writer = CacheBuilder::<u32>::new()
    .background_sweep(false)
    .clock(ManualClock::new(10_000))
    .local_backend(FileBackend::open(&path).unwrap())
    .build()
    .unwrap();
  writer.set("k", 1, SetOptions::new().tier(Tier::DurableLocal).ttl(Duration::from_secs(1)));
  drop(writer);

  let reader = CacheBuilder::<u32>::new()
    .background_sweep(false)
    .clock(ManualClock::new(11_001))
    .local_backend(FileBackend::open(&path).unwrap())
    .build()
    .unwrap();
  assert_eq!(reader.get("k", Tier::DurableLocal), None);
}

#[test]
fn test_durable_entries_use_the_documented_json_shape() {
  let h = harness::<Payload>();
  h.cache.set("p", Payload { a: 2, b: vec![] }, SetOptions::new().tier(Tier::DurableLocal));

  let raw = h.local.get_item("p").unwrap().unwrap();
  let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
  assert_eq!(
    json,
    serde_json::json!({
      "value": { "a": 2, "b": [] },
      "insertedAt": common::T0,
      "ttlMillis": 0
    })
  );
}

#[test]
fn test_corrupt_entry_is_a_miss_and_is_removed() {
  let h = harness::<Payload>();
  h.session.set_item("broken", r#"{"value": 12, "insertedAt": 0}"#).unwrap();

  assert_eq!(h.cache.get("broken", Tier::DurableSession), None);
  assert!(h.session.is_empty());
  assert_eq!(h.cache.metrics().misses, 1);
  assert_eq!(h.errors().len(), 1);
}

#[test]
fn test_unserializable_value_is_skipped_not_fatal() {
  // JSON object keys must be strings, so this map cannot be encoded.
  let h = harness::<BTreeMap<Vec<u8>, u32>>();
  let mut value = BTreeMap::new();
  value.insert(vec![1u8], 1);

  h.cache.set("map", value.clone(), Tier::DurableLocal);
  assert!(h.local.is_empty());
  assert_eq!(h.cache.get("map", Tier::DurableLocal), None);

  // The memory tier never serializes.
  h.cache.set("map", value.clone(), Tier::Memory);
  assert_eq!(h.cache.get("map", Tier::Memory).as_deref(), Some(&value));

  let errors = h.errors();
  assert_eq!(errors.len(), 1);
  assert!(errors[0].contains("durable-local"), "unexpected error: {}", errors[0]);
}

#[test]
fn test_quota_failure_is_absorbed() {
  let h = harness_with::<String>(
    CacheBuilder::new(),
    MemoryBackend::new().with_quota(128),
    MemoryBackend::new(),
  );

  h.cache.set("small", "ok".to_string(), Tier::DurableLocal);
  h.cache.set("big", "x".repeat(1_000), Tier::DurableLocal);

  assert!(h.cache.get("small", Tier::DurableLocal).is_some());
  assert!(h.cache.get("big", Tier::DurableLocal).is_none());
  assert_eq!(h.cache.metrics().sets, 2);

  let errors = h.errors();
  assert_eq!(errors.len(), 1);
  assert!(errors[0].contains("quota"), "unexpected error: {}", errors[0]);
}

#[test]
fn test_session_backend_outlives_the_cache() {
  let session = MemoryBackend::new();
  let first = harness_with::<u32>(CacheBuilder::new(), MemoryBackend::new(), session.clone());
  first.cache.set("tab", 3, Tier::DurableSession);
  drop(first);

  let second = harness_with::<u32>(CacheBuilder::new(), MemoryBackend::new(), session);
  assert_eq!(second.cache.get("tab", Tier::DurableSession).as_deref(), Some(&3));
}

#[test]
fn test_unreadable_storage_document_fails_the_build() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("local.json");
  fs::write(&path, "[1, 2").unwrap();

  let err = CacheBuilder::<u32>::new()
    .background_sweep(false)
    .local_storage_path(&path)
    .build()
    .unwrap_err();
  assert!(err.to_string().contains("durable storage"), "unexpected error: {err}");
}
