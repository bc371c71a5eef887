use std::time::Duration;

use serde::{Deserialize, Serialize};
use tiered_cache::{CacheBuilder, CacheError, Tier, WarmEntry};
use tokio::time;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Department {
  id: u32,
  name: String,
}

// Stands in for a slow REST call.
async fn fetch_department(id: u32) -> Result<Department, String> {
  time::sleep(Duration::from_millis(50 * u64::from(id))).await;
  if id == 3 {
    return Err(format!("department {id}: 503 Service Unavailable"));
  }
  Ok(Department {
    id,
    name: format!("Department #{id}"),
  })
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tiered_cache=debug")),
    )
    .init();

  let cache = CacheBuilder::<Department>::new()
    .namespace("departments")
    .error_listener(|e: &CacheError| println!("cache reported: {e}"))
    .build()
    .expect("Failed to build cache");

  let entries = (1..=4).map(|id| {
    WarmEntry::new(format!("dept:{id}"), fetch_department(id))
      .tier(Tier::DurableSession)
      .ttl(Duration::from_secs(600))
  });

  // Resolves once every fetcher is done; the failing one is just skipped.
  let report = cache.warm(entries).await;
  println!("warm-up: {report:?}");

  for id in 1..=4 {
    let key = format!("dept:{id}");
    println!("{key} -> {:?}", cache.get(&key, Tier::DurableSession));
  }
  println!("{:#?}", cache.metrics());
}
