use std::thread;
use std::time::Duration;

use tiered_cache::{CacheBuilder, SetOptions, Tier};

fn main() {
  // A cache whose background sweep runs every second.
  let cache = CacheBuilder::<u64>::new()
    .sweep_interval(Duration::from_secs(1))
    .build()
    .expect("Failed to build cache");

  println!("Inserting ('key1', 100) into the memory tier with a 2-second TTL.");
  cache.set("key1", 100, SetOptions::new().ttl(Duration::from_secs(2)));
  println!("Inserting ('key2', 200) into the session tier without a TTL.");
  cache.set("key2", 200, Tier::DurableSession);

  match cache.get("key1", Tier::Memory) {
    Some(value) => println!("Found value for key1: {}", value),
    None => println!("Value for key1 not found."),
  }

  println!("\nCache metrics: {:#?}", cache.metrics());

  println!("\nWaiting for 3 seconds for key1 to expire...");
  thread::sleep(Duration::from_secs(3));

  // The sweep has already removed the expired entry.
  match cache.get("key1", Tier::Memory) {
    Some(value) => println!("Found value for key1: {}", value),
    None => println!("Value for key1 not found (as expected after TTL)."),
  }

  println!("\nCache metrics after expiration: {:#?}", cache.metrics());
}
