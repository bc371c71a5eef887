//! Several features sharing one durable store, each through its own
//! namespaced cache instance.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tiered_cache::{CacheBuilder, FileBackend, SetOptions, StorageBackend, Tier, TieredCache};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PageView {
  path: String,
  at_millis: u64,
}

struct Analytics {
  cache: TieredCache<Vec<PageView>>,
}

impl Analytics {
  fn record(&self, path: &str, at_millis: u64) {
    let mut buffer = self
      .cache
      .get("buffer", Tier::DurableSession)
      .map(|views| views.as_ref().clone())
      .unwrap_or_default();
    buffer.push(PageView {
      path: path.to_string(),
      at_millis,
    });
    self.cache.set("buffer", buffer, Tier::DurableSession);
  }
}

struct Navigation {
  cache: TieredCache<Vec<String>>,
}

impl Navigation {
  const MAX_HISTORY: usize = 5;

  fn visit(&self, path: &str) {
    let mut history = self
      .cache
      .peek("history", Tier::DurableLocal)
      .map(|h| h.as_ref().clone())
      .unwrap_or_default();
    history.retain(|p| p != path);
    history.insert(0, path.to_string());
    history.truncate(Self::MAX_HISTORY);
    self.cache.set(
      "history",
      history,
      SetOptions::new().tier(Tier::DurableLocal).ttl(Duration::from_secs(7 * 24 * 3600)),
    );
  }
}

fn main() {
  let path = std::env::temp_dir().join("tiered-cache-demo").join("local.json");
  let storage = Arc::new(FileBackend::open(&path).expect("Failed to open storage"));

  let analytics = Analytics {
    cache: CacheBuilder::new()
      .namespace("analytics")
      .local_backend(storage.clone())
      .build()
      .expect("Failed to build analytics cache"),
  };
  let navigation = Navigation {
    cache: CacheBuilder::new()
      .namespace("navigation")
      .local_backend(storage.clone())
      .build()
      .expect("Failed to build navigation cache"),
  };

  for (i, page) in ["/dashboard", "/exams", "/marks", "/exams"].iter().enumerate() {
    analytics.record(page, i as u64);
    navigation.visit(page);
  }

  println!("history: {:?}", navigation.cache.get("history", Tier::DurableLocal));
  println!("analytics: {:?}", analytics.cache.get("buffer", Tier::DurableSession));
  println!("keys in {}: {:?}", path.display(), storage.keys());
}
