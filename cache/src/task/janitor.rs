use crate::shared::CacheShared;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// The default pause between two background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// The background thread that periodically sweeps expired entries.
///
/// It sweeps once right after starting and then once per interval. It only
/// holds a weak reference to the cache, so it never keeps a dropped cache
/// alive; it exits at the next wake-up after the cache is gone or
/// [`stop`](Janitor::stop) is called.
pub(crate) struct Janitor {
  handle: JoinHandle<()>,
  stop_flag: Arc<AtomicBool>,
}

impl Janitor {
  pub(crate) fn spawn<V>(shared: Weak<CacheShared<V>>, interval: Duration) -> io::Result<Self>
  where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
  {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_clone = stop_flag.clone();

    let handle = thread::Builder::new()
      .name("tiered-cache-janitor".into())
      .spawn(move || {
        debug!(interval = ?interval, "janitor started");
        while !stop_clone.load(Ordering::Acquire) {
          match shared.upgrade() {
            Some(cache) => {
              cache.sweep_all();
            }
            None => break,
          }

          // Parking may wake early, so wait out the full interval.
          let deadline = Instant::now() + interval;
          while !stop_clone.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
              break;
            }
            thread::park_timeout(deadline - now);
          }
        }
        debug!("janitor stopped");
      })?;

    Ok(Self { handle, stop_flag })
  }

  /// Signals the janitor thread to stop and wakes it up.
  pub(crate) fn stop(self) {
    self.stop_flag.store(true, Ordering::Release);
    self.handle.thread().unpark();
  }
}
