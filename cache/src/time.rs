use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// Entry timestamps are persisted by the durable tiers, so they must be
/// comparable across process restarts. This rules out `Instant`.
pub trait Clock: Send + Sync {
  fn now_millis(&self) -> u64;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  #[inline]
  fn now_millis(&self) -> u64 {
    // Clamp pre-epoch clocks to zero rather than wrapping.
    Utc::now().timestamp_millis().max(0) as u64
  }
}

/// A clock that only moves when told to. Intended for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
  now: AtomicU64,
}

impl ManualClock {
  pub fn new(start_millis: u64) -> Self {
    Self {
      now: AtomicU64::new(start_millis),
    }
  }

  /// Sets the current time to an absolute value.
  pub fn set(&self, millis: u64) {
    self.now.store(millis, Ordering::SeqCst);
  }

  /// Moves the clock forward.
  pub fn advance(&self, by: Duration) {
    self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  #[inline]
  fn now_millis(&self) -> u64 {
    self.now.load(Ordering::SeqCst)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn manual_clock_advances() {
    let clock = ManualClock::new(1_000);
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.now_millis(), 1_250);
    clock.set(10);
    assert_eq!(clock.now_millis(), 10);
  }

  #[test]
  fn system_clock_is_after_2020() {
    // 2020-01-01T00:00:00Z
    assert!(SystemClock.now_millis() > 1_577_836_800_000);
  }
}
