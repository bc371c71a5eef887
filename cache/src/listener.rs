use crate::error::CacheError;

/// A hook that receives every failure the cache absorbs.
///
/// Cache failures are never propagated to callers. Code that still wants
/// visibility (metrics, alerting, tests) registers a listener with
/// [`CacheBuilder::error_listener`](crate::CacheBuilder::error_listener).
/// It is called synchronously on the thread that hit the failure, after the
/// failure has been logged, so it should be fast.
pub trait ErrorListener: Send + Sync {
  fn on_error(&self, error: &CacheError);
}

impl<F> ErrorListener for F
where
  F: Fn(&CacheError) + Send + Sync,
{
  fn on_error(&self, error: &CacheError) {
    self(error)
  }
}
