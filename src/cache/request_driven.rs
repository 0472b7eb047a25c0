//! Staleness-bounded cache that refreshes itself when read while stale.

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// A cached payload together with the time it was produced.
#[derive(Debug, Clone)]
pub struct CachedValue<T> {
  pub payload: T,
  pub updated_at: DateTime<Utc>,
}

impl<T: Default> CachedValue<T> {
  /// Slot content before the first successful refresh. The Unix-epoch
  /// timestamp is older than any positive max age, so the very first read
  /// always attempts a refresh.
  fn never_updated() -> Self {
    Self {
      payload: T::default(),
      updated_at: DateTime::UNIX_EPOCH,
    }
  }
}

/// Cache for a single value that is refreshed on demand.
///
/// `get` refreshes the value through the supplied fetcher when the cached
/// copy is older than `max_age` and returns an owned snapshot. Refresh
/// failures are logged and the previous value keeps being served; callers
/// never see an error. Retry pacing is entirely caller-driven: a failing
/// upstream is retried on every stale read, without backoff.
pub struct RequestDrivenCache<T> {
  slot: Mutex<CachedValue<T>>,
  /// Serializes refreshers so concurrent stale readers coalesce into a
  /// single upstream fetch. Never held together with `slot`.
  refresh: tokio::sync::Mutex<()>,
  max_age: Duration,
}

impl<T: Clone + Default> RequestDrivenCache<T> {
  pub fn new(max_age: Duration) -> Self {
    Self {
      slot: Mutex::new(CachedValue::never_updated()),
      refresh: tokio::sync::Mutex::new(()),
      max_age,
    }
  }

  /// Return a snapshot of the cached value, refreshing it first when it is
  /// older than the configured max age.
  pub async fn get<F, Fut>(&self, fetch: F) -> T
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if self.is_fresh() {
      return self.snapshot();
    }

    let _refreshing = self.refresh.lock().await;

    // A concurrent reader may have finished the refresh while we waited for
    // the guard; their result is fresh enough for us too.
    if self.is_fresh() {
      return self.snapshot();
    }

    match fetch().await {
      Ok(payload) => self.install(payload),
      Err(err) => warn!("cache refresh failed, serving previous data: {err:#}"),
    }

    self.snapshot()
  }

  /// Timestamp of the current cached value. The Unix epoch means no refresh
  /// has succeeded yet.
  #[allow(dead_code)]
  pub fn last_updated(&self) -> DateTime<Utc> {
    self.lock_slot().updated_at
  }

  fn is_fresh(&self) -> bool {
    Utc::now() - self.lock_slot().updated_at <= self.max_age
  }

  fn snapshot(&self) -> T {
    self.lock_slot().payload.clone()
  }

  fn install(&self, payload: T) {
    let mut slot = self.lock_slot();
    slot.payload = payload;
    slot.updated_at = Utc::now();
    debug!("cache refreshed at {}", slot.updated_at);
  }

  // A poisoned slot still holds a consistent value; recover it rather than
  // panic, `get` must not fail.
  fn lock_slot(&self) -> std::sync::MutexGuard<'_, CachedValue<T>> {
    self.slot.lock().unwrap_or_else(PoisonError::into_inner)
  }

  #[cfg(test)]
  fn backdate(&self, updated_at: DateTime<Utc>) {
    self.lock_slot().updated_at = updated_at;
  }
}
