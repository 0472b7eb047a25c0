//! Keyed rate limiter on a monotonic clock.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Admits an action at most once per `interval` for any given key.
///
/// Keys are independent and a never-seen key is always admitted. Timing uses
/// `Instant`, so wall-clock adjustments cannot starve or double-admit a key.
/// A zero interval admits every call, since the elapsed gap is compared
/// strictly. Keys are never evicted; the key set is expected to stay small
/// (one per trigger site).
pub struct RateLimiter {
  interval: Duration,
  last_allowed: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
  pub fn new(interval: Duration) -> Self {
    Self {
      interval,
      last_allowed: Mutex::new(HashMap::new()),
    }
  }

  /// Admit the action for `key` and record the current time if strictly more
  /// than `interval` has elapsed since it was last admitted. Returns `false`
  /// and leaves the state untouched otherwise.
  pub fn check_and_update(&self, key: &str) -> bool {
    let now = Instant::now();
    let mut last_allowed = self
      .last_allowed
      .lock()
      .unwrap_or_else(PoisonError::into_inner);

    match last_allowed.get(key) {
      Some(last) if now.duration_since(*last) <= self.interval => false,
      _ => {
        last_allowed.insert(key.to_string(), now);
        true
      }
    }
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_first_check_is_admitted() {
    let limiter = RateLimiter::new(Duration::from_secs(30));
    assert!(limiter.check_and_update(""));
  }

  #[test]
  fn test_second_check_within_interval_is_denied() {
    let limiter = RateLimiter::new(Duration::from_secs(30));
    assert!(limiter.check_and_update(""));
    assert!(!limiter.check_and_update(""));
    assert!(!limiter.check_and_update(""));
  }

  #[test]
  fn test_keys_are_independent() {
    let limiter = RateLimiter::new(Duration::from_secs(30));
    assert!(limiter.check_and_update("x"));
    assert!(!limiter.check_and_update("x"));
    assert!(limiter.check_and_update("y"));
    assert!(!limiter.check_and_update("y"));
    assert!(!limiter.check_and_update("x"));
  }

  #[test]
  fn test_admitted_again_after_interval_elapsed() {
    let limiter = RateLimiter::new(Duration::from_millis(20));
    assert!(limiter.check_and_update("x"));
    assert!(!limiter.check_and_update("x"));

    std::thread::sleep(Duration::from_millis(30));
    assert!(limiter.check_and_update("x"));
    assert!(!limiter.check_and_update("x"));
  }

  #[test]
  fn test_denied_check_does_not_reset_the_window() {
    let limiter = RateLimiter::new(Duration::from_millis(40));
    assert!(limiter.check_and_update("x"));

    // Repeated denied checks halfway through must not push the window out.
    std::thread::sleep(Duration::from_millis(25));
    assert!(!limiter.check_and_update("x"));
    std::thread::sleep(Duration::from_millis(25));
    assert!(limiter.check_and_update("x"));
  }

  #[test]
  fn test_zero_interval_admits_every_spaced_call() {
    let limiter = RateLimiter::new(Duration::ZERO);
    assert!(limiter.check_and_update(""));
    std::thread::sleep(Duration::from_millis(2));
    assert!(limiter.check_and_update(""));
  }
}
