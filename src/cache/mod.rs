//! Request-driven caching primitives.
//!
//! Nothing here refreshes on a timer: data is refreshed when a caller asks
//! for it and the cached copy is too old, and refresh triggers are throttled
//! by a keyed rate limiter. Upstream failures never surface to callers; the
//! last good value is served instead.

mod rate_limiter;
mod request_driven;

pub use rate_limiter::RateLimiter;
pub use request_driven::{CachedValue, RequestDrivenCache};
