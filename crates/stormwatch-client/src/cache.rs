//! Cached values with a staleness window.

use std::time::Duration;

use tokio::time::Instant;

/// A fetched value and when it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// The cached value.
    pub value: T,
    /// When the fetch that produced `value` completed.
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Wrap a freshly fetched value.
    pub const fn new(value: T, fetched_at: Instant) -> Self {
        Self { value, fetched_at }
    }

    /// Time since the value was fetched.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }

    /// Whether the value is older than `stale_after`. Stale values are
    /// still shown.
    pub fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        self.age(now) > stale_after
    }
}
