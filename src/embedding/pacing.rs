//! Rate-limit pacing for embedding calls
//!
//! Fixed-delay pacing:
//! - Concurrency: 1 call in flight by default
//! - Delay: 100ms after every call
//! - Ordering: results always come back in submission order
//!
//! The policy is a value passed to the `Embedder`, so a different limiter
//! only has to change how `pace` waits.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

/// Default number of embedding calls in flight
pub const DEFAULT_MAX_CONCURRENT: usize = 1;

/// Default delay after each call (100ms)
const DEFAULT_INTER_CALL_DELAY_MS: u64 = 100;

/// Pacing applied around each external embedding call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Calls allowed in flight at once within a batch
    max_concurrent: usize,

    /// Wait after each completed call
    inter_call_delay: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitPolicy {
    /// Sequential calls with a 100ms gap
    pub fn new() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            inter_call_delay: Duration::from_millis(DEFAULT_INTER_CALL_DELAY_MS),
        }
    }

    /// Create policy with custom settings (concurrency is clamped to at least 1)
    pub fn with_config(max_concurrent: usize, inter_call_delay: Duration) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            inter_call_delay,
        }
    }

    /// No delay, one call at a time
    pub fn unpaced() -> Self {
        Self::with_config(1, Duration::ZERO)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn inter_call_delay(&self) -> Duration {
        self.inter_call_delay
    }

    /// Wait out the pause that follows a completed call
    pub async fn pace(&self) {
        if !self.inter_call_delay.is_zero() {
            sleep(self.inter_call_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.max_concurrent(), 1);
        assert_eq!(policy.inter_call_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let policy = RateLimitPolicy::with_config(0, Duration::from_millis(5));
        assert_eq!(policy.max_concurrent(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_waits_for_delay() {
        let policy = RateLimitPolicy::default();
        let start = tokio::time::Instant::now();
        policy.pace().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_unpaced_returns_immediately() {
        let start = std::time::Instant::now();
        RateLimitPolicy::unpaced().pace().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
