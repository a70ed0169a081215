//! Time source for waits and retry delays.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Abstracts "what time is it" and "wait a while" so retry loops can be
/// driven by a manual clock in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time, for measuring elapsed waits.
    fn now(&self) -> Instant;

    /// Wall-clock unix seconds, for signed request timestamps.
    fn unix_timestamp(&self) -> i64;

    async fn sleep(&self, duration: Duration);
}

/// The real clock, backed by tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
