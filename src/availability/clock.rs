//! Injectable time source for the poller.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Source of "now" and of sleeps.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
///
/// Honors `tokio::time::pause`, so tests on a paused runtime run instantly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
