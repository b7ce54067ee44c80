//! Bounded-retry polling of an availability probe.
//!
//! The probe runs immediately; every transient failure is logged and
//! followed by a sleep chosen by the [`PollPolicy`], never sleeping past the
//! deadline. Cancellation is checked before each attempt and raced against
//! both the attempt and the sleep.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::availability::{AvailabilityProbe, Clock, PollPolicy, ProbeError};
use crate::error::{Error, Result};

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollStats {
    /// Number of probe invocations, including the successful one.
    pub attempts: u32,
    /// Time from the first attempt until success.
    #[serde(with = "crate::duration")]
    pub elapsed: Duration,
}

/// Polls a probe until it succeeds, the deadline elapses, or the run is cancelled.
#[derive(Clone)]
pub struct AvailabilityPoller {
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl AvailabilityPoller {
    pub fn new(clock: Arc<dyn Clock>, cancel: CancellationToken) -> Self {
        Self { clock, cancel }
    }

    /// Wait until `probe` reports the service available.
    pub async fn wait_until_available(
        &self,
        probe: &dyn AvailabilityProbe,
        policy: &PollPolicy,
    ) -> Result<PollStats> {
        self.wait_until(|| probe.probe(), policy).await
    }

    /// Retry `attempt` under `policy`.
    ///
    /// `ProbeError::Transient` is retried; `ProbeError::Fatal` aborts at once.
    pub async fn wait_until<F, Fut>(&self, mut attempt: F, policy: &PollPolicy) -> Result<PollStats>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<(), ProbeError>>,
    {
        policy.validate()?;

        let start = self.clock.now();
        let mut attempts = 0u32;
        let mut delay = policy.base_interval();

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            attempts += 1;
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                outcome = attempt() => outcome,
            };

            let last_error = match outcome {
                Ok(()) => {
                    let elapsed = self.clock.now().duration_since(start);
                    debug!(attempts, elapsed_ms = elapsed.as_millis() as u64, "Probe succeeded");
                    return Ok(PollStats { attempts, elapsed });
                }
                Err(ProbeError::Fatal(message)) => return Err(Error::ProbeFatal(message)),
                Err(ProbeError::Transient(message)) => message,
            };

            let elapsed = self.clock.now().duration_since(start);
            let wait = match policy.deadline() {
                Some(deadline) if elapsed >= deadline => {
                    return Err(timeout(deadline, attempts, last_error));
                }
                Some(deadline) => delay.min(deadline - elapsed),
                None => delay,
            };

            warn!(
                attempt = attempts,
                error = %last_error,
                delay_ms = wait.as_millis() as u64,
                "Probe failed, retrying"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                _ = self.clock.sleep(wait) => {}
            }

            if let Some(deadline) = policy.deadline()
                && self.clock.now().duration_since(start) >= deadline
            {
                return Err(timeout(deadline, attempts, last_error));
            }

            delay = policy.next_interval(delay);
        }
    }
}

fn timeout(deadline: Duration, attempts: u32, last_error: String) -> Error {
    warn!(attempts, deadline_ms = deadline.as_millis() as u64, error = %last_error, "Probe deadline exhausted");
    Error::PollTimeout {
        deadline,
        attempts,
        last_error,
    }
}
