//! Timing rules for retrying the availability probe.
//!
//! `max_interval` is the ceiling on the delay between two attempts and
//! `deadline` is the total retry budget. They are separate fields: a
//! constant policy has `base_interval == max_interval` and only the deadline
//! bounds how long the poller keeps trying.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the delay between attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Backoff {
    /// Sleep `base_interval` between every pair of attempts.
    Constant,
    /// Multiply the delay after every failure, capped at `max_interval`.
    Exponential { multiplier: f64 },
}

/// Bounded-retry policy for [`AvailabilityPoller`](super::AvailabilityPoller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollPolicy {
    #[serde(with = "crate::duration")]
    base_interval: Duration,
    #[serde(with = "crate::duration")]
    max_interval: Duration,
    /// `None` retries forever.
    #[serde(default, with = "crate::duration::option")]
    deadline: Option<Duration>,
    backoff: Backoff,
}

impl PollPolicy {
    /// Create a validated policy.
    pub fn new(
        base_interval: Duration,
        max_interval: Duration,
        deadline: Option<Duration>,
        backoff: Backoff,
    ) -> Result<Self> {
        let policy = Self {
            base_interval,
            max_interval,
            deadline,
            backoff,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Fixed `interval` between attempts, giving up after `deadline`.
    pub fn constant(interval: Duration, deadline: Duration) -> Result<Self> {
        Self::new(interval, interval, Some(deadline), Backoff::Constant)
    }

    /// Doubling delay from `base_interval` up to `max_interval`.
    pub fn exponential(
        base_interval: Duration,
        max_interval: Duration,
        deadline: Option<Duration>,
    ) -> Result<Self> {
        Self::new(
            base_interval,
            max_interval,
            deadline,
            Backoff::Exponential { multiplier: 2.0 },
        )
    }

    /// Same policy with a new starting interval and/or deadline.
    ///
    /// The backoff shape is kept. A constant policy moves its ceiling with the
    /// interval, an exponential one only raises its ceiling to fit a larger
    /// interval. A missing deadline stays missing unless one is given.
    pub fn with_overrides(
        &self,
        base_interval: Option<Duration>,
        deadline: Option<Duration>,
    ) -> Result<Self> {
        let base_interval = base_interval.unwrap_or(self.base_interval);
        let max_interval = match self.backoff {
            Backoff::Constant => base_interval,
            Backoff::Exponential { .. } => self.max_interval.max(base_interval),
        };
        Self::new(
            base_interval,
            max_interval,
            deadline.or(self.deadline),
            self.backoff,
        )
    }

    /// Check `0 < base_interval <= max_interval <= deadline`.
    pub fn validate(&self) -> Result<()> {
        if self.base_interval.is_zero() {
            return Err(Error::InvalidPolicy(
                "base interval must be greater than zero".to_string(),
            ));
        }
        if self.base_interval > self.max_interval {
            return Err(Error::InvalidPolicy(format!(
                "base interval {:?} exceeds max interval {:?}",
                self.base_interval, self.max_interval
            )));
        }
        if let Some(deadline) = self.deadline
            && self.max_interval > deadline
        {
            return Err(Error::InvalidPolicy(format!(
                "max interval {:?} exceeds deadline {:?}",
                self.max_interval, deadline
            )));
        }
        if let Backoff::Exponential { multiplier } = self.backoff
            && !(multiplier.is_finite() && multiplier >= 1.0)
        {
            return Err(Error::InvalidPolicy(format!(
                "backoff multiplier must be a finite number >= 1, got {}",
                multiplier
            )));
        }
        Ok(())
    }

    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Delay to use after `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        match self.backoff {
            Backoff::Constant => self.base_interval,
            Backoff::Exponential { multiplier } => {
                current.mul_f64(multiplier).min(self.max_interval)
            }
        }
    }
}
