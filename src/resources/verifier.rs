//! Presence and absence checks of a resource set against the cluster.
//!
//! One data-driven loop over a descriptor's expected counts replaces the
//! per-kind checks: kinds are evaluated in declaration order and the first
//! offending kind stops the check.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::availability::{AvailabilityPoller, PollPolicy, PollStats, ProbeError};
use crate::cluster::{ClusterQuery, QueryError};
use crate::error::{Error, Result};
use crate::resources::{ResourceKind, ResourceSetDescriptor};

/// Outcome of checking one kind of one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationVerdict {
    /// Observed count equals the expected (non-zero) count.
    Present,
    /// No objects were found.
    Absent,
    /// Objects were found, but not as many as expected.
    Mismatch {
        kind: ResourceKind,
        expected: usize,
        observed: usize,
    },
}

/// Compares observed cluster state with resource-set descriptors.
#[derive(Clone)]
pub struct ResourceSetVerifier {
    cluster: Arc<dyn ClusterQuery>,
}

impl ResourceSetVerifier {
    pub fn new(cluster: Arc<dyn ClusterQuery>) -> Self {
        Self { cluster }
    }

    /// Count objects of `kind` under the descriptor's selector.
    ///
    /// A "not found" answer counts as zero; any other failure is a `QueryFailure`.
    async fn observed_count(
        &self,
        descriptor: &ResourceSetDescriptor,
        kind: ResourceKind,
    ) -> Result<usize> {
        let namespace = descriptor.namespace_for(kind).map(str::to_string);
        match self
            .cluster
            .list(kind, namespace, descriptor.label_selector().to_string())
            .await
        {
            Ok(items) => Ok(items.len()),
            Err(QueryError::NotFound(_)) => Ok(0),
            Err(QueryError::Other(message)) => Err(Error::QueryFailure { kind, message }),
        }
    }

    /// Whether a single named object exists.
    async fn named_exists(
        &self,
        descriptor: &ResourceSetDescriptor,
        kind: ResourceKind,
        name: &str,
    ) -> Result<bool> {
        let namespace = descriptor.namespace_for(kind).map(str::to_string);
        match self.cluster.get(kind, namespace, name.to_string()).await {
            Ok(_) => Ok(true),
            Err(QueryError::NotFound(_)) => Ok(false),
            Err(QueryError::Other(message)) => Err(Error::QueryFailure { kind, message }),
        }
    }

    /// Check one kind of a descriptor and report the verdict.
    pub async fn verdict(
        &self,
        descriptor: &ResourceSetDescriptor,
        kind: ResourceKind,
    ) -> Result<VerificationVerdict> {
        let expected = descriptor.expected_counts().get(&kind).copied().unwrap_or(0);
        let observed = self.observed_count(descriptor, kind).await?;
        Ok(if observed == 0 {
            VerificationVerdict::Absent
        } else if observed == expected {
            VerificationVerdict::Present
        } else {
            VerificationVerdict::Mismatch {
                kind,
                expected,
                observed,
            }
        })
    }

    /// Succeed only if every kind matches its expected count exactly and every
    /// named object exists.
    pub async fn check_present(&self, descriptor: &ResourceSetDescriptor) -> Result<()> {
        for (&kind, &expected) in descriptor.expected_counts() {
            let observed = self.observed_count(descriptor, kind).await?;
            if observed != expected {
                return Err(Error::PresenceMismatch {
                    variant: descriptor.name().to_string(),
                    kind,
                    expected,
                    observed,
                });
            }
            debug!(variant = %descriptor.name(), kind = %kind, count = observed, "Count matches");
        }

        for obj in descriptor.named_objects() {
            if !self.named_exists(descriptor, obj.kind, &obj.name).await? {
                return Err(Error::UnexpectedAbsence {
                    variant: descriptor.name().to_string(),
                    kind: obj.kind,
                    name: obj.name.clone(),
                });
            }
        }

        info!(variant = %descriptor.name(), "Resource set present");
        Ok(())
    }

    /// Succeed only if no kind has matching objects and no named object exists.
    pub async fn check_absent(&self, descriptor: &ResourceSetDescriptor) -> Result<()> {
        for &kind in descriptor.expected_counts().keys() {
            let observed = self.observed_count(descriptor, kind).await?;
            if observed > 0 {
                return Err(Error::UnexpectedPresence {
                    variant: descriptor.name().to_string(),
                    kind,
                    observed,
                });
            }
        }

        for obj in descriptor.named_objects() {
            if self.named_exists(descriptor, obj.kind, &obj.name).await? {
                return Err(Error::UnexpectedPresence {
                    variant: descriptor.name().to_string(),
                    kind: obj.kind,
                    observed: 1,
                });
            }
        }

        info!(variant = %descriptor.name(), "Resource set absent");
        Ok(())
    }

    /// Retry [`check_present`](Self::check_present) under `policy` until the
    /// cluster converges.
    ///
    /// Count mismatches are retried; query failures abort immediately. When
    /// the wait gives up, the last verification error is returned.
    pub async fn wait_present(
        &self,
        descriptor: &ResourceSetDescriptor,
        poller: &AvailabilityPoller,
        policy: &PollPolicy,
    ) -> Result<PollStats> {
        converge(poller, policy, || self.check_present(descriptor)).await
    }

    /// Retry [`check_absent`](Self::check_absent) under `policy` until the
    /// old objects are gone.
    pub async fn wait_absent(
        &self,
        descriptor: &ResourceSetDescriptor,
        poller: &AvailabilityPoller,
        policy: &PollPolicy,
    ) -> Result<PollStats> {
        converge(poller, policy, || self.check_absent(descriptor)).await
    }
}

async fn converge<F, Fut>(
    poller: &AvailabilityPoller,
    policy: &PollPolicy,
    check: F,
) -> Result<PollStats>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let last_failure: Mutex<Option<Error>> = Mutex::new(None);
    let slot = &last_failure;

    let outcome = poller
        .wait_until(
            || {
                let attempt = check();
                async move {
                    attempt.await.map_err(|e| {
                        let probe_err = to_probe_error(&e);
                        if let Ok(mut last) = slot.lock() {
                            *last = Some(e);
                        }
                        probe_err
                    })
                }
            },
            policy,
        )
        .await;

    match outcome {
        Err(poll_err @ (Error::PollTimeout { .. } | Error::ProbeFatal(_))) => {
            match last_failure.into_inner().ok().flatten() {
                Some(last) => {
                    warn!(error = %poll_err, "Resource set did not converge");
                    Err(last)
                }
                None => Err(poll_err),
            }
        }
        other => other,
    }
}

/// Correctness failures may still converge; everything else is final.
fn to_probe_error(err: &Error) -> ProbeError {
    if err.is_correctness_failure() {
        ProbeError::Transient(err.to_string())
    } else {
        ProbeError::Fatal(err.to_string())
    }
}
