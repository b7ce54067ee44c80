//! Sequencing of one legacy-to-managed migration.
//!
//! Each public step checks the current phase against the state machine,
//! establishes its postcondition, and only then advances the phase. A failed
//! step leaves the phase untouched and is reported as a [`MigrationError`]
//! naming the phase reached and the postcondition that did not hold.

use std::fmt;

use jiff::Timestamp;
use tracing::{error, info, instrument, warn};

use crate::availability::AvailabilityPoller;
use crate::error::Error;
use crate::migration::report::{MigrationReport, PhaseRecord};
use crate::migration::state_machine::{MigrationEvent, MigrationStateMachine, TransitionResult};
use crate::migration::{MigrationContext, MigrationPhase, RunMode};
use crate::plan::{MigrationPlan, VariantPlan};
use crate::release::STATUS_DEPLOYED;
use crate::resources::ResourceSetVerifier;

/// The steps of a migration run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStep {
    InstallLegacy,
    VerifyLegacy,
    InstallManaged,
    VerifyManaged,
    VerifyServiceAvailable,
    Teardown,
}

impl MigrationStep {
    pub const ALL: [MigrationStep; 6] = [
        MigrationStep::InstallLegacy,
        MigrationStep::VerifyLegacy,
        MigrationStep::InstallManaged,
        MigrationStep::VerifyManaged,
        MigrationStep::VerifyServiceAvailable,
        MigrationStep::Teardown,
    ];

    /// What must hold once the step succeeds.
    pub fn postcondition(&self) -> &'static str {
        match self {
            MigrationStep::InstallLegacy => "legacy resources installed",
            MigrationStep::VerifyLegacy => "legacy resources present and managed resources absent",
            MigrationStep::InstallManaged => "managed release deployed",
            MigrationStep::VerifyManaged => "managed resources present and legacy resources absent",
            MigrationStep::VerifyServiceAvailable => "service reachable after migration",
            MigrationStep::Teardown => "managed release deleted",
        }
    }

    /// The event that starts this step.
    fn event(&self) -> MigrationEvent {
        match self {
            MigrationStep::InstallLegacy => MigrationEvent::LegacyInstallSucceeded,
            MigrationStep::VerifyLegacy => MigrationEvent::LegacyVerificationPassed,
            MigrationStep::InstallManaged => MigrationEvent::ManagedInstallStarted,
            MigrationStep::VerifyManaged => MigrationEvent::ManagedVerificationPassed,
            MigrationStep::VerifyServiceAvailable => MigrationEvent::ServiceProbeSucceeded,
            MigrationStep::Teardown => MigrationEvent::ReleaseDeleted,
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::InstallLegacy => write!(f, "install legacy resources"),
            MigrationStep::VerifyLegacy => write!(f, "verify legacy resources"),
            MigrationStep::InstallManaged => write!(f, "install managed chart"),
            MigrationStep::VerifyManaged => write!(f, "verify managed resources"),
            MigrationStep::VerifyServiceAvailable => write!(f, "verify service availability"),
            MigrationStep::Teardown => write!(f, "tear down managed release"),
        }
    }
}

/// A fatal step failure with the phase it happened in.
#[derive(Debug)]
pub struct MigrationError {
    /// Phase reached before the failing step.
    pub phase: MigrationPhase,
    pub step: MigrationStep,
    pub source: Error,
}

impl MigrationError {
    /// The failure says the migration itself is wrong, not just slow or broken.
    pub fn is_correctness_failure(&self) -> bool {
        self.source.is_correctness_failure()
    }

    pub fn is_cleanup_failure(&self) -> bool {
        self.source.is_cleanup_failure()
    }

    /// The run was stopped from outside rather than failing on its own.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, Error::Cancelled)
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            step if self.is_cancelled() => {
                write!(f, "{} cancelled in phase {}", step, self.phase)
            }
            MigrationStep::VerifyServiceAvailable => write!(
                f,
                "service unavailable after migration (phase {}): {}",
                self.phase, self.source
            ),
            step => write!(
                f,
                "{} failed in phase {}, expected {}: {}",
                step,
                self.phase,
                step.postcondition(),
                self.source
            ),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Drives a migration plan through its phases.
pub struct MigrationOrchestrator {
    plan: MigrationPlan,
    ctx: MigrationContext,
    verifier: ResourceSetVerifier,
    poller: AvailabilityPoller,
    state_machine: MigrationStateMachine,
    phase: MigrationPhase,
    history: Vec<PhaseRecord>,
    report: MigrationReport,
    legacy_install_attempted: bool,
    managed_install_attempted: bool,
}

impl MigrationOrchestrator {
    pub fn new(plan: MigrationPlan, ctx: MigrationContext) -> Self {
        let verifier = ResourceSetVerifier::new(ctx.cluster.clone());
        let poller = AvailabilityPoller::new(ctx.clock.clone(), ctx.cancel.clone());
        let state_machine = MigrationStateMachine::for_mode(plan.mode);
        let initial = PhaseRecord {
            phase: MigrationPhase::Init,
            entered_at: Timestamp::now(),
            description: "Migration run created".to_string(),
        };
        Self {
            plan,
            ctx,
            verifier,
            poller,
            state_machine,
            phase: MigrationPhase::Init,
            history: vec![initial],
            report: MigrationReport {
                final_phase: MigrationPhase::Init,
                history: Vec::new(),
                availability: None,
                teardown_error: None,
                failure: None,
            },
            legacy_install_attempted: false,
            managed_install_attempted: false,
        }
    }

    pub fn phase(&self) -> MigrationPhase {
        self.phase
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> MigrationReport {
        MigrationReport {
            final_phase: self.phase,
            history: self.history.clone(),
            ..self.report.clone()
        }
    }

    fn fail(&self, step: MigrationStep, source: Error) -> MigrationError {
        let err = MigrationError {
            phase: self.phase,
            step,
            source,
        };
        error!(phase = %err.phase, step = %step, error = %err.source, "Migration step failed");
        err
    }

    /// Reject a step that does not start from the current phase.
    fn ensure_step(&self, step: MigrationStep) -> Result<(), MigrationError> {
        if self.state_machine.can_transition(&self.phase, &step.event()) {
            Ok(())
        } else {
            Err(self.fail(
                step,
                Error::InvalidTransition {
                    current: self.phase,
                    step: step.to_string(),
                },
            ))
        }
    }

    fn advance(&mut self, step: MigrationStep, event: MigrationEvent) -> Result<(), MigrationError> {
        match self.state_machine.transition(&self.phase, event) {
            TransitionResult::Success {
                from,
                to,
                description,
                ..
            } => {
                info!(from = %from, to = %to, event = %event, "{}", description);
                self.phase = to;
                self.history.push(PhaseRecord {
                    phase: to,
                    entered_at: Timestamp::now(),
                    description: description.to_string(),
                });
                Ok(())
            }
            TransitionResult::InvalidTransition { current, .. } => Err(self.fail(
                step,
                Error::InvalidTransition {
                    current,
                    step: step.to_string(),
                },
            )),
        }
    }

    /// Presence of `present` first, then absence of `absent`.
    async fn verify_exclusive(
        &self,
        present: &VariantPlan,
        absent: &VariantPlan,
    ) -> Result<(), Error> {
        match &self.plan.convergence {
            Some(policy) => {
                self.verifier
                    .wait_present(&present.resources, &self.poller, policy)
                    .await?;
                self.verifier
                    .wait_absent(&absent.resources, &self.poller, policy)
                    .await?;
            }
            None => {
                self.verifier.check_present(&present.resources).await?;
                self.verifier.check_absent(&absent.resources).await?;
            }
        }
        Ok(())
    }

    /// Install the legacy fixture resources.
    #[instrument(skip(self), fields(phase = %self.phase))]
    pub async fn install_legacy(&mut self) -> Result<(), MigrationError> {
        let step = MigrationStep::InstallLegacy;
        self.ensure_step(step)?;
        self.legacy_install_attempted = true;

        let legacy = &self.plan.legacy;
        self.ctx
            .releases
            .install(legacy.release.clone(), legacy.chart.clone())
            .await
            .map_err(|e| self.fail(step, e))?;

        self.advance(step, MigrationEvent::LegacyInstallSucceeded)
    }

    /// Legacy variant must be present and the managed variant absent.
    #[instrument(skip(self), fields(phase = %self.phase))]
    pub async fn verify_legacy_present_and_managed_absent(&mut self) -> Result<(), MigrationError> {
        let step = MigrationStep::VerifyLegacy;
        self.ensure_step(step)?;

        self.verify_exclusive(&self.plan.legacy, &self.plan.managed)
            .await
            .map_err(|e| self.fail(step, e))?;

        self.advance(step, MigrationEvent::LegacyVerificationPassed)
    }

    /// Install the managed chart and wait for its release to report `deployed`.
    #[instrument(skip(self), fields(phase = %self.phase))]
    pub async fn install_managed(&mut self) -> Result<(), MigrationError> {
        let step = MigrationStep::InstallManaged;
        self.ensure_step(step)?;
        self.managed_install_attempted = true;

        let managed = &self.plan.managed;
        self.ctx
            .releases
            .install(managed.release.clone(), managed.chart.clone())
            .await
            .map_err(|e| self.fail(step, e))?;
        self.advance(step, MigrationEvent::ManagedInstallStarted)?;

        let managed = &self.plan.managed;
        self.ctx
            .releases
            .wait_for_status(
                managed.release.clone(),
                STATUS_DEPLOYED.to_string(),
                self.plan.status_timeout,
            )
            .await
            .map_err(|e| self.fail(step, e))?;

        self.advance(step, MigrationEvent::ManagedReleaseDeployed)
    }

    /// Managed variant must be present and the legacy variant gone.
    #[instrument(skip(self), fields(phase = %self.phase))]
    pub async fn verify_managed_present_and_legacy_absent(&mut self) -> Result<(), MigrationError> {
        let step = MigrationStep::VerifyManaged;
        self.ensure_step(step)?;

        self.verify_exclusive(&self.plan.managed, &self.plan.legacy)
            .await
            .map_err(|e| self.fail(step, e))?;

        self.advance(step, MigrationEvent::ManagedVerificationPassed)
    }

    /// Poll the service API until it answers or the availability deadline passes.
    #[instrument(skip(self), fields(phase = %self.phase))]
    pub async fn verify_service_available(&mut self) -> Result<(), MigrationError> {
        let step = MigrationStep::VerifyServiceAvailable;
        self.ensure_step(step)?;

        let stats = self
            .poller
            .wait_until_available(self.ctx.probe.as_ref(), &self.plan.availability)
            .await
            .map_err(|e| self.fail(step, e))?;
        info!(
            attempts = stats.attempts,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Service available after migration"
        );
        self.report.availability = Some(stats);

        self.advance(step, MigrationEvent::ServiceProbeSucceeded)
    }

    /// Delete the managed release.
    ///
    /// A failure here is recorded in the report; the phases already verified
    /// stand.
    #[instrument(skip(self), fields(phase = %self.phase))]
    pub async fn teardown(&mut self) -> Result<(), MigrationError> {
        let step = MigrationStep::Teardown;
        self.ensure_step(step)?;

        let release = self.plan.managed.release.clone();
        if let Err(e) = self.ctx.releases.delete_release(release, true).await {
            let e = match e {
                e @ Error::TeardownFailure { .. } => e,
                other => Error::TeardownFailure {
                    release: self.plan.managed.release.name.clone(),
                    message: other.to_string(),
                },
            };
            self.report.teardown_error = Some(e.to_string());
            return Err(self.fail(step, e));
        }

        self.advance(step, MigrationEvent::ReleaseDeleted)
    }

    async fn run_steps(&mut self) -> Result<(), MigrationError> {
        match self.plan.mode {
            RunMode::Migration => {
                self.install_legacy().await?;
                self.verify_legacy_present_and_managed_absent().await?;
                self.install_managed().await?;
                self.verify_managed_present_and_legacy_absent().await?;
            }
            RunMode::Metrics => self.install_managed().await?,
        }
        self.verify_service_available().await?;
        match self.teardown().await {
            Err(e) if e.is_cleanup_failure() => {
                warn!(error = %e, "Teardown failed; migration verdict unaffected");
                Ok(())
            }
            other => other,
        }
    }

    /// Run every step of the plan's mode, then clean up fixture releases.
    ///
    /// Returns the report on success. On failure the report is still
    /// available through [`report`](Self::report).
    #[instrument(skip(self), fields(mode = %self.plan.mode, legacy = %self.plan.legacy.release, managed = %self.plan.managed.release))]
    pub async fn run(&mut self) -> Result<MigrationReport, MigrationError> {
        info!("Starting migration run");
        let outcome = self.run_steps().await;

        if let Err(e) = &outcome {
            self.report.failure = Some(e.to_string());
        }
        self.cleanup().await;

        match outcome {
            Ok(()) => {
                let report = self.report();
                info!(final_phase = %report.final_phase, "Migration verified");
                Ok(report)
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort removal of releases this run installed. Failures are logged.
    async fn cleanup(&self) {
        if self.managed_install_attempted && self.phase != MigrationPhase::TornDown {
            if let Err(e) = self
                .ctx
                .releases
                .delete_release(self.plan.managed.release.clone(), true)
                .await
            {
                warn!(release = %self.plan.managed.release, error = %e, "Cleanup of managed release failed");
            }
        }

        if self.legacy_install_attempted && self.plan.cleanup_legacy_release {
            if let Err(e) = self
                .ctx
                .releases
                .delete_release(self.plan.legacy.release.clone(), true)
                .await
            {
                warn!(release = %self.plan.legacy.release, error = %e, "Cleanup of legacy release failed");
            }
        }
    }
}
