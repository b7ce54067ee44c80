//! Formal finite state machine for the migration run.
//!
//! Every transition moves the phase forward; in a full migration run exactly
//! one phase at a time. There is no failure phase: a failed postcondition
//! aborts the run and leaves the phase where it was, so the last phase
//! reached tells how far the migration got.

use std::fmt;

use crate::migration::{MigrationPhase, RunMode};

/// Events that trigger phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationEvent {
    /// The legacy fixture install returned successfully
    LegacyInstallSucceeded,
    /// Legacy present and managed absent
    LegacyVerificationPassed,
    /// The managed chart install returned successfully
    ManagedInstallStarted,
    /// The managed release reported `deployed`
    ManagedReleaseDeployed,
    /// Managed present and legacy absent
    ManagedVerificationPassed,
    /// The availability probe succeeded
    ServiceProbeSucceeded,
    /// The managed release was deleted
    ReleaseDeleted,
}

impl fmt::Display for MigrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationEvent::LegacyInstallSucceeded => write!(f, "LegacyInstallSucceeded"),
            MigrationEvent::LegacyVerificationPassed => write!(f, "LegacyVerificationPassed"),
            MigrationEvent::ManagedInstallStarted => write!(f, "ManagedInstallStarted"),
            MigrationEvent::ManagedReleaseDeployed => write!(f, "ManagedReleaseDeployed"),
            MigrationEvent::ManagedVerificationPassed => write!(f, "ManagedVerificationPassed"),
            MigrationEvent::ServiceProbeSucceeded => write!(f, "ServiceProbeSucceeded"),
            MigrationEvent::ReleaseDeleted => write!(f, "ReleaseDeleted"),
        }
    }
}

/// A state transition definition
#[derive(Debug)]
pub struct Transition {
    /// Source phase
    pub from: MigrationPhase,
    /// Target phase
    pub to: MigrationPhase,
    /// Event that triggers this transition
    pub event: MigrationEvent,
    /// Human-readable description of this transition
    pub description: &'static str,
}

impl Transition {
    const fn new(
        from: MigrationPhase,
        to: MigrationPhase,
        event: MigrationEvent,
        description: &'static str,
    ) -> Self {
        Self {
            from,
            to,
            event,
            description,
        }
    }
}

/// Result of attempting a state transition
#[derive(Debug, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was successful
    Success {
        from: MigrationPhase,
        to: MigrationPhase,
        event: MigrationEvent,
        description: &'static str,
    },
    /// Transition was not valid for current phase
    InvalidTransition {
        current: MigrationPhase,
        event: MigrationEvent,
    },
}

/// Formal state machine for a migration run
pub struct MigrationStateMachine {
    transitions: Vec<Transition>,
}

impl Default for MigrationStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationStateMachine {
    /// Create a new state machine with the defined transition table
    pub fn new() -> Self {
        Self {
            transitions: vec![
                Transition::new(
                    MigrationPhase::Init,
                    MigrationPhase::LegacyInstalled,
                    MigrationEvent::LegacyInstallSucceeded,
                    "Legacy resources installed",
                ),
                Transition::new(
                    MigrationPhase::LegacyInstalled,
                    MigrationPhase::LegacyVerified,
                    MigrationEvent::LegacyVerificationPassed,
                    "Legacy resources present, managed resources absent",
                ),
                Transition::new(
                    MigrationPhase::LegacyVerified,
                    MigrationPhase::ManagedInstalling,
                    MigrationEvent::ManagedInstallStarted,
                    "Managed chart installed, waiting for deployed status",
                ),
                Transition::new(
                    MigrationPhase::ManagedInstalling,
                    MigrationPhase::ManagedDeployed,
                    MigrationEvent::ManagedReleaseDeployed,
                    "Managed release deployed",
                ),
                Transition::new(
                    MigrationPhase::ManagedDeployed,
                    MigrationPhase::ManagedVerified,
                    MigrationEvent::ManagedVerificationPassed,
                    "Managed resources present, legacy resources absent",
                ),
                Transition::new(
                    MigrationPhase::ManagedVerified,
                    MigrationPhase::ServiceAvailable,
                    MigrationEvent::ServiceProbeSucceeded,
                    "Service API reachable after migration",
                ),
                Transition::new(
                    MigrationPhase::ServiceAvailable,
                    MigrationPhase::TornDown,
                    MigrationEvent::ReleaseDeleted,
                    "Managed release deleted",
                ),
                // TornDown is terminal
            ],
        }
    }

    /// Transition table for `mode`.
    ///
    /// A metrics run installs only the managed chart and goes straight from
    /// `ManagedDeployed` to the availability probe.
    pub fn for_mode(mode: RunMode) -> Self {
        match mode {
            RunMode::Migration => Self::new(),
            RunMode::Metrics => Self {
                transitions: vec![
                    Transition::new(
                        MigrationPhase::Init,
                        MigrationPhase::ManagedInstalling,
                        MigrationEvent::ManagedInstallStarted,
                        "Managed chart installed, waiting for deployed status",
                    ),
                    Transition::new(
                        MigrationPhase::ManagedInstalling,
                        MigrationPhase::ManagedDeployed,
                        MigrationEvent::ManagedReleaseDeployed,
                        "Managed release deployed",
                    ),
                    Transition::new(
                        MigrationPhase::ManagedDeployed,
                        MigrationPhase::ServiceAvailable,
                        MigrationEvent::ServiceProbeSucceeded,
                        "Service API reachable",
                    ),
                    Transition::new(
                        MigrationPhase::ServiceAvailable,
                        MigrationPhase::TornDown,
                        MigrationEvent::ReleaseDeleted,
                        "Managed release deleted",
                    ),
                ],
            },
        }
    }

    /// Attempt to transition to a new phase based on an event
    pub fn transition(&self, current: &MigrationPhase, event: MigrationEvent) -> TransitionResult {
        match self
            .transitions
            .iter()
            .find(|t| t.from == *current && t.event == event)
        {
            Some(t) => TransitionResult::Success {
                from: t.from,
                to: t.to,
                event,
                description: t.description,
            },
            None => TransitionResult::InvalidTransition {
                current: *current,
                event,
            },
        }
    }

    /// Check if a transition is valid
    pub fn can_transition(&self, from: &MigrationPhase, event: &MigrationEvent) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == *from && t.event == *event)
    }

    /// Get all valid events for a given phase
    pub fn valid_events(&self, phase: &MigrationPhase) -> Vec<&MigrationEvent> {
        self.transitions
            .iter()
            .filter(|t| t.from == *phase)
            .map(|t| &t.event)
            .collect()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}
