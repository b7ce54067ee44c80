//! Ordered phases of one migration run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of a migration run. Phases only ever move forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum MigrationPhase {
    /// Nothing installed yet.
    #[default]
    Init,
    /// Legacy fixture resources were installed.
    LegacyInstalled,
    /// Legacy variant present, managed variant absent.
    LegacyVerified,
    /// Managed chart install returned; waiting for the release to deploy.
    ManagedInstalling,
    /// Managed release reported `deployed`.
    ManagedDeployed,
    /// Managed variant present, legacy variant absent.
    ManagedVerified,
    /// The service API answered through the probe.
    ServiceAvailable,
    /// Managed release deleted.
    TornDown,
}

impl MigrationPhase {
    /// Every phase, in order.
    pub const ALL: [MigrationPhase; 8] = [
        MigrationPhase::Init,
        MigrationPhase::LegacyInstalled,
        MigrationPhase::LegacyVerified,
        MigrationPhase::ManagedInstalling,
        MigrationPhase::ManagedDeployed,
        MigrationPhase::ManagedVerified,
        MigrationPhase::ServiceAvailable,
        MigrationPhase::TornDown,
    ];

    /// Whether reaching this phase proves the migration correct.
    pub fn is_migration_verified(&self) -> bool {
        *self >= MigrationPhase::ServiceAvailable
    }

    pub fn is_terminal(&self) -> bool {
        *self == MigrationPhase::TornDown
    }
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationPhase::Init => write!(f, "Init"),
            MigrationPhase::LegacyInstalled => write!(f, "LegacyInstalled"),
            MigrationPhase::LegacyVerified => write!(f, "LegacyVerified"),
            MigrationPhase::ManagedInstalling => write!(f, "ManagedInstalling"),
            MigrationPhase::ManagedDeployed => write!(f, "ManagedDeployed"),
            MigrationPhase::ManagedVerified => write!(f, "ManagedVerified"),
            MigrationPhase::ServiceAvailable => write!(f, "ServiceAvailable"),
            MigrationPhase::TornDown => write!(f, "TornDown"),
        }
    }
}

/// Which steps a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunMode {
    /// Legacy fixture first, then the managed chart replacing it.
    #[default]
    Migration,
    /// Managed chart alone, checked only for a reachable API.
    Metrics,
}

impl RunMode {
    /// Phases a successful run passes through, in order.
    pub fn phases(&self) -> &'static [MigrationPhase] {
        match self {
            RunMode::Migration => &MigrationPhase::ALL,
            RunMode::Metrics => &[
                MigrationPhase::Init,
                MigrationPhase::ManagedInstalling,
                MigrationPhase::ManagedDeployed,
                MigrationPhase::ServiceAvailable,
                MigrationPhase::TornDown,
            ],
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Migration => write!(f, "migration"),
            RunMode::Metrics => write!(f, "metrics"),
        }
    }
}
