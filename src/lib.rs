//! chart-migration-verifier library crate
//!
//! Verifies that a cluster add-on can move from an unmanaged ("legacy")
//! deployment to a chart-managed one without leaving both variants, or
//! neither, in the cluster, and without losing its API along the way.
//!
//! This module exports the verifier, the availability poller, and the
//! migration orchestrator.

pub mod availability;
pub mod cluster;
pub mod duration;
pub mod error;
pub mod migration;
pub mod plan;
pub mod release;
pub mod resources;

pub use availability::{AvailabilityPoller, PollPolicy, PollStats};
pub use error::{Error, Result};
pub use migration::{
    MigrationContext, MigrationError, MigrationOrchestrator, MigrationPhase, MigrationReport,
    RunMode,
};
pub use plan::MigrationPlan;
pub use resources::{ResourceKind, ResourceSetDescriptor, ResourceSetVerifier};
