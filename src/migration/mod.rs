//! Migration orchestration.
//!
//! - [`MigrationPhase`]: where a run is, [`RunMode`]: which steps it takes
//! - [`state_machine`]: which phase may follow which
//! - [`MigrationOrchestrator`]: runs the steps against a [`MigrationContext`]
//! - [`MigrationReport`]: what a run produced

mod context;
mod orchestrator;
mod phase;
mod report;
pub mod state_machine;

pub use context::MigrationContext;
pub use orchestrator::{MigrationError, MigrationOrchestrator, MigrationStep};
pub use phase::{MigrationPhase, RunMode};
pub use report::{MigrationReport, PhaseRecord};
pub use state_machine::{MigrationEvent, MigrationStateMachine, TransitionResult};
