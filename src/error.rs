//! Error types for migration verification.
//!
//! Defines one error enum with classification helpers so callers can tell
//! migration-correctness failures apart from cleanup failures.

use std::time::Duration;

use thiserror::Error;

use crate::migration::MigrationPhase;
use crate::resources::ResourceKind;

/// Error type for verification, polling and orchestration
#[derive(Error, Debug)]
pub enum Error {
    /// A chart or fixture install did not complete
    #[error("install of release {release} failed: {message}")]
    InstallFailure { release: String, message: String },

    /// A release never reached the wanted status
    #[error("release {release} did not reach status {status} within {timeout:?}")]
    StatusTimeout {
        release: String,
        status: String,
        timeout: Duration,
    },

    /// Observed object count differs from the descriptor
    #[error(
        "{variant} resources: unexpected number of {kind} objects, want {expected}, got {observed}"
    )]
    PresenceMismatch {
        variant: String,
        kind: ResourceKind,
        expected: usize,
        observed: usize,
    },

    /// An object that should exist was not found
    #[error("{variant} resources: expected {kind} {name} to exist, but it was not found")]
    UnexpectedAbsence {
        variant: String,
        kind: ResourceKind,
        name: String,
    },

    /// Objects were found where none should exist
    #[error("{variant} resources: expected no {kind} objects, found {observed}")]
    UnexpectedPresence {
        variant: String,
        kind: ResourceKind,
        observed: usize,
    },

    /// A cluster query failed for a reason other than "not found"
    #[error("query for {kind} failed: {message}")]
    QueryFailure { kind: ResourceKind, message: String },

    /// The availability deadline elapsed without a successful probe
    #[error("timed out after {deadline:?} and {attempts} attempts, last error: {last_error}")]
    PollTimeout {
        deadline: Duration,
        attempts: u32,
        last_error: String,
    },

    /// The probe reported a condition that retrying cannot fix
    #[error("probe failed permanently: {0}")]
    ProbeFatal(String),

    /// The run was cancelled externally
    #[error("operation cancelled")]
    Cancelled,

    /// Release deletion failed after the migration was verified
    #[error("teardown of release {release} failed: {message}")]
    TeardownFailure { release: String, message: String },

    /// Poll policy violates its interval ordering
    #[error("invalid poll policy: {0}")]
    InvalidPolicy(String),

    /// Descriptor is malformed
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// An orchestrator step was invoked out of order
    #[error("cannot {step} from phase {current}")]
    InvalidTransition {
        current: MigrationPhase,
        step: String,
    },

    /// Invalid configuration or migration plan
    #[error("configuration error: {0}")]
    Config(String),

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, usually from spawning helm
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error means the observed cluster state contradicts the expected one
    pub fn is_correctness_failure(&self) -> bool {
        matches!(
            self,
            Error::PresenceMismatch { .. }
                | Error::UnexpectedAbsence { .. }
                | Error::UnexpectedPresence { .. }
        )
    }

    /// Check if this error only concerns cleanup after a verified migration
    pub fn is_cleanup_failure(&self) -> bool {
        matches!(self, Error::TeardownFailure { .. })
    }
}

/// Result type alias for verifier operations
pub type Result<T> = std::result::Result<T, Error>;
