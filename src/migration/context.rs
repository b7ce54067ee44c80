//! Shared context for a migration run.
//!
//! The MigrationContext holds every collaborator the orchestrator talks to,
//! so nothing in the crate reaches for a process-wide client.

use std::sync::Arc;

use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::availability::{ApiPathProbe, AvailabilityProbe, Clock, TokioClock};
use crate::cluster::{ClusterQuery, KubeClusterQuery};
use crate::release::{HelmCli, ReleaseManager};

/// Collaborators of one migration run
#[derive(Clone)]
pub struct MigrationContext {
    /// Read-only cluster access for the verifier
    pub cluster: Arc<dyn ClusterQuery>,
    /// Chart install, status and delete operations
    pub releases: Arc<dyn ReleaseManager>,
    /// Probe polled after the managed variant is verified
    pub probe: Arc<dyn AvailabilityProbe>,
    /// Time source for polling
    pub clock: Arc<dyn Clock>,
    /// Cancels polling when the process is asked to stop
    pub cancel: CancellationToken,
}

impl MigrationContext {
    /// Create a context on the tokio clock with a fresh cancellation token
    pub fn new(
        cluster: Arc<dyn ClusterQuery>,
        releases: Arc<dyn ReleaseManager>,
        probe: Arc<dyn AvailabilityProbe>,
    ) -> Self {
        Self {
            cluster,
            releases,
            probe,
            clock: Arc::new(TokioClock),
            cancel: CancellationToken::new(),
        }
    }

    /// Production wiring: kube client for queries and probes, helm for releases.
    pub fn from_client(client: Client, helm: HelmCli, probe_path: &str) -> Self {
        Self::new(
            Arc::new(KubeClusterQuery::new(client.clone())),
            Arc::new(helm),
            Arc::new(ApiPathProbe::new(client, probe_path)),
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
