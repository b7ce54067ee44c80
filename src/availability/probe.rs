//! Availability probes for the migrated service.

use async_trait::async_trait;
use kube::Client;
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Aggregated API served by metrics-server.
pub const METRICS_API_PATH: &str = "/apis/metrics.k8s.io/v1beta1";

/// Failure of a single probe attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// Worth retrying; the service may still be starting.
    #[error("{0}")]
    Transient(String),

    /// Retrying cannot help.
    #[error("{0}")]
    Fatal(String),
}

/// Zero-argument health check of the service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    async fn probe(&self) -> Result<(), ProbeError>;
}

/// Probe that GETs an API path through the Kubernetes API server.
///
/// Succeeds when the server answers 2xx, which for an aggregated API means
/// the backing service is registered and serving.
#[derive(Clone)]
pub struct ApiPathProbe {
    client: Client,
    path: String,
}

impl ApiPathProbe {
    pub fn new(client: Client, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }

    pub fn metrics_api(client: Client) -> Self {
        Self::new(client, METRICS_API_PATH)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Classify a kube error from a probe request.
///
/// Authentication and authorization failures will not heal by waiting.
pub(crate) fn classify_probe_error(err: kube::Error) -> ProbeError {
    match err {
        kube::Error::Api(ae) if ae.code == 401 || ae.code == 403 => {
            ProbeError::Fatal(format!("{} ({})", ae.message, ae.code))
        }
        other => ProbeError::Transient(other.to_string()),
    }
}

#[async_trait]
impl AvailabilityProbe for ApiPathProbe {
    async fn probe(&self) -> Result<(), ProbeError> {
        let request = http::Request::get(self.path.as_str())
            .body(Vec::new())
            .map_err(|e| ProbeError::Fatal(format!("invalid probe path {}: {}", self.path, e)))?;

        let body = self
            .client
            .request_text(request)
            .await
            .map_err(classify_probe_error)?;

        debug!(path = %self.path, bytes = body.len(), "Probe succeeded");
        Ok(())
    }
}
