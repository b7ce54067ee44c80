//! Chart release lifecycle interface.
//!
//! The orchestrator installs, watches and deletes releases only through
//! [`ReleaseManager`]; [`HelmCli`] is the production implementation.

mod helm;

pub use helm::HelmCli;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::error::Result;

/// Release status reported once a chart is fully installed.
pub const STATUS_DEPLOYED: &str = "deployed";

/// A named release in a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub namespace: String,
}

impl Release {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Chart to install and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRef {
    /// Chart path, repo reference or OCI reference.
    pub chart: String,
    /// Chart version or release channel.
    #[serde(default)]
    pub version: Option<String>,
    /// Inline values YAML.
    #[serde(default)]
    pub values: Option<String>,
    /// Block until the release's resources are ready.
    #[serde(default)]
    pub wait: bool,
}

impl ChartRef {
    pub fn new(chart: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            version: None,
            values: None,
            wait: false,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn values(mut self, values: impl Into<String>) -> Self {
        self.values = Some(values.into());
        self
    }

    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }
}

/// Trait abstracting chart release operations
///
/// Implementations report failures as `InstallFailure`, `StatusTimeout` and
/// `TeardownFailure` respectively.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReleaseManager: Send + Sync {
    /// Install `chart` as `release`.
    async fn install(&self, release: Release, chart: ChartRef) -> Result<()>;

    /// Wait until `release` reports `status`, or `timeout` elapses.
    async fn wait_for_status(&self, release: Release, status: String, timeout: Duration)
    -> Result<()>;

    /// Delete `release`; `purge` also removes its history.
    ///
    /// Deleting a release that does not exist succeeds.
    async fn delete_release(&self, release: Release, purge: bool) -> Result<()>;
}
