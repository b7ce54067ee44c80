//! `ReleaseManager` that shells out to the `helm` binary.

use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::release::{ChartRef, Release, ReleaseManager};

/// Default interval between `helm status` calls while waiting.
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Helm 3 CLI wrapper.
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: String,
    kube_context: Option<String>,
    status_poll_interval: Duration,
}

impl Default for HelmCli {
    fn default() -> Self {
        Self::new()
    }
}

impl HelmCli {
    pub fn new() -> Self {
        Self {
            binary: "helm".to_string(),
            kube_context: None,
            status_poll_interval: STATUS_POLL_INTERVAL,
        }
    }

    /// Use a specific helm executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Target a kubeconfig context other than the current one.
    pub fn with_kube_context(mut self, context: Option<String>) -> Self {
        self.kube_context = context;
        self
    }

    pub fn with_status_poll_interval(mut self, interval: Duration) -> Self {
        self.status_poll_interval = interval;
        self
    }

    fn global_args(&self) -> Vec<String> {
        match &self.kube_context {
            Some(ctx) => vec!["--kube-context".to_string(), ctx.clone()],
            None => Vec::new(),
        }
    }

    /// Run helm with `args`, feeding `stdin` when given.
    async fn run(&self, args: &[String], stdin: Option<&str>) -> std::io::Result<Output> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(self.global_args())
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        debug!(binary = %self.binary, args = ?args, "Running helm");
        let mut child = cmd.spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            // Close stdin so helm sees EOF.
            drop(pipe);
        }

        child.wait_with_output().await
    }

    async fn status(&self, release: &Release) -> std::result::Result<String, String> {
        let output = self
            .run(&status_args(release), None)
            .await
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }
        parse_release_status(&output.stdout)
            .ok_or_else(|| "helm status output has no info.status".to_string())
    }
}

pub(crate) fn install_args(release: &Release, chart: &ChartRef) -> Vec<String> {
    let mut args = vec![
        "install".to_string(),
        release.name.clone(),
        chart.chart.clone(),
        "--namespace".to_string(),
        release.namespace.clone(),
    ];
    if let Some(version) = &chart.version {
        args.push("--version".to_string());
        args.push(version.clone());
    }
    if chart.values.is_some() {
        args.push("--values".to_string());
        args.push("-".to_string());
    }
    if chart.wait {
        args.push("--wait".to_string());
    }
    args
}

pub(crate) fn status_args(release: &Release) -> Vec<String> {
    vec![
        "status".to_string(),
        release.name.clone(),
        "--namespace".to_string(),
        release.namespace.clone(),
        "--output".to_string(),
        "json".to_string(),
    ]
}

pub(crate) fn uninstall_args(release: &Release, purge: bool) -> Vec<String> {
    let mut args = vec![
        "uninstall".to_string(),
        release.name.clone(),
        "--namespace".to_string(),
        release.namespace.clone(),
    ];
    if !purge {
        args.push("--keep-history".to_string());
    }
    args
}

/// Extract `info.status` from `helm status --output json`.
pub(crate) fn parse_release_status(stdout: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    value
        .get("info")?
        .get("status")?
        .as_str()
        .map(str::to_string)
}

fn is_release_not_found(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains("not found")
}

#[async_trait]
impl ReleaseManager for HelmCli {
    async fn install(&self, release: Release, chart: ChartRef) -> Result<()> {
        info!(release = %release, chart = %chart.chart, version = ?chart.version, "Installing chart");

        let output = self
            .run(&install_args(&release, &chart), chart.values.as_deref())
            .await
            .map_err(|e| Error::InstallFailure {
                release: release.name.clone(),
                message: format!("failed to run {}: {}", self.binary, e),
            })?;

        if !output.status.success() {
            return Err(Error::InstallFailure {
                release: release.name,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(release = %release, "Chart installed");
        Ok(())
    }

    async fn wait_for_status(
        &self,
        release: Release,
        status: String,
        timeout: Duration,
    ) -> Result<()> {
        let wait = async {
            loop {
                match self.status(&release).await {
                    Ok(current) if current.eq_ignore_ascii_case(&status) => return Ok(()),
                    Ok(current) if current.eq_ignore_ascii_case("failed") => {
                        return Err(Error::InstallFailure {
                            release: release.name.clone(),
                            message: "release status is failed".to_string(),
                        });
                    }
                    Ok(current) => {
                        debug!(release = %release, current = %current, wanted = %status, "Waiting for release status");
                    }
                    Err(e) => {
                        debug!(release = %release, error = %e, "Release status not available yet");
                    }
                }
                tokio::time::sleep(self.status_poll_interval).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::StatusTimeout {
                release: release.name.clone(),
                status: status.clone(),
                timeout,
            })?
    }

    async fn delete_release(&self, release: Release, purge: bool) -> Result<()> {
        info!(release = %release, purge, "Deleting release");

        let output = self
            .run(&uninstall_args(&release, purge), None)
            .await
            .map_err(|e| Error::TeardownFailure {
                release: release.name.clone(),
                message: format!("failed to run {}: {}", self.binary, e),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_release_not_found(&stderr) {
            warn!(release = %release, "Release already gone");
            return Ok(());
        }

        Err(Error::TeardownFailure {
            release: release.name,
            message: stderr,
        })
    }
}
