//! chart-migration-verifier - checks a legacy-to-managed add-on migration
//! against a live cluster.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Builds the migration plan from defaults, a plan file and CLI overrides
//! - Creates the Kubernetes client and helm wrapper
//! - Runs the migration (or the metrics-only check), cancelling it on SIGTERM or SIGINT
//! - Emits a JSON report and exits non-zero if the migration was not verified

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use chart_migration_verifier::release::HelmCli;
use chart_migration_verifier::{
    Error, MigrationContext, MigrationOrchestrator, MigrationPlan, MigrationReport, RunMode,
    duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Legacy fixture, then the managed chart replacing it
    Migration,
    /// Managed chart alone, then the availability probe
    Metrics,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Migration => RunMode::Migration,
            Mode::Metrics => RunMode::Metrics,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "chart-migration-verifier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify a live legacy-to-managed add-on migration", long_about = None)]
struct Cli {
    /// JSON migration plan; defaults to the built-in metrics-server plan
    #[arg(long, env = "MIGRATION_PLAN")]
    plan: Option<PathBuf>,

    /// Steps to run; overrides the plan's mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Chart version or channel of the managed chart (falls back to CIRCLE_SHA1)
    #[arg(long, env = "CHART_CHANNEL")]
    channel: Option<String>,

    /// Namespace for both variants
    #[arg(long)]
    namespace: Option<String>,

    /// Chart reference for the legacy fixture resources
    #[arg(long)]
    legacy_chart: Option<String>,

    /// Chart reference for the managed release
    #[arg(long)]
    managed_chart: Option<String>,

    /// Interval between availability probes, e.g. "5s"
    #[arg(long, value_parser = duration::parse)]
    poll_interval: Option<Duration>,

    /// Total time allowed for the service to become available, e.g. "2m"
    #[arg(long, value_parser = duration::parse)]
    poll_deadline: Option<Duration>,

    /// Time allowed for the managed release to report deployed
    #[arg(long, value_parser = duration::parse)]
    status_timeout: Option<Duration>,

    /// Kubeconfig context for the API client and helm
    #[arg(long, env = "KUBE_CONTEXT")]
    kube_context: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    /// Resolve the plan: file or defaults, then command-line overrides.
    fn build_plan(&self) -> Result<MigrationPlan, Error> {
        let mut plan = match &self.plan {
            Some(path) => MigrationPlan::from_file(path)?,
            None => {
                let channel = self
                    .channel
                    .clone()
                    .or_else(|| std::env::var("CIRCLE_SHA1").ok())
                    .ok_or_else(|| {
                        Error::Config(
                            "a chart channel is required (--channel, CHART_CHANNEL or CIRCLE_SHA1)"
                                .to_string(),
                        )
                    })?;
                MigrationPlan::metrics_server(&channel)?
            }
        };

        if let Some(mode) = self.mode {
            plan.mode = mode.into();
        }
        if self.plan.is_some()
            && let Some(channel) = &self.channel
        {
            plan.managed.chart.version = Some(channel.clone());
        }
        if let Some(namespace) = &self.namespace {
            plan = plan.with_namespace(namespace);
        }
        if let Some(chart) = &self.legacy_chart {
            plan.legacy.chart.chart = chart.clone();
        }
        if let Some(chart) = &self.managed_chart {
            plan.managed.chart.chart = chart.clone();
        }
        plan.availability = plan
            .availability
            .with_overrides(self.poll_interval, self.poll_deadline)?;
        if let Some(timeout) = self.status_timeout {
            plan.status_timeout = timeout;
        }

        plan.validate()?;
        Ok(plan)
    }
}

fn init_tracing(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("chart_migration_verifier=info".parse()?)
        .add_directive("kube=warn".parse()?);

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init(),
    }
    Ok(())
}

fn write_report(report: &MigrationReport, path: Option<&PathBuf>) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(report)?;
    match path {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}

/// Client for `context`, or for whatever kubeconfig or in-cluster config is found.
async fn kube_client(context: Option<&str>) -> Result<Client, Error> {
    let config = match context {
        Some(context) => {
            let options = KubeConfigOptions {
                context: Some(context.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options).await.map_err(|e| {
                Error::Config(format!("cannot load kubeconfig context {}: {}", context, e))
            })?
        }
        None => Config::infer()
            .await
            .map_err(|e| Error::Config(format!("cannot infer kube config: {}", e)))?,
    };
    Ok(Client::try_from(config)?)
}

async fn run(cli: &Cli) -> Result<ExitCode, Error> {
    let plan = cli.build_plan()?;
    info!(
        mode = %plan.mode,
        legacy = %plan.legacy.release,
        managed = %plan.managed.release,
        version = ?plan.managed.chart.version,
        "Starting chart-migration-verifier"
    );

    let client = kube_client(cli.kube_context.as_deref()).await?;
    info!("Connected to Kubernetes cluster");

    let cancel = CancellationToken::new();
    let helm = HelmCli::new().with_kube_context(cli.kube_context.clone());
    let ctx = MigrationContext::from_client(client, helm, &plan.probe_path)
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, cancelling migration run");
        cancel.cancel();
    });

    let mut orchestrator = MigrationOrchestrator::new(plan, ctx);
    let (report, code) = match orchestrator.run().await {
        Ok(report) => {
            if let Some(teardown_error) = &report.teardown_error {
                warn!(error = %teardown_error, "Migration verified, but teardown failed");
            }
            (report, ExitCode::SUCCESS)
        }
        Err(e) if e.is_cancelled() => {
            warn!(phase = %e.phase, step = %e.step, "Migration run cancelled");
            (orchestrator.report(), ExitCode::FAILURE)
        }
        Err(e) => {
            error!(
                phase = %e.phase,
                step = %e.step,
                correctness = e.is_correctness_failure(),
                "Migration failed: {}",
                e
            );
            (orchestrator.report(), ExitCode::FAILURE)
        }
    };

    write_report(&report, cli.report.as_ref())?;
    info!(final_phase = %report.final_phase, success = report.is_success(), "Migration run finished");
    Ok(code)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;
    Ok(run(&cli).await?)
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the run cannot be
/// cancelled cleanly without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
