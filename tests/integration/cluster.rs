//! Connection to the cluster the ignored tests run against.
//!
//! Uses `KUBE_CONTEXT` when set, the same variable the CLI reads, so helm
//! and the API client always talk to the same cluster.

use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tokio::sync::OnceCell;

use chart_migration_verifier::MigrationContext;
use chart_migration_verifier::release::HelmCli;

/// Server version, fetched once to fail fast when no cluster is reachable.
static SERVER_VERSION: OnceCell<String> = OnceCell::const_new();

fn kube_context() -> Option<String> {
    std::env::var("KUBE_CONTEXT").ok()
}

/// Client for the test cluster. Panics with a hint if it cannot be reached.
pub async fn test_client() -> Client {
    let config = match kube_context() {
        Some(context) => Config::from_kubeconfig(&KubeConfigOptions {
            context: Some(context.clone()),
            ..Default::default()
        })
        .await
        .unwrap_or_else(|e| panic!("kubeconfig context {} unusable: {}", context, e)),
        None => Config::infer()
            .await
            .expect("No kube config found. Is your kubeconfig configured?"),
    };
    let client = Client::try_from(config).expect("Failed to create kube client");

    let version = SERVER_VERSION
        .get_or_init(|| async {
            client
                .apiserver_version()
                .await
                .map(|v| v.git_version)
                .unwrap_or_else(|e| panic!("Kubernetes cluster unreachable: {}", e))
        })
        .await;
    tracing::debug!(version = %version, "Using test cluster");

    client
}

/// Production wiring against the test cluster, with helm on the same context.
pub async fn migration_context(probe_path: &str) -> MigrationContext {
    let client = test_client().await;
    let helm = HelmCli::new().with_kube_context(kube_context());
    MigrationContext::from_client(client, helm, probe_path)
}

/// Route crate logs to the test writer; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("chart_migration_verifier=debug,kube=warn")
        .try_init();
}
