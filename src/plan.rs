//! Migration plan: what to install, what to expect, how long to wait.
//!
//! A plan is loaded from JSON (`--plan`) or built from the metrics-server
//! defaults, then adjusted by CLI overrides and validated before a run.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::availability::{METRICS_API_PATH, PollPolicy};
use crate::error::{Error, Result};
use crate::migration::RunMode;
use crate::release::{ChartRef, Release};
use crate::resources::{ResourceKind, ResourceSetDescriptor};

/// Namespace metrics-server runs in.
pub const METRICS_SERVER_NAMESPACE: &str = "kube-system";

/// Release name of the managed chart.
pub const METRICS_SERVER_RELEASE: &str = "kubernetes-metrics-server";

/// Label selector that only matches objects of the managed variant.
pub const MANAGED_LABEL_SELECTOR: &str = "app=metrics-server,giantswarm.io/service-type=managed";

/// Values for the managed metrics-server chart.
pub const METRICS_SERVER_VALUES: &str = r#"---
name: metrics-server
namespace: kube-system
serviceType: managed
k8sAppLabel: metrics-server
rbac:
  create: true
serviceAccount:
  create: true
  name: metrics-server
apiService:
  create: true
  insecureSkipTLSVerify: true
image:
  repository: quay.io/giantswarm/metrics-server-amd64
  tag: v0.3.0
  pullPolicy: IfNotPresent
args:
  - --logtostderr
  - --kubelet-insecure-tls
resources: {}
nodeSelector: {}
tolerations: []
"#;

/// One variant of the service: how it is installed and how it is recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPlan {
    pub release: Release,
    pub chart: ChartRef,
    pub resources: ResourceSetDescriptor,
}

/// Full description of a migration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    /// Full migration, or the managed chart alone.
    #[serde(default)]
    pub mode: RunMode,
    pub legacy: VariantPlan,
    pub managed: VariantPlan,
    /// How long the managed release may take to report `deployed`.
    #[serde(with = "crate::duration")]
    pub status_timeout: Duration,
    /// Retry policy for the availability probe.
    pub availability: PollPolicy,
    /// When set, presence and absence checks are retried under this policy
    /// instead of being evaluated once.
    #[serde(default)]
    pub convergence: Option<PollPolicy>,
    /// API path probed once the managed variant is verified.
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    /// Delete the legacy fixture release when the run ends.
    #[serde(default = "default_true")]
    pub cleanup_legacy_release: bool,
}

fn default_probe_path() -> String {
    METRICS_API_PATH.to_string()
}

fn default_true() -> bool {
    true
}

impl MigrationPlan {
    /// Plan for migrating metrics-server from the fixture chart to the
    /// managed chart published on `channel`.
    pub fn metrics_server(channel: &str) -> Result<Self> {
        let legacy_resources = ResourceSetDescriptor::builder("legacy")
            .namespace(METRICS_SERVER_NAMESPACE)
            .named(
                ResourceKind::ClusterRoleBinding,
                "metrics-server:system:auth-delegator",
            )
            .named(ResourceKind::RoleBinding, "metrics-server-auth-reader")
            .named(ResourceKind::ServiceAccount, METRICS_SERVER_RELEASE)
            .named(ResourceKind::Deployment, METRICS_SERVER_RELEASE)
            .named(ResourceKind::Service, METRICS_SERVER_RELEASE)
            .named(ResourceKind::ClusterRole, "system:metrics-server")
            .named(ResourceKind::ClusterRoleBinding, "system:metrics-server")
            .build()?;

        let managed_resources = ResourceSetDescriptor::builder("managed")
            .label_selector(MANAGED_LABEL_SELECTOR)
            .namespace(METRICS_SERVER_NAMESPACE)
            .expect(ResourceKind::ClusterRoleBinding, 2)
            .expect(ResourceKind::RoleBinding, 1)
            .expect(ResourceKind::ApiService, 1)
            .expect(ResourceKind::ServiceAccount, 1)
            .expect(ResourceKind::Deployment, 1)
            .expect(ResourceKind::Service, 1)
            .expect(ResourceKind::ClusterRole, 1)
            .build()?;

        let plan = Self {
            mode: RunMode::Migration,
            legacy: VariantPlan {
                release: Release::new("resources", METRICS_SERVER_NAMESPACE),
                chart: ChartRef::new("/e2e/fixtures/resources-chart"),
                resources: legacy_resources,
            },
            managed: VariantPlan {
                release: Release::new(METRICS_SERVER_RELEASE, METRICS_SERVER_NAMESPACE),
                chart: ChartRef::new("oci://quay.io/giantswarm/kubernetes-metrics-server-chart")
                    .version(channel)
                    .values(METRICS_SERVER_VALUES)
                    .wait(true),
                resources: managed_resources,
            },
            status_timeout: Duration::from_secs(120),
            availability: PollPolicy::constant(Duration::from_secs(5), Duration::from_secs(120))?,
            convergence: None,
            probe_path: default_probe_path(),
            cleanup_legacy_release: true,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Move both variants, their releases and their namespaced objects, to `namespace`.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        for variant in [&mut self.legacy, &mut self.managed] {
            variant.release.namespace = namespace.to_string();
            variant.resources = variant.resources.with_namespace(namespace);
        }
        self
    }

    /// Load a plan from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read plan {}: {}", path.display(), e)))?;
        let plan: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse plan {}: {}", path.display(), e)))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Check the plan is internally consistent.
    pub fn validate(&self) -> Result<()> {
        self.legacy
            .resources
            .validate()
            .map_err(|e| Error::Config(format!("legacy resources: {}", e)))?;
        self.managed
            .resources
            .validate()
            .map_err(|e| Error::Config(format!("managed resources: {}", e)))?;
        self.availability
            .validate()
            .map_err(|e| Error::Config(format!("availability policy: {}", e)))?;
        if let Some(policy) = &self.convergence {
            policy
                .validate()
                .map_err(|e| Error::Config(format!("convergence policy: {}", e)))?;
        }
        if self.legacy.release == self.managed.release {
            return Err(Error::Config(format!(
                "legacy and managed variants share release {}",
                self.managed.release
            )));
        }
        if self.status_timeout.is_zero() {
            return Err(Error::Config("status timeout must be greater than zero".to_string()));
        }
        if !self.probe_path.starts_with('/') {
            return Err(Error::Config(format!(
                "probe path {:?} must be absolute",
                self.probe_path
            )));
        }
        Ok(())
    }
}
