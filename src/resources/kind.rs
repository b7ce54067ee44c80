//! Kinds of cluster objects tracked by a resource-set descriptor.

use std::fmt;

use kube::discovery::ApiResource;
use serde::{Deserialize, Serialize};

/// A category of cluster object that makes up one variant of a deployed service.
///
/// Declaration order is the order in which a descriptor's kinds are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ClusterRoleBinding,
    RoleBinding,
    #[serde(rename = "APIService")]
    ApiService,
    ServiceAccount,
    Deployment,
    Service,
    ClusterRole,
}

impl ResourceKind {
    /// Every tracked kind, in check order.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::ClusterRoleBinding,
        ResourceKind::RoleBinding,
        ResourceKind::ApiService,
        ResourceKind::ServiceAccount,
        ResourceKind::Deployment,
        ResourceKind::Service,
        ResourceKind::ClusterRole,
    ];

    /// Whether objects of this kind live outside any namespace.
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(
            self,
            ResourceKind::ClusterRoleBinding | ResourceKind::ApiService | ResourceKind::ClusterRole
        )
    }

    /// Kubernetes kind name as it appears in manifests.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceKind::ClusterRoleBinding => "ClusterRoleBinding",
            ResourceKind::RoleBinding => "RoleBinding",
            ResourceKind::ApiService => "APIService",
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::ClusterRole => "ClusterRole",
        }
    }

    /// API group, empty for the core group.
    pub fn group(&self) -> &'static str {
        match self {
            ResourceKind::ClusterRoleBinding
            | ResourceKind::RoleBinding
            | ResourceKind::ClusterRole => "rbac.authorization.k8s.io",
            ResourceKind::ApiService => "apiregistration.k8s.io",
            ResourceKind::Deployment => "apps",
            ResourceKind::ServiceAccount | ResourceKind::Service => "",
        }
    }

    /// Served API version queried for this kind.
    pub fn version(&self) -> &'static str {
        "v1"
    }

    /// Lower-case plural used in REST paths.
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::ClusterRoleBinding => "clusterrolebindings",
            ResourceKind::RoleBinding => "rolebindings",
            ResourceKind::ApiService => "apiservices",
            ResourceKind::ServiceAccount => "serviceaccounts",
            ResourceKind::Deployment => "deployments",
            ResourceKind::Service => "services",
            ResourceKind::ClusterRole => "clusterroles",
        }
    }

    /// Dynamic API descriptor used to build an untyped `Api` for this kind.
    pub fn api_resource(&self) -> ApiResource {
        let group = self.group();
        let version = self.version();
        let api_version = if group.is_empty() {
            version.to_string()
        } else {
            format!("{}/{}", group, version)
        };
        ApiResource {
            group: group.to_string(),
            version: version.to_string(),
            api_version,
            kind: self.kind_name().to_string(),
            plural: self.plural().to_string(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}
