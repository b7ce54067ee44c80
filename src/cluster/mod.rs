//! Read-only cluster query interface.
//!
//! The verifier only sees this trait, so "not found" arrives as a tagged
//! variant instead of a transport-specific error shape.

mod kube_query;

pub use kube_query::KubeClusterQuery;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::resources::ResourceKind;

/// Identity of an object returned by a cluster query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub name: String,
    pub namespace: Option<String>,
}

impl ObjectRef {
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }
}

/// Failure of a single cluster query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The object, kind or namespace does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport, authorization or server failure.
    #[error("{0}")]
    Other(String),
}

impl QueryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NotFound(_))
    }
}

/// Trait abstracting read access to the cluster
///
/// This trait allows verifying resource sets against an in-memory cluster in
/// tests while using the real API server in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// List objects of `kind` matching `label_selector`.
    ///
    /// `namespace` is `None` for cluster-scoped kinds.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<String>,
        label_selector: String,
    ) -> Result<Vec<ObjectRef>, QueryError>;

    /// Fetch a single object by name.
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<String>,
        name: String,
    ) -> Result<ObjectRef, QueryError>;
}
