//! `ClusterQuery` backed by the Kubernetes API server.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::cluster::{ClusterQuery, ObjectRef, QueryError};
use crate::resources::ResourceKind;

/// Real cluster query using untyped `DynamicObject` APIs, one per kind.
#[derive(Clone)]
pub struct KubeClusterQuery {
    client: Client,
}

impl KubeClusterQuery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a namespaced or cluster-wide API based on the kind's scope
    fn api_for(&self, kind: ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        match namespace {
            Some(ns) if !kind.is_cluster_scoped() => {
                Api::namespaced_with(self.client.clone(), ns, &ar)
            }
            _ => Api::all_with(self.client.clone(), &ar),
        }
    }
}

/// Map a kube error onto the tagged query error.
pub(crate) fn classify(err: kube::Error, what: &str) -> QueryError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => {
            QueryError::NotFound(format!("{}: {}", what, ae.message))
        }
        other => QueryError::Other(format!("{}: {}", what, other)),
    }
}

#[async_trait]
impl ClusterQuery for KubeClusterQuery {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<String>,
        label_selector: String,
    ) -> Result<Vec<ObjectRef>, QueryError> {
        let api = self.api_for(kind, namespace.as_deref());
        let params = ListParams::default().labels(&label_selector);

        let list = api
            .list_metadata(&params)
            .await
            .map_err(|e| classify(e, &format!("list {} ({})", kind, label_selector)))?;

        debug!(
            kind = %kind,
            namespace = namespace.as_deref().unwrap_or("<cluster>"),
            selector = %label_selector,
            count = list.items.len(),
            "Listed objects"
        );

        Ok(list
            .items
            .iter()
            .map(|obj| ObjectRef {
                name: obj.name_any(),
                namespace: obj.namespace(),
            })
            .collect())
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<String>,
        name: String,
    ) -> Result<ObjectRef, QueryError> {
        let api = self.api_for(kind, namespace.as_deref());
        let obj = api
            .get_metadata(&name)
            .await
            .map_err(|e| classify(e, &format!("get {} {}", kind, name)))?;

        Ok(ObjectRef {
            name: obj.name_any(),
            namespace: obj.namespace(),
        })
    }
}
