//! Verifier and probe tests against a real API server.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use chart_migration_verifier::availability::{
    ApiPathProbe, AvailabilityPoller, AvailabilityProbe, ProbeError, TokioClock,
};
use chart_migration_verifier::cluster::{ClusterQuery, KubeClusterQuery};
use chart_migration_verifier::{
    Error, PollPolicy, ResourceKind, ResourceSetDescriptor, ResourceSetVerifier,
};

use crate::{TestNamespace, init_tracing, test_client};

const SELECTOR: &str = "app=verifier-it,giantswarm.io/service-type=managed";

fn descriptor(namespace: &str) -> ResourceSetDescriptor {
    ResourceSetDescriptor::builder("managed")
        .label_selector(SELECTOR)
        .namespace(namespace)
        .expect(ResourceKind::ServiceAccount, 1)
        .expect(ResourceKind::Service, 2)
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_counts_follow_label_selector() {
    init_tracing();
    let client = test_client().await;
    let ns = TestNamespace::create(client.clone(), "verifier-counts").await;
    let verifier = ResourceSetVerifier::new(Arc::new(KubeClusterQuery::new(client)));
    let d = descriptor(ns.name());

    verifier.check_absent(&d).await.unwrap();

    ns.create_service_account("metrics-server", SELECTOR).await;
    ns.create_service("metrics-server", SELECTOR).await;
    // Same kind, different labels: must not be counted.
    ns.create_service("metrics-server-legacy", "app=verifier-it").await;

    let err = verifier.check_present(&d).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PresenceMismatch {
            kind: ResourceKind::Service,
            expected: 2,
            observed: 1,
            ..
        }
    ));

    ns.create_service("metrics-server-2", SELECTOR).await;
    verifier.check_present(&d).await.unwrap();

    let err = verifier.check_absent(&d).await.unwrap_err();
    assert!(matches!(
        err,
        Error::UnexpectedPresence {
            kind: ResourceKind::ServiceAccount,
            observed: 1,
            ..
        }
    ));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_named_lookup_distinguishes_not_found() {
    init_tracing();
    let client = test_client().await;
    let ns = TestNamespace::create(client.clone(), "verifier-named").await;
    let query = KubeClusterQuery::new(client);

    let err = query
        .get(
            ResourceKind::Service,
            Some(ns.name().to_string()),
            "does-not-exist".to_string(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    ns.create_service("present", "app=verifier-it").await;
    let found = query
        .get(
            ResourceKind::Service,
            Some(ns.name().to_string()),
            "present".to_string(),
        )
        .await
        .unwrap();
    assert_eq!(found.name, "present");

    ns.delete_service("present").await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_cluster_scoped_kinds_list_without_namespace() {
    init_tracing();
    let client = test_client().await;
    let query = KubeClusterQuery::new(client);

    let items = query
        .list(
            ResourceKind::ClusterRole,
            None,
            "app=verifier-it-nothing-matches".to_string(),
        )
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_core_api_path_is_available() {
    init_tracing();
    let client = test_client().await;
    let probe = ApiPathProbe::new(client, "/api/v1");
    let poller = AvailabilityPoller::new(Arc::new(TokioClock), CancellationToken::new());
    let policy = PollPolicy::constant(Duration::from_secs(1), Duration::from_secs(10)).unwrap();

    let stats = poller.wait_until_available(&probe, &policy).await.unwrap();
    assert!(stats.attempts >= 1);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires Kubernetes cluster"]
async fn test_unknown_api_path_is_transient() {
    init_tracing();
    let client = test_client().await;
    let probe = ApiPathProbe::new(client, "/apis/does-not-exist.example.com/v1");

    let err = probe.probe().await.unwrap_err();
    assert!(matches!(err, ProbeError::Transient(_)));
}
