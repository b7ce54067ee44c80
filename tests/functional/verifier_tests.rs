//! Presence and absence verdicts against a seeded in-memory cluster.

use std::sync::Arc;

use chart_migration_verifier::plan::MigrationPlan;
use chart_migration_verifier::resources::VerificationVerdict;
use chart_migration_verifier::{Error, ResourceKind, ResourceSetDescriptor, ResourceSetVerifier};

use crate::fake_cluster::{FakeCluster, FakeObject, MANAGED_RELEASE, legacy_objects, managed_objects};

fn descriptors() -> (ResourceSetDescriptor, ResourceSetDescriptor) {
    let plan = MigrationPlan::metrics_server("test").unwrap();
    (plan.legacy.resources, plan.managed.resources)
}

fn seeded(objects: Vec<FakeObject>) -> Arc<FakeCluster> {
    let cluster = FakeCluster::new();
    objects.into_iter().for_each(|o| cluster.add(o));
    cluster
}

#[tokio::test]
async fn test_managed_present_with_exact_counts() {
    let (_, managed) = descriptors();
    let verifier = ResourceSetVerifier::new(seeded(managed_objects()));

    verifier.check_present(&managed).await.unwrap();
    for kind in ResourceKind::ALL {
        assert_eq!(
            verifier.verdict(&managed, kind).await.unwrap(),
            VerificationVerdict::Present,
            "{} should be present",
            kind
        );
    }
}

#[tokio::test]
async fn test_extra_object_breaks_presence() {
    let (_, managed) = descriptors();
    let mut objects = managed_objects();
    objects.push(
        FakeObject::new(ResourceKind::Service, "metrics-server-extra", MANAGED_RELEASE)
            .with_labels("app=metrics-server,giantswarm.io/service-type=managed"),
    );
    let verifier = ResourceSetVerifier::new(seeded(objects));

    let err = verifier.check_present(&managed).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PresenceMismatch {
            kind: ResourceKind::Service,
            expected: 1,
            observed: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn test_first_offending_kind_is_reported() {
    let (_, managed) = descriptors();
    // Both ClusterRoleBinding and Service are off; ClusterRoleBinding is checked first.
    let managed = managed
        .with_expected_count(ResourceKind::ClusterRoleBinding, 3)
        .with_expected_count(ResourceKind::Service, 2);
    let cluster = seeded(managed_objects());
    let verifier = ResourceSetVerifier::new(cluster.clone());

    let err = verifier.check_present(&managed).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "managed resources: unexpected number of ClusterRoleBinding objects, want 3, got 2"
    );
    assert_eq!(cluster.lists_served(), 1);
}

#[tokio::test]
async fn test_empty_cluster_is_absent_for_both_variants() {
    let (legacy, managed) = descriptors();
    let verifier = ResourceSetVerifier::new(FakeCluster::new());

    verifier.check_absent(&legacy).await.unwrap();
    verifier.check_absent(&managed).await.unwrap();
}

#[tokio::test]
async fn test_legacy_objects_do_not_match_managed_selector() {
    let (legacy, managed) = descriptors();
    let verifier = ResourceSetVerifier::new(seeded(legacy_objects()));

    verifier.check_present(&legacy).await.unwrap();
    verifier.check_absent(&managed).await.unwrap();

    let err = verifier.check_absent(&legacy).await.unwrap_err();
    assert!(matches!(
        err,
        Error::UnexpectedPresence {
            kind: ResourceKind::ClusterRoleBinding,
            ..
        }
    ));
}

#[tokio::test]
async fn test_transport_error_fails_absence_check() {
    let (_, managed) = descriptors();
    let cluster = FakeCluster::new();
    cluster.fail_kind(ResourceKind::Deployment, "dial tcp 10.0.0.1:443: connection refused");
    let verifier = ResourceSetVerifier::new(cluster);

    let err = verifier.check_absent(&managed).await.unwrap_err();
    match err {
        Error::QueryFailure { kind, message } => {
            assert_eq!(kind, ResourceKind::Deployment);
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected QueryFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_named_object_is_reported_by_name() {
    let (legacy, _) = descriptors();
    let objects = legacy_objects()
        .into_iter()
        .filter(|o| o.kind != ResourceKind::RoleBinding)
        .collect();
    let verifier = ResourceSetVerifier::new(seeded(objects));

    let err = verifier.check_present(&legacy).await.unwrap_err();
    match err {
        Error::UnexpectedAbsence { kind, name, .. } => {
            assert_eq!(kind, ResourceKind::RoleBinding);
            assert_eq!(name, "metrics-server-auth-reader");
        }
        other => panic!("expected UnexpectedAbsence, got {:?}", other),
    }
}
