// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for chart-migration-verifier.
//!
//! Uses proptest to generate random inputs and verify invariants.

use std::time::Duration;

use proptest::prelude::*;

use chart_migration_verifier::migration::{
    MigrationEvent, MigrationPhase, MigrationStateMachine, RunMode, TransitionResult,
};
use chart_migration_verifier::{Error, PollPolicy, ResourceKind, ResourceSetDescriptor, duration};

/// Strategy for generating random phases.
fn any_phase() -> impl Strategy<Value = MigrationPhase> {
    prop::sample::select(MigrationPhase::ALL.to_vec())
}

/// Strategy for generating random events.
fn any_event() -> impl Strategy<Value = MigrationEvent> {
    prop_oneof![
        Just(MigrationEvent::LegacyInstallSucceeded),
        Just(MigrationEvent::LegacyVerificationPassed),
        Just(MigrationEvent::ManagedInstallStarted),
        Just(MigrationEvent::ManagedReleaseDeployed),
        Just(MigrationEvent::ManagedVerificationPassed),
        Just(MigrationEvent::ServiceProbeSucceeded),
        Just(MigrationEvent::ReleaseDeleted),
    ]
}

fn any_mode() -> impl Strategy<Value = RunMode> {
    prop_oneof![Just(RunMode::Migration), Just(RunMode::Metrics)]
}

fn any_kind() -> impl Strategy<Value = ResourceKind> {
    prop::sample::select(ResourceKind::ALL.to_vec())
}

/// Strategy for interval lengths between 1ms and 10 minutes.
fn interval() -> impl Strategy<Value = Duration> {
    (1u64..=600_000).prop_map(Duration::from_millis)
}

fn phase_index(phase: MigrationPhase) -> usize {
    MigrationPhase::ALL
        .iter()
        .position(|p| *p == phase)
        .unwrap()
}

proptest! {
    /// Any successful transition moves exactly one phase forward.
    #[test]
    fn transitions_only_move_forward(phase in any_phase(), event in any_event()) {
        let sm = MigrationStateMachine::new();
        match sm.transition(&phase, event) {
            TransitionResult::Success { from, to, .. } => {
                prop_assert_eq!(from, phase);
                prop_assert_eq!(phase_index(to), phase_index(from) + 1);
            }
            TransitionResult::InvalidTransition { current, .. } => {
                prop_assert_eq!(current, phase);
                prop_assert!(!sm.can_transition(&phase, &event));
            }
        }
    }

    /// Applying arbitrary events never moves a run backwards, and invalid
    /// events leave the phase untouched.
    #[test]
    fn event_sequences_are_monotonic(events in prop::collection::vec(any_event(), 0..40)) {
        let sm = MigrationStateMachine::new();
        let mut phase = MigrationPhase::Init;
        for event in events {
            let before = phase;
            if let TransitionResult::Success { to, .. } = sm.transition(&phase, event) {
                phase = to;
            }
            prop_assert!(phase >= before);
        }
    }

    /// In either mode, every phase an event sequence reaches is one of the
    /// mode's phases, visited in the mode's order.
    #[test]
    fn mode_runs_stay_on_their_phases(
        mode in any_mode(),
        events in prop::collection::vec(any_event(), 0..40),
    ) {
        let sm = MigrationStateMachine::for_mode(mode);
        let phases = mode.phases();
        let mut phase = MigrationPhase::Init;
        for event in events {
            if let TransitionResult::Success { from, to, .. } = sm.transition(&phase, event) {
                let from_idx = phases.iter().position(|p| *p == from).unwrap();
                prop_assert_eq!(phases.get(from_idx + 1), Some(&to));
                phase = to;
            }
        }
    }

    /// Expected counts are reported back exactly, in kind order.
    #[test]
    fn descriptor_keeps_counts(counts in prop::collection::btree_map(any_kind(), 1usize..5, 1..7)) {
        let mut builder = ResourceSetDescriptor::builder("managed")
            .label_selector("app=metrics-server")
            .namespace("kube-system");
        for (kind, count) in &counts {
            builder = builder.expect(*kind, *count);
        }
        let descriptor = builder.build().unwrap();

        prop_assert_eq!(descriptor.expected_counts(), &counts);
        let kinds: Vec<_> = descriptor.expected_counts().keys().copied().collect();
        let mut sorted = kinds.clone();
        sorted.sort();
        prop_assert_eq!(kinds, sorted);
    }

    /// Replacing one count changes only that kind.
    #[test]
    fn with_expected_count_is_local(
        kind in any_kind(),
        count in 0usize..10,
    ) {
        let base = ResourceSetDescriptor::builder("managed")
            .label_selector("app=metrics-server")
            .namespace("kube-system")
            .expect(ResourceKind::ClusterRoleBinding, 2)
            .expect(ResourceKind::Service, 1)
            .build()
            .unwrap();
        let changed = base.with_expected_count(kind, count);

        prop_assert_eq!(changed.expected_counts().get(&kind), Some(&count));
        for (k, c) in base.expected_counts() {
            if *k != kind {
                prop_assert_eq!(changed.expected_counts().get(k), Some(c));
            }
        }
    }

    /// Policy construction succeeds exactly when base <= max <= deadline.
    #[test]
    fn policy_accepts_only_ordered_intervals(
        base in interval(),
        max in interval(),
        deadline in interval(),
    ) {
        let result = PollPolicy::exponential(base, max, Some(deadline));
        if base <= max && max <= deadline {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(matches!(result, Err(Error::InvalidPolicy(_))));
        }
    }

    /// Exponential delays grow monotonically and never pass the ceiling.
    #[test]
    fn exponential_delay_stays_within_bounds(
        base in interval(),
        extra in 0u64..600_000,
        steps in 1usize..20,
    ) {
        let max = base + Duration::from_millis(extra);
        let policy = PollPolicy::exponential(base, max, None).unwrap();
        let mut delay = policy.base_interval();
        for _ in 0..steps {
            let next = policy.next_interval(delay);
            prop_assert!(next >= delay);
            prop_assert!(next <= max);
            delay = next;
        }
    }

    /// A constant policy always waits the base interval.
    #[test]
    fn constant_delay_never_changes(base in interval(), steps in 1usize..20) {
        let policy = PollPolicy::constant(base, base * 10).unwrap();
        let mut delay = base;
        for _ in 0..steps {
            delay = policy.next_interval(delay);
            prop_assert_eq!(delay, base);
        }
    }

    /// Formatted durations parse back to the same value.
    #[test]
    fn duration_format_parses_back(millis in 0u64..86_400_000) {
        let d = Duration::from_millis(millis);
        prop_assert_eq!(duration::parse(&duration::format(d)).unwrap(), d);
    }
}
