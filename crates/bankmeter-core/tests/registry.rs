//! Registry identity, accumulation and config sealing.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use bankmeter_core::{
    CommonTags, MeterKind, MeterRegistry, RegistryConfig, RegistryCustomizer, Tags, TimerOptions,
};
use bankmeter_core::error::MetricsError;

#[test]
fn same_identity_accumulates() {
    let registry = MeterRegistry::new();
    registry.counter("bank.deposits", &[("currency", "EUR")]).unwrap().increment();
    registry.counter("bank.deposits", &[("currency", "EUR")]).unwrap().increment_by(4);
    registry.counter("bank.deposits", &[("currency", "USD")]).unwrap().increment();

    assert_eq!(registry.len(), 2);
    let eur = registry.find_counter("bank.deposits", &[("currency", "EUR")]).unwrap();
    assert_eq!(eur.count(), 5);
}

#[test]
fn tag_order_does_not_split_identity() {
    let registry = MeterRegistry::new();
    let ab = [("a", "1"), ("b", "2")];
    let ba = [("b", "2"), ("a", "1")];
    registry.timer("bank.transfer", &ab).unwrap().record(Duration::from_millis(1));
    registry.timer("bank.transfer", &ba).unwrap().record(Duration::from_millis(3));

    assert_eq!(registry.len(), 1);
    let t = registry.find_timer("bank.transfer", &[("a", "1"), ("b", "2")]).unwrap();
    assert_eq!(t.count(), 2);
    assert_eq!(t.total_time(), Duration::from_millis(4));
    assert_eq!(t.max(), Duration::from_millis(3));
    assert_eq!(t.mean(), Duration::from_millis(2));
}

#[test]
fn kind_mismatch_is_rejected() {
    let registry = MeterRegistry::new();
    registry.counter("bank.logins", &[]).unwrap();
    let err = registry.timer("bank.logins", &[("other", "tags")]).expect_err("must fail");
    match err {
        MetricsError::KindMismatch { name, existing, requested } => {
            assert_eq!(name, "bank.logins");
            assert_eq!(existing, MeterKind::Counter);
            assert_eq!(requested, MeterKind::Timer);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn gauge_set_and_add() {
    let registry = MeterRegistry::new();
    let g = registry.gauge("bank.sessions.active", &[]).unwrap();
    g.increment();
    g.increment();
    g.decrement();
    assert_eq!(g.value(), 1);
    g.set(-7);
    assert_eq!(registry.find_gauge("bank.sessions.active", &[]).unwrap().value(), -7);
}

#[test]
fn common_tags_join_identity() {
    let registry = MeterRegistry::new();
    CommonTags::bankapp().customize(&registry).unwrap();

    let c = registry.counter("bank.deposits", &[("application", "spoofed")]).unwrap();
    assert_eq!(c.id().tags().get("application"), Some("bankapp"));
    // Lookups apply the same common tags.
    assert!(registry.find_counter("bank.deposits", &[]).is_some());
}

#[test]
fn config_seals_on_first_registration() {
    let registry = MeterRegistry::new();
    assert!(!registry.config().is_sealed());
    CommonTags::bankapp().customize(&registry).unwrap();
    registry.counter("bank.deposits", &[]).unwrap();
    assert!(registry.config().is_sealed());

    // Identical tags are a no-op.
    CommonTags::bankapp().customize(&registry).unwrap();

    let region = Tags::of([("region", "eu-west")]).unwrap();
    let err = CommonTags::new(region).customize(&registry).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG_LOCKED");
    assert_eq!(registry.config().current_common_tags().len(), 1);
}

#[test]
fn failed_registration_does_not_seal() {
    let registry = MeterRegistry::new();
    assert!(registry.counter("bad name", &[]).is_err());
    assert!(registry.timer("bank.deposits", &[("bad key", "x")]).is_err());
    assert!(!registry.config().is_sealed());

    // Common tags can still be applied after the failures above.
    CommonTags::bankapp().customize(&registry).unwrap();
    let c = registry.counter("bank.deposits", &[]).unwrap();
    assert_eq!(c.id().tags().get("application"), Some("bankapp"));
    assert!(registry.config().is_sealed());
}

#[test]
fn kind_and_name_clashes_after_seal_keep_config_intact() {
    let registry = MeterRegistry::new();
    CommonTags::bankapp().customize(&registry).unwrap();
    registry.counter("bank.logins", &[]).unwrap();

    assert!(registry.gauge("bank.logins", &[]).is_err());
    assert!(registry.counter("bank_logins", &[]).is_err());
    assert_eq!(registry.len(), 1);
    assert!(registry.find_gauge("bank.logins", &[]).is_none());
}

#[test]
fn find_does_not_seal() {
    let registry = MeterRegistry::new();
    assert!(registry.find_timer("bank.transfer", &[]).is_none());
    assert!(!registry.config().is_sealed());
}

#[test]
fn histogram_buckets_are_cumulative() {
    let cfg = RegistryConfig {
        timer: TimerOptions { histogram: true, buckets_ms: vec![10, 100] },
    };
    let registry = MeterRegistry::from_config(&cfg).unwrap();
    let t = registry.timer("bank.transfer", &[]).unwrap();
    t.record(Duration::from_millis(5));
    t.record(Duration::from_millis(50));
    t.record(Duration::from_millis(500));

    let snap = t.snapshot();
    assert_eq!(
        snap.buckets,
        vec![(Duration::from_millis(10), 1), (Duration::from_millis(100), 2)]
    );
    assert_eq!(snap.count, 3);
}

#[test]
fn invalid_timer_options_fail_construction() {
    let cases: [Vec<u64>; 3] = [vec![], vec![0, 10], vec![10, 10, 20]];
    for buckets_ms in cases {
        let cfg = RegistryConfig {
            timer: TimerOptions { histogram: true, buckets_ms: buckets_ms.clone() },
        };
        let err = MeterRegistry::from_config(&cfg).expect_err("must fail");
        assert_eq!(err.code().as_str(), "BAD_CONFIG", "buckets={buckets_ms:?}");
    }
}

#[test]
fn registry_handle_is_shared() {
    let registry = MeterRegistry::new();
    let clone = registry.clone();
    clone.counter("bank.deposits", &[]).unwrap().increment();
    assert_eq!(registry.find_counter("bank.deposits", &[]).unwrap().count(), 1);
}
