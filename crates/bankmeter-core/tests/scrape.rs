//! Prometheus exposition output.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use bankmeter_core::{
    CommonTags, MeterKind, MeterRegistry, RegistryConfig, RegistryCustomizer, Result, TimerOptions,
};

fn bankapp_registry(cfg: &RegistryConfig) -> MeterRegistry {
    let registry = MeterRegistry::from_config(cfg).unwrap();
    CommonTags::bankapp().customize(&registry).unwrap();
    registry
}

#[test]
fn counter_and_gauge_lines() {
    let registry = bankapp_registry(&RegistryConfig::default());
    registry.describe("bank.deposits", "Deposits accepted");
    registry.counter("bank.deposits", &[("currency", "EUR")]).unwrap().increment_by(3);
    registry.gauge("bank.sessions.active", &[]).unwrap().set(2);

    let out = registry.scrape();
    let expected = "\
# HELP bank_deposits_total Deposits accepted
# TYPE bank_deposits_total counter
bank_deposits_total{application=\"bankapp\",currency=\"EUR\"} 3
# TYPE bank_sessions_active gauge
bank_sessions_active{application=\"bankapp\"} 2
";
    assert_eq!(out, expected);
}

#[test]
fn timer_renders_as_summary_in_seconds() {
    let registry = bankapp_registry(&RegistryConfig::default());
    let t = registry.timer("bank.transfer", &[]).unwrap();
    t.record(Duration::from_millis(250));
    t.record(Duration::from_millis(750));

    let out = registry.scrape();
    let expected = "\
# TYPE bank_transfer_seconds summary
bank_transfer_seconds_count{application=\"bankapp\"} 2
bank_transfer_seconds_sum{application=\"bankapp\"} 1
# TYPE bank_transfer_seconds_max gauge
bank_transfer_seconds_max{application=\"bankapp\"} 0.75
";
    assert_eq!(out, expected);
}

#[test]
fn timer_histogram_buckets() {
    let cfg = RegistryConfig {
        timer: TimerOptions { histogram: true, buckets_ms: vec![50, 500] },
    };
    let registry = bankapp_registry(&cfg);
    registry.timer("bank.transfer", &[]).unwrap().record(Duration::from_millis(100));

    let out = registry.scrape();
    assert!(out.contains("# TYPE bank_transfer_seconds histogram\n"));
    assert!(out.contains("bank_transfer_seconds_bucket{application=\"bankapp\",le=\"0.05\"} 0\n"));
    assert!(out.contains("bank_transfer_seconds_bucket{application=\"bankapp\",le=\"0.5\"} 1\n"));
    assert!(out.contains("bank_transfer_seconds_bucket{application=\"bankapp\",le=\"+Inf\"} 1\n"));
    assert!(out.contains("bank_transfer_seconds_count{application=\"bankapp\"} 1\n"));
}

#[test]
fn label_values_are_escaped() {
    let registry = bankapp_registry(&RegistryConfig::default());
    registry
        .counter("bank.errors", &[("error_kind", "say \"hi\"\\\n")])
        .unwrap()
        .increment();

    let out = registry.scrape();
    let expected =
        "bank_errors_total{application=\"bankapp\",error_kind=\"say \\\"hi\\\"\\\\\\n\"} 1";
    assert!(out.contains(expected), "{out}");
}

#[test]
fn dotted_tag_keys_are_rejected_before_they_reach_a_label() {
    let registry = bankapp_registry(&RegistryConfig::default());
    registry.counter("bank.errors", &[("error_kind", "timeout")]).unwrap();

    let err = registry
        .counter("bank.errors", &[("error.kind", "timeout"), ("error_kind", "timeout")])
        .expect_err("must fail");
    assert_eq!(err.code().as_str(), "INVALID_TAG");

    let out = registry.scrape();
    assert_eq!(out.matches("error_kind=").count(), 1, "{out}");
}

#[test]
fn names_rendering_alike_are_rejected() {
    let cases: [(&str, MeterKind, &str, MeterKind); 4] = [
        ("bank.x", MeterKind::Counter, "bank_x", MeterKind::Counter),
        ("bank.requests", MeterKind::Counter, "bank.requests.total", MeterKind::Gauge),
        ("bank.latency", MeterKind::Timer, "bank.latency.seconds.count", MeterKind::Gauge),
        ("bank.queue.seconds.max", MeterKind::Gauge, "bank.queue", MeterKind::Timer),
    ];
    for (first, first_kind, second, second_kind) in cases {
        let registry = bankapp_registry(&RegistryConfig::default());
        register(&registry, first, first_kind).unwrap();
        let err = register(&registry, second, second_kind).expect_err(second);
        assert_eq!(err.code().as_str(), "INVALID_NAME", "{first} vs {second}");
    }
}

#[test]
fn clashing_name_leaves_a_single_family() {
    let registry = bankapp_registry(&RegistryConfig::default());
    registry.counter("bank.x", &[]).unwrap().increment();
    assert!(registry.counter("bank_x", &[]).is_err());
    // The owning name keeps working with other tags.
    registry.counter("bank.x", &[("currency", "EUR")]).unwrap().increment();

    let out = registry.scrape();
    assert_eq!(out.matches("# TYPE bank_x_total counter").count(), 1, "{out}");
    assert_eq!(registry.len(), 2);
}

fn register(registry: &MeterRegistry, name: &str, kind: MeterKind) -> Result<()> {
    match kind {
        MeterKind::Counter => registry.counter(name, &[]).map(|_| ()),
        MeterKind::Gauge => registry.gauge(name, &[]).map(|_| ()),
        MeterKind::Timer => registry.timer(name, &[]).map(|_| ()),
    }
}

#[test]
fn every_line_carries_application_tag() {
    let registry = bankapp_registry(&RegistryConfig::default());
    registry.counter("bank.deposits", &[]).unwrap().increment();
    registry.gauge("bank.sessions.active", &[("node", "a")]).unwrap().set(1);
    registry
        .timer("bank.transfer", &[("currency", "EUR")])
        .unwrap()
        .record(Duration::from_millis(1));

    let out = registry.scrape();
    let samples: Vec<&str> = out.lines().filter(|l| !l.starts_with('#')).collect();
    assert!(!samples.is_empty());
    for line in samples {
        assert!(line.contains("application=\"bankapp\""), "missing tag: {line}");
    }
}

#[test]
fn empty_registry_scrapes_empty() {
    assert_eq!(MeterRegistry::new().scrape(), "");
}
