//! Startup wiring: success path and fail-fast behaviour.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use bankmeter_core::Timed;
use bankmeter_service::app_state::AppState;
use bankmeter_service::bootstrap;
use bankmeter_service::config::{self, ServiceConfig};

#[test]
fn defaults_wire_common_tag_and_timing() {
    let obs = bootstrap::initialize(&ServiceConfig::default().metrics).unwrap();

    let tags = obs.registry.config().current_common_tags();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags.get("application"), Some("bankapp"));

    obs.timed.measure(&Timed::new("bank.transfer"), || ());
    let out = obs.registry.scrape();
    assert!(out.contains(
        "bank_transfer_seconds_count{application=\"bankapp\",exception=\"none\",outcome=\"success\"} 1"
    ));
}

#[test]
fn timed_aspect_shares_the_registry() {
    let obs = bootstrap::initialize(&ServiceConfig::default().metrics).unwrap();
    obs.timed.measure(&Timed::new("bank.balance"), || ());
    assert_eq!(obs.registry.timers_named("bank.balance").len(), 1);
}

#[test]
fn invalid_registry_config_fails_startup() {
    let mut cfg = ServiceConfig::default();
    cfg.metrics.timer.buckets_ms = vec![];
    let err = AppState::new(cfg).err().expect("startup must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}

#[test]
fn bad_config_never_reaches_initialization() {
    let err = config::load_from_str("version: 1\nmetrics: { timer: { buckets_ms: [] } }\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}
