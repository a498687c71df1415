//! Startup wiring for metrics.
//!
//! Runs once, before the router is built:
//! 1) construct the shared registry from config
//! 2) attach common tags
//! 3) bind the timed aspect to the registry
//!
//! Any failure aborts startup so the process never runs with
//! instrumentation silently missing.

use bankmeter_core::customizer::{self, CommonTags, RegistryCustomizer};
use bankmeter_core::error::Result;
use bankmeter_core::{MeterRegistry, TimedAspect};

use crate::config::MetricsSection;

/// Registry plus the adapters bound to it.
#[derive(Debug, Clone)]
pub struct Observability {
    pub registry: MeterRegistry,
    pub timed: TimedAspect,
}

pub fn initialize(metrics: &MetricsSection) -> Result<Observability> {
    let registry = MeterRegistry::from_config(&metrics.registry_config())?;
    tracing::debug!(histogram = metrics.timer.histogram, "meter registry created");

    let common_tags = CommonTags::new(metrics.common_tags.clone());
    customizer::apply_all(&registry, &[&common_tags as &dyn RegistryCustomizer])?;

    let timed = TimedAspect::new(&registry);

    tracing::info!(
        common_tags = ?registry.config().current_common_tags(),
        endpoint = %metrics.endpoint,
        "metrics initialized"
    );
    Ok(Observability { registry, timed })
}
