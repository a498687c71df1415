//! Shared application state for the bankmeter service.
//!
//! Startup errors are explicit (Result instead of panic) so `main` can
//! refuse to start with metrics half-wired.

use std::sync::Arc;

use bankmeter_core::error::Result;
use bankmeter_core::{MeterRegistry, TimedAspect};

use crate::bootstrap::{self, Observability};
use crate::config::ServiceConfig;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    obs: Observability,
}

impl AppState {
    /// Build application state. Fails if metrics cannot be initialized.
    pub fn new(cfg: ServiceConfig) -> Result<Self> {
        let obs = bootstrap::initialize(&cfg.metrics)?;
        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, obs }),
        })
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &MeterRegistry {
        &self.inner.obs.registry
    }

    /// Aspect bound to the shared registry; the scrape handler and any
    /// embedding code time their operations through it.
    pub fn timed(&self) -> &TimedAspect {
        &self.inner.obs.timed
    }
}
