//! Process-wide meter registry.
//!
//! The registry is an explicit handle (`Arc` inside) created once at startup
//! and cloned into every component that records or exports metrics. Meters
//! are keyed by `MeterId`; asking for the same identity twice returns the
//! same underlying meter, so samples accumulate instead of duplicating.
//!
//! Common tags live in the registry config and are merged into every meter
//! identity at registration time. The first registration seals the config:
//! from then on a common tag change would split identities, so it is
//! rejected with `ConfigLocked`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use serde::Deserialize;

use crate::error::{MetricsError, Result};
use crate::meter::{Counter, Gauge, Meter, MeterKind, MeterSnapshot, Timer};
use crate::prometheus;
use crate::tags::{validate_name, MeterId, Tags};

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Registry construction options.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub timer: TimerOptions,
}

/// Timer defaults applied when a timer is first registered.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimerOptions {
    /// Publish cumulative histogram buckets for every timer by default.
    #[serde(default)]
    pub histogram: bool,

    /// Bucket upper bounds in milliseconds, strictly ascending.
    #[serde(default = "default_buckets_ms")]
    pub buckets_ms: Vec<u64>,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            histogram: false,
            buckets_ms: default_buckets_ms(),
        }
    }
}

impl TimerOptions {
    pub fn validate(&self) -> Result<()> {
        if self.buckets_ms.is_empty() {
            return Err(MetricsError::BadConfig("timer.buckets_ms must not be empty".into()));
        }
        if self.buckets_ms.first() == Some(&0) {
            return Err(MetricsError::BadConfig("timer.buckets_ms must be positive".into()));
        }
        if !self.buckets_ms.windows(2).all(|w| w[0] < w[1]) {
            return Err(MetricsError::BadConfig(
                "timer.buckets_ms must be strictly ascending".into(),
            ));
        }
        if self.buckets_ms.iter().any(|&ms| ms.checked_mul(NANOS_PER_MILLI).is_none()) {
            return Err(MetricsError::BadConfig("timer.buckets_ms value too large".into()));
        }
        Ok(())
    }
}

fn default_buckets_ms() -> Vec<u64> {
    vec![5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000]
}

struct RegistryInner {
    meters: DashMap<MeterId, Meter>,
    kinds: DashMap<String, MeterKind>,
    /// Exposition name -> meter name that owns it.
    claims: Mutex<HashMap<String, String>>,
    descriptions: DashMap<String, String>,
    common_tags: RwLock<Tags>,
    sealed: AtomicBool,
    histogram_default: bool,
    bucket_bounds: Vec<u64>,
}

impl RegistryInner {
    fn create(&self, id: MeterId, kind: MeterKind, histogram: Option<bool>) -> Meter {
        match kind {
            MeterKind::Counter => Meter::Counter(Counter::new(id)),
            MeterKind::Gauge => Meter::Gauge(Gauge::new(id)),
            MeterKind::Timer => {
                let bounds = histogram
                    .unwrap_or(self.histogram_default)
                    .then_some(self.bucket_bounds.as_slice());
                Meter::Timer(Timer::new(id, bounds))
            }
        }
    }

    fn common_tags(&self) -> RwLockReadGuard<'_, Tags> {
        self.common_tags.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn common_tags_mut(&self) -> RwLockWriteGuard<'_, Tags> {
        self.common_tags.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full identity for a call-site name and tags. Common tags win on collisions.
    fn identity(&self, name: &str, tags: &Tags) -> Result<MeterId> {
        let common = self.common_tags();
        MeterId::new(name, tags.and(&common))
    }
}

/// Shared handle to the process-wide registry.
#[derive(Clone)]
pub struct MeterRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for MeterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MeterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterRegistry")
            .field("meters", &self.inner.meters.len())
            .field("common_tags", &*self.inner.common_tags())
            .field("sealed", &self.inner.sealed.load(Ordering::Acquire))
            .finish()
    }
}

impl MeterRegistry {
    /// Registry with default timer options.
    pub fn new() -> Self {
        Self::build(&TimerOptions::default())
    }

    /// Registry from validated options. Invalid options fail construction.
    pub fn from_config(cfg: &RegistryConfig) -> Result<Self> {
        cfg.timer.validate()?;
        Ok(Self::build(&cfg.timer))
    }

    fn build(timer: &TimerOptions) -> Self {
        let bucket_bounds = timer
            .buckets_ms
            .iter()
            .map(|ms| ms.saturating_mul(NANOS_PER_MILLI))
            .collect();
        Self {
            inner: Arc::new(RegistryInner {
                meters: DashMap::new(),
                kinds: DashMap::new(),
                claims: Mutex::new(HashMap::new()),
                descriptions: DashMap::new(),
                common_tags: RwLock::new(Tags::new()),
                sealed: AtomicBool::new(false),
                histogram_default: timer.histogram,
                bucket_bounds,
            }),
        }
    }

    /// Configuration surface (common tags).
    pub fn config(&self) -> RegistryConfigHandle<'_> {
        RegistryConfigHandle { inner: &self.inner }
    }

    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> Result<Counter> {
        let tags = Tags::of(tags.iter().copied())?;
        match self.register(name, tags, MeterKind::Counter, None, None)? {
            Meter::Counter(c) => Ok(c),
            other => Err(mismatch(name, other.kind(), MeterKind::Counter)),
        }
    }

    pub fn gauge(&self, name: &str, tags: &[(&str, &str)]) -> Result<Gauge> {
        let tags = Tags::of(tags.iter().copied())?;
        match self.register(name, tags, MeterKind::Gauge, None, None)? {
            Meter::Gauge(g) => Ok(g),
            other => Err(mismatch(name, other.kind(), MeterKind::Gauge)),
        }
    }

    pub fn timer(&self, name: &str, tags: &[(&str, &str)]) -> Result<Timer> {
        self.timer_tagged(name, Tags::of(tags.iter().copied())?, None)
    }

    /// Timer with an explicit histogram choice. Only the first registration
    /// of an identity decides whether it carries buckets.
    pub fn timer_tagged(&self, name: &str, tags: Tags, histogram: Option<bool>) -> Result<Timer> {
        self.timer_described(name, tags, histogram, None)
    }

    /// As `timer_tagged`; `description` becomes the help text when this call
    /// creates the timer and the name has none yet.
    pub(crate) fn timer_described(
        &self,
        name: &str,
        tags: Tags,
        histogram: Option<bool>,
        description: Option<&str>,
    ) -> Result<Timer> {
        match self.register(name, tags, MeterKind::Timer, histogram, description)? {
            Meter::Timer(t) => Ok(t),
            other => Err(mismatch(name, other.kind(), MeterKind::Timer)),
        }
    }

    fn register(
        &self,
        name: &str,
        tags: Tags,
        kind: MeterKind,
        histogram: Option<bool>,
        description: Option<&str>,
    ) -> Result<Meter> {
        validate_name(name)?;
        self.claim_name(name, kind)?;

        let id = {
            let common = self.inner.common_tags();
            let id = MeterId::new(name, tags.and(&common))?;
            // Sealed under the read lock so a concurrent config write sees it.
            self.inner.sealed.store(true, Ordering::Release);
            id
        };

        if let Some(existing) = self.inner.meters.get(&id) {
            return Ok(existing.value().clone());
        }

        let meter = self
            .inner
            .meters
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::debug!(meter = %id, kind = %kind, "meter registered");
                if let Some(description) = description {
                    self.inner
                        .descriptions
                        .entry(name.to_string())
                        .or_insert_with(|| description.to_string());
                }
                self.inner.create(id.clone(), kind, histogram)
            })
            .value()
            .clone();
        Ok(meter)
    }

    /// Bind `name` to `kind` and reserve every exposition name it renders to.
    /// A name keeps its first kind; two names may not render to the same
    /// exposition name (`bank.x` vs `bank_x`).
    fn claim_name(&self, name: &str, kind: MeterKind) -> Result<()> {
        if let Some(existing) = self.inner.kinds.get(name).map(|k| *k.value()) {
            return check_kind(name, existing, kind);
        }

        let mut claims = self.inner.claims.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = self.inner.kinds.get(name).map(|k| *k.value()) {
            return check_kind(name, existing, kind);
        }
        let exposed = prometheus::exposed_names(name, kind);
        for exposed_name in &exposed {
            if let Some(owner) = claims.get(exposed_name) {
                return Err(MetricsError::InvalidName(format!(
                    "`{name}` renders as `{exposed_name}`, already used by `{owner}`"
                )));
            }
        }
        for exposed_name in exposed {
            claims.insert(exposed_name, name.to_string());
        }
        self.inner.kinds.insert(name.to_string(), kind);
        Ok(())
    }

    /// Look up a meter by call-site name and tags (common tags are added).
    /// Never registers and never seals the config.
    pub fn find(&self, name: &str, tags: &[(&str, &str)]) -> Option<Meter> {
        let tags = Tags::of(tags.iter().copied()).ok()?;
        let id = self.inner.identity(name, &tags).ok()?;
        self.inner.meters.get(&id).map(|m| m.value().clone())
    }

    pub fn find_counter(&self, name: &str, tags: &[(&str, &str)]) -> Option<Counter> {
        match self.find(name, tags)? {
            Meter::Counter(c) => Some(c),
            _ => None,
        }
    }

    pub fn find_gauge(&self, name: &str, tags: &[(&str, &str)]) -> Option<Gauge> {
        match self.find(name, tags)? {
            Meter::Gauge(g) => Some(g),
            _ => None,
        }
    }

    pub fn find_timer(&self, name: &str, tags: &[(&str, &str)]) -> Option<Timer> {
        match self.find(name, tags)? {
            Meter::Timer(t) => Some(t),
            _ => None,
        }
    }

    /// All timers registered under `name`, any tags.
    pub fn timers_named(&self, name: &str) -> Vec<Timer> {
        let mut timers: Vec<Timer> = self
            .inner
            .meters
            .iter()
            .filter(|e| e.key().name() == name)
            .filter_map(|e| match e.value() {
                Meter::Timer(t) => Some(t.clone()),
                _ => None,
            })
            .collect();
        timers.sort_by(|a, b| a.id().cmp(b.id()));
        timers
    }

    /// Attach help text to a metric name (rendered as `# HELP`).
    pub fn describe(&self, name: &str, description: impl Into<String>) {
        self.inner.descriptions.insert(name.to_string(), description.into());
    }

    pub fn description(&self, name: &str) -> Option<String> {
        self.inner.descriptions.get(name).map(|d| d.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.meters.is_empty()
    }

    /// Snapshot of every meter, sorted by identity.
    pub fn meters(&self) -> Vec<MeterSnapshot> {
        let mut out: Vec<MeterSnapshot> =
            self.inner.meters.iter().map(|e| e.value().snapshot()).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Render every meter in Prometheus text exposition format (0.0.4).
    pub fn scrape(&self) -> String {
        prometheus::render(&self.meters(), |name| self.description(name))
    }
}

fn check_kind(name: &str, existing: MeterKind, requested: MeterKind) -> Result<()> {
    if existing == requested {
        Ok(())
    } else {
        Err(mismatch(name, existing, requested))
    }
}

fn mismatch(name: &str, existing: MeterKind, requested: MeterKind) -> MetricsError {
    MetricsError::KindMismatch {
        name: name.to_string(),
        existing,
        requested,
    }
}

/// Borrowed view over the registry's mutable configuration.
pub struct RegistryConfigHandle<'a> {
    inner: &'a RegistryInner,
}

impl RegistryConfigHandle<'_> {
    /// Add tags to the default tag set. Keys stay unique (last write wins);
    /// re-applying tags already present is a no-op even once sealed.
    pub fn common_tags(&self, tags: &Tags) -> Result<&Self> {
        let mut current = self.inner.common_tags_mut();
        let merged = current.and(tags);
        if merged == *current {
            return Ok(self);
        }
        if self.inner.sealed.load(Ordering::Acquire) {
            return Err(MetricsError::ConfigLocked(format!(
                "cannot change common tags after {} meter(s) were registered",
                self.inner.meters.len()
            )));
        }
        for (key, value) in tags.iter() {
            tracing::debug!(key, value, "common tag applied");
        }
        *current = merged;
        Ok(self)
    }

    pub fn current_common_tags(&self) -> Tags {
        self.inner.common_tags().clone()
    }

    /// True once any meter has been registered.
    pub fn is_sealed(&self) -> bool {
        self.inner.sealed.load(Ordering::Acquire)
    }
}
