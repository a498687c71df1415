//! Meter kinds: counters, gauges and timers.
//!
//! Every meter is a cheap cloneable handle over shared atomics. Updates are
//! single atomic operations so concurrent writers never lose samples.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::tags::MeterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeterKind {
    Counter,
    Gauge,
    Timer,
}

impl MeterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MeterKind::Counter => "counter",
            MeterKind::Gauge => "gauge",
            MeterKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic counter.
#[derive(Debug, Clone)]
pub struct Counter {
    id: Arc<MeterId>,
    value: Arc<AtomicU64>,
}

impl Counter {
    pub(crate) fn new(id: MeterId) -> Self {
        Self {
            id: Arc::new(id),
            value: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Increment by 1.
    pub fn increment(&self) {
        self.increment_by(1);
    }

    /// Increment by an arbitrary value.
    pub fn increment_by(&self, v: u64) {
        self.value.fetch_add(v, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn id(&self) -> &MeterId {
        &self.id
    }
}

/// Settable signed gauge.
#[derive(Debug, Clone)]
pub struct Gauge {
    id: Arc<MeterId>,
    value: Arc<AtomicI64>,
}

impl Gauge {
    pub(crate) fn new(id: MeterId) -> Self {
        Self {
            id: Arc::new(id),
            value: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    /// Add an arbitrary signed delta.
    pub fn add(&self, v: i64) {
        self.value.fetch_add(v, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn decrement(&self) {
        self.add(-1);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn id(&self) -> &MeterId {
        &self.id
    }
}

/// Cumulative bucket counters. `bounds` are upper bounds in nanoseconds.
#[derive(Debug)]
struct Buckets {
    bounds: Box<[u64]>,
    counts: Box<[AtomicU64]>,
}

impl Buckets {
    fn new(bounds: &[u64]) -> Self {
        Self {
            bounds: bounds.into(),
            counts: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn observe(&self, nanos: u64) {
        // Cumulative: every bucket whose bound covers the value.
        for (&b, count) in self.bounds.iter().zip(self.counts.iter()) {
            if nanos <= b {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[derive(Debug)]
struct TimerCell {
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
    buckets: Option<Buckets>,
}

/// Duration recorder: count, total and max, plus optional histogram buckets.
#[derive(Debug, Clone)]
pub struct Timer {
    id: Arc<MeterId>,
    cell: Arc<TimerCell>,
}

impl Timer {
    /// `bucket_bounds` in nanoseconds, ascending; `None` disables the histogram.
    pub(crate) fn new(id: MeterId, bucket_bounds: Option<&[u64]>) -> Self {
        Self {
            id: Arc::new(id),
            cell: Arc::new(TimerCell {
                count: AtomicU64::new(0),
                total_nanos: AtomicU64::new(0),
                max_nanos: AtomicU64::new(0),
                buckets: bucket_bounds.map(Buckets::new),
            }),
        }
    }

    /// Record one sample.
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        let cell = &self.cell;
        cell.count.fetch_add(1, Ordering::Relaxed);
        cell.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        cell.max_nanos.fetch_max(nanos, Ordering::Relaxed);
        if let Some(buckets) = &cell.buckets {
            buckets.observe(nanos);
        }
    }

    pub fn count(&self) -> u64 {
        self.cell.count.load(Ordering::Relaxed)
    }

    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.cell.total_nanos.load(Ordering::Relaxed))
    }

    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.cell.max_nanos.load(Ordering::Relaxed))
    }

    pub fn mean(&self) -> Duration {
        match self.count() {
            0 => Duration::ZERO,
            n => self.total_time() / u32::try_from(n).unwrap_or(u32::MAX),
        }
    }

    pub fn has_histogram(&self) -> bool {
        self.cell.buckets.is_some()
    }

    pub fn id(&self) -> &MeterId {
        &self.id
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let buckets = self
            .cell
            .buckets
            .as_ref()
            .map(|b| {
                b.bounds
                    .iter()
                    .zip(b.counts.iter())
                    .map(|(&bound, c)| (Duration::from_nanos(bound), c.load(Ordering::Relaxed)))
                    .collect()
            })
            .unwrap_or_default();
        TimerSnapshot {
            count: self.count(),
            total: self.total_time(),
            max: self.max(),
            buckets,
        }
    }
}

/// Point-in-time view of a timer.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
    /// Cumulative `(upper bound, count)` pairs; empty without a histogram.
    pub buckets: Vec<(Duration, u64)>,
}

/// Type-erased meter as stored by the registry.
#[derive(Debug, Clone)]
pub enum Meter {
    Counter(Counter),
    Gauge(Gauge),
    Timer(Timer),
}

impl Meter {
    pub fn kind(&self) -> MeterKind {
        match self {
            Meter::Counter(_) => MeterKind::Counter,
            Meter::Gauge(_) => MeterKind::Gauge,
            Meter::Timer(_) => MeterKind::Timer,
        }
    }

    pub fn id(&self) -> &MeterId {
        match self {
            Meter::Counter(c) => c.id(),
            Meter::Gauge(g) => g.id(),
            Meter::Timer(t) => t.id(),
        }
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        let value = match self {
            Meter::Counter(c) => MeterValue::Counter(c.count()),
            Meter::Gauge(g) => MeterValue::Gauge(g.value()),
            Meter::Timer(t) => MeterValue::Timer(t.snapshot()),
        };
        MeterSnapshot {
            id: self.id().clone(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeterValue {
    Counter(u64),
    Gauge(i64),
    Timer(TimerSnapshot),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeterSnapshot {
    pub id: MeterId,
    pub value: MeterValue,
}

impl MeterSnapshot {
    pub fn kind(&self) -> MeterKind {
        match self.value {
            MeterValue::Counter(_) => MeterKind::Counter,
            MeterValue::Gauge(_) => MeterKind::Gauge,
            MeterValue::Timer(_) => MeterKind::Timer,
        }
    }
}
