//! Timed operations.
//!
//! `TimedAspect` wraps an operation, measures its wall-clock duration and
//! records exactly one sample per invocation into the shared registry,
//! tagged with `outcome` and `exception`. The wrapped result (or error) is
//! handed back untouched; a failure to record is logged and swallowed.
//!
//! ```text
//! aspect.record(&Timed::new("bank.transfer"), || transfer(from, to, amount))
//!   -> bank_transfer_seconds_count{application="bankapp",exception="none",outcome="success"} 1
//! ```

use std::future::Future;
use std::time::Instant;

use crate::registry::MeterRegistry;
use crate::tags::Tags;

/// Metric name used by `Timed::method`.
pub const DEFAULT_METRIC_NAME: &str = "method.timed";

pub const OUTCOME_TAG: &str = "outcome";
pub const EXCEPTION_TAG: &str = "exception";

/// `exception` tag value for successful invocations.
pub const EXCEPTION_NONE: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
    /// Panicked or dropped before completion.
    Unknown,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
            Outcome::Unknown => "unknown",
        }
    }
}

/// Marker describing how an operation is timed.
#[derive(Debug, Clone)]
pub struct Timed {
    name: String,
    tags: Vec<(String, String)>,
    description: Option<String>,
    histogram: Option<bool>,
}

impl Timed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            description: None,
            histogram: None,
        }
    }

    /// Name derived from the operation itself: `method.timed{class,method}`.
    pub fn method(class: &str, method: &str) -> Self {
        Self::new(DEFAULT_METRIC_NAME).tag("class", class).tag("method", method)
    }

    /// Extra tag. Invalid keys surface as a logged recording failure.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override the registry's histogram default for this timer.
    pub fn histogram(mut self, enabled: bool) -> Self {
        self.histogram = Some(enabled);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Interception adapter bound to the shared registry.
#[derive(Debug, Clone)]
pub struct TimedAspect {
    registry: MeterRegistry,
}

impl TimedAspect {
    pub fn new(registry: &MeterRegistry) -> Self {
        tracing::debug!("timed aspect bound to registry");
        Self {
            registry: registry.clone(),
        }
    }

    pub fn registry(&self) -> &MeterRegistry {
        &self.registry
    }

    /// Start a sample. It records on `success`/`error`, or on drop.
    pub fn start<'a>(&'a self, timed: &'a Timed) -> Sample<'a> {
        Sample {
            aspect: self,
            timed,
            start: Instant::now(),
            done: false,
        }
    }

    /// Time a fallible operation. The result is returned unchanged.
    pub fn record<T, E, F>(&self, timed: &Timed, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let sample = self.start(timed);
        let result = op();
        sample.finish_with(&result);
        result
    }

    /// Time an infallible operation.
    pub fn measure<T, F>(&self, timed: &Timed, op: F) -> T
    where
        F: FnOnce() -> T,
    {
        let sample = self.start(timed);
        let value = op();
        sample.success();
        value
    }

    /// Time a fallible future. Dropping it before completion records `unknown`.
    pub async fn record_async<T, E, Fut>(&self, timed: &Timed, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let sample = self.start(timed);
        let result = fut.await;
        sample.finish_with(&result);
        result
    }

    fn write_sample(&self, timed: &Timed, outcome: Outcome, exception: &str, start: Instant) {
        let elapsed = start.elapsed();
        let tags = timed
            .tags
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain([(EXCEPTION_TAG, exception), (OUTCOME_TAG, outcome.as_str())]);
        let timer = Tags::of(tags).and_then(|tags| {
            self.registry
                .timer_described(&timed.name, tags, timed.histogram, timed.description.as_deref())
        });
        match timer {
            Ok(timer) => timer.record(elapsed),
            Err(e) => {
                tracing::warn!(metric = %timed.name, error = %e, "timed sample dropped");
            }
        }
    }
}

/// In-flight measurement. Records exactly once.
pub struct Sample<'a> {
    aspect: &'a TimedAspect,
    timed: &'a Timed,
    start: Instant,
    done: bool,
}

impl Sample<'_> {
    pub fn success(mut self) {
        self.finish(Outcome::Success, EXCEPTION_NONE);
    }

    /// Record a failure; `exception` names the error kind.
    pub fn error(mut self, exception: &str) {
        self.finish(Outcome::Error, exception);
    }

    fn finish_with<T, E>(self, result: &Result<T, E>) {
        match result {
            Ok(_) => self.success(),
            Err(_) => self.error(simple_type_name::<E>()),
        }
    }

    fn finish(&mut self, outcome: Outcome, exception: &str) {
        if self.done {
            return;
        }
        self.done = true;
        self.aspect.write_sample(self.timed, outcome, exception, self.start);
    }
}

impl Drop for Sample<'_> {
    fn drop(&mut self) {
        let exception = if std::thread::panicking() { "panic" } else { "cancelled" };
        self.finish(Outcome::Unknown, exception);
    }
}

/// `my_app::errors::TransferError<u8>` -> `TransferError`
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}
