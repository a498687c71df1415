//! bankmeter core: meter registry, common tags, timed operations and the
//! Prometheus text renderer.
//!
//! This crate carries no HTTP or async-runtime dependencies so it can be
//! embedded by any part of the banking application that records metrics.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Recording a sample must never disturb the operation being measured, so
//! every fallible path surfaces as `MetricsError`/`Result` or is logged.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod customizer;
pub mod error;
pub mod meter;
pub mod prometheus;
pub mod registry;
pub mod tags;
pub mod timed;

/// Shared result type.
pub use error::{Result, MetricsError};

pub use customizer::{CommonTags, RegistryCustomizer};
pub use meter::{Counter, Gauge, Meter, MeterKind, Timer};
pub use registry::{MeterRegistry, RegistryConfig, TimerOptions};
pub use tags::{MeterId, Tags};
pub use timed::{Outcome, Timed, TimedAspect};
