//! bankmeter service library entry.
//!
//! This crate wires config loading, metrics startup, and the operational
//! HTTP surface into a cohesive service. It is intended to be consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
