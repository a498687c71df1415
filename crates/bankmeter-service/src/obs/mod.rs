//! HTTP-level observability.
//!
//! Request timing is recorded straight into the shared registry, so the
//! scrape endpoint reports `http.server.requests` alongside application
//! timers, all carrying the common tags.

pub mod http;
