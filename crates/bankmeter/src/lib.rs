//! Top-level facade crate for bankmeter.
//!
//! Re-exports the core registry types and the service library so users can
//! depend on a single crate.

pub mod core {
    pub use bankmeter_core::*;
}

pub mod service {
    pub use bankmeter_service::*;
}
