//! HTTP middleware for request processing.
//!
//! Provides owner identity resolution and observability middleware.

pub mod identity;
pub mod tracing;

pub use identity::Owner;
