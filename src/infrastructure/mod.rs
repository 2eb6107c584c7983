//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete storage backends.
//!
//! # Modules
//!
//! - [`persistence`] - Memory and PostgreSQL repository implementations

pub mod persistence;
