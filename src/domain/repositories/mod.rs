//! Repository trait definitions for the domain layer.
//!
//! The link store is expressed as a single capability trait,
//! [`LinkRepository`], implemented by the infrastructure layer. The backend is
//! chosen once at startup and shared as `Arc<dyn LinkRepository>`.
//!
//! # Testing
//!
//! A `mockall` mock is generated under `cfg(test)`. See `tests/repository_*.rs`
//! for backend integration tests.

pub mod link_repository;

pub use link_repository::LinkRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;
