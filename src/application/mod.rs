//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! validation and the deletion pipeline. Services provide a clean API for HTTP
//! handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Create, resolve, list and delete links
//! - [`services::identity_service::IdentityService`] - Signed owner identities

pub mod services;
