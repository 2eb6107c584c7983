//! Business logic services for the application layer.

pub mod identity_service;
pub mod link_service;

pub use identity_service::{IdentityService, IssuedIdentity};
pub use link_service::{LinkService, ShortenOutcome};
