//! Storage contract shared by every link backend.

use std::collections::HashMap;

use crate::domain::entities::{CreatedLink, Link, Resolution};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for owned short links.
///
/// Every implementation must give callers the same observable behavior:
/// original URLs are globally unique regardless of deletion state, short IDs
/// are unique, and deletion is monotonic and owner-scoped.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - in-process map with JSON snapshots
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Stores `original_url` for `owner_id`, or reports the existing link.
    ///
    /// Returns [`CreatedLink::existing`] when the URL is already stored, live or
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for empty or malformed URLs.
    /// Returns [`AppError::IdSpaceExhausted`] when no free short ID was found.
    async fn create(&self, owner_id: &str, original_url: &str) -> Result<CreatedLink, AppError>;

    /// Stores every URL of `original_urls` that is not stored yet.
    ///
    /// Returns the final short ID for each input URL. Either the whole batch is
    /// applied or nothing is.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if any URL is invalid.
    async fn create_batch(
        &self,
        owner_id: &str,
        original_urls: &[String],
    ) -> Result<HashMap<String, String>, AppError>;

    /// Looks up a short ID.
    async fn resolve(&self, short_id: &str) -> Result<Resolution, AppError>;

    /// Lists live links of `owner_id`, most recent first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Link>, AppError>;

    /// Soft-deletes the links in `short_ids` owned by `owner_id`.
    ///
    /// IDs that do not exist, belong to someone else or are already deleted are
    /// ignored. Returns how many links changed state.
    async fn mark_deleted(&self, owner_id: &str, short_ids: &[String]) -> Result<u64, AppError>;

    /// Returns stored links (live and deleted) for the given IDs.
    async fn find_by_short_ids(&self, short_ids: &[String]) -> Result<Vec<Link>, AppError>;

    /// Checks backend liveness.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] when the backend cannot be reached.
    async fn ping(&self) -> Result<(), AppError>;

    /// Releases backend resources and persists pending state.
    async fn shutdown(&self);
}
