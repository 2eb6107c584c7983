//! Link entity and the value types produced by store operations.

use chrono::{DateTime, Utc};

/// A shortened URL owned by an identity.
///
/// Links are never physically removed. `is_deleted` only ever moves from
/// `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub short_id: String,
    pub original_url: String,
    /// Empty for anonymous links, which nobody can delete.
    pub owner_id: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(
        id: i64,
        short_id: String,
        original_url: String,
        owner_id: String,
        is_deleted: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            short_id,
            original_url,
            owner_id,
            is_deleted,
            created_at,
        }
    }

    /// Returns true if `owner_id` may soft-delete this link.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        !owner_id.is_empty() && self.owner_id == owner_id
    }
}

/// Outcome of a create call.
///
/// `conflict == true` means the URL was already stored and `short_id` is the
/// previously allocated ID. It is an idempotent success, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
    pub short_id: String,
    pub conflict: bool,
}

impl CreatedLink {
    pub fn created(short_id: String) -> Self {
        Self {
            short_id,
            conflict: false,
        }
    }

    pub fn existing(short_id: String) -> Self {
        Self {
            short_id,
            conflict: true,
        }
    }
}

/// Three-way result of resolving a short ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No link was ever created with this ID.
    NotFound,
    /// The link exists and is live.
    Live(String),
    /// The link exists but its owner deleted it.
    Deleted,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Resolution::Deleted)
    }

    pub fn original_url(&self) -> Option<&str> {
        match self {
            Resolution::Live(url) => Some(url),
            _ => None,
        }
    }
}

/// A live link as presented to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerLink {
    pub short_url: String,
    pub original_url: String,
}

/// One entry of a bulk-create request.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// One entry of a bulk-create response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub correlation_id: String,
    pub short_url: String,
}
