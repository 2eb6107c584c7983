//! DTOs for link shortening endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{BatchItem, BatchOutcome};

/// Request to shorten a single URL.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ShortenRequest {
    /// The original URL to shorten.
    #[validate(length(min = 1, message = "URL cannot be empty"))]
    pub url: String,
}

/// Response with the short URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

/// One entry of a batch shortening request.
///
/// Entries with an invalid URL are dropped from the response, not rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

impl From<BatchRequestItem> for BatchItem {
    fn from(item: BatchRequestItem) -> Self {
        BatchItem {
            correlation_id: item.correlation_id,
            original_url: item.original_url,
        }
    }
}

/// One entry of a batch shortening response.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}

impl From<BatchOutcome> for BatchResponseItem {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            correlation_id: outcome.correlation_id,
            short_url: outcome.short_url,
        }
    }
}
