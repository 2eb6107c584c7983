//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use serde_json::json;
use tracing::info;

use crate::domain::entities::Resolution;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short ID to its original URL.
///
/// # Endpoint
///
/// `GET /{short_id}`
///
/// # Errors
///
/// Returns 404 Not Found if the short ID was never issued.
/// Returns 410 Gone if its owner deleted it.
pub async fn redirect_handler(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    match state.link_service.resolve(&short_id).await? {
        Resolution::Live(original_url) => Ok(Redirect::temporary(&original_url)),
        Resolution::Deleted => {
            info!(short_id = %short_id, "Access to deleted URL");
            Err(AppError::gone(
                "Short link was deleted",
                json!({ "short_id": short_id }),
            ))
        }
        Resolution::NotFound => Err(AppError::not_found(
            "Short link not found",
            json!({ "short_id": short_id }),
        )),
    }
}
