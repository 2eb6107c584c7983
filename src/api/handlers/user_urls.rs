//! Handlers for the caller's own links.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, info};

use crate::api::dto::user_urls::UserUrlItem;
use crate::api::middleware::Owner;
use crate::error::AppError;
use crate::state::AppState;

/// Lists the caller's live links, most recent first.
///
/// # Endpoint
///
/// `GET /api/user/urls`
///
/// # Response Codes
///
/// - **200 OK**: JSON array of `{ "short_url", "original_url" }`
/// - **204 No Content**: the caller has no live links
pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
) -> Result<Response, AppError> {
    let links = state.link_service.list_owner_links(&owner_id).await?;

    if links.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let items: Vec<UserUrlItem> = links.into_iter().map(UserUrlItem::from).collect();
    Ok(Json(items).into_response())
}

/// Queues deletion of the caller's links.
///
/// # Endpoint
///
/// `DELETE /api/user/urls`
///
/// # Request Body
///
/// ```json
/// ["Ab3dE_9z", "Xy7_kLm2"]
/// ```
///
/// Returns `202 Accepted` once the request is queued. IDs that are unknown or
/// belong to someone else are ignored.
///
/// # Errors
///
/// Returns 400 Bad Request for malformed JSON or an empty list.
/// Returns 503 Service Unavailable when the delete queue is saturated.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(short_ids) = payload?;

    if short_ids.is_empty() {
        return Err(AppError::bad_request(
            "Empty delete request",
            json!({}),
        ));
    }

    info!(owner_id = %owner_id, count = short_ids.len(), "Delete request received");

    if let Ok(found) = state.link_service.lookup(&short_ids).await {
        let foreign = found.iter().filter(|link| !link.is_owned_by(&owner_id)).count();
        let unknown = short_ids.len().saturating_sub(found.len());
        if foreign > 0 || unknown > 0 {
            debug!(owner_id = %owner_id, foreign, unknown, "Delete request has IDs that will be ignored");
        }
    }

    state
        .link_service
        .enqueue_delete(&owner_id, short_ids)
        .await?;

    Ok(StatusCode::ACCEPTED)
}
