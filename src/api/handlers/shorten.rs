//! Handlers for link shortening endpoints.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::shorten::{
    BatchRequestItem, BatchResponseItem, ShortenRequest, ShortenResponse,
};
use crate::api::middleware::Owner;
use crate::domain::entities::BatchItem;
use crate::error::AppError;
use crate::state::AppState;

fn created_or_conflict(conflict: bool) -> StatusCode {
    if conflict {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

/// Shortens a URL sent as the plain-text request body.
///
/// # Endpoint
///
/// `POST /`
///
/// # Response Codes
///
/// - **201 Created**: body is the new short URL
/// - **409 Conflict**: the URL was shortened before; body is the existing short URL
/// - **400 Bad Request**: empty body or invalid URL
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    body: String,
) -> Result<Response, AppError> {
    let original_url = body.trim();
    if original_url.is_empty() {
        return Err(AppError::bad_request("Empty body", json!({})));
    }

    let outcome = state
        .link_service
        .create_link(&owner_id, original_url)
        .await?;

    Ok((
        created_or_conflict(outcome.conflict),
        [(header::CONTENT_TYPE, "text/plain")],
        outcome.short_url,
    )
        .into_response())
}

/// Shortens a URL sent as JSON.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com" }
/// ```
///
/// # Response
///
/// ```json
/// { "result": "http://localhost:8080/Ab3dE_9z" }
/// ```
///
/// Status is `201 Created`, or `409 Conflict` with the existing short URL.
///
/// # Errors
///
/// Returns 400 Bad Request for malformed JSON, an empty or invalid URL.
pub async fn shorten_json_handler(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let outcome = state.link_service.create_link(&owner_id, &payload.url).await?;

    Ok((
        created_or_conflict(outcome.conflict),
        Json(ShortenResponse {
            result: outcome.short_url,
        }),
    ))
}

/// Shortens many URLs in one request.
///
/// # Endpoint
///
/// `POST /api/shorten/batch`
///
/// # Request Body
///
/// ```json
/// [
///   { "correlation_id": "1", "original_url": "https://example.com" }
/// ]
/// ```
///
/// # Response
///
/// `201 Created` with one entry per valid input item, in input order:
///
/// ```json
/// [
///   { "correlation_id": "1", "short_url": "http://localhost:8080/Ab3dE_9z" }
/// ]
/// ```
///
/// URLs shortened earlier keep their existing short URL. Items with an invalid
/// URL are left out.
///
/// # Errors
///
/// Returns 400 Bad Request for an empty batch or when no item is valid.
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    payload: Result<Json<Vec<BatchRequestItem>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<BatchResponseItem>>), AppError> {
    let Json(items) = payload?;

    let outcomes = state
        .link_service
        .create_links_batch(&owner_id, items.into_iter().map(BatchItem::from).collect())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(outcomes.into_iter().map(BatchResponseItem::from).collect()),
    ))
}
