//! Handlers for liveness and health endpoints.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Reports whether the storage backend is reachable.
///
/// # Endpoint
///
/// `GET /ping`
///
/// # Response Codes
///
/// - **200 OK**: storage and delete pipeline are up
/// - **500 Internal Server Error**: either is down
pub async fn ping_handler(State(state): State<AppState>) -> StatusCode {
    match state.link_service.health().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "storage": { "status": "ok", "message": "Connected" },
///     "delete_queue": { "status": "ok", "message": "Free slots: 1000" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage = match state.link_service.ping_storage().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(e.to_string()),
    };

    let delete_queue = match state.link_service.delete_queue_slots() {
        Some(free) => CheckStatus::ok(format!("Free slots: {free}")),
        None => CheckStatus::error("Delete queue is closed"),
    };

    let all_healthy = storage.is_ok() && delete_queue.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            storage,
            delete_queue,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
