//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{short_id}`  - Short link redirect (public)
//! - `GET  /ping`        - Storage liveness (public)
//! - `GET  /health`      - Component health as JSON (public)
//! - everything in [`crate::api::routes::owner_routes`] (identity cookie)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Compression** - gzip responses and gzip request bodies
//! - **Identity** - Signed `user_id` cookie, issued on first contact
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, ping_handler, redirect_handler};
use crate::api::middleware::{identity, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the router with every route and middleware except path
/// normalization.
pub fn build_router(state: AppState) -> Router {
    let owner_router = api::routes::owner_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        identity::layer,
    ));

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .route("/{short_id}", get(redirect_handler))
        .merge(owner_router)
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(tracing::layer())
}

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}
