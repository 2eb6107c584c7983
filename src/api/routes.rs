//! API route configuration.
//!
//! Every route here runs behind [`crate::api::middleware::identity`], so
//! handlers always receive an [`crate::api::middleware::Owner`].

use crate::api::handlers::{
    delete_user_urls_handler, list_user_urls_handler, shorten_batch_handler,
    shorten_json_handler, shorten_text_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Routes that act on behalf of an owner.
///
/// # Endpoints
///
/// - `POST   /`                   - Shorten a plain-text URL
/// - `POST   /api/shorten`        - Shorten a JSON `{ "url" }`
/// - `POST   /api/shorten/batch`  - Shorten many URLs
/// - `GET    /api/user/urls`      - List the caller's links
/// - `DELETE /api/user/urls`      - Queue deletion of the caller's links
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(shorten_text_handler))
        .route("/api/shorten", post(shorten_json_handler))
        .route("/api/shorten/batch", post(shorten_batch_handler))
        .route(
            "/api/user/urls",
            get(list_user_urls_handler).delete(delete_user_urls_handler),
        )
}
