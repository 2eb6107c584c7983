//! Cookie-based owner identity middleware.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// Name of the cookie carrying the signed identity token.
pub const IDENTITY_COOKIE: &str = "user_id";

/// One year, in seconds.
const COOKIE_MAX_AGE: u64 = 365 * 24 * 60 * 60;

/// Owner id of the current request, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

/// Resolves the caller's identity from the `user_id` cookie.
///
/// # Cookie Format
///
/// ```text
/// Cookie: user_id=<owner_id>.<hex hmac>
/// ```
///
/// # Identity Flow
///
/// 1. Extract `user_id` cookie from request
/// 2. Valid signature: the embedded owner id is used
/// 3. No cookie: a new identity is issued and set on the response
/// 4. Handler receives the owner as an [`Owner`] extension
///
/// # Errors
///
/// Returns `401 Unauthorized` if the cookie is present but its signature does
/// not verify.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, routing::get, middleware};
/// use crate::api::middleware::identity;
///
/// let owned = Router::new()
///     .route("/api/user/urls", get(list_user_urls_handler))
///     .layer(middleware::from_fn_with_state(state.clone(), identity::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = cookie_value(req.headers(), IDENTITY_COOKIE) {
        let Some(owner_id) = st.identity_service.verify(&token) else {
            tracing::warn!("Rejected identity cookie with invalid signature");
            return Err(AppError::unauthorized(
                "Unauthorized",
                json!({ "reason": "Invalid identity cookie" }),
            ));
        };

        req.extensions_mut().insert(Owner(owner_id));
        return Ok(next.run(req).await);
    }

    let issued = st.identity_service.issue();
    tracing::debug!(owner_id = %issued.owner_id, "Issued new identity");
    req.extensions_mut().insert(Owner(issued.owner_id));

    let mut response = next.run(req).await;
    match HeaderValue::from_str(&identity_cookie(&issued.token)) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode identity cookie"),
    }

    Ok(response)
}

/// Finds cookie `name` among all `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|cookie_header| cookie_header.to_str().ok())
        .find_map(|cookie_str| {
            cookie_str.split(';').find_map(|cookie| {
                let mut parts = cookie.trim().splitn(2, '=');
                match (parts.next(), parts.next()) {
                    (Some(key), Some(value)) if key == name => Some(value.to_string()),
                    _ => None,
                }
            })
        })
}

fn identity_cookie(token: &str) -> String {
    format!("{IDENTITY_COOKIE}={token}; Path=/; Max-Age={COOKIE_MAX_AGE}; HttpOnly; SameSite=Lax")
}
