//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use educare_core::domain::Caller;
use std::sync::Arc;
use tracing::{error, warn};

use crate::web::rest::{failure, ApiFailure};
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Extracts the auth session id from the `session` cookie, falling back to a
/// `Bearer` token in the `Authorization` header for non-browser clients.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|c| {
                c.trim()
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
            })
        })
        .filter(|id| !id.is_empty());

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|id| !id.is_empty())
        })
        .map(str::to_string)
}

/// Middleware that validates the auth session and resolves the caller.
///
/// If valid, inserts a `Caller` (user id and role) into request extensions for
/// handlers to use. If invalid or missing, returns 401 Unauthorized with an
/// error envelope.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiFailure> {
    // 1. Find the session id
    let auth_session_id = session_id_from_headers(req.headers())
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Not logged in"))?;

    // 2. Validate auth session in database, get user_id
    let user_id = state
        .db
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {}", e);
            failure(StatusCode::UNAUTHORIZED, "Session expired or invalid")
        })?;

    // 3. Load the role of the session owner
    let user = state.db.get_user_by_id(user_id).await.map_err(|e| {
        error!("Failed to load user {} for a valid session: {:?}", user_id, e);
        failure(StatusCode::UNAUTHORIZED, "Session expired or invalid")
    })?;

    // 4. Insert the caller into request extensions
    req.extensions_mut().insert(Caller::new(user.id, user.role));

    Ok(next.run(req).await)
}
