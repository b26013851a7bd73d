//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use site_report_core::ReportError;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::auth::{verify_token, AdminSession};
use crate::web::state::AppState;

/// Middleware that validates the admin bearer token.
///
/// If valid, inserts an `AdminSession` into request extensions for handlers to use.
/// If invalid or missing, returns 401 with a JSON error and the handler never runs.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the Authorization header
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ReportError::Unauthorized("missing bearer token".to_string()))?;

    // 2. Strip the Bearer scheme
    let token = bearer_token(header_value)
        .ok_or_else(|| ReportError::Unauthorized("authorization scheme must be Bearer".to_string()))?;

    // 3. Verify signature, expiry and subject
    let claims = verify_token(&state.config.auth, token)?;

    // 4. Insert the session into request extensions
    req.extensions_mut().insert(AdminSession { email: claims.sub });

    // 5. Continue to the handler
    Ok(next.run(req).await)
}

/// Returns the token of a `Bearer <token>` header; the scheme is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
