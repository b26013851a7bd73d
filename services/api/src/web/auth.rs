//! services/api/src/web/auth.rs
//!
//! Admin authentication: password checks against the configured Argon2 hash,
//! and issuing and verifying the HS256 bearer tokens that guard report generation.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use site_report_core::ReportError;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin@example.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for `Authorization: Bearer <token>`.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The claims carried by an admin token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated admin, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub email: String,
}

//=========================================================================================
// Passwords
//=========================================================================================

/// Hashes a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Checks a password against a PHC string. A malformed hash never verifies.
pub fn verify_password(password: &str, phc_hash: &str) -> bool {
    match PasswordHash::new(phc_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

//=========================================================================================
// Tokens
//=========================================================================================

/// Signs a token for `subject` that expires `auth.token_ttl` after `now`.
pub fn issue_token(
    auth: &AuthConfig,
    subject: &str,
    now: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>), jsonwebtoken::errors::Error> {
    let expires_at = now + auth.token_ttl;
    let claims = Claims {
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )?;
    Ok((token, expires_at))
}

/// Verifies signature, algorithm and expiry, and that the token names the admin.
pub fn verify_token(auth: &AuthConfig, token: &str) -> Result<Claims, ReportError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        let reason = match e.kind() {
            ErrorKind::ExpiredSignature => "token has expired",
            ErrorKind::InvalidSignature => "token signature is invalid",
            ErrorKind::InvalidAlgorithm => "token algorithm is not accepted",
            _ => "token is malformed",
        };
        ReportError::Unauthorized(reason.to_string())
    })?;

    if data.claims.sub != auth.admin_email {
        return Err(ReportError::Unauthorized(
            "token subject is not the admin".to_string(),
        ));
    }
    Ok(data.claims)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/admin/login - Exchange the admin credential for a bearer token
#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed login body", body = crate::web::response::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::web::response::ErrorBody)
    ),
    tag = "Site Report API"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    // 1. Reject bodies that are not the expected JSON
    let Json(req) = payload.map_err(|e| ReportError::malformed("body", e.body_text()))?;
    let auth = &state.config.auth;

    // 2. Verify the credential; the hash is checked even for an unknown email
    let email = req.email.trim().to_lowercase();
    let (password, phc_hash) = (req.password, auth.admin_password_hash.clone());
    let password_ok = tokio::task::spawn_blocking(move || verify_password(&password, &phc_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password check failed: {e}")))?;
    if email != auth.admin_email || !password_ok {
        warn!("Rejected admin login attempt");
        return Err(ReportError::Unauthorized("invalid email or password".to_string()).into());
    }

    // 3. Issue the token
    let (token, expires_at) = issue_token(auth, &auth.admin_email, Utc::now())
        .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))?;
    info!(expires_at = %expires_at, "Admin logged in");

    Ok(Json(LoginResponse { token, expires_at }))
}
