//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables once at startup and is
//! read-only afterwards. The `.env` file is used for local development.

use argon2::password_hash::PasswordHash;
use axum::http::HeaderValue;
use chrono::Duration;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// Per-file ceiling for image attachments.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;
/// Ceiling for all decoded text and image bytes of one submission.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 32 * 1024 * 1024;
pub const DEFAULT_MAX_IMAGES: usize = 24;
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 480;
const MIN_JWT_SECRET_BYTES: usize = 32;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The single admin credential and token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub admin_email: String,
    /// Argon2 PHC string produced by the `hash-password` binary.
    pub admin_password_hash: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_email", &self.admin_email)
            .field("admin_password_hash", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Bounds on one report submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_image_bytes: usize,
    pub max_payload_bytes: usize,
    pub max_images: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_images: DEFAULT_MAX_IMAGES,
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_allowed_origin: HeaderValue,
    pub auth: AuthConfig,
    pub upload: UploadLimits,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address: SocketAddr = parse_or("BIND_ADDRESS", "0.0.0.0:3000".parse().ok())?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let origin = std::env::var("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let cors_allowed_origin = HeaderValue::from_str(&origin).map_err(|e| {
            ConfigError::InvalidValue("CORS_ALLOWED_ORIGIN".to_string(), e.to_string())
        })?;

        // --- Load the Admin Credential ---
        let admin_email = required("ADMIN_EMAIL")?.trim().to_lowercase();
        let admin_password_hash = required("ADMIN_PASSWORD_HASH")?;
        PasswordHash::new(&admin_password_hash).map_err(|e| {
            ConfigError::InvalidValue("ADMIN_PASSWORD_HASH".to_string(), e.to_string())
        })?;

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                format!("must be at least {MIN_JWT_SECRET_BYTES} bytes long"),
            ));
        }

        let ttl_minutes: i64 = parse_or("TOKEN_TTL_MINUTES", Some(DEFAULT_TOKEN_TTL_MINUTES))?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }

        // --- Load Upload Limits ---
        let upload = UploadLimits {
            max_image_bytes: parse_or("MAX_IMAGE_BYTES", Some(DEFAULT_MAX_IMAGE_BYTES))?,
            max_payload_bytes: parse_or("MAX_PAYLOAD_BYTES", Some(DEFAULT_MAX_PAYLOAD_BYTES))?,
            max_images: parse_or("MAX_IMAGES", Some(DEFAULT_MAX_IMAGES))?,
        };
        if upload.max_image_bytes > upload.max_payload_bytes {
            return Err(ConfigError::InvalidValue(
                "MAX_IMAGE_BYTES".to_string(),
                "must not exceed MAX_PAYLOAD_BYTES".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            log_level,
            cors_allowed_origin,
            auth: AuthConfig {
                admin_email,
                admin_password_hash,
                jwt_secret,
                token_ttl: Duration::minutes(ttl_minutes),
            },
            upload,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

/// Parses an optional variable, falling back to `default` when unset.
fn parse_or<T>(name: &str, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => default.ok_or_else(|| ConfigError::MissingVar(name.to_string())),
    }
}
