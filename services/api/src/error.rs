//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service.

use axum::response::{IntoResponse, Response};
use site_report_core::ReportError;
use tracing::error;

use crate::config::ConfigError;
use crate::web::response::{internal_error_response, report_error_response};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pipeline failure; these are the errors clients see.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Report(err) => report_error_response(&err),
            other => {
                error!("Request failed with an internal error: {}", other);
                internal_error_response()
            }
        }
    }
}
