//! crates/site_report_core/src/error.rs
//!
//! The error taxonomy shared by every stage of the report pipeline.

use std::fmt;

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Auth,
    Decode,
    Validate,
    Render,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Auth => "auth",
            Stage::Decode => "decode",
            Stage::Validate => "validate",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way a report request can fail. Each stage fails fast with one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// Missing, malformed, forged or expired bearer token, or bad login credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Malformed request field '{field}': {reason}")]
    MalformedRequest { field: String, reason: String },

    #[error("Invalid attachment '{file}': {reason}")]
    InvalidAttachment { file: String, reason: String },

    #[error("Payload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Unreadable image '{file}': {reason}")]
    UnreadableImage { file: String, reason: String },

    #[error("Render error: {0}")]
    Render(String),
}

impl ReportError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_attachment(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttachment {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unreadable_image(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnreadableImage {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ReportError::Unauthorized(_) => Stage::Auth,
            ReportError::MalformedRequest { .. }
            | ReportError::InvalidAttachment { .. }
            | ReportError::PayloadTooLarge { .. } => Stage::Decode,
            ReportError::Validation { .. } | ReportError::UnreadableImage { .. } => {
                Stage::Validate
            }
            ReportError::Render(_) => Stage::Render,
        }
    }

    /// Machine-readable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::Unauthorized(_) => "UNAUTHORIZED",
            ReportError::MalformedRequest { .. } => "MALFORMED_REQUEST",
            ReportError::InvalidAttachment { .. } => "INVALID_ATTACHMENT",
            ReportError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ReportError::Validation { .. } => "VALIDATION_ERROR",
            ReportError::UnreadableImage { .. } => "UNREADABLE_IMAGE",
            ReportError::Render(_) => "RENDER_ERROR",
        }
    }

    /// The offending form field, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ReportError::MalformedRequest { field, .. } | ReportError::Validation { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }

    /// The offending attachment, when there is one.
    pub fn file(&self) -> Option<&str> {
        match self {
            ReportError::InvalidAttachment { file, .. }
            | ReportError::UnreadableImage { file, .. } => Some(file),
            _ => None,
        }
    }

    /// True for failures the caller caused.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ReportError::Render(_))
    }
}

/// A convenience type alias for `Result<T, ReportError>`.
pub type ReportResult<T> = Result<T, ReportError>;
