//! services/api/src/web/response.rs
//!
//! The Response Emitter: turns a compiled report into a PDF download, and any
//! pipeline failure into a structured JSON error. The two never mix.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::Serialize;
use site_report_core::{CompiledReport, DateRange, ReportError};
use std::sync::LazyLock;
use tracing::{error, warn};
use utoipa::ToSchema;

const MAX_FILENAME_STEM_CHARS: usize = 80;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("filename pattern is valid"));

//=========================================================================================
// Error Payloads
//=========================================================================================

/// The JSON envelope for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Pipeline stage that failed: `auth`, `decode`, `validate`, `render` or `internal`.
    #[schema(example = "validate")]
    pub stage: String,
    /// Machine-readable error code.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,
    pub message: String,
    /// The offending form field, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "dateRange")]
    pub field: Option<String>,
    /// The offending attachment, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

pub fn status_for(err: &ReportError) -> StatusCode {
    match err {
        ReportError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ReportError::MalformedRequest { .. } | ReportError::InvalidAttachment { .. } => {
            StatusCode::BAD_REQUEST
        }
        ReportError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ReportError::Validation { .. } | ReportError::UnreadableImage { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ReportError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn report_error_response(err: &ReportError) -> Response {
    let status = status_for(err);
    if err.is_client_error() {
        warn!(stage = %err.stage(), code = err.code(), "Rejected request: {}", err);
    } else {
        error!(stage = %err.stage(), code = err.code(), "Report generation failed: {}", err);
    }

    let body = ErrorBody {
        error: ErrorDetail {
            stage: err.stage().to_string(),
            code: err.code().to_string(),
            message: err.to_string(),
            field: err.field().map(str::to_string),
            file: err.file().map(str::to_string),
        },
    };
    (status, Json(body)).into_response()
}

pub fn internal_error_response() -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            stage: "internal".to_string(),
            code: "INTERNAL_ERROR".to_string(),
            message: "An unexpected internal error occurred".to_string(),
            field: None,
            file: None,
        },
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

//=========================================================================================
// PDF Download
//=========================================================================================

/// Builds `<project>_<start>_<end>.pdf` using only `[A-Za-z0-9_-]`.
pub fn report_filename(project_name: &str, period: &DateRange) -> String {
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(project_name, "_");
    let stem: String = replaced
        .trim_matches('_')
        .chars()
        .take(MAX_FILENAME_STEM_CHARS)
        .collect();
    let stem = match stem.trim_end_matches('_') {
        "" => "report",
        trimmed => trimmed,
    };
    format!(
        "{}_{}_{}.pdf",
        stem,
        period.start.format("%Y-%m-%d"),
        period.end.format("%Y-%m-%d")
    )
}

pub fn pdf_response(report: CompiledReport) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        report_filename(&report.project_name, &report.period)
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        report.pdf,
    )
        .into_response()
}
