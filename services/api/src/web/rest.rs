//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::auth::{AdminSession, LoginRequest, LoginResponse};
use crate::web::multipart::decode_report_request;
use crate::web::response::{pdf_response, ErrorBody, ErrorDetail};
use crate::web::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Serialize;
use site_report_core::{compile_report, ReportError};
use std::sync::Arc;
use tracing::{info, Instrument};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::login_handler,
        generate_report_handler,
        health_handler,
    ),
    components(
        schemas(LoginRequest, LoginResponse, ErrorBody, ErrorDetail, HealthResponse)
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Site Report API", description = "Admin endpoints for generating construction progress reports.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The liveness probe payload.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    status: &'static str,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate a progress report PDF.
///
/// Accepts a multipart/form-data request with the text fields `clientName`,
/// `projectName`, `location`, `startDate`, `endDate`, `description`,
/// `observations`, `services` (a JSON array) and an optional `generatedOn`,
/// plus any number of `images` parts.
#[utoipa::path(
    post,
    path = "/api/admin/generate-report",
    request_body(content_type = "multipart/form-data", description = "The report form and its photos."),
    responses(
        (status = 200, description = "The finished report", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Malformed form or invalid attachment", body = ErrorBody),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorBody),
        (status = 413, description = "Payload too large", body = ErrorBody),
        (status = 422, description = "Validation failed or an image could not be decoded", body = ErrorBody),
        (status = 500, description = "The PDF could not be rendered", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Site Report API"
)]
pub async fn generate_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AdminSession>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("generate_report", %request_id, admin = %session.email);

    async move {
        // 1. Decode the multipart form
        let multipart = multipart.map_err(|e| ReportError::malformed("body", e.body_text()))?;
        let request = decode_report_request(multipart, &state.config.upload).await?;

        // 2. Build and render the report
        let report = compile_report(
            request,
            state.image_decoder.as_ref(),
            state.renderer.as_ref(),
        )
        .await?;

        // 3. Stream the PDF back
        info!(
            pages = report.page_count,
            bytes = report.pdf.len(),
            "Report generated"
        );
        Ok::<_, ApiError>(pdf_response(report))
    }
    .instrument(span)
    .await
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "The service is up", body = HealthResponse)
    ),
    tag = "Site Report API"
)]
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
