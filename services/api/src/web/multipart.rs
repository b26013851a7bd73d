//! services/api/src/web/multipart.rs
//!
//! The Multipart Request Decoder: turns the report form into a `ReportRequest`.
//!
//! Parts are read chunk by chunk against the upload limits, so an oversize
//! attachment is rejected before it is ever fully buffered.

use axum::{
    extract::multipart::{Field, Multipart, MultipartError},
    http::StatusCode,
};
use serde::Deserialize;
use site_report_core::{ImageAttachment, ReportError, ReportRequest, ReportResult, ServiceEntryInput};
use std::collections::HashMap;
use tracing::debug;

use crate::config::UploadLimits;

/// Canonical MIME types accepted for photos.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

const REQUIRED_TEXT_FIELDS: [&str; 8] = [
    "clientName",
    "projectName",
    "location",
    "startDate",
    "endDate",
    "description",
    "observations",
    "services",
];

//=========================================================================================
// Services JSON
//=========================================================================================

/// Clients send ids as strings, but some form builders emit plain numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum ServiceId {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceEntryDto {
    id: ServiceId,
    name: String,
    start_date: String,
    end_date: String,
}

impl From<ServiceEntryDto> for ServiceEntryInput {
    fn from(dto: ServiceEntryDto) -> Self {
        Self {
            id: match dto.id {
                ServiceId::Text(id) => id,
                ServiceId::Number(id) => id.to_string(),
            },
            name: dto.name,
            start_date: dto.start_date,
            end_date: dto.end_date,
        }
    }
}

/// Parses the `services` field. Any shape error rejects the whole array.
pub fn parse_services(raw: &str) -> ReportResult<Vec<ServiceEntryInput>> {
    let entries: Vec<ServiceEntryDto> = serde_json::from_str(raw)
        .map_err(|e| ReportError::malformed("services", format!("expected a JSON array of services: {e}")))?;
    Ok(entries.into_iter().map(ServiceEntryInput::from).collect())
}

//=========================================================================================
// MIME Types
//=========================================================================================

/// Lowercases, drops parameters and resolves aliases. Returns `None` for types
/// outside the allow-list.
pub fn normalize_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let essence = if essence == "image/jpg" { "image/jpeg".to_string() } else { essence };
    ALLOWED_IMAGE_TYPES.iter().copied().find(|allowed| *allowed == essence)
}

//=========================================================================================
// Decoder
//=========================================================================================

/// Tracks the bytes read so far across all parts of one submission.
struct PayloadBudget {
    used: usize,
    limit: usize,
}

impl PayloadBudget {
    fn spend(&mut self, bytes: usize) -> ReportResult<()> {
        self.used = self.used.saturating_add(bytes);
        if self.used > self.limit {
            return Err(ReportError::PayloadTooLarge { limit: self.limit });
        }
        Ok(())
    }
}

fn transport_error(err: MultipartError, limits: &UploadLimits) -> ReportError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ReportError::PayloadTooLarge {
            limit: limits.max_payload_bytes,
        }
    } else {
        ReportError::malformed("body", err.body_text())
    }
}

/// Reads the whole form. Image parts are those named `images` or `images[]`,
/// or any part that carries a filename.
pub async fn decode_report_request(
    mut multipart: Multipart,
    limits: &UploadLimits,
) -> ReportResult<ReportRequest> {
    let mut budget = PayloadBudget {
        used: 0,
        limit: limits.max_payload_bytes,
    };
    let mut texts: HashMap<String, String> = HashMap::new();
    let mut images: Vec<ImageAttachment> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| transport_error(e, limits))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let is_image = name == "images" || name == "images[]" || field.file_name().is_some();

        if is_image {
            let attachment = read_image(field, images.len(), limits, &mut budget).await?;
            images.push(attachment);
        } else {
            let value = read_text(field, &name, limits, &mut budget).await?;
            // Duplicate text fields: the last value wins.
            texts.insert(name, value);
        }
    }

    for required in REQUIRED_TEXT_FIELDS {
        if !texts.contains_key(required) {
            return Err(ReportError::malformed(required, "field is required"));
        }
    }
    let mut take = |key: &str| texts.remove(key).unwrap_or_default();

    let services = parse_services(&take("services"))?;
    let generated_on = Some(take("generatedOn")).filter(|value| !value.trim().is_empty());

    debug!(
        services = services.len(),
        images = images.len(),
        payload_bytes = budget.used,
        "Decoded report form"
    );

    Ok(ReportRequest {
        client_name: take("clientName"),
        project_name: take("projectName"),
        location: take("location"),
        start_date: take("startDate"),
        end_date: take("endDate"),
        description: take("description"),
        observations: take("observations"),
        services,
        images,
        generated_on,
    })
}

async fn read_text(
    mut field: Field<'_>,
    name: &str,
    limits: &UploadLimits,
    budget: &mut PayloadBudget,
) -> ReportResult<String> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| transport_error(e, limits))? {
        budget.spend(chunk.len())?;
        data.extend_from_slice(&chunk);
    }
    String::from_utf8(data).map_err(|_| ReportError::malformed(name, "value is not valid UTF-8"))
}

async fn read_image(
    mut field: Field<'_>,
    index: usize,
    limits: &UploadLimits,
    budget: &mut PayloadBudget,
) -> ReportResult<ImageAttachment> {
    let file_name = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("image-{}", index + 1));

    // 1. Count and type are known before any bytes are read
    if index >= limits.max_images {
        return Err(ReportError::invalid_attachment(
            file_name,
            format!("at most {} images may be attached", limits.max_images),
        ));
    }
    let declared = field.content_type().unwrap_or_default().to_string();
    let content_type = normalize_mime(&declared).ok_or_else(|| {
        ReportError::invalid_attachment(
            &file_name,
            format!(
                "content type '{}' is not one of {}",
                declared,
                ALLOWED_IMAGE_TYPES.join(", ")
            ),
        )
    })?;

    // 2. Stream the body against both ceilings
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| transport_error(e, limits))? {
        if data.len() + chunk.len() > limits.max_image_bytes {
            return Err(ReportError::invalid_attachment(
                &file_name,
                format!("file exceeds the limit of {} bytes", limits.max_image_bytes),
            ));
        }
        budget.spend(chunk.len())?;
        data.extend_from_slice(&chunk);
    }

    if data.is_empty() {
        return Err(ReportError::invalid_attachment(&file_name, "file is empty"));
    }

    Ok(ImageAttachment {
        file_name,
        content_type: content_type.to_string(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types_are_normalized() {
        assert_eq!(normalize_mime("image/png"), Some("image/png"));
        assert_eq!(normalize_mime("IMAGE/JPEG; charset=binary"), Some("image/jpeg"));
        assert_eq!(normalize_mime("image/jpg"), Some("image/jpeg"));
        assert_eq!(normalize_mime(" image/webp "), Some("image/webp"));
        assert_eq!(normalize_mime("image/gif"), Some("image/gif"));
        assert_eq!(normalize_mime("image/bmp"), None);
        assert_eq!(normalize_mime("application/pdf"), None);
        assert_eq!(normalize_mime(""), None);
    }

    #[test]
    fn services_keep_their_order_and_accept_numeric_ids() {
        let services = parse_services(
            r#"[
                {"id": "a1", "name": "Excavation", "startDate": "2024-01-01", "endDate": "2024-01-03"},
                {"id": 7, "name": "Piling", "startDate": "2024-01-04", "endDate": "2024-01-09"}
            ]"#,
        )
        .unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].id, "a1");
        assert_eq!(services[0].name, "Excavation");
        assert_eq!(services[1].id, "7");
        assert_eq!(services[1].end_date, "2024-01-09");
    }

    #[test]
    fn empty_service_array_is_accepted() {
        assert!(parse_services("[]").unwrap().is_empty());
    }

    #[test]
    fn bad_services_json_names_the_field() {
        for raw in [
            "not json",
            r#"{"id": "1"}"#,
            r#"[{"id": "1", "name": "Roofing", "startDate": "2024-01-01"}]"#,
            r#"[{"id": true, "name": "Roofing", "startDate": "2024-01-01", "endDate": "2024-01-02"}]"#,
        ] {
            let err = parse_services(raw).unwrap_err();
            assert_eq!(err.field(), Some("services"), "input: {raw}");
            assert_eq!(err.code(), "MALFORMED_REQUEST");
        }
    }

    #[test]
    fn payload_budget_trips_past_the_limit() {
        let mut budget = PayloadBudget { used: 0, limit: 10 };
        assert!(budget.spend(6).is_ok());
        assert!(budget.spend(4).is_ok());
        assert_eq!(
            budget.spend(1).unwrap_err(),
            ReportError::PayloadTooLarge { limit: 10 }
        );
    }
}
