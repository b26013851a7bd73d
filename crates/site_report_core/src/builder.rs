//! crates/site_report_core/src/builder.rs
//!
//! The Report Model Builder: validates a raw `ReportRequest` and normalizes it
//! into the canonical `ReportDocument` the compositor consumes.

use chrono::{DateTime, NaiveDate};
use std::collections::HashSet;

use crate::domain::{
    DateRange, PlacedImage, ReportDocument, ReportRequest, ServiceEntry, ServiceEntryInput,
};
use crate::error::{ReportError, ReportResult};
use crate::ports::ImageDecoder;

/// Builds canonical documents, decoding attachments through an `ImageDecoder` port.
pub struct ReportModelBuilder<'a> {
    decoder: &'a dyn ImageDecoder,
}

impl<'a> ReportModelBuilder<'a> {
    pub fn new(decoder: &'a dyn ImageDecoder) -> Self {
        Self { decoder }
    }

    /// Validates every field, then decodes the attachments in arrival order.
    ///
    /// No attachment is decoded unless all text fields pass validation.
    pub async fn build(&self, mut request: ReportRequest) -> ReportResult<ReportDocument> {
        let attachments = std::mem::take(&mut request.images);
        let mut document = normalize_fields(&request)?;

        let mut images = Vec::with_capacity(attachments.len());
        for (slot, attachment) in attachments.into_iter().enumerate() {
            let file_name = match sanitize_line(&attachment.file_name) {
                name if name.is_empty() => format!("image-{}", slot + 1),
                name => name,
            };
            let bitmap = self.decoder.decode(attachment).await?;
            if !bitmap.is_consistent() {
                return Err(ReportError::unreadable_image(
                    file_name,
                    "decoded bitmap does not match its dimensions",
                ));
            }
            images.push(PlacedImage {
                slot,
                file_name,
                bitmap,
            });
        }

        document.images = images;
        Ok(document)
    }
}

/// Runs every text and date check and returns a document without images.
///
/// Checks run in a fixed order and the first violation is reported:
/// report dates, report range, each service in array order, service id
/// uniqueness, client and project names, then the optional generation date.
pub fn normalize_fields(request: &ReportRequest) -> ReportResult<ReportDocument> {
    let start = parse_date(&request.start_date)
        .ok_or_else(|| unparseable("startDate", &request.start_date))?;
    let end =
        parse_date(&request.end_date).ok_or_else(|| unparseable("endDate", &request.end_date))?;
    let period = DateRange::new(start, end).ok_or_else(|| inverted("dateRange", start, end))?;

    let services = request
        .services
        .iter()
        .enumerate()
        .map(|(index, entry)| normalize_service(index, entry))
        .collect::<ReportResult<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for (index, service) in services.iter().enumerate() {
        if !seen.insert(service.id.as_str()) {
            return Err(ReportError::validation(
                format!("services[{index}].id"),
                format!("duplicate service id '{}'", service.id),
            ));
        }
    }

    let client_name = sanitize_line(&request.client_name);
    if client_name.is_empty() {
        return Err(ReportError::validation("clientName", "must not be empty"));
    }
    let project_name = sanitize_line(&request.project_name);
    if project_name.is_empty() {
        return Err(ReportError::validation("projectName", "must not be empty"));
    }

    let generated_on = match request.generated_on.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_date(raw).ok_or_else(|| unparseable("generatedOn", raw))?),
    };

    Ok(ReportDocument {
        client_name,
        project_name,
        location: sanitize_line(&request.location),
        period,
        description: sanitize_block(&request.description),
        observations: sanitize_block(&request.observations),
        services,
        images: Vec::new(),
        generated_on,
    })
}

fn normalize_service(index: usize, entry: &ServiceEntryInput) -> ReportResult<ServiceEntry> {
    let field = |name: &str| format!("services[{index}].{name}");

    let id = sanitize_line(&entry.id);
    if id.is_empty() {
        return Err(ReportError::validation(field("id"), "must not be empty"));
    }
    let name = sanitize_line(&entry.name);
    if name.is_empty() {
        return Err(ReportError::validation(field("name"), "must not be empty"));
    }
    let start = parse_date(&entry.start_date)
        .ok_or_else(|| unparseable(&field("startDate"), &entry.start_date))?;
    let end = parse_date(&entry.end_date)
        .ok_or_else(|| unparseable(&field("endDate"), &entry.end_date))?;
    let period =
        DateRange::new(start, end).ok_or_else(|| inverted(&field("dateRange"), start, end))?;

    Ok(ServiceEntry { id, name, period })
}

//=========================================================================================
// Dates
//=========================================================================================

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping its calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|timestamp| timestamp.date_naive())
    })
}

fn unparseable(field: &str, raw: &str) -> ReportError {
    ReportError::validation(field, format!("'{}' is not a valid date", raw.trim()))
}

fn inverted(field: &str, start: NaiveDate, end: NaiveDate) -> ReportError {
    ReportError::validation(
        field,
        format!("start date {start} is after end date {end}"),
    )
}

//=========================================================================================
// Text
//=========================================================================================

/// Trims and collapses a single-line field; control characters become spaces.
fn sanitize_line(raw: &str) -> String {
    raw.split(|c: char| c.is_control() || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trims a free-text field, keeping line breaks and dropping other control characters.
fn sanitize_block(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .lines()
        .map(|line| {
            line.chars()
                .map(|c| if c == '\t' { ' ' } else { c })
                .filter(|c| !c.is_control())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
