//! crates/site_report_core/src/domain.rs
//!
//! Defines the pure, core data structures for report generation.
//! These structs are independent of any transport or serialization format.

use chrono::NaiveDate;
use std::fmt;

//=========================================================================================
// Raw Input (as decoded from a form submission)
//=========================================================================================

/// One line of the services timeline exactly as the client sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntryInput {
    pub id: String,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

/// An uploaded photo, still encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// The raw decoded form submission for one report-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub client_name: String,
    pub project_name: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    pub observations: String,
    pub services: Vec<ServiceEntryInput>,
    /// Attachments in arrival order.
    pub images: Vec<ImageAttachment>,
    /// Optional "generated on" date supplied by the client.
    pub generated_on: Option<String>,
}

//=========================================================================================
// Canonical Document (post-validation)
//=========================================================================================

/// An inclusive calendar range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Returns `None` when the range is inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub id: String,
    pub name: String,
    pub period: DateRange,
}

/// A decoded 8-bit RGB bitmap, rows top to bottom.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Bitmap {
    /// True when the pixel buffer holds exactly `width * height` RGB triples.
    pub fn is_consistent(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgb.len() as u64 == u64::from(self.width) * u64::from(self.height) * 3
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap({}x{}, {} bytes)", self.width, self.height, self.rgb.len())
    }
}

/// A photo with its fixed position in the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedImage {
    /// Equal to the attachment's arrival position.
    pub slot: usize,
    pub file_name: String,
    pub bitmap: Bitmap,
}

/// The validated, normalized representation consumed by the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub client_name: String,
    pub project_name: String,
    pub location: String,
    pub period: DateRange,
    pub description: String,
    pub observations: String,
    pub services: Vec<ServiceEntry>,
    /// Sorted by slot.
    pub images: Vec<PlacedImage>,
    pub generated_on: Option<NaiveDate>,
}

//=========================================================================================
// Output
//=========================================================================================

/// A finished PDF byte stream.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub pdf: Vec<u8>,
    pub page_count: usize,
}

impl fmt::Debug for RenderedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedReport")
            .field("bytes", &self.pdf.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}
