//! crates/site_report_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the report pipeline.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of concrete image codecs and PDF libraries.

use async_trait::async_trait;

use crate::domain::{Bitmap, ImageAttachment, ReportDocument, RenderedReport};
use crate::error::ReportResult;

#[async_trait]
pub trait ImageDecoder: Send + Sync {
    /// Decodes one attachment into an RGB bitmap with known dimensions.
    ///
    /// Fails with `ReportError::UnreadableImage` naming the attachment.
    async fn decode(&self, attachment: ImageAttachment) -> ReportResult<Bitmap>;
}

#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Lays out and writes the document as a complete PDF.
    ///
    /// Fails with `ReportError::Render`; never returns a partial document.
    async fn render(&self, document: ReportDocument) -> ReportResult<RenderedReport>;
}
