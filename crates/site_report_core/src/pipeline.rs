//! crates/site_report_core/src/pipeline.rs
//!
//! Wires the builder and the renderer into the single request-scoped pipeline.

use crate::builder::ReportModelBuilder;
use crate::domain::{DateRange, ReportRequest};
use crate::error::ReportResult;
use crate::ports::{ImageDecoder, ReportRenderer};

/// A finished report plus the metadata the response needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledReport {
    pub project_name: String,
    pub period: DateRange,
    pub pdf: Vec<u8>,
    pub page_count: usize,
}

/// Builds and renders one report. Stages run in sequence and the first
/// failure halts the pipeline.
pub async fn compile_report(
    request: ReportRequest,
    decoder: &dyn ImageDecoder,
    renderer: &dyn ReportRenderer,
) -> ReportResult<CompiledReport> {
    let document = ReportModelBuilder::new(decoder).build(request).await?;
    let project_name = document.project_name.clone();
    let period = document.period;

    let rendered = renderer.render(document).await?;

    Ok(CompiledReport {
        project_name,
        period,
        pdf: rendered.pdf,
        page_count: rendered.page_count,
    })
}
