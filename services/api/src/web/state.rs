//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{ImageCrateDecoder, PrintPdfRenderer};
use crate::config::Config;
use site_report_core::ports::{ImageDecoder, ReportRenderer};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Everything in here is read-only; the adapters hold no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub image_decoder: Arc<dyn ImageDecoder>,
    pub renderer: Arc<dyn ReportRenderer>,
}

impl AppState {
    /// Builds the state with the production `image` and `printpdf` adapters.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            image_decoder: Arc::new(ImageCrateDecoder::new()),
            renderer: Arc::new(PrintPdfRenderer::new()),
        }
    }
}
