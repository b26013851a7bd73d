pub mod builder;
pub mod domain;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod ports;

pub use builder::ReportModelBuilder;
pub use domain::{
    Bitmap, DateRange, ImageAttachment, PlacedImage, RenderedReport, ReportDocument,
    ReportRequest, ServiceEntry, ServiceEntryInput,
};
pub use error::{ReportError, ReportResult, Stage};
pub use pipeline::{compile_report, CompiledReport};
pub use ports::{ImageDecoder, ReportRenderer};
