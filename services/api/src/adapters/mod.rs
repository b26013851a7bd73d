pub mod image;
pub mod pdf;

pub use self::image::ImageCrateDecoder;
pub use pdf::PrintPdfRenderer;
