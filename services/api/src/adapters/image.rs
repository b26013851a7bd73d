//! services/api/src/adapters/image.rs
//!
//! This module contains the adapter for the `image` crate.
//! It implements the `ImageDecoder` port from the `core` crate.

use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, RgbImage};
use site_report_core::{Bitmap, ImageAttachment, ImageDecoder, ReportError, ReportResult};
use tracing::debug;

/// Photos whose longest edge exceeds this are scaled down before rendering.
pub const MAX_EDGE_PX: u32 = 2000;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Decodes PNG, JPEG, WebP and GIF attachments into RGB bitmaps.
#[derive(Clone, Debug)]
pub struct ImageCrateDecoder {
    max_edge_px: u32,
}

impl ImageCrateDecoder {
    pub fn new() -> Self {
        Self {
            max_edge_px: MAX_EDGE_PX,
        }
    }

    pub fn with_max_edge(max_edge_px: u32) -> Self {
        Self {
            max_edge_px: max_edge_px.max(1),
        }
    }
}

impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================================
// `ImageDecoder` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageDecoder for ImageCrateDecoder {
    async fn decode(&self, attachment: ImageAttachment) -> ReportResult<Bitmap> {
        let max_edge = self.max_edge_px;
        let file_name = attachment.file_name.clone();

        tokio::task::spawn_blocking(move || decode_bitmap(&attachment, max_edge))
            .await
            .map_err(|e| ReportError::unreadable_image(file_name, format!("decoder task failed: {e}")))?
    }
}

/// Decodes one attachment synchronously. Animated GIFs keep their first frame.
pub fn decode_bitmap(attachment: &ImageAttachment, max_edge_px: u32) -> ReportResult<Bitmap> {
    let decoded = image::load_from_memory(&attachment.data)
        .map_err(|e| ReportError::unreadable_image(&attachment.file_name, e.to_string()))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ReportError::unreadable_image(
            &attachment.file_name,
            "image has no pixels",
        ));
    }

    let decoded = if decoded.width().max(decoded.height()) > max_edge_px {
        debug!(
            file = %attachment.file_name,
            width = decoded.width(),
            height = decoded.height(),
            "Downscaling oversized photo"
        );
        decoded.resize(max_edge_px, max_edge_px, FilterType::Triangle)
    } else {
        decoded
    };

    let rgb = flatten_onto_white(&decoded);
    Ok(Bitmap {
        width: rgb.width(),
        height: rgb.height(),
        rgb: rgb.into_raw(),
    })
}

/// Drops the alpha channel by compositing over a white page.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |channel: u8| -> u8 {
            let alpha = a as u16;
            ((channel as u16 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
