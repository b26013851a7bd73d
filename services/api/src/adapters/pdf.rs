//! services/api/src/adapters/pdf.rs
//!
//! This module contains the adapter for the `printpdf` crate.
//! It implements the `ReportRenderer` port by painting the core layout plan.

use async_trait::async_trait;
use chrono::NaiveDate;
use printpdf::{
    lopdf::{self, Object, StringFormat},
    BuiltinFont, ColorBits, ColorSpace, CustomPdfConformance, Image, ImageTransform, ImageXObject,
    Line, Mm, OffsetDateTime, PdfConformance, PdfDocument, PdfLayerReference, Point, Px,
};
use sha2::{Digest, Sha256};
use site_report_core::{
    layout::{plan_report, Element, FontWeight, LayoutPlan, PAGE_HEIGHT_MM, PAGE_WIDTH_MM},
    Bitmap, RenderedReport, ReportDocument, ReportError, ReportRenderer, ReportResult,
};
use std::collections::HashMap;
use std::io::BufWriter;

/// Resolution assumed for bitmap pixels before scaling into their layout box.
const IMAGE_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;
const RULE_THICKNESS_PT: f32 = 0.5;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Renders reports with the built-in Helvetica faces, so no font files are needed.
#[derive(Clone, Debug, Default)]
pub struct PrintPdfRenderer;

impl PrintPdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportRenderer for PrintPdfRenderer {
    async fn render(&self, document: ReportDocument) -> ReportResult<RenderedReport> {
        tokio::task::spawn_blocking(move || render_document(&document))
            .await
            .map_err(|e| ReportError::Render(format!("render task failed: {e}")))?
    }
}

//=========================================================================================
// Painting
//=========================================================================================

/// Plans and paints the document, returning the finished PDF bytes.
pub fn render_document(document: &ReportDocument) -> ReportResult<RenderedReport> {
    let plan = plan_report(document)?;
    let bitmaps: HashMap<usize, &Bitmap> = document
        .images
        .iter()
        .map(|image| (image.slot, &image.bitmap))
        .collect();

    let report_date = document.generated_on.unwrap_or(document.period.end);
    let pdf = paint(&document.project_name, report_date, &plan, &bitmaps)?;
    let pdf = stamp_document_id(&pdf)?;
    Ok(RenderedReport {
        pdf,
        page_count: plan.page_count(),
    })
}

/// Midnight UTC of the report date. Document metadata never carries the wall clock.
fn metadata_date(date: NaiveDate) -> ReportResult<OffsetDateTime> {
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp())
        .unwrap_or_default();
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| ReportError::Render(format!("report date {date} is out of range: {e}")))
}

fn paint(
    title: &str,
    report_date: NaiveDate,
    plan: &LayoutPlan,
    bitmaps: &HashMap<usize, &Bitmap>,
) -> ReportResult<Vec<u8>> {
    let stamp = metadata_date(report_date)?;
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    // Plain PDF: the PDF/X default would add an XMP packet with a random instance id.
    let doc = doc
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_xmp_metadata: false,
            requires_icc_profile: false,
            ..Default::default()
        }))
        .with_creation_date(stamp)
        .with_mod_date(stamp)
        .with_metadata_date(stamp);
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Render(format!("failed to load Helvetica: {e:?}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Render(format!("failed to load Helvetica-Bold: {e:?}")))?;

    for (index, page) in plan.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        layer.set_outline_thickness(RULE_THICKNESS_PT);

        for element in &page.elements {
            match element {
                Element::Text { x, y, size, weight, text } => {
                    let font = match weight {
                        FontWeight::Regular => &regular,
                        FontWeight::Bold => &bold,
                    };
                    layer.use_text(text.as_str(), *size, Mm(*x), Mm(*y), font);
                }
                Element::Rule { x1, y1, x2, y2 } => {
                    layer.add_line(Line {
                        points: vec![
                            (Point::new(Mm(*x1), Mm(*y1)), false),
                            (Point::new(Mm(*x2), Mm(*y2)), false),
                        ],
                        is_closed: false,
                    });
                }
                Element::Image { slot, x, y, width, height } => {
                    let bitmap = bitmaps.get(slot).ok_or_else(|| {
                        ReportError::Render(format!("no bitmap for photo slot {slot}"))
                    })?;
                    place_bitmap(&layer, bitmap, *x, *y, *width, *height);
                }
            }
        }
    }

    let mut writer = BufWriter::new(Vec::new());
    doc.save(&mut writer)
        .map_err(|e| ReportError::Render(format!("failed to write PDF: {e:?}")))?;
    writer
        .into_inner()
        .map_err(|e| ReportError::Render(format!("failed to flush PDF: {e}")))
}

/// Replaces printpdf's random trailer `/ID` with a fingerprint of the rest of
/// the file, so identical documents give identical bytes.
fn stamp_document_id(pdf: &[u8]) -> ReportResult<Vec<u8>> {
    let mut doc = lopdf::Document::load_mem(pdf)
        .map_err(|e| ReportError::Render(format!("failed to reload PDF: {e}")))?;
    doc.trailer.remove(b"ID");

    let unstamped = save_lopdf(&mut doc)?;
    let fingerprint = Sha256::digest(&unstamped)[..16].to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(fingerprint.clone(), StringFormat::Hexadecimal),
            Object::String(fingerprint, StringFormat::Hexadecimal),
        ]),
    );
    save_lopdf(&mut doc)
}

fn save_lopdf(doc: &mut lopdf::Document) -> ReportResult<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ReportError::Render(format!("failed to write PDF: {e}")))?;
    Ok(bytes)
}

/// Draws a bitmap so it exactly fills the `width` x `height` box at `(x, y)`.
fn place_bitmap(layer: &PdfLayerReference, bitmap: &Bitmap, x: f32, y: f32, width: f32, height: f32) {
    let native_width_mm = bitmap.width as f32 / IMAGE_DPI * MM_PER_INCH;
    let native_height_mm = bitmap.height as f32 / IMAGE_DPI * MM_PER_INCH;

    let image = Image::from(ImageXObject {
        width: Px(bitmap.width as usize),
        height: Px(bitmap.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: bitmap.rgb.clone(),
        image_filter: None,
        smask: None,
        clipping_bbox: None,
    });
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            scale_x: Some(width / native_width_mm),
            scale_y: Some(height / native_height_mm),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_report_core::{DateRange, PlacedImage, ServiceEntry};

    fn document(images: usize) -> ReportDocument {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        ReportDocument {
            client_name: "Acme Holdings".to_string(),
            project_name: "Harbour Walk".to_string(),
            location: "Bristol".to_string(),
            period: DateRange::new(day(1), day(31)).unwrap(),
            description: "Concrete pour for level two.".to_string(),
            observations: "No incidents.".to_string(),
            services: vec![ServiceEntry {
                id: "1".to_string(),
                name: "Formwork".to_string(),
                period: DateRange::new(day(2), day(9)).unwrap(),
            }],
            images: (0..images)
                .map(|slot| PlacedImage {
                    slot,
                    file_name: format!("site-{slot}.png"),
                    bitmap: Bitmap {
                        width: 3,
                        height: 2,
                        rgb: vec![128; 18],
                    },
                })
                .collect(),
            generated_on: None,
        }
    }

    #[test]
    fn writes_a_pdf_with_the_planned_page_count() {
        let rendered = render_document(&document(0)).unwrap();
        assert!(rendered.pdf.starts_with(b"%PDF"));
        assert_eq!(rendered.page_count, plan_report(&document(0)).unwrap().page_count());
    }

    #[tokio::test]
    async fn embeds_photos() {
        let with_photos = PrintPdfRenderer::new().render(document(3)).await.unwrap();
        let without = PrintPdfRenderer::new().render(document(0)).await.unwrap();
        assert!(with_photos.pdf.starts_with(b"%PDF"));
        assert_eq!(with_photos.page_count, without.page_count + 2);
    }

    #[test]
    fn identical_documents_render_identical_bytes() {
        let first = render_document(&document(2)).unwrap();
        let second = render_document(&document(2)).unwrap();
        assert_eq!(first.pdf, second.pdf);

        let mut other = document(2);
        other.observations = "One near miss.".to_string();
        assert_ne!(render_document(&other).unwrap().pdf, first.pdf);
    }

    #[test]
    fn metadata_dates_follow_the_report_date() {
        let mut doc = document(0);
        doc.generated_on = NaiveDate::from_ymd_opt(2024, 5, 1);
        let pdf = render_document(&doc).unwrap().pdf;
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("D:20240501000000"));

        let fallback = render_document(&document(0)).unwrap().pdf;
        assert!(String::from_utf8_lossy(&fallback).contains("D:20240331000000"));
    }

    #[test]
    fn trailer_id_is_a_content_fingerprint() {
        let pdf = render_document(&document(1)).unwrap().pdf;
        let parsed = lopdf::Document::load_mem(&pdf).unwrap();
        let id = parsed.trailer.get(b"ID").unwrap().as_array().unwrap();
        assert_eq!(id.len(), 2);
        assert_eq!(id[0].as_str().unwrap().len(), 16);
        assert_eq!(id[0].as_str().unwrap(), id[1].as_str().unwrap());
        assert!(!String::from_utf8_lossy(&pdf).contains("<x:xmpmeta"));
    }

    #[test]
    fn unrenderable_text_is_a_render_error() {
        let mut doc = document(0);
        doc.description = "Snowman \u{2603} on site".to_string();
        let err = render_document(&doc).unwrap_err();
        assert!(matches!(err, ReportError::Render(_)));
    }
}
