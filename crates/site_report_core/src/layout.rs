//! crates/site_report_core/src/layout.rs
//!
//! Deterministic page layout for a `ReportDocument`.
//!
//! The planner turns a document into a `LayoutPlan`: pages of positioned text
//! runs, rules and image placements. Coordinates are millimetres on an A4
//! portrait page with the origin at the bottom-left corner, which is what PDF
//! renderers expect. The plan is a pure function of the document, so identical
//! documents always produce identical plans.

use crate::domain::{PlacedImage, ReportDocument};
use crate::error::{ReportError, ReportResult};

//=========================================================================================
// Page Geometry and Typography
//=========================================================================================

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
const CONTENT_TOP_MM: f32 = PAGE_HEIGHT_MM - MARGIN_MM;
/// Lowest point body content may reach; the footer lives below it.
const CONTENT_BOTTOM_MM: f32 = 22.0;
const FOOTER_BASELINE_MM: f32 = 10.0;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.0;
const CAPTION_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica advance width as a fraction of the font size.
const GLYPH_WIDTH_EM: f32 = 0.55;

/// Services table columns: index, name, start, end.
const COL_INDEX_X: f32 = MARGIN_MM + 1.0;
const COL_NAME_X: f32 = MARGIN_MM + 11.0;
const COL_START_X: f32 = MARGIN_MM + 122.0;
const COL_END_X: f32 = MARGIN_MM + 151.0;
const COL_NAME_WIDTH_MM: f32 = COL_START_X - COL_NAME_X - 3.0;
const ROW_PADDING_MM: f32 = 2.0;
const HEADER_ROW_HEIGHT_MM: f32 = 8.0;
/// Longer service names are truncated with an ellipsis.
pub const MAX_ROW_LINES: usize = 6;

/// Photo grid: one column, two rows per page.
pub const PHOTOS_PER_PAGE: usize = 2;
const PHOTO_GAP_MM: f32 = 6.0;
const CAPTION_BAND_MM: f32 = 7.0;

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.4
}

/// How many glyphs of the given size fit across `width_mm`.
pub fn chars_per_line(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * PT_TO_MM * GLYPH_WIDTH_EM)).floor() as usize).max(1)
}

//=========================================================================================
// Plan Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A single line of text; `y` is the baseline.
    Text {
        x: f32,
        y: f32,
        size: f32,
        weight: FontWeight,
        text: String,
    },
    /// A straight hairline.
    Rule { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// A photo scaled into a box whose bottom-left corner is `(x, y)`.
    Image {
        slot: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Summary,
    ServicesContinued,
    Description,
    Observations,
    Photos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub kind: PageKind,
    pub elements: Vec<Element>,
}

/// Where one services row landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowPlacement {
    pub service_index: usize,
    /// Zero-based page number.
    pub page: usize,
    pub top: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub pages: Vec<PagePlan>,
    pub rows: Vec<RowPlacement>,
}

impl LayoutPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages_of_kind(&self, kind: PageKind) -> usize {
        self.pages.iter().filter(|page| page.kind == kind).count()
    }

    pub fn image_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|page| &page.elements)
            .filter(|element| matches!(element, Element::Image { .. }))
            .count()
    }
}

//=========================================================================================
// Planner
//=========================================================================================

/// Lays out the whole document.
///
/// Fails with `ReportError::Render` when text contains glyphs the built-in
/// fonts cannot draw or an image has zero dimensions.
pub fn plan_report(document: &ReportDocument) -> ReportResult<LayoutPlan> {
    check_glyphs(document)?;

    let mut composer = Composer::default();
    composer.summary(document);
    composer.services_table(document);
    composer.text_section(PageKind::Description, "Description", &document.description);
    composer.text_section(PageKind::Observations, "Observations", &document.observations);
    composer.photos(&document.images)?;
    composer.footers(&document.project_name);

    Ok(LayoutPlan {
        pages: composer.pages,
        rows: composer.rows,
    })
}

#[derive(Default)]
struct Composer {
    pages: Vec<PagePlan>,
    rows: Vec<RowPlacement>,
    y: f32,
}

impl Composer {
    fn new_page(&mut self, kind: PageKind) {
        self.pages.push(PagePlan {
            kind,
            elements: Vec::new(),
        });
        self.y = CONTENT_TOP_MM;
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn text(&mut self, x: f32, y: f32, size: f32, weight: FontWeight, text: impl Into<String>) {
        self.push(Element::Text {
            x,
            y,
            size,
            weight,
            text: text.into(),
        });
    }

    fn rule(&mut self, y: f32) {
        self.push(Element::Rule {
            x1: MARGIN_MM,
            y1: y,
            x2: PAGE_WIDTH_MM - MARGIN_MM,
            y2: y,
        });
    }

    /// Writes one line at the cursor and advances it.
    fn line(&mut self, size: f32, weight: FontWeight, text: impl Into<String>) {
        let height = line_height(size);
        self.y -= height;
        self.text(MARGIN_MM, self.y + height * 0.25, size, weight, text);
    }

    fn heading(&mut self, text: &str) {
        self.line(HEADING_SIZE, FontWeight::Bold, text);
        self.y -= 2.0;
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= CONTENT_BOTTOM_MM
    }

    fn summary(&mut self, document: &ReportDocument) {
        self.new_page(PageKind::Summary);
        self.line(TITLE_SIZE, FontWeight::Bold, "Construction Progress Report");
        self.y -= 3.0;

        let mut fields = vec![
            ("Client", document.client_name.clone()),
            ("Project", document.project_name.clone()),
            ("Location", document.location.clone()),
            ("Period", document.period.to_string()),
        ];
        if let Some(date) = document.generated_on {
            fields.push(("Generated on", date.format("%Y-%m-%d").to_string()));
        }

        // Each field is capped like a table row so the title block stays on page one.
        let width = chars_per_line(CONTENT_WIDTH_MM, BODY_SIZE);
        for (label, value) in fields {
            let lines = truncate_lines(wrap(&format!("{label}: {value}"), width), MAX_ROW_LINES, width);
            for line in lines {
                self.line(BODY_SIZE, FontWeight::Regular, line);
            }
        }
        self.y -= 6.0;
    }

    fn table_header(&mut self) {
        let baseline = self.y - HEADER_ROW_HEIGHT_MM + 2.5;
        for (x, label) in [
            (COL_INDEX_X, "#"),
            (COL_NAME_X, "Service"),
            (COL_START_X, "Start"),
            (COL_END_X, "End"),
        ] {
            self.text(x, baseline, TABLE_SIZE, FontWeight::Bold, label);
        }
        self.y -= HEADER_ROW_HEIGHT_MM;
        self.rule(self.y);
    }

    fn services_table(&mut self, document: &ReportDocument) {
        self.heading("Services");
        if document.services.is_empty() {
            self.line(BODY_SIZE, FontWeight::Regular, "No services recorded.");
            return;
        }

        let name_width = chars_per_line(COL_NAME_WIDTH_MM, TABLE_SIZE);
        let row_line = line_height(TABLE_SIZE);
        self.table_header();

        for (index, service) in document.services.iter().enumerate() {
            let lines = truncate_lines(wrap(&service.name, name_width), MAX_ROW_LINES, name_width);
            let height = lines.len() as f32 * row_line + 2.0 * ROW_PADDING_MM;

            if !self.fits(height) {
                self.new_page(PageKind::ServicesContinued);
                self.heading("Services (continued)");
                self.table_header();
            }

            let top = self.y;
            let first_baseline = top - ROW_PADDING_MM - row_line * 0.75;
            self.text(
                COL_INDEX_X,
                first_baseline,
                TABLE_SIZE,
                FontWeight::Regular,
                (index + 1).to_string(),
            );
            for (offset, line) in lines.into_iter().enumerate() {
                let baseline = first_baseline - offset as f32 * row_line;
                self.text(COL_NAME_X, baseline, TABLE_SIZE, FontWeight::Regular, line);
            }
            for (x, date) in [
                (COL_START_X, service.period.start),
                (COL_END_X, service.period.end),
            ] {
                self.text(
                    x,
                    first_baseline,
                    TABLE_SIZE,
                    FontWeight::Regular,
                    date.format("%Y-%m-%d").to_string(),
                );
            }

            self.y -= height;
            self.rule(self.y);
            self.rows.push(RowPlacement {
                service_index: index,
                page: self.pages.len() - 1,
                top,
                height,
            });
        }
    }

    /// A heading plus wrapped paragraphs, starting on a fresh page.
    fn text_section(&mut self, kind: PageKind, title: &str, body: &str) {
        self.new_page(kind);
        self.heading(title);

        let width = chars_per_line(CONTENT_WIDTH_MM, BODY_SIZE);
        let height = line_height(BODY_SIZE);
        let lines: Vec<String> = if body.is_empty() {
            vec!["(none)".to_string()]
        } else {
            body.split('\n').flat_map(|paragraph| wrap(paragraph, width)).collect()
        };

        for line in lines {
            if !self.fits(height) {
                self.new_page(kind);
                self.heading(&format!("{title} (continued)"));
            }
            self.line(BODY_SIZE, FontWeight::Regular, line);
        }
    }

    fn photos(&mut self, images: &[PlacedImage]) -> ReportResult<()> {
        for (page_index, chunk) in images.chunks(PHOTOS_PER_PAGE).enumerate() {
            self.new_page(PageKind::Photos);
            self.heading(if page_index == 0 { "Photos" } else { "Photos (continued)" });

            let area_top = self.y;
            let cell_height =
                (area_top - CONTENT_BOTTOM_MM - PHOTO_GAP_MM * (PHOTOS_PER_PAGE as f32 - 1.0))
                    / PHOTOS_PER_PAGE as f32;
            let box_height = cell_height - CAPTION_BAND_MM;

            // An odd final chunk leaves its remaining cell empty.
            for (cell, image) in chunk.iter().enumerate() {
                let (width, height) = fit_within(
                    image.bitmap.width,
                    image.bitmap.height,
                    CONTENT_WIDTH_MM,
                    box_height,
                )
                .ok_or_else(|| {
                    ReportError::Render(format!("image '{}' has no pixels", image.file_name))
                })?;

                let cell_top = area_top - cell as f32 * (cell_height + PHOTO_GAP_MM);
                let box_bottom = cell_top - box_height;
                self.push(Element::Image {
                    slot: image.slot,
                    x: MARGIN_MM + (CONTENT_WIDTH_MM - width) / 2.0,
                    y: box_bottom + (box_height - height) / 2.0,
                    width,
                    height,
                });

                let caption_width = chars_per_line(CONTENT_WIDTH_MM, CAPTION_SIZE);
                // File names come from the client's file system; undrawable glyphs become '?'.
                let file_name: String = image
                    .file_name
                    .chars()
                    .map(|c| if is_renderable(c) { c } else { '?' })
                    .collect();
                let caption = truncate(
                    &format!("Photo {}: {}", image.slot + 1, file_name),
                    caption_width,
                );
                self.text(
                    MARGIN_MM,
                    box_bottom - CAPTION_BAND_MM + 2.5,
                    CAPTION_SIZE,
                    FontWeight::Regular,
                    caption,
                );
            }
        }
        Ok(())
    }

    fn footers(&mut self, project_name: &str) {
        let total = self.pages.len();
        let project = truncate(project_name, 60);
        for (index, page) in self.pages.iter_mut().enumerate() {
            page.elements.push(Element::Text {
                x: MARGIN_MM,
                y: FOOTER_BASELINE_MM,
                size: FOOTER_SIZE,
                weight: FontWeight::Regular,
                text: format!("{project} \u{b7} Page {} of {total}", index + 1),
            });
        }
    }
}

/// Scales `(width_px, height_px)` to the largest size fitting the box while
/// keeping its aspect ratio. Returns `None` for empty images.
pub fn fit_within(
    width_px: u32,
    height_px: u32,
    box_width: f32,
    box_height: f32,
) -> Option<(f32, f32)> {
    if width_px == 0 || height_px == 0 {
        return None;
    }
    let (w, h) = (width_px as f32, height_px as f32);
    let scale = (box_width / w).min(box_height / h);
    Some((w * scale, h * scale))
}

//=========================================================================================
// Text Helpers
//=========================================================================================

/// Greedy word wrap by glyph count; words longer than a line are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

fn truncate_lines(mut lines: Vec<String>, max_lines: usize, width: usize) -> Vec<String> {
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let kept: String = last.chars().take(width.saturating_sub(3)).collect();
            *last = format!("{}...", kept.trim_end());
        }
    }
    lines
}

//=========================================================================================
// Glyph Coverage
//=========================================================================================

/// Characters outside ISO-8859-1 that the WinAnsi encoding still covers.
const WIN_ANSI_EXTRAS: &str =
    "\u{20ac}\u{201a}\u{192}\u{201e}\u{2026}\u{2020}\u{2021}\u{2c6}\u{2030}\u{160}\u{2039}\u{152}\u{17d}\u{2018}\u{2019}\u{201c}\u{201d}\u{2022}\u{2013}\u{2014}\u{2dc}\u{2122}\u{161}\u{203a}\u{153}\u{17e}\u{178}";

/// True when the built-in PDF fonts can draw `c`.
pub fn is_renderable(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7e | 0xa0..=0xff) || c == '\n' || WIN_ANSI_EXTRAS.contains(c)
}

fn check_glyphs(document: &ReportDocument) -> ReportResult<()> {
    let mut fields: Vec<(String, &str)> = vec![
        ("clientName".to_string(), document.client_name.as_str()),
        ("projectName".to_string(), document.project_name.as_str()),
        ("location".to_string(), document.location.as_str()),
        ("description".to_string(), document.description.as_str()),
        ("observations".to_string(), document.observations.as_str()),
    ];
    for (index, service) in document.services.iter().enumerate() {
        fields.push((format!("services[{index}].name"), service.name.as_str()));
    }

    for (field, value) in fields {
        if let Some(c) = value.chars().find(|c| !is_renderable(*c)) {
            return Err(ReportError::Render(format!(
                "field '{field}' contains the unrenderable character U+{:04X}",
                c as u32
            )));
        }
    }
    Ok(())
}
