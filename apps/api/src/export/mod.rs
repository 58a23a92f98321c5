//! Feedback export: renders accumulated analysis feedback into a downloadable PDF.
//!
//! Layout is fixed: A4, builtin Helvetica 12pt, 10 mm line height, one wrapped
//! paragraph per input line, automatic page break 15 mm above the bottom edge.
//! Output text is restricted to ISO-8859-1; anything outside it fails the export.
//!
//! `PdfDocument` is not `Send`, so async callers use `export_feedback_pdf_blocking`.

pub mod font_metrics;

use printpdf::{BuiltinFont, Mm, PdfDocument};
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;
use crate::export::font_metrics::HELVETICA;

pub const EXPORT_FILENAME: &str = "resume_feedback.pdf";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const CELL_MARGIN_MM: f32 = 1.0;
const BOTTOM_MARGIN_MM: f32 = 15.0;
const LINE_HEIGHT_MM: f32 = 10.0;
const FONT_SIZE_PT: f32 = 12.0;
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Wrapped lines that fit on one page before the automatic break.
pub const LINES_PER_PAGE: usize =
    ((PAGE_HEIGHT_MM - BOTTOM_MARGIN_MM - MARGIN_MM) / LINE_HEIGHT_MM) as usize;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("character {character:?} on line {line} cannot be encoded as ISO-8859-1")]
    Unencodable { character: char, line: usize },

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Produces the PDF bytes for `feedback`.
pub fn export_feedback_pdf(feedback: &str) -> Result<Vec<u8>, ExportError> {
    ensure_single_byte(feedback)?;

    let max_width_em = (PAGE_WIDTH_MM - 2.0 * MARGIN_MM - 2.0 * CELL_MARGIN_MM)
        / (FONT_SIZE_PT * MM_PER_PT);
    let lines: Vec<String> = feedback
        .lines()
        .flat_map(|line| HELVETICA.wrap(line, max_width_em))
        .collect();

    let (doc, first_page, first_layer) = PdfDocument::new(
        "Resume Feedback",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut page_count = 1;

    for (idx, line) in lines.iter().enumerate() {
        let slot = idx % LINES_PER_PAGE;
        if idx > 0 && slot == 0 {
            let (page, page_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            page_count += 1;
        }
        if line.is_empty() {
            continue;
        }
        let top = MARGIN_MM + slot as f32 * LINE_HEIGHT_MM;
        let baseline = top + LINE_HEIGHT_MM / 2.0 + 0.3 * FONT_SIZE_PT * MM_PER_PT;
        layer.use_text(
            line.as_str(),
            FONT_SIZE_PT,
            Mm(MARGIN_MM + CELL_MARGIN_MM),
            Mm(PAGE_HEIGHT_MM - baseline),
            &font,
        );
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    debug!(
        lines = lines.len(),
        pages = page_count,
        bytes = bytes.len(),
        "Rendered feedback PDF"
    );
    Ok(bytes)
}

/// Runs `export_feedback_pdf` on the blocking pool.
pub async fn export_feedback_pdf_blocking(feedback: String) -> Result<Vec<u8>, AppError> {
    let bytes = tokio::task::spawn_blocking(move || export_feedback_pdf(&feedback))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in export: {e}")))??;
    Ok(bytes)
}

/// Rejects the first character outside ISO-8859-1. Lines are 1-based.
fn ensure_single_byte(text: &str) -> Result<(), ExportError> {
    for (idx, line) in text.lines().enumerate() {
        if let Some(character) = line.chars().find(|c| u32::from(*c) > 0xFF) {
            return Err(ExportError::Unencodable {
                character,
                line: idx + 1,
            });
        }
    }
    Ok(())
}
