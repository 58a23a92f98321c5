use crate::ingest::{join_segments, ExtractError};

/// Extracts text page by page and concatenates the pages with no separator.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = extract_pdf_pages(bytes)?;
    Ok(join_segments(&pages, ""))
}

/// Per-page text in page order. Pages without a text layer come back as empty strings.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}
