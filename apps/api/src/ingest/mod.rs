//! Resume ingest: turns an uploaded PDF or DOCX into plain text.
//!
//! Parsing is CPU-bound; async callers go through `extract_text_blocking`,
//! which runs the work inside `tokio::task::spawn_blocking`.

pub mod docx;
pub mod pdf;

use std::path::Path;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;

/// Upload formats accepted by the analyzer. Anything else is rejected before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub const ALLOWED_EXTENSIONS: [&'static str; 2] = ["pdf", "docx"];

    /// Resolves the format from a filename extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

/// A resume as received from the client. Discarded once its text is extracted.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub format: DocumentFormat,
    pub bytes: Bytes,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read PDF: {0}")]
    Pdf(String),

    #[error("failed to read DOCX: {0}")]
    Docx(String),
}

/// Extracts the plain text of a document, preserving reading order.
pub fn extract_text(document: &UploadedDocument) -> Result<String, ExtractError> {
    let text = match document.format {
        DocumentFormat::Pdf => pdf::extract_pdf_text(&document.bytes)?,
        DocumentFormat::Docx => docx::extract_docx_text(&document.bytes)?,
    };
    debug!(
        filename = %document.filename,
        format = ?document.format,
        bytes = document.bytes.len(),
        chars = text.chars().count(),
        "Extracted resume text"
    );
    Ok(text)
}

/// Runs `extract_text` on the blocking pool. A panicking parser surfaces as `Internal`.
pub async fn extract_text_blocking(document: UploadedDocument) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || extract_text(&document))
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed in text extraction: {e}"))
        })??;
    Ok(text)
}

/// Concatenates page or paragraph segments in order. Empty segments stay empty.
pub(crate) fn join_segments<S: AsRef<str>>(segments: &[S], separator: &str) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(separator)
}
