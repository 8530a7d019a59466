//! Document loading: PDF/TXT text extraction followed by chunking.
//!
//! Format is chosen from the file extension (`.pdf` / `.txt`, any case).
//! Extraction returns plain UTF-8 text which is handed to
//! [`chunk_text_with`] unchanged.
//!
//! PDF pages are extracted in order and concatenated. A page with no text
//! layer contributes an empty string. When `pdf-extract` errors or panics on
//! the document, `lopdf` extracts page by page instead and a page that fails
//! contributes an empty string; only a file `lopdf` cannot open at all is an
//! [`Error::Extraction`].

use std::path::Path;

use tracing::{debug, info, warn};

use crate::chunk::{chunk_text_with, ChunkOptions};
use crate::error::{Error, Result};
use crate::models::{Chunk, Document, DocumentFormat};

/// Load a file and chunk it with the default size bounds.
pub fn load(path: &Path) -> Result<Vec<Chunk>> {
    load_with(path, &ChunkOptions::default())
}

/// Load a file and chunk it with explicit size bounds.
pub fn load_with(path: &Path, options: &ChunkOptions) -> Result<Vec<Chunk>> {
    info!(path = %path.display(), "loading file");
    let document = read_document(path)?;
    Ok(chunk_document(&document, options))
}

/// Chunk an uploaded file held in memory. `filename` decides the format.
pub fn load_bytes(bytes: &[u8], filename: &str, options: &ChunkOptions) -> Result<Vec<Chunk>> {
    info!(filename, bytes = bytes.len(), "loading upload");
    let format = detect_format(Path::new(filename))?;
    let document = extract(bytes, format, filename)?;
    Ok(chunk_document(&document, options))
}

/// Extract a file's text without chunking it.
pub fn read_document(path: &Path) -> Result<Document> {
    let format = detect_format(path)?;
    let bytes = std::fs::read(path)?;
    extract(&bytes, format, &path.display().to_string())
}

fn detect_format(path: &Path) -> Result<DocumentFormat> {
    DocumentFormat::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Error::UnsupportedFormat(ext)
    })
}

fn extract(bytes: &[u8], format: DocumentFormat, source: &str) -> Result<Document> {
    let text = match format {
        DocumentFormat::Pdf => extract_pdf(bytes)?,
        DocumentFormat::Txt => String::from_utf8(bytes.to_vec())?,
    };
    info!(
        source,
        format = format.as_str(),
        chars = text.chars().count(),
        "extracted text"
    );
    Ok(Document {
        source: source.to_string(),
        format,
        text,
    })
}

fn chunk_document(document: &Document, options: &ChunkOptions) -> Vec<Chunk> {
    let chunks = chunk_text_with(&document.text, options);
    info!(source = %document.source, chunks = chunks.len(), "split into chunks");
    chunks
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed pages (e.g. no /MediaBox).
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));

    match result {
        Ok(Ok(pages)) => {
            debug!(pages = pages.len(), "pdf-extract succeeded");
            Ok(pages.concat())
        }
        Ok(Err(e)) => {
            warn!(error = %e, "pdf-extract failed; extracting page by page");
            extract_pdf_per_page(bytes)
        }
        Err(_) => {
            warn!("pdf-extract panicked; extracting page by page");
            extract_pdf_per_page(bytes)
        }
    }
}

fn extract_pdf_per_page(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| Error::Extraction(e.to_string()))?;
    let mut text = String::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => warn!(page = page_number, error = %e, "page yielded no text"),
        }
    }
    Ok(text)
}
