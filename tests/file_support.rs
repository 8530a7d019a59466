//! Loader tests against real files on disk: TXT, PDF, and rejected formats.

use std::fs;
use std::path::PathBuf;

use memo_harness::chunk::ChunkOptions;
use memo_harness::error::Error;
use memo_harness::loader::{load, load_bytes, load_with, read_document};
use memo_harness::models::{DocumentFormat, UNKNOWN_SECTION};
use tempfile::TempDir;

/// Builds a PDF with one page per entry in `pages`; an empty entry gets an
/// empty content stream. Pages carry a `/MediaBox` only when `media_box` is set.
fn build_pdf(pages: &[&str], media_box: bool) -> Vec<u8> {
    let mut objects: Vec<Vec<u8>> = Vec::new();
    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    objects.push(
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()).into_bytes(),
    );
    objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
    for (i, text) in pages.iter().enumerate() {
        let media = if media_box { "/MediaBox [0 0 612 792] " } else { "" };
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R {}/Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >>",
                media,
                5 + 2 * i
            )
            .into_bytes(),
        );
        let stream = if text.is_empty() {
            String::new()
        } else {
            format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text)
        };
        objects.push(
            format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream).into_bytes(),
        );
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (n, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj ", n + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b" endobj\n");
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!("trailer << /Size {} /Root 1 0 R >>\nstartxref\n", objects.len() + 1).as_bytes(),
    );
    out.extend_from_slice(format!("{}\n%%EOF\n", xref_start).as_bytes());
    out
}

fn joined_text(pdf: &[u8]) -> String {
    load_bytes(pdf, "filing.pdf", &ChunkOptions::default())
        .unwrap()
        .into_iter()
        .map(|c| c.content)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn txt_file_is_chunked_by_section() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(
        &tmp,
        "filing.txt",
        b"Item 1. Business\nWidgets.\n\nItem 1A. Risk Factors\nCompetition.",
    );
    let chunks = load(&path).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].section, "Item 1. Business");
    assert_eq!(chunks[1].section, "Item 1A. Risk Factors");
}

#[test]
fn uppercase_extension_is_accepted() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "NOTES.TXT", b"plain notes");
    let doc = read_document(&path).unwrap();
    assert_eq!(doc.format, DocumentFormat::Txt);
    assert_eq!(doc.text, "plain notes");
}

#[test]
fn empty_txt_yields_no_chunks() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "empty.txt", b"");
    assert!(load(&path).unwrap().is_empty());
}

#[test]
fn missing_txt_is_io_error() {
    let err = load(&PathBuf::from("/nonexistent/notes.txt")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn pdf_text_is_extracted() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "report.pdf", &build_pdf(&["quarterly test phrase"], true));
    let chunks = load(&path).unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(
        chunks[0].content.contains("quarterly test phrase"),
        "content: {:?}",
        chunks[0].content
    );
    assert_eq!(chunks[0].section, UNKNOWN_SECTION);
}

#[test]
fn pdf_pages_join_in_order_with_empty_page() {
    let text = joined_text(&build_pdf(&["alpha page text", "", "omega page text"], true));
    let alpha = text.find("alpha page text").expect("first page text");
    let omega = text.find("omega page text").expect("last page text");
    assert!(alpha < omega, "text: {:?}", text);
}

#[test]
fn pdf_without_media_box_uses_per_page_fallback() {
    // pdf-extract panics on pages with no /MediaBox; lopdf does not need one.
    let text = joined_text(&build_pdf(&["alpha page text", "", "omega page text"], false));
    let alpha = text.find("alpha page text").expect("first page text");
    let omega = text.find("omega page text").expect("last page text");
    assert!(alpha < omega, "text: {:?}", text);
}

#[test]
fn garbage_pdf_is_extraction_failure() {
    let tmp = TempDir::new().unwrap();
    let path = write_file(&tmp, "broken.pdf", b"this is not a pdf at all");
    let err = load(&path).unwrap_err();
    assert!(matches!(err, Error::Extraction(_)), "got {:?}", err);
}

#[test]
fn upload_bytes_use_filename_for_format() {
    let chunks = load_bytes(
        b"Section 2: Outlook\nSteady growth.",
        "outlook.txt",
        &ChunkOptions::default(),
    )
    .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].section, "Section 2: Outlook");

    let err = load_bytes(b"x", "slides.pptx", &ChunkOptions::default()).unwrap_err();
    assert_eq!(err.code(), "unsupported_format");
}

#[test]
fn custom_bounds_split_long_sections() {
    let tmp = TempDir::new().unwrap();
    let body = (0..6)
        .map(|i| format!("Paragraph {} {}", i, "x".repeat(40)))
        .collect::<Vec<_>>()
        .join("\n\n");
    let path = write_file(&tmp, "long.txt", body.as_bytes());
    let options = ChunkOptions {
        min_size: 10,
        max_size: 120,
    };
    let chunks = load_with(&path, &options).unwrap();
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.content.chars().count() <= 120, "{:?}", chunk.content);
    }
}
