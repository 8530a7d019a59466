//! Section-aware text chunker.
//!
//! Splits document text into [`Chunk`]s in two passes:
//!
//! 1. **Section segmentation.** Every heading found by [`crate::detect`]
//!    starts a new region. Regions are trimmed, empty ones are dropped, and
//!    each is tagged with the first heading found by re-scanning the region's
//!    own text (`"Unknown"` when there is none).
//! 2. **Size normalization.** Regions longer than `max_size` characters are
//!    re-packed on blank-line paragraph boundaries. A single paragraph longer
//!    than `max_size` is emitted whole, so a table with no blank lines inside
//!    it is never cut.
//!
//! Sizes are counted in characters, not bytes. `min_size` is advisory: small
//! chunks are never merged with their neighbours.

use serde::Deserialize;
use tracing::debug;

use crate::detect::{find_heading, headings, HeadingMatch};
use crate::models::{Chunk, UNKNOWN_SECTION};

pub const DEFAULT_MIN_SIZE: usize = 500;
pub const DEFAULT_MAX_SIZE: usize = 2000;

/// Chunk size bounds, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChunkOptions {
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

fn default_min_size() -> usize {
    DEFAULT_MIN_SIZE
}
fn default_max_size() -> usize {
    DEFAULT_MAX_SIZE
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// Chunk `text` with the default 500/2000 bounds.
pub fn chunk_text(text: &str) -> Vec<Chunk> {
    chunk_text_with(text, &ChunkOptions::default())
}

/// Chunk `text` into section-tagged pieces, preserving document order.
pub fn chunk_text_with(text: &str, options: &ChunkOptions) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for section in segment_sections(text) {
        if char_len(&section.content) <= options.max_size {
            chunks.push(section);
        } else {
            pack_paragraphs(&section, options.max_size, &mut chunks);
        }
    }
    chunks
}

/// Phase 1: one chunk per heading-delimited region.
fn segment_sections(text: &str) -> Vec<Chunk> {
    let mut regions = Vec::new();
    let mut last = 0;
    for heading in headings(text) {
        if let HeadingMatch::Heading { offset, .. } = heading {
            if offset > last {
                push_region(&text[last..offset], &mut regions);
            }
            last = offset;
        }
    }
    if last < text.len() {
        push_region(&text[last..], &mut regions);
    }
    regions
}

fn push_region(region: &str, out: &mut Vec<Chunk>) {
    let content = region.trim();
    if content.is_empty() {
        return;
    }
    // Tag from the region's own text, not from the heading that opened it.
    let section = match find_heading(content) {
        HeadingMatch::Heading { label, .. } => label,
        HeadingMatch::NoMatch => UNKNOWN_SECTION.to_string(),
    };
    out.push(Chunk::new(content, section));
}

/// Phase 2: greedily refill buffers of whole paragraphs below `max_size`.
fn pack_paragraphs(section: &Chunk, max_size: usize, out: &mut Vec<Chunk>) {
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for para in split_paragraphs(&section.content) {
        let para_len = char_len(para);
        if buf_len + para_len >= max_size {
            flush(&buf, &section.section, out);
            buf.clear();
            buf_len = 0;
            if para_len > max_size {
                debug!(
                    section = %section.section,
                    chars = para_len,
                    max_size,
                    "paragraph exceeds max chunk size; keeping it whole"
                );
            }
        }
        buf.push_str(para);
        buf.push_str("\n\n");
        buf_len += para_len + 2;
    }

    flush(&buf, &section.section, out);
}

fn flush(buf: &str, section: &str, out: &mut Vec<Chunk>) {
    let content = buf.trim();
    if !content.is_empty() {
        out.push(Chunk::new(content, section));
    }
}

/// Split on runs of two or more newlines.
fn split_paragraphs(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\n' {
            i += 1;
            continue;
        }
        let run = bytes[i..].iter().take_while(|b| **b == b'\n').count();
        if run >= 2 {
            paragraphs.push(&text[start..i]);
            start = i + run;
        }
        i += run;
    }
    paragraphs.push(&text[start..]);
    paragraphs
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(max_size: usize) -> ChunkOptions {
        ChunkOptions {
            min_size: 0,
            max_size,
        }
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("").is_empty());
        assert!(chunk_text("   \n\n\t ").is_empty());
    }

    #[test]
    fn test_no_headings_single_unknown_chunk() {
        let chunks = chunk_text("Revenue grew 12% year over year.\n\nMargins held steady.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section, UNKNOWN_SECTION);
        assert_eq!(
            chunks[0].content,
            "Revenue grew 12% year over year.\n\nMargins held steady."
        );
    }

    #[test]
    fn test_item_and_section_headings() {
        let text = "Item 1A. Risk Factors\nFoo bar.\n\nSection 2: Outlook\nBaz qux.";
        let chunks = chunk_text(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section, "Item 1A. Risk Factors");
        assert!(chunks[0].content.contains("Foo bar."));
        assert_eq!(chunks[1].section, "Section 2: Outlook");
        assert!(chunks[1].content.contains("Baz qux."));
    }

    #[test]
    fn test_leading_text_before_first_heading() {
        let text = "Annual report 2024\n\nItem 1. Business\nWe make widgets.";
        let chunks = chunk_text(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Annual report 2024");
        assert_eq!(chunks[0].section, UNKNOWN_SECTION);
        assert_eq!(chunks[1].section, "Item 1. Business");
    }

    #[test]
    fn test_leading_region_retagged_after_trim() {
        // Indented, so not a heading in the full text; the trimmed region
        // starts with it and is tagged from it.
        let text = "   Revenue Growth: strong\nItem 7. MD&A\nDetails.";
        let chunks = chunk_text(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section, "Revenue Growth:");
        assert_eq!(chunks[1].section, "Item 7. MD&A");
    }

    #[test]
    fn test_consecutive_headings_each_get_a_chunk() {
        let text = "Item 1. Business\nItem 2. Properties\nWe lease offices.";
        let chunks = chunk_text(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Item 1. Business");
        assert_eq!(chunks[0].section, "Item 1. Business");
        assert_eq!(chunks[1].section, "Item 2. Properties");
    }

    #[test]
    fn test_long_section_split_on_paragraphs() {
        let para = "x".repeat(30);
        let text = format!("Item 5. Market\n\n{para}\n\n{para}\n\n{para}");
        let chunks = chunk_text_with(&text, &opts(70));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert_eq!(c.section, "Item 5. Market");
            assert!(c.content.chars().count() <= 70);
        }
    }

    #[test]
    fn test_flush_when_sum_reaches_max() {
        // buf "aaaa\n\n" (6) + "bbbb" (4) = 10, not < 10: flush.
        let chunks = chunk_text_with("aaaa\n\nbbbb\n\ncc", &opts(10));
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["aaaa", "bbbb\n\ncc"]);
    }

    #[test]
    fn test_oversized_paragraph_kept_whole() {
        let text = "y".repeat(3000);
        let chunks = chunk_text(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content.chars().count(), 3000);
        assert_eq!(chunks[0].section, UNKNOWN_SECTION);
    }

    #[test]
    fn test_table_without_blank_lines_stays_intact() {
        let table = (0..40)
            .map(|i| format!("{}\t{}\t{}\t{}", i, i * 10, i * 100, i * 1000))
            .collect::<Vec<_>>()
            .join("\n");
        let text = format!("Intro paragraph.\n\n{table}\n\nClosing paragraph.");
        let chunks = chunk_text_with(&text, &opts(200));
        assert!(chunks.iter().any(|c| c.content == table));
    }

    #[test]
    fn test_size_counted_in_chars() {
        // 1000 two-byte chars: 2000 bytes but only 1000 characters.
        let text = "é".repeat(1000);
        let chunks = chunk_text_with(&text, &opts(1000));
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_split_paragraphs_on_newline_runs() {
        assert_eq!(split_paragraphs("a\n\nb\n\n\n\nc\nd"), vec!["a", "b", "c\nd"]);
        assert_eq!(split_paragraphs("a\n \nb"), vec!["a\n \nb"]);
    }

    #[test]
    fn test_deterministic() {
        let text = "Item 1. A\nalpha\n\nItem 2. B\nbeta";
        assert_eq!(chunk_text(text), chunk_text(text));
    }
}
