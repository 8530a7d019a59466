//! Section-heading and table-span detection.
//!
//! Headings are recognised only at the start of a line, in three forms:
//!
//! | Form | Example | Label |
//! |------|---------|-------|
//! | `Item <alnum>.` | `Item 1A. Risk Factors` | the whole heading line |
//! | `Section <alnum>:` | `Section 2: Outlook` | the whole heading line |
//! | capitalized phrase + `:` | `Liquidity and Capital Resources:` | the phrase through its colon |
//!
//! `<alnum>` is one or more of `0-9` / `A-Z`. A capitalized phrase is an
//! uppercase letter followed by at least three letters or spaces.
//!
//! A table span is a run of at least four integers separated by tabs,
//! commas, or spaces (`12, 40\t7 9`).
//!
//! All patterns are ASCII, so byte-level scanning never splits a multi-byte
//! character and every offset returned is a valid `str` boundary.

/// Result of searching for a section heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingMatch {
    Heading {
        /// Heading text used to tag chunks.
        label: String,
        /// Byte offset where the section boundary starts: the newline that
        /// precedes the heading, or the heading itself at offset 0.
        offset: usize,
    },
    NoMatch,
}

impl HeadingMatch {
    pub fn label(&self) -> Option<&str> {
        match self {
            HeadingMatch::Heading { label, .. } => Some(label),
            HeadingMatch::NoMatch => None,
        }
    }
}

/// Result of searching for a numeric table span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMatch {
    Table { offset: usize, len: usize },
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadingKind {
    Item,
    Section,
    Phrase,
}

/// Returns the first heading in `text`.
pub fn find_heading(text: &str) -> HeadingMatch {
    headings(text).next().unwrap_or(HeadingMatch::NoMatch)
}

/// Iterates every non-overlapping heading in `text`, in order.
///
/// Only [`HeadingMatch::Heading`] values are yielded.
pub fn headings(text: &str) -> Headings<'_> {
    Headings { text, pos: 0 }
}

pub struct Headings<'a> {
    text: &'a str,
    pos: usize,
}

impl Iterator for Headings<'_> {
    type Item = HeadingMatch;

    fn next(&mut self) -> Option<HeadingMatch> {
        let bytes = self.text.as_bytes();
        let mut q = self.pos;
        while q < bytes.len() {
            if q == 0 || bytes[q - 1] == b'\n' {
                if let Some((end, kind)) = match_heading_at(bytes, q) {
                    self.pos = end;
                    return Some(HeadingMatch::Heading {
                        label: heading_label(self.text, q, end, kind),
                        offset: q.saturating_sub(1),
                    });
                }
            }
            q += 1;
        }
        self.pos = bytes.len();
        None
    }
}

/// Tries to match a heading starting exactly at `start`. Returns the end of
/// the marker (exclusive) and which form matched.
fn match_heading_at(bytes: &[u8], start: usize) -> Option<(usize, HeadingKind)> {
    if let Some(end) = match_marker(bytes, start, b"Item ", b'.') {
        return Some((end, HeadingKind::Item));
    }
    if let Some(end) = match_marker(bytes, start, b"Section ", b':') {
        return Some((end, HeadingKind::Section));
    }
    match_phrase(bytes, start).map(|end| (end, HeadingKind::Phrase))
}

/// `<prefix><[0-9A-Z]+><terminator>`
fn match_marker(bytes: &[u8], start: usize, prefix: &[u8], terminator: u8) -> Option<usize> {
    let rest = bytes.get(start..)?;
    if !rest.starts_with(prefix) {
        return None;
    }
    let id_start = start + prefix.len();
    let id_len = bytes[id_start..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        .count();
    if id_len == 0 {
        return None;
    }
    let term = id_start + id_len;
    (bytes.get(term) == Some(&terminator)).then_some(term + 1)
}

/// `[A-Z][A-Za-z ]{3,}:`
fn match_phrase(bytes: &[u8], start: usize) -> Option<usize> {
    if !bytes.get(start)?.is_ascii_uppercase() {
        return None;
    }
    let run = bytes[start + 1..]
        .iter()
        .take_while(|b| b.is_ascii_alphabetic() || **b == b' ')
        .count();
    let colon = start + 1 + run;
    (run >= 3 && bytes.get(colon) == Some(&b':')).then_some(colon + 1)
}

fn heading_label(text: &str, start: usize, end: usize, kind: HeadingKind) -> String {
    let label_end = match kind {
        HeadingKind::Phrase => end,
        HeadingKind::Item | HeadingKind::Section => text[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(text.len()),
    };
    text[start..label_end].trim().to_string()
}

/// Returns the first numeric table span in `text`.
pub fn find_table(text: &str) -> TableMatch {
    let bytes = text.as_bytes();
    for start in 0..bytes.len() {
        let run_start = bytes[start].is_ascii_digit()
            && (start == 0 || !bytes[start - 1].is_ascii_digit());
        if !run_start {
            continue;
        }
        if let Some(end) = match_table_at(bytes, start) {
            return TableMatch::Table {
                offset: start,
                len: end - start,
            };
        }
    }
    TableMatch::NoMatch
}

pub fn contains_table(text: &str) -> bool {
    matches!(find_table(text), TableMatch::Table { .. })
}

/// Walks alternating digit and separator runs from `start`; a table needs at
/// least four digit runs. Trailing separators are not part of the span.
fn match_table_at(bytes: &[u8], start: usize) -> Option<usize> {
    let is_sep = |b: u8| b == b'\t' || b == b',' || b == b' ';
    let mut pos = start;
    let mut numbers = 0;
    let mut end = start;
    loop {
        let digits = bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            break;
        }
        pos += digits;
        numbers += 1;
        end = pos;
        let seps = bytes[pos..].iter().take_while(|b| is_sep(**b)).count();
        if seps == 0 {
            break;
        }
        pos += seps;
    }
    (numbers >= 4).then_some(end)
}
