//! Core data models used throughout the memo pipeline.
//!
//! These types represent the documents, chunks, retrieval hits, and memos
//! that flow from ingestion through generation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Section tag used when no heading is found in a chunk.
pub const UNKNOWN_SECTION: &str = "Unknown";

/// Source formats the loader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Txt,
}

impl DocumentFormat {
    /// Detect the format from a file name's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" => Some(DocumentFormat::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Txt => "txt",
        }
    }
}

/// Raw text extracted from a source file. Exists only while loading.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: String,
    pub format: DocumentFormat,
    pub text: String,
}

/// A section-tagged span of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub section: String,
}

impl Chunk {
    pub fn new(content: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            section: section.into(),
        }
    }
}

/// Metadata stored alongside each chunk in the retrieval index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub section: String,
    pub doc_id: String,
}

impl ChunkMetadata {
    /// Look up a metadata field by its index-side key.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "section" => Some(&self.section),
            "doc_id" => Some(&self.doc_id),
            _ => None,
        }
    }
}

/// Metadata equality filters applied to a query (`where` clause).
pub type MetadataFilter = BTreeMap<String, String>;

/// A ranked result from the retrieval index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub distance: f64,
}

/// A generated memo: section names mapped to text, in generation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memo {
    sections: Vec<(String, String)>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, section: impl Into<String>, text: impl Into<String>) {
        let section = section.into();
        let text = text.into();
        match self.sections.iter_mut().find(|(name, _)| *name == section) {
            Some(entry) => entry.1 = text,
            None => self.sections.push((section, text)),
        }
    }

    pub fn get(&self, section: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, text)| text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// Serialized as a JSON object whose keys keep generation order.
impl Serialize for Memo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (name, text) in &self.sections {
            map.serialize_entry(name, text)?;
        }
        map.end()
    }
}
