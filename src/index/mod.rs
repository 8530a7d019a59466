//! Retrieval index abstraction.
//!
//! The [`RetrievalIndex`] trait is the narrow interface to the external
//! vector store: add chunks under a document id, query by text with optional
//! metadata-equality filters. Ranking and storage belong to the backend.
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | Chroma HTTP server | [`chroma`] | production |
//! | Brute-force in-process | [`memory`] | tests, demos |

pub mod chroma;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::IndexConfig;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::models::{Chunk, ChunkMetadata, MetadataFilter, QueryHit};

pub use chroma::ChromaIndex;
pub use memory::InMemoryIndex;

#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// Store `chunks` under ids `"{doc_id}_{position}"` with
    /// `{section, doc_id}` metadata. Returns the ids written.
    ///
    /// There is no deduplication: re-adding a document with the same
    /// `doc_id` reuses the same ids and the backend decides what happens.
    async fn add(&self, chunks: &[Chunk], doc_id: &str) -> Result<Vec<String>>;

    /// Return up to `k` hits nearest to `query_text`, closest first.
    async fn query(
        &self,
        query_text: &str,
        k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>>;
}

/// Ids for a document's chunks, in chunk order.
pub fn chunk_ids(doc_id: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}_{}", doc_id, i)).collect()
}

pub fn chunk_metadata(chunks: &[Chunk], doc_id: &str) -> Vec<ChunkMetadata> {
    chunks
        .iter()
        .map(|c| ChunkMetadata {
            section: c.section.clone(),
            doc_id: doc_id.to_string(),
        })
        .collect()
}

/// True when every filter key is present in `metadata` with an equal value.
pub fn matches_filter(metadata: &ChunkMetadata, filters: Option<&MetadataFilter>) -> bool {
    filters.map_or(true, |f| {
        f.iter().all(|(key, value)| metadata.get(key) == Some(value.as_str()))
    })
}

/// Build the index named by `config.provider`.
pub async fn create_index(
    config: &IndexConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn RetrievalIndex>> {
    match config.provider.as_str() {
        "memory" => Ok(Arc::new(InMemoryIndex::new(embedder))),
        "chroma" => Ok(Arc::new(
            ChromaIndex::connect(&config.url, &config.collection, embedder).await?,
        )),
        other => Err(Error::Config(format!("unknown index provider: {}", other))),
    }
}
