//! In-process [`RetrievalIndex`] for tests and demos.
//!
//! Records live in a `Vec` behind a `RwLock`; queries are brute-force cosine
//! distance (`1 - cos`) over every stored vector. Nothing is persisted.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{Error, Result};
use crate::models::{Chunk, ChunkMetadata, MetadataFilter, QueryHit};

use super::{chunk_ids, chunk_metadata, matches_filter, RetrievalIndex};

struct Record {
    id: String,
    content: String,
    metadata: ChunkMetadata,
    vector: Vec<f32>,
}

pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    records: RwLock<Vec<Record>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Retrieval("in-memory index lock poisoned".to_string())
}

#[async_trait]
impl RetrievalIndex for InMemoryIndex {
    async fn add(&self, chunks: &[Chunk], doc_id: &str) -> Result<Vec<String>> {
        let ids = chunk_ids(doc_id, chunks.len());
        if chunks.is_empty() {
            return Ok(ids);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        let metadatas = chunk_metadata(chunks, doc_id);

        let mut records = self.records.write().map_err(poisoned)?;
        for (((id, content), metadata), vector) in
            ids.iter().zip(texts).zip(metadatas).zip(vectors)
        {
            // Existing ids are kept, matching Chroma's `add`.
            if records.iter().any(|r| r.id == *id) {
                warn!(id = %id, "id already indexed; skipping");
                continue;
            }
            records.push(Record {
                id: id.clone(),
                content,
                metadata,
                vector,
            });
        }
        info!(doc_id, chunks = chunks.len(), "added chunks to in-memory index");
        Ok(ids)
    }

    async fn query(
        &self,
        query_text: &str,
        k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>> {
        let query_vec = self.embedder.embed_query(query_text).await?;
        let records = self.records.read().map_err(poisoned)?;
        let mut hits: Vec<QueryHit> = records
            .iter()
            .filter(|r| matches_filter(&r.metadata, filters))
            .map(|r| QueryHit {
                id: r.id.clone(),
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                distance: 1.0 - cosine_similarity(&query_vec, &r.vector) as f64,
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}
