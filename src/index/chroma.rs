//! [`RetrievalIndex`] backed by a Chroma server's REST API.
//!
//! Vectors are computed client-side with the injected [`Embedder`] and sent
//! alongside the documents, so the server needs no embedding function.
//!
//! | Call | Endpoint |
//! |------|----------|
//! | connect | `POST /api/v1/collections` (`get_or_create`) |
//! | add | `POST /api/v1/collections/{id}/add` |
//! | query | `POST /api/v1/collections/{id}/query` |

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::models::{Chunk, ChunkMetadata, MetadataFilter, QueryHit};

use super::{chunk_ids, chunk_metadata, RetrievalIndex};

pub struct ChromaIndex {
    client: reqwest::Client,
    base_url: String,
    collection_id: String,
    embedder: Arc<dyn Embedder>,
}

impl ChromaIndex {
    /// Get or create `collection` on the server at `base_url`.
    pub async fn connect(
        base_url: &str,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();
        let body = json!({ "name": collection, "get_or_create": true });
        let resp = post_json(&client, &format!("{}/api/v1/collections", base_url), &body).await?;
        let collection_id = resp
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Retrieval("collection response missing id".to_string()))?
            .to_string();
        info!(collection, collection_id = %collection_id, "connected to Chroma");
        Ok(Self {
            client,
            base_url,
            collection_id,
            embedder,
        })
    }

    fn collection_url(&self, op: &str) -> String {
        format!(
            "{}/api/v1/collections/{}/{}",
            self.base_url, self.collection_id, op
        )
    }
}

#[async_trait]
impl RetrievalIndex for ChromaIndex {
    async fn add(&self, chunks: &[Chunk], doc_id: &str) -> Result<Vec<String>> {
        let ids = chunk_ids(doc_id, chunks.len());
        if chunks.is_empty() {
            return Ok(ids);
        }
        let documents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&documents).await?;
        let body = json!({
            "ids": ids,
            "documents": documents,
            "metadatas": chunk_metadata(chunks, doc_id),
            "embeddings": embeddings,
        });
        post_json(&self.client, &self.collection_url("add"), &body).await?;
        info!(doc_id, chunks = chunks.len(), "added chunks to Chroma");
        Ok(ids)
    }

    async fn query(
        &self,
        query_text: &str,
        k: usize,
        filters: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>> {
        let query_vec = self.embedder.embed_query(query_text).await?;
        let mut body = json!({
            "query_embeddings": [query_vec],
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(clause) = filters.and_then(where_clause) {
            body["where"] = clause;
        }
        debug!(k, filtered = filters.is_some(), "querying Chroma");
        let resp = post_json(&self.client, &self.collection_url("query"), &body).await?;
        parse_query_response(&resp)
    }
}

async fn post_json(client: &reqwest::Client, url: &str, body: &Value) -> Result<Value> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::Retrieval(format!("index unreachable: {}", e)))?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::Retrieval(format!("index error {}: {}", status, text)));
    }
    response
        .json()
        .await
        .map_err(|e| Error::Retrieval(format!("invalid index response: {}", e)))
}

/// Chroma accepts one equality per object; several are joined with `$and`.
fn where_clause(filters: &MetadataFilter) -> Option<Value> {
    let mut terms: Vec<Value> = filters
        .iter()
        .map(|(key, value)| {
            let mut term = serde_json::Map::new();
            term.insert(key.clone(), Value::String(value.clone()));
            Value::Object(term)
        })
        .collect();
    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(json!({ "$and": terms })),
    }
}

/// Zip the first row of Chroma's parallel `ids`/`documents`/`metadatas`/
/// `distances` arrays into hits.
fn parse_query_response(resp: &Value) -> Result<Vec<QueryHit>> {
    let first_row = |field: &str| -> Result<Vec<Value>> {
        match &resp[field][0] {
            Value::Array(items) => Ok(items.clone()),
            Value::Null => Ok(Vec::new()),
            _ => Err(Error::Retrieval(format!("malformed '{}' in query response", field))),
        }
    };
    let ids = first_row("ids")?;
    let documents = first_row("documents")?;
    let metadatas = first_row("metadatas")?;
    let distances = first_row("distances")?;

    let n = ids.len();
    if documents.len() != n || metadatas.len() != n || distances.len() != n {
        return Err(Error::Retrieval(
            "query response arrays have different lengths".to_string(),
        ));
    }

    ids.into_iter()
        .zip(documents)
        .zip(metadatas)
        .zip(distances)
        .map(|(((id, document), metadata), distance)| {
            let metadata: ChunkMetadata = serde_json::from_value(metadata)
                .map_err(|e| Error::Retrieval(format!("bad metadata: {}", e)))?;
            Ok(QueryHit {
                id: expect_str(&id, "id")?,
                content: expect_str(&document, "document")?,
                metadata,
                distance: distance.as_f64().ok_or_else(|| malformed("distance", &distance))?,
            })
        })
        .collect()
}

fn expect_str(value: &Value, field: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(field, value))
}

fn malformed(field: &str, value: &Value) -> Error {
    Error::Retrieval(format!("malformed {} in query response: {}", field, value))
}
