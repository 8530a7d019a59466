//! Retrieval-augmented memo generation.
//!
//! [`MemoGenerator`] owns handles to the retrieval index and the completion
//! service. Each section is one query plus one completion call, awaited in
//! order. Nothing is retried or caught: the first failure ends the section,
//! and a failed section ends the memo with no partial result.

use std::sync::Arc;

use tracing::info;

use crate::config::GenerationConfig;
use crate::error::Result;
use crate::index::RetrievalIndex;
use crate::llm::{CompletionRequest, CompletionService, Message};
use crate::models::{Memo, MetadataFilter};
use crate::prompt::{build_memo_prompt, build_summary_prompt, MemoSection};

/// Completion parameters and retrieval depth.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub summary_max_tokens: u32,
    pub top_k: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for GenerationSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            summary_max_tokens: config.summary_max_tokens,
            top_k: config.top_k,
        }
    }
}

pub struct MemoGenerator {
    index: Arc<dyn RetrievalIndex>,
    llm: Arc<dyn CompletionService>,
    settings: GenerationSettings,
}

impl MemoGenerator {
    pub fn new(
        index: Arc<dyn RetrievalIndex>,
        llm: Arc<dyn CompletionService>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            index,
            llm,
            settings,
        }
    }

    /// Retrieve the top-k chunks for `query` and write one memo section.
    ///
    /// An empty retrieval still calls the model, with an empty context.
    pub async fn generate_section(
        &self,
        query: &str,
        section: &str,
        filters: Option<&MetadataFilter>,
    ) -> Result<String> {
        let hits = self.index.query(query, self.settings.top_k, filters).await?;
        let context = hits
            .iter()
            .map(|h| h.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_memo_prompt(&context, section);
        info!(section, chunks = hits.len(), "generating section");

        let text = self.complete(prompt, self.settings.max_tokens).await?;
        Ok(text.trim().to_string())
    }

    /// Generate every [`MemoSection`] in order.
    pub async fn generate_memo(
        &self,
        query: &str,
        filters: Option<&MetadataFilter>,
    ) -> Result<Memo> {
        let mut memo = Memo::new();
        for section in MemoSection::ALL {
            let text = self.generate_section(query, section.name(), filters).await?;
            memo.insert(section.name(), text);
        }
        info!(sections = memo.len(), "memo complete");
        Ok(memo)
    }

    /// Summarize already-selected chunk texts under a section heading.
    pub async fn summarize_chunks(&self, chunks: &[String], section: &str) -> Result<String> {
        info!(section, chunks = chunks.len(), "summarizing chunks");
        let prompt = build_summary_prompt(chunks, section);
        let text = self.complete(prompt, self.settings.summary_max_tokens).await?;
        Ok(text.trim().to_string())
    }

    async fn complete(&self, prompt: String, max_tokens: u32) -> Result<String> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.settings.temperature,
            max_tokens,
        };
        self.llm.complete(&request).await
    }
}
