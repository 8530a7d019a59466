//! End-to-end library tests: chunk a filing, index it in memory, and draft a
//! memo with a scripted completion service.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use memo_harness::chunk::{chunk_text, chunk_text_with, ChunkOptions};
use memo_harness::detect::contains_table;
use memo_harness::embedding::Embedder;
use memo_harness::error::{Error, Result};
use memo_harness::index::{InMemoryIndex, RetrievalIndex};
use memo_harness::llm::{CompletionRequest, CompletionService};
use memo_harness::memo::{GenerationSettings, MemoGenerator};
use memo_harness::models::MetadataFilter;
use memo_harness::prompt::MemoSection;

const FILING: &str = "Item 1. Business\nAcme designs industrial widgets for utilities.\n\n\
Item 1A. Risk Factors\nSupply disruption and competition are key risks.\n\n\
Item 7. Results\nRevenue by quarter\n120, 135, 150, 171\n\n\
Section 2: Outlook\nManagement expects revenue growth to continue.";

fn non_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Bag-of-keywords embedding so retrieval order is predictable.
struct KeywordEmbedder;

const KEYWORDS: [&str; 4] = ["revenue", "risk", "widget", "outlook"];

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keywords"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                KEYWORDS
                    .iter()
                    .map(|k| t.matches(k).count() as f32 + 0.01)
                    .collect()
            })
            .collect())
    }
}

/// Records each prompt and replies with a canned line per call.
#[derive(Default)]
struct ScriptedLlm {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionService for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(request.messages[0].content.clone());
        Ok(format!("- point {}", prompts.len()))
    }
}

struct FailingLlm;

#[async_trait]
impl CompletionService for FailingLlm {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Err(Error::Generation("quota exceeded".to_string()))
    }
}

async fn indexed_filing() -> Arc<InMemoryIndex> {
    let index = Arc::new(InMemoryIndex::new(Arc::new(KeywordEmbedder)));
    let chunks = chunk_text(FILING);
    index.add(&chunks, "acme-10k").await.unwrap();
    index
}

#[test]
fn chunking_preserves_non_whitespace_content() {
    let chunks = chunk_text(FILING);
    let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(non_whitespace(&joined), non_whitespace(FILING));
}

#[test]
fn chunking_tags_each_heading_region() {
    let sections: Vec<String> = chunk_text(FILING).into_iter().map(|c| c.section).collect();
    assert_eq!(
        sections,
        vec![
            "Item 1. Business",
            "Item 1A. Risk Factors",
            "Item 7. Results",
            "Section 2: Outlook"
        ]
    );
}

#[test]
fn small_bounds_keep_tables_whole() {
    let options = ChunkOptions {
        min_size: 5,
        max_size: 30,
    };
    let chunks = chunk_text_with(FILING, &options);
    let table = chunks
        .iter()
        .find(|c| contains_table(&c.content))
        .expect("table chunk");
    assert!(table.content.contains("120, 135, 150, 171"));

    let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(non_whitespace(&joined), non_whitespace(FILING));
}

#[tokio::test]
async fn memo_draws_on_indexed_chunks() {
    let index = indexed_filing().await;
    assert_eq!(index.len(), 4);
    let llm = Arc::new(ScriptedLlm::default());
    let generator = MemoGenerator::new(index, llm.clone(), GenerationSettings::default());

    let memo = generator.generate_memo("Acme revenue", None).await.unwrap();
    assert_eq!(memo.len(), MemoSection::ALL.len());
    assert_eq!(memo.get("Company Overview"), Some("- point 1"));
    assert_eq!(memo.get("Valuation Notes"), Some("- point 5"));

    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 5);
    // Every section sees the retrieved filing text as context.
    assert!(prompts[0].contains("Revenue by quarter"));
    assert!(prompts[2].contains("write the 'Risk Factors' section"));
}

#[tokio::test]
async fn memo_over_empty_index_still_has_every_section() {
    let index = Arc::new(InMemoryIndex::new(Arc::new(KeywordEmbedder)));
    let llm = Arc::new(ScriptedLlm::default());
    let generator = MemoGenerator::new(index, llm.clone(), GenerationSettings::default());

    let memo = generator.generate_memo("anything", None).await.unwrap();
    let names: Vec<&str> = memo.iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        vec![
            "Company Overview",
            "Financial Highlights",
            "Risk Factors",
            "Opportunities",
            "Valuation Notes"
        ]
    );
    assert!(llm.prompts.lock().unwrap()[0].contains("Context:\n\n\n"));
}

#[tokio::test]
async fn filters_restrict_context_to_one_document() {
    let index = indexed_filing().await;
    let other = chunk_text("Item 1. Business\nGlobex sells risk software.");
    index.add(&other, "globex-10k").await.unwrap();

    let llm = Arc::new(ScriptedLlm::default());
    let generator = MemoGenerator::new(index, llm.clone(), GenerationSettings::default());
    let mut filter = MetadataFilter::new();
    filter.insert("doc_id".to_string(), "globex-10k".to_string());

    generator
        .generate_section("risk", "Risk Factors", Some(&filter))
        .await
        .unwrap();
    let prompt = llm.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("Globex"));
    assert!(!prompt.contains("Acme"));
}

#[tokio::test]
async fn generation_failure_surfaces_without_partial_memo() {
    let index = indexed_filing().await;
    let generator = MemoGenerator::new(index, Arc::new(FailingLlm), GenerationSettings::default());
    let err = generator.generate_memo("acme", None).await.unwrap_err();
    assert_eq!(err.code(), "generation_failure");
}
