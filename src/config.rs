//! TOML configuration.
//!
//! Every section is optional and falls back to the defaults below, so an
//! empty file is a valid configuration. Credentials are never read here; the
//! binary pulls `OPENAI_API_KEY` from the environment and passes it into the
//! service constructors.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::chunk::ChunkOptions;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkOptions,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// `chroma` (external server) or `memory` (process-local, lost on exit).
    #[serde(default = "default_index_provider")]
    pub provider: String,
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: default_index_provider(),
            url: default_index_url(),
            collection: default_collection(),
        }
    }
}

fn default_index_provider() -> String {
    "chroma".to_string()
}
fn default_index_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_collection() -> String {
    "orggpt_docs".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            base_url: default_api_base(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
    /// Chunks retrieved per memo section.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_api_base")]
    pub base_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            summary_max_tokens: default_summary_max_tokens(),
            top_k: default_top_k(),
            base_url: default_api_base(),
        }
    }
}

fn default_generation_model() -> String {
    "gpt-3.5-turbo-0125".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    600
}
fn default_summary_max_tokens() -> u32 {
    400
}
fn default_top_k() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest accepted `POST /documents` body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}
fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

/// Read and validate a config file. A missing file is an error; use
/// [`Config::default`] when no file is wanted.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_size == 0 {
        bail!("chunking.max_size must be > 0");
    }
    if config.chunking.min_size > config.chunking.max_size {
        bail!(
            "chunking.min_size ({}) must not exceed chunking.max_size ({})",
            config.chunking.min_size,
            config.chunking.max_size
        );
    }

    if config.generation.top_k == 0 {
        bail!("generation.top_k must be >= 1");
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        bail!("generation.temperature must be in [0.0, 2.0]");
    }

    match config.index.provider.as_str() {
        "chroma" | "memory" => {}
        other => bail!(
            "Unknown index provider: '{}'. Must be chroma or memory.",
            other
        ),
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    if config.server.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.chunking.min_size, 500);
        assert_eq!(cfg.chunking.max_size, 2000);
        assert_eq!(cfg.generation.top_k, 8);
        assert_eq!(cfg.generation.max_tokens, 600);
        assert_eq!(cfg.generation.model, "gpt-3.5-turbo-0125");
        assert_eq!(cfg.index.collection, "orggpt_docs");
        assert_eq!(cfg.embedding.model, "text-embedding-3-small");
        assert_eq!(cfg.server.max_upload_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_config("[chunking]\nmax_size = 800\n\n[index]\nprovider = \"memory\"\n")
            .unwrap();
        assert_eq!(cfg.chunking.max_size, 800);
        assert_eq!(cfg.chunking.min_size, 500);
        assert_eq!(cfg.index.provider, "memory");
        assert_eq!(cfg.index.url, "http://localhost:8000");
    }

    #[test]
    fn rejects_zero_max_size() {
        let err = parse_config("[chunking]\nmin_size = 0\nmax_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_size"));
    }

    #[test]
    fn upload_limit_is_configurable() {
        let cfg = parse_config("[server]\nmax_upload_bytes = 1048576\n").unwrap();
        assert_eq!(cfg.server.max_upload_bytes, 1024 * 1024);
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");
        assert!(parse_config("[server]\nmax_upload_bytes = 0\n").is_err());
    }

    #[test]
    fn rejects_min_above_max() {
        assert!(parse_config("[chunking]\nmin_size = 900\nmax_size = 800\n").is_err());
    }

    #[test]
    fn rejects_unknown_providers() {
        assert!(parse_config("[index]\nprovider = \"pinecone\"\n").is_err());
        assert!(parse_config("[embedding]\nprovider = \"cohere\"\n").is_err());
    }

    #[test]
    fn rejects_zero_top_k() {
        assert!(parse_config("[generation]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/memo.toml")).is_err());
    }
}
