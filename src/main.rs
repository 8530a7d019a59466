//! # Memo Harness CLI (`memo`)
//!
//! Chunk financial filings, index them for retrieval, and draft investment
//! memos from the retrieved context.
//!
//! ## Usage
//!
//! ```bash
//! memo --config ./config/memo.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `memo chunk <file>` | Print the section-tagged chunks of a PDF or TXT file |
//! | `memo ingest <file>` | Chunk a file and add it to the configured index |
//! | `memo generate "<query>"` | Draft a memo (or one section) from indexed chunks |
//! | `memo serve` | Start the HTTP API |
//!
//! A missing config file is not an error: every setting has a default.
//! `OPENAI_API_KEY` is read from the environment (or a `.env` file).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use memo_harness::chunk::ChunkOptions;
use memo_harness::config::{self, Config};
use memo_harness::detect::contains_table;
use memo_harness::embedding::create_embedder;
use memo_harness::index::{create_index, RetrievalIndex};
use memo_harness::llm::OpenAiCompletion;
use memo_harness::loader;
use memo_harness::memo::{GenerationSettings, MemoGenerator};
use memo_harness::models::MetadataFilter;
use memo_harness::server::{self, AppState};

/// Memo Harness CLI: section-aware chunking and retrieval-augmented memo
/// drafting for financial documents.
#[derive(Parser)]
#[command(
    name = "memo",
    about = "Chunk financial documents and draft investment memos from retrieved context",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/memo.toml`. Built-in defaults are used when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/memo.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk a document and print the result.
    ///
    /// Runs no network calls; useful for checking how a filing is segmented.
    Chunk {
        /// Path to a `.pdf` or `.txt` file.
        file: PathBuf,

        /// Override `[chunking].max_size`.
        #[arg(long)]
        max_size: Option<usize>,

        /// Override `[chunking].min_size`.
        #[arg(long)]
        min_size: Option<usize>,

        /// Print chunks as JSON instead of a summary listing.
        #[arg(long)]
        json: bool,
    },

    /// Chunk a document and add it to the configured index.
    Ingest {
        /// Path to a `.pdf` or `.txt` file.
        file: PathBuf,

        /// Document id used as the chunk id prefix. A random UUID by default.
        #[arg(long)]
        doc_id: Option<String>,
    },

    /// Generate a memo from indexed chunks.
    Generate {
        /// Retrieval query, e.g. the company or topic of the memo.
        query: String,

        /// Metadata equality filter as `key=value` (`doc_id`, `section`).
        #[arg(long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,

        /// Generate only this section instead of the full memo.
        #[arg(long)]
        section: Option<String>,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

/// Parse a `key=value` pair for `--filter` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn read_config(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        debug!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::default())
    }
}

fn api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}

async fn open_index(cfg: &Config) -> Result<Arc<dyn RetrievalIndex>> {
    let embedder = create_embedder(&cfg.embedding, api_key())?;
    info!(
        index = %cfg.index.provider,
        embedding_model = embedder.model_name(),
        "opening retrieval index"
    );
    let index = create_index(&cfg.index, embedder)
        .await
        .with_context(|| format!("Failed to open '{}' index", cfg.index.provider))?;
    Ok(index)
}

fn build_generator(cfg: &Config, index: Arc<dyn RetrievalIndex>) -> Result<MemoGenerator> {
    let Some(key) = api_key() else {
        bail!("OPENAI_API_KEY must be set to generate memos");
    };
    let llm = Arc::new(OpenAiCompletion::new(key, &cfg.generation.base_url));
    Ok(MemoGenerator::new(
        index,
        llm,
        GenerationSettings::from(&cfg.generation),
    ))
}

fn run_chunk(
    cfg: &Config,
    file: &Path,
    max_size: Option<usize>,
    min_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let options = ChunkOptions {
        min_size: min_size.unwrap_or(cfg.chunking.min_size),
        max_size: max_size.unwrap_or(cfg.chunking.max_size),
    };
    if options.max_size == 0 {
        bail!("--max-size must be > 0");
    }
    let chunks = loader::load_with(file, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    println!("{} chunk(s) from {}", chunks.len(), file.display());
    for (i, chunk) in chunks.iter().enumerate() {
        let table = if contains_table(&chunk.content) {
            "  [table]"
        } else {
            ""
        };
        println!(
            "{:>4}  {:<40}  {:>6} chars{}",
            i,
            chunk.section,
            chunk.content.chars().count(),
            table
        );
    }
    Ok(())
}

async fn run_ingest(cfg: &Config, file: &Path, doc_id: Option<String>) -> Result<()> {
    let chunks = loader::load_with(file, &cfg.chunking)?;
    let index = open_index(cfg).await?;
    let doc_id = doc_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let ids = index.add(&chunks, &doc_id).await?;
    println!(
        "Indexed {} chunk(s) from {} as doc_id {}",
        ids.len(),
        file.display(),
        doc_id
    );
    Ok(())
}

async fn run_generate(
    cfg: &Config,
    query: &str,
    filters: Vec<(String, String)>,
    section: Option<String>,
) -> Result<()> {
    let index = open_index(cfg).await?;
    let generator = build_generator(cfg, index)?;
    let filters: MetadataFilter = filters.into_iter().collect();
    let filters = (!filters.is_empty()).then_some(&filters);

    match section {
        Some(name) => {
            let text = generator.generate_section(query, &name, filters).await?;
            println!("## {}\n\n{}", name, text);
        }
        None => {
            let memo = generator.generate_memo(query, filters).await?;
            for (name, text) in memo.iter() {
                println!("## {}\n\n{}\n", name, text);
            }
        }
    }
    Ok(())
}

async fn run_serve(cfg: &Config) -> Result<()> {
    let index = open_index(cfg).await?;
    let generator = build_generator(cfg, index.clone())?;
    let state = AppState {
        index,
        generator: Arc::new(generator),
        chunking: cfg.chunking,
        max_upload_bytes: cfg.server.max_upload_bytes,
    };
    server::run_server(&cfg.server.bind, state).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = read_config(&cli.config)?;

    match cli.command {
        Commands::Chunk {
            file,
            max_size,
            min_size,
            json,
        } => run_chunk(&cfg, &file, max_size, min_size, json)?,
        Commands::Ingest { file, doc_id } => run_ingest(&cfg, &file, doc_id).await?,
        Commands::Generate {
            query,
            filters,
            section,
        } => run_generate(&cfg, &query, filters, section).await?,
        Commands::Serve => run_serve(&cfg).await?,
    }

    Ok(())
}
