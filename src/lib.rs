//! # Memo Harness
//!
//! Section-aware chunking of financial filings and retrieval-augmented
//! drafting of investment memos.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │  Loader  │──▶│ Chunker  │──▶│    Index     │
//! │ PDF/TXT  │   │ sections │   │ Chroma / mem │
//! └──────────┘   └──────────┘   └──────┬───────┘
//!                                      │ top-k
//!                                      ▼
//!                               ┌──────────────┐
//!                               │ MemoGenerator│──▶ LLM
//!                               └──────┬───────┘
//!                          ┌───────────┴──────────┐
//!                          ▼                      ▼
//!                    ┌──────────┐           ┌──────────┐
//!                    │   CLI    │           │   HTTP   │
//!                    │  (memo)  │           │  (axum)  │
//!                    └──────────┘           └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`detect`] | Heading and numeric-table pattern matching |
//! | [`chunk`] | Two-phase section/size chunker |
//! | [`loader`] | PDF/TXT extraction and chunking |
//! | [`models`] | Core data types |
//! | [`error`] | Error kinds shared across the crate |
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Retrieval index trait and backends |
//! | [`llm`] | Chat-completion client |
//! | [`prompt`] | Memo sections and prompt templates |
//! | [`memo`] | Memo generator |
//! | [`server`] | HTTP API |

pub mod chunk;
pub mod config;
pub mod detect;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod loader;
pub mod memo;
pub mod models;
pub mod prompt;
pub mod server;
