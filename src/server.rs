//! HTTP API for uploading documents and generating memos.
//!
//! The index and generator are built once by the caller and injected through
//! [`AppState`]; handlers hold no other state.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/documents` | Multipart upload of one PDF/TXT file; chunks and indexes it |
//! | `POST` | `/memo` | Generate all five memo sections |
//! | `POST` | `/memo/sections/{name}` | Generate a single section |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "unsupported_format", "message": "..." } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request`, `unsupported_format`, `encoding_error` | 400 |
//! | `payload_too_large` | 413 |
//! | `extraction_failure` | 422 |
//! | `retrieval_failure`, `generation_failure` | 502 |
//! | `io_error`, `config_error`, `internal_error` | 500 |

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::chunk::ChunkOptions;
use crate::error::Error;
use crate::index::RetrievalIndex;
use crate::loader::load_bytes;
use crate::memo::MemoGenerator;
use crate::models::{Memo, MetadataFilter};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<dyn RetrievalIndex>,
    pub generator: Arc<MemoGenerator>,
    pub chunking: ChunkOptions,
    /// Body limit for `POST /documents`, in bytes.
    pub max_upload_bytes: usize,
}

/// Build the router with CORS open to all origins.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_upload).layer(upload_limit))
        .route("/memo", post(handle_memo))
        .route("/memo/sections/{name}", post(handle_section))
        .layer(cors)
        .with_state(state)
}

/// Bind to `bind_addr` and serve until the process exits.
pub async fn run_server(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("memo server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::UnsupportedFormat(_) | Error::Encoding(_) => StatusCode::BAD_REQUEST,
            Error::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Retrieval(_) | Error::Generation(_) => StatusCode::BAD_GATEWAY,
            Error::Io(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Multipart errors carry their own status (413 when over the body limit).
fn multipart_error(err: MultipartError) -> AppError {
    let status = err.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "payload_too_large"
    } else {
        "bad_request"
    };
    AppError {
        status,
        code: code.to_string(),
        message: err.body_text(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /documents ============

#[derive(Serialize)]
struct UploadResponse {
    doc_id: String,
    filename: String,
    chunks: usize,
}

/// Reads the first multipart field as the file. A fresh UUID is used as the
/// document id so repeated uploads never collide.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
        .ok_or_else(|| bad_request("no file provided"))?;

    let filename = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| bad_request("file field has no filename"))?;
    let bytes = field.bytes().await.map_err(multipart_error)?;

    // PDF parsing is CPU-bound; keep it off the async workers.
    let chunking = state.chunking;
    let name = filename.clone();
    let chunks = tokio::task::spawn_blocking(move || load_bytes(&bytes, &name, &chunking))
        .await
        .map_err(|e| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error".to_string(),
            message: format!("loader task failed: {}", e),
        })??;
    let doc_id = Uuid::new_v4().to_string();
    state.index.add(&chunks, &doc_id).await?;
    info!(filename = %filename, doc_id = %doc_id, chunks = chunks.len(), "indexed upload");

    Ok(Json(UploadResponse {
        doc_id,
        filename,
        chunks: chunks.len(),
    }))
}

// ============ POST /memo ============

#[derive(Deserialize)]
struct MemoRequest {
    query: String,
    #[serde(default)]
    filters: Option<MetadataFilter>,
}

impl MemoRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.query.trim().is_empty() {
            return Err(bad_request("query must not be empty"));
        }
        Ok(())
    }
}

async fn handle_memo(
    State(state): State<AppState>,
    Json(req): Json<MemoRequest>,
) -> Result<Json<Memo>, AppError> {
    req.validate()?;
    let memo = state
        .generator
        .generate_memo(&req.query, req.filters.as_ref())
        .await?;
    Ok(Json(memo))
}

// ============ POST /memo/sections/{name} ============

#[derive(Serialize)]
struct SectionResponse {
    section: String,
    text: String,
}

async fn handle_section(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<MemoRequest>,
) -> Result<Json<SectionResponse>, AppError> {
    req.validate()?;
    let text = state
        .generator
        .generate_section(&req.query, &name, req.filters.as_ref())
        .await?;
    Ok(Json(SectionResponse { section: name, text }))
}
