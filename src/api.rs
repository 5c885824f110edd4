//! HTTP surface for docqa.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Liveness plus a description of the loaded document.
//! - `POST /upload` – Multipart upload (`file` field) of a `.pdf` or `.txt`; replaces the loaded
//!   document and returns `{ filename, characters, total_chunks }`.
//! - `POST /answer` – Answer `{ question, mode?, language? }` from the loaded document.
//! - `POST /recall` – Raw nearest chunks for `{ query, top_k? }`, for debugging retrieval.
//! - `POST /reset` – Drop the loaded document.
//! - `GET /metrics` – Upload and question counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same pipeline with the MCP server, so behavior is identical across
//! interfaces.

use crate::extraction::ExtractionError;
use crate::metrics::MetricsSnapshot;
use crate::processing::{AskError, AskRequest, DocumentApi, UploadError, sanitize::sanitize_string};
use crate::retrieval::{IndexStatus, Language, Mode, QueryIntent, RetrievalError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router; `body_limit` caps upload request bodies in bytes.
pub fn create_router<S>(service: Arc<S>, body_limit: usize) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/", get(root::<S>))
        .route("/upload", post(upload_document::<S>))
        .route("/answer", post(answer_question::<S>))
        .route("/recall", post(recall_chunks::<S>))
        .route("/reset", post(reset_index::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// Response body for `GET /`.
#[derive(Serialize)]
struct RootResponse {
    status: &'static str,
    message: &'static str,
    index: IndexStatus,
}

async fn root<S>(State(service): State<Arc<S>>) -> Json<RootResponse>
where
    S: DocumentApi,
{
    Json(RootResponse {
        status: "ok",
        message: "Document QA backend is running",
        index: service.index_status(),
    })
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    filename: String,
    characters: usize,
    total_chunks: usize,
    epoch_id: String,
    sha256: String,
}

/// Store the `file` field, extract its text and publish it as the live document.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: DocumentApi,
{
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }
    let Some((filename, bytes)) = upload else {
        return Err(AppError::BadRequest("multipart field `file` is required".into()));
    };

    let outcome = service.upload(bytes, filename).await?;
    tracing::info!(
        filename = %outcome.filename,
        characters = outcome.char_count,
        chunks = outcome.chunk_count,
        epoch = %outcome.epoch_id,
        "Upload request completed"
    );
    Ok(Json(UploadResponse {
        filename: outcome.filename,
        characters: outcome.char_count,
        total_chunks: outcome.chunk_count,
        epoch_id: outcome.epoch_id,
        sha256: outcome.sha256,
    }))
}

/// Request body for `POST /answer`.
#[derive(Deserialize)]
struct AnswerRequest {
    question: String,
    /// `qa` (default) | `summary` | `short_notes` | `long_notes` | `bullets`.
    #[serde(default)]
    mode: Option<String>,
    /// `english` (default) | `hindi` | `hinglish`.
    #[serde(default)]
    language: Option<String>,
}

/// Response body for `POST /answer`.
#[derive(Serialize)]
struct AnswerResponse {
    question: String,
    mode: Mode,
    language: Language,
    intent: QueryIntent,
    answer: String,
}

async fn answer_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError>
where
    S: DocumentApi,
{
    let mode = sanitize_string(request.mode).unwrap_or_default();
    let language = sanitize_string(request.language).unwrap_or_default();
    let outcome = service
        .ask(AskRequest::from_labels(request.question, &mode, &language))
        .await?;
    tracing::info!(
        intent = %outcome.intent,
        generated = outcome.generated,
        context_chunks = outcome.context_chunks,
        "Answer request completed"
    );
    Ok(Json(AnswerResponse {
        question: outcome.question,
        mode: outcome.mode,
        language: outcome.language,
        intent: outcome.intent,
        answer: outcome.answer,
    }))
}

/// Request body for `POST /recall`.
#[derive(Deserialize)]
struct RecallRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

/// Response body for `POST /recall`.
#[derive(Serialize)]
struct RecallResponse {
    query: String,
    chunks: Vec<String>,
}

async fn recall_chunks<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<RecallRequest>,
) -> Result<Json<RecallResponse>, AppError>
where
    S: DocumentApi,
{
    let chunks = service.recall(request.query.clone(), request.top_k).await?;
    Ok(Json(RecallResponse {
        query: request.query,
        chunks,
    }))
}

/// Response body for `POST /reset`.
#[derive(Serialize)]
struct ResetResponse {
    status: &'static str,
    epoch_id: String,
}

async fn reset_index<S>(State(service): State<Arc<S>>) -> Json<ResetResponse>
where
    S: DocumentApi,
{
    let status = service.reset();
    Json(ResetResponse {
        status: "vector memory cleared",
        epoch_id: status.epoch_id,
    })
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/upload",
                description: "Multipart upload of a .pdf or .txt in the `file` field. Replaces the loaded document and returns { \"filename\", \"characters\", \"total_chunks\" }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "answer",
                method: "POST",
                path: "/answer",
                description: "Answer a question strictly from the loaded document.",
                request_example: Some(json!({
                    "question": "What are the units in the syllabus?",
                    "mode": "short_notes",
                    "language": "hinglish"
                })),
            },
            CommandDescriptor {
                name: "recall",
                method: "POST",
                path: "/recall",
                description: "Return the raw nearest chunks for a query without generating an answer.",
                request_example: Some(json!({ "query": "candidate declaration", "top_k": 5 })),
            },
            CommandDescriptor {
                name: "reset",
                method: "POST",
                path: "/reset",
                description: "Drop the loaded document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return upload and question counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Upload(UploadError),
    Ask(AskError),
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Upload(UploadError::Extraction(ExtractionError::UnsupportedFileType {
                ..
            })) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Upload(UploadError::Extraction(
                ExtractionError::NoExtractableText | ExtractionError::Pdf(_),
            )) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upload(UploadError::Embedding(_)) => StatusCode::BAD_GATEWAY,
            Self::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ask(AskError::Retrieval(RetrievalError::EmptyQuestion)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Ask(AskError::Retrieval(
                RetrievalError::Embedding(_) | RetrievalError::EmptyEmbedding,
            ))
            | Self::Ask(AskError::Generation(_)) => StatusCode::BAD_GATEWAY,
            Self::Ask(AskError::Retrieval(RetrievalError::DimensionMismatch { .. })) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Upload(error) => error.to_string(),
            Self::Ask(error) => error.to_string(),
            Self::BadRequest(message) => message.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "Request failed");
        } else {
            tracing::warn!(%status, error = %message, "Request rejected");
        }
        (status, Json(json!({ "detail": message }))).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(inner: UploadError) -> Self {
        Self::Upload(inner)
    }
}

impl From<AskError> for AppError {
    fn from(inner: AskError) -> Self {
        Self::Ask(inner)
    }
}

impl From<RetrievalError> for AppError {
    fn from(inner: RetrievalError) -> Self {
        Self::Ask(AskError::Retrieval(inner))
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::BadRequest(inner.body_text())
    }
}
