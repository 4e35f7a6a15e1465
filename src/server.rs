//! HTTP API.
//!
//! Each session id names an independent pipeline and transcript; sessions
//! are created on first use.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/sessions/{id}/documents` | Upload PDFs (multipart) and load them |
//! | `POST` | `/sessions/{id}/ask` | Ask a question: `{ "query": "..." }` |
//! | `POST` | `/sessions/{id}/reset` | Drop the corpus: `{ "clear_transcript": true }` |
//! | `GET`  | `/sessions/{id}/transcript` | Conversation so far |
//! | `GET`  | `/sessions/{id}/status` | Pipeline state and corpus counts |
//! | `DELETE` | `/sessions/{id}` | Drop the session and its uploaded files |
//!
//! Sessions live in memory until deleted; nothing expires them.
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "parse_error", "message": "failed to parse 'a.pdf': ..." } }
//! ```
//!
//! Load failures map to `404` (missing file), `400` (unreadable PDF, no
//! files) or `502` (embedding service). Asking never fails at the HTTP
//! level: errors are returned as the answer text with status `200`, the
//! same way the chat UI shows them.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use pdfqa_core::transcript::Turn;
use pdfqa_core::PipelineError;

use crate::config::Config;
use crate::pipeline::{LoadReport, PipelineState, PipelineStatus, Source};
use crate::session::{PipelineFactory, SessionRegistry};

const MAX_SESSION_ID_LEN: usize = 64;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionRegistry>,
    upload_dir: PathBuf,
}

impl AppState {
    pub fn new(factory: PipelineFactory, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(factory)),
            upload_dir: upload_dir.into(),
        }
    }
}

/// Build the router. `max_upload_bytes` bounds a whole multipart request.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sessions/{id}/documents", post(handle_upload))
        .route("/sessions/{id}/ask", post(handle_ask))
        .route("/sessions/{id}/reset", post(handle_reset))
        .route("/sessions/{id}/transcript", get(handle_transcript))
        .route("/sessions/{id}/status", get(handle_status))
        .route("/sessions/{id}", delete(handle_delete))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// Start the server on `[server].bind` and run until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let factory = PipelineFactory::from_config(config)?;
    let state = AppState::new(factory, config.server.upload_dir.clone());
    // Room for several maximum-size files plus multipart framing.
    let limit = usize::try_from(config.ingest.max_file_bytes)
        .unwrap_or(usize::MAX)
        .saturating_mul(8);
    let app = router(state, limit);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "server listening");
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Parse { .. }
            | PipelineError::NoDocuments
            | PipelineError::EmptyQuery => StatusCode::BAD_REQUEST,
            PipelineError::NotReady => StatusCode::CONFLICT,
            PipelineError::EmbeddingService(_) | PipelineError::GenerationService(_) => {
                StatusCode::BAD_GATEWAY
            }
            PipelineError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn check_session_id(id: &str) -> Result<(), AppError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(bad_request(format!(
            "session id must be 1-{} characters of [A-Za-z0-9_-]",
            MAX_SESSION_ID_LEN
        )))
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

// ============ POST /sessions/{id}/documents ============

/// Persist every uploaded file as `uploaded_<n>.pdf` under the session's
/// upload directory, then load them as the session's corpus.
///
/// Form fields without a filename are ignored. The session's staging lock
/// is held from clearing the directory until the load finishes, so
/// concurrent uploads to one session run one after the other.
async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<LoadReport>, AppError> {
    check_session_id(&id)?;

    let session = state.sessions.get_or_create(&id).await;
    let _staging = session.lock_staging().await;

    let dir = state.upload_dir.join(&id);
    remove_upload_dir(&dir).await?;
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| internal(format!("failed to create upload dir: {}", e)))?;

    let mut paths = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
        let path = dir.join(format!("uploaded_{}.pdf", paths.len()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| internal(format!("failed to save upload: {}", e)))?;
        paths.push(path);
    }

    info!(session = %id, files = paths.len(), "received upload");
    let report = session.load(&paths).await.map_err(|e| {
        warn!(session = %id, error = %e, "load failed");
        AppError::from(e)
    })?;

    Ok(Json(report))
}

async fn remove_upload_dir(dir: &std::path::Path) -> Result<(), AppError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(internal(format!("failed to clear upload dir: {}", e))),
    }
}

// ============ POST /sessions/{id}/ask ============

#[derive(Deserialize)]
struct AskRequest {
    query: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    sources: Vec<Source>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    check_session_id(&id)?;
    let session = state.sessions.get_or_create(&id).await;
    let answer = session.chat_with_sources(&req.query).await;
    Ok(Json(AskResponse {
        answer: answer.text,
        sources: answer.sources,
    }))
}

// ============ POST /sessions/{id}/reset ============

#[derive(Deserialize)]
struct ResetRequest {
    #[serde(default = "default_clear_transcript")]
    clear_transcript: bool,
}

fn default_clear_transcript() -> bool {
    true
}

#[derive(Serialize)]
struct ResetResponse {
    state: PipelineState,
    transcript_cleared: bool,
}

/// The body is optional; an empty body clears the transcript too.
async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ResetResponse>, AppError> {
    check_session_id(&id)?;
    let req = if body.iter().all(|b| b.is_ascii_whitespace()) {
        ResetRequest {
            clear_transcript: default_clear_transcript(),
        }
    } else {
        serde_json::from_slice::<ResetRequest>(&body)
            .map_err(|e| bad_request(format!("invalid reset body: {}", e)))?
    };

    let session = state.sessions.get_or_create(&id).await;
    session.reset(req.clear_transcript).await;

    Ok(Json(ResetResponse {
        state: PipelineState::Empty,
        transcript_cleared: req.clear_transcript,
    }))
}

// ============ GET /sessions/{id}/transcript ============

#[derive(Serialize)]
struct TranscriptResponse {
    turns: Vec<Turn>,
}

async fn handle_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    check_session_id(&id)?;
    let turns = match state.sessions.get(&id).await {
        Some(session) => session.transcript().await,
        None => Vec::new(),
    };
    Ok(Json(TranscriptResponse { turns }))
}

// ============ GET /sessions/{id}/status ============

async fn handle_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PipelineStatus>, AppError> {
    check_session_id(&id)?;
    let status = match state.sessions.get(&id).await {
        Some(session) => session.status().await,
        None => PipelineStatus {
            state: PipelineState::Empty,
            documents: 0,
            chunks: 0,
            sources: Vec::new(),
        },
    };
    Ok(Json(status))
}

// ============ DELETE /sessions/{id} ============

#[derive(Serialize)]
struct DeleteResponse {
    deleted: String,
}

/// Waits for any upload in progress on the session before removing its
/// files.
async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    check_session_id(&id)?;
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| not_found(format!("no session '{}'", id)))?;

    let _staging = session.lock_staging().await;
    remove_upload_dir(&state.upload_dir.join(&id)).await?;
    state.sessions.remove(&id).await;

    Ok(Json(DeleteResponse { deleted: id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_rules() {
        assert!(check_session_id("abc-123_X").is_ok());
        assert!(check_session_id("").is_err());
        assert!(check_session_id("../etc").is_err());
        assert!(check_session_id(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_pipeline_error_status_mapping() {
        let cases = [
            (PipelineError::NotFound("x.pdf".into()), StatusCode::NOT_FOUND),
            (PipelineError::parse("x.pdf", "bad"), StatusCode::BAD_REQUEST),
            (PipelineError::NoDocuments, StatusCode::BAD_REQUEST),
            (PipelineError::embedding("down"), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }
}
