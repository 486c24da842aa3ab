//! JSON HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a question from the knowledge base or the current dataset |
//! | `POST` | `/upload` | Upload a CSV/XLSX file (multipart field `file`) and profile it |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Errors are `{ "error": "<message>" }` with status 400, except a blank
//! chat message, which is answered with status 400 and
//! `{ "reply": "Please enter a question to analyze." }`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use analyst_copilot_core::profile::summary_text;
use analyst_copilot_core::router::EMPTY_MESSAGE_TEXT;
use analyst_copilot_core::{AnswerSource, ProfileSummary, QueryRouter};

use crate::config::Config;
use crate::knowledge::build_router;
use crate::tabular::{parse_table_bounded, sanitize_filename, TableError};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    router: Arc<QueryRouter>,
}

impl AppState {
    pub fn new(config: Arc<Config>, router: Arc<QueryRouter>) -> Self {
        Self { config, router }
    }
}

/// Build the application router with all routes and layers.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state
        .config
        .upload
        .max_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/upload", post(handle_upload))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Loads the knowledge base, binds to `[server].bind` and serves until the
/// process is terminated. Fails if the knowledge base cannot be loaded or
/// the address cannot be bound.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let router = build_router(config)?;
    tracing::info!(
        entries = router.matcher().corpus().len(),
        vocabulary = router.matcher().model().vocabulary_size(),
        threshold = router.matcher().threshold(),
        "knowledge index ready"
    );

    let state = AppState::new(Arc::new(config.clone()), Arc::new(router));

    println!("Analyst Copilot listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

/// Constructs a 500 error.
fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
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

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    source: AnswerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
}

#[derive(Serialize)]
struct EmptyMessageResponse {
    reply: &'static str,
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "rejected chat request");
        bad_request(rejection.body_text())
    })?;

    if request.message.trim().is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(EmptyMessageResponse {
                reply: EMPTY_MESSAGE_TEXT,
            }),
        )
            .into_response());
    }

    let answer = state.router.answer(&request.message);
    tracing::info!(
        source = answer.source.as_str(),
        confidence = answer.confidence,
        "chat answered"
    );

    Ok(Json(ChatResponse {
        reply: answer.text,
        source: answer.source,
        confidence: answer.confidence,
    })
    .into_response())
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    filename: String,
    summary: ProfileSummary,
    summary_text: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|rejection| bad_request(rejection.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Unable to read the upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Unable to read the upload: {}", e)))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| bad_request("Select a CSV or Excel file to upload."))?;
    let filename = sanitize_filename(&filename).ok_or_else(|| bad_request("Invalid file name."))?;

    let router = state.router.clone();
    let name = filename.clone();
    let max_bytes = state.config.upload.max_bytes;
    let loaded = tokio::task::spawn_blocking(move || {
        let raw = parse_table_bounded(&bytes, &name, max_bytes)?;
        Ok::<_, TableError>(router.load_dataset(raw, Some(name)))
    })
    .await
    .map_err(|e| internal(format!("profiling failed: {}", e)))?
    .map_err(|e| {
        tracing::warn!(filename = %filename, error = %e, "upload rejected");
        bad_request(e.to_string())
    })?;

    tracing::info!(
        filename = %filename,
        rows = loaded.profile.row_count,
        columns = loaded.profile.column_count,
        "dataset loaded"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully.",
        filename,
        summary_text: summary_text(&loaded.profile),
        summary: loaded.profile.clone(),
    }))
}
