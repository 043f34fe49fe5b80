//! Board HTTP server.
//!
//! Exposes the board service as a JSON API for the canvas front-end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/api/ideas` | All ideas with their `cluster` label |
//! | `POST`   | `/api/ideas` | Create an idea |
//! | `GET`    | `/api/ideas/{id}` | One idea |
//! | `PATCH`  | `/api/ideas/{id}` | Update any of `x, y, width, height, text` |
//! | `DELETE` | `/api/ideas/{id}` | Delete an idea |
//! | `PATCH`  | `/api/ideas/{id}/text` | Update only the text |
//! | `GET`    | `/api/connections` | All connections |
//! | `POST`   | `/api/connections` | Create a connection |
//! | `DELETE` | `/api/connections/{id}` | Delete a connection |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Idea text is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `timeout` (408),
//! `invalid_parameters` (500), `embedding_error` (502),
//! `model_unavailable` (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the front-end can be
//! served from a different origin.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use idea_board_core::error::BoardError;
use idea_board_core::models::{
    ClusteredIdea, Connection, CreateConnectionRequest, CreateIdeaRequest, Idea, IdeaUpdate,
};
use idea_board_core::service::BoardService;

use crate::board;
use crate::config::Config;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    service: Arc<BoardService>,
    /// Upper bound on the embed + cluster path of `GET /api/ideas`.
    list_timeout: Duration,
}

/// Starts the board server.
///
/// Runs migrations, loads the embedding model (failing fast with
/// `ModelUnavailable` if it cannot be loaded), then binds to
/// `[server].bind` and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = board::open_service(config).await?;
    run_server_with_service(config, service).await
}

/// Starts the server around an already built [`BoardService`].
///
/// Useful for tests and for hosts that bring their own store or embedding
/// provider.
pub async fn run_server_with_service(
    config: &Config,
    service: Arc<BoardService>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(
        service,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "board server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with all board routes.
pub fn router(service: Arc<BoardService>, list_timeout: Duration) -> Router {
    let state = AppState {
        service,
        list_timeout,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/ideas", get(handle_list_ideas).post(handle_create_idea))
        .route(
            "/api/ideas/{id}",
            get(handle_get_idea)
                .patch(handle_update_idea)
                .delete(handle_delete_idea),
        )
        .route("/api/ideas/{id}/text", patch(handle_update_text))
        .route(
            "/api/connections",
            get(handle_list_connections).post(handle_create_connection),
        )
        .route(
            "/api/connections/{id}",
            axum::routing::delete(handle_delete_connection),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<BoardError> for AppError {
    fn from(err: BoardError) -> Self {
        let message = err.to_string();
        match err {
            BoardError::Validation(_) => {
                AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
            }
            BoardError::NotFound(_) => AppError::new(StatusCode::NOT_FOUND, "not_found", message),
            BoardError::InvalidParameters(_) => AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "invalid_parameters",
                message,
            ),
            BoardError::ModelUnavailable(_) => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "model_unavailable",
                message,
            ),
            BoardError::Embedding(_) => {
                AppError::new(StatusCode::BAD_GATEWAY, "embedding_error", message)
            }
            BoardError::Storage(_) => {
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, "bad_request", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, "bad_request", rejection.body_text())
    }
}

/// Record id from the path; a non-integer id is a `bad_request`.
type IdPath = Result<Path<i64>, PathRejection>;

/// `{ "message": ... }` with an optional new `id`.
#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

fn message(message: &'static str) -> Json<MessageResponse> {
    Json(MessageResponse { message, id: None })
}

fn created(message: &'static str, id: i64) -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::CREATED,
        Json(MessageResponse {
            message,
            id: Some(id),
        }),
    )
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ Ideas ============

/// Handler for `GET /api/ideas`.
///
/// Re-embeds and re-clusters the whole board. Answers `408` if that takes
/// longer than `server.request_timeout_secs`.
async fn handle_list_ideas(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClusteredIdea>>, AppError> {
    let ideas = tokio::time::timeout(state.list_timeout, state.service.list_ideas_with_clusters())
        .await
        .map_err(|_| {
            AppError::new(
                StatusCode::REQUEST_TIMEOUT,
                "timeout",
                format!(
                    "clustering timed out after {}s",
                    state.list_timeout.as_secs()
                ),
            )
        })??;
    Ok(Json(ideas))
}

async fn handle_create_idea(
    State(state): State<AppState>,
    payload: Result<Json<CreateIdeaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(request) = payload?;
    let id = state.service.create_idea(request).await?;
    Ok(created("Idea added", id))
}

async fn handle_get_idea(
    State(state): State<AppState>,
    id: IdPath,
) -> Result<Json<Idea>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.service.get_idea(id).await?))
}

async fn handle_update_idea(
    State(state): State<AppState>,
    id: IdPath,
    payload: Result<Json<IdeaUpdate>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    state.service.update_idea(id, update).await?;
    Ok(message("Idea updated"))
}

/// Body of `PATCH /api/ideas/{id}/text`.
#[derive(serde::Deserialize)]
struct TextUpdate {
    #[serde(default)]
    text: Option<String>,
}

async fn handle_update_text(
    State(state): State<AppState>,
    id: IdPath,
    payload: Result<Json<TextUpdate>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let text = body
        .text
        .ok_or_else(|| BoardError::validation("Text is required"))?;
    state.service.update_idea(id, IdeaUpdate::text(text)).await?;
    Ok(message("Text updated"))
}

async fn handle_delete_idea(
    State(state): State<AppState>,
    id: IdPath,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    state.service.delete_idea(id).await?;
    Ok(message("Idea deleted"))
}

// ============ Connections ============

async fn handle_list_connections(
    State(state): State<AppState>,
) -> Result<Json<Vec<Connection>>, AppError> {
    Ok(Json(state.service.list_connections().await?))
}

async fn handle_create_connection(
    State(state): State<AppState>,
    payload: Result<Json<CreateConnectionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(request) = payload?;
    let id = state.service.create_connection(request).await?;
    Ok(created("Connection added", id))
}

async fn handle_delete_connection(
    State(state): State<AppState>,
    id: IdPath,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;
    state.service.delete_connection(id).await?;
    Ok(message("Connection deleted"))
}
