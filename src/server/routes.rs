//! Axum route handlers for the chat service.
//!
//! # Routes
//!
//! - `GET  /health`          — Returns `{"status": "ok", "version": ...}`
//! - `POST /chat`            — Accepts a `ChatRequest`, returns the reply
//! - `GET  /usage/{user_id}` — Quota standing (`?plan=` selects the tier)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::chat::{ChatOutcome, ChatReply, ChatRequest, ChatService};
use crate::error::ChatError;
use crate::ledger::UsageReport;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The chat flow and everything it owns.
    pub chat: ChatService,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self { chat }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/usage/{user_id}", get(usage_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "sanad",
    }))
}

/// POST /chat — handle one message.
///
/// Quota exhaustion is a 429 with the rejection details in the body, so
/// clients can show "come back at ..." without parsing prose. Completion
/// failures are 502; the upstream model is the one that broke.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, (StatusCode, Json<Value>)> {
    match state.chat.handle(request).await {
        Ok(ChatOutcome::Reply(reply)) => Ok(Json(reply)),
        Ok(ChatOutcome::LimitReached(rejection)) => Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "quota exhausted",
                "rejection": rejection,
            })),
        )),
        Err(e) => Err(error_response(e)),
    }
}

/// Query half of the usage endpoint: which plan to price the counts
/// against.
#[derive(Debug, Deserialize)]
struct UsageQuery {
    #[serde(default)]
    plan: Option<String>,
}

/// GET /usage/{user_id} — current quota standing.
async fn usage_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageReport>, (StatusCode, Json<Value>)> {
    let plan = query.plan.unwrap_or_default();
    state
        .chat
        .usage_report(&user_id, &plan)
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(error: ChatError) -> (StatusCode, Json<Value>) {
    let status = match &error {
        ChatError::Completion { .. } => StatusCode::BAD_GATEWAY,
        ChatError::UnknownPersona { .. } => StatusCode::BAD_REQUEST,
        ChatError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": error.to_string() })))
}

// ============================================================================
// Tests
// ============================================================================
