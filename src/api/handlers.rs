//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AcceptedResponse, ChatRequest, ErrorResponse, LanguageResponse, ResetResponse,
    SessionResponse, SuggestionsResponse,
};
use super::AppState;
use crate::persona::SUGGESTED_PROMPTS;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/stream", get(stream_session))
        // User actions
        .route("/api/messages", post(send_message))
        .route("/api/image", post(generate_image))
        .route("/api/language/toggle", post(toggle_language))
        .route("/api/reset", post(reset_session))
        .route("/api/suggestions", get(list_suggestions))
        // Version
        .route("/version", get(get_version))
        .fallback(not_found)
        .with_state(state)
}

// ============================================================
// Session
// ============================================================

async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: state.store.session_id().to_string(),
        snapshot: state.store.snapshot(),
    })
}

async fn stream_session(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before reading the snapshot so nothing is missed. A transition
    // in between shows up in both; clients dedupe messages by id.
    let broadcast_rx = state.store.events();
    let snapshot = state.store.snapshot();
    sse_stream(snapshot, broadcast_rx)
}

// ============================================================
// User Actions
// ============================================================

async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<AcceptedResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let accepted = state.store.submit_user_message(req.text);
    Ok(Json(AcceptedResponse { accepted }))
}

async fn generate_image(State(state): State<AppState>) -> Json<AcceptedResponse> {
    Json(AcceptedResponse {
        accepted: state.store.trigger_image_generation(),
    })
}

async fn toggle_language(State(state): State<AppState>) -> Json<LanguageResponse> {
    Json(LanguageResponse {
        force_arabic: state.store.toggle_forced_language(),
    })
}

async fn reset_session(State(state): State<AppState>) -> Json<ResetResponse> {
    state.store.reset();
    Json(ResetResponse { ok: true })
}

async fn list_suggestions() -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        suggestions: SUGGESTED_PROMPTS.to_vec(),
    })
}

// ============================================================
// Misc
// ============================================================

async fn get_version() -> &'static str {
    concat!("wormgpt ", env!("CARGO_PKG_VERSION"))
}

async fn not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
