//! Route handler functions for all API endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use helpline_core::UserState;
use helpline_dialogue::DialogueEngine;

use crate::error::ApiError;
use crate::state::AppState;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub user_id: String,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub users: u64,
    pub categories: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// Run `f` on the blocking pool while holding the engine lock.
///
/// A chat turn holds the lock across the full-store rewrite, so no handler
/// waits for it on an async worker.
async fn with_engine<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut DialogueEngine) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || {
        let mut engine = engine
            .lock()
            .map_err(|e| ApiError::Internal(format!("engine lock poisoned: {}", e)))?;
        f(&mut *engine)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("engine task failed: {}", e)))?
}

/// GET / - liveness banner.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Chatbot API is running!".to_string(),
    })
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let (users, categories) = with_engine(&state, |engine| {
        Ok((engine.user_count() as u64, engine.catalog().len() as u64))
    })
    .await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        users,
        categories,
    }))
}

/// POST /chat - run one dialogue turn.
///
/// Classification and the full-store rewrite are both synchronous, so the
/// turn runs through `with_engine`.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if body.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("'user_id' must not be empty".to_string()));
    }
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("'message' must not be empty".to_string()));
    }
    if body.message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "'message' exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }

    let ChatRequest { user_id, message } = body;
    let reply_user = user_id.clone();

    let response = with_engine(&state, move |engine| {
        engine.reply(&reply_user, &message).map_err(ApiError::from)
    })
    .await
    .inspect_err(|e| tracing::warn!(user_id = %user_id, error = ?e, "Chat turn failed"))?;

    Ok(Json(ChatResponse { user_id, response }))
}

/// GET /users/{user_id}/history - the stored dialogue state for one user.
pub async fn user_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserState>, ApiError> {
    with_engine(&state, move |engine| {
        engine
            .user_state(&user_id)
            .cloned()
            .map(Json)
            .ok_or_else(|| ApiError::NotFound(format!("no conversation for user '{}'", user_id)))
    })
    .await
}
