//! Per-turn hooks: prepare augmented instructions before a generation call,
//! record the exchange afterwards.
//!
//! Both endpoints are on the chat hot path. `prepare` degrades to the base
//! prompt on any internal failure; `record` returns 202 immediately and
//! persists in the background — neither ever surfaces a memory-system error
//! to the chat turn.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::error::MemoryError;
use crate::memory::turn;

/// Prepare request: the latest user message and the prompt to augment.
#[derive(Debug, Deserialize)]
pub struct PrepareRequest {
    pub user_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub base_prompt: String,
}

/// Prepared instructions for the generation collaborator.
#[derive(Debug, Serialize)]
pub struct PrepareResponse {
    pub instructions: String,
    pub memories_used: usize,
}

pub async fn prepare(
    State(state): State<AppState>,
    Json(request): Json<PrepareRequest>,
) -> Json<PrepareResponse> {
    let user_id = state.resolve_user(request.user_id);

    let prepared = turn::prepare_turn(
        state.db.clone(),
        state.embedding.clone(),
        &state.config,
        &user_id,
        &request.message,
        &request.base_prompt,
    )
    .await;

    Json(PrepareResponse {
        instructions: prepared.instructions,
        memories_used: prepared.memories_used,
    })
}

/// Record request: one completed exchange.
#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub user_message: String,
    pub assistant_response: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub status: &'static str,
}

pub async fn record(
    State(state): State<AppState>,
    Json(request): Json<RecordRequest>,
) -> Result<(StatusCode, Json<RecordResponse>), ApiError> {
    if request.user_message.trim().is_empty() {
        return Err(MemoryError::Validation("user_message must not be empty".into()).into());
    }

    let user_id = state.resolve_user(request.user_id);

    // Fire-and-forget: the write finishes (or fails, logged) on its own
    turn::spawn_remember(
        state.db.clone(),
        state.embedding.clone(),
        user_id,
        request.conversation_id,
        request.user_message,
        request.assistant_response,
    );

    Ok((StatusCode::ACCEPTED, Json(RecordResponse { status: "accepted" })))
}
