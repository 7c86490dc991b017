//! HTTP surface consumed by the chat application's route handlers.
//!
//! Exposes explicit memory CRUD (create, list, search, delete) and the two
//! per-turn hooks (prepare instructions, record an exchange). Explicit
//! operations surface typed errors as JSON `{error, code}` bodies; the turn
//! hooks never fail the caller for memory-system reasons.

pub mod memories;
pub mod turns;

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::EngramConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::MemoryError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub embedding: Arc<dyn EmbeddingProvider>,
    pub config: Arc<EngramConfig>,
}

impl AppState {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: Arc<EngramConfig>,
    ) -> Self {
        Self {
            db,
            embedding,
            config,
        }
    }

    /// Resolve the effective user, falling back to the configured identity.
    pub(crate) fn resolve_user(&self, user_id: Option<String>) -> String {
        user_id
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.config.storage.default_user.clone())
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/memories", post(memories::create).get(memories::list))
        .route("/memories/search", post(memories::search))
        .route("/memories/{id}", delete(memories::remove))
        .route("/turns/prepare", post(turns::prepare))
        .route("/turns", post(turns::record))
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// API error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// A typed failure with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl From<MemoryError> for ApiError {
    fn from(e: MemoryError) -> Self {
        let status = match &e {
            MemoryError::Validation(_) => StatusCode::BAD_REQUEST,
            MemoryError::NotFound(_) => StatusCode::NOT_FOUND,
            MemoryError::Embedding(_) => StatusCode::BAD_GATEWAY,
            MemoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorBody {
                error: e.to_string(),
                code: e.code(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
