//! Explicit memory management endpoints: create, list, search, delete.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, AppState};
use crate::error::MemoryError;
use crate::memory::extract::extract_facts;
use crate::memory::score::calculate_importance;
use crate::memory::search::{self, SearchResponse};
use crate::memory::store::{self, CreateMemory};
use crate::memory::summarize::generate_summary;
use crate::memory::types::Memory;

fn default_true() -> bool {
    true
}

/// Create-memory request body.
#[derive(Debug, Deserialize)]
pub struct CreateMemoryRequest {
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub content: String,
    /// Derived from the content when absent.
    pub summary: Option<String>,
    /// Derived from the content when absent.
    pub importance: Option<u8>,
    pub metadata: Option<serde_json::Value>,
    /// Caller-supplied context note, folded into `metadata.context`.
    pub context: Option<String>,
    #[serde(default = "default_true")]
    pub generate_embedding: bool,
}

/// Create-memory response: the stored record plus whether a vector was
/// actually written (embedding failures are non-fatal here).
#[derive(Debug, Serialize)]
pub struct CreateMemoryResponse {
    #[serde(flatten)]
    pub memory: Memory,
    pub embedded: bool,
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateMemoryRequest>,
) -> Result<Json<CreateMemoryResponse>, ApiError> {
    if request.content.trim().is_empty() {
        return Err(MemoryError::Validation("content must not be empty".into()).into());
    }

    let user_id = state.resolve_user(request.user_id);

    // Derive what the caller left out, reusing the turn pipeline's pieces
    let facts = extract_facts(&request.content, None);
    let summary = request
        .summary
        .unwrap_or_else(|| generate_summary(&request.content, &facts));
    let importance = request
        .importance
        .unwrap_or_else(|| calculate_importance(&request.content, &facts));

    let metadata = merge_context(request.metadata, request.context);

    let vector = if request.generate_embedding {
        match state.embedding.embed(&request.content).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "embedding failed, creating memory without vector");
                None
            }
        }
    } else {
        None
    };
    let embedded = vector.is_some();

    let db = state.db.clone();
    let content = request.content;
    let conversation_id = request.conversation_id;
    let user_owned = user_id.clone();
    let memory = tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|e| MemoryError::Storage(format!("db lock poisoned: {e}")))?;
        store::create_memory(
            &mut conn,
            CreateMemory {
                user_id: &user_owned,
                conversation_id: conversation_id.as_deref(),
                content: &content,
                summary: &summary,
                importance,
                embedding: vector.as_deref(),
                metadata: metadata.as_ref(),
            },
        )
    })
    .await
    .map_err(|e| MemoryError::Storage(format!("db task failed: {e}")))??;

    info!(user = %user_id, id = %memory.id, embedded, "memory created");

    Ok(Json(CreateMemoryResponse { memory, embedded }))
}

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

/// List response, newest first.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub memories: Vec<Memory>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let user_id = state.resolve_user(params.user_id);
    let limit = params.limit.unwrap_or(state.config.retrieval.default_limit);

    let db = state.db.clone();
    let memories = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| MemoryError::Storage(format!("db lock poisoned: {e}")))?;
        store::list_by_user(&conn, &user_id, limit)
    })
    .await
    .map_err(|e| MemoryError::Storage(format!("db task failed: {e}")))??;

    Ok(Json(ListResponse { memories }))
}

/// Search request body.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = request
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| MemoryError::Validation("query is required".into()))?;

    let user_id = state.resolve_user(request.user_id);
    let limit = request.limit.unwrap_or(state.config.retrieval.default_limit);

    let response = search::search(
        state.db.clone(),
        state.embedding.clone(),
        &query,
        &user_id,
        limit,
        state.config.retrieval.candidate_factor,
    )
    .await?;

    Ok(Json(response))
}

/// Delete query parameters.
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub user_id: Option<String>,
}

/// Delete response: the removed record.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: Memory,
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let user_id = state.resolve_user(params.user_id);

    let db = state.db.clone();
    let user_owned = user_id.clone();
    let deleted = tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|e| MemoryError::Storage(format!("db lock poisoned: {e}")))?;
        store::delete_by_id_for_user(&mut conn, &user_owned, &id)
    })
    .await
    .map_err(|e| MemoryError::Storage(format!("db task failed: {e}")))??;

    info!(user = %user_id, id = %deleted.id, "memory deleted");

    Ok(Json(DeleteResponse { deleted }))
}

/// Fold a caller-supplied context note into the metadata bag.
fn merge_context(
    metadata: Option<serde_json::Value>,
    context: Option<String>,
) -> Option<serde_json::Value> {
    match (metadata, context) {
        (meta, None) => meta,
        (Some(serde_json::Value::Object(mut map)), Some(ctx)) => {
            map.insert("context".into(), serde_json::Value::String(ctx));
            Some(serde_json::Value::Object(map))
        }
        (_, Some(ctx)) => Some(serde_json::json!({ "context": ctx })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults() {
        let json = r#"{"content": "User likes tea"}"#;
        let request: CreateMemoryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.content, "User likes tea");
        assert!(request.user_id.is_none());
        assert!(request.generate_embedding);
    }

    #[test]
    fn create_request_embedding_opt_out() {
        let json = r#"{"content": "x", "generate_embedding": false}"#;
        let request: CreateMemoryRequest = serde_json::from_str(json).unwrap();
        assert!(!request.generate_embedding);
    }

    #[test]
    fn merge_context_into_existing_metadata() {
        let merged = merge_context(
            Some(serde_json::json!({"source": "chat"})),
            Some("onboarding".into()),
        )
        .unwrap();
        assert_eq!(merged["source"], "chat");
        assert_eq!(merged["context"], "onboarding");
    }

    #[test]
    fn merge_context_without_metadata() {
        let merged = merge_context(None, Some("onboarding".into())).unwrap();
        assert_eq!(merged["context"], "onboarding");
    }

    #[test]
    fn merge_nothing_stays_none() {
        assert!(merge_context(None, None).is_none());
    }
}
