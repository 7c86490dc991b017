//! Per-turn pipelines tying the core together.
//!
//! Read path: [`prepare_turn`] embeds the incoming user message, retrieves
//! the top matching memories, and appends them to the base prompt. Any
//! failure degrades to the unaugmented prompt — a user never sees a memory
//! error during chat.
//!
//! Write path: [`remember_exchange`] runs extract → score → summarize
//! synchronously, then embeds and persists. [`spawn_remember`] dispatches it
//! in the background after the user-visible response, with its own error
//! handling; memory creation is best-effort, not transactional with the
//! chat turn.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::EngramConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::memory::augment::build_instructions;
use crate::memory::extract::extract_facts;
use crate::memory::score::calculate_importance;
use crate::memory::search;
use crate::memory::store::{create_memory, CreateMemory};
use crate::memory::summarize::generate_summary;
use crate::memory::types::Memory;

/// Augmented instructions plus how many memories were injected.
pub struct PreparedTurn {
    pub instructions: String,
    pub memories_used: usize,
}

/// Build the instructions for a generation call, best-effort.
///
/// Retrieval runs against the latest user message; on any failure the base
/// prompt comes back unchanged with `memories_used == 0`.
pub async fn prepare_turn(
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    config: &EngramConfig,
    user_id: &str,
    user_message: &str,
    base_prompt: &str,
) -> PreparedTurn {
    let limit = config.retrieval.augment_limit;
    let candidate_factor = config.retrieval.candidate_factor;

    match search::search(db, embedding, user_message, user_id, limit, candidate_factor).await {
        Ok(response) => {
            if response.degraded {
                tracing::warn!(user = %user_id, "augmentation used degraded keyword retrieval");
            }
            let memories: Vec<Memory> =
                response.results.into_iter().map(|r| r.memory).collect();
            PreparedTurn {
                instructions: build_instructions(base_prompt, &memories),
                memories_used: memories.len(),
            }
        }
        Err(e) => {
            tracing::warn!(user = %user_id, error = %e, "augmentation failed, using base prompt");
            PreparedTurn {
                instructions: base_prompt.to_string(),
                memories_used: 0,
            }
        }
    }
}

/// Derive and persist a memory from one exchange.
///
/// Extraction, scoring, and summarization are pure and complete before the
/// embedding call; the embedding completes before the store write. A failed
/// embedding downgrades to an unembedded memory rather than aborting.
pub async fn remember_exchange(
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    user_id: &str,
    conversation_id: Option<&str>,
    user_message: &str,
    assistant_response: Option<&str>,
) -> Result<Memory> {
    let facts = extract_facts(user_message, assistant_response);
    let importance = calculate_importance(user_message, &facts);
    let summary = generate_summary(user_message, &facts);

    let content = match assistant_response {
        Some(reply) => format!("User: {user_message}\nAssistant: {reply}"),
        None => format!("User: {user_message}"),
    };

    let vector = match embedding.embed(&content).await {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(user = %user_id, error = %e, "embedding failed, storing memory without vector");
            None
        }
    };

    let user_owned = user_id.to_string();
    let conversation_owned = conversation_id.map(str::to_string);
    let memory = tokio::task::spawn_blocking(move || {
        let mut conn = db
            .lock()
            .map_err(|e| MemoryError::Storage(format!("db lock poisoned: {e}")))?;
        create_memory(
            &mut conn,
            CreateMemory {
                user_id: &user_owned,
                conversation_id: conversation_owned.as_deref(),
                content: &content,
                summary: &summary,
                importance,
                embedding: vector.as_deref(),
                metadata: None,
            },
        )
    })
    .await
    .map_err(|e| MemoryError::Storage(format!("db task failed: {e}")))??;

    tracing::debug!(
        user = %memory.user_id,
        id = %memory.id,
        importance = memory.importance,
        facts = facts.len(),
        "memory recorded"
    );

    Ok(memory)
}

/// Fire-and-forget wrapper around [`remember_exchange`].
///
/// The task outlives the request that spawned it; failures are logged and go
/// nowhere else.
pub fn spawn_remember(
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    user_id: String,
    conversation_id: Option<String>,
    user_message: String,
    assistant_response: Option<String>,
) {
    tokio::spawn(async move {
        let result = remember_exchange(
            db,
            embedding,
            &user_id,
            conversation_id.as_deref(),
            &user_message,
            assistant_response.as_deref(),
        )
        .await;
        if let Err(e) = result {
            tracing::warn!(user = %user_id, error = %e, "background memory write failed");
        }
    });
}
