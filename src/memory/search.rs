//! Similarity retrieval over a user's memories.
//!
//! The primary path embeds the query and runs a KNN scan against the vec0
//! table, overfetching candidates and post-filtering to the owning user
//! before ranking. When the query embedding cannot be produced the retriever
//! falls back to FTS5 keyword matching — still user-scoped — and flags the
//! response as degraded instead of failing the caller or silently returning
//! nothing.
//!
//! Ranking is vector similarity first, then importance (descending), then
//! recency (descending). The same primitive backs the explicit search
//! endpoint and per-turn prompt augmentation.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, Result};
use crate::memory::types::Memory;

/// A memory with its retrieval score. Vector scores are cosine similarity in
/// `[-1, 1]`; degraded keyword scores are negated BM25 ranks and only
/// meaningful relative to each other.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub score: f64,
}

/// Ranked retrieval response.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ScoredMemory>,
    /// True when the vector path was unavailable and keyword fallback ran.
    pub degraded: bool,
}

/// Reject empty queries and non-positive limits before any I/O happens.
pub fn validate_query(query: &str, limit: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(MemoryError::Validation("query must not be empty".into()));
    }
    if limit == 0 {
        return Err(MemoryError::Validation("limit must be positive".into()));
    }
    Ok(())
}

/// Full retrieval: validate → embed → vector search, degrading to keyword
/// search when the embedding call fails.
///
/// Database work runs on the blocking pool; the connection mutex is only
/// held inside it.
pub async fn search(
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    query: &str,
    user_id: &str,
    limit: usize,
    candidate_factor: usize,
) -> Result<SearchResponse> {
    validate_query(query, limit)?;

    let query_owned = query.to_string();
    let user_owned = user_id.to_string();

    match embedding.embed(query).await {
        Ok(query_embedding) => {
            let results = tokio::task::spawn_blocking(move || {
                let conn = db
                    .lock()
                    .map_err(|e| MemoryError::Storage(format!("db lock poisoned: {e}")))?;
                search_by_embedding(&conn, &user_owned, &query_embedding, limit, candidate_factor)
            })
            .await
            .map_err(|e| MemoryError::Storage(format!("db task failed: {e}")))??;
            Ok(SearchResponse {
                results,
                degraded: false,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "query embedding failed, degrading to keyword search");
            let results = tokio::task::spawn_blocking(move || {
                let conn = db
                    .lock()
                    .map_err(|e| MemoryError::Storage(format!("db lock poisoned: {e}")))?;
                search_by_keywords(&conn, &user_owned, &query_owned, limit)
            })
            .await
            .map_err(|e| MemoryError::Storage(format!("db task failed: {e}")))??;
            Ok(SearchResponse {
                results,
                degraded: true,
            })
        }
    }
}

/// Vector KNN search scoped to one user.
///
/// Overfetches `limit * candidate_factor` nearest neighbors across all users,
/// keeps only the owner's rows, and ranks. The overfetch keeps a busy
/// neighboring user from starving the result set in most cases; isolation
/// itself never depends on it.
pub fn search_by_embedding(
    conn: &Connection,
    user_id: &str,
    query_embedding: &[f32],
    limit: usize,
    candidate_factor: usize,
) -> Result<Vec<ScoredMemory>> {
    let candidate_limit = limit.saturating_mul(candidate_factor.max(1)).max(limit);

    let embedding_bytes = super::embedding_to_bytes(query_embedding);
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM memories_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let candidates: Vec<(String, f64)> = stmt
        .query_map(params![embedding_bytes, candidate_limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut results = Vec::new();
    for (id, distance) in candidates {
        if let Some(memory) = fetch_owned(conn, &id, user_id)? {
            // Both sides are L2-normalized, so cosine = 1 - d²/2
            let score = 1.0 - (distance * distance) / 2.0;
            results.push(ScoredMemory { memory, score });
        }
    }

    rank(&mut results);
    results.truncate(limit);
    Ok(results)
}

/// FTS5 BM25 keyword search scoped to one user — the degraded path.
pub fn search_by_keywords(
    conn: &Connection,
    user_id: &str,
    query_text: &str,
    limit: usize,
) -> Result<Vec<ScoredMemory>> {
    let escaped = escape_fts_query(query_text);
    if escaped.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT id, rank FROM memories_fts \
         WHERE memories_fts MATCH ?1 AND user_id = ?2 ORDER BY rank LIMIT ?3",
    )?;
    let candidates: Vec<(String, f64)> = stmt
        .query_map(params![escaped, user_id, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut results = Vec::new();
    for (id, bm25_rank) in candidates {
        if let Some(memory) = fetch_owned(conn, &id, user_id)? {
            // FTS5 rank is negative (more negative = better); negate it
            results.push(ScoredMemory {
                memory,
                score: -bm25_rank,
            });
        }
    }

    rank(&mut results);
    Ok(results)
}

/// Sort by score, breaking ties by importance then recency.
fn rank(results: &mut [ScoredMemory]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.memory.importance.cmp(&a.memory.importance))
            .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
    });
}

/// Fetch a memory row only if it belongs to `user_id`.
fn fetch_owned(conn: &Connection, id: &str, user_id: &str) -> Result<Option<Memory>> {
    use rusqlite::OptionalExtension;
    let memory = conn
        .query_row(
            "SELECT id, user_id, conversation_id, content, summary, importance, metadata, created_at \
             FROM memories WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            super::store::memory_from_row,
        )
        .optional()?;
    Ok(memory)
}

/// Escape a user query for FTS5 MATCH syntax.
///
/// Wraps each whitespace-delimited word in double quotes and joins with
/// spaces so FTS5 treats them as individual terms (implicit AND). Strips
/// empty tokens.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            let clean = word.replace('"', "");
            format!("\"{clean}\"")
        })
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}
