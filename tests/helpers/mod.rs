#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use engram::db;
use engram::embedding::EmbeddingProvider;
use engram::error::{MemoryError, Result};
use engram::memory::store::{create_memory, CreateMemory};
use rusqlite::Connection;

/// Embedding width used across the integration tests.
pub const DIMS: usize = 8;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::load_sqlite_vec();
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn, DIMS).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Same database wrapped for the async entry points.
pub fn shared_db() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(test_db()))
}

/// Generate a deterministic embedding with a spike at position `seed`.
/// Each seed produces a distinct, orthogonal vector.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[seed % DIMS] = 1.0;
    v
}

/// Normalized vector with high cosine similarity to `test_embedding(seed)`.
pub fn near_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[seed % DIMS] = 0.95;
    v[(seed + 1) % DIMS] = 0.05;
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter_mut().for_each(|x| *x /= norm);
    v
}

/// Insert a test memory directly via the store module. Returns the memory ID.
pub fn insert_memory(
    conn: &mut Connection,
    user_id: &str,
    content: &str,
    importance: u8,
    embedding: Option<&[f32]>,
) -> String {
    create_memory(
        conn,
        CreateMemory {
            user_id,
            conversation_id: None,
            content,
            summary: content,
            importance,
            embedding,
            metadata: None,
        },
    )
    .unwrap()
    .id
}

/// Deterministic embedding provider that groups semantically related text.
///
/// Texts sharing a topic bucket land on the same spike dimension, so related
/// queries retrieve related memories the way a real provider would place
/// them close in vector space.
pub struct TopicStubProvider;

const TOPICS: &[(&[&str], usize)] = &[
    (&["hik", "outdoor", "mountain", "trail"], 0),
    (&["cook", "food", "recipe", "restaurant"], 1),
    (&["code", "rust", "program", "software"], 2),
];

#[async_trait]
impl EmbeddingProvider for TopicStubProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        for (keywords, dim) in TOPICS {
            if keywords.iter().any(|k| lower.contains(k)) {
                return Ok(test_embedding(*dim));
            }
        }
        Ok(test_embedding(7))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Provider that always fails, for exercising degraded paths.
pub struct OfflineProvider;

#[async_trait]
impl EmbeddingProvider for OfflineProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(MemoryError::Embedding("provider offline".into()))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}
