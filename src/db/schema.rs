//! SQL DDL for all engram tables.
//!
//! Defines the `memories`, `memories_fts` (FTS5), `memories_vec` (vec0),
//! `memory_log`, and `schema_meta` tables. All DDL uses `IF NOT EXISTS`
//! for idempotent initialization. The vec0 table is sized from the configured
//! embedding dimension at init time.

use rusqlite::Connection;

/// Schema DDL for the relational tables.
const SCHEMA_SQL: &str = r#"
-- User-scoped conversational memories
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    conversation_id TEXT,
    content TEXT NOT NULL,
    summary TEXT NOT NULL,
    importance INTEGER NOT NULL DEFAULT 5 CHECK(importance >= 1 AND importance <= 10),
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);
CREATE INDEX IF NOT EXISTS idx_memories_conversation ON memories(conversation_id);
CREATE INDEX IF NOT EXISTS idx_memories_user_created ON memories(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance);

-- Keyword index, used as the degraded retrieval path when the query
-- cannot be embedded
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    content,
    summary,
    id UNINDEXED,
    user_id UNINDEXED,
    content='memories',
    content_rowid='rowid'
);

-- Audit log
CREATE TABLE IF NOT EXISTS memory_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL CHECK(operation IN ('create','delete')),
    memory_id TEXT NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
///
/// `dimensions` fixes the width of the vec0 embedding column; it must match
/// the configured embedding provider for the lifetime of the database.
pub fn init_schema(conn: &Connection, dimensions: usize) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // vec0 virtual table must be created separately (sqlite-vec syntax)
    let vec_sql = format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS memories_vec USING vec0(\n\
         id TEXT PRIMARY KEY,\n\
         embedding FLOAT[{dimensions}]\n)"
    );
    conn.execute_batch(&vec_sql)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
