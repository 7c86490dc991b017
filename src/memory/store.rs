//! Write path — storage, index sync, and audit logging.
//!
//! [`create_memory`] runs the full pipeline inside a transaction: insert into
//! the memories table, sync the FTS5 index, insert the embedding vector when
//! one is present, and write an audit log entry. Memories are immutable once
//! created; [`delete_by_id_for_user`] is the only other mutation and is
//! strictly owner-scoped. Near-duplicate writes are not deduplicated — two
//! tabs saving the same fact is an accepted outcome.

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::{MemoryError, Result};
use crate::memory::types::Memory;

/// Parameters for creating a memory record.
pub struct CreateMemory<'a> {
    pub user_id: &'a str,
    pub conversation_id: Option<&'a str>,
    pub content: &'a str,
    pub summary: &'a str,
    /// Exchange-level salience, 1–10.
    pub importance: u8,
    /// Embedding of `content`; `None` when generation was skipped or failed.
    pub embedding: Option<&'a [f32]>,
    pub metadata: Option<&'a serde_json::Value>,
}

/// Full write path: validate → insert → FTS sync → vec insert → audit log.
///
/// All operations run inside a transaction for atomicity.
pub fn create_memory(conn: &mut Connection, params: CreateMemory<'_>) -> Result<Memory> {
    if params.content.trim().is_empty() {
        return Err(MemoryError::Validation("content must not be empty".into()));
    }
    if !(1..=10).contains(&params.importance) {
        return Err(MemoryError::Validation(format!(
            "importance must be between 1 and 10, got {}",
            params.importance
        )));
    }

    let tx = conn.transaction()?;

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let metadata_json = params
        .metadata
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| MemoryError::Validation(format!("metadata is not valid JSON: {e}")))?;

    tx.execute(
        "INSERT INTO memories (id, user_id, conversation_id, content, summary, importance, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            params.user_id,
            params.conversation_id,
            params.content,
            params.summary,
            params.importance,
            metadata_json,
            now,
        ],
    )?;
    let rowid = tx.last_insert_rowid();

    insert_fts(&tx, rowid, &id, params.user_id, params.content, params.summary)?;

    if let Some(embedding) = params.embedding {
        insert_vec(&tx, &id, embedding)?;
    }

    write_audit_log(&tx, "create", &id, None)?;

    tx.commit()?;

    Ok(Memory {
        id,
        user_id: params.user_id.to_string(),
        conversation_id: params.conversation_id.map(str::to_string),
        content: params.content.to_string(),
        summary: params.summary.to_string(),
        importance: params.importance,
        metadata: params.metadata.cloned(),
        created_at: now,
    })
}

/// List a user's memories, newest first.
pub fn list_by_user(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, conversation_id, content, summary, importance, metadata, created_at \
         FROM memories WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![user_id, limit as i64], memory_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete a memory owned by `user_id`. Removes the row, its FTS entry, and
/// its vector; returns the deleted record.
///
/// Ownership is part of the lookup: an id that exists under another user is
/// indistinguishable from one that does not exist.
pub fn delete_by_id_for_user(conn: &mut Connection, user_id: &str, id: &str) -> Result<Memory> {
    let tx = conn.transaction()?;

    let found: Option<(i64, Memory)> = tx
        .query_row(
            "SELECT rowid, id, user_id, conversation_id, content, summary, importance, metadata, created_at \
             FROM memories WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            |row| {
                let rowid: i64 = row.get(0)?;
                let metadata_str: Option<String> = row.get(7)?;
                Ok((
                    rowid,
                    Memory {
                        id: row.get(1)?,
                        user_id: row.get(2)?,
                        conversation_id: row.get(3)?,
                        content: row.get(4)?,
                        summary: row.get(5)?,
                        importance: row.get(6)?,
                        metadata: metadata_str.and_then(|s| serde_json::from_str(&s).ok()),
                        created_at: row.get(8)?,
                    },
                ))
            },
        )
        .optional()?;

    let (rowid, memory) = found.ok_or_else(|| MemoryError::NotFound(format!("memory {id}")))?;

    // FTS5 external-content tables need an explicit 'delete' insert
    tx.execute(
        "INSERT INTO memories_fts(memories_fts, rowid, content, summary, id, user_id) \
         VALUES('delete', ?1, ?2, ?3, ?4, ?5)",
        params![rowid, memory.content, memory.summary, memory.id, memory.user_id],
    )?;

    tx.execute("DELETE FROM memories_vec WHERE id = ?1", params![id])?;

    write_audit_log(
        &tx,
        "delete",
        id,
        Some(&serde_json::json!({ "user_id": user_id })),
    )?;

    tx.execute("DELETE FROM memories WHERE id = ?1", params![id])?;

    tx.commit()?;

    Ok(memory)
}

/// Sync the FTS5 index after inserting into the memories table.
///
/// Must use the same rowid as the corresponding `memories` row.
fn insert_fts(
    conn: &Transaction,
    rowid: i64,
    id: &str,
    user_id: &str,
    content: &str,
    summary: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO memories_fts (rowid, content, summary, id, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![rowid, content, summary, id, user_id],
    )?;
    Ok(())
}

/// Insert an embedding vector into the vec0 virtual table.
fn insert_vec(conn: &Transaction, id: &str, embedding: &[f32]) -> Result<()> {
    let embedding_bytes = super::embedding_to_bytes(embedding);
    conn.execute(
        "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_bytes],
    )?;
    Ok(())
}

/// Write an entry to the memory_log audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    memory_id: &str,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO memory_log (operation, memory_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, memory_id, details_json, now],
    )?;
    Ok(())
}

/// Map a full memories row in column order.
pub(crate) fn memory_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memory> {
    let metadata_str: Option<String> = row.get(6)?;
    Ok(Memory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        conversation_id: row.get(2)?,
        content: row.get(3)?,
        summary: row.get(4)?,
        importance: row.get(5)?,
        metadata: metadata_str.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: usize = 8;

    fn test_db() -> Connection {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::schema::init_schema(&conn, DIMS).unwrap();
        conn
    }

    /// Unit vector along one dimension.
    fn embedding(spike: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        v[spike % DIMS] = 1.0;
        v
    }

    fn create(conn: &mut Connection, user: &str, content: &str, emb: Option<&[f32]>) -> Memory {
        create_memory(
            conn,
            CreateMemory {
                user_id: user,
                conversation_id: Some("conv-1"),
                content,
                summary: "summary",
                importance: 5,
                embedding: emb,
                metadata: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn create_stores_row_vec_and_fts() {
        let mut conn = test_db();
        let emb = embedding(0);
        let memory = create(&mut conn, "alice", "User likes hiking", Some(&emb));

        let content: String = conn
            .query_row(
                "SELECT content FROM memories WHERE id = ?1",
                params![memory.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(content, "User likes hiking");

        let vec_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_vec WHERE id = ?1",
                params![memory.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(vec_count, 1);

        let fts_id: String = conn
            .query_row(
                "SELECT id FROM memories_fts WHERE memories_fts MATCH 'hiking'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(fts_id, memory.id);
    }

    #[test]
    fn create_without_embedding_skips_vec_table() {
        let mut conn = test_db();
        let memory = create(&mut conn, "alice", "No vector here", None);

        let vec_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_vec WHERE id = ?1",
                params![memory.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(vec_count, 0);

        // still reachable via the keyword index
        let fts_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH 'vector'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(fts_count, 1);
    }

    #[test]
    fn create_rejects_empty_content() {
        let mut conn = test_db();
        let result = create_memory(
            &mut conn,
            CreateMemory {
                user_id: "alice",
                conversation_id: None,
                content: "   ",
                summary: "s",
                importance: 5,
                embedding: None,
                metadata: None,
            },
        );
        assert!(matches!(result, Err(MemoryError::Validation(_))));
    }

    #[test]
    fn create_rejects_out_of_range_importance() {
        let mut conn = test_db();
        for importance in [0u8, 11] {
            let result = create_memory(
                &mut conn,
                CreateMemory {
                    user_id: "alice",
                    conversation_id: None,
                    content: "content",
                    summary: "s",
                    importance,
                    embedding: None,
                    metadata: None,
                },
            );
            assert!(matches!(result, Err(MemoryError::Validation(_))));
        }
    }

    #[test]
    fn duplicate_content_is_not_deduplicated() {
        let mut conn = test_db();
        let emb = embedding(0);
        let first = create(&mut conn, "alice", "User likes hiking", Some(&emb));
        let second = create(&mut conn, "alice", "User likes hiking", Some(&emb));
        assert_ne!(first.id, second.id);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn list_returns_newest_first() {
        let mut conn = test_db();
        let a = create(&mut conn, "alice", "first", None);
        let b = create(&mut conn, "alice", "second", None);
        create(&mut conn, "bob", "other user", None);

        let listed = list_by_user(&conn, "alice", 10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
    }

    #[test]
    fn list_respects_limit() {
        let mut conn = test_db();
        for i in 0..5 {
            create(&mut conn, "alice", &format!("memory {i}"), None);
        }
        let listed = list_by_user(&conn, "alice", 3).unwrap();
        assert_eq!(listed.len(), 3);
    }

    #[test]
    fn delete_removes_all_traces() {
        let mut conn = test_db();
        let emb = embedding(2);
        let memory = create(&mut conn, "alice", "User dislikes crowded trains", Some(&emb));

        let deleted = delete_by_id_for_user(&mut conn, "alice", &memory.id).unwrap();
        assert_eq!(deleted.id, memory.id);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let vec_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories_vec", [], |row| row.get(0))
            .unwrap();
        assert_eq!(vec_count, 0);

        let fts_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories_fts WHERE memories_fts MATCH 'trains'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(fts_count, 0);
    }

    #[test]
    fn delete_is_owner_scoped() {
        let mut conn = test_db();
        let memory = create(&mut conn, "alice", "private", None);

        let result = delete_by_id_for_user(&mut conn, "bob", &memory.id);
        assert!(matches!(result, Err(MemoryError::NotFound(_))));

        // alice's record is untouched
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn audit_log_records_create_and_delete() {
        let mut conn = test_db();
        let memory = create(&mut conn, "alice", "audited", None);
        delete_by_id_for_user(&mut conn, "alice", &memory.id).unwrap();

        let ops: Vec<String> = conn
            .prepare("SELECT operation FROM memory_log WHERE memory_id = ?1 ORDER BY id")
            .unwrap()
            .query_map(params![memory.id], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ops, vec!["create", "delete"]);
    }

    #[test]
    fn metadata_round_trips() {
        let mut conn = test_db();
        let metadata = serde_json::json!({"context": "onboarding", "source": "chat"});
        let memory = create_memory(
            &mut conn,
            CreateMemory {
                user_id: "alice",
                conversation_id: None,
                content: "with metadata",
                summary: "s",
                importance: 5,
                embedding: None,
                metadata: Some(&metadata),
            },
        )
        .unwrap();

        let listed = list_by_user(&conn, "alice", 1).unwrap();
        assert_eq!(listed[0].id, memory.id);
        assert_eq!(listed[0].metadata.as_ref().unwrap()["context"], "onboarding");
    }
}
