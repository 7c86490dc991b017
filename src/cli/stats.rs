use anyhow::Result;

use crate::config::EngramConfig;

/// Display memory store statistics in the terminal.
pub fn stats(config: &EngramConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path, config.embedding.dimensions)?;

    let total: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))?;
    let embedded: i64 = conn.query_row("SELECT COUNT(*) FROM memories_vec", [], |r| r.get(0))?;

    println!("Memories: {total} ({embedded} with embeddings)");
    println!("Database: {}", db_path.display());
    println!();

    let mut stmt = conn.prepare(
        "SELECT user_id, COUNT(*), AVG(importance) FROM memories \
         GROUP BY user_id ORDER BY COUNT(*) DESC",
    )?;
    let rows: Vec<(String, i64, f64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        println!("No memories stored yet.");
        return Ok(());
    }

    println!("By user:");
    for (user, count, avg_importance) in rows {
        println!("  {user}: {count} memories (avg importance {avg_importance:.1})");
    }

    Ok(())
}
