use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::config::EngramConfig;

/// Run an interactive search from the terminal.
pub async fn search(config: &EngramConfig, query: &str, user: Option<&str>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path, config.embedding.dimensions)?;
    let db = Arc::new(Mutex::new(conn));

    let provider = crate::embedding::create_provider(&config.embedding)?;
    let embedding: Arc<dyn crate::embedding::EmbeddingProvider> = Arc::from(provider);

    let user_id = user.unwrap_or(&config.storage.default_user);

    let response = crate::memory::search::search(
        db,
        embedding,
        query,
        user_id,
        config.retrieval.default_limit,
        config.retrieval.candidate_factor,
    )
    .await?;

    if response.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    if response.degraded {
        println!("(embedding unavailable — keyword results)\n");
    }

    println!("Found {} result(s)\n", response.results.len());

    for (i, result) in response.results.iter().enumerate() {
        println!(
            "  {}. {} (importance: {}, score: {:.4})",
            i + 1,
            result.memory.id,
            result.memory.importance,
            result.score,
        );
        println!("     {}", result.memory.summary);
        println!();
    }

    Ok(())
}
