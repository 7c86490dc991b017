//! HTTP server initialization.
//!
//! [`serve`] wires the database, embedding provider, and API router into a
//! running axum server with graceful shutdown.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::api::{self, AppState};
use crate::config::EngramConfig;
use crate::db;
use crate::embedding;

/// Shared setup: open DB, create embedding provider, check model tag.
/// Returns (db, embedding, config) wrapped in Arc for sharing.
pub(crate) fn setup_shared_state(
    config: EngramConfig,
) -> Result<(
    Arc<Mutex<rusqlite::Connection>>,
    Arc<dyn embedding::EmbeddingProvider>,
    Arc<EngramConfig>,
)> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path, config.embedding.dimensions)?;
    tracing::info!(db = %db_path.display(), "database ready");

    // Warn on embedding model mismatch — stored vectors would be incomparable
    if let Ok(Some(stored_model)) = db::migrations::get_embedding_model(&conn) {
        if stored_model != config.embedding.model {
            tracing::warn!(
                stored = %stored_model,
                configured = %config.embedding.model,
                "embedding model changed — existing vectors were produced by a different model"
            );
        }
    }
    db::migrations::set_embedding_model(&conn, &config.embedding.model)?;

    let db = Arc::new(Mutex::new(conn));

    let provider = embedding::create_provider(&config.embedding)?;
    let embedding: Arc<dyn embedding::EmbeddingProvider> = Arc::from(provider);
    tracing::info!("embedding provider ready");

    let config = Arc::new(config);

    Ok((db, embedding, config))
}

/// Start the HTTP API server.
pub async fn serve(config: EngramConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting engram memory server");

    let (db, embedding, config) = setup_shared_state(config)?;

    let state = AppState::new(db, embedding, config);
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "memory server listening at http://{bind_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down server");
        })
        .await?;

    Ok(())
}
