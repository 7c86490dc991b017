//! Semantic memory for AI chat — durable facts extracted from conversation,
//! recalled by vector similarity, and folded back into the next prompt.
//!
//! Engram sits behind a chat application's turn loop. After each exchange it
//! extracts candidate facts about the user (name, location, work,
//! preferences) with a rule-based extractor, scores the exchange's salience,
//! condenses it into a short summary, and persists the result as a user-scoped
//! memory with an embedding. Before the next generation call it retrieves the
//! memories most similar to the incoming message and appends them to the
//! system instructions.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for vector search and FTS5 as the degraded keyword fallback
//! - **Embeddings**: remote OpenAI-compatible embeddings API over HTTP
//! - **Surface**: JSON HTTP API (axum) consumed by the chat route handlers,
//!   plus a small terminal CLI
//!
//! Memory writes are best-effort and decoupled from the chat response: a
//! failed write is logged and the turn proceeds. Retrieval failures degrade
//! to the unaugmented base prompt, never to a failed turn.
//!
//! # Modules
//!
//! - [`api`] — HTTP surface: memory CRUD and the per-turn hooks
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`embedding`] — Text-to-vector embedding via a remote provider
//! - [`error`] — The error taxonomy shared by the core modules
//! - [`memory`] — Core engine: extract, score, summarize, store, search, augment
//! - [`server`] — axum server bootstrap

pub mod api;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod server;
