use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngramConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Fallback identity used when a request carries no user_id.
    pub default_user: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Result cap for explicit search when the caller sends no limit.
    pub default_limit: usize,
    /// Memories injected into the prompt on each chat turn.
    pub augment_limit: usize,
    /// KNN overfetch multiplier applied before the per-user post-filter.
    pub candidate_factor: usize,
}

impl Default for EngramConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_engram_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            default_user: "default".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "remote".into(),
            base_url: "https://api.openai.com/v1".into(),
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: 10,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            augment_limit: 5,
            candidate_factor: 4,
        }
    }
}

/// Returns `~/.engram/`
pub fn default_engram_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".engram")
}

/// Returns the default config file path: `~/.engram/config.toml`
pub fn default_config_path() -> PathBuf {
    default_engram_dir().join("config.toml")
}

impl EngramConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EngramConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ENGRAM_DB, ENGRAM_USER,
    /// ENGRAM_LOG_LEVEL, ENGRAM_EMBEDDING_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ENGRAM_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_USER") {
            self.storage.default_user = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_EMBEDDING_URL") {
            self.embedding.base_url = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngramConfig::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.default_user, "default");
        assert_eq!(config.retrieval.augment_limit, 5);
        assert_eq!(config.embedding.dimensions, 1536);
        assert!(config.storage.db_path.ends_with("memory.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"
port = 9000

[storage]
db_path = "/tmp/test.db"
default_user = "alice"

[embedding]
model = "text-embedding-3-large"
dimensions = 3072

[retrieval]
default_limit = 20
"#;
        let config: EngramConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.storage.default_user, "alice");
        assert_eq!(config.embedding.dimensions, 3072);
        assert_eq!(config.retrieval.default_limit, 20);
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.augment_limit, 5);
        assert_eq!(config.embedding.timeout_secs, 10);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = EngramConfig::default();
        std::env::set_var("ENGRAM_DB", "/tmp/override.db");
        std::env::set_var("ENGRAM_USER", "env-user");
        std::env::set_var("ENGRAM_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.storage.default_user, "env-user");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("ENGRAM_DB");
        std::env::remove_var("ENGRAM_USER");
        std::env::remove_var("ENGRAM_LOG_LEVEL");
    }
}
