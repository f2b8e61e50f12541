//! Centralized configuration for codeqa.
//!
//! Configuration priority:
//! 1. Environment variables (and a loaded `.env`, via `dotenvy`)
//! 2. Config file (`codeqa.toml` in the working directory, or
//!    `~/.config/codeqa/config.toml`)
//! 3. Default values

use error::{CodeqaError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Chunking knobs, per §6.4/§4.3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Character-length target for the size-fallback chunker.
    pub max_chunk_size: usize,
    /// Character budget whose line-equivalent (`overlap_size / 50`) is
    /// carried forward between consecutive fallback chunks.
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1500,
            overlap_size: 150,
        }
    }
}

/// Top-level configuration, matching §6.4 field-for-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_connection: Option<String>,
    pub database_name: String,
    pub frontend_origin: String,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Embedding vector dimensionality; fixed per deployment (§3).
    pub embedding_dim: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_endpoint: "http://localhost:11434/v1".to_string(),
            provider_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            store_connection: None,
            database_name: "codeqa".to_string(),
            frontend_origin: "http://localhost:3000".to_string(),
            chunking: ChunkingConfig::default(),
            embedding_dim: 1536,
        }
    }
}

impl Config {
    /// Load layered configuration: defaults, then a config file if
    /// present, then environment variable overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::file_or_default()?;
        cfg.apply_env_overrides();
        cfg.validate()
    }

    fn file_or_default() -> Result<Self> {
        if let Ok(content) = std::fs::read_to_string("codeqa.toml") {
            return toml::from_str(&content)
                .map_err(|e| CodeqaError::config(format!("invalid codeqa.toml: {e}")));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("codeqa").join("config.toml");
            if let Ok(content) = std::fs::read_to_string(&path) {
                return toml::from_str(&content)
                    .map_err(|e| CodeqaError::config(format!("invalid {}: {e}", path.display())));
            }
        }

        Ok(Self::default())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CODEQA_PROVIDER_ENDPOINT") {
            if !v.trim().is_empty() {
                self.provider_endpoint = v;
            }
        }
        if let Ok(v) = std::env::var("CODEQA_PROVIDER_KEY") {
            if !v.trim().is_empty() {
                self.provider_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("CODEQA_CHAT_MODEL") {
            if !v.trim().is_empty() {
                self.chat_model = v;
            }
        }
        if let Ok(v) = std::env::var("CODEQA_EMBEDDING_MODEL") {
            if !v.trim().is_empty() {
                self.embedding_model = v;
            }
        }
        if let Ok(v) = std::env::var("CODEQA_STORE_CONNECTION") {
            if !v.trim().is_empty() {
                self.store_connection = Some(v);
            }
        }
        if let Ok(v) = std::env::var("CODEQA_DATABASE_NAME") {
            if !v.trim().is_empty() {
                self.database_name = v;
            }
        }
        if let Ok(v) = std::env::var("CODEQA_FRONTEND_ORIGIN") {
            if !v.trim().is_empty() {
                self.frontend_origin = v;
            }
        }
    }

    /// Missing `provider_key` or `store_connection` at start-up is fatal (§6.4).
    fn validate(self) -> Result<Self> {
        if self.provider_key.as_deref().unwrap_or_default().trim().is_empty() {
            return Err(CodeqaError::config("missing provider_key"));
        }
        if self
            .store_connection
            .as_deref()
            .unwrap_or_default()
            .trim()
            .is_empty()
        {
            return Err(CodeqaError::config("missing store_connection"));
        }
        Ok(self)
    }

    pub fn project_root() -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}
