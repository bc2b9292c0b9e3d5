//! Configuration settings for Lectern.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub throttle: ThrottleSettings,
    pub retrieval: RetrievalSettings,
    pub store: StoreSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.lectern".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin ("*" allows any).
    pub cors_origin: String,
    /// Maximum request body size for uploads.
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3333,
            cors_origin: "http://localhost:5173".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Generative backend models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Model used to transcribe audio segments.
    pub transcription_model: String,
    /// Model used for text embeddings.
    pub embedding_model: String,
    /// Embedding dimensions.
    pub embedding_dimensions: u32,
    /// Model used to generate answers.
    pub generation_model: String,
    /// Sampling temperature for answers.
    pub temperature: f32,
    /// Timeout for a single backend request.
    pub request_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            transcription_model: "gpt-4o-transcribe".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            generation_model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            request_timeout_secs: 300,
        }
    }
}

/// Spacing and retry behaviour for backend calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    /// Minimum time between the end of one backend call and the start of the next.
    pub min_interval_ms: u64,
    /// Retries after a rate-limited attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Delay multiplier between retries.
    pub backoff_factor: u32,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 500, // ~120 calls per minute
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_factor: 2,
        }
    }
}

/// Context retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Maximum number of context chunks passed to answer generation.
    pub max_chunks: usize,
    /// Chunks with a lower cosine similarity are discarded.
    pub min_similarity: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_chunks: 5,
            min_similarity: 0.2,
        }
    }
}

/// Content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Store provider (sqlite, memory).
    pub provider: String,
    /// Path to the SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.lectern/lectern.db".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lectern")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [throttle]
            min_interval_ms = 250

            [retrieval]
            max_chunks = 8
            "#,
        )
        .unwrap();

        assert_eq!(settings.throttle.min_interval_ms, 250);
        assert_eq!(settings.throttle.max_retries, 3);
        assert_eq!(settings.retrieval.max_chunks, 8);
        assert!((settings.retrieval.min_similarity - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.store.provider, "sqlite");
    }

    #[test]
    fn test_load_serialized_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.server.port = 4000;
        std::fs::write(&path, toml::to_string_pretty(&settings).unwrap()).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 4000);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = PathBuf::from("/nonexistent/lectern/config.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.backend.embedding_dimensions, 1536);
    }
}
