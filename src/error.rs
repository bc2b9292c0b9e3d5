//! Error types for Lectern.

use thiserror::Error;
use uuid::Uuid;

/// Library-level error type for Lectern operations.
#[derive(Error, Debug)]
pub enum LecternError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Backend rate limit reached: {0}")]
    RateLimited(String),

    #[error("Backend quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Content store error: {0}")]
    Store(String),

    #[error("Room not found: {0}")]
    RoomNotFound(Uuid),

    #[error("Question not found: {0}")]
    QuestionNotFound(Uuid),

    #[error("Recording is not active for room {0}")]
    RecordingInactive(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl LecternError {
    /// Whether the backend signalled a rate limit (HTTP 429 or exhausted quota).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LecternError::RateLimited(_) | LecternError::QuotaExhausted(_))
    }

    /// Whether the error was caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LecternError::InvalidInput(_)
                | LecternError::UnsupportedFileType(_)
                | LecternError::RecordingInactive(_)
        )
    }

    /// Whether the error refers to a missing room or question.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LecternError::RoomNotFound(_) | LecternError::QuestionNotFound(_))
    }
}

/// Result type alias for Lectern operations.
pub type Result<T> = std::result::Result<T, LecternError>;
