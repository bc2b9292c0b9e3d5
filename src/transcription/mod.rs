//! Transcription module for Lectern.
//!
//! Turns recorded audio segments into text using the generative backend.

mod openai;

pub use openai::OpenAITranscriber;

use crate::error::{LecternError, Result};
use async_trait::async_trait;

/// An uploaded audio segment.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl AudioPayload {
    /// Validate and wrap an uploaded audio segment.
    pub fn new(data: Vec<u8>, mime_type: &str) -> Result<Self> {
        if data.is_empty() {
            return Err(LecternError::InvalidInput("Audio is required".to_string()));
        }
        let payload = Self {
            data,
            mime_type: mime_type.to_string(),
        };
        payload.extension()?;
        Ok(payload)
    }

    /// File extension the backend uses to detect the container format.
    pub fn extension(&self) -> Result<&'static str> {
        let essence = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        match essence.as_str() {
            "audio/webm" | "video/webm" => Ok("webm"),
            "audio/ogg" | "audio/opus" => Ok("ogg"),
            "audio/mpeg" | "audio/mp3" => Ok("mp3"),
            "audio/wav" | "audio/wave" | "audio/x-wav" => Ok("wav"),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "video/mp4" => Ok("m4a"),
            "audio/flac" | "audio/x-flac" => Ok("flac"),
            _ => Err(LecternError::UnsupportedFileType(self.mime_type.clone())),
        }
    }

    /// File name sent with the upload.
    pub fn file_name(&self) -> Result<String> {
        Ok(format!("segment.{}", self.extension()?))
    }
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio segment to plain text.
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String>;
}
