//! OpenAI transcription implementation.

use super::{AudioPayload, Transcriber};
use crate::error::{LecternError, Result};
use crate::openai::{classify_error, OpenAIClient};
use crate::throttle::ApiGate;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Transcriber backed by an OpenAI speech-to-text model.
pub struct OpenAITranscriber {
    client: OpenAIClient,
    gate: Arc<ApiGate>,
    model: String,
    instructions: String,
}

impl OpenAITranscriber {
    /// Create a transcriber; `instructions` is sent as the transcription prompt.
    pub fn new(client: OpenAIClient, gate: Arc<ApiGate>, model: &str, instructions: &str) -> Self {
        Self {
            client,
            gate,
            model: model.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for OpenAITranscriber {
    #[instrument(skip(self, audio), fields(model = %self.model, mime = %audio.mime_type, bytes = audio.data.len()))]
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String> {
        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(audio.file_name()?, audio.data.clone()))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if !self.instructions.is_empty() {
            request_builder.prompt(&self.instructions);
        }

        let request = request_builder.build().map_err(|e| {
            LecternError::Transcription(format!("Failed to build request: {}", e))
        })?;

        let response = self
            .gate
            .call(|| {
                let request = request.clone();
                async move {
                    self.client
                        .audio()
                        .transcribe(request)
                        .await
                        .map_err(|e| classify_error("Transcription API error", e))
                }
            })
            .await?;

        let text = response.text.trim().to_string();
        if text.is_empty() {
            return Err(LecternError::Transcription(
                "Could not convert the audio to text".to_string(),
            ));
        }

        debug!("Transcribed {} characters", text.len());
        Ok(text)
    }
}
