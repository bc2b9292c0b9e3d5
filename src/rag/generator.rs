//! Text generation backends.

use crate::error::{LecternError, Result};
use crate::openai::{classify_error, OpenAIClient};
use crate::throttle::ApiGate;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Trait for prompt-in, text-out generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`. Fails when the backend returns no text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generator backed by the OpenAI chat completions API.
pub struct OpenAIGenerator {
    client: OpenAIClient,
    gate: Arc<ApiGate>,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    pub fn new(client: OpenAIClient, gate: Arc<ApiGate>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            gate,
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| LecternError::Generation(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .build()
            .map_err(|e| LecternError::Generation(e.to_string()))?;

        let response = self
            .gate
            .call(|| {
                let request = request.clone();
                async move {
                    self.client
                        .chat()
                        .create(request)
                        .await
                        .map_err(|e| classify_error("Failed to generate response", e))
                }
            })
            .await?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LecternError::Generation("Empty response from LLM".to_string()))?;

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }
}
