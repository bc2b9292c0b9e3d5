//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{LecternError, Result};
use crate::openai::{classify_error, OpenAIClient};
use crate::throttle::ApiGate;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// OpenAI-based embedder. Every request goes through the shared [`ApiGate`].
pub struct OpenAIEmbedder {
    client: OpenAIClient,
    gate: Arc<ApiGate>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(client: OpenAIClient, gate: Arc<ApiGate>, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            gate,
            model: model.to_string(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text), fields(model = %self.model, len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| LecternError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .gate
            .call(|| {
                let request = request.clone();
                async move {
                    self.client
                        .embeddings()
                        .create(request)
                        .await
                        .map_err(|e| classify_error("Embedding API error", e))
                }
            })
            .await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LecternError::Embedding("Empty embedding response".to_string()))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::{config::OpenAIConfig, Client};

    #[test]
    fn test_embedder_creation() {
        let client = Client::with_config(OpenAIConfig::new().with_api_key("test"));
        let gate = Arc::new(ApiGate::default());

        let embedder = OpenAIEmbedder::new(client.clone(), gate.clone(), "text-embedding-3-small", 1536);
        assert_eq!(embedder.dimensions(), 1536);

        let embedder = OpenAIEmbedder::new(client, gate, "text-embedding-3-large", 3072);
        assert_eq!(embedder.dimensions(), 3072);
    }
}
