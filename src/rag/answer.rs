//! Grounded answer generation.

use super::TextGenerator;
use crate::config::Prompts;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Builds grounding prompts and asks the generator for an answer.
pub struct AnswerGenerator {
    generator: Arc<dyn TextGenerator>,
    prompts: Prompts,
}

impl AnswerGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Prompts) -> Self {
        Self { generator, prompts }
    }

    /// Prompt for `question` grounded in `context_chunks`.
    ///
    /// With no chunks the ungrounded variant is used, which asks for an answer
    /// from general knowledge that says so.
    pub fn build_prompt(&self, question: &str, context_chunks: &[String]) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());

        if context_chunks.is_empty() {
            return self
                .prompts
                .render_with_custom(&self.prompts.answer.ungrounded, &vars);
        }

        vars.insert("context".to_string(), context_chunks.join("\n\n"));
        vars.insert(
            "fallback".to_string(),
            self.prompts.messages.insufficient_context.clone(),
        );
        self.prompts
            .render_with_custom(&self.prompts.answer.grounded, &vars)
    }

    /// Generate an answer to `question` from `context_chunks`.
    #[instrument(skip_all, fields(chunks = context_chunks.len()))]
    pub async fn generate_answer(&self, question: &str, context_chunks: &[String]) -> Result<String> {
        let prompt = self.build_prompt(question, context_chunks);
        let answer = self.generator.generate(&prompt).await?;

        info!("Generated answer from {} context chunks", context_chunks.len());
        Ok(answer.trim().to_string())
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }
}
