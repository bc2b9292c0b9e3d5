//! Prompt templates and fixed reply messages for Lectern.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub transcription: TranscriptionPrompts,
    pub answer: AnswerPrompts,
    /// Fixed messages written into a question's answer.
    pub messages: ReplyMessages,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Instructions sent alongside audio for transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionPrompts {
    pub instructions: String,
}

impl Default for TranscriptionPrompts {
    fn default() -> Self {
        Self {
            instructions: r#"Transcribe the audio faithfully. Use proper punctuation and split paragraphs where the subject changes or the speaker pauses. Keep slang, regionalisms and mispronunciations as spoken. Do not add, omit or interpret anything. Mark unintelligible passages as [inaudible]."#
                .to_string(),
        }
    }
}

/// Prompts for answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    /// Used when relevant context was found. Variables: question, context, fallback.
    pub grounded: String,
    /// Used when no context is available. Variables: question.
    pub ungrounded: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            grounded: r#"You are an assistant that answers questions about recorded class content. Follow these rules strictly:

- Use only the information in the CONTEXT below.
- If the answer is not in the context, reply exactly with: "{{fallback}}"
- Be clear, objective and direct, with an educational and friendly tone.
- When possible, quote the relevant passage, e.g. "According to the class content, ...".
- Do not invent, extrapolate or assume anything that is not stated in the context.
- Structure the answer in short paragraphs.

CONTEXT:
{{context}}

QUESTION:
{{question}}"#
                .to_string(),

            ungrounded: r#"You are an assistant that answers questions about class content. No class material is available for this question. Answer from your general knowledge of the subject, and state clearly that you are using your own knowledge rather than anything from the class. Be clear, objective and friendly, and structure the answer in short paragraphs.

QUESTION:
{{question}}"#
                .to_string(),
        }
    }
}

/// Fixed replies stored as a question's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyMessages {
    /// Stored when retrieval finds nothing relevant in the room.
    pub insufficient_context: String,
    pub rate_limited: String,
    pub quota_exhausted: String,
    pub generic_failure: String,
}

impl Default for ReplyMessages {
    fn default() -> Self {
        Self {
            insufficient_context:
                "I don't have enough information in this room's content to answer that question."
                    .to_string(),
            rate_limited:
                "The AI service request limit was exceeded. Please try again in a few minutes."
                    .to_string(),
            quota_exhausted:
                "The AI service quota is exhausted. Please try again later or upgrade the plan."
                    .to_string(),
            generic_failure: "An error occurred while generating the answer. Please try again."
                .to_string(),
        }
    }
}

impl ReplyMessages {
    /// Pick the user-facing message for a failed answer.
    pub fn for_error(&self, error: &crate::error::LecternError) -> &str {
        match error {
            crate::error::LecternError::RateLimited(_) => &self.rate_limited,
            crate::error::LecternError::QuotaExhausted(_) => &self.quota_exhausted,
            _ => &self.generic_failure,
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let transcription_path = custom_path.join("transcription.toml");
            if transcription_path.exists() {
                let content = std::fs::read_to_string(&transcription_path)?;
                prompts.transcription = toml::from_str(&content)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }

            let messages_path = custom_path.join("messages.toml");
            if messages_path.exists() {
                let content = std::fs::read_to_string(&messages_path)?;
                prompts.messages = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are resolved in one pass over the template, so substituted
    /// values are never expanded again. Unknown placeholders are left as is.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LecternError;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.answer.grounded.contains("{{context}}"));
        assert!(prompts.answer.grounded.contains("{{fallback}}"));
        assert!(!prompts.answer.ungrounded.contains("{{context}}"));
        assert!(!prompts.transcription.instructions.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_substituted_values_are_not_expanded() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "write {{question}} to echo".to_string());
        vars.insert("question".to_string(), "What is {{context}}?".to_string());

        let template = "C: {{context}} Q: {{question}} U: {{unknown}}";
        let expected = "C: write {{question}} to echo Q: What is {{context}}? U: {{unknown}}";
        for _ in 0..50 {
            assert_eq!(Prompts::render(template, &vars), expected);
        }
    }

    #[test]
    fn test_custom_variables_are_overridden() {
        let mut custom = HashMap::new();
        custom.insert("course".to_string(), "Biology".to_string());
        custom.insert("question".to_string(), "ignored".to_string());
        let prompts = Prompts::load(None, Some(&custom)).unwrap();

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "What is a cell?".to_string());

        let rendered = prompts.render_with_custom("{{course}}: {{question}}", &vars);
        assert_eq!(rendered, "Biology: What is a cell?");
    }

    #[test]
    fn test_messages_from_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("messages.toml"),
            "insufficient_context = \"Nothing to go on.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.messages.insufficient_context, "Nothing to go on.");
        assert_eq!(
            prompts.messages.rate_limited,
            ReplyMessages::default().rate_limited
        );
    }

    #[test]
    fn test_message_for_error() {
        let messages = ReplyMessages::default();
        assert_eq!(
            messages.for_error(&LecternError::RateLimited("429".into())),
            messages.rate_limited
        );
        assert_eq!(
            messages.for_error(&LecternError::QuotaExhausted("quota".into())),
            messages.quota_exhausted
        );
        assert_eq!(
            messages.for_error(&LecternError::Store("disk".into())),
            messages.generic_failure
        );
    }
}
