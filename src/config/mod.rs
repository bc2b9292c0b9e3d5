//! Configuration module for Lectern.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, ReplyMessages, TranscriptionPrompts};
pub use settings::{
    BackendSettings, GeneralSettings, PromptSettings, RetrievalSettings, ServerSettings,
    Settings, StoreSettings, ThrottleSettings,
};
