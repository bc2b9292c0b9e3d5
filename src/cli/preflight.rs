//! Pre-flight checks before operations that call the backend.
//!
//! Validates configuration up front so a server or question does not fail
//! midway on a missing key.

use crate::error::{LecternError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// The server transcribes, embeds and generates, so it needs the API key.
    Serve,
    /// Asking a question needs the API key.
    Ask,
    /// Room management only touches the store.
    Rooms,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Serve | Operation::Ask => check_api_key(std::env::var("OPENAI_API_KEY").ok()),
        Operation::Rooms => Ok(()),
    }
}

fn check_api_key(key: Option<String>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(LecternError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(LecternError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
