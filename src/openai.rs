//! OpenAI client configuration and error classification.

use crate::error::{LecternError, Result};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Shared OpenAI client type.
pub type OpenAIClient = Client<OpenAIConfig>;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<OpenAIClient> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<OpenAIClient> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Map an OpenAI error onto the Lectern taxonomy.
///
/// Rate-limit and quota responses become retryable variants; everything else
/// is reported as a backend failure prefixed with `context`.
pub fn classify_error(context: &str, err: OpenAIError) -> LecternError {
    match &err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            let message = api.message.to_lowercase();

            if code == "insufficient_quota" || kind == "insufficient_quota" {
                LecternError::QuotaExhausted(format!("{}: {}", context, api.message))
            } else if code == "rate_limit_exceeded"
                || kind == "requests"
                || kind == "tokens"
                || message.contains("rate limit")
                || message.contains("429")
            {
                LecternError::RateLimited(format!("{}: {}", context, api.message))
            } else {
                LecternError::Backend(format!("{}: {}", context, err))
            }
        }
        OpenAIError::Reqwest(e) if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) => {
            LecternError::RateLimited(format!("{}: {}", context, e))
        }
        _ => LecternError::Backend(format!("{}: {}", context, err)),
    }
}
