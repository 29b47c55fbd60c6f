use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sift_common::{Result, SiftError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

/// How the model should shape its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid API key")]
    Unauthorized,

    #[error("API access forbidden")]
    Forbidden,

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Content blocked by safety filters")]
    Blocked,

    #[error("Empty response: {0}")]
    Empty(String),
}

impl From<LlmError> for SiftError {
    fn from(e: LlmError) -> Self {
        SiftError::Llm(e.to_string())
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        format: ResponseFormat,
    ) -> Result<LlmResponse>;

    /// Check if the LLM service is available
    async fn health_check(&self) -> Result<bool> {
        match self.generate("Respond with just 'OK'", None, ResponseFormat::Text).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(target: "sift.llm", model = self.model_name(), "health check failed: {e}");
                Ok(false)
            }
        }
    }

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
