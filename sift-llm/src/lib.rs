//! LLM integration for Sift.
//!
//! This crate exposes a common [`traits::LlmClient`] interface, a Gemini
//! implementation, and the [`structurer::QueryStructurer`] that turns a free
//! text question into search themes.
//!
//! # Examples
//! ```no_run
//! use sift_common::Result;
//! use sift_llm::{ensure_llm_ready, LlmConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let cfg = LlmConfig::Gemini {
//!     api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
//!     model: sift_llm::DEFAULT_GEMINI_MODEL.to_string(),
//!     temperature: None,
//!     max_tokens: None,
//! };
//! let client = ensure_llm_ready(&cfg)?;
//! assert!(!client.model_name().is_empty());
//! # Ok(())
//! # }
//! ```
pub mod gemini;
pub mod structurer;
pub mod traits;

use gemini::GeminiClient;
use sift_common::SiftError;
use std::sync::Arc;
use traits::LlmClient;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Provider selection for the query structurer.
#[derive(Debug, Clone)]
pub enum LlmConfig {
    Gemini {
        api_key: String,
        model: String,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    },
    None,
}

/// Build the configured LLM client.
pub fn ensure_llm_ready(
    config: &LlmConfig,
) -> sift_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        LlmConfig::Gemini {
            api_key,
            model,
            temperature,
            max_tokens,
        } => {
            if api_key.trim().is_empty() {
                return Err(SiftError::Config("Gemini API key is empty".to_string()));
            }
            let mut client = GeminiClient::new(api_key.clone(), model.clone())?;
            if let Some(t) = temperature {
                client = client.with_temperature(*t);
            }
            if let Some(m) = max_tokens {
                client = client.with_max_tokens(*m);
            }
            Ok(Arc::new(client))
        }
        LlmConfig::None => Err(SiftError::Config("No LLM configured".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_a_config_error() {
        let cfg = LlmConfig::Gemini {
            api_key: "  ".into(),
            model: DEFAULT_GEMINI_MODEL.into(),
            temperature: None,
            max_tokens: None,
        };
        assert!(matches!(ensure_llm_ready(&cfg), Err(SiftError::Config(_))));
    }

    #[test]
    fn none_is_rejected() {
        assert!(matches!(
            ensure_llm_ready(&LlmConfig::None),
            Err(SiftError::Config(_))
        ));
    }
}
