//! Turns a free-text question into search themes with the help of an LLM.

use crate::traits::{LlmClient, ResponseFormat};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use sift_common::{Result, SearchConfig, SiftError, Theme};
use std::sync::{Arc, OnceLock};

/// Languages the model may pick for searching.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "ja", "ko", "zh"];

/// Themes and run settings derived from one user question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredQuery {
    pub themes: Vec<Theme>,
    pub config: SearchConfig,
}

#[async_trait]
pub trait QueryStructurer: Send + Sync {
    async fn structure(&self, query: &str) -> Result<StructuredQuery>;
}

const STRUCTURE_SYSTEM_PROMPT: &str = r#"You are a search agent working out what the user is searching for.

Define the search query step by step:
1. Split the user question into sub-themes. Produce at least 3 sub-themes.
2. Phrase each sub-theme as a short question covering part of the user question.
3. Propose a few search keywords for each sub-theme.
4. Write a search instruction for the agent that will summarize the results.

Pick the language whose sources are most valuable for the question (for
example, Japanese sources for Japanese politics). Available languages: "en", "ja", "ko", "zh".

Respond with a single JSON object and nothing else, shaped like:
{
  "searchThemes": [
    { "theme": "What is ChatGPT?", "keywords": ["ChatGPT", "GPT Model", "LLM"] },
    { "theme": "How to use ChatGPT?", "keywords": ["ChatGPT usage", "ChatGPT tutorial"] }
  ],
  "searchConfig": { "lang": "en", "instruction": "Emphasize the importance of ChatGPT in the world." }
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQueries {
    search_themes: Vec<WireTheme>,
    search_config: WireConfig,
}

#[derive(Debug, Deserialize)]
struct WireTheme {
    theme: String,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireConfig {
    #[serde(default)]
    lang: String,
    #[serde(default)]
    instruction: String,
}

/// [`QueryStructurer`] that asks an [`LlmClient`] for JSON output.
pub struct LlmQueryStructurer {
    llm: Arc<dyn LlmClient + Send + Sync>,
}

impl LlmQueryStructurer {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QueryStructurer for LlmQueryStructurer {
    async fn structure(&self, query: &str) -> Result<StructuredQuery> {
        let response = self
            .llm
            .generate(query, Some(STRUCTURE_SYSTEM_PROMPT), ResponseFormat::Json)
            .await?;
        tracing::debug!(target: "sift.llm", model = self.llm.model_name(), "structurer response: {}", response.text);

        let structured = parse_structured_query(&response.text)?;
        tracing::info!(
            target: "sift.llm",
            themes = structured.themes.len(),
            lang = %structured.config.language_code,
            "query structured"
        );
        Ok(structured)
    }
}

/// Parse and clean the model's answer.
///
/// Strings are trimmed, blank keywords dropped, and themes without a title
/// removed. An answer with no usable theme is an error.
pub fn parse_structured_query(text: &str) -> Result<StructuredQuery> {
    let json = extract_json_block(text).unwrap_or_else(|| text.trim().to_string());
    let wire: WireQueries = serde_json::from_str(&json)
        .map_err(|e| SiftError::Structure(format!("invalid structurer output: {e}")))?;

    let themes: Vec<Theme> = wire
        .search_themes
        .into_iter()
        .filter_map(|t| {
            let title = t.theme.trim();
            if title.is_empty() {
                return None;
            }
            let keywords = t
                .keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(str::to_owned)
                .collect();
            Some(Theme::new(title, keywords))
        })
        .collect();

    if themes.is_empty() {
        return Err(SiftError::Structure("no search themes produced".to_string()));
    }

    let lang = wire.search_config.lang.trim().to_ascii_lowercase();
    if !SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
        tracing::warn!(target: "sift.llm", %lang, "unsupported language; searching without qualifier");
    }

    Ok(StructuredQuery {
        themes,
        config: SearchConfig {
            language_code: lang,
            instruction: wire.search_config.instruction.trim().to_string(),
        },
    })
}

/// Try to extract a ```json ... ``` fenced block, then a bare `{...}` span.
fn extract_json_block(text: &str) -> Option<String> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    static BARE: OnceLock<Option<Regex>> = OnceLock::new();

    let fence = FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok())
        .as_ref()?;
    if let Some(caps) = fence.captures(text) {
        return Some(caps.get(1)?.as_str().to_string());
    }
    let bare = BARE
        .get_or_init(|| Regex::new(r"(?s)(\{.*\})").ok())
        .as_ref()?;
    bare.captures(text)
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
}
