//! Common types and utilities shared across Sift crates.
//!
//! This crate defines the search/extraction data model, observability helpers,
//! and the shared error type used throughout the Sift workspace. It is
//! intentionally lightweight so every crate can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`Theme`] and [`SearchConfig`]: structured input to a pipeline run
//! - [`ResultItem`] / [`SearchResult`]: deduplicated search hits per theme
//! - [`ContentItem`] / [`ContentResult`]: hits with extracted page text
//! - [`Skipped`]: a unit of work that failed and was left out of the output
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`SiftError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! Extending a search hit with its extracted content:
//!
//! ```rust
//! use sift_common::{ContentItem, ResultItem};
//!
//! let item = ResultItem::new("Rust", "A language empowering everyone", "https://www.rust-lang.org/");
//! let content = ContentItem::new(item.clone(), "Rust is fast.");
//! assert_eq!(content.item, item);
//! assert_eq!(content.content, "Rust is fast.");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod observability;

/// Upper bound on distinct results kept per theme.
pub const MAX_RESULTS_PER_THEME: usize = 5;

/// A sub-topic of a user query with ordered fallback keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub title: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Theme {
    pub fn new(title: impl Into<String>, keywords: Vec<String>) -> Self {
        Self {
            title: title.into(),
            keywords,
        }
    }

    /// Queries tried for this theme, in order: the title, then each keyword.
    pub fn attempts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str()).chain(self.keywords.iter().map(String::as_str))
    }
}

/// Run-wide search settings produced alongside the themes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// ISO 639-1 code driving the provider language qualifier.
    pub language_code: String,
    /// Free-form guidance for whatever summarizes the output.
    #[serde(default)]
    pub instruction: String,
}

/// One search hit. The full `(title, snippet, link)` tuple is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultItem {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

impl ResultItem {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            link: link.into(),
        }
    }
}

/// Deduplicated hits for one theme, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub theme: String,
    pub results: Vec<ResultItem>,
}

/// A [`ResultItem`] whose page was fetched and reduced to plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(flatten)]
    pub item: ResultItem,
    pub content: String,
}

impl ContentItem {
    pub fn new(item: ResultItem, content: impl Into<String>) -> Self {
        Self {
            item,
            content: content.into(),
        }
    }
}

/// Extracted content for one theme. Items that failed are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResult {
    pub theme: String,
    pub results: Vec<ContentItem>,
}

/// Pipeline stage a [`Skipped`] unit of work belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Search,
    Fetch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Search => f.write_str("search"),
            Stage::Fetch => f.write_str("fetch"),
        }
    }
}

/// A query attempt or item fetch that failed and was contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub stage: Stage,
    pub theme: String,
    /// The query text (search) or link (fetch) that failed.
    pub target: String,
    pub reason: String,
}

impl Skipped {
    pub fn new(
        stage: Stage,
        theme: impl Into<String>,
        target: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            stage,
            theme: theme.into(),
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

/// Error types used across the Sift system.
///
/// Only run-level failures live here; per-query and per-item failures are
/// recorded as [`Skipped`] and never surface as errors.
#[derive(thiserror::Error, Debug)]
pub enum SiftError {
    /// The browsing session was not acquired before a run.
    #[error("Browser resource not initialized")]
    ResourceUninitialized,

    /// A driver (browser, network, etc.) reported an error outside a unit of work.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// The language model could not be reached or answered with an error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The language model answered but the output could not be used.
    #[error("Query structuring error: {0}")]
    Structure(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`SiftError`].
pub type Result<T> = std::result::Result<T, SiftError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attempts_start_with_title() {
        let theme = Theme::new("What is Rust?", vec!["rust".into(), "rustlang".into()]);
        let attempts: Vec<&str> = theme.attempts().collect();
        assert_eq!(attempts, vec!["What is Rust?", "rust", "rustlang"]);
    }

    #[test]
    fn content_item_serializes_flat() {
        let item = ContentItem::new(ResultItem::new("t", "s", "https://a.example/"), "body");
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(
            v,
            json!({ "title": "t", "snippet": "s", "link": "https://a.example/", "content": "body" })
        );
    }

    #[test]
    fn skipped_keeps_reason_text() {
        let s = Skipped::new(Stage::Fetch, "theme", "https://a.example/", "timed out");
        assert_eq!(s.reason, "timed out");
        assert_eq!(s.stage.to_string(), "fetch");
    }
}
