//! Per-theme search against the provider's rendered result page.
//!
//! Each theme tries its title, then each keyword, until five distinct
//! `(title, snippet, link)` tuples have been collected or the attempts run out.
//! A failed attempt is recorded and the next one is tried.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use sift_common::{
    MAX_RESULTS_PER_THEME, ResultItem, SearchConfig, SearchResult, Skipped, Stage, Theme,
};
use sift_drivers::browser::{BrowserContext, BrowserPage};
use sift_drivers::browser::guard::PageGuard;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Provider `lr` values by language code.
const LANGUAGE_QUALIFIERS: &[(&str, &str)] = &[
    ("en", "lang_en"),
    ("ja", "lang_ja"),
    ("ko", "lang_ko"),
    ("zh", "lang_zh-CN"),
];

/// Reads the first five result blocks. The slice bound matches
/// [`MAX_RESULTS_PER_THEME`].
pub const RESULT_EXTRACTION_SCRIPT: &str = r#"return Array.from(document.querySelectorAll('.g'))
  .slice(0, 5)
  .map((el) => {
    const heading = el.querySelector('h3');
    const snippet = el.querySelector('.VwiC3b');
    const anchor = el.querySelector('a[href]');
    return {
      title: heading ? heading.textContent : '',
      snippet: snippet ? snippet.textContent : '',
      link: anchor ? anchor.href : '',
    };
  });"#;

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub endpoint: String,
    pub navigation_timeout: Duration,
    pub settle_timeout: Duration,
    /// Pause between consecutive attempts of one theme.
    pub delay: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            navigation_timeout: Duration::from_secs(30),
            settle_timeout: Duration::from_secs(10),
            delay: Duration::from_secs(1),
        }
    }
}

/// Output of [`SearchOrchestrator::run`].
#[derive(Debug, Clone, Default)]
pub struct SearchRun {
    /// One entry per input theme, in input order.
    pub results: Vec<SearchResult>,
    pub skipped: Vec<Skipped>,
}

/// Resolve the provider language qualifier; unknown codes get none.
pub fn language_qualifier(language_code: &str) -> Option<&'static str> {
    let code = language_code.trim().to_ascii_lowercase();
    LANGUAGE_QUALIFIERS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, lr)| *lr)
}

/// Build the provider URL for one query.
pub fn search_url(endpoint: &str, query: &str, qualifier: Option<&str>) -> Result<Url> {
    let mut url =
        Url::parse(endpoint).with_context(|| format!("invalid search endpoint {endpoint}"))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", query);
        if let Some(lr) = qualifier {
            pairs.append_pair("lr", lr);
        }
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct RawHit {
    title: Option<String>,
    snippet: Option<String>,
    link: Option<String>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Turn the extraction script's output into well-formed items, dropping any
/// hit without a title, snippet, or link.
pub fn parse_result_items(raw: Value) -> Result<Vec<ResultItem>> {
    let hits: Vec<RawHit> =
        serde_json::from_value(raw).context("result extraction returned an unexpected shape")?;
    Ok(hits
        .into_iter()
        .take(MAX_RESULTS_PER_THEME)
        .filter_map(|hit| {
            Some(ResultItem {
                title: non_empty(hit.title)?,
                snippet: non_empty(hit.snippet)?,
                link: non_empty(hit.link)?,
            })
        })
        .collect())
}

/// Insertion-ordered set keyed on the full result tuple.
#[derive(Debug, Default)]
struct DedupSet {
    seen: HashSet<ResultItem>,
    ordered: Vec<ResultItem>,
}

impl DedupSet {
    fn insert(&mut self, item: ResultItem) -> bool {
        if self.seen.contains(&item) {
            return false;
        }
        self.seen.insert(item.clone());
        self.ordered.push(item);
        true
    }

    fn len(&self) -> usize {
        self.ordered.len()
    }

    fn into_first(mut self, n: usize) -> Vec<ResultItem> {
        self.ordered.truncate(n);
        self.ordered
    }
}

pub struct SearchOrchestrator {
    settings: SearchSettings,
}

impl SearchOrchestrator {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Search every theme in order. Never fails: a theme whose attempts all
    /// fail yields an empty result list.
    pub async fn run(
        &self,
        context: &dyn BrowserContext,
        themes: &[Theme],
        config: &SearchConfig,
    ) -> SearchRun {
        let qualifier = language_qualifier(&config.language_code);
        if qualifier.is_none() && !config.language_code.is_empty() {
            debug!(
                target: "sift.search",
                lang = %config.language_code,
                "no language qualifier for code"
            );
        }

        let mut run = SearchRun::default();
        for theme in themes {
            let (result, skipped) = self.search_theme(context, theme, qualifier).await;
            info!(
                target: "sift.search",
                theme = %theme.title,
                results = result.results.len(),
                failed_attempts = skipped.len(),
                "theme searched"
            );
            run.results.push(result);
            run.skipped.extend(skipped);
        }
        run
    }

    async fn search_theme(
        &self,
        context: &dyn BrowserContext,
        theme: &Theme,
        qualifier: Option<&str>,
    ) -> (SearchResult, Vec<Skipped>) {
        let mut skipped = Vec::new();
        let mut found = DedupSet::default();

        let mut page = match context.new_page().await {
            Ok(page) => PageGuard::new(page),
            Err(e) => {
                warn!(target: "sift.search", theme = %theme.title, error = %e, "could not open search page");
                skipped.push(Skipped::new(
                    Stage::Search,
                    &theme.title,
                    &theme.title,
                    format!("failed to open page: {e:#}"),
                ));
                return (
                    SearchResult {
                        theme: theme.title.clone(),
                        results: Vec::new(),
                    },
                    skipped,
                );
            }
        };

        let attempts: Vec<&str> = theme.attempts().collect();
        for (index, query) in attempts.iter().enumerate() {
            match self.attempt(&mut page, query, qualifier).await {
                Ok(items) => {
                    let added = items
                        .into_iter()
                        .map(|item| found.insert(item))
                        .filter(|inserted| *inserted)
                        .count();
                    debug!(target: "sift.search", %query, added, total = found.len(), "attempt finished");
                }
                Err(e) => {
                    warn!(target: "sift.search", %query, error = %format!("{e:#}"), "search attempt failed");
                    skipped.push(Skipped::new(Stage::Search, &theme.title, *query, format!("{e:#}")));
                }
            }

            if found.len() >= MAX_RESULTS_PER_THEME {
                debug!(target: "sift.search", theme = %theme.title, attempts = index + 1, "enough results");
                break;
            }
            if index + 1 < attempts.len() && !self.settings.delay.is_zero() {
                sleep(self.settings.delay).await;
            }
        }

        if let Err(e) = page.close().await {
            warn!(target: "sift.search", error = %e, "failed to close search page");
        }

        (
            SearchResult {
                theme: theme.title.clone(),
                results: found.into_first(MAX_RESULTS_PER_THEME),
            },
            skipped,
        )
    }

    async fn attempt(
        &self,
        page: &mut PageGuard,
        query: &str,
        qualifier: Option<&str>,
    ) -> Result<Vec<ResultItem>> {
        let url = search_url(&self.settings.endpoint, query, qualifier)?;
        let page = page.page_mut()?;
        page.goto(url.as_str(), self.settings.navigation_timeout).await?;
        page.wait_until_settled(self.settings.settle_timeout).await;
        let raw = page.evaluate(RESULT_EXTRACTION_SCRIPT).await?;
        parse_result_items(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_known_language_codes() {
        assert_eq!(language_qualifier("ja"), Some("lang_ja"));
        assert_eq!(language_qualifier(" EN "), Some("lang_en"));
        assert_eq!(language_qualifier("fr"), None);
        assert_eq!(language_qualifier(""), None);
    }

    #[test]
    fn url_carries_qualifier_only_when_mapped() {
        let ja = search_url(DEFAULT_SEARCH_ENDPOINT, "東京 天気", language_qualifier("ja")).unwrap();
        assert!(ja.as_str().contains("&lr=lang_ja"), "{ja}");
        assert!(ja.as_str().starts_with("https://www.google.com/search?q="));

        let fr = search_url(DEFAULT_SEARCH_ENDPOINT, "météo", language_qualifier("fr")).unwrap();
        assert!(!fr.as_str().contains("&lr="), "{fr}");
    }

    #[test]
    fn query_is_url_encoded() {
        let url = search_url(DEFAULT_SEARCH_ENDPOINT, "a&b c", None).unwrap();
        let q: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(q, vec![("q".to_string(), "a&b c".to_string())]);
    }

    #[test]
    fn drops_incomplete_hits() {
        let raw = json!([
            { "title": "A", "snippet": "a", "link": "https://a.example/" },
            { "title": "", "snippet": "b", "link": "https://b.example/" },
            { "title": "C", "snippet": "  ", "link": "https://c.example/" },
            { "title": "D", "snippet": "d" },
            { "title": " E ", "snippet": "e", "link": "https://e.example/" }
        ]);
        let items = parse_result_items(raw).unwrap();
        assert_eq!(
            items,
            vec![
                ResultItem::new("A", "a", "https://a.example/"),
                ResultItem::new("E", "e", "https://e.example/"),
            ]
        );
    }

    #[test]
    fn rejects_non_array_output() {
        assert!(parse_result_items(Value::Null).is_err());
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let mut set = DedupSet::default();
        assert!(set.insert(ResultItem::new("a", "1", "l")));
        assert!(set.insert(ResultItem::new("b", "2", "l")));
        assert!(!set.insert(ResultItem::new("a", "1", "l")));
        // Same title, different snippet: distinct tuple.
        assert!(set.insert(ResultItem::new("a", "other", "l")));
        let items = set.into_first(2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "a");
        assert_eq!(items[1].title, "b");
    }
}
