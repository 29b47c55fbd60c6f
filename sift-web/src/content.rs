//! Fetches every search hit and keeps the ones whose text could be extracted.

use crate::extract::extract_main_content;
use anyhow::Result;
use sift_common::{ContentItem, ContentResult, ResultItem, SearchResult, Skipped, Stage};
use sift_drivers::browser::guard::PageGuard;
use sift_drivers::browser::{BrowserContext, BrowserPage};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub navigation_timeout: Duration,
    pub settle_timeout: Duration,
    /// Pause between consecutive items of a run.
    pub delay: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            settle_timeout: Duration::from_secs(10),
            delay: Duration::from_secs(1),
        }
    }
}

/// Output of [`ContentFetcher::run`].
#[derive(Debug, Clone, Default)]
pub struct FetchRun {
    /// One entry per input theme, in input order.
    pub results: Vec<ContentResult>,
    pub skipped: Vec<Skipped>,
}

pub struct ContentFetcher {
    settings: FetchSettings,
}

impl ContentFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Fetch every item of every theme, one page at a time. Items that fail
    /// are left out of the output; there are no retries.
    pub async fn run(
        &self,
        context: &dyn BrowserContext,
        search_results: &[SearchResult],
    ) -> FetchRun {
        let mut run = FetchRun::default();
        let mut processed = 0usize;

        for search_result in search_results {
            let mut items = Vec::with_capacity(search_result.results.len());

            for item in &search_result.results {
                if processed > 0 && !self.settings.delay.is_zero() {
                    sleep(self.settings.delay).await;
                }
                processed += 1;

                match self.fetch_item(context, &search_result.theme, item).await {
                    Ok(content) => items.push(ContentItem::new(item.clone(), content)),
                    Err(skip) => {
                        warn!(
                            target: "sift.content",
                            theme = %search_result.theme,
                            link = %item.link,
                            reason = %skip.reason,
                            "item skipped"
                        );
                        run.skipped.push(skip);
                    }
                }
            }

            info!(
                target: "sift.content",
                theme = %search_result.theme,
                extracted = items.len(),
                requested = search_result.results.len(),
                "theme fetched"
            );
            run.results.push(ContentResult {
                theme: search_result.theme.clone(),
                results: items,
            });
        }
        run
    }

    async fn fetch_item(
        &self,
        context: &dyn BrowserContext,
        theme: &str,
        item: &ResultItem,
    ) -> std::result::Result<String, Skipped> {
        let skip = |e: anyhow::Error| Skipped::new(Stage::Fetch, theme, &item.link, format!("{e:#}"));

        let mut page = PageGuard::new(context.new_page().await.map_err(skip)?);
        let outcome = match page.page_mut() {
            Ok(page) => self.load_and_extract(page, &item.link).await,
            Err(e) => Err(e),
        };
        if let Err(e) = page.close().await {
            warn!(target: "sift.content", link = %item.link, error = %e, "failed to close page");
        }
        outcome.map_err(skip)
    }

    async fn load_and_extract(&self, page: &mut dyn BrowserPage, link: &str) -> Result<String> {
        page.goto(link, self.settings.navigation_timeout).await?;
        page.wait_until_settled(self.settings.settle_timeout).await;
        let extraction = extract_main_content(page).await?;
        debug!(
            target: "sift.content",
            %link,
            source = ?extraction.source,
            chars = extraction.text.chars().count(),
            "content extracted"
        );
        Ok(extraction.text)
    }
}
