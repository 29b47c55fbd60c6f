//! Search then fetch, inside one browsing context.
//!
//! The pipeline owns the browsing session: [`Pipeline::initialize`] acquires
//! it, [`Pipeline::reset`] drops it so the next initialize starts fresh. Each
//! [`Pipeline::run`] opens exactly one context and closes it before
//! returning, or in the background if the run is dropped part way. Runs are
//! serialized; concurrent callers wait their turn.

use crate::content::{ContentFetcher, FetchSettings};
use crate::search::{SearchOrchestrator, SearchSettings};
use sift_common::{ContentResult, Result, SearchConfig, SiftError, Skipped, Theme};
use sift_drivers::browser::guard::ContextGuard;
use sift_drivers::browser::{BrowserContext, BrowserResource, BrowserSession};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Output of a full run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// One entry per theme, in input order. Failed items are absent.
    pub results: Vec<ContentResult>,
    /// Search attempts and fetches that failed, in the order they happened.
    pub skipped: Vec<Skipped>,
}

pub struct Pipeline {
    resource: Arc<dyn BrowserResource>,
    session: Mutex<Option<Box<dyn BrowserSession>>>,
    orchestrator: SearchOrchestrator,
    fetcher: ContentFetcher,
}

impl Pipeline {
    pub fn new(
        resource: Arc<dyn BrowserResource>,
        search: SearchSettings,
        fetch: FetchSettings,
    ) -> Self {
        Self {
            resource,
            session: Mutex::new(None),
            orchestrator: SearchOrchestrator::new(search),
            fetcher: ContentFetcher::new(fetch),
        }
    }

    /// Acquire the browsing session unless one is already held.
    pub async fn initialize(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        if slot.is_none() {
            *slot = Some(self.resource.acquire_session().await?);
            info!(target: "sift.pipeline", "browser session ready");
        }
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Search `themes`, then fetch and extract every hit.
    ///
    /// Fails only when no session is held or the run's context cannot be
    /// opened; per-query and per-item failures are reported in
    /// [`PipelineReport::skipped`].
    pub async fn run(&self, themes: &[Theme], config: &SearchConfig) -> Result<PipelineReport> {
        let slot = self.session.lock().await;
        let session = slot.as_deref().ok_or(SiftError::ResourceUninitialized)?;

        let span = info_span!("pipeline.run", run_id = %Uuid::new_v4(), themes = themes.len());
        async move {
            // Dropping the guard closes the context if this future is cancelled.
            let context = ContextGuard::new(session.new_context().await?);
            let report = self.run_in_context(context.context()?, themes, config).await;
            if let Err(e) = context.close().await {
                warn!(target: "sift.pipeline", error = %e, "failed to close browser context");
            }

            info!(
                target: "sift.pipeline",
                themes = report.results.len(),
                items = report.results.iter().map(|r| r.results.len()).sum::<usize>(),
                skipped = report.skipped.len(),
                "run finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn run_in_context(
        &self,
        context: &dyn BrowserContext,
        themes: &[Theme],
        config: &SearchConfig,
    ) -> PipelineReport {
        let searched = self.orchestrator.run(context, themes, config).await;
        let fetched = self.fetcher.run(context, &searched.results).await;

        let mut skipped = searched.skipped;
        skipped.extend(fetched.skipped);
        PipelineReport {
            results: fetched.results,
            skipped,
        }
    }

    /// Drop the session so the next [`Pipeline::initialize`] acquires a new one.
    /// Close errors are logged, not returned.
    pub async fn reset(&self) {
        if let Some(mut session) = self.session.lock().await.take() {
            if let Err(e) = session.close().await {
                warn!(target: "sift.pipeline", error = %e, "failed to close browser session");
            }
            info!(target: "sift.pipeline", "browser session reset");
        }
    }

    /// Close the session for good.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(mut session) = self.session.lock().await.take() {
            session.close().await?;
        }
        Ok(())
    }
}
