//! Owners that close a browsing scope even when the code using it is cut
//! short.
//!
//! Closing is async, so a guard dropped without [`PageGuard::close`] or
//! [`ContextGuard::close`] hands the close to the current tokio runtime.
//! This covers cancelled request futures and unwinding panics.

use crate::browser::{BrowserContext, BrowserPage};
use anyhow::{Result, anyhow};
use std::future::Future;
use tokio::runtime::Handle;
use tracing::{debug, warn};

fn close_detached<F>(scope: &'static str, close: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            debug!(target: "sift.browser", scope, "closing abandoned browser scope");
            handle.spawn(async move {
                if let Err(e) = close.await {
                    warn!(target: "sift.browser", scope, error = %e, "deferred close failed");
                }
            });
        }
        Err(_) => {
            warn!(target: "sift.browser", scope, "no runtime left to close abandoned browser scope");
        }
    }
}

/// A page that is closed when dropped.
pub struct PageGuard {
    inner: Option<Box<dyn BrowserPage>>,
}

impl PageGuard {
    pub fn new(page: Box<dyn BrowserPage>) -> Self {
        Self { inner: Some(page) }
    }

    pub fn page_mut(&mut self) -> Result<&mut (dyn BrowserPage + 'static)> {
        match self.inner.as_mut() {
            Some(page) => Ok(page.as_mut()),
            None => Err(anyhow!("page already closed")),
        }
    }

    /// Close now and report the outcome.
    pub async fn close(mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut page) => page.close().await,
            None => Ok(()),
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(mut page) = self.inner.take() {
            close_detached("page", async move { page.close().await });
        }
    }
}

/// A browsing context that is closed when dropped.
pub struct ContextGuard {
    inner: Option<Box<dyn BrowserContext>>,
}

impl ContextGuard {
    pub fn new(context: Box<dyn BrowserContext>) -> Self {
        Self {
            inner: Some(context),
        }
    }

    pub fn context(&self) -> Result<&(dyn BrowserContext + 'static)> {
        match self.inner.as_ref() {
            Some(context) => Ok(context.as_ref()),
            None => Err(anyhow!("browser context already closed")),
        }
    }

    /// Close now and report the outcome.
    pub async fn close(mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut context) => context.close().await,
            None => Ok(()),
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(mut context) = self.inner.take() {
            close_detached("context", async move { context.close().await });
        }
    }
}
