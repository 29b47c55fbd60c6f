//! Browsing capability consumed by the search pipeline.
//!
//! The scopes nest: a [`BrowserResource`] hands out sessions, a session opens
//! contexts, a context opens pages, and a page holds one document at a time.
//! Callers close what they open. Owners that may be dropped mid-operation
//! hold their scope in a [`guard`] so it is still closed.

pub mod driver;
pub mod guard;
pub mod page;
pub mod stealth;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Something that can start a browsing session (a browser process, a remote
/// WebDriver endpoint, a test double).
#[async_trait]
pub trait BrowserResource: Send + Sync {
    async fn acquire_session(&self) -> Result<Box<dyn BrowserSession>>;
}

/// A live browser session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open an isolated browsing context.
    async fn new_context(&self) -> Result<Box<dyn BrowserContext>>;

    /// End the session. Further calls on it are errors.
    async fn close(&mut self) -> Result<()>;
}

/// An isolated scope (cookies, storage) inside a session.
#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>>;

    async fn close(&mut self) -> Result<()>;
}

/// A single tab.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate to `url`, failing if the load does not finish within `timeout`.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Best-effort wait for the document to finish loading. Never fails.
    async fn wait_until_settled(&mut self, timeout: Duration);

    /// Run `script` against the loaded document and return its result.
    ///
    /// Scripts are function bodies: the value of their `return` is the result.
    async fn evaluate(&mut self, script: &str) -> Result<Value>;

    async fn close(&mut self) -> Result<()>;
}
