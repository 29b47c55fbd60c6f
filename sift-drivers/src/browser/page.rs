use crate::browser::{
    stealth::{StealthProfile, StealthScripts},
    BrowserPage,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fantoccini::{
    wd::{TimeoutConfiguration, WindowHandle},
    Client,
};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace};

const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const READY_STATE_SCRIPT: &str = "return document.readyState;";
/// Chromedriver's own script timeout default, restated because the timeouts
/// command sets all three values at once.
pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);
/// Slack given to the browser to report its own page-load timeout before
/// the local timer gives up.
const NAVIGATION_GRACE: Duration = Duration::from_secs(2);

/// How long the local timer waits for a navigation whose browser-side
/// page-load timeout is `limit`.
pub fn navigation_backstop(limit: Duration) -> Duration {
    limit.saturating_add(NAVIGATION_GRACE)
}

/// A browser tab driven over WebDriver.
///
/// The session has one active window, so every call first focuses this
/// page's tab.
pub struct WebDriverPage {
    client: Client,
    handle: WindowHandle,
    home: WindowHandle,
    stealth_profile: StealthProfile,
    closed: bool,
}

impl WebDriverPage {
    pub fn new(
        client: Client,
        handle: WindowHandle,
        home: WindowHandle,
        stealth_profile: StealthProfile,
    ) -> Self {
        Self {
            client,
            handle,
            home,
            stealth_profile,
            closed: false,
        }
    }

    async fn focus(&self) -> Result<()> {
        if self.closed {
            return Err(anyhow!("page already closed"));
        }
        self.client
            .switch_to_window(self.handle.clone())
            .await
            .context("failed to focus page")
    }

    /// Apply stealth evasions for the configured profile.
    async fn apply_stealth(&self) -> Result<()> {
        for script in StealthScripts::for_profile(&self.stealth_profile) {
            self.client.execute(script, vec![]).await?;
        }
        Ok(())
    }

    async fn ready_state(&self) -> Option<String> {
        self.client
            .execute(READY_STATE_SCRIPT, vec![])
            .await
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
    }
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn goto(&mut self, url: &str, limit: Duration) -> Result<()> {
        self.focus().await?;
        // The browser aborts the load itself, so the session is not left
        // blocked on a navigation nobody waits for.
        self.client
            .update_timeouts(TimeoutConfiguration::new(
                Some(SCRIPT_TIMEOUT),
                Some(limit),
                Some(Duration::ZERO),
            ))
            .await
            .context("failed to set page load timeout")?;
        timeout(navigation_backstop(limit), self.client.goto(url))
            .await
            .map_err(|_| anyhow!("navigation to {url} timed out after {limit:?}"))?
            .with_context(|| format!("navigation to {url} failed"))?;

        // Evasions are best effort; a page that rejects them is still usable.
        if let Err(e) = self.apply_stealth().await {
            debug!(target: "sift.browser", %url, error = %e, "stealth scripts not applied");
        }
        Ok(())
    }

    async fn wait_until_settled(&mut self, limit: Duration) {
        let started = Instant::now();
        let settled = timeout(limit, async {
            loop {
                if self.ready_state().await.as_deref() == Some("complete") {
                    break;
                }
                sleep(SETTLE_POLL_INTERVAL).await;
            }
        })
        .await
        .is_ok();

        trace!(
            target: "sift.browser",
            settled,
            waited_ms = started.elapsed().as_millis() as u64,
            "settle wait finished"
        );
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        self.focus().await?;
        self.client
            .execute(script, vec![])
            .await
            .context("script evaluation failed")
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.focus().await?;
        self.closed = true;
        self.client.close_window().await.context("failed to close tab")?;
        self.client
            .switch_to_window(self.home.clone())
            .await
            .context("failed to return to home window")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backstop_outlasts_browser_timeout() {
        let limit = Duration::from_secs(30);
        assert!(navigation_backstop(limit) > limit);
        assert_eq!(navigation_backstop(Duration::MAX), Duration::MAX);
    }
}
