use crate::browser::{
    page::{WebDriverPage, SCRIPT_TIMEOUT},
    stealth::{build_stealth_arguments, StealthProfile},
    BrowserContext, BrowserPage, BrowserResource, BrowserSession,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fantoccini::{wd::WindowHandle, Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use webdriver::capabilities::Capabilities;

/// Default Chromedriver endpoint.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// How to reach and launch the browser.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub stealth_profile: StealthProfile,
    /// Overrides the browser's own user agent when set.
    pub user_agent: Option<String>,
    pub window_size: (u32, u32),
    /// Initial page-load timeout of new sessions. Each navigation sets its own.
    pub page_load_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            // Headed browsers trip fewer reCAPTCHA challenges.
            headless: false,
            stealth_profile: StealthProfile::Balanced,
            user_agent: None,
            window_size: (1920, 1080),
            page_load_timeout: Duration::from_secs(30),
        }
    }
}

/// [`BrowserResource`] backed by a running WebDriver service (Chromedriver).
pub struct WebDriverResource {
    config: DriverConfig,
}

impl WebDriverResource {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();

        let mut args = build_stealth_arguments(
            &self.config.stealth_profile,
            self.config.user_agent.as_deref(),
            self.config.window_size,
        );
        if self.config.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
        }
        chrome_opts.insert("args".to_string(), json!(args));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
        caps.insert(
            "timeouts".to_string(),
            json!({
                "pageLoad": self.config.page_load_timeout.as_millis() as u64,
                "script": SCRIPT_TIMEOUT.as_millis() as u64,
                "implicit": 0,
            }),
        );
        caps
    }
}

#[async_trait]
impl BrowserResource for WebDriverResource {
    async fn acquire_session(&self) -> Result<Box<dyn BrowserSession>> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.config.webdriver_url)
            .await
            .with_context(|| format!("failed to connect to WebDriver at {}", self.config.webdriver_url))?;

        info!(
            target: "sift.browser",
            endpoint = %self.config.webdriver_url,
            headless = self.config.headless,
            "browser session acquired"
        );

        Ok(Box::new(WebDriverSession {
            client: Some(client),
            stealth_profile: self.config.stealth_profile.clone(),
        }))
    }
}

/// One WebDriver session. The client is taken on close.
pub struct WebDriverSession {
    client: Option<Client>,
    stealth_profile: StealthProfile,
}

impl WebDriverSession {
    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow!("browser session already closed"))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn new_context(&self) -> Result<Box<dyn BrowserContext>> {
        let client = self.client()?.clone();
        let home = client
            .window()
            .await
            .context("failed to read the session's home window")?;

        debug!(target: "sift.browser", "browser context opened");
        Ok(Box::new(WebDriverContext {
            client,
            home,
            stealth_profile: self.stealth_profile.clone(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.close().await?;
            info!(target: "sift.browser", "browser session closed");
        }
        Ok(())
    }
}

/// WebDriver has a single cookie jar per session, so a context is the
/// session's home window plus a cookie scope that is cleared on close.
/// Pages are tabs opened from, and returned to, the home window.
pub struct WebDriverContext {
    client: Client,
    home: WindowHandle,
    stealth_profile: StealthProfile,
}

#[async_trait]
impl BrowserContext for WebDriverContext {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let window = self
            .client
            .new_window(true)
            .await
            .context("failed to open a new tab")?;
        self.client.switch_to_window(window.handle.clone()).await?;

        Ok(Box::new(WebDriverPage::new(
            self.client.clone(),
            window.handle,
            self.home.clone(),
            self.stealth_profile.clone(),
        )))
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.client.switch_to_window(self.home.clone()).await {
            warn!(target: "sift.browser", error = %e, "failed to return to home window");
        }
        self.client
            .delete_all_cookies()
            .await
            .context("failed to clear context cookies")?;
        debug!(target: "sift.browser", "browser context closed");
        Ok(())
    }
}
