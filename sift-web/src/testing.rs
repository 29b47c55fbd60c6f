//! In-memory browser for driving the pipeline without a real browser.
//!
//! [`ScriptedBrowser`] answers navigations from a routing table and
//! recognizes the scripts this crate evaluates: the result extraction script
//! on search pages, and the selector probes plus the fallback script on
//! content pages. Everything it opens and closes is counted in
//! [`BrowserStats`].
//!
//! ```rust
//! use sift_common::ResultItem;
//! use sift_web::testing::{FakeDocument, Route, ScriptedBrowser, hits};
//!
//! let browser = ScriptedBrowser::new()
//!     .route_query("rust", Route::Hits(hits(&[ResultItem::new("Rust", "lang", "https://rust.example/")])))
//!     .route("https://rust.example/", Route::Document(FakeDocument::with_body("Rust")));
//! assert_eq!(browser.stats().sessions_acquired, 0);
//! ```

use crate::extract::{CONTENT_SELECTORS, fallback_text_script, selector_probe_script};
use crate::search::RESULT_EXTRACTION_SCRIPT;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use sift_common::ResultItem;
use sift_drivers::browser::{BrowserContext, BrowserPage, BrowserResource, BrowserSession};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

/// What a navigation to a routed URL produces.
#[derive(Debug, Clone)]
pub enum Route {
    /// A search result page; the extraction script returns this value.
    Hits(Value),
    /// A content page.
    Document(FakeDocument),
    /// `goto` fails with this message.
    NavigationError(String),
    /// `goto` succeeds but every script fails with this message.
    EvaluateError(String),
    /// `goto` never completes.
    Stall,
}

/// Content page model: what each content selector yields, plus the body
/// text seen by the fallback script.
#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    matches: HashMap<String, String>,
    body_text: String,
}

impl FakeDocument {
    /// A page where no content selector matches.
    pub fn with_body(body_text: impl Into<String>) -> Self {
        Self {
            matches: HashMap::new(),
            body_text: body_text.into(),
        }
    }

    /// Make `selector` match an element whose text is `text`.
    pub fn with_match(mut self, selector: &str, text: impl Into<String>) -> Self {
        self.matches.insert(selector.to_string(), text.into());
        self
    }

    fn evaluate(&self, script: &str) -> Result<Value> {
        if script == fallback_text_script() {
            return Ok(Value::String(self.body_text.clone()));
        }
        let selector = CONTENT_SELECTORS
            .iter()
            .find(|selector| script == selector_probe_script(selector))
            .ok_or_else(|| anyhow!("unrecognized script on content page"))?;
        Ok(self
            .matches
            .get(*selector)
            .map_or(Value::Null, |text| Value::String(text.clone())))
    }
}

/// Build the value the result extraction script would return for `items`.
pub fn hits(items: &[ResultItem]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| json!({ "title": item.title, "snippet": item.snippet, "link": item.link }))
            .collect(),
    )
}

/// Counters over everything the fake has handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserStats {
    pub sessions_acquired: usize,
    pub sessions_closed: usize,
    pub contexts_opened: usize,
    pub contexts_closed: usize,
    pub pages_opened: usize,
    pub pages_closed: usize,
    /// Highest number of pages open at the same time.
    pub max_open_pages: usize,
    /// Every URL passed to `goto`, in order.
    pub visits: Vec<String>,
}

enum Matcher {
    Url(String),
    Query(String),
}

impl Matcher {
    fn matches(&self, url: &str) -> bool {
        match self {
            Matcher::Url(expected) => expected == url,
            Matcher::Query(expected) => Url::parse(url)
                .map(|u| u.query_pairs().any(|(k, v)| k == "q" && v == expected.as_str()))
                .unwrap_or(false),
        }
    }
}

type Fallback = Arc<dyn Fn(&str) -> Option<Route> + Send + Sync>;

#[derive(Default)]
struct Shared {
    routes: Vec<(Matcher, Route)>,
    fallback: Option<Fallback>,
    acquire_error: Option<String>,
    context_error: Option<String>,
    open_pages: usize,
    stats: BrowserStats,
}

impl Shared {
    fn resolve(&self, url: &str) -> Option<Route> {
        self.routes
            .iter()
            .find(|(matcher, _)| matcher.matches(url))
            .map(|(_, route)| route.clone())
            .or_else(|| self.fallback.as_ref().and_then(|f| f(url)))
    }
}

/// Cloneable handle; clones share routes and counters.
#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    shared: Arc<Mutex<Shared>>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer navigations to exactly `url`.
    pub fn route(self, url: impl Into<String>, route: Route) -> Self {
        lock(&self.shared).routes.push((Matcher::Url(url.into()), route));
        self
    }

    /// Answer navigations whose `q` parameter is `query`, whatever the
    /// endpoint and other parameters.
    pub fn route_query(self, query: impl Into<String>, route: Route) -> Self {
        lock(&self.shared).routes.push((Matcher::Query(query.into()), route));
        self
    }

    /// Consulted when no explicit route matches.
    pub fn fallback<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> Option<Route> + Send + Sync + 'static,
    {
        lock(&self.shared).fallback = Some(Arc::new(f));
        self
    }

    /// Make every session acquisition fail.
    pub fn failing_acquire(self, message: impl Into<String>) -> Self {
        lock(&self.shared).acquire_error = Some(message.into());
        self
    }

    /// Make every context creation fail.
    pub fn failing_context(self, message: impl Into<String>) -> Self {
        lock(&self.shared).context_error = Some(message.into());
        self
    }

    pub fn stats(&self) -> BrowserStats {
        lock(&self.shared).stats.clone()
    }

    /// Open a context directly, without a session, for driving the search
    /// and fetch stages on their own.
    pub fn context(&self) -> Box<dyn BrowserContext> {
        lock(&self.shared).stats.contexts_opened += 1;
        Box::new(ScriptedContext {
            shared: self.shared.clone(),
        })
    }
}

#[async_trait]
impl BrowserResource for ScriptedBrowser {
    async fn acquire_session(&self) -> Result<Box<dyn BrowserSession>> {
        let mut shared = lock(&self.shared);
        if let Some(message) = &shared.acquire_error {
            bail!("{message}");
        }
        shared.stats.sessions_acquired += 1;
        Ok(Box::new(ScriptedSession {
            shared: self.shared.clone(),
            closed: false,
        }))
    }
}

struct ScriptedSession {
    shared: Arc<Mutex<Shared>>,
    closed: bool,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn new_context(&self) -> Result<Box<dyn BrowserContext>> {
        if self.closed {
            bail!("session is closed");
        }
        let mut shared = lock(&self.shared);
        if let Some(message) = &shared.context_error {
            bail!("{message}");
        }
        shared.stats.contexts_opened += 1;
        Ok(Box::new(ScriptedContext {
            shared: self.shared.clone(),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            bail!("session already closed");
        }
        self.closed = true;
        lock(&self.shared).stats.sessions_closed += 1;
        Ok(())
    }
}

struct ScriptedContext {
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl BrowserContext for ScriptedContext {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let mut shared = lock(&self.shared);
        shared.open_pages += 1;
        shared.stats.pages_opened += 1;
        shared.stats.max_open_pages = shared.stats.max_open_pages.max(shared.open_pages);
        Ok(Box::new(ScriptedPage {
            shared: self.shared.clone(),
            loaded: None,
            closed: false,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        lock(&self.shared).stats.contexts_closed += 1;
        Ok(())
    }
}

struct ScriptedPage {
    shared: Arc<Mutex<Shared>>,
    loaded: Option<Route>,
    closed: bool,
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        let route = {
            let mut shared = lock(&self.shared);
            shared.stats.visits.push(url.to_string());
            shared.resolve(url)
        };
        self.loaded = None;
        match route {
            None => bail!("no route for {url}"),
            Some(Route::NavigationError(message)) => bail!("{message}"),
            Some(Route::Stall) => std::future::pending().await,
            Some(route) => {
                self.loaded = Some(route);
                Ok(())
            }
        }
    }

    async fn wait_until_settled(&mut self, _timeout: Duration) {}

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        match &self.loaded {
            None => bail!("no document loaded"),
            Some(Route::Hits(value)) if script == RESULT_EXTRACTION_SCRIPT => Ok(value.clone()),
            Some(Route::Hits(_)) => bail!("unrecognized script on search page"),
            Some(Route::Document(document)) => document.evaluate(script),
            Some(Route::EvaluateError(message)) => bail!("{message}"),
            Some(Route::NavigationError(message)) => bail!("{message}"),
            Some(Route::Stall) => bail!("navigation never finished"),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            bail!("page already closed");
        }
        self.closed = true;
        let mut shared = lock(&self.shared);
        shared.open_pages = shared.open_pages.saturating_sub(1);
        shared.stats.pages_closed += 1;
        Ok(())
    }
}
