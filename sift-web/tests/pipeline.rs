use sift_common::{ResultItem, SearchConfig, SiftError, Theme};
use sift_web::testing::{FakeDocument, Route, ScriptedBrowser, hits};
use sift_web::{FetchSettings, Pipeline, SearchSettings};
use std::sync::Arc;
use std::time::Duration;

fn pipeline(browser: &ScriptedBrowser) -> Pipeline {
    Pipeline::new(
        Arc::new(browser.clone()),
        SearchSettings {
            delay: Duration::ZERO,
            ..SearchSettings::default()
        },
        FetchSettings {
            delay: Duration::ZERO,
            ..FetchSettings::default()
        },
    )
}

fn config() -> SearchConfig {
    SearchConfig {
        language_code: "en".into(),
        instruction: "Summarize briefly".into(),
    }
}

fn themes() -> Vec<Theme> {
    vec![Theme::new("rust async", vec!["tokio".into()])]
}

fn browser() -> ScriptedBrowser {
    ScriptedBrowser::new()
        .route_query(
            "rust async",
            Route::Hits(hits(&[
                ResultItem::new("Async book", "Async in Rust", "https://book.example/"),
                ResultItem::new("Broken", "Gone", "https://broken.example/"),
            ])),
        )
        .route_query(
            "tokio",
            Route::Hits(hits(&[ResultItem::new("Tokio", "Runtime", "https://tokio.example/")])),
        )
        .route(
            "https://book.example/",
            Route::Document(FakeDocument::with_body("x").with_match("article", "Futures\n are lazy")),
        )
        .route("https://broken.example/", Route::NavigationError("404".into()))
        .route(
            "https://tokio.example/",
            Route::Document(FakeDocument::with_body("Tokio  runtime")),
        )
}

#[tokio::test]
async fn run_before_initialize_fails() {
    let browser = browser();
    let pipeline = pipeline(&browser);

    let err = pipeline.run(&themes(), &config()).await.unwrap_err();
    assert!(matches!(err, SiftError::ResourceUninitialized), "{err}");
    assert_eq!(browser.stats().contexts_opened, 0);
}

#[tokio::test]
async fn runs_search_then_fetch_in_one_context() {
    let browser = browser();
    let pipeline = pipeline(&browser);
    pipeline.initialize().await.unwrap();

    let report = pipeline.run(&themes(), &config()).await.unwrap();

    assert_eq!(report.results.len(), 1);
    let theme = &report.results[0];
    assert_eq!(theme.theme, "rust async");
    let contents: Vec<&str> = theme.results.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["Futures are lazy", "Tokio runtime"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].target, "https://broken.example/");

    let stats = browser.stats();
    assert_eq!(stats.sessions_acquired, 1);
    assert_eq!(stats.contexts_opened, 1);
    assert_eq!(stats.contexts_closed, 1);
    assert_eq!(stats.pages_opened, stats.pages_closed);
    assert_eq!(stats.max_open_pages, 1);
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let browser = browser();
    let pipeline = pipeline(&browser);
    pipeline.initialize().await.unwrap();
    pipeline.initialize().await.unwrap();

    assert!(pipeline.is_initialized().await);
    assert_eq!(browser.stats().sessions_acquired, 1);
}

#[tokio::test]
async fn reset_forces_a_fresh_session() {
    let browser = browser();
    let pipeline = pipeline(&browser);
    pipeline.initialize().await.unwrap();

    pipeline.reset().await;
    assert!(!pipeline.is_initialized().await);
    assert!(matches!(
        pipeline.run(&themes(), &config()).await,
        Err(SiftError::ResourceUninitialized)
    ));

    pipeline.initialize().await.unwrap();
    pipeline.run(&themes(), &config()).await.unwrap();

    let stats = browser.stats();
    assert_eq!(stats.sessions_acquired, 2);
    assert_eq!(stats.sessions_closed, 1);
}

#[tokio::test]
async fn acquisition_failure_surfaces_as_driver_error() {
    let browser = ScriptedBrowser::new().failing_acquire("chromedriver not reachable");
    let pipeline = pipeline(&browser);

    let err = pipeline.initialize().await.unwrap_err();
    assert!(matches!(err, SiftError::Driver(_)));
    assert!(err.to_string().contains("chromedriver not reachable"));
    assert!(!pipeline.is_initialized().await);
}

#[tokio::test]
async fn context_failure_fails_the_run() {
    let browser = browser().failing_context("browser crashed");
    let pipeline = pipeline(&browser);
    pipeline.initialize().await.unwrap();

    let err = pipeline.run(&themes(), &config()).await.unwrap_err();
    assert!(matches!(err, SiftError::Driver(_)));
    assert_eq!(browser.stats().visits.len(), 0);
}

#[tokio::test]
async fn shutdown_closes_the_session() {
    let browser = browser();
    let pipeline = pipeline(&browser);
    pipeline.initialize().await.unwrap();

    pipeline.shutdown().await.unwrap();
    pipeline.shutdown().await.unwrap();

    assert_eq!(browser.stats().sessions_closed, 1);
    assert!(!pipeline.is_initialized().await);
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_still_releases_context_and_page() {
    let browser = browser().route_query("stuck", Route::Stall);
    let pipeline = pipeline(&browser);
    pipeline.initialize().await.unwrap();

    let themes = vec![Theme::new("stuck", Vec::new())];
    let outcome = tokio::time::timeout(Duration::from_millis(50), pipeline.run(&themes, &config())).await;
    assert!(outcome.is_err(), "run should have been cut short");

    // Let the detached closes run.
    tokio::time::sleep(Duration::from_millis(1)).await;

    let stats = browser.stats();
    assert_eq!(stats.contexts_opened, 1);
    assert_eq!(stats.contexts_closed, stats.contexts_opened);
    assert_eq!(stats.pages_opened, 1);
    assert_eq!(stats.pages_closed, stats.pages_opened);

    // The session is free again for the next run.
    pipeline.run(&[], &config()).await.unwrap();
}
