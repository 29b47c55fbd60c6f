use sift_common::{ResultItem, SearchResult, Stage};
use sift_web::testing::{FakeDocument, Route, ScriptedBrowser};
use sift_web::{ContentFetcher, FetchSettings};
use std::time::Duration;

fn fetcher() -> ContentFetcher {
    ContentFetcher::new(FetchSettings {
        delay: Duration::ZERO,
        ..FetchSettings::default()
    })
}

fn link(n: usize) -> String {
    format!("https://site{n}.example/page")
}

fn item(n: usize) -> ResultItem {
    ResultItem::new(format!("Result {n}"), format!("Snippet {n}"), link(n))
}

fn single(theme: &str, items: Vec<ResultItem>) -> Vec<SearchResult> {
    vec![SearchResult {
        theme: theme.to_string(),
        results: items,
    }]
}

#[tokio::test]
async fn uses_first_matching_selector() {
    let browser = ScriptedBrowser::new().route(
        link(1),
        Route::Document(
            FakeDocument::with_body("everything including the nav")
                .with_match("[role=\"main\"]", "  The   main\n\n text ")
                .with_match(".post-content", "later selector"),
        ),
    );
    let context = browser.context();

    let run = fetcher().run(context.as_ref(), &single("t", vec![item(1)])).await;

    assert_eq!(run.results[0].results.len(), 1);
    assert_eq!(run.results[0].results[0].content, "The main text");
    assert_eq!(run.results[0].results[0].item, item(1));
}

#[tokio::test]
async fn empty_match_still_wins_over_later_selectors() {
    let browser = ScriptedBrowser::new().route(
        link(1),
        Route::Document(
            FakeDocument::with_body("body")
                .with_match("article", "   ")
                .with_match("main", "main"),
        ),
    );
    let context = browser.context();

    let run = fetcher().run(context.as_ref(), &single("t", vec![item(1)])).await;

    assert_eq!(run.results[0].results[0].content, "");
}

#[tokio::test]
async fn falls_back_to_body_text() {
    let browser = ScriptedBrowser::new().route(
        link(1),
        Route::Document(FakeDocument::with_body("a   b\n\n\nc")),
    );
    let context = browser.context();

    let run = fetcher().run(context.as_ref(), &single("t", vec![item(1)])).await;

    assert_eq!(run.results[0].results[0].content, "a b c");
}

#[tokio::test]
async fn failing_item_is_left_out() {
    let browser = ScriptedBrowser::new()
        .route(link(2), Route::NavigationError("navigation timed out".into()))
        .fallback(|url| Some(Route::Document(FakeDocument::with_body(format!("text of {url}")))));
    let context = browser.context();

    let items: Vec<ResultItem> = (1..=5).map(item).collect();
    let run = fetcher().run(context.as_ref(), &single("t", items)).await;

    let kept: Vec<&str> = run.results[0]
        .results
        .iter()
        .map(|c| c.item.link.as_str())
        .collect();
    assert_eq!(kept, vec![link(1), link(3), link(4), link(5)]);
    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].stage, Stage::Fetch);
    assert_eq!(run.skipped[0].theme, "t");
    assert_eq!(run.skipped[0].target, link(2));
    assert!(run.skipped[0].reason.contains("timed out"));

    // The failed page is closed like the others.
    let stats = browser.stats();
    assert_eq!(stats.pages_opened, 5);
    assert_eq!(stats.pages_closed, 5);
    assert_eq!(stats.max_open_pages, 1);
}

#[tokio::test]
async fn script_failure_is_contained() {
    let browser = ScriptedBrowser::new()
        .route(link(1), Route::EvaluateError("execution context destroyed".into()))
        .route(link(2), Route::Document(FakeDocument::with_body("ok")));
    let context = browser.context();

    let run = fetcher()
        .run(context.as_ref(), &single("t", vec![item(1), item(2)]))
        .await;

    assert_eq!(run.results[0].results.len(), 1);
    assert_eq!(run.results[0].results[0].content, "ok");
    assert_eq!(run.skipped.len(), 1);
}

#[tokio::test]
async fn keeps_theme_order_and_empty_themes() {
    let browser = ScriptedBrowser::new()
        .fallback(|_| Some(Route::Document(FakeDocument::with_body("x"))));
    let context = browser.context();

    let input = vec![
        SearchResult {
            theme: "first".into(),
            results: vec![item(1)],
        },
        SearchResult {
            theme: "empty".into(),
            results: Vec::new(),
        },
        SearchResult {
            theme: "last".into(),
            results: vec![item(2), item(3)],
        },
    ];
    let run = fetcher().run(context.as_ref(), &input).await;

    let themes: Vec<&str> = run.results.iter().map(|r| r.theme.as_str()).collect();
    assert_eq!(themes, vec!["first", "empty", "last"]);
    assert!(run.results[1].results.is_empty());
    assert_eq!(run.results[2].results.len(), 2);
    assert_eq!(browser.stats().visits, vec![link(1), link(2), link(3)]);
}

#[tokio::test(start_paused = true)]
async fn delay_falls_between_items_across_themes() {
    let browser = ScriptedBrowser::new()
        .fallback(|_| Some(Route::Document(FakeDocument::with_body("x"))));
    let context = browser.context();
    let paced = ContentFetcher::new(FetchSettings {
        delay: Duration::from_secs(1),
        ..FetchSettings::default()
    });

    let input = vec![
        SearchResult {
            theme: "a".into(),
            results: vec![item(1), item(2)],
        },
        SearchResult {
            theme: "b".into(),
            results: vec![item(3)],
        },
    ];
    let started = tokio::time::Instant::now();
    paced.run(context.as_ref(), &input).await;
    let elapsed = started.elapsed();

    // Three items, two pauses: none before the first or after the last.
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");

    let started = tokio::time::Instant::now();
    paced.run(context.as_ref(), &single("t", vec![item(4)])).await;
    assert_eq!(started.elapsed(), Duration::ZERO);
}
