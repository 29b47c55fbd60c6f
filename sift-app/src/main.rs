use anyhow::{Context, Result};
use clap::Parser;
use sift_common::observability::{LogConfig, LogFormat, init_logging};
use sift_config::{LlmProvider, SiftConfig, SiftConfigLoader};
use sift_drivers::browser::driver::{DriverConfig, WebDriverResource};
use sift_drivers::browser::stealth::StealthProfile;
use sift_llm::{LlmConfig, ensure_llm_ready, structurer::LlmQueryStructurer};
use sift_web::{FetchSettings, Pipeline, SearchSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod server;

#[derive(Debug, Parser)]
#[command(name = "sift", version, about = "Answer questions from freshly searched web pages")]
struct Args {
    /// YAML configuration file. Missing files fall back to defaults.
    #[arg(long, env = "SIFT_CONFIG", default_value = "sift.yaml")]
    config: PathBuf,

    /// Override `server.bind`.
    #[arg(long)]
    bind: Option<String>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1) Load config (env wins)
    let mut cfg: SiftConfig = SiftConfigLoader::new()
        .with_optional_file(&args.config)
        .load()
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }

    if args.print_config {
        print!("{}", cfg.to_yaml()?);
        return Ok(());
    }

    // 2) Logging from the `logging` section
    let log_path = init_logging(log_config(&cfg)?)?;
    info!(target: "sift.http", log = %log_path.display(), "logging initialised");

    // 3) Wire the pipeline and the structurer
    let pipeline = Arc::new(build_pipeline(&cfg)?);
    let llm = ensure_llm_ready(&llm_config(&cfg)).context("LLM client is not usable")?;
    let structurer = Arc::new(LlmQueryStructurer::new(llm));

    // A failed launch is retried on the first request.
    if let Err(e) = pipeline.initialize().await {
        warn!(target: "sift.browser", error = %e, "browser not ready at startup");
    }

    let app = server::create_app(server::AppState {
        pipeline: pipeline.clone(),
        structurer,
    });

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    info!(target: "sift.http", bind = %cfg.server.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(target: "sift.http", "shutting down");
    pipeline.shutdown().await?;
    Ok(())
}

fn log_config(cfg: &SiftConfig) -> Result<LogConfig> {
    let format: LogFormat = cfg.logging.format.parse().map_err(anyhow::Error::msg)?;
    Ok(LogConfig {
        app_name: "sift",
        log_dir: cfg.logging.dir.as_ref().map(PathBuf::from),
        emit_stderr: cfg.logging.emit_stderr,
        format,
        default_filter: cfg.logging.filter.clone(),
    })
}

fn build_pipeline(cfg: &SiftConfig) -> Result<Pipeline> {
    let stealth_profile: StealthProfile = cfg.browser.stealth.parse().map_err(anyhow::Error::msg)?;
    let resource = WebDriverResource::new(DriverConfig {
        webdriver_url: cfg.browser.webdriver_url.clone(),
        headless: cfg.browser.headless,
        stealth_profile,
        user_agent: cfg.browser.user_agent.clone(),
        page_load_timeout: Duration::from_millis(cfg.fetch.navigation_timeout_ms),
        ..DriverConfig::default()
    });

    let search = SearchSettings {
        endpoint: cfg.search.endpoint.clone(),
        navigation_timeout: Duration::from_millis(cfg.search.navigation_timeout_ms),
        settle_timeout: Duration::from_millis(cfg.search.settle_timeout_ms),
        delay: Duration::from_millis(cfg.search.delay_ms),
    };
    let fetch = FetchSettings {
        navigation_timeout: Duration::from_millis(cfg.fetch.navigation_timeout_ms),
        settle_timeout: Duration::from_millis(cfg.fetch.settle_timeout_ms),
        delay: Duration::from_millis(cfg.fetch.delay_ms),
    };
    Ok(Pipeline::new(Arc::new(resource), search, fetch))
}

fn llm_config(cfg: &SiftConfig) -> LlmConfig {
    match cfg.llm.provider {
        LlmProvider::Gemini => LlmConfig::Gemini {
            api_key: cfg.llm.api_key.clone(),
            model: cfg.llm.model.clone(),
            temperature: cfg.llm.temperature,
            max_tokens: cfg.llm.max_tokens,
        },
        LlmProvider::None => LlmConfig::None,
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(target: "sift.http", error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
