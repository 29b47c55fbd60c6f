//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, then `SIFT__`-prefixed
//! environment variables win (`SIFT__LLM__API_KEY` sets `llm.api_key`).
//! String values may reference other variables as `${VAR}`; references are
//! expanded recursively up to a fixed depth. Every section has defaults, so
//! an empty document is a valid configuration.
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SiftConfig {
    pub version: Option<String>,
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub search: SearchTuning,
    pub fetch: FetchTuning,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

impl SiftConfig {
    /// Render the effective configuration, e.g. for `--print-config`.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    /// `lightweight`, `balanced` or `maximum`.
    pub stealth: String,
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: false,
            stealth: "balanced".into(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchTuning {
    pub endpoint: String,
    pub navigation_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub delay_ms: u64,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            endpoint: "https://www.google.com/search".into(),
            navigation_timeout_ms: 30_000,
            settle_timeout_ms: 10_000,
            delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchTuning {
    pub navigation_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub delay_ms: u64,
}

impl Default for FetchTuning {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            settle_timeout_ms: 10_000,
            delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    None,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_key: String::new(),
            model: "gemini-2.0-flash".into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `text` or `json`.
    pub format: String,
    pub dir: Option<String>,
    pub emit_stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".into(),
            dir: None,
            emit_stderr: true,
            filter: "info,sift=debug".into(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct SiftConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SiftConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SiftConfigLoader {
    /// Start with no files; `SIFT__` environment overrides are always applied last.
    ///
    /// ```
    /// use sift_config::SiftConfigLoader;
    ///
    /// let config = SiftConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.search.delay_ms, 1_000);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when absent, so deployments can rely on
    /// environment variables alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use sift_config::SiftConfigLoader;
    ///
    /// let cfg = SiftConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// browser:
    ///   headless: true
    ///   stealth: maximum
    /// fetch:
    ///   delay_ms: 250
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(cfg.browser.headless);
    /// assert_eq!(cfg.browser.stealth, "maximum");
    /// assert_eq!(cfg.fetch.delay_ms, 250);
    /// assert_eq!(cfg.fetch.navigation_timeout_ms, 30_000);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use sift_config::SiftConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_GEMINI_KEY", "injected-from-env"); }
    ///
    /// let config = SiftConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   provider: gemini
    ///   api_key: "${DOC_GEMINI_KEY}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.llm.api_key, "injected-from-env");
    /// assert_eq!(config.llm.model, "gemini-2.0-flash");
    ///
    /// unsafe { std::env::remove_var("DOC_GEMINI_KEY"); }
    /// ```
    pub fn load(self) -> Result<SiftConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("SIFT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
