use serial_test::serial;
use sift_config::{LlmProvider, SiftConfigLoader};
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "0.1"
server:
  bind: "0.0.0.0:9000"
browser:
  headless: true
search:
  delay_ms: 1500
llm:
  provider: gemini
  api_key: "${SIFT_TEST_GEMINI_KEY}"
  temperature: 0.2
  "#;
    let p = write_yaml(&tmp, "sift.yaml", file_yaml);

    temp_env::with_var("SIFT_TEST_GEMINI_KEY", Some("from-env"), || {
        let config = SiftConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load system config");

        assert_eq!(config.version.as_deref(), Some("0.1"));
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert!(config.browser.headless);
        assert_eq!(config.search.delay_ms, 1500);
        assert_eq!(config.search.settle_timeout_ms, 10_000);
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.llm.api_key, "from-env");
        assert_eq!(config.llm.temperature, Some(0.2));
    });
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "sift.yaml", "fetch:\n  delay_ms: 100\n");

    temp_env::with_vars(
        [
            ("SIFT__FETCH__DELAY_MS", Some("2500")),
            ("SIFT__BROWSER__HEADLESS", Some("true")),
        ],
        || {
            let config = SiftConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load with env overrides");

            assert_eq!(config.fetch.delay_ms, 2500);
            assert!(config.browser.headless);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = SiftConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults load");

    assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
    assert!(!config.browser.headless);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = SiftConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
