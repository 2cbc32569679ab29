// tests/config_tests.rs
mod common;

use common::*;
use std::time::Duration;
use weir::{CompilerConfig, DEFAULT_DEBOUNCE_MS};

#[test]
fn test_defaults() {
  let config = CompilerConfig::default();
  assert!(config.pipelines.is_empty());
  assert_eq!(config.environment, None);
  assert_eq!(config.debounce_window(), Duration::from_millis(DEFAULT_DEBOUNCE_MS));
  assert!(config.selects("anything"));
}

#[test]
fn test_deserializes_camel_case_fields() {
  setup_tracing();
  let config: CompilerConfig = serde_json::from_str(
    r#"{ "pipelines": ["js", "css"], "environment": "production", "debounceWindowMs": 50 }"#,
  )
  .unwrap();

  assert_eq!(config.pipelines, vec!["js", "css"]);
  assert_eq!(config.environment.as_deref(), Some("production"));
  assert_eq!(config.debounce_window(), Duration::from_millis(50));
  assert!(config.selects("css"));
  assert!(!config.selects("images"));
}

#[test]
fn test_missing_fields_fall_back_to_defaults() {
  let config: CompilerConfig = serde_json::from_str(r#"{ "environment": "dev" }"#).unwrap();
  assert_eq!(config, CompilerConfig::default().with_environment("dev"));
}

#[test]
fn test_builders_compose() {
  let config = CompilerConfig::default()
    .with_pipelines(["js"])
    .with_environment("test")
    .with_debounce_window_ms(0);
  assert_eq!(config.pipelines, vec!["js".to_string()]);
  assert_eq!(config.environment.as_deref(), Some("test"));
  assert_eq!(config.debounce_window(), Duration::ZERO);
}
