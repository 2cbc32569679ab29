// weir/src/config.rs

//! Compiler configuration: which pipelines to build, the active environment,
//! and the default debounce window.

use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
  /// Restricts compilation to these pipelines. Empty means all of them.
  pub pipelines: Vec<String>,
  /// Active environment consulted by the `env` plugin.
  pub environment: Option<String>,
  pub debounce_window_ms: u64,
}

impl Default for CompilerConfig {
  fn default() -> Self {
    Self {
      pipelines: Vec::new(),
      environment: None,
      debounce_window_ms: DEFAULT_DEBOUNCE_MS,
    }
  }
}

impl CompilerConfig {
  pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
    self.environment = Some(environment.into());
    self
  }

  pub fn with_pipelines<I, S>(mut self, pipelines: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.pipelines = pipelines.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_debounce_window_ms(mut self, window_ms: u64) -> Self {
    self.debounce_window_ms = window_ms;
    self
  }

  pub fn debounce_window(&self) -> Duration {
    Duration::from_millis(self.debounce_window_ms)
  }

  /// Whether the pipeline called `name` is part of the configured subset.
  pub fn selects(&self, name: &str) -> bool {
    self.pipelines.is_empty() || self.pipelines.iter().any(|p| p == name)
  }
}
