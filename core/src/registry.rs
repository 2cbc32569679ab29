// weir/src/registry.rs

//! Defines `PluginRegistry<T>`, the static mapping from plugin identifier to plugin.

use crate::plugin::{Debounce, EnvFilter, Merge, Plugin, PipelineRef};
use crate::stream::{Coalesce, Payload};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

pub struct PluginRegistry<T> {
  plugins: HashMap<String, Arc<dyn Plugin<T>>>,
}

impl<T> Default for PluginRegistry<T> {
  fn default() -> Self {
    Self { plugins: HashMap::new() }
  }
}

impl<T> fmt::Debug for PluginRegistry<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
    names.sort_unstable();
    f.debug_struct("PluginRegistry").field("plugins", &names).finish()
  }
}

impl<T: Payload> PluginRegistry<T> {
  /// Creates an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `plugin` under `name`, replacing any earlier registration.
  pub fn register(&mut self, name: impl Into<String>, plugin: impl Plugin<T> + 'static) -> &mut Self {
    let name = name.into();
    event!(Level::DEBUG, plugin = %name, payload_type = %std::any::type_name::<T>(), "Registering plugin.");
    if self.plugins.insert(name.clone(), Arc::new(plugin)).is_some() {
      event!(Level::WARN, plugin = %name, "Plugin registered twice, the later registration wins.");
    }
    self
  }

  /// Builder-style `register`.
  pub fn with(mut self, name: impl Into<String>, plugin: impl Plugin<T> + 'static) -> Self {
    self.register(name, plugin);
    self
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin<T>>> {
    self.plugins.get(name).cloned()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.plugins.contains_key(name)
  }
}

impl<T: Payload + Coalesce> PluginRegistry<T> {
  /// A registry holding the built-in combinators: `merge`, `debounce`, `env` and `pipeline`.
  pub fn standard() -> Self {
    Self::new()
      .with("merge", Merge)
      .with("debounce", Debounce)
      .with("env", EnvFilter)
      .with("pipeline", PipelineRef)
  }
}
