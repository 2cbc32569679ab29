// weir/src/error.rs
use anyhow::Error as AnyhowError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeirError {
  #[error("Nonexistent plugin `{plugin}'")]
  UnknownPlugin { plugin: String },

  #[error("Reference to undeclared pipeline `{name}'")]
  UnknownPipeline { name: String },

  #[error("Malformed operation tree: {message}")]
  MalformedTree { message: String },

  #[error("Plugin '{plugin}' failed to build its stream. Source: {source}")]
  PluginFailure {
    plugin: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Foreign transform lost the source of '{path}', it may not be compatible with weir")]
  AdapterIncompatibility { path: String },

  #[error("Error raised by a pipeline stream. Source: {source}")]
  RuntimeStream {
    #[source]
    source: AnyhowError,
  },

  /// One error delivered to several subscribers of a shared stream.
  #[error(transparent)]
  Shared(Arc<WeirError>),

  #[error("Internal weir error: {0}")]
  Internal(String),
}

impl WeirError {
  pub fn malformed(message: impl Into<String>) -> Self {
    WeirError::MalformedTree { message: message.into() }
  }

  pub fn runtime(source: impl Into<AnyhowError>) -> Self {
    WeirError::RuntimeStream { source: source.into() }
  }

  /// The error itself, seen through any `Shared` wrapping.
  pub fn root(&self) -> &WeirError {
    match self {
      WeirError::Shared(inner) => inner.root(),
      other => other,
    }
  }

  /// True for the errors raised while compiling a declaration, before any stream runs.
  pub fn is_compile_error(&self) -> bool {
    matches!(
      self.root(),
      WeirError::UnknownPlugin { .. }
        | WeirError::UnknownPipeline { .. }
        | WeirError::MalformedTree { .. }
        | WeirError::PluginFailure { .. }
    )
  }
}

impl From<AnyhowError> for WeirError {
  fn from(err: AnyhowError) -> Self {
    // Avoid RuntimeStream(WeirError(..)) when a plugin bubbles one of ours through anyhow.
    match err.downcast::<WeirError>() {
      Ok(weir_err) => weir_err,
      Err(source) => WeirError::RuntimeStream { source },
    }
  }
}

pub type WeirResult<T, E = WeirError> = std::result::Result<T, E>;
