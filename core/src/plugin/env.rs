// weir/src/plugin/env.rs

//! `env(transform, environments...)`: applies `transform` only in the listed environments.

use crate::error::{WeirError, WeirResult};
use crate::pipeline::operation::Arg;
use crate::plugin::{Plugin, PluginContext, PluginOutput};
use crate::stream::Payload;
use async_trait::async_trait;
use tracing::{event, Level};

/// When the active environment is one of the allowed names the child
/// transform's output replaces the upstream. Otherwise the upstream is handed
/// back untouched and the child is never compiled.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvFilter;

#[async_trait]
impl<T: Payload> Plugin<T> for EnvFilter {
  async fn apply(&self, ctx: PluginContext<'_, T>, args: &[Arg<T>]) -> WeirResult<PluginOutput<T>> {
    let PluginContext { upstream, compiler, index } = ctx;

    let (transform, environments) = args
      .split_first()
      .ok_or_else(|| WeirError::malformed("env expects a transform followed by environment names"))?;
    let transform = transform
      .as_node()
      .ok_or_else(|| WeirError::malformed("env expects its first argument to be an operation"))?;
    let allowed = environments
      .iter()
      .map(|arg| {
        arg
          .as_str()
          .ok_or_else(|| WeirError::malformed(format!("env expects environment names, got {:?}", arg)))
      })
      .collect::<WeirResult<Vec<&str>>>()?;

    let selected = compiler
      .environment()
      .map_or(false, |active| allowed.iter().any(|name| *name == active));
    if !selected {
      event!(Level::DEBUG, index, environment = ?compiler.environment(), "Environment not selected, passing upstream through.");
      return Ok(upstream.into());
    }

    event!(Level::DEBUG, index, "Environment selected, applying transform.");
    let transformed = compiler.compile(transform, upstream, None).await?;
    Ok(transformed.into())
  }
}
