// weir/src/plugin/debounce.rs

use crate::error::{WeirError, WeirResult};
use crate::pipeline::operation::Arg;
use crate::plugin::{Plugin, PluginContext, PluginOutput};
use crate::stream::{Coalesce, Payload};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{event, Level};

/// `debounce([window_ms])`: coalesces bursts of upstream values. Without an
/// argument the compiler's configured window is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debounce;

#[async_trait]
impl<T: Payload + Coalesce> Plugin<T> for Debounce {
  async fn apply(&self, ctx: PluginContext<'_, T>, args: &[Arg<T>]) -> WeirResult<PluginOutput<T>> {
    let window = match args.first() {
      None => ctx.compiler.config().debounce_window(),
      Some(Arg::Int(ms)) if *ms >= 0 => Duration::from_millis(*ms as u64),
      Some(other) => {
        return Err(WeirError::malformed(format!(
          "debounce expects a non-negative window in milliseconds, got {:?}",
          other
        )))
      }
    };
    event!(Level::DEBUG, index = ctx.index, window_ms = window.as_millis() as u64, "Debouncing upstream.");
    let upstream = ctx.upstream.require_stream("debounce")?;
    Ok(upstream.debounce(window).into())
  }
}
