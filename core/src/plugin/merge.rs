// weir/src/plugin/merge.rs

//! `merge`: fan-in union of several child pipelines sharing one upstream.

use crate::error::{WeirError, WeirResult};
use crate::pipeline::operation::Arg;
use crate::plugin::{Plugin, PluginContext, PluginOutput};
use crate::stream::{EventStream, Flow, Payload};
use async_trait::async_trait;
use tracing::{event, instrument, Level};

/// Compiles each child node against the shared upstream and emits whenever any
/// child emits. Children compiling to `Flow::Init` contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Merge;

#[async_trait]
impl<T: Payload> Plugin<T> for Merge {
  #[instrument(name = "Merge::apply", skip_all, fields(index = ctx.index, children = args.len()), err(Display))]
  async fn apply(&self, ctx: PluginContext<'_, T>, args: &[Arg<T>]) -> WeirResult<PluginOutput<T>> {
    let PluginContext { upstream, compiler, .. } = ctx;
    // Every child reads the same upstream subscription.
    let upstream = upstream.shared();

    let mut streams = Vec::with_capacity(args.len());
    // One child at a time: interleaved compiles would hand out indices in a
    // run-dependent order.
    for (position, arg) in args.iter().enumerate() {
      let child = arg
        .as_node()
        .ok_or_else(|| WeirError::malformed(format!("merge argument {} is not an operation", position)))?;
      match compiler.compile(child, upstream.clone(), None).await? {
        Flow::Init => event!(Level::TRACE, position, "Child has no stream, left out of the merge."),
        Flow::Stream(stream) => streams.push(stream),
      }
    }

    if streams.is_empty() {
      event!(Level::DEBUG, "No child produced a stream.");
      return Ok(Flow::Init.into());
    }
    Ok(EventStream::merge_all(streams).into())
  }
}
