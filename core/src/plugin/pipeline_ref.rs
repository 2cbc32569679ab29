// weir/src/plugin/pipeline_ref.rs

use crate::error::{WeirError, WeirResult};
use crate::pipeline::operation::Arg;
use crate::plugin::{Plugin, PluginContext, PluginOutput};
use crate::stream::{EventStream, Flow, Payload};
use async_trait::async_trait;

/// `pipeline(names...)`: merges the outputs of other named pipelines into the upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineRef;

#[async_trait]
impl<T: Payload> Plugin<T> for PipelineRef {
  async fn apply(&self, ctx: PluginContext<'_, T>, args: &[Arg<T>]) -> WeirResult<PluginOutput<T>> {
    let PluginContext { upstream, compiler, .. } = ctx;
    if args.is_empty() {
      return Err(WeirError::malformed("pipeline expects at least one pipeline name"));
    }

    let mut streams: Vec<EventStream<T>> = upstream.into_stream().into_iter().collect();
    for arg in args {
      let name = arg
        .as_str()
        .ok_or_else(|| WeirError::malformed(format!("pipeline expects pipeline names, got {:?}", arg)))?;
      if let Flow::Stream(stream) = compiler.resolve_pipeline(name).await? {
        streams.push(stream);
      }
    }

    Ok(match streams.len() {
      0 => Flow::Init,
      1 => Flow::Stream(streams.remove(0)),
      _ => Flow::Stream(EventStream::merge_all(streams)),
    }
    .into())
  }
}
