// weir/src/plugin/mod.rs

//! The plugin contract and the built-in stream combinators.
//!
//! A plugin is invoked once per call node at compile time with the node's
//! upstream flow, a handle on the compiler (for compiling child nodes) and the
//! node's positional arguments. It returns the flow that replaces the node.

pub mod debounce;
pub mod env;
pub mod merge;
pub mod pipeline_ref;

pub use debounce::Debounce;
pub use env::EnvFilter;
pub use merge::Merge;
pub use pipeline_ref::PipelineRef;

use crate::error::WeirResult;
use crate::pipeline::compiler::PipelineCompiler;
use crate::pipeline::operation::Arg;
use crate::stream::{EventStream, Flow, Payload};
use async_trait::async_trait;

/// Compile-time context handed to a plugin.
pub struct PluginContext<'c, T> {
  /// Output of the previous node, or `Flow::Init` at the root and for sources.
  pub upstream: Flow<T>,
  /// Child nodes must be compiled through this handle, one after the other.
  pub compiler: &'c mut PipelineCompiler<T>,
  /// Pre-order index of the node being compiled.
  pub index: usize,
}

/// What a plugin hands back. Constants are normalized by the compiler into a
/// one-shot stream.
pub enum PluginOutput<T> {
  Flow(Flow<T>),
  Constant(T),
}

impl<T> From<Flow<T>> for PluginOutput<T> {
  fn from(flow: Flow<T>) -> Self {
    PluginOutput::Flow(flow)
  }
}

impl<T> From<EventStream<T>> for PluginOutput<T> {
  fn from(stream: EventStream<T>) -> Self {
    PluginOutput::Flow(Flow::Stream(stream))
  }
}

#[async_trait]
pub trait Plugin<T>: Send + Sync {
  async fn apply(&self, ctx: PluginContext<'_, T>, args: &[Arg<T>]) -> WeirResult<PluginOutput<T>>;
}

/// Adapts a closure over the upstream flow into a `Plugin`.
pub struct FnPlugin<F> {
  f: F,
}

impl<F> FnPlugin<F> {
  pub fn new(f: F) -> Self {
    Self { f }
  }
}

#[async_trait]
impl<T, F> Plugin<T> for FnPlugin<F>
where
  T: Payload,
  F: Fn(Flow<T>) -> WeirResult<PluginOutput<T>> + Send + Sync,
{
  async fn apply(&self, ctx: PluginContext<'_, T>, _args: &[Arg<T>]) -> WeirResult<PluginOutput<T>> {
    (self.f)(ctx.upstream)
  }
}
