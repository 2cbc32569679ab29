// weir/src/pipeline/operation.rs

//! The declared operation tree and the ordered set of named declarations.
//!
//! Trees are plain values built up front (see the `op` helpers). They carry no
//! compile-time state; indices are handed out by the compiler as it walks them.

use crate::error::WeirResult;
use crate::plugin::{FnPlugin, Plugin, PluginOutput};
use crate::stream::{Flow, Payload};
use std::fmt;
use std::sync::Arc;

/// Which plugin a call invokes.
pub enum PluginRef<T> {
  /// Looked up by name in the compiler's `PluginRegistry`.
  Named(String),
  /// Carried directly by the declaration.
  Inline(Arc<dyn Plugin<T>>),
}

impl<T> PluginRef<T> {
  pub fn name(&self) -> &str {
    match self {
      PluginRef::Named(name) => name,
      PluginRef::Inline(_) => "<inline>",
    }
  }
}

impl<T> Clone for PluginRef<T> {
  fn clone(&self) -> Self {
    match self {
      PluginRef::Named(name) => PluginRef::Named(name.clone()),
      PluginRef::Inline(plugin) => PluginRef::Inline(Arc::clone(plugin)),
    }
  }
}

/// A positional plugin argument.
pub enum Arg<T> {
  Str(String),
  Int(i64),
  Node(OperationNode<T>),
}

impl<T> Arg<T> {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Arg::Str(value) => Some(value),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Arg::Int(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_node(&self) -> Option<&OperationNode<T>> {
    match self {
      Arg::Node(node) => Some(node),
      _ => None,
    }
  }
}

impl<T> Clone for Arg<T> {
  fn clone(&self) -> Self {
    match self {
      Arg::Str(value) => Arg::Str(value.clone()),
      Arg::Int(value) => Arg::Int(*value),
      Arg::Node(node) => Arg::Node(node.clone()),
    }
  }
}

impl<T> fmt::Debug for Arg<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Arg::Str(value) => f.debug_tuple("Str").field(value).finish(),
      Arg::Int(value) => f.debug_tuple("Int").field(value).finish(),
      Arg::Node(node) => f.debug_tuple("Node").field(node).finish(),
    }
  }
}

impl<T> From<&str> for Arg<T> {
  fn from(value: &str) -> Self {
    Arg::Str(value.to_string())
  }
}

impl<T> From<String> for Arg<T> {
  fn from(value: String) -> Self {
    Arg::Str(value)
  }
}

impl<T> From<i64> for Arg<T> {
  fn from(value: i64) -> Self {
    Arg::Int(value)
  }
}

impl<T> From<OperationNode<T>> for Arg<T> {
  fn from(node: OperationNode<T>) -> Self {
    Arg::Node(node)
  }
}

pub struct PluginCall<T> {
  pub plugin: PluginRef<T>,
  pub args: Vec<Arg<T>>,
}

impl<T> Clone for PluginCall<T> {
  fn clone(&self) -> Self {
    Self {
      plugin: self.plugin.clone(),
      args: self.args.clone(),
    }
  }
}

pub enum OperationNode<T> {
  /// A plugin call with no upstream, e.g. a file watcher.
  SourceCall(PluginCall<T>),
  /// A plugin call fed by the upstream flow; node arguments are its children.
  Composite(PluginCall<T>),
  /// Each child is compiled against the previous child's output.
  Sequence(Vec<OperationNode<T>>),
  /// The output of another declared pipeline.
  NamedReference(String),
}

impl<T> OperationNode<T> {
  /// Short description used in logs and node records.
  pub fn label(&self) -> String {
    match self {
      OperationNode::SourceCall(call) => format!("source:{}", call.plugin.name()),
      OperationNode::Composite(call) => format!("call:{}", call.plugin.name()),
      OperationNode::Sequence(children) => format!("sequence[{}]", children.len()),
      OperationNode::NamedReference(name) => format!("ref:{}", name),
    }
  }
}

impl<T> Clone for OperationNode<T> {
  fn clone(&self) -> Self {
    match self {
      OperationNode::SourceCall(call) => OperationNode::SourceCall(call.clone()),
      OperationNode::Composite(call) => OperationNode::Composite(call.clone()),
      OperationNode::Sequence(children) => OperationNode::Sequence(children.clone()),
      OperationNode::NamedReference(name) => OperationNode::NamedReference(name.clone()),
    }
  }
}

impl<T> fmt::Debug for OperationNode<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OperationNode::SourceCall(call) | OperationNode::Composite(call) => f
        .debug_struct("PluginCall")
        .field("label", &self.label())
        .field("args", &call.args)
        .finish(),
      OperationNode::Sequence(children) => f.debug_list().entries(children).finish(),
      OperationNode::NamedReference(name) => f.debug_tuple("NamedReference").field(name).finish(),
    }
  }
}

/// Builders for operation trees.
pub mod op {
  use super::*;

  pub fn source<T>(plugin: &str, args: Vec<Arg<T>>) -> OperationNode<T> {
    OperationNode::SourceCall(PluginCall {
      plugin: PluginRef::Named(plugin.to_string()),
      args,
    })
  }

  pub fn call<T>(plugin: &str, args: Vec<Arg<T>>) -> OperationNode<T> {
    OperationNode::Composite(PluginCall {
      plugin: PluginRef::Named(plugin.to_string()),
      args,
    })
  }

  pub fn seq<T>(nodes: Vec<OperationNode<T>>) -> OperationNode<T> {
    OperationNode::Sequence(nodes)
  }

  pub fn reference<T>(name: &str) -> OperationNode<T> {
    OperationNode::NamedReference(name.to_string())
  }

  /// A source node backed by a closure instead of a registered plugin.
  pub fn inline_source<T, F>(f: F) -> OperationNode<T>
  where
    T: Payload,
    F: Fn(Flow<T>) -> WeirResult<PluginOutput<T>> + Send + Sync + 'static,
  {
    OperationNode::SourceCall(PluginCall {
      plugin: PluginRef::Inline(Arc::new(FnPlugin::new(f))),
      args: Vec::new(),
    })
  }

  /// A transform node backed by a closure instead of a registered plugin.
  pub fn inline<T, F>(f: F) -> OperationNode<T>
  where
    T: Payload,
    F: Fn(Flow<T>) -> WeirResult<PluginOutput<T>> + Send + Sync + 'static,
  {
    OperationNode::Composite(PluginCall {
      plugin: PluginRef::Inline(Arc::new(FnPlugin::new(f))),
      args: Vec::new(),
    })
  }
}

/// Named pipeline roots, kept in declaration order.
pub struct Declarations<T> {
  pipelines: Vec<(String, OperationNode<T>)>,
}

impl<T> Default for Declarations<T> {
  fn default() -> Self {
    Self { pipelines: Vec::new() }
  }
}

impl<T> Declarations<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pipeline(mut self, name: impl Into<String>, root: OperationNode<T>) -> Self {
    self.pipelines.push((name.into(), root));
    self
  }

  pub fn len(&self) -> usize {
    self.pipelines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pipelines.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.pipelines.iter().map(|(name, _)| name.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &OperationNode<T>)> {
    self.pipelines.iter().map(|(name, node)| (name.as_str(), node))
  }
}
