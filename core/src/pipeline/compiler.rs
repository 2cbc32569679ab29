// weir/src/pipeline/compiler.rs

//! Contains `PipelineCompiler<T>`, which turns operation trees into live flows.
//!
//! Compilation is strictly sequential: every method that compiles takes
//! `&mut self`, so two subtrees can never be compiled concurrently and node
//! indices are handed out in one deterministic pre-order walk, however long
//! each plugin takes to build its stream.

use crate::config::CompilerConfig;
use crate::error::{WeirError, WeirResult};
use crate::pipeline::invocation::CompiledPipelines;
use crate::pipeline::operation::{Declarations, OperationNode, PluginCall, PluginRef};
use crate::plugin::{Plugin, PluginContext, PluginOutput};
use crate::registry::PluginRegistry;
use crate::stream::{EventStream, Flow, Payload};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Index assigned to one node during the last compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
  pub index: usize,
  pub label: String,
}

pub struct PipelineCompiler<T> {
  config: CompilerConfig,
  plugins: Arc<PluginRegistry<T>>,
  /// Roots of the declaration set being compiled, for on-demand named references.
  declarations: HashMap<String, Arc<OperationNode<T>>>,
  /// Compiled named pipelines. Write-once per name.
  pipelines: HashMap<String, Flow<T>>,
  /// Named pipelines currently being compiled, innermost last.
  compiling: Vec<String>,
  next_index: usize,
  records: Vec<NodeRecord>,
}

impl<T: Payload> PipelineCompiler<T> {
  pub fn new(config: CompilerConfig, plugins: PluginRegistry<T>) -> Self {
    Self {
      config,
      plugins: Arc::new(plugins),
      declarations: HashMap::new(),
      pipelines: HashMap::new(),
      compiling: Vec::new(),
      next_index: 0,
      records: Vec::new(),
    }
  }

  pub fn config(&self) -> &CompilerConfig {
    &self.config
  }

  pub fn environment(&self) -> Option<&str> {
    self.config.environment.as_deref()
  }

  /// Nodes compiled so far, in index order.
  pub fn node_records(&self) -> &[NodeRecord] {
    &self.records
  }

  pub fn registered(&self, name: &str) -> Option<&Flow<T>> {
    self.pipelines.get(name)
  }

  /// Compiles every selected pipeline of `declarations`, in declaration order.
  ///
  /// Either every selected pipeline compiles or none is returned; since flows
  /// are cold, nothing has started emitting when an error comes back.
  #[instrument(
    name = "PipelineCompiler::compile_all",
    skip_all,
    fields(declared = declarations.len(), environment = ?self.config.environment),
    err(Display)
  )]
  pub async fn compile_all(&mut self, declarations: Declarations<T>) -> WeirResult<CompiledPipelines<T>> {
    self.next_index = 0;
    self.records.clear();
    self.compiling.clear();
    self.pipelines.clear();
    self.declarations.clear();

    let result = self.compile_declarations(&declarations).await;

    // The registry only lives for one declaration set.
    self.pipelines.clear();
    self.declarations.clear();
    self.compiling.clear();
    result
  }

  async fn compile_declarations(&mut self, declarations: &Declarations<T>) -> WeirResult<CompiledPipelines<T>> {
    let mut order = Vec::with_capacity(declarations.len());
    for (name, root) in declarations.iter() {
      if self.declarations.insert(name.to_string(), Arc::new(root.clone())).is_some() {
        return Err(WeirError::malformed(format!("pipeline `{}' is declared more than once", name)));
      }
      order.push(name.to_string());
    }

    for wanted in &self.config.pipelines {
      if !self.declarations.contains_key(wanted) {
        event!(Level::WARN, pipeline = %wanted, "Requested pipeline is not declared, ignoring.");
      }
    }

    let mut compiled = Vec::with_capacity(order.len());
    for name in order {
      if !self.config.selects(&name) {
        event!(Level::DEBUG, pipeline = %name, "Pipeline not selected, skipping.");
        continue;
      }
      let flow = self.resolve_pipeline(&name).await?;
      compiled.push((name, flow));
    }

    event!(
      Level::INFO,
      pipelines = compiled.len(),
      nodes = self.records.len(),
      "Compilation finished."
    );
    Ok(CompiledPipelines::new(compiled))
  }

  /// Compiles `node` against `upstream`. When `name` is given the result is
  /// shared, so every reader of the pipeline is fed by one subscription, and
  /// stored in the registry before returning.
  pub fn compile<'a>(
    &'a mut self,
    node: &'a OperationNode<T>,
    upstream: Flow<T>,
    name: Option<&'a str>,
  ) -> BoxFuture<'a, WeirResult<Flow<T>>> {
    Box::pin(async move {
      let flow = self.compile_node(node, upstream).await?;
      match name {
        Some(name) => {
          let flow = flow.shared();
          self.register(name, flow.clone())?;
          Ok(flow)
        }
        None => Ok(flow),
      }
    })
  }

  /// Output of the pipeline called `name`, compiling its declaration first if needed.
  pub fn resolve_pipeline<'a>(&'a mut self, name: &'a str) -> BoxFuture<'a, WeirResult<Flow<T>>> {
    Box::pin(async move {
      if let Some(flow) = self.pipelines.get(name) {
        return Ok(flow.clone());
      }
      if self.compiling.iter().any(|in_progress| in_progress == name) {
        return Err(WeirError::malformed(format!(
          "pipeline `{}' references itself (via {})",
          name,
          self.compiling.join(" -> ")
        )));
      }
      let root = self
        .declarations
        .get(name)
        .cloned()
        .ok_or_else(|| WeirError::UnknownPipeline { name: name.to_string() })?;

      event!(Level::DEBUG, pipeline = %name, "Compiling pipeline.");
      self.compiling.push(name.to_string());
      let result = self.compile(&root, Flow::Init, Some(name)).await;
      self.compiling.pop();
      result
    })
  }

  fn register(&mut self, name: &str, flow: Flow<T>) -> WeirResult<()> {
    if self.pipelines.contains_key(name) {
      return Err(WeirError::Internal(format!("pipeline `{}' was compiled twice", name)));
    }
    self.pipelines.insert(name.to_string(), flow);
    Ok(())
  }

  fn compile_node<'a>(&'a mut self, node: &'a OperationNode<T>, upstream: Flow<T>) -> BoxFuture<'a, WeirResult<Flow<T>>> {
    Box::pin(async move {
      let index = self.assign_index(node);
      match node {
        OperationNode::Sequence(children) => {
          let mut flow = upstream;
          for child in children {
            flow = self.compile_node(child, flow).await?;
          }
          Ok(flow)
        }
        OperationNode::SourceCall(call) => self.invoke(call, Flow::Init, index).await,
        OperationNode::Composite(call) => self.invoke(call, upstream, index).await,
        OperationNode::NamedReference(name) => self.resolve_pipeline(name).await,
      }
    })
  }

  fn assign_index(&mut self, node: &OperationNode<T>) -> usize {
    let index = self.next_index;
    self.next_index += 1;
    let label = node.label();
    event!(Level::TRACE, index, node = %label, "Assigned node index.");
    self.records.push(NodeRecord { index, label });
    index
  }

  async fn invoke(&mut self, call: &PluginCall<T>, upstream: Flow<T>, index: usize) -> WeirResult<Flow<T>> {
    let plugin_name = call.plugin.name().to_string();
    let plugin = self.resolve_plugin(&call.plugin)?;
    event!(Level::DEBUG, plugin = %plugin_name, index, "Invoking plugin.");

    let ctx = PluginContext {
      upstream,
      compiler: self,
      index,
    };
    let output = plugin.apply(ctx, &call.args).await.map_err(|err| {
      if err.is_compile_error() {
        err
      } else {
        event!(Level::ERROR, plugin = %plugin_name, index, error = %err, "Plugin failed to build its stream.");
        WeirError::PluginFailure {
          plugin: plugin_name.clone(),
          source: err.into(),
        }
      }
    })?;

    Ok(match output {
      PluginOutput::Flow(flow) => flow,
      PluginOutput::Constant(value) => Flow::Stream(EventStream::constant(value)),
    })
  }

  fn resolve_plugin(&self, plugin: &PluginRef<T>) -> WeirResult<Arc<dyn Plugin<T>>> {
    match plugin {
      PluginRef::Inline(plugin) => Ok(Arc::clone(plugin)),
      PluginRef::Named(name) => self
        .plugins
        .get(name)
        .ok_or_else(|| WeirError::UnknownPlugin { plugin: name.clone() }),
    }
  }
}
