// weir/src/pipeline/invocation.rs

//! The observer side of running compiled pipelines.
//!
//! Each named pipeline is driven on its own task, so an error (or a panic) in
//! one pipeline's stream never stops or corrupts its siblings.

use crate::error::WeirError;
use crate::stream::{Flow, Payload};
use futures::StreamExt;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{event, Level};

/// Receives every emission, error and end of every named pipeline.
pub trait CompletionObserver<T>: Send + Sync {
  fn on_value(&self, pipeline: &str, value: &T);

  fn on_error(&self, pipeline: &str, error: &WeirError);

  fn on_end(&self, _pipeline: &str) {}
}

/// Reports pipeline activity through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl<T: Debug> CompletionObserver<T> for TracingObserver {
  fn on_value(&self, pipeline: &str, value: &T) {
    event!(Level::INFO, pipeline, "Pipeline complete.");
    event!(Level::TRACE, pipeline, value = ?value, "Pipeline output.");
  }

  fn on_error(&self, pipeline: &str, error: &WeirError) {
    event!(Level::WARN, pipeline, error = %error, "Pipeline failed.");
  }

  fn on_end(&self, pipeline: &str) {
    event!(Level::DEBUG, pipeline, "Pipeline stream ended.");
  }
}

/// Output of `PipelineCompiler::compile_all`: named flows in declaration order.
pub struct CompiledPipelines<T> {
  pipelines: Vec<(String, Flow<T>)>,
}

impl<T> CompiledPipelines<T> {
  pub(crate) fn new(pipelines: Vec<(String, Flow<T>)>) -> Self {
    Self { pipelines }
  }

  pub fn get(&self, name: &str) -> Option<&Flow<T>> {
    self
      .pipelines
      .iter()
      .find(|(pipeline, _)| pipeline == name)
      .map(|(_, flow)| flow)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.pipelines.iter().map(|(name, _)| name.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Flow<T>)> {
    self.pipelines.iter().map(|(name, flow)| (name.as_str(), flow))
  }

  pub fn len(&self) -> usize {
    self.pipelines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pipelines.is_empty()
  }

  pub fn into_inner(self) -> Vec<(String, Flow<T>)> {
    self.pipelines
  }
}

impl<T: Payload> CompiledPipelines<T> {
  /// Subscribes to every pipeline and reports to `observer`. Must be called
  /// from within a tokio runtime.
  pub fn drive(&self, observer: Arc<dyn CompletionObserver<T>>) -> RunningPipelines {
    // Subscribe to everything before any task runs, so pipelines reading a
    // shared pipeline are attached before it starts emitting.
    let mut outputs = Vec::with_capacity(self.pipelines.len());
    for (name, flow) in &self.pipelines {
      match flow.stream() {
        Some(stream) => outputs.push((name.clone(), stream.subscribe())),
        None => event!(Level::DEBUG, pipeline = %name, "Pipeline has no stream, nothing to drive."),
      }
    }

    let mut tasks = Vec::with_capacity(outputs.len());
    for (name, mut output) in outputs {
      let observer = Arc::clone(&observer);
      let pipeline = name.clone();
      let handle = tokio::spawn(async move {
        while let Some(item) = output.next().await {
          match item {
            Ok(value) => observer.on_value(&pipeline, &value),
            Err(error) => observer.on_error(&pipeline, &error),
          }
        }
        observer.on_end(&pipeline);
      });
      tasks.push((name, handle));
    }
    RunningPipelines { tasks }
  }
}

/// Handles of the tasks started by `CompiledPipelines::drive`.
pub struct RunningPipelines {
  tasks: Vec<(String, JoinHandle<()>)>,
}

impl RunningPipelines {
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.tasks.iter().map(|(name, _)| name.as_str())
  }

  /// Waits until every pipeline stream has ended.
  pub async fn wait(self) {
    for (name, handle) in self.tasks {
      if let Err(join_err) = handle.await {
        if join_err.is_panic() {
          event!(Level::ERROR, pipeline = %name, "Pipeline task panicked.");
        }
      }
    }
  }

  /// Stops every pipeline, dropping its subscription.
  pub fn abort(&self) {
    for (_, handle) in &self.tasks {
      handle.abort();
    }
  }
}
