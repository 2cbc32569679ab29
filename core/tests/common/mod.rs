// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Level;
use weir::{
  Arg, CompilerConfig, CompletionObserver, Event, EventBatch, EventStream, Flow, ForeignItem, ForeignListener,
  ForeignTransform, ListenerId, Listeners, Payload, PipelineCompiler, Plugin, PluginContext, PluginOutput,
  PluginRegistry, StreamResult, WeirError, WeirResult,
};

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Source plugins ---

/// `emit(paths...)`: one batch with an `add` event per path, contents equal to the path.
pub struct EmitPlugin;

#[async_trait]
impl Plugin<EventBatch> for EmitPlugin {
  async fn apply(&self, _ctx: PluginContext<'_, EventBatch>, args: &[Arg<EventBatch>]) -> WeirResult<PluginOutput<EventBatch>> {
    let batch = args
      .iter()
      .map(|arg| {
        let path = arg
          .as_str()
          .ok_or_else(|| WeirError::malformed("emit expects paths"))?;
        Ok(Event::add(path, "src", path))
      })
      .collect::<WeirResult<EventBatch>>()?;
    Ok(EventStream::constant(batch).into())
  }
}

/// `slow(ms, paths...)`: like `emit`, but takes `ms` of wall time to build its stream.
pub struct SlowPlugin;

#[async_trait]
impl Plugin<EventBatch> for SlowPlugin {
  async fn apply(&self, ctx: PluginContext<'_, EventBatch>, args: &[Arg<EventBatch>]) -> WeirResult<PluginOutput<EventBatch>> {
    let delay = args
      .first()
      .and_then(Arg::as_int)
      .ok_or_else(|| WeirError::malformed("slow expects a delay"))?;
    tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    EmitPlugin.apply(ctx, &args[1..]).await
  }
}

/// Counts how many times its stream is subscribed to.
#[derive(Clone, Default)]
pub struct CountingSource {
  pub subscriptions: Arc<AtomicUsize>,
}

#[async_trait]
impl Plugin<EventBatch> for CountingSource {
  async fn apply(&self, _ctx: PluginContext<'_, EventBatch>, _args: &[Arg<EventBatch>]) -> WeirResult<PluginOutput<EventBatch>> {
    let subscriptions = Arc::clone(&self.subscriptions);
    Ok(
      EventStream::from_fn(move || {
        subscriptions.fetch_add(1, Ordering::SeqCst);
        stream::iter(vec![Ok(EventBatch::single(Event::add("counted.js", "src", "1")))])
      })
      .into(),
    )
  }
}

pub fn test_registry() -> PluginRegistry<EventBatch> {
  PluginRegistry::standard().with("emit", EmitPlugin).with("slow", SlowPlugin)
}

pub fn test_compiler(config: CompilerConfig) -> PipelineCompiler<EventBatch> {
  PipelineCompiler::new(config, test_registry())
}

// --- Stream helpers ---

/// Emits each value `offset` ms after subscription. Stays open afterwards unless `then_end`.
pub fn timed_source<T: Payload>(schedule: Vec<(u64, T)>, then_end: bool) -> EventStream<T> {
  EventStream::from_fn(move || {
    let start = Instant::now();
    let timed = stream::iter(schedule.clone()).then(move |(offset, value)| async move {
      tokio::time::sleep_until(start + Duration::from_millis(offset)).await;
      Ok::<T, WeirError>(value)
    });
    if then_end {
      timed.boxed()
    } else {
      timed.chain(stream::pending()).boxed()
    }
  })
}

pub async fn collect_results<T: Send + 'static>(flow: &Flow<T>) -> Vec<StreamResult<T>> {
  let stream = flow.stream().expect("flow should carry a stream");
  stream.subscribe().collect().await
}

pub async fn collect_values<T: Send + 'static>(flow: &Flow<T>) -> Vec<T> {
  collect_results(flow)
    .await
    .into_iter()
    .map(|item| item.expect("stream should not error"))
    .collect()
}

pub fn paths(batch: &EventBatch) -> Vec<&str> {
  batch.iter().map(Event::project_path).collect()
}

// --- Foreign transforms ---

#[derive(Clone, Default)]
pub struct TransformStats {
  pub pushed: Arc<AtomicUsize>,
  pub emitted: Arc<AtomicUsize>,
  pub ended: Arc<AtomicBool>,
  pub listeners: Listeners,
}

impl TransformStats {
  pub fn pushed(&self) -> usize {
    self.pushed.load(Ordering::SeqCst)
  }

  pub fn emitted(&self) -> usize {
    self.emitted.load(Ordering::SeqCst)
  }

  pub fn ended(&self) -> bool {
    self.ended.load(Ordering::SeqCst)
  }
}

/// Upper-cases contents and emits them `delay` after each push, from a spawned task.
pub struct DelayedUppercase {
  pub delay: Duration,
  pub stats: TransformStats,
}

impl ForeignTransform for DelayedUppercase {
  fn push(&mut self, item: ForeignItem) -> anyhow::Result<()> {
    self.stats.pushed.fetch_add(1, Ordering::SeqCst);
    let listeners = self.stats.listeners.clone();
    let emitted = Arc::clone(&self.stats.emitted);
    let delay = self.delay;
    tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      emitted.fetch_add(1, Ordering::SeqCst);
      let upper = item.contents.to_ascii_uppercase();
      listeners.emit(item.with_contents(upper));
    });
    Ok(())
  }

  fn add_listener(&mut self, listener: ForeignListener) -> ListenerId {
    self.stats.listeners.add(listener)
  }

  fn remove_listener(&mut self, id: ListenerId) -> bool {
    self.stats.listeners.remove(id)
  }

  fn end(&mut self) {
    self.stats.ended.store(true, Ordering::SeqCst);
  }
}

/// Emits brand-new items that carry no correlation id.
pub struct ForgetfulTransform {
  pub listeners: Listeners,
}

impl ForeignTransform for ForgetfulTransform {
  fn push(&mut self, item: ForeignItem) -> anyhow::Result<()> {
    self
      .listeners
      .emit(ForeignItem::new(item.contents.clone(), item.path.clone(), item.base.clone()));
    Ok(())
  }

  fn add_listener(&mut self, listener: ForeignListener) -> ListenerId {
    self.listeners.add(listener)
  }

  fn remove_listener(&mut self, id: ListenerId) -> bool {
    self.listeners.remove(id)
  }

  fn end(&mut self) {}
}

// --- Observer ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
  Value(usize),
  Error(String),
  End,
}

/// Records `(pipeline, outcome)` pairs. Values are recorded by batch length.
#[derive(Default)]
pub struct RecordingObserver {
  pub log: Mutex<Vec<(String, Observed)>>,
}

impl RecordingObserver {
  pub fn for_pipeline(&self, pipeline: &str) -> Vec<Observed> {
    self
      .log
      .lock()
      .iter()
      .filter(|(name, _)| name == pipeline)
      .map(|(_, observed)| observed.clone())
      .collect()
  }
}

impl CompletionObserver<EventBatch> for RecordingObserver {
  fn on_value(&self, pipeline: &str, value: &EventBatch) {
    self.log.lock().push((pipeline.to_string(), Observed::Value(value.len())));
  }

  fn on_error(&self, pipeline: &str, error: &WeirError) {
    self.log.lock().push((pipeline.to_string(), Observed::Error(error.to_string())));
  }

  fn on_end(&self, pipeline: &str) {
    self.log.lock().push((pipeline.to_string(), Observed::End));
  }
}
