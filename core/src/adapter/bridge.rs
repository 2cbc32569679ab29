// weir/src/adapter/bridge.rs

//! Bridges a `ForeignTransform` into the `EventBatch` stream model.
//!
//! Per incoming batch, `add`/`change` events are pushed to the transform as
//! `ForeignItem`s tagged with a fresh correlation id; every other event is
//! re-emitted straight away. Transform outputs are matched back to their
//! source event through the bridge's own correlation table and emitted one
//! event per batch, whenever they arrive.
//!
//! When the upstream ends the bridge detaches its listener, ends the
//! transform, and ends its own output once. Outputs arriving later are dropped.

use crate::adapter::foreign::{CorrelationId, ForeignItem, ForeignTransform, ListenerId};
use crate::core::{Event, EventBatch};
use crate::error::{WeirError, WeirResult};
use crate::pipeline::operation::Arg;
use crate::plugin::{Plugin, PluginContext, PluginOutput};
use crate::stream::{EventStream, StreamResult};
use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{event, Level};
use uuid::Uuid;

pub type TransformFactory =
  Arc<dyn Fn(&[Arg<EventBatch>]) -> anyhow::Result<Box<dyn ForeignTransform>> + Send + Sync>;

/// A plugin wrapping a foreign transform. The factory receives the call's
/// arguments and builds one transform per subscription of the output.
#[derive(Clone)]
pub struct ForeignAdapter {
  factory: TransformFactory,
}

impl ForeignAdapter {
  pub fn new<F>(factory: F) -> Self
  where
    F: Fn(&[Arg<EventBatch>]) -> anyhow::Result<Box<dyn ForeignTransform>> + Send + Sync + 'static,
  {
    Self {
      factory: Arc::new(factory),
    }
  }
}

#[async_trait]
impl Plugin<EventBatch> for ForeignAdapter {
  async fn apply(
    &self,
    ctx: PluginContext<'_, EventBatch>,
    args: &[Arg<EventBatch>],
  ) -> WeirResult<PluginOutput<EventBatch>> {
    let upstream = ctx.upstream.require_stream("foreign transform")?;
    let factory = Arc::clone(&self.factory);
    let args: Arc<[Arg<EventBatch>]> = args.to_vec().into();
    let index = ctx.index;

    let adapted = EventStream::from_fn(move || -> BoxStream<'static, StreamResult<EventBatch>> {
      match factory(&args[..]) {
        Ok(transform) => Bridge::new(upstream.subscribe(), transform, index).into_stream(),
        Err(err) => {
          event!(Level::ERROR, index, error = %err, "Could not build foreign transform.");
          stream::once(future::ready(Err(WeirError::runtime(err)))).boxed()
        }
      }
    });
    Ok(adapted.into())
  }
}

struct Bridge {
  upstream: BoxStream<'static, StreamResult<EventBatch>>,
  transform: Box<dyn ForeignTransform>,
  listener: Option<ListenerId>,
  outputs: mpsc::UnboundedReceiver<ForeignItem>,
  outputs_open: bool,
  /// Correlation table: id of a pushed item -> the event it came from. Entries
  /// live until the upstream ends, so a transform may answer an older push of a
  /// path after a newer one, or emit several outputs for one push.
  sources: HashMap<CorrelationId, Event>,
  ready: VecDeque<StreamResult<EventBatch>>,
  ended: bool,
  index: usize,
}

impl Bridge {
  fn new(
    upstream: BoxStream<'static, StreamResult<EventBatch>>,
    mut transform: Box<dyn ForeignTransform>,
    index: usize,
  ) -> Self {
    let (sender, outputs) = mpsc::unbounded_channel();
    let listener = transform.add_listener(Arc::new(move |item: ForeignItem| {
      // A closed receiver means the bridge is gone; late items are dropped.
      let _ = sender.send(item);
    }));
    Self {
      upstream,
      transform,
      listener: Some(listener),
      outputs,
      outputs_open: true,
      sources: HashMap::new(),
      ready: VecDeque::new(),
      ended: false,
      index,
    }
  }

  fn into_stream(self) -> BoxStream<'static, StreamResult<EventBatch>> {
    stream::unfold(self, |mut bridge| async move {
      let item = bridge.next_item().await?;
      Some((item, bridge))
    })
    .boxed()
  }

  async fn next_item(&mut self) -> Option<StreamResult<EventBatch>> {
    loop {
      if let Some(item) = self.ready.pop_front() {
        return Some(item);
      }
      if self.ended {
        return None;
      }

      tokio::select! {
        biased;
        output = self.outputs.recv(), if self.outputs_open => match output {
          Some(item) => {
            let correlated = self.correlate(item);
            self.ready.push_back(correlated);
          }
          None => self.outputs_open = false,
        },
        batch = self.upstream.next() => match batch {
          Some(Ok(batch)) => self.feed(batch),
          Some(Err(err)) => self.ready.push_back(Err(err)),
          None => self.terminate(),
        },
      }
    }
  }

  fn feed(&mut self, batch: EventBatch) {
    let mut passthrough = Vec::new();
    for source in batch {
      if !source.kind().carries_data() {
        passthrough.push(source);
        continue;
      }

      let id = Uuid::new_v4();
      let path = source.project_path().to_string();
      let item = ForeignItem::new(
        source.data().unwrap_or_default().as_bytes().to_vec(),
        source.project_path(),
        source.base_path(),
      )
      .with_source_map(source.source_map().cloned())
      .correlated(id);

      self.sources.insert(id, source);

      event!(Level::TRACE, index = self.index, path = %path, "Pushing item to foreign transform.");
      if let Err(err) = self.transform.push(item) {
        event!(Level::WARN, index = self.index, path = %path, error = %err, "Foreign transform rejected item.");
        self.sources.remove(&id);
        self
          .ready
          .push_back(Err(WeirError::runtime(err.context(format!("foreign transform rejected '{}'", path)))));
      }
    }

    if !passthrough.is_empty() {
      self.ready.push_back(Ok(EventBatch::new(passthrough)));
    }
  }

  fn correlate(&self, item: ForeignItem) -> StreamResult<EventBatch> {
    let source = item.correlation().and_then(|id| self.sources.get(&id));
    let Some(source) = source else {
      event!(Level::ERROR, index = self.index, path = %item.path, "Foreign transform emitted an item with no resolvable source.");
      return Err(WeirError::AdapterIncompatibility { path: item.path });
    };

    let data = String::from_utf8_lossy(&item.contents).into_owned();
    Ok(EventBatch::single(
      source.clone().with_data(data).with_source_map(item.source_map),
    ))
  }

  fn terminate(&mut self) {
    self.ended = true;
    self.detach();
    self.sources.clear();
    event!(Level::DEBUG, index = self.index, "Upstream ended, foreign transform detached.");
  }

  fn detach(&mut self) {
    if let Some(id) = self.listener.take() {
      if !self.transform.remove_listener(id) {
        event!(Level::WARN, index = self.index, "Foreign transform had already dropped the adapter listener.");
      }
      self.transform.end();
      self.outputs.close();
    }
  }
}

impl Drop for Bridge {
  fn drop(&mut self) {
    // Covers subscribers that stop listening before the upstream ends.
    self.detach();
  }
}
