// weir/src/adapter/foreign.rs

//! The contract of a foreign per-item transform and helpers for implementing one.

use crate::core::SourceMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Adapter-generated key linking a pushed item back to its originating event.
pub type CorrelationId = Uuid;

/// One file as a foreign transform sees it.
///
/// Transforms must derive their outputs from the pushed item (`with_contents`,
/// `with_source_map`, or a clone) so the correlation id travels along. Items
/// built from scratch with `ForeignItem::new` carry none and are rejected by
/// the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignItem {
  pub contents: Vec<u8>,
  pub path: String,
  pub base: String,
  pub source_map: Option<SourceMap>,
  correlation: Option<CorrelationId>,
}

impl ForeignItem {
  pub fn new(contents: impl Into<Vec<u8>>, path: impl Into<String>, base: impl Into<String>) -> Self {
    Self {
      contents: contents.into(),
      path: path.into(),
      base: base.into(),
      source_map: None,
      correlation: None,
    }
  }

  pub(crate) fn correlated(mut self, id: CorrelationId) -> Self {
    self.correlation = Some(id);
    self
  }

  pub fn correlation(&self) -> Option<CorrelationId> {
    self.correlation
  }

  pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
    self.contents = contents.into();
    self
  }

  pub fn with_source_map(mut self, source_map: Option<SourceMap>) -> Self {
    self.source_map = source_map;
    self
  }
}

pub type ForeignListener = Arc<dyn Fn(ForeignItem) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A transform designed for a per-item, push-based model.
///
/// Items are pushed one at a time; outputs are delivered to the registered
/// listeners whenever the transform decides, possibly from another task and
/// possibly after `push` returned, until `end` is called.
pub trait ForeignTransform: Send {
  fn push(&mut self, item: ForeignItem) -> anyhow::Result<()>;

  fn add_listener(&mut self, listener: ForeignListener) -> ListenerId;

  /// Returns false when `id` was not registered.
  fn remove_listener(&mut self, id: ListenerId) -> bool;

  /// No further items will be pushed.
  fn end(&mut self);
}

/// A cloneable set of output listeners, shareable with tasks a transform spawns.
#[derive(Clone, Default)]
pub struct Listeners {
  inner: Arc<Mutex<ListenerSlots>>,
}

#[derive(Default)]
struct ListenerSlots {
  next_id: u64,
  slots: Vec<(ListenerId, ForeignListener)>,
}

impl Listeners {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&self, listener: ForeignListener) -> ListenerId {
    let mut guard = self.inner.lock();
    let id = ListenerId(guard.next_id);
    guard.next_id += 1;
    guard.slots.push((id, listener));
    id
  }

  pub fn remove(&self, id: ListenerId) -> bool {
    let mut guard = self.inner.lock();
    let before = guard.slots.len();
    guard.slots.retain(|(slot, _)| *slot != id);
    guard.slots.len() != before
  }

  /// Delivers `item` to every listener registered right now.
  pub fn emit(&self, item: ForeignItem) {
    // Listeners run outside the lock so they may add or remove listeners.
    let listeners: Vec<ForeignListener> = self.inner.lock().slots.iter().map(|(_, l)| Arc::clone(l)).collect();
    for listener in listeners {
      listener(item.clone());
    }
  }

  pub fn len(&self) -> usize {
    self.inner.lock().slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl fmt::Debug for Listeners {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Listeners").field("registered", &self.len()).finish()
  }
}

/// A synchronous foreign transform: every pushed item is mapped and emitted immediately.
pub struct MapTransform<F> {
  map: F,
  listeners: Listeners,
  ended: bool,
}

impl<F> MapTransform<F>
where
  F: Fn(ForeignItem) -> anyhow::Result<ForeignItem> + Send,
{
  pub fn new(map: F) -> Self {
    Self {
      map,
      listeners: Listeners::new(),
      ended: false,
    }
  }

  pub fn listeners(&self) -> &Listeners {
    &self.listeners
  }
}

impl<F> ForeignTransform for MapTransform<F>
where
  F: Fn(ForeignItem) -> anyhow::Result<ForeignItem> + Send,
{
  fn push(&mut self, item: ForeignItem) -> anyhow::Result<()> {
    if self.ended {
      anyhow::bail!("push after end");
    }
    let output = (self.map)(item)?;
    self.listeners.emit(output);
    Ok(())
  }

  fn add_listener(&mut self, listener: ForeignListener) -> ListenerId {
    self.listeners.add(listener)
  }

  fn remove_listener(&mut self, id: ListenerId) -> bool {
    self.listeners.remove(id)
  }

  fn end(&mut self) {
    self.ended = true;
  }
}
