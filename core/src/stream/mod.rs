// weir/src/stream/mod.rs

//! The stream abstraction pipelines are compiled into.
//!
//! An `EventStream<T>` is a cold, cloneable description of a stream: every call
//! to `subscribe()` starts an independent `BoxStream` of `Result<T, WeirError>`.
//! Composition operators (`map`, `filter`, `merge_all`, `debounce`) build new
//! descriptions without subscribing to anything, so a compiled declaration does
//! no work until the invocation layer subscribes to its named outputs.
//!
//! `share` turns a description into a multicast one: every subscriber of the
//! shared stream is fed from a single upstream subscription. The compiler
//! shares registered pipelines and the upstream of a `merge`, so a source
//! consumed by several branches still runs once.
//!
//! Termination is the end of the underlying `BoxStream`: every operator here
//! ends its output exactly once, after its upstream(s) ended.

pub mod debounce;
pub mod share;

pub use debounce::Coalesce;

use crate::error::WeirError;
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Values that can travel through a compiled pipeline.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}

pub type StreamResult<T> = Result<T, WeirError>;

type SubscribeFn<T> = dyn Fn() -> BoxStream<'static, StreamResult<T>> + Send + Sync;

pub struct EventStream<T> {
  subscribe: Arc<SubscribeFn<T>>,
  shared: bool,
}

impl<T> Clone for EventStream<T> {
  fn clone(&self) -> Self {
    Self {
      subscribe: Arc::clone(&self.subscribe),
      shared: self.shared,
    }
  }
}

impl<T> fmt::Debug for EventStream<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventStream")
      .field("item_type", &std::any::type_name::<T>())
      .field("shared", &self.shared)
      .finish()
  }
}

impl<T: Send + 'static> EventStream<T> {
  /// Builds a stream from a factory invoked once per subscription.
  pub fn from_fn<F, S>(factory: F) -> Self
  where
    F: Fn() -> S + Send + Sync + 'static,
    S: Stream<Item = StreamResult<T>> + Send + 'static,
  {
    Self {
      subscribe: Arc::new(move || factory().boxed()),
      shared: false,
    }
  }

  pub fn subscribe(&self) -> BoxStream<'static, StreamResult<T>> {
    (self.subscribe)()
  }

  /// A stream that never emits and never ends.
  pub fn never() -> Self {
    Self::from_fn(stream::pending::<StreamResult<T>>)
  }

  /// A stream that ends without emitting.
  pub fn empty() -> Self {
    Self::from_fn(stream::empty::<StreamResult<T>>)
  }

  pub fn map<U, F>(&self, f: F) -> EventStream<U>
  where
    U: Send + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
  {
    let upstream = self.clone();
    let f = Arc::new(f);
    EventStream::from_fn(move || {
      let f = Arc::clone(&f);
      upstream.subscribe().map(move |item| item.map(|value| (*f)(value)))
    })
  }

  /// Keeps values matching `predicate`. Errors always pass.
  pub fn filter<F>(&self, predicate: F) -> Self
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    let upstream = self.clone();
    let predicate = Arc::new(predicate);
    Self::from_fn(move || {
      let predicate = Arc::clone(&predicate);
      upstream.subscribe().filter(move |item| {
        let keep = match item {
          Ok(value) => (*predicate)(value),
          Err(_) => true,
        };
        future::ready(keep)
      })
    })
  }

  /// Union of `streams`: emits whenever any of them emits, ends once all ended.
  pub fn merge_all(streams: Vec<EventStream<T>>) -> Self {
    let streams = Arc::new(streams);
    Self::from_fn(move || stream::select_all(streams.iter().map(EventStream::subscribe)))
  }

  /// Coalesces values arriving within a trailing quiet `window` into one.
  pub fn debounce(&self, window: Duration) -> Self
  where
    T: Coalesce,
  {
    debounce::debounce(self.clone(), window)
  }
}

impl<T: Payload> EventStream<T> {
  /// Emits `value` once, then ends.
  pub fn constant(value: T) -> Self {
    Self::from_fn(move || stream::iter(std::iter::once(Ok(value.clone()))))
  }

  /// Multicast version of this stream. Sharing twice is a no-op.
  pub fn share(&self) -> Self {
    if self.shared {
      return self.clone();
    }
    share::share(self.clone())
  }

  pub fn is_shared(&self) -> bool {
    self.shared
  }

  /// Emits every value in order, then ends.
  pub fn from_values(values: Vec<T>) -> Self {
    Self::from_fn(move || stream::iter(values.clone().into_iter().map(Ok)))
  }
}

/// The output of compiling a node.
///
/// `Init` marks "no upstream yet": the base case a root pipeline is compiled
/// against. Combinators match on it instead of comparing stream identity.
pub enum Flow<T> {
  Init,
  Stream(EventStream<T>),
}

impl<T> Clone for Flow<T> {
  fn clone(&self) -> Self {
    match self {
      Flow::Init => Flow::Init,
      Flow::Stream(stream) => Flow::Stream(stream.clone()),
    }
  }
}

impl<T> fmt::Debug for Flow<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Flow::Init => f.write_str("Flow::Init"),
      Flow::Stream(stream) => f.debug_tuple("Flow::Stream").field(stream).finish(),
    }
  }
}

impl<T> Flow<T> {
  pub fn is_init(&self) -> bool {
    matches!(self, Flow::Init)
  }

  pub fn stream(&self) -> Option<&EventStream<T>> {
    match self {
      Flow::Init => None,
      Flow::Stream(stream) => Some(stream),
    }
  }

  pub fn into_stream(self) -> Option<EventStream<T>> {
    match self {
      Flow::Init => None,
      Flow::Stream(stream) => Some(stream),
    }
  }

  /// The upstream stream, or a `MalformedTree` error naming `plugin` when there is none.
  pub fn require_stream(&self, plugin: &str) -> Result<EventStream<T>, WeirError> {
    self
      .stream()
      .cloned()
      .ok_or_else(|| WeirError::malformed(format!("plugin `{}' needs an upstream stream", plugin)))
  }
}

impl<T: Payload> Flow<T> {
  /// The same flow with its stream, if any, multicast.
  pub fn shared(self) -> Self {
    match self {
      Flow::Init => Flow::Init,
      Flow::Stream(stream) => Flow::Stream(stream.share()),
    }
  }
}

impl<T> From<EventStream<T>> for Flow<T> {
  fn from(stream: EventStream<T>) -> Self {
    Flow::Stream(stream)
  }
}
