// weir/src/stream/share.rs

//! Multicasting: one upstream subscription fanned out to every subscriber.
//!
//! The upstream is subscribed when the first subscriber attaches, starts being
//! pulled when any subscriber is first polled, and is dropped when the last
//! subscriber goes away. Attaching is synchronous all the way down a chain of
//! shared streams, so every branch subscribed before the first poll sees every
//! item. Subscribers attaching while the upstream runs only see what it emits
//! from then on. Once the upstream has ended, the next subscriber starts it again.

use crate::error::WeirError;
use crate::stream::{EventStream, Payload, StreamResult};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{event, Level};

pub(crate) fn share<T: Payload>(upstream: EventStream<T>) -> EventStream<T> {
  let hub = Arc::new(Hub {
    upstream,
    state: Mutex::new(HubState {
      subscribers: Vec::new(),
      idle: None,
      pump: None,
      run: 0,
    }),
  });
  let mut shared = EventStream::from_fn(move || Subscription::attach(Arc::clone(&hub)).into_stream());
  shared.shared = true;
  shared
}

struct Hub<T> {
  upstream: EventStream<T>,
  state: Mutex<HubState<T>>,
}

struct HubState<T> {
  subscribers: Vec<mpsc::UnboundedSender<StreamResult<T>>>,
  /// Upstream subscription taken on first attach, not pulled yet.
  idle: Option<BoxStream<'static, StreamResult<T>>>,
  /// Set while the upstream subscription is being pumped.
  pump: Option<AbortHandle>,
  /// Bumped each time an upstream subscription is finished with.
  run: u64,
}

impl<T: Payload> Hub<T> {
  fn attach(&self) -> (mpsc::UnboundedReceiver<StreamResult<T>>, u64) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let mut state = self.state.lock();
    state.subscribers.push(sender);
    if state.pump.is_none() && state.idle.is_none() {
      state.idle = Some(self.upstream.subscribe());
    }
    (receiver, state.run)
  }

  /// Starts pumping for subscribers attached during `run`. A subscriber first
  /// polled after its run ended only drains what it was sent.
  fn connect(self: &Arc<Self>, run: u64) {
    let mut state = self.state.lock();
    if state.pump.is_some() || state.run != run {
      return;
    }
    let upstream = match state.idle.take() {
      Some(upstream) => upstream,
      None => self.upstream.subscribe(),
    };
    event!(Level::TRACE, subscribers = state.subscribers.len(), "Connecting shared upstream.");
    let hub = Arc::clone(self);
    let task = tokio::spawn(async move { hub.pump(upstream).await });
    state.pump = Some(task.abort_handle());
  }

  async fn pump(self: Arc<Self>, mut upstream: BoxStream<'static, StreamResult<T>>) {
    while let Some(item) = upstream.next().await {
      if !self.deliver(item) {
        event!(Level::TRACE, "Every subscriber left, shared upstream dropped.");
        return;
      }
    }
    let mut state = self.state.lock();
    // Dropping the senders ends every subscriber.
    state.subscribers.clear();
    state.pump = None;
    state.run += 1;
  }

  /// Hands `item` to every live subscriber. False when none is left.
  fn deliver(&self, item: StreamResult<T>) -> bool {
    let mut state = self.state.lock();
    state.subscribers.retain(|subscriber| !subscriber.is_closed());
    if state.subscribers.is_empty() {
      state.pump = None;
      state.run += 1;
      return false;
    }

    match item {
      Ok(value) => {
        for subscriber in &state.subscribers {
          let _ = subscriber.send(Ok(value.clone()));
        }
      }
      Err(err) if state.subscribers.len() == 1 => {
        let _ = state.subscribers[0].send(Err(err));
      }
      Err(err) => {
        let err = Arc::new(err);
        for subscriber in &state.subscribers {
          let _ = subscriber.send(Err(WeirError::Shared(Arc::clone(&err))));
        }
      }
    }
    true
  }

  fn detach(&self) {
    let mut state = self.state.lock();
    state.subscribers.retain(|subscriber| !subscriber.is_closed());
    if state.subscribers.is_empty() && (state.idle.is_some() || state.pump.is_some()) {
      state.idle = None;
      if let Some(pump) = state.pump.take() {
        pump.abort();
      }
      state.run += 1;
    }
  }
}

struct Subscription<T: Payload> {
  hub: Arc<Hub<T>>,
  receiver: mpsc::UnboundedReceiver<StreamResult<T>>,
  run: u64,
  connected: bool,
}

impl<T: Payload> Subscription<T> {
  fn attach(hub: Arc<Hub<T>>) -> Self {
    let (receiver, run) = hub.attach();
    Self {
      hub,
      receiver,
      run,
      connected: false,
    }
  }

  fn into_stream(self) -> BoxStream<'static, StreamResult<T>> {
    stream::unfold(self, |mut subscription| async move {
      // Connecting on first poll lets every branch subscribed alongside this
      // one register before anything is emitted.
      if !subscription.connected {
        subscription.connected = true;
        subscription.hub.connect(subscription.run);
      }
      let item = subscription.receiver.recv().await?;
      Some((item, subscription))
    })
    .boxed()
  }
}

impl<T: Payload> Drop for Subscription<T> {
  fn drop(&mut self) {
    self.receiver.close();
    self.hub.detach();
  }
}
