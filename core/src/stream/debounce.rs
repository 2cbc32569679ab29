// weir/src/stream/debounce.rs

//! Trailing-window buffering debounce.
//!
//! Values arriving while the window is open are buffered; once no value has
//! arrived for a whole window after the last one, everything buffered is
//! flushed as a single value built with `Coalesce::coalesce`.

use crate::stream::{EventStream, StreamResult};
use futures::stream::{self, BoxStream, StreamExt};
use std::mem;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Combines several buffered values into one, preserving arrival order.
pub trait Coalesce: Sized {
  fn coalesce(parts: Vec<Self>) -> Self;
}

impl<U> Coalesce for Vec<U> {
  fn coalesce(parts: Vec<Self>) -> Self {
    parts.into_iter().flatten().collect()
  }
}

pub(crate) fn debounce<T>(upstream: EventStream<T>, window: Duration) -> EventStream<T>
where
  T: Coalesce + Send + 'static,
{
  EventStream::from_fn(move || {
    let state = DebounceState {
      upstream: upstream.subscribe(),
      pending: Vec::new(),
      deadline: None,
      upstream_done: false,
    };
    stream::unfold(state, move |mut state| async move {
      let item = state.next_item(window).await?;
      Some((item, state))
    })
  })
}

struct DebounceState<T> {
  upstream: BoxStream<'static, StreamResult<T>>,
  pending: Vec<T>,
  deadline: Option<Instant>,
  upstream_done: bool,
}

enum Wake<T> {
  Arrival(Option<StreamResult<T>>),
  Quiet,
}

impl<T: Coalesce + Send> DebounceState<T> {
  async fn next_item(&mut self, window: Duration) -> Option<StreamResult<T>> {
    loop {
      if self.upstream_done {
        // Whatever is still buffered goes out right away, then the stream ends.
        return self.flush().map(Ok);
      }

      let wake = match self.deadline {
        Some(deadline) => {
          tokio::select! {
            biased;
            item = self.upstream.next() => Wake::Arrival(item),
            _ = sleep_until(deadline) => Wake::Quiet,
          }
        }
        None => Wake::Arrival(self.upstream.next().await),
      };

      match wake {
        Wake::Quiet => {
          self.deadline = None;
          if let Some(flushed) = self.flush() {
            return Some(Ok(flushed));
          }
        }
        Wake::Arrival(Some(Ok(value))) => {
          self.pending.push(value);
          self.deadline = Some(Instant::now() + window);
        }
        Wake::Arrival(Some(Err(err))) => return Some(Err(err)),
        Wake::Arrival(None) => self.upstream_done = true,
      }
    }
  }

  fn flush(&mut self) -> Option<T> {
    if self.pending.is_empty() {
      None
    } else {
      Some(T::coalesce(mem::take(&mut self.pending)))
    }
  }
}
