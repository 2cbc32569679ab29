// weir/src/core/batch.rs

//! Defines `EventBatch`, the ordered group of events emitted as one tick.

use crate::core::event::Event;
use crate::stream::Coalesce;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBatch {
  events: Vec<Event>,
}

impl EventBatch {
  pub fn new(events: Vec<Event>) -> Self {
    Self { events }
  }

  pub fn single(event: Event) -> Self {
    Self { events: vec![event] }
  }

  pub fn events(&self) -> &[Event] {
    &self.events
  }

  pub fn into_events(self) -> Vec<Event> {
    self.events
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Event> {
    self.events.iter()
  }

  pub fn push(&mut self, event: Event) {
    self.events.push(event);
  }
}

impl From<Vec<Event>> for EventBatch {
  fn from(events: Vec<Event>) -> Self {
    Self::new(events)
  }
}

impl FromIterator<Event> for EventBatch {
  fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
    Self::new(iter.into_iter().collect())
  }
}

impl IntoIterator for EventBatch {
  type Item = Event;
  type IntoIter = std::vec::IntoIter<Event>;

  fn into_iter(self) -> Self::IntoIter {
    self.events.into_iter()
  }
}

impl<'a> IntoIterator for &'a EventBatch {
  type Item = &'a Event;
  type IntoIter = std::slice::Iter<'a, Event>;

  fn into_iter(self) -> Self::IntoIter {
    self.events.iter()
  }
}

impl Coalesce for EventBatch {
  fn coalesce(parts: Vec<Self>) -> Self {
    parts.into_iter().flat_map(EventBatch::into_events).collect()
  }
}
