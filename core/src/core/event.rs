// weir/src/core/event.rs

//! Defines `Event`, one filesystem change notification flowing through a pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
  Add,
  Change,
  Unlink,
}

impl EventKind {
  /// `add` and `change` carry file contents, `unlink` does not.
  pub fn carries_data(self) -> bool {
    matches!(self, EventKind::Add | EventKind::Change)
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      EventKind::Add => "add",
      EventKind::Change => "change",
      EventKind::Unlink => "unlink",
    };
    f.write_str(name)
  }
}

/// Opaque debug-mapping payload attached by an upstream transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMap(Arc<str>);

impl SourceMap {
  pub fn new(raw: impl Into<Arc<str>>) -> Self {
    SourceMap(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// A single change to a file under `base_path`.
///
/// Events are values: a transform that rewrites contents produces a new `Event`
/// through `with_data`/`with_source_map`, so branches sharing an upstream never
/// observe each other's edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
  kind: EventKind,
  project_path: String,
  base_path: String,
  data: Option<String>,
  source_map: Option<SourceMap>,
}

impl Event {
  pub fn add(project_path: impl Into<String>, base_path: impl Into<String>, data: impl Into<String>) -> Self {
    Self::with_contents(EventKind::Add, project_path, base_path, data)
  }

  pub fn change(project_path: impl Into<String>, base_path: impl Into<String>, data: impl Into<String>) -> Self {
    Self::with_contents(EventKind::Change, project_path, base_path, data)
  }

  pub fn unlink(project_path: impl Into<String>, base_path: impl Into<String>) -> Self {
    Self {
      kind: EventKind::Unlink,
      project_path: project_path.into(),
      base_path: base_path.into(),
      data: None,
      source_map: None,
    }
  }

  fn with_contents(
    kind: EventKind,
    project_path: impl Into<String>,
    base_path: impl Into<String>,
    data: impl Into<String>,
  ) -> Self {
    Self {
      kind,
      project_path: project_path.into(),
      base_path: base_path.into(),
      data: Some(data.into()),
      source_map: None,
    }
  }

  pub fn kind(&self) -> EventKind {
    self.kind
  }

  pub fn project_path(&self) -> &str {
    &self.project_path
  }

  pub fn base_path(&self) -> &str {
    &self.base_path
  }

  pub fn data(&self) -> Option<&str> {
    self.data.as_deref()
  }

  pub fn source_map(&self) -> Option<&SourceMap> {
    self.source_map.as_ref()
  }

  /// Full path of the file: the base joined with the project path.
  pub fn path(&self) -> PathBuf {
    Path::new(&self.base_path).join(&self.project_path)
  }

  /// Extension of the project path, e.g. `js` for `lib/a.js`.
  pub fn file_type(&self) -> Option<&str> {
    Path::new(&self.project_path).extension().and_then(|ext| ext.to_str())
  }

  pub fn with_data(mut self, data: impl Into<String>) -> Self {
    self.data = Some(data.into());
    self
  }

  pub fn with_source_map(mut self, source_map: Option<SourceMap>) -> Self {
    self.source_map = source_map;
    self
  }
}
