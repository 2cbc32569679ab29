pub mod batch;
pub mod event;

pub use batch::EventBatch;
pub use event::{Event, EventKind, SourceMap};
