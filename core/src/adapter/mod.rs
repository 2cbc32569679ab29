// weir/src/adapter/mod.rs

//! Support for third-party transforms written for a per-item, push-based model.

pub mod bridge;
pub mod foreign;

pub use bridge::{ForeignAdapter, TransformFactory};
pub use foreign::{CorrelationId, ForeignItem, ForeignListener, ForeignTransform, ListenerId, Listeners, MapTransform};
