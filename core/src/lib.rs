// src/lib.rs

//! Weir: a declarative, continuously reactive build-pipeline engine.
//!
//! Users declare named pipelines as operation trees over a stream of filesystem
//! change events. Weir compiles each declaration into a live graph of streams
//! that recomputes outputs as files change:
//!  - Leaf plugin calls, nested sequences and references to other pipelines.
//!  - Deterministic, strictly sequential node indexing at compile time.
//!  - Built-in combinators: `merge` (fan-in), `debounce` (time-windowed
//!    batching), `env` (environment-conditional transforms) and `pipeline`.
//!  - An adapter for foreign per-item transforms that keeps event provenance
//!    and terminates cleanly with its upstream.
//!  - Per-pipeline failure isolation when the compiled result is driven.

pub mod adapter;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod plugin;
pub mod registry;
pub mod stream;

// --- Re-exports for the Public API ---

pub use crate::core::{Event, EventBatch, EventKind, SourceMap};
pub use crate::stream::{Coalesce, EventStream, Flow, Payload, StreamResult};

pub use crate::pipeline::operation::{op, Arg, Declarations, OperationNode, PluginCall, PluginRef};
pub use crate::pipeline::compiler::{NodeRecord, PipelineCompiler};
pub use crate::pipeline::invocation::{CompiledPipelines, CompletionObserver, RunningPipelines, TracingObserver};

pub use crate::plugin::{FnPlugin, Plugin, PluginContext, PluginOutput};
pub use crate::registry::PluginRegistry;

pub use crate::adapter::{ForeignAdapter, ForeignItem, ForeignListener, ForeignTransform, ListenerId, Listeners, MapTransform};

pub use crate::config::{CompilerConfig, DEFAULT_DEBOUNCE_MS};
pub use crate::error::{WeirError, WeirResult};

/*
    Core Workflow:
    1. Build a `PluginRegistry<EventBatch>` (usually `PluginRegistry::standard()`)
       and register source plugins and `ForeignAdapter`s under their names.
    2. Declare pipelines with the `op` helpers, e.g.
       `op::seq(vec![op::source("glob", ..), op::call("babel", ..), op::call("write", ..)])`,
       and collect them into `Declarations`.
    3. Create a `PipelineCompiler` with a `CompilerConfig` and call `compile_all`.
       Nothing runs yet; a failed compile leaves nothing half-started.
    4. Call `drive(observer)` on the `CompiledPipelines` to subscribe to every
       named pipeline on its own task.
*/
