// weir/src/pipeline/mod.rs

//! Operation trees, the compiler that turns them into flows, and the observer
//! side of running the compiled result.

pub mod compiler;
pub mod invocation;
pub mod operation;

pub use compiler::{NodeRecord, PipelineCompiler};
pub use invocation::{CompiledPipelines, CompletionObserver, RunningPipelines, TracingObserver};
pub use operation::{op, Arg, Declarations, OperationNode, PluginCall, PluginRef};
