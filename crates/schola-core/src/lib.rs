//! Schola Core - composite command execution engine
//!
//! This crate provides:
//! - The execution context state machine with synchronous state listeners
//! - The command contract and an adapter for plain do / undo business leaves
//! - Composite (macro) commands with sequential, parallel and independent
//!   strategies, undo in reverse order and compensation of failed composites
//! - Action executor hooks committing / rolling back side effects per nested
//!   command
//! - Worker pools, engine configuration, and the error / logging facilities

pub mod action;
pub mod commands;
pub mod composite;
pub mod config;
pub mod context;
pub mod errors;
pub mod logging_facility;
pub mod pool;

#[doc(hidden)]
pub use schola_core_types as types;

// Re-export commonly used types
pub use action::{ActionExecutor, NoopActionExecutor, TracingActionExecutor};
pub use commands::{AtomicCommand, Command, DoOutcome, Leaf, NestedCommand};
pub use composite::{
    CompositeCommand, IndependentCommand, ParallelCommand, ResultPolicy, SequentialCommand,
};
pub use config::EngineConfig;
pub use context::{Context, ContextHandle, Parameter, Payload, State};
pub use errors::{CommandError, ExError, ExErrorKind, Result};
pub use pool::{InlineWorkerPool, RayonWorkerPool, WorkerPool};
pub use schola_core_types::ActionContext;
