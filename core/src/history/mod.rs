//! Reversible operations and undo/redo history.
//!
//! This module provides the generic command engine of the editor. It is
//! decoupled from any concrete document so that the scene crate (or a
//! test double) can supply its own target and operations.
//!
//! - [`Editable`]: trait for documents that operations mutate
//! - [`Operation`]: a reversible edit (Command pattern) with merge support
//! - [`GroupedOperation`]: several operations applied and undone as one step
//! - [`OperationStack`]: bounded, mutex-guarded linear undo/redo history
//! - [`OperationQueue`]: thread-safe hand-off of operations built off the UI thread
//!
//! # Merging
//!
//! After every push the stack tries to merge the two newest entries. Two
//! entries are merge candidates when they have the same [`OperationKind`]
//! and the same target, and when they were created within the configured
//! merge window. The newer operation then decides through
//! [`Operation::merge_with`] whether it can absorb the older one. Continuous
//! drags therefore collapse into a single undo step.
//!
//! # Re-entrancy
//!
//! The stack holds its lock while an operation runs. An operation that
//! pushes to, undoes or redoes the stack executing it is a programming
//! error and panics instead of deadlocking.

mod config;
mod grouped;
mod operation;
mod queue;
mod stack;

pub use config::{ConfigError, DEFAULT_MAX_DEPTH, DEFAULT_MERGE_WINDOW, OperationStackConfig};
pub use grouped::GroupedOperation;
pub use operation::{
    AsAny, Editable, Operation, OperationError, OperationKind, OperationResult, can_merge,
};
pub use queue::OperationQueue;
pub use stack::OperationStack;
