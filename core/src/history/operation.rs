//! Editable targets and reversible operations.

use std::any::Any;
use std::fmt;
use std::time::{Duration, Instant};

/// Helper trait for downcasting trait objects to concrete types.
///
/// Automatically implemented for all `'static` types. Used by
/// [`Operation::merge_with`] to downcast `&dyn Operation<T>` to the
/// concrete operation type.
pub trait AsAny: 'static {
    /// Returns a reference to `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A document that operations mutate.
///
/// `Key` identifies the object inside the document an operation targets.
/// Two operations may only merge when their keys are equal.
pub trait Editable: 'static {
    /// Stable identifier of an object inside the document.
    type Key: Copy + Eq + fmt::Debug + Send + Sync + 'static;
}

/// Tag identifying the logical kind of an operation.
///
/// Merge eligibility is decided on this tag rather than on concrete types,
/// so wrappers and proxies can take part in merging as long as they report
/// the kind they stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Translate,
    Rotate,
    Scale,
    Mirror,
    SetTransform,
    AddNode,
    RemoveNode,
    SetParent,
    Grouped,
    /// Application-defined kind.
    Custom(&'static str),
}

/// Error type for operation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// The object the operation refers to does not exist.
    #[error("target not found: {0}")]
    TargetNotFound(String),
    /// The target is in a state the operation cannot work with.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A child was added to a group that has already been executed.
    #[error("cannot add operations to a finalized group")]
    GroupFinalized,
    /// A structural scene error surfaced through an operation.
    #[error("scene error: {0}")]
    Scene(String),
    /// A custom error with a description.
    #[error("{0}")]
    Custom(String),
}

/// Result type for operation execution.
pub type OperationResult<T = ()> = Result<T, OperationError>;

/// A reversible edit (Command pattern).
///
/// An operation captures enough state to undo its effect exactly. The
/// [`OperationStack`](super::OperationStack) calls [`redo`](Self::redo) once
/// when the operation is pushed, then alternates `undo`/`redo` on request.
/// Operations are never run out of order.
///
/// `redo` should set absolute values wherever possible, so that calling it
/// twice in a row leaves the target in the same state as calling it once.
///
/// # Merging
///
/// Continuous edits (every mouse move during a drag) override
/// [`merge_with`](Self::merge_with) to combine with the preceding entry.
/// The stack only asks when [`can_merge`] holds for the pair.
///
/// ```ignore
/// fn merge_with(&self, older: &dyn Operation<Scene>) -> Option<Box<dyn Operation<Scene>>> {
///     let older = older.as_any().downcast_ref::<Self>()?;
///     Some(Box::new(Self {
///         before: older.before,
///         after: self.after,
///         ..self.clone()
///     }))
/// }
/// ```
pub trait Operation<T: Editable>: fmt::Debug + AsAny + Send {
    /// Applies the operation's effect to the target.
    fn redo(&mut self, target: &mut T) -> OperationResult;

    /// Restores the state captured before [`redo`](Self::redo).
    fn undo(&mut self, target: &mut T) -> OperationResult;

    /// A short, human-readable description for the edit menu.
    fn description(&self) -> &str;

    /// The logical kind used for merge eligibility.
    fn kind(&self) -> OperationKind;

    /// The object this operation edits, if it edits a single one.
    fn target(&self) -> Option<T::Key> {
        None
    }

    /// When the operation was created.
    fn timestamp(&self) -> Instant;

    /// Whether this operation merges regardless of the merge window.
    fn always_merge(&self) -> bool {
        false
    }

    /// Combines `older` followed by `self` into a new operation.
    ///
    /// The result takes its "before" state from `older` and its "after"
    /// state from `self`, and must be in the executed state. Returns `None`
    /// when the two cannot be combined; that is an ordinary outcome.
    fn merge_with(&self, older: &dyn Operation<T>) -> Option<Box<dyn Operation<T>>> {
        let _ = older;
        None
    }
}

/// Whether `newer` is eligible to merge with the `older` entry before it.
///
/// Both must share kind and target. Unless either opts into
/// [`Operation::always_merge`], they must also have been created within
/// `window` of each other; a `None` window disables the time check.
pub fn can_merge<T: Editable>(
    older: &dyn Operation<T>,
    newer: &dyn Operation<T>,
    window: Option<Duration>,
) -> bool {
    if older.kind() != newer.kind() || older.target() != newer.target() {
        return false;
    }
    if older.always_merge() || newer.always_merge() {
        return true;
    }
    match window {
        Some(window) => {
            newer
                .timestamp()
                .saturating_duration_since(older.timestamp())
                <= window
        }
        None => true,
    }
}
