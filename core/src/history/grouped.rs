use std::fmt;
use std::time::Instant;

use super::operation::{
    Editable, Operation, OperationError, OperationKind, OperationResult, can_merge,
};

/// Several operations recorded as a single history entry.
///
/// Children run in insertion order on redo and in reverse order on undo, so
/// dependent edits (remove then reparent) invert correctly. If a child
/// fails, the children already run in this pass are rolled back before the
/// error is returned, leaving the target as it was.
///
/// The group becomes *finalized* on its first [`redo`](Operation::redo);
/// after that [`add_operation`](Self::add_operation) is rejected.
pub struct GroupedOperation<T: Editable> {
    operations: Vec<Box<dyn Operation<T>>>,
    description: String,
    finalized: bool,
    created: Instant,
}

impl<T: Editable> GroupedOperation<T> {
    /// Creates an empty, unfinalized group.
    pub fn new() -> Self {
        Self::with_description("Grouped operation")
    }

    /// Creates an empty group with a custom edit-menu description.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            operations: Vec::new(),
            description: description.into(),
            finalized: false,
            created: Instant::now(),
        }
    }

    /// Appends a child operation.
    ///
    /// Fails with [`OperationError::GroupFinalized`] once the group has been
    /// executed.
    pub fn add_operation(&mut self, operation: Box<dyn Operation<T>>) -> OperationResult {
        if self.finalized {
            return Err(OperationError::GroupFinalized);
        }
        self.operations.push(operation);
        Ok(())
    }

    /// The child operations in execution order.
    pub fn operations(&self) -> &[Box<dyn Operation<T>>] {
        &self.operations
    }

    /// Number of child operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the group has no children yet.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Whether the group has been applied and no longer accepts children.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl<T: Editable> Default for GroupedOperation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Editable> fmt::Debug for GroupedOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupedOperation")
            .field("description", &self.description)
            .field("operations", &self.operations)
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl<T: Editable> Operation<T> for GroupedOperation<T> {
    fn redo(&mut self, target: &mut T) -> OperationResult {
        self.finalized = true;
        for index in 0..self.operations.len() {
            if let Err(err) = self.operations[index].redo(target) {
                for applied in self.operations[..index].iter_mut().rev() {
                    if let Err(rollback) = applied.undo(target) {
                        log::warn!("Rollback of '{}' failed: {rollback}", applied.description());
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo(&mut self, target: &mut T) -> OperationResult {
        let count = self.operations.len();
        for index in (0..count).rev() {
            if let Err(err) = self.operations[index].undo(target) {
                for undone in self.operations[index + 1..].iter_mut() {
                    if let Err(rollback) = undone.redo(target) {
                        log::warn!("Rollback of '{}' failed: {rollback}", undone.description());
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Grouped
    }

    fn timestamp(&self) -> Instant {
        self.created
    }

    /// Merges child-wise with an older group of the same shape.
    fn merge_with(&self, older: &dyn Operation<T>) -> Option<Box<dyn Operation<T>>> {
        let older = older.as_any().downcast_ref::<GroupedOperation<T>>()?;
        if older.operations.len() != self.operations.len() || self.operations.is_empty() {
            return None;
        }

        let mut merged = Vec::with_capacity(self.operations.len());
        for (old, new) in older.operations.iter().zip(&self.operations) {
            if !can_merge(old.as_ref(), new.as_ref(), None) {
                return None;
            }
            merged.push(new.merge_with(old.as_ref())?);
        }

        log::trace!("Merged group of {} operations", merged.len());
        Some(Box::new(GroupedOperation {
            operations: merged,
            description: self.description.clone(),
            finalized: true,
            created: self.created,
        }))
    }
}
