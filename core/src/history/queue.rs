//! Thread-safe hand-off of operations to the thread that owns the history.
//!
//! Worker threads only read the document. When they need an edit recorded
//! (a mesh finished loading and must be added to the scene), they build the
//! operation and submit it to an [`OperationQueue`]; the UI thread drains
//! the queue into its [`OperationStack`](super::OperationStack).

use std::fmt;

use parking_lot::Mutex;

use super::operation::{Editable, Operation, OperationResult};
use super::stack::OperationStack;

/// A thread-safe queue of pending [`Operation`]s.
pub struct OperationQueue<T: Editable> {
    queue: Mutex<Vec<Box<dyn Operation<T>>>>,
}

impl<T: Editable> OperationQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Enqueues an operation. Callable from `&self` on any thread.
    pub fn push(&self, operation: Box<dyn Operation<T>>) {
        self.queue.lock().push(operation);
    }

    /// Takes all queued operations in submission order.
    pub fn drain(&self) -> Vec<Box<dyn Operation<T>>> {
        std::mem::take(&mut *self.queue.lock())
    }

    /// Pushes every queued operation onto `stack` in submission order.
    ///
    /// Stops at the first failing operation and returns its error; the
    /// operations after it are dropped. Returns how many were recorded.
    pub fn drain_into(&self, stack: &OperationStack<T>, target: &mut T) -> OperationResult<usize> {
        let pending = self.drain();
        let total = pending.len();
        for (index, operation) in pending.into_iter().enumerate() {
            if let Err(err) = stack.push(operation, target) {
                log::warn!(
                    "Queued operation failed, dropping {} remaining",
                    total - index - 1
                );
                return Err(err);
            }
        }
        Ok(total)
    }

    /// Number of operations waiting to be drained.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T: Editable> Default for OperationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Editable> fmt::Debug for OperationQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationQueue")
            .field("pending", &self.len())
            .finish()
    }
}
