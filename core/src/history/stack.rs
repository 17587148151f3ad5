//! Linear, bounded undo/redo history.
//!
//! [`OperationStack`] keeps every recorded [`Operation`] in a single
//! sequence with a cursor marking how many entries are currently applied.
//! Pushing after an undo discards the redo tail permanently.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, MutexGuard};

use super::config::OperationStackConfig;
use super::operation::{Editable, Operation, OperationResult, can_merge};
use crate::signal::Signal;

struct StackState<T: Editable> {
    entries: VecDeque<Box<dyn Operation<T>>>,
    /// Number of entries from the front that are currently applied.
    applied: usize,
}

/// Thread-safe undo/redo history.
///
/// All mutating calls serialize on one mutex, which stays held while the
/// operation's `redo`/`undo` runs. Calling back into the same stack from
/// inside an executing operation (or from an observer it triggers) would
/// deadlock; the stack detects this and panics instead.
///
/// The [`changed`](Self::changed) signal fires after the lock is released
/// whenever the history was modified, so observers may query the stack.
///
/// # Example
///
/// ```ignore
/// let stack = OperationStack::new();
/// stack.push(Box::new(TranslateOperation::new(node, delta)), &mut scene)?;
/// stack.undo(&mut scene)?;
/// stack.redo(&mut scene)?;
/// ```
pub struct OperationStack<T: Editable> {
    state: Mutex<StackState<T>>,
    executing: Mutex<Option<ThreadId>>,
    config: OperationStackConfig,
    changed: Signal<()>,
}

/// Lock guard that records the owning thread for re-entrancy detection.
struct StateGuard<'a, T: Editable> {
    guard: MutexGuard<'a, StackState<T>>,
    executing: &'a Mutex<Option<ThreadId>>,
}

impl<T: Editable> Deref for StateGuard<'_, T> {
    type Target = StackState<T>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T: Editable> DerefMut for StateGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T: Editable> Drop for StateGuard<'_, T> {
    fn drop(&mut self) {
        *self.executing.lock() = None;
    }
}

impl<T: Editable> OperationStack<T> {
    /// Creates an empty stack with the default configuration.
    pub fn new() -> Self {
        Self::with_config(OperationStackConfig::default())
    }

    /// Creates an empty stack with the given configuration.
    pub fn with_config(config: OperationStackConfig) -> Self {
        Self {
            state: Mutex::new(StackState {
                entries: VecDeque::new(),
                applied: 0,
            }),
            executing: Mutex::new(None),
            config,
            changed: Signal::new("operation_stack_changed"),
        }
    }

    /// The merge window and depth bound this stack was built with.
    pub fn config(&self) -> &OperationStackConfig {
        &self.config
    }

    /// Signal emitted after every push, undo, redo or clear that changed
    /// the history.
    pub fn changed(&self) -> &Signal<()> {
        &self.changed
    }

    fn lock_state(&self) -> StateGuard<'_, T> {
        let current = thread::current().id();
        let guard = match self.state.try_lock() {
            Some(guard) => guard,
            None => {
                if *self.executing.lock() == Some(current) {
                    panic!("re-entrant access to the operation stack from an executing operation");
                }
                self.state.lock()
            }
        };
        *self.executing.lock() = Some(current);
        StateGuard {
            guard,
            executing: &self.executing,
        }
    }

    /// Executes `operation` and records it.
    ///
    /// The operation is applied first; if it fails the history is left
    /// untouched and the error is returned. Otherwise the redo tail is
    /// discarded, the operation is appended, and the two newest entries are
    /// merged when eligible. The oldest entry is dropped once the history
    /// exceeds the configured depth.
    pub fn push(&self, mut operation: Box<dyn Operation<T>>, target: &mut T) -> OperationResult {
        {
            let mut state = self.lock_state();
            operation.redo(target)?;

            let applied = state.applied;
            if state.entries.len() > applied {
                log::debug!(
                    "Discarding {} redo entries",
                    state.entries.len() - applied
                );
                state.entries.truncate(applied);
            }

            log::debug!("Push '{}'", operation.description());
            state.entries.push_back(operation);
            state.applied = state.entries.len();

            self.merge_top(&mut state);

            let max_depth = self.config.effective_max_depth();
            while state.entries.len() > max_depth {
                if let Some(evicted) = state.entries.pop_front() {
                    log::debug!("Evicting '{}' from history", evicted.description());
                }
                state.applied -= 1;
            }
        }
        self.changed.emit(&());
        Ok(())
    }

    fn merge_top(&self, state: &mut StackState<T>) {
        let len = state.entries.len();
        if len < 2 {
            return;
        }
        let older = &state.entries[len - 2];
        let newer = &state.entries[len - 1];
        if !can_merge(older.as_ref(), newer.as_ref(), self.config.merge_window) {
            return;
        }
        let Some(merged) = newer.merge_with(older.as_ref()) else {
            return;
        };
        log::trace!("Merged '{}' into previous entry", merged.description());
        state.entries.truncate(len - 2);
        state.entries.push_back(merged);
        state.applied = state.entries.len();
    }

    /// Reverts the most recently applied entry.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. If the operation
    /// fails, the cursor does not move.
    pub fn undo(&self, target: &mut T) -> OperationResult<bool> {
        {
            let mut state = self.lock_state();
            if state.applied == 0 {
                return Ok(false);
            }
            let index = state.applied - 1;
            let entry = &mut state.entries[index];
            entry.undo(target)?;
            log::debug!("Undo '{}'", entry.description());
            state.applied = index;
        }
        self.changed.emit(&());
        Ok(true)
    }

    /// Re-applies the entry after the cursor.
    ///
    /// Returns `Ok(false)` when there is nothing to redo. If the operation
    /// fails, the cursor does not move.
    pub fn redo(&self, target: &mut T) -> OperationResult<bool> {
        {
            let mut state = self.lock_state();
            let index = state.applied;
            let Some(entry) = state.entries.get_mut(index) else {
                return Ok(false);
            };
            entry.redo(target)?;
            log::debug!("Redo '{}'", entry.description());
            state.applied = index + 1;
        }
        self.changed.emit(&());
        Ok(true)
    }

    /// Whether at least one applied entry sits below the cursor.
    pub fn can_undo(&self) -> bool {
        self.lock_state().applied > 0
    }

    /// Whether an undone entry sits above the cursor.
    pub fn can_redo(&self) -> bool {
        let state = self.lock_state();
        state.applied < state.entries.len()
    }

    /// Number of entries in the history, applied or not.
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    /// Whether the history holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.lock_state().entries.is_empty()
    }

    /// Index of the most recently applied entry, or `None` when nothing is
    /// applied.
    pub fn current_index(&self) -> Option<usize> {
        self.lock_state().applied.checked_sub(1)
    }

    /// Descriptions of all entries in history order.
    pub fn operations(&self) -> Vec<String> {
        self.lock_state()
            .entries
            .iter()
            .map(|entry| entry.description().to_owned())
            .collect()
    }

    /// Description of the entry [`undo`](Self::undo) would revert.
    pub fn undo_description(&self) -> Option<String> {
        let state = self.lock_state();
        let index = state.applied.checked_sub(1)?;
        state
            .entries
            .get(index)
            .map(|entry| entry.description().to_owned())
    }

    /// Description of the entry [`redo`](Self::redo) would re-apply.
    pub fn redo_description(&self) -> Option<String> {
        let state = self.lock_state();
        state
            .entries
            .get(state.applied)
            .map(|entry| entry.description().to_owned())
    }

    /// Drops the whole history without touching the target.
    pub fn clear(&self) {
        {
            let mut state = self.lock_state();
            if state.entries.is_empty() {
                return;
            }
            state.entries.clear();
            state.applied = 0;
        }
        log::debug!("History cleared");
        self.changed.emit(&());
    }
}

impl<T: Editable> Default for OperationStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Editable> fmt::Debug for OperationStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("OperationStack");
        match self.state.try_lock() {
            Some(state) => debug
                .field("len", &state.entries.len())
                .field("applied", &state.applied),
            None => debug.field("state", &"<locked>"),
        };
        debug.field("config", &self.config).finish()
    }
}
