//! Undoable scene edits.
//!
//! Every operation here implements [`Operation<Scene>`](meridian_core::history::Operation)
//! and is meant to be pushed onto an
//! [`OperationStack<Scene>`](meridian_core::history::OperationStack).
//!
//! Transform operations record the node's local transform before their
//! first `redo` and the resulting local transform after it. Later `redo`
//! calls write that absolute result, so repeating them is harmless, and two
//! consecutive transform operations of the same kind on the same node merge
//! into one undo step.
//!
//! Structural operations remember where a node sat in its parent's child
//! list and which nodes of its subtree were selected, and restore both on
//! undo.

mod structure;
mod transform;

pub use structure::{AddSceneNodeOperation, RemoveSceneNodeOperation, SetParentOperation};
pub use transform::{
    MirrorOperation, RotateOperation, ScaleOperation, SetTransformOperation, TranslateOperation,
};
