//! # Meridian Scene
//!
//! The scene graph of the Meridian editor and the undoable operations that
//! edit it.
//!
//! - [`Scene`]: node arena with a single root, change signals, the active
//!   camera and the current [`Selection`]
//! - [`SceneNode`]: local transform, optional shared [`MeshData`], flags and
//!   capability [decorators](decorator)
//! - [`operations`]: transform and structural [`Operation`](meridian_core::history::Operation)s
//!   recorded on an [`OperationStack<Scene>`](meridian_core::history::OperationStack)
//!
//! World transforms are never cached; they are composed through the parent
//! chain on every query, so an ancestor change is visible immediately.
//!
//! # Threading
//!
//! One UI thread owns the write side. Worker threads get a [`SharedScene`]
//! and only take read locks; edits they produce travel through an
//! [`OperationQueue`](meridian_core::history::OperationQueue).

pub mod decorator;
pub mod iter;
pub mod mesh;
pub mod node;
pub mod operations;
pub mod scene;
pub mod selection;

pub use decorator::{CameraDecorator, DecorationValue, GroupDecorator, SceneNodeDecorator};
pub use iter::{BreadthFirstIterator, DepthFirstIterator};
pub use mesh::MeshData;
pub use node::{NodeId, SceneNode};
pub use scene::{Scene, SceneError, SceneSignals, SharedScene};
pub use selection::{OperationInfo, Selection};
