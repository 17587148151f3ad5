//! Scene graph nodes.

use std::fmt;
use std::sync::Arc;

use meridian_core::math::{Mat4, Transform};

use crate::decorator::SceneNodeDecorator;
use crate::mesh::MeshData;

slotmap::new_key_type! {
    /// Stable handle of a node inside a [`Scene`](crate::Scene).
    ///
    /// Handles stay valid while the node is detached, so history operations
    /// can re-attach a node they removed earlier.
    pub struct NodeId;
}

/// A node of the scene graph.
///
/// Nodes are owned by the [`Scene`](crate::Scene) arena and only refer to
/// each other by [`NodeId`]. The parent link is a plain back-reference; the
/// child list is the owning side of the relation. All mutation goes through
/// `Scene` so that hierarchy invariants hold and change signals fire.
pub struct SceneNode {
    pub(crate) name: String,
    pub(crate) transform: Transform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) mesh: Option<Arc<MeshData>>,
    pub(crate) locked: bool,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) selectable: bool,
    pub(crate) decorators: Vec<Box<dyn SceneNodeDecorator>>,
}

impl SceneNode {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            parent: None,
            children: Vec::new(),
            mesh: None,
            locked: false,
            visible: true,
            enabled: true,
            selectable: true,
            decorators: Vec::new(),
        }
    }

    /// Display name; not required to be unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The transform relative to the parent.
    pub fn local_transform(&self) -> &Transform {
        &self.transform
    }

    /// The local transform composed into a matrix (T·R·S).
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.to_matrix()
    }

    /// `None` for the root and for detached nodes.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Shared mesh payload, if any.
    pub fn mesh_data(&self) -> Option<&Arc<MeshData>> {
        self.mesh.as_ref()
    }

    /// Locked nodes refuse transform edits.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The node's own visibility flag, ignoring ancestors.
    pub fn visible_flag(&self) -> bool {
        self.visible
    }

    /// The node's own enabled flag, ignoring ancestors.
    pub fn enabled_flag(&self) -> bool {
        self.enabled
    }

    /// The node's own selectable flag, ignoring ancestors.
    pub fn selectable_flag(&self) -> bool {
        self.selectable
    }

    /// Attached decorators in attachment order.
    pub fn decorators(&self) -> impl Iterator<Item = &dyn SceneNodeDecorator> {
        self.decorators.iter().map(|d| d.as_ref())
    }

    /// Looks up an attached decorator by name.
    pub fn decorator(&self, name: &str) -> Option<&dyn SceneNodeDecorator> {
        self.decorators
            .iter()
            .find(|d| d.name() == name)
            .map(|d| d.as_ref())
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorator(name).is_some()
    }

    /// Whether any attached decorator implements `capability`.
    pub fn supports(&self, capability: &str) -> bool {
        self.decorators
            .iter()
            .any(|d| d.capabilities().contains(&capability))
    }

    pub(crate) fn decorator_for_mut(
        &mut self,
        capability: &str,
    ) -> Option<&mut Box<dyn SceneNodeDecorator>> {
        self.decorators
            .iter_mut()
            .find(|d| d.capabilities().contains(&capability))
    }

    pub(crate) fn child_index(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("has_mesh", &self.mesh.is_some())
            .field("locked", &self.locked)
            .field("decorators", &self.decorators)
            .finish()
    }
}
