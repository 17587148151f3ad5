//! The set of selected nodes and the face sub-selection.
//!
//! A [`Selection`] belongs to a [`Scene`] rather than being process-wide
//! state; tools reach it through the scene they edit. The scene drops nodes
//! from the selection as soon as they leave the tree.

use std::fmt;

use meridian_core::history::{
    GroupedOperation, Operation, OperationKind, OperationResult, OperationStack,
};
use meridian_core::math::{AxisAlignedBox, Vec3};
use meridian_core::signal::Signal;

use crate::node::NodeId;
use crate::scene::Scene;

/// Summary of an operation built by [`Selection::apply_operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    pub kind: OperationKind,
    pub target: Option<NodeId>,
    pub description: String,
}

impl OperationInfo {
    fn of(operation: &dyn Operation<Scene>) -> Self {
        Self {
            kind: operation.kind(),
            target: operation.target(),
            description: operation.description().to_owned(),
        }
    }
}

/// Selected nodes in selection order plus an optional `(node, face)` pair.
pub struct Selection {
    nodes: Vec<NodeId>,
    face: Option<(NodeId, usize)>,
    selection_changed: Signal<()>,
    selected_face_changed: Signal<()>,
}

impl Selection {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            face: None,
            selection_changed: Signal::new("selection_changed"),
            selected_face_changed: Signal::new("selected_face_changed"),
        }
    }

    /// Emitted once per change of the selected node set.
    pub fn selection_changed(&self) -> &Signal<()> {
        &self.selection_changed
    }

    /// Emitted whenever the face sub-selection changes.
    pub fn selected_face_changed(&self) -> &Signal<()> {
        &self.selected_face_changed
    }

    /// Adds a node. Returns `false` without notifying if it was already
    /// selected. Callers go through [`Scene::select`].
    pub(crate) fn add(&mut self, id: NodeId) -> bool {
        if self.nodes.contains(&id) {
            return false;
        }
        self.nodes.push(id);
        self.selection_changed.emit(&());
        true
    }

    /// Removes a node. Returns `false` if it was not selected.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(index) = self.nodes.iter().position(|&n| n == id) else {
            return false;
        };
        self.nodes.remove(index);
        self.selection_changed.emit(&());
        true
    }

    /// Deselects every node. Notifies only if something was selected.
    pub fn clear(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        self.nodes.clear();
        self.selection_changed.emit(&());
    }

    /// Removes several nodes with at most one notification per signal.
    pub(crate) fn remove_nodes(&mut self, ids: &[NodeId]) {
        let before = self.nodes.len();
        self.nodes.retain(|id| !ids.contains(id));
        if self.nodes.len() != before {
            log::trace!("Pruned {} node(s) from selection", before - self.nodes.len());
            self.selection_changed.emit(&());
        }
        if self.face.is_some_and(|(node, _)| ids.contains(&node)) {
            self.face = None;
            self.selected_face_changed.emit(&());
        }
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_selection(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Selected nodes in the order they were selected.
    pub fn selected_nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn selected_node(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    /// World bounds of all selected subtrees that carry meshes.
    pub fn bounding_box(&self, scene: &Scene) -> Option<AxisAlignedBox> {
        self.nodes
            .iter()
            .filter_map(|&id| scene.bounding_box(id))
            .reduce(|a, b| a.merged(&b))
    }

    /// Center of the selection bounds, or the mean world position when no
    /// selected node has a mesh. `None` for an empty selection.
    pub fn center(&self, scene: &Scene) -> Option<Vec3> {
        if let Some(bounds) = self.bounding_box(scene) {
            return Some(bounds.center());
        }
        let positions: Vec<Vec3> = self
            .nodes
            .iter()
            .filter_map(|&id| scene.world_position(id))
            .collect();
        if positions.is_empty() {
            return None;
        }
        Some(positions.iter().sum::<Vec3>() / positions.len() as f32)
    }

    // ---- Face sub-selection ----

    /// Selects `(node, face)`, or clears the sub-selection if that exact
    /// face is already selected.
    pub fn toggle_face(&mut self, node: NodeId, face: usize) {
        if self.face == Some((node, face)) {
            self.face = None;
        } else {
            self.face = Some((node, face));
        }
        self.selected_face_changed.emit(&());
    }

    /// Selects a face without toggling. No notification if unchanged.
    pub fn set_face(&mut self, node: NodeId, face: usize) {
        if self.face != Some((node, face)) {
            self.face = Some((node, face));
            self.selected_face_changed.emit(&());
        }
    }

    pub fn clear_face(&mut self) {
        if self.face.take().is_some() {
            self.selected_face_changed.emit(&());
        }
    }

    pub fn selected_face(&self) -> Option<(NodeId, usize)> {
        self.face
    }

    pub fn is_face_selected(&self, node: NodeId, face: usize) -> bool {
        self.face == Some((node, face))
    }

    // ---- Operations ----

    /// Builds one operation per selected node with `factory` and pushes
    /// them onto `stack` as a single undo step.
    ///
    /// Returns `Ok(None)` when nothing is selected. A single selected node
    /// gets its operation pushed directly; several are wrapped in a
    /// [`GroupedOperation`]. The returned list describes the individual
    /// operations in selection order.
    pub fn apply_operation<F>(
        scene: &mut Scene,
        stack: &OperationStack<Scene>,
        mut factory: F,
    ) -> OperationResult<Option<Vec<OperationInfo>>>
    where
        F: FnMut(NodeId) -> Box<dyn Operation<Scene>>,
    {
        let nodes = scene.selection().selected_nodes().to_vec();
        match nodes.as_slice() {
            [] => Ok(None),
            [node] => {
                let operation = factory(*node);
                let info = OperationInfo::of(operation.as_ref());
                stack.push(operation, scene)?;
                Ok(Some(vec![info]))
            }
            _ => {
                let mut infos = Vec::with_capacity(nodes.len());
                let mut operations = Vec::with_capacity(nodes.len());
                for &node in &nodes {
                    let operation = factory(node);
                    infos.push(OperationInfo::of(operation.as_ref()));
                    operations.push(operation);
                }
                let mut group = GroupedOperation::with_description(format!(
                    "{} ({} nodes)",
                    infos[0].description,
                    nodes.len()
                ));
                for operation in operations {
                    group.add_operation(operation)?;
                }
                stack.push(Box::new(group), scene)?;
                Ok(Some(infos))
            }
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("nodes", &self.nodes)
            .field("face", &self.face)
            .finish()
    }
}
