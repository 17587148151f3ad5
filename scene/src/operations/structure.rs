use std::time::Instant;

use meridian_core::history::{Operation, OperationError, OperationKind, OperationResult};
use meridian_core::math::{Mat4, Transform};

use crate::node::NodeId;
use crate::scene::Scene;

/// Where a node sits in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    parent: NodeId,
    index: usize,
}

fn placement(scene: &Scene, node: NodeId) -> Option<Placement> {
    let parent = scene.node(node)?.parent()?;
    let index = scene.node(parent)?.child_index(node)?;
    Some(Placement { parent, index })
}

fn restore_placement(scene: &mut Scene, node: NodeId, placement: Option<Placement>) -> OperationResult {
    match placement {
        Some(Placement { parent, index }) => scene.insert_child(parent, index, node)?,
        None => scene.set_parent(node, None)?,
    }
    Ok(())
}

/// Selected nodes of the subtree rooted at `node`, in selection order.
fn selected_in_subtree(scene: &Scene, node: NodeId) -> Vec<NodeId> {
    let subtree: Vec<NodeId> = scene.depth_first(node).collect();
    scene
        .selection()
        .selected_nodes()
        .iter()
        .copied()
        .filter(|id| subtree.contains(id))
        .collect()
}

fn reselect(scene: &mut Scene, nodes: &[NodeId]) {
    for &id in nodes {
        scene.select(id);
    }
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

/// Attaches a node below a parent.
///
/// Undo puts the node back where it was before (usually detached), which
/// also drops it from the selection; redo restores the selection.
#[derive(Debug)]
pub struct AddSceneNodeOperation {
    node: NodeId,
    parent: NodeId,
    previous: Option<Placement>,
    applied_once: bool,
    selected: Vec<NodeId>,
    created: Instant,
}

impl AddSceneNodeOperation {
    /// Attaches `node` as the last child of `parent`.
    pub fn new(node: NodeId, parent: NodeId) -> Self {
        Self {
            node,
            parent,
            previous: None,
            applied_once: false,
            selected: Vec::new(),
            created: Instant::now(),
        }
    }
}

impl Operation<Scene> for AddSceneNodeOperation {
    fn redo(&mut self, target: &mut Scene) -> OperationResult {
        if !self.applied_once {
            if !target.contains(self.node) {
                return Err(OperationError::TargetNotFound(format!("{:?}", self.node)));
            }
            self.previous = placement(target, self.node);
        }
        target.add_child(self.parent, self.node)?;
        self.applied_once = true;
        reselect(target, &self.selected);
        Ok(())
    }

    fn undo(&mut self, target: &mut Scene) -> OperationResult {
        self.selected = selected_in_subtree(target, self.node);
        restore_placement(target, self.node, self.previous)
    }

    fn description(&self) -> &str {
        "Add node"
    }

    fn kind(&self) -> OperationKind {
        OperationKind::AddNode
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.node)
    }

    fn timestamp(&self) -> Instant {
        self.created
    }
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

/// Detaches a node (and its subtree) from the scene.
///
/// The node stays in the arena so undo can put it back at the same child
/// index and restore the selection of its subtree.
#[derive(Debug)]
pub struct RemoveSceneNodeOperation {
    node: NodeId,
    placement: Option<Placement>,
    selected: Vec<NodeId>,
    created: Instant,
}

impl RemoveSceneNodeOperation {
    /// Detaches `node` and its subtree from the tree.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            placement: None,
            selected: Vec::new(),
            created: Instant::now(),
        }
    }
}

impl Operation<Scene> for RemoveSceneNodeOperation {
    fn redo(&mut self, target: &mut Scene) -> OperationResult {
        if !target.contains(self.node) {
            return Err(OperationError::TargetNotFound(format!("{:?}", self.node)));
        }
        let Some(current) = placement(target, self.node) else {
            return Err(OperationError::InvalidState(format!(
                "node {:?} is not attached",
                self.node
            )));
        };
        self.placement = Some(current);
        self.selected = selected_in_subtree(target, self.node);
        target.set_parent(self.node, None)?;
        Ok(())
    }

    fn undo(&mut self, target: &mut Scene) -> OperationResult {
        let placement = self
            .placement
            .ok_or_else(|| OperationError::InvalidState("operation was never applied".into()))?;
        restore_placement(target, self.node, Some(placement))?;
        reselect(target, &self.selected);
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove node"
    }

    fn kind(&self) -> OperationKind {
        OperationKind::RemoveNode
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.node)
    }

    fn timestamp(&self) -> Instant {
        self.created
    }
}

// ---------------------------------------------------------------------------
// SetParent
// ---------------------------------------------------------------------------

/// Moves a node under a new parent, or detaches it for `None`.
///
/// By default the node keeps its world transform; its local transform is
/// recomputed against the new parent.
#[derive(Debug)]
pub struct SetParentOperation {
    node: NodeId,
    new_parent: Option<NodeId>,
    keep_world_transform: bool,
    old_placement: Option<Placement>,
    old_local: Option<Transform>,
    selected: Vec<NodeId>,
    created: Instant,
}

impl SetParentOperation {
    pub fn new(node: NodeId, new_parent: Option<NodeId>) -> Self {
        Self {
            node,
            new_parent,
            keep_world_transform: true,
            old_placement: None,
            old_local: None,
            selected: Vec::new(),
            created: Instant::now(),
        }
    }

    /// Whether the node keeps its world transform (the default) or its
    /// local transform.
    #[must_use]
    pub fn keep_world_transform(mut self, keep: bool) -> Self {
        self.keep_world_transform = keep;
        self
    }
}

impl Operation<Scene> for SetParentOperation {
    fn redo(&mut self, target: &mut Scene) -> OperationResult {
        let world = target
            .world_transformation(self.node)
            .ok_or_else(|| OperationError::TargetNotFound(format!("{:?}", self.node)))?;
        if self.old_local.is_none() {
            self.old_local = target.local_transform(self.node);
            self.old_placement = placement(target, self.node);
        }
        self.selected = selected_in_subtree(target, self.node);

        target.set_parent(self.node, self.new_parent)?;

        if self.keep_world_transform {
            let parent_world = match self.new_parent {
                Some(parent) => target
                    .world_transformation(parent)
                    .unwrap_or_else(Mat4::identity),
                None => Mat4::identity(),
            };
            let Some(parent_inverse) = parent_world.try_inverse() else {
                log::warn!("Parent of {:?} is singular, keeping local transform", self.node);
                return Ok(());
            };
            target.restore_local_transform(
                self.node,
                Transform::from_matrix(&(parent_inverse * world)),
            );
        }
        Ok(())
    }

    fn undo(&mut self, target: &mut Scene) -> OperationResult {
        let old_local = self
            .old_local
            .ok_or_else(|| OperationError::InvalidState("operation was never applied".into()))?;
        restore_placement(target, self.node, self.old_placement)?;
        target.restore_local_transform(self.node, old_local);
        reselect(target, &self.selected);
        Ok(())
    }

    fn description(&self) -> &str {
        "Set parent"
    }

    fn kind(&self) -> OperationKind {
        OperationKind::SetParent
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.node)
    }

    fn timestamp(&self) -> Instant {
        self.created
    }
}
