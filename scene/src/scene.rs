//! The scene: node arena, hierarchy, transforms and change signals.

use std::fmt;
use std::sync::Arc;

use meridian_core::history::{Editable, OperationError};
use meridian_core::math::{
    AxisAlignedBox, Mat3, Mat4, Quat, Transform, TransformSpace, Vec3, mat4_from_rotation,
    mat4_from_scale, mat4_from_translation, to_scale_rotation_translation, transform_point,
};
use meridian_core::signal::Signal;
use parking_lot::RwLock;
use slotmap::SlotMap;

use crate::decorator::{DecorationValue, SceneNodeDecorator};
use crate::iter::{BreadthFirstIterator, DepthFirstIterator};
use crate::mesh::MeshData;
use crate::node::{NodeId, SceneNode};
use crate::selection::Selection;

/// A scene behind a read/write lock, handed to worker threads for reading.
pub type SharedScene = Arc<RwLock<Scene>>;

/// Errors from structural scene edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("node {0:?} not found")]
    NodeNotFound(NodeId),
    #[error("making {parent:?} the parent of {child:?} would create a cycle")]
    WouldCreateCycle { child: NodeId, parent: NodeId },
    #[error("the root node cannot be reparented")]
    RootCannotBeReparented,
    #[error("the root node cannot be destroyed")]
    RootCannotBeDestroyed,
    #[error("node {0:?} is still attached to a parent")]
    NodeAttached(NodeId),
}

impl From<SceneError> for OperationError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::NodeNotFound(id) => OperationError::TargetNotFound(format!("{id:?}")),
            other => OperationError::Scene(other.to_string()),
        }
    }
}

/// Change notifications emitted by a [`Scene`].
///
/// Every mutation emits its specific signal followed by `scene_changed`,
/// both carrying the affected node.
pub struct SceneSignals {
    pub scene_changed: Signal<NodeId>,
    pub transformation_changed: Signal<NodeId>,
    pub parent_changed: Signal<NodeId>,
    pub children_changed: Signal<NodeId>,
    pub mesh_data_changed: Signal<NodeId>,
    pub visibility_changed: Signal<NodeId>,
    pub decorators_changed: Signal<NodeId>,
    pub active_camera_changed: Signal<Option<NodeId>>,
}

impl SceneSignals {
    fn new() -> Self {
        Self {
            scene_changed: Signal::new("scene_changed"),
            transformation_changed: Signal::new("transformation_changed"),
            parent_changed: Signal::new("parent_changed"),
            children_changed: Signal::new("children_changed"),
            mesh_data_changed: Signal::new("mesh_data_changed"),
            visibility_changed: Signal::new("visibility_changed"),
            decorators_changed: Signal::new("decorators_changed"),
            active_camera_changed: Signal::new("active_camera_changed"),
        }
    }
}

/// A tree of [`SceneNode`]s with a single root.
///
/// Nodes are created detached and become part of the scene once they are
/// attached below the root. Detached nodes stay in the arena until
/// [`destroy_node`](Self::destroy_node) frees them, which lets undo bring a
/// removed node back under the same [`NodeId`].
///
/// Transform mutators return `false` and leave the node unchanged when the
/// node is locked or unknown.
pub struct Scene {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
    active_camera: Option<NodeId>,
    selection: Selection,
    signals: SceneSignals,
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new("Root"));
        Self {
            nodes,
            root,
            active_camera: None,
            selection: Selection::new(),
            signals: SceneSignals::new(),
        }
    }

    /// Wraps the scene for sharing with worker threads.
    pub fn into_shared(self) -> SharedScene {
        Arc::new(RwLock::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn signals(&self) -> &SceneSignals {
        &self.signals
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Removal, clearing and face picking. Nodes are added through
    /// [`Scene::select`].
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Adds a node to the selection. Refuses nodes outside the tree and
    /// nodes that are not selectable.
    pub fn select(&mut self, id: NodeId) -> bool {
        if !self.is_in_tree(id) || !self.is_selectable(id) {
            log::debug!("Refusing to select {id:?}");
            return false;
        }
        self.selection.add(id)
    }

    /// Flips the selection state of a node and returns the new state.
    pub fn toggle_selected(&mut self, id: NodeId) -> bool {
        if self.selection.remove(id) {
            false
        } else {
            self.select(id)
        }
    }

    // ---- Nodes ----

    /// Creates a detached node.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.nodes.insert(SceneNode::new(name));
        log::trace!("Created node {id:?}");
        id
    }

    /// Looks up a node in the arena, attached or not.
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Looks up a node that is part of the tree below the root.
    pub fn find_node(&self, id: NodeId) -> Option<&SceneNode> {
        if self.is_in_tree(id) {
            self.nodes.get(id)
        } else {
            None
        }
    }

    /// First node in the tree (depth-first) with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.depth_first(self.root)
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes in the arena, including the root and detached nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the node is reachable from the root.
    pub fn is_in_tree(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                return true;
            }
            current = self.nodes.get(node_id).and_then(|n| n.parent);
        }
        false
    }

    /// Number of ancestors; the root and detached nodes have depth 0.
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut node = self.nodes.get(id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent.and_then(|p| self.nodes.get(p)) {
            depth += 1;
            node = parent;
        }
        Some(depth)
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.name = name.into();
        self.signals.scene_changed.emit(&id);
        true
    }

    /// Frees a detached node and its whole subtree.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RootCannotBeDestroyed);
        }
        let node = self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))?;
        if node.parent.is_some() {
            return Err(SceneError::NodeAttached(id));
        }

        let subtree: Vec<NodeId> = self.depth_first(id).collect();
        for node_id in &subtree {
            self.nodes.remove(*node_id);
        }
        self.selection.remove_nodes(&subtree);
        if self.active_camera.is_some_and(|camera| subtree.contains(&camera)) {
            self.active_camera = None;
            self.signals.active_camera_changed.emit(&None);
        }
        log::debug!("Destroyed {} node(s) rooted at {id:?}", subtree.len());
        Ok(())
    }

    // ---- Hierarchy ----

    /// Appends `child` to `parent`'s children.
    ///
    /// A child that already belongs to `parent` stays where it is. A child
    /// attached elsewhere is moved.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.attach(parent, child, None)
    }

    /// Inserts `child` at `index` in `parent`'s children (clamped to the
    /// end). Reorders the child if it already belongs to `parent`.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), SceneError> {
        self.attach(parent, child, Some(index))
    }

    /// Detaches `child` from `parent`. Returns `false` if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.nodes.get(child).and_then(|n| n.parent) != Some(parent) {
            return false;
        }
        self.detach(child);
        true
    }

    /// Moves `child` under `parent`, or detaches it for `None`.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        match parent {
            Some(parent) => self.attach(parent, child, None),
            None => {
                if !self.nodes.contains_key(child) {
                    return Err(SceneError::NodeNotFound(child));
                }
                self.detach(child);
                Ok(())
            }
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> Result<(), SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let old_parent = self
            .nodes
            .get(child)
            .ok_or(SceneError::NodeNotFound(child))?
            .parent;
        if child == self.root {
            return Err(SceneError::RootCannotBeReparented);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::WouldCreateCycle { child, parent });
        }

        if old_parent == Some(parent) {
            let Some(index) = index else {
                return Ok(());
            };
            if let Some(parent_node) = self.nodes.get_mut(parent)
                && let Some(current) = parent_node.child_index(child)
            {
                parent_node.children.remove(current);
                let index = index.min(parent_node.children.len());
                parent_node.children.insert(index, child);
            }
            self.emit(&self.signals.children_changed, parent);
            return Ok(());
        }

        let was_in_tree = self.is_in_tree(child);
        if let Some(old) = old_parent {
            if let Some(old_node) = self.nodes.get_mut(old) {
                old_node.children.retain(|&c| c != child);
            }
            self.emit(&self.signals.children_changed, old);
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            let index = index.unwrap_or(parent_node.children.len());
            let index = index.min(parent_node.children.len());
            parent_node.children.insert(index, child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
        }
        log::trace!("Attached {child:?} to {parent:?}");
        self.emit(&self.signals.parent_changed, child);
        self.emit(&self.signals.children_changed, parent);

        if was_in_tree && !self.is_in_tree(child) {
            self.prune_selection(child);
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get(child).and_then(|n| n.parent) else {
            return;
        };
        let was_in_tree = self.is_in_tree(child);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|&c| c != child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = None;
        }
        log::trace!("Detached {child:?} from {parent:?}");
        self.emit(&self.signals.parent_changed, child);
        self.emit(&self.signals.children_changed, parent);

        if was_in_tree {
            self.prune_selection(child);
        }
    }

    /// Drops `id` and its descendants from the selection.
    fn prune_selection(&mut self, id: NodeId) {
        let subtree: Vec<NodeId> = self.depth_first(id).collect();
        self.selection.remove_nodes(&subtree);
    }

    // ---- Traversal ----

    /// Pre-order traversal of `start` and its descendants.
    pub fn depth_first(&self, start: NodeId) -> DepthFirstIterator<'_> {
        DepthFirstIterator::new(self, start)
    }

    /// Level-order traversal of `start` and its descendants.
    pub fn breadth_first(&self, start: NodeId) -> BreadthFirstIterator<'_> {
        BreadthFirstIterator::new(self, start)
    }

    /// Every descendant of `id` (not just direct children), depth-first.
    pub fn all_children(&self, id: NodeId) -> DepthFirstIterator<'_> {
        DepthFirstIterator::descendants(self, id)
    }

    // ---- Transforms ----

    /// Copy of the node's transform relative to its parent.
    pub fn local_transform(&self, id: NodeId) -> Option<Transform> {
        self.nodes.get(id).map(|n| n.transform)
    }

    /// Parent world transform composed with the local transform, through
    /// the whole ancestor chain. The root's world transform is its local one.
    pub fn world_transformation(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        let mut matrix = node.local_matrix();
        let mut current = node.parent;
        while let Some(parent_id) = current {
            let parent = self.nodes.get(parent_id)?;
            matrix = parent.local_matrix() * matrix;
            current = parent.parent;
        }
        Some(matrix)
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_transformation(id)
            .map(|m| transform_point(&m, &Vec3::zeros()))
    }

    pub fn world_orientation(&self, id: NodeId) -> Option<Quat> {
        self.world_transformation(id)
            .map(|m| to_scale_rotation_translation(&m).1)
    }

    pub fn world_scale(&self, id: NodeId) -> Option<Vec3> {
        self.world_transformation(id)
            .map(|m| to_scale_rotation_translation(&m).0)
    }

    fn parent_world(&self, id: NodeId) -> Mat4 {
        self.nodes
            .get(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.world_transformation(p))
            .unwrap_or_else(Mat4::identity)
    }

    pub fn is_locked(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.locked)
    }

    /// Locks or unlocks all transform mutation of the node.
    pub fn set_locked(&mut self, id: NodeId, locked: bool) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.locked = locked;
        true
    }

    /// The current local transform if the node may be transformed.
    fn editable_transform(&self, id: NodeId) -> Option<Transform> {
        let node = self.nodes.get(id)?;
        if node.locked {
            log::trace!("Ignoring transform of locked node {id:?}");
            return None;
        }
        Some(node.transform)
    }

    fn write_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.transform = transform;
        log::trace!("Transform of {id:?} set to {transform:?}");
        self.emit(&self.signals.transformation_changed, id);
        true
    }

    /// Writes the local transform even if the node is locked. Used by
    /// history operations that must restore exact state.
    pub(crate) fn restore_local_transform(&mut self, id: NodeId, transform: Transform) -> bool {
        self.write_transform(id, transform)
    }

    /// Sets the world matrix of an unlocked node by solving for its local
    /// transform. Fails if the parent's world matrix is singular.
    fn set_world_matrix(&mut self, id: NodeId, world: Mat4) -> bool {
        let Some(parent_inverse) = self.parent_world(id).try_inverse() else {
            return false;
        };
        self.write_transform(id, Transform::from_matrix(&(parent_inverse * world)))
    }

    /// Replaces the local transform. Returns `false` for locked or unknown
    /// nodes.
    pub fn set_local_transformation(&mut self, id: NodeId, transform: Transform) -> bool {
        if self.editable_transform(id).is_none() {
            return false;
        }
        self.write_transform(id, transform)
    }

    /// Sets the local translation, keeping rotation and scale.
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> bool {
        let Some(current) = self.editable_transform(id) else {
            return false;
        };
        self.write_transform(id, current.with_translation(position))
    }

    /// Moves the node so that its origin lands on `position` in world space.
    pub fn set_world_position(&mut self, id: NodeId, position: Vec3) -> bool {
        let Some(current) = self.editable_transform(id) else {
            return false;
        };
        let Some(parent_inverse) = self.parent_world(id).try_inverse() else {
            return false;
        };
        let local = transform_point(&parent_inverse, &position);
        self.write_transform(id, current.with_translation(local))
    }

    pub fn set_orientation(&mut self, id: NodeId, orientation: Quat) -> bool {
        let Some(current) = self.editable_transform(id) else {
            return false;
        };
        self.write_transform(id, current.with_rotation(orientation))
    }

    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> bool {
        let Some(current) = self.editable_transform(id) else {
            return false;
        };
        self.write_transform(id, current.with_scale(scale))
    }

    /// Moves the node by `delta`, expressed in `space`.
    pub fn translate(&mut self, id: NodeId, delta: Vec3, space: TransformSpace) -> bool {
        let Some(current) = self.editable_transform(id) else {
            return false;
        };
        let offset = match space {
            TransformSpace::Local => current.rotation * current.scale.component_mul(&delta),
            TransformSpace::Parent => delta,
            TransformSpace::World => {
                let parent: Mat3 = self.parent_world(id).fixed_view::<3, 3>(0, 0).into_owned();
                let Some(inverse) = parent.try_inverse() else {
                    return false;
                };
                inverse * delta
            }
        };
        self.write_transform(id, current.with_translation(current.translation + offset))
    }

    /// Rotates the node about its own origin. `rotation` is expressed in
    /// `space`.
    pub fn rotate(&mut self, id: NodeId, rotation: Quat, space: TransformSpace) -> bool {
        let Some(current) = self.editable_transform(id) else {
            return false;
        };
        match space {
            TransformSpace::Local => {
                self.write_transform(id, current.with_rotation(current.rotation * rotation))
            }
            TransformSpace::Parent => {
                self.write_transform(id, current.with_rotation(rotation * current.rotation))
            }
            TransformSpace::World => {
                let Some(origin) = self.world_position(id) else {
                    return false;
                };
                self.rotate_world_about(id, rotation, origin)
            }
        }
    }

    /// Rotates the node about a world-space pivot; its position orbits the
    /// pivot.
    pub fn rotate_around(&mut self, id: NodeId, rotation: Quat, pivot: Vec3) -> bool {
        if self.editable_transform(id).is_none() {
            return false;
        }
        self.rotate_world_about(id, rotation, pivot)
    }

    fn rotate_world_about(&mut self, id: NodeId, rotation: Quat, pivot: Vec3) -> bool {
        let Some(world) = self.world_transformation(id) else {
            return false;
        };
        let about = mat4_from_translation(pivot)
            * mat4_from_rotation(rotation)
            * mat4_from_translation(-pivot);
        self.set_world_matrix(id, about * world)
    }

    /// Scales the node by per-axis `factors` about its own origin. Parent
    /// and world factors are applied along that space's axes.
    pub fn scale(&mut self, id: NodeId, factors: Vec3, space: TransformSpace) -> bool {
        let Some(current) = self.editable_transform(id) else {
            return false;
        };
        match space {
            TransformSpace::Local => {
                self.write_transform(id, current.with_scale(current.scale.component_mul(&factors)))
            }
            TransformSpace::Parent => {
                let origin = current.translation;
                let about = mat4_from_translation(origin)
                    * mat4_from_scale(factors)
                    * mat4_from_translation(-origin);
                let local = about * current.to_matrix();
                self.write_transform(id, Transform::from_matrix(&local))
            }
            TransformSpace::World => {
                let Some(origin) = self.world_position(id) else {
                    return false;
                };
                self.scale_world_about(id, factors, origin)
            }
        }
    }

    /// Scales the node along world axes about a world-space pivot.
    pub fn scale_around(&mut self, id: NodeId, factors: Vec3, pivot: Vec3) -> bool {
        if self.editable_transform(id).is_none() {
            return false;
        }
        self.scale_world_about(id, factors, pivot)
    }

    fn scale_world_about(&mut self, id: NodeId, factors: Vec3, pivot: Vec3) -> bool {
        let Some(world) = self.world_transformation(id) else {
            return false;
        };
        let about =
            mat4_from_translation(pivot) * mat4_from_scale(factors) * mat4_from_translation(-pivot);
        self.set_world_matrix(id, about * world)
    }

    // ---- Flags ----

    /// Own flag and every ancestor's.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.all_ancestors_and_self(id, |n| n.visible)
    }

    /// Own flag and every ancestor's.
    pub fn is_enabled(&self, id: NodeId) -> bool {
        self.all_ancestors_and_self(id, |n| n.enabled)
    }

    /// Own selectable flag and the inherited enabled state.
    pub fn is_selectable(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.selectable) && self.is_enabled(id)
    }

    fn all_ancestors_and_self(&self, id: NodeId, flag: impl Fn(&SceneNode) -> bool) -> bool {
        let mut current = Some(id);
        let mut seen_any = false;
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get(node_id) else {
                break;
            };
            if !flag(node) {
                return false;
            }
            seen_any = true;
            current = node.parent;
        }
        seen_any
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.visible != visible {
            node.visible = visible;
            self.emit(&self.signals.visibility_changed, id);
        }
        true
    }

    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.enabled != enabled {
            node.enabled = enabled;
            self.emit(&self.signals.visibility_changed, id);
        }
        true
    }

    pub fn set_selectable(&mut self, id: NodeId, selectable: bool) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.selectable = selectable;
        self.signals.scene_changed.emit(&id);
        true
    }

    // ---- Mesh ----

    pub fn mesh_data(&self, id: NodeId) -> Option<&Arc<MeshData>> {
        self.nodes.get(id)?.mesh.as_ref()
    }

    /// Replaces the node's mesh; `None` removes it.
    pub fn set_mesh_data(&mut self, id: NodeId, mesh: Option<Arc<MeshData>>) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.mesh = mesh;
        self.emit(&self.signals.mesh_data_changed, id);
        true
    }

    /// World-space bounds of every mesh in the subtree rooted at `id`.
    pub fn bounding_box(&self, id: NodeId) -> Option<AxisAlignedBox> {
        self.depth_first(id)
            .filter_map(|node_id| {
                let local = self.nodes.get(node_id)?.mesh.as_ref()?.bounding_box()?;
                Some(local.transformed(&self.world_transformation(node_id)?))
            })
            .reduce(|a, b| a.merged(&b))
    }

    // ---- Decorators ----

    /// Attaches a decorator. Returns `false` if one with the same name is
    /// already attached.
    pub fn add_decorator(&mut self, id: NodeId, decorator: Box<dyn SceneNodeDecorator>) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.has_decorator(decorator.name()) {
            return false;
        }
        node.decorators.push(decorator);
        self.emit(&self.signals.decorators_changed, id);
        true
    }

    pub fn remove_decorator(
        &mut self,
        id: NodeId,
        name: &str,
    ) -> Option<Box<dyn SceneNodeDecorator>> {
        let node = self.nodes.get_mut(id)?;
        let index = node.decorators.iter().position(|d| d.name() == name)?;
        let removed = node.decorators.remove(index);
        self.emit(&self.signals.decorators_changed, id);
        Some(removed)
    }

    pub fn supports(&self, id: NodeId, capability: &str) -> bool {
        self.nodes.get(id).is_some_and(|n| n.supports(capability))
    }

    /// Dispatches `capability` to the first decorator implementing it.
    /// Returns `None` if no decorator does.
    pub fn call_decoration(
        &mut self,
        id: NodeId,
        capability: &str,
        args: &[DecorationValue],
    ) -> Option<DecorationValue> {
        self.nodes
            .get_mut(id)?
            .decorator_for_mut(capability)?
            .call(capability, args)
    }

    // ---- Cameras ----

    /// Camera nodes in the tree, depth-first.
    pub fn all_cameras(&self) -> Vec<NodeId> {
        self.depth_first(self.root)
            .filter(|&id| self.supports(id, "isCamera"))
            .collect()
    }

    pub fn find_camera(&self, name: &str) -> Option<NodeId> {
        self.all_cameras()
            .into_iter()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    pub fn active_camera(&self) -> Option<NodeId> {
        self.active_camera
    }

    /// Activates the camera with the given name. Returns `false` and keeps
    /// the current camera if there is none.
    pub fn set_active_camera(&mut self, name: &str) -> bool {
        let Some(camera) = self.find_camera(name) else {
            log::debug!("No camera named '{name}'");
            return false;
        };
        if self.active_camera != Some(camera) {
            self.active_camera = Some(camera);
            self.signals.active_camera_changed.emit(&Some(camera));
        }
        true
    }

    fn emit(&self, signal: &Signal<NodeId>, id: NodeId) {
        signal.emit(&id);
        self.signals.scene_changed.emit(&id);
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Editable for Scene {
    type Key = NodeId;
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("active_camera", &self.active_camera)
            .field("selection", &self.selection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use meridian_core::math::{quat_from_rotation_y, quat_from_rotation_z};
    use rstest::rstest;

    use super::*;
    use crate::decorator::{CameraDecorator, GroupDecorator};

    const EPS: f32 = 1e-4;

    fn assert_vec(actual: Vec3, expected: Vec3) {
        assert!(
            (actual - expected).norm() < EPS,
            "expected {expected:?}, got {actual:?}"
        );
    }

    fn attached(scene: &mut Scene, parent: NodeId, name: &str) -> NodeId {
        let id = scene.create_node(name);
        scene.add_child(parent, id).unwrap();
        id
    }

    #[test]
    fn add_child_sets_both_sides() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        assert_eq!(scene.node(a).unwrap().parent(), Some(root));
        assert_eq!(scene.node(root).unwrap().children(), &[a]);
        assert!(scene.is_in_tree(a));
        assert_eq!(scene.depth(a), Some(1));
    }

    #[test]
    fn add_child_twice_is_idempotent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        scene.add_child(root, a).unwrap();
        assert_eq!(scene.node(root).unwrap().children(), &[a]);
    }

    #[test]
    fn reparent_moves_between_child_lists() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, root, "b");
        scene.add_child(b, a).unwrap();
        assert_eq!(scene.node(root).unwrap().children(), &[b]);
        assert_eq!(scene.node(b).unwrap().children(), &[a]);
        assert_eq!(scene.node(a).unwrap().parent(), Some(b));
    }

    #[test]
    fn remove_absent_child_is_a_no_op() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let stray = scene.create_node("stray");
        assert!(!scene.remove_child(root, stray));
        assert!(!scene.remove_child(a, root));
        assert!(scene.remove_child(root, a));
        assert!(scene.node(a).unwrap().parent().is_none());
        assert!(!scene.node(root).unwrap().has_children());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, a, "b");
        assert_eq!(
            scene.add_child(b, a),
            Err(SceneError::WouldCreateCycle { child: a, parent: b })
        );
        assert_eq!(
            scene.add_child(a, a),
            Err(SceneError::WouldCreateCycle { child: a, parent: a })
        );
        assert_eq!(scene.add_child(a, root), Err(SceneError::RootCannotBeReparented));
    }

    #[test]
    fn insert_child_orders_and_reorders() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, root, "b");
        let c = scene.create_node("c");
        scene.insert_child(root, 1, c).unwrap();
        assert_eq!(scene.node(root).unwrap().children(), &[a, c, b]);
        scene.insert_child(root, 0, b).unwrap();
        assert_eq!(scene.node(root).unwrap().children(), &[b, a, c]);
        scene.insert_child(root, 99, b).unwrap();
        assert_eq!(scene.node(root).unwrap().children(), &[a, c, b]);
    }

    #[test]
    fn destroy_requires_detached_subtree() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, a, "b");
        assert_eq!(scene.destroy_node(a), Err(SceneError::NodeAttached(a)));
        assert_eq!(scene.destroy_node(root), Err(SceneError::RootCannotBeDestroyed));

        scene.set_parent(a, None).unwrap();
        scene.destroy_node(a).unwrap();
        assert!(!scene.contains(a));
        assert!(!scene.contains(b));
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn world_transform_composes_chain() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, a, "b");
        scene.translate(a, Vec3::new(10.0, 0.0, 0.0), TransformSpace::Local);
        scene.translate(b, Vec3::new(0.0, 5.0, 0.0), TransformSpace::Local);

        let world = scene.world_transformation(b).unwrap();
        assert_vec(transform_point(&world, &Vec3::zeros()), Vec3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn ancestor_changes_are_visible_immediately() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, a, "b");
        scene.set_position(b, Vec3::new(1.0, 0.0, 0.0));
        scene.rotate(a, quat_from_rotation_z(FRAC_PI_2), TransformSpace::Local);
        assert_vec(scene.world_position(b).unwrap(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn locked_node_ignores_mutation() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        scene.set_position(a, Vec3::new(1.0, 2.0, 3.0));
        scene.set_locked(a, true);
        let before = scene.local_transform(a).unwrap();

        assert!(!scene.translate(a, Vec3::new(1.0, 0.0, 0.0), TransformSpace::World));
        assert!(!scene.rotate(a, quat_from_rotation_y(1.0), TransformSpace::Local));
        assert!(!scene.scale(a, Vec3::new(2.0, 2.0, 2.0), TransformSpace::Parent));
        assert!(!scene.set_local_transformation(a, Transform::identity()));
        assert!(!scene.rotate_around(a, quat_from_rotation_y(1.0), Vec3::zeros()));
        assert!(!scene.set_world_position(a, Vec3::zeros()));
        assert_eq!(scene.local_transform(a).unwrap(), before);

        scene.set_locked(a, false);
        assert!(scene.translate(a, Vec3::new(1.0, 0.0, 0.0), TransformSpace::World));
    }

    #[rstest]
    #[case::local(TransformSpace::Local, Vec3::new(0.0, 2.0, 0.0))]
    #[case::parent(TransformSpace::Parent, Vec3::new(1.0, 0.0, 0.0))]
    #[case::world(TransformSpace::World, Vec3::new(0.5, 0.0, 0.0))]
    fn translate_in_space(#[case] space: TransformSpace, #[case] expected_local: Vec3) {
        // Parent scaled by 2; child rotated 90 degrees about Z and scaled by 2.
        let mut scene = Scene::new();
        let root = scene.root();
        let parent = attached(&mut scene, root, "parent");
        let child = attached(&mut scene, parent, "child");
        scene.set_scale(parent, Vec3::new(2.0, 2.0, 2.0));
        scene.set_local_transformation(
            child,
            Transform::new(
                Vec3::zeros(),
                quat_from_rotation_z(FRAC_PI_2),
                Vec3::new(2.0, 2.0, 2.0),
            ),
        );

        assert!(scene.translate(child, Vec3::new(1.0, 0.0, 0.0), space));
        assert_vec(scene.local_transform(child).unwrap().translation, expected_local);
    }

    #[test]
    fn world_translate_moves_world_position_by_delta() {
        let mut scene = Scene::new();
        let root = scene.root();
        let parent = attached(&mut scene, root, "parent");
        let child = attached(&mut scene, parent, "child");
        scene.set_local_transformation(
            parent,
            Transform::new(
                Vec3::new(3.0, 0.0, 0.0),
                quat_from_rotation_y(0.8),
                Vec3::new(1.0, 3.0, 0.5),
            ),
        );
        let before = scene.world_position(child).unwrap();
        let delta = Vec3::new(1.0, 2.0, -1.0);
        scene.translate(child, delta, TransformSpace::World);
        assert_vec(scene.world_position(child).unwrap(), before + delta);
    }

    #[test]
    fn rotate_local_and_parent_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let qy = quat_from_rotation_y(0.5);
        let qz = quat_from_rotation_z(0.3);
        scene.set_orientation(a, qy);

        scene.rotate(a, qz, TransformSpace::Local);
        assert!(scene.local_transform(a).unwrap().rotation.angle_to(&(qy * qz)) < EPS);

        scene.set_orientation(a, qy);
        scene.rotate(a, qz, TransformSpace::Parent);
        assert!(scene.local_transform(a).unwrap().rotation.angle_to(&(qz * qy)) < EPS);
    }

    #[test]
    fn world_rotate_keeps_origin_and_rotates_world_axes() {
        let mut scene = Scene::new();
        let root = scene.root();
        let parent = attached(&mut scene, root, "parent");
        let child = attached(&mut scene, parent, "child");
        scene.set_local_transformation(
            parent,
            Transform::new(Vec3::new(1.0, 2.0, 3.0), quat_from_rotation_y(0.7), Vec3::from_element(1.0)),
        );
        scene.set_position(child, Vec3::new(4.0, 0.0, 0.0));

        let origin = scene.world_position(child).unwrap();
        let q = quat_from_rotation_z(FRAC_PI_2);
        let expected = q * scene.world_orientation(child).unwrap();
        scene.rotate(child, q, TransformSpace::World);

        assert_vec(scene.world_position(child).unwrap(), origin);
        assert!(scene.world_orientation(child).unwrap().angle_to(&expected) < EPS);
    }

    #[test]
    fn rotate_around_pivot_orbits() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        scene.set_position(a, Vec3::new(2.0, 0.0, 0.0));
        scene.rotate_around(a, quat_from_rotation_z(FRAC_PI_2), Vec3::new(1.0, 0.0, 0.0));
        assert_vec(scene.world_position(a).unwrap(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn scale_in_spaces() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        scene.set_position(a, Vec3::new(5.0, 0.0, 0.0));

        scene.scale(a, Vec3::new(2.0, 1.0, 1.0), TransformSpace::Local);
        assert_vec(scene.local_transform(a).unwrap().scale, Vec3::new(2.0, 1.0, 1.0));

        // Scaling about the node's own origin keeps the position.
        scene.scale(a, Vec3::new(1.0, 3.0, 1.0), TransformSpace::World);
        assert_vec(scene.world_position(a).unwrap(), Vec3::new(5.0, 0.0, 0.0));
        assert_vec(scene.world_scale(a).unwrap(), Vec3::new(2.0, 3.0, 1.0));

        scene.scale_around(a, Vec3::new(2.0, 2.0, 2.0), Vec3::zeros());
        assert_vec(scene.world_position(a).unwrap(), Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn set_world_position_accounts_for_parent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let parent = attached(&mut scene, root, "parent");
        let child = attached(&mut scene, parent, "child");
        scene.set_local_transformation(
            parent,
            Transform::new(Vec3::new(1.0, 1.0, 1.0), quat_from_rotation_z(0.4), Vec3::new(2.0, 2.0, 2.0)),
        );
        scene.set_world_position(child, Vec3::new(-3.0, 4.0, 0.5));
        assert_vec(scene.world_position(child).unwrap(), Vec3::new(-3.0, 4.0, 0.5));
    }

    #[test]
    fn inherited_flags() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, a, "b");

        scene.set_visible(a, false);
        assert!(!scene.is_visible(b));
        assert!(scene.node(b).unwrap().visible_flag());

        scene.set_enabled(a, false);
        assert!(!scene.is_enabled(b));
        assert!(!scene.is_selectable(b));

        scene.set_enabled(a, true);
        assert!(scene.is_selectable(b));
        scene.set_selectable(b, false);
        assert!(!scene.is_selectable(b));
    }

    #[test]
    fn decorators_dispatch_by_capability() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");

        assert_eq!(scene.call_decoration(a, "isGroup", &[]), None);
        assert!(scene.add_decorator(a, Box::new(GroupDecorator)));
        assert!(!scene.add_decorator(a, Box::new(GroupDecorator)));
        assert!(scene.supports(a, "isGroup"));
        assert_eq!(
            scene.call_decoration(a, "isGroup", &[]),
            Some(DecorationValue::Bool(true))
        );

        assert!(scene.remove_decorator(a, "group").is_some());
        assert!(!scene.supports(a, "isGroup"));
        assert!(scene.remove_decorator(a, "group").is_none());
    }

    #[test]
    fn cameras() {
        let mut scene = Scene::new();
        let root = scene.root();
        let main = attached(&mut scene, root, "main");
        let side = attached(&mut scene, root, "side");
        scene.add_decorator(main, Box::new(CameraDecorator::default()));
        scene.add_decorator(side, Box::new(CameraDecorator::new(false)));

        assert_eq!(scene.all_cameras(), vec![main, side]);
        assert_eq!(scene.find_camera("side"), Some(side));
        assert_eq!(scene.active_camera(), None);
        assert!(!scene.set_active_camera("missing"));
        assert!(scene.set_active_camera("side"));
        assert_eq!(scene.active_camera(), Some(side));

        scene.set_parent(side, None).unwrap();
        scene.destroy_node(side).unwrap();
        assert_eq!(scene.active_camera(), None);
    }

    #[test]
    fn bounding_box_covers_subtree() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, a, "b");
        assert!(scene.bounding_box(a).is_none());

        let unit = Arc::new(MeshData::new(vec![Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)]));
        scene.set_mesh_data(a, Some(unit.clone()));
        scene.set_mesh_data(b, Some(unit));
        scene.set_position(b, Vec3::new(4.0, 0.0, 0.0));

        let bounds = scene.bounding_box(a).unwrap();
        assert_vec(bounds.min, Vec3::zeros());
        assert_vec(bounds.max, Vec3::new(5.0, 1.0, 1.0));
    }

    #[test]
    fn find_by_name_only_searches_tree() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let loose = scene.create_node("loose");
        assert_eq!(scene.find_by_name("a"), Some(a));
        assert_eq!(scene.find_by_name("loose"), None);
        assert!(scene.find_node(loose).is_none());
        assert!(scene.node(loose).is_some());
    }

    #[test]
    fn signals_fire_on_mutation() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");

        let transforms = Arc::new(AtomicUsize::new(0));
        let changes = Arc::new(AtomicUsize::new(0));
        let t = transforms.clone();
        scene.signals().transformation_changed.connect(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        });
        let c = changes.clone();
        scene.signals().scene_changed.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        scene.translate(a, Vec3::new(1.0, 0.0, 0.0), TransformSpace::Local);
        scene.set_locked(a, true);
        scene.translate(a, Vec3::new(1.0, 0.0, 0.0), TransformSpace::Local);
        assert_eq!(transforms.load(Ordering::SeqCst), 1);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detaching_prunes_selection() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, a, "b");
        let c = attached(&mut scene, root, "c");
        scene.select(b);
        scene.select(c);

        scene.remove_child(root, a);
        assert_eq!(scene.selection().selected_nodes(), &[c]);
    }

    #[test]
    fn select_refuses_nodes_outside_tree() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let loose = scene.create_node("loose");
        let gone = scene.create_node("gone");
        scene.destroy_node(gone).unwrap();

        assert!(!scene.select(loose));
        assert!(!scene.select(gone));
        assert!(scene.select(a));
        assert!(!scene.select(a));
        assert_eq!(scene.selection().selected_nodes(), &[a]);
    }

    #[test]
    fn select_refuses_unselectable_nodes() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        let b = attached(&mut scene, a, "b");
        let c = attached(&mut scene, root, "c");
        scene.set_enabled(a, false);
        scene.set_selectable(c, false);

        assert!(!scene.select(b));
        assert!(!scene.select(c));
        assert!(!scene.toggle_selected(c));
        assert_eq!(scene.selection().count(), 0);

        scene.set_enabled(a, true);
        assert!(scene.toggle_selected(b));
        assert!(!scene.toggle_selected(b));
        assert_eq!(scene.selection().count(), 0);
    }

    #[test]
    fn shared_scene_readers() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = attached(&mut scene, root, "a");
        scene.set_position(a, Vec3::new(1.0, 2.0, 3.0));
        let shared = scene.into_shared();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.read().world_position(a))
            })
            .collect();
        for reader in readers {
            assert_vec(reader.join().unwrap().unwrap(), Vec3::new(1.0, 2.0, 3.0));
        }
    }
}
