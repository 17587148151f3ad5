use std::time::Instant;

use meridian_core::history::{Operation, OperationError, OperationKind, OperationResult};
use meridian_core::math::{Quat, Transform, TransformSpace, Vec3};

use crate::node::NodeId;
use crate::scene::Scene;

/// Before/after bookkeeping shared by all transform operations.
#[derive(Debug, Clone, Copy)]
struct TransformEdit {
    node: NodeId,
    before: Option<Transform>,
    after: Option<Transform>,
}

impl TransformEdit {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            before: None,
            after: None,
        }
    }

    /// Runs `apply` on the first call and records the result; afterwards
    /// writes the recorded result. Only the first call honours the lock.
    fn redo(
        &mut self,
        scene: &mut Scene,
        apply: impl FnOnce(&mut Scene, NodeId) -> bool,
    ) -> OperationResult {
        if let Some(after) = self.after {
            return write(scene, self.node, after);
        }
        let before = scene
            .local_transform(self.node)
            .ok_or_else(|| not_found(self.node))?;
        if !apply(scene, self.node) {
            return Err(rejected(scene, self.node));
        }
        self.before = Some(before);
        self.after = scene.local_transform(self.node);
        Ok(())
    }

    fn undo(&self, scene: &mut Scene) -> OperationResult {
        let before = self
            .before
            .ok_or_else(|| OperationError::InvalidState("operation was never applied".into()))?;
        write(scene, self.node, before)
    }

    /// `older` followed by `self`.
    fn merged(&self, older: &TransformEdit) -> Self {
        Self {
            node: self.node,
            before: older.before,
            after: self.after,
        }
    }
}

fn not_found(node: NodeId) -> OperationError {
    OperationError::TargetNotFound(format!("{node:?}"))
}

fn rejected(scene: &Scene, node: NodeId) -> OperationError {
    if scene.is_locked(node) {
        log::warn!("Transform of locked node {node:?} rejected");
        OperationError::InvalidState(format!("node {node:?} is locked"))
    } else {
        OperationError::InvalidState(format!("transform of node {node:?} could not be applied"))
    }
}

/// Replays a recorded transform, ignoring the lock flag.
fn write(scene: &mut Scene, node: NodeId, transform: Transform) -> OperationResult {
    if !scene.restore_local_transform(node, transform) {
        return Err(not_found(node));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Translate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum TranslateChange {
    By { delta: Vec3, space: TransformSpace },
    ToWorld(Vec3),
}

/// Moves a node.
#[derive(Debug, Clone)]
pub struct TranslateOperation {
    edit: TransformEdit,
    change: TranslateChange,
    created: Instant,
}

impl TranslateOperation {
    /// Moves `node` by `delta` in world space.
    pub fn new(node: NodeId, delta: Vec3) -> Self {
        Self {
            edit: TransformEdit::new(node),
            change: TranslateChange::By {
                delta,
                space: TransformSpace::World,
            },
            created: Instant::now(),
        }
    }

    /// Moves `node` so that its origin ends up at the world-space `position`.
    pub fn set_position(node: NodeId, position: Vec3) -> Self {
        Self {
            edit: TransformEdit::new(node),
            change: TranslateChange::ToWorld(position),
            created: Instant::now(),
        }
    }

    /// Interprets the delta in `space` instead of world space. Has no effect
    /// on absolute moves.
    #[must_use]
    pub fn in_space(mut self, space: TransformSpace) -> Self {
        if let TranslateChange::By { delta, .. } = self.change {
            self.change = TranslateChange::By { delta, space };
        }
        self
    }
}

impl Operation<Scene> for TranslateOperation {
    fn redo(&mut self, target: &mut Scene) -> OperationResult {
        let change = self.change;
        self.edit.redo(target, |scene, node| match change {
            TranslateChange::By { delta, space } => scene.translate(node, delta, space),
            TranslateChange::ToWorld(position) => scene.set_world_position(node, position),
        })
    }

    fn undo(&mut self, target: &mut Scene) -> OperationResult {
        self.edit.undo(target)
    }

    fn description(&self) -> &str {
        "Translate"
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Translate
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.edit.node)
    }

    fn timestamp(&self) -> Instant {
        self.created
    }

    fn merge_with(&self, older: &dyn Operation<Scene>) -> Option<Box<dyn Operation<Scene>>> {
        let older = older.as_any().downcast_ref::<Self>()?;
        Some(Box::new(Self {
            edit: self.edit.merged(&older.edit),
            ..self.clone()
        }))
    }
}

// ---------------------------------------------------------------------------
// Rotate
// ---------------------------------------------------------------------------

/// Rotates a node about its origin or about a world-space pivot.
#[derive(Debug, Clone)]
pub struct RotateOperation {
    edit: TransformEdit,
    rotation: Quat,
    space: TransformSpace,
    pivot: Option<Vec3>,
    created: Instant,
}

impl RotateOperation {
    /// Rotates `node` by a world-space `rotation` about its own origin.
    pub fn new(node: NodeId, rotation: Quat) -> Self {
        Self {
            edit: TransformEdit::new(node),
            rotation,
            space: TransformSpace::World,
            pivot: None,
            created: Instant::now(),
        }
    }

    /// Rotates about a world-space point instead; the node's position orbits it.
    #[must_use]
    pub fn around_point(mut self, pivot: Vec3) -> Self {
        self.pivot = Some(pivot);
        self
    }

    /// Interprets the rotation in `space`. Ignored when a pivot is set.
    #[must_use]
    pub fn in_space(mut self, space: TransformSpace) -> Self {
        self.space = space;
        self
    }
}

impl Operation<Scene> for RotateOperation {
    fn redo(&mut self, target: &mut Scene) -> OperationResult {
        let (rotation, space, pivot) = (self.rotation, self.space, self.pivot);
        self.edit.redo(target, |scene, node| match pivot {
            Some(pivot) => scene.rotate_around(node, rotation, pivot),
            None => scene.rotate(node, rotation, space),
        })
    }

    fn undo(&mut self, target: &mut Scene) -> OperationResult {
        self.edit.undo(target)
    }

    fn description(&self) -> &str {
        "Rotate"
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Rotate
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.edit.node)
    }

    fn timestamp(&self) -> Instant {
        self.created
    }

    fn merge_with(&self, older: &dyn Operation<Scene>) -> Option<Box<dyn Operation<Scene>>> {
        let older = older.as_any().downcast_ref::<Self>()?;
        Some(Box::new(Self {
            edit: self.edit.merged(&older.edit),
            ..self.clone()
        }))
    }
}

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum ScaleChange {
    Relative { factors: Vec3, space: TransformSpace },
    Absolute(Vec3),
    Add(Vec3),
}

/// Scales a node.
#[derive(Debug, Clone)]
pub struct ScaleOperation {
    edit: TransformEdit,
    change: ScaleChange,
    pivot: Option<Vec3>,
    created: Instant,
}

impl ScaleOperation {
    /// Multiplies the local scale of `node` by `factors`.
    pub fn new(node: NodeId, factors: Vec3) -> Self {
        Self::with_change(
            node,
            ScaleChange::Relative {
                factors,
                space: TransformSpace::Local,
            },
        )
    }

    /// Sets the local scale of `node` to `scale`.
    pub fn set_scale(node: NodeId, scale: Vec3) -> Self {
        Self::with_change(node, ScaleChange::Absolute(scale))
    }

    /// Adds `delta` to the local scale of `node`.
    pub fn add_scale(node: NodeId, delta: Vec3) -> Self {
        Self::with_change(node, ScaleChange::Add(delta))
    }

    fn with_change(node: NodeId, change: ScaleChange) -> Self {
        Self {
            edit: TransformEdit::new(node),
            change,
            pivot: None,
            created: Instant::now(),
        }
    }

    /// Scales along world axes about a world-space point. Only affects
    /// relative scaling.
    #[must_use]
    pub fn around_point(mut self, pivot: Vec3) -> Self {
        self.pivot = Some(pivot);
        self
    }

    /// Applies relative factors along the axes of `space`.
    #[must_use]
    pub fn in_space(mut self, space: TransformSpace) -> Self {
        if let ScaleChange::Relative { factors, .. } = self.change {
            self.change = ScaleChange::Relative { factors, space };
        }
        self
    }
}

impl Operation<Scene> for ScaleOperation {
    fn redo(&mut self, target: &mut Scene) -> OperationResult {
        let (change, pivot) = (self.change, self.pivot);
        self.edit.redo(target, |scene, node| match (change, pivot) {
            (ScaleChange::Relative { factors, .. }, Some(pivot)) => {
                scene.scale_around(node, factors, pivot)
            }
            (ScaleChange::Relative { factors, space }, None) => scene.scale(node, factors, space),
            (ScaleChange::Absolute(scale), _) => scene.set_scale(node, scale),
            (ScaleChange::Add(delta), _) => match scene.local_transform(node) {
                Some(current) => scene.set_scale(node, current.scale + delta),
                None => false,
            },
        })
    }

    fn undo(&mut self, target: &mut Scene) -> OperationResult {
        self.edit.undo(target)
    }

    fn description(&self) -> &str {
        "Scale"
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Scale
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.edit.node)
    }

    fn timestamp(&self) -> Instant {
        self.created
    }

    fn merge_with(&self, older: &dyn Operation<Scene>) -> Option<Box<dyn Operation<Scene>>> {
        let older = older.as_any().downcast_ref::<Self>()?;
        Some(Box::new(Self {
            edit: self.edit.merged(&older.edit),
            ..self.clone()
        }))
    }
}

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

/// Mirrors a node along world axes.
#[derive(Debug, Clone)]
pub struct MirrorOperation {
    edit: TransformEdit,
    factors: Vec3,
    pivot: Option<Vec3>,
    created: Instant,
}

impl MirrorOperation {
    /// Mirrors `node` about its origin along every world axis whose entry
    /// in `axes` is `true`.
    pub fn new(node: NodeId, axes: [bool; 3]) -> Self {
        let flip = |mirrored: bool| if mirrored { -1.0 } else { 1.0 };
        Self {
            edit: TransformEdit::new(node),
            factors: Vec3::new(flip(axes[0]), flip(axes[1]), flip(axes[2])),
            pivot: None,
            created: Instant::now(),
        }
    }

    /// Mirrors about a world-space point instead of the node's origin.
    #[must_use]
    pub fn around_point(mut self, pivot: Vec3) -> Self {
        self.pivot = Some(pivot);
        self
    }
}

impl Operation<Scene> for MirrorOperation {
    fn redo(&mut self, target: &mut Scene) -> OperationResult {
        let (factors, pivot) = (self.factors, self.pivot);
        self.edit.redo(target, |scene, node| match pivot {
            Some(pivot) => scene.scale_around(node, factors, pivot),
            None => scene.scale(node, factors, TransformSpace::World),
        })
    }

    fn undo(&mut self, target: &mut Scene) -> OperationResult {
        self.edit.undo(target)
    }

    fn description(&self) -> &str {
        "Mirror"
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Mirror
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.edit.node)
    }

    fn timestamp(&self) -> Instant {
        self.created
    }

    fn merge_with(&self, older: &dyn Operation<Scene>) -> Option<Box<dyn Operation<Scene>>> {
        let older = older.as_any().downcast_ref::<Self>()?;
        Some(Box::new(Self {
            edit: self.edit.merged(&older.edit),
            ..self.clone()
        }))
    }
}

// ---------------------------------------------------------------------------
// SetTransform
// ---------------------------------------------------------------------------

/// Replaces components of a node's local transform.
#[derive(Debug, Clone)]
pub struct SetTransformOperation {
    edit: TransformEdit,
    translation: Option<Vec3>,
    orientation: Option<Quat>,
    scale: Option<Vec3>,
    created: Instant,
}

impl SetTransformOperation {
    /// Creates an operation that leaves every component unchanged until
    /// one is specified.
    pub fn new(node: NodeId) -> Self {
        Self {
            edit: TransformEdit::new(node),
            translation: None,
            orientation: None,
            scale: None,
            created: Instant::now(),
        }
    }

    /// Replaces all three components with those of `transform`.
    pub fn to_transform(node: NodeId, transform: Transform) -> Self {
        Self::new(node)
            .with_translation(transform.translation)
            .with_orientation(transform.rotation)
            .with_scale(transform.scale)
    }

    #[must_use]
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = Some(translation);
        self
    }

    #[must_use]
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = Some(orientation);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = Some(scale);
        self
    }
}

impl Operation<Scene> for SetTransformOperation {
    fn redo(&mut self, target: &mut Scene) -> OperationResult {
        let (translation, orientation, scale) = (self.translation, self.orientation, self.scale);
        self.edit.redo(target, |scene, node| {
            let Some(mut transform) = scene.local_transform(node) else {
                return false;
            };
            if let Some(translation) = translation {
                transform.translation = translation;
            }
            if let Some(orientation) = orientation {
                transform.rotation = orientation;
            }
            if let Some(scale) = scale {
                transform.scale = scale;
            }
            scene.set_local_transformation(node, transform)
        })
    }

    fn undo(&mut self, target: &mut Scene) -> OperationResult {
        self.edit.undo(target)
    }

    fn description(&self) -> &str {
        "Set transform"
    }

    fn kind(&self) -> OperationKind {
        OperationKind::SetTransform
    }

    fn target(&self) -> Option<NodeId> {
        Some(self.edit.node)
    }

    fn timestamp(&self) -> Instant {
        self.created
    }

    fn merge_with(&self, older: &dyn Operation<Scene>) -> Option<Box<dyn Operation<Scene>>> {
        let older = older.as_any().downcast_ref::<Self>()?;
        Some(Box::new(Self {
            edit: self.edit.merged(&older.edit),
            ..self.clone()
        }))
    }
}
