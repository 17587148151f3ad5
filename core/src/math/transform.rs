use super::{Mat4, Quat, Vec3, mat4_from_scale_rotation_translation, to_scale_rotation_translation};

/// Coordinate frame in which a relative transform change is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransformSpace {
    /// The node's own axes (after its rotation and scale).
    #[default]
    Local,
    /// The parent's axes.
    Parent,
    /// World (root) axes.
    World,
}

/// Local transform of a scene node.
///
/// Stores translation, rotation, and scale separately and composes them
/// into a matrix on demand (T * R * S).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent.
    pub translation: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Non-uniform scale. A negative component encodes a mirror.
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform: origin position, no rotation, unit scale.
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Create from translation, rotation, and scale.
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Create from translation only (identity rotation and scale).
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Create from rotation only (origin position and unit scale).
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::identity()
        }
    }

    /// Create from scale only.
    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::identity()
        }
    }

    /// Decompose an affine matrix. Shear is discarded.
    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, translation) = to_scale_rotation_translation(m);
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Returns this transform with a different translation.
    #[must_use]
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Returns this transform with a different rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns this transform with a different scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Compute the 4x4 transform matrix (T * R * S).
    pub fn to_matrix(&self) -> Mat4 {
        mat4_from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Compares the composed matrices of two transforms.
    ///
    /// Exact component equality rarely survives a decomposition round-trip.
    pub fn approx_eq(&self, other: &Transform, epsilon: f32) -> bool {
        (self.to_matrix() - other.to_matrix()).abs().max() <= epsilon
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
