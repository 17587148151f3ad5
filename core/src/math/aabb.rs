use super::{Mat4, Vec3, transform_point};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAlignedBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl AxisAlignedBox {
    /// Creates a box from two corners, sorting the components.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Smallest box containing every point, or `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in points {
            bounds.min = bounds.min.inf(p);
            bounds.max = bounds.max.sup(p);
        }
        Some(bounds)
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn merged(&self, other: &AxisAlignedBox) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Box enclosing the eight transformed corners.
    #[must_use]
    pub fn transformed(&self, m: &Mat4) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        let moved: Vec<Vec3> = corners.iter().map(|c| transform_point(m, c)).collect();
        // Eight corners are never empty.
        Self::from_points(&moved).unwrap_or(*self)
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Size along each axis.
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns `true` if `p` lies inside or on the boundary.
    pub fn contains(&self, p: &Vec3) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }

    /// A box is valid when every component is finite and `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }
}
