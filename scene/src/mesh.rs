//! Immutable mesh payload shared between nodes.
//!
//! The scene never modifies mesh buffers; it stores an `Arc<MeshData>` on a
//! node and hands it to the renderer. Editing tools that change geometry
//! build a new `MeshData`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use meridian_core::math::{AxisAlignedBox, Vec3};

/// Vertex, normal and index buffers with a content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    vertices: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    indices: Option<Vec<u32>>,
    hash: u64,
}

impl MeshData {
    /// Creates a non-indexed mesh from a vertex list.
    pub fn new(vertices: Vec<Vec3>) -> Self {
        let mut mesh = Self {
            vertices,
            normals: None,
            indices: None,
            hash: 0,
        };
        mesh.rehash();
        mesh
    }

    /// Returns this mesh with per-vertex normals.
    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self.rehash();
        self
    }

    /// Returns this mesh with a triangle index buffer.
    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self.rehash();
        self
    }

    fn rehash(&mut self) {
        let mut hasher = DefaultHasher::new();
        // Lengths and the normals tag keep buffer boundaries apart.
        self.vertices.len().hash(&mut hasher);
        for v in &self.vertices {
            v.iter().for_each(|c| c.to_bits().hash(&mut hasher));
        }
        self.normals.is_some().hash(&mut hasher);
        if let Some(normals) = &self.normals {
            normals.len().hash(&mut hasher);
            for n in normals {
                n.iter().for_each(|c| c.to_bits().hash(&mut hasher));
            }
        }
        self.indices.hash(&mut hasher);
        self.hash = hasher.finish();
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Per-vertex normals, when supplied.
    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    /// Triangle index buffer, when supplied.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn face_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertices.len() / 3,
        }
    }

    pub fn has_indices(&self) -> bool {
        self.indices.is_some()
    }

    /// Content hash over all buffers.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Local-space bounds of the vertices, `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<AxisAlignedBox> {
        AxisAlignedBox::from_points(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        MeshData::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ])
    }

    #[test]
    fn counts() {
        let mesh = triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert!(!mesh.has_indices());

        let indexed = triangle().with_indices(vec![0, 1, 2, 2, 1, 0]);
        assert_eq!(indexed.face_count(), 2);
        assert_eq!(indexed.indices(), Some(&[0, 1, 2, 2, 1, 0][..]));
    }

    #[test]
    fn hash_tracks_content() {
        assert_eq!(triangle().hash(), triangle().hash());
        let indexed = triangle().with_indices(vec![0, 1, 2]);
        assert_ne!(triangle().hash(), indexed.hash());
        let shifted = MeshData::new(vec![Vec3::new(5.0, 0.0, 0.0)]);
        assert_ne!(triangle().hash(), shifted.hash());
    }

    #[test]
    fn hash_separates_vertex_and_normal_buffers() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let two_vertices = MeshData::new(vec![a, b]);
        let vertex_and_normal = MeshData::new(vec![a]).with_normals(vec![b]);
        assert_ne!(two_vertices.hash(), vertex_and_normal.hash());

        let empty_normals = MeshData::new(vec![a]).with_normals(Vec::new());
        assert_ne!(MeshData::new(vec![a]).hash(), empty_normals.hash());
    }

    #[test]
    fn bounds() {
        let bounds = triangle().bounding_box().unwrap();
        assert_eq!(bounds.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 0.0));
        assert!(MeshData::new(Vec::new()).bounding_box().is_none());
    }
}
