//! Polygon mesh storage for vegetation geometry.
//!
//! Baked attributes are written into the active vertex color layer:
//! - color.r: per-leaf distance falloff
//! - color.g: branch ID
//! - color.b: distance from the branch attach point
//! - color.a: unused (reserved)
//!
//! Shading normals produced by the shell bake are stored as per-loop
//! custom normals.

use bevy::prelude::*;
use thiserror::Error;

mod attributes;
mod builder;
mod color_layer;
mod vertex_data;

pub use attributes::{
    BRANCH_DISTANCE_CHANNEL, BRANCH_ID_CHANNEL, ColorChannel, DEFAULT_COLOR_LAYER,
    LEAF_DISTANCE_CHANNEL,
};
pub use builder::VegetationMeshBuilder;
pub use color_layer::VertexColorLayer;
pub use vertex_data::BakedVertex;

/// Errors raised when mesh data violates its index invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Polygon {polygon} has {count} corners, at least 3 are required")]
    TooFewCorners { polygon: usize, count: usize },

    #[error("Polygon {polygon} references vertex {index}, mesh has {vertex_count} vertices")]
    VertexIndexOutOfRange {
        polygon: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Expected {expected} per-loop values, got {found}")]
    LoopCountMismatch { expected: usize, found: usize },

    #[error("Color layer {index} does not exist ({count} layers)")]
    ColorLayerOutOfRange { index: usize, count: usize },
}

/// A contiguous run of loops forming one polygon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Polygon {
    pub loop_start: u32,
    pub loop_count: u32,
}

impl Polygon {
    #[inline]
    pub fn loops(&self) -> std::ops::Range<usize> {
        let start = self.loop_start as usize;
        start..start + self.loop_count as usize
    }
}

/// A polygon mesh owned by a scene node.
///
/// Positions are in the node's local space. Each polygon is a span of the
/// flat loop array, and each loop references one vertex.
#[derive(Component, Clone, Debug, Default)]
pub struct VegetationMesh {
    positions: Vec<Vec3>,
    loops: Vec<u32>,
    polygons: Vec<Polygon>,
    color_layers: Vec<VertexColorLayer>,
    active_color_layer: usize,
    custom_normals: Option<Vec<Vec3>>,
}

impl VegetationMesh {
    /// Create a mesh from vertex positions and polygon vertex-index lists.
    ///
    /// # Example
    /// ```
    /// use bevy::prelude::*;
    /// use bevy_vegetation_bake::mesh::VegetationMesh;
    ///
    /// let quad = VegetationMesh::from_polygons(
    ///     vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
    ///     [[0u32, 1, 2, 3]],
    /// )
    /// .unwrap();
    /// assert_eq!(quad.loop_count(), 4);
    /// ```
    pub fn from_polygons<P>(
        positions: Vec<Vec3>,
        polygons: impl IntoIterator<Item = P>,
    ) -> Result<Self, MeshError>
    where
        P: AsRef<[u32]>,
    {
        let mut loops = Vec::new();
        let mut spans = Vec::new();

        for (polygon, indices) in polygons.into_iter().enumerate() {
            let indices = indices.as_ref();
            if indices.len() < 3 {
                return Err(MeshError::TooFewCorners {
                    polygon,
                    count: indices.len(),
                });
            }
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(MeshError::VertexIndexOutOfRange {
                    polygon,
                    index,
                    vertex_count: positions.len(),
                });
            }

            spans.push(Polygon {
                loop_start: loops.len() as u32,
                loop_count: indices.len() as u32,
            });
            loops.extend_from_slice(indices);
        }

        Ok(Self {
            positions,
            loops,
            polygons: spans,
            ..default()
        })
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// `true` when the mesh has no polygons.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Vertex indices of one polygon, in winding order.
    pub fn polygon_vertices(&self, polygon: usize) -> &[u32] {
        self.polygons
            .get(polygon)
            .map(|p| &self.loops[p.loops()])
            .unwrap_or(&[])
    }

    /// Vertex index referenced by each loop.
    pub fn loop_vertices(&self) -> &[u32] {
        &self.loops
    }

    /// Local-space position under each loop, in loop order.
    ///
    /// A vertex shared by several polygons is yielded once per loop.
    pub fn loop_positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.loops.iter().map(|&v| self.positions[v as usize])
    }

    /// Newell normal of a polygon. Degenerate polygons yield `Vec3::ZERO`.
    pub fn face_normal(&self, polygon: usize) -> Vec3 {
        let vertices = self.polygon_vertices(polygon);
        let mut normal = Vec3::ZERO;
        for (i, &a) in vertices.iter().enumerate() {
            let p = self.positions[a as usize];
            let q = self.positions[vertices[(i + 1) % vertices.len()] as usize];
            normal += Vec3::new(
                (p.y - q.y) * (p.z + q.z),
                (p.z - q.z) * (p.x + q.x),
                (p.x - q.x) * (p.y + q.y),
            );
        }
        normal.normalize_or_zero()
    }

    /// Fan triangulation of every polygon, as triples of loop indices.
    pub fn triangle_loops(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.polygons.iter().flat_map(|p| {
            let start = p.loop_start;
            (1..p.loop_count - 1).map(move |i| [start, start + i, start + i + 1])
        })
    }

    // =========================================================================
    // Color layers
    // =========================================================================

    pub fn color_layers(&self) -> &[VertexColorLayer] {
        &self.color_layers
    }

    pub fn has_color_layers(&self) -> bool {
        !self.color_layers.is_empty()
    }

    pub fn active_color_layer(&self) -> Option<&VertexColorLayer> {
        self.color_layers.get(self.active_color_layer)
    }

    /// The active color layer, created zero-initialized if the mesh has none.
    pub fn active_color_layer_or_create(&mut self) -> &mut VertexColorLayer {
        if self.color_layers.is_empty() {
            self.color_layers
                .push(VertexColorLayer::zeroed(DEFAULT_COLOR_LAYER, self.loops.len()));
            self.active_color_layer = 0;
        }
        let active = self.active_color_layer.min(self.color_layers.len() - 1);
        &mut self.color_layers[active]
    }

    /// Append a zero-initialized layer and return its index.
    pub fn add_color_layer(&mut self, name: impl Into<String>) -> usize {
        self.color_layers
            .push(VertexColorLayer::zeroed(name, self.loops.len()));
        self.color_layers.len() - 1
    }

    pub fn set_active_color_layer(&mut self, index: usize) -> Result<(), MeshError> {
        if index >= self.color_layers.len() {
            return Err(MeshError::ColorLayerOutOfRange {
                index,
                count: self.color_layers.len(),
            });
        }
        self.active_color_layer = index;
        Ok(())
    }

    // =========================================================================
    // Custom normals
    // =========================================================================

    /// Per-loop shading normals, if any have been assigned.
    pub fn custom_normals(&self) -> Option<&[Vec3]> {
        self.custom_normals.as_deref()
    }

    pub fn set_custom_normals(&mut self, normals: Vec<Vec3>) -> Result<(), MeshError> {
        if normals.len() != self.loops.len() {
            return Err(MeshError::LoopCountMismatch {
                expected: self.loops.len(),
                found: normals.len(),
            });
        }
        self.custom_normals = Some(normals);
        Ok(())
    }

    pub fn clear_custom_normals(&mut self) {
        self.custom_normals = None;
    }

    /// Shading normal of every loop: the custom normal when present,
    /// otherwise the flat normal of the owning polygon.
    pub fn loop_normals(&self) -> Vec<Vec3> {
        if let Some(normals) = &self.custom_normals {
            return normals.clone();
        }

        let mut normals = vec![Vec3::ZERO; self.loops.len()];
        for (i, polygon) in self.polygons.iter().enumerate() {
            let n = self.face_normal(i);
            normals[polygon.loops()].fill(n);
        }
        normals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> VegetationMesh {
        VegetationMesh::from_polygons(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::Y,
            ],
            [[0u32, 1, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_from_polygons_layout() {
        let mesh = VegetationMesh::from_polygons(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            [vec![0u32, 1, 2], vec![0, 2, 3]],
        )
        .unwrap();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.polygon_count(), 2);
        assert_eq!(mesh.loop_count(), 6);
        assert_eq!(mesh.polygon_vertices(1), &[0, 2, 3]);
        assert_eq!(mesh.polygons()[1].loop_start, 3);
        assert_eq!(mesh.loop_positions().count(), 6);
    }

    #[test]
    fn test_rejects_bad_polygons() {
        let err = VegetationMesh::from_polygons(vec![Vec3::ZERO, Vec3::X], [[0u32, 1]]).unwrap_err();
        assert_eq!(err, MeshError::TooFewCorners { polygon: 0, count: 2 });

        let err =
            VegetationMesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Y], [[0u32, 1, 7]])
                .unwrap_err();
        assert!(matches!(err, MeshError::VertexIndexOutOfRange { index: 7, .. }));
    }

    #[test]
    fn test_color_layer_created_lazily() {
        let mut mesh = quad();
        assert!(!mesh.has_color_layers());
        assert!(mesh.active_color_layer().is_none());

        let layer = mesh.active_color_layer_or_create();
        assert_eq!(layer.name(), DEFAULT_COLOR_LAYER);
        assert_eq!(layer.len(), 4);
        assert!(layer.colors().iter().all(|c| *c == [0.0; 4]));

        // A second call reuses the existing layer.
        mesh.active_color_layer_or_create().set(0, [1.0; 4]);
        assert_eq!(mesh.color_layers().len(), 1);
        assert_eq!(mesh.active_color_layer().unwrap().get(0), Some([1.0; 4]));
    }

    #[test]
    fn test_active_color_layer_selection() {
        let mut mesh = quad();
        mesh.add_color_layer("First");
        let second = mesh.add_color_layer("Second");
        mesh.set_active_color_layer(second).unwrap();
        assert_eq!(mesh.active_color_layer_or_create().name(), "Second");
        assert!(mesh.set_active_color_layer(5).is_err());
    }

    #[test]
    fn test_face_normal_and_triangles() {
        let mesh = quad();
        assert!((mesh.face_normal(0) - Vec3::Z).length() < 1e-6);

        let triangles: Vec<_> = mesh.triangle_loops().collect();
        assert_eq!(triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_custom_normals_length_checked() {
        let mut mesh = quad();
        assert!(mesh.set_custom_normals(vec![Vec3::Y; 3]).is_err());
        mesh.set_custom_normals(vec![Vec3::Y; 4]).unwrap();
        assert_eq!(mesh.loop_normals(), vec![Vec3::Y; 4]);

        mesh.clear_custom_normals();
        assert!(mesh.loop_normals().iter().all(|n| (*n - Vec3::Z).length() < 1e-6));
    }
}
