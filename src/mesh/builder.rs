//! Incremental construction of vegetation meshes and conversion to render meshes.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, Mesh, PrimitiveTopology};
use bevy::prelude::*;

use super::{MeshError, VegetationMesh, vertex_data::BakedVertex};

/// Builder for [`VegetationMesh`] instances.
///
/// # Example
/// ```ignore
/// use bevy_vegetation_bake::mesh::VegetationMeshBuilder;
///
/// let leaf = VegetationMeshBuilder::new()
///     .with_vertex([0.0, 0.0, 0.0])
///     .with_vertex([1.0, 0.0, 0.0])
///     .with_vertex([1.0, 1.0, 0.0])
///     .with_vertex([0.0, 1.0, 0.0])
///     .with_polygon([0, 1, 2, 3])
///     .build()?;
/// ```
#[derive(Default)]
pub struct VegetationMeshBuilder {
    positions: Vec<Vec3>,
    polygons: Vec<Vec<u32>>,
}

impl VegetationMeshBuilder {
    /// Create a new empty mesh builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, polygon_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count),
            polygons: Vec::with_capacity(polygon_count),
        }
    }

    /// Add a vertex.
    pub fn with_vertex(mut self, position: impl Into<Vec3>) -> Self {
        self.push_vertex(position.into());
        self
    }

    /// Add a vertex (mutable version for loops). Returns its index.
    pub fn push_vertex(&mut self, position: Vec3) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }

    /// Add a polygon by vertex indices.
    pub fn with_polygon(mut self, indices: impl Into<Vec<u32>>) -> Self {
        self.polygons.push(indices.into());
        self
    }

    /// Add a polygon (mutable version).
    pub fn push_polygon(&mut self, indices: &[u32]) {
        self.polygons.push(indices.to_vec());
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.polygons.push(vec![a, b, c]);
    }

    pub fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.polygons.push(vec![a, b, c, d]);
    }

    /// Get the current vertex count.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the current polygon count.
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Build the mesh, validating every polygon.
    pub fn build(self) -> Result<VegetationMesh, MeshError> {
        VegetationMesh::from_polygons(self.positions, self.polygons)
    }
}

impl VegetationMesh {
    /// One [`BakedVertex`] per loop: position, shading normal and active color.
    ///
    /// Loops are split so per-corner colors and normals survive. Meshes
    /// without a color layer export opaque white.
    pub fn baked_vertices(&self) -> Vec<BakedVertex> {
        let normals = self.loop_normals();
        let colors = self.active_color_layer().map(|layer| layer.colors());

        self.loop_positions()
            .enumerate()
            .map(|(i, position)| BakedVertex {
                position: position.to_array(),
                normal: normals[i].to_array(),
                color: colors.and_then(|c| c.get(i).copied()).unwrap_or([1.0; 4]),
            })
            .collect()
    }

    /// Convert to a triangulated bevy [`Mesh`] carrying the baked vertex
    /// colors in `ATTRIBUTE_COLOR` and shading normals in `ATTRIBUTE_NORMAL`.
    ///
    /// Returns `None` if the mesh has no polygons.
    pub fn to_render_mesh(&self) -> Option<Mesh> {
        if self.is_empty() {
            return None;
        }

        let vertices = self.baked_vertices();
        let indices: Vec<u32> = self.triangle_loops().flatten().collect();

        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
        );

        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vertices.iter().map(|v| v.position).collect::<Vec<_>>(),
        );
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_NORMAL,
            vertices.iter().map(|v| v.normal).collect::<Vec<_>>(),
        );
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_COLOR,
            vertices.iter().map(|v| v.color).collect::<Vec<_>>(),
        );
        mesh.insert_indices(Indices::U32(indices));

        Some(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_card() -> VegetationMesh {
        VegetationMeshBuilder::new()
            .with_vertex([0.0, 0.0, 0.0])
            .with_vertex([1.0, 0.0, 0.0])
            .with_vertex([1.0, 1.0, 0.0])
            .with_vertex([0.0, 1.0, 0.0])
            .with_polygon([0, 1, 2, 3])
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_basic() {
        let mesh = leaf_card();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.polygon_count(), 1);
    }

    #[test]
    fn test_builder_invalid_index() {
        let mut builder = VegetationMeshBuilder::with_capacity(3, 1);
        let a = builder.push_vertex(Vec3::ZERO);
        let b = builder.push_vertex(Vec3::X);
        builder.push_triangle(a, b, 9);
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_push_mixed_polygons() {
        let mut builder = VegetationMeshBuilder::with_capacity(5, 2);
        for p in [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y, Vec3::new(0.5, 2.0, 0.0)] {
            builder.push_vertex(p);
        }
        builder.push_quad(0, 1, 2, 3);
        builder.push_polygon(&[3, 2, 4]);

        let mesh = builder.build().unwrap();
        assert_eq!(mesh.polygon_count(), 2);
        assert_eq!(mesh.loop_count(), 7);
        assert_eq!(mesh.polygon_vertices(0), &[0, 1, 2, 3]);
        assert_eq!(mesh.polygon_vertices(1), &[3, 2, 4]);
    }

    #[test]
    fn test_empty_mesh_has_no_render_mesh() {
        let mesh = VegetationMeshBuilder::new().build().unwrap();
        assert!(mesh.is_empty());
        assert!(mesh.to_render_mesh().is_none());
    }

    #[test]
    fn test_render_mesh_attributes() {
        let mut mesh = leaf_card();
        mesh.active_color_layer_or_create().set(2, [0.25, 0.5, 0.75, 1.0]);

        let render = mesh.to_render_mesh().unwrap();
        assert_eq!(render.count_vertices(), 4);
        assert!(render.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert!(render.attribute(Mesh::ATTRIBUTE_COLOR).is_some());
        assert_eq!(render.indices().map(|i| i.len()), Some(6));
    }

    #[test]
    fn test_baked_vertices_default_white() {
        let mesh = leaf_card();
        let vertices = mesh.baked_vertices();
        assert_eq!(vertices.len(), 4);
        assert!(vertices.iter().all(|v| v.color == [1.0; 4]));
        assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }
}
