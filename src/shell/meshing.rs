//! Surface nets tessellation of an [`ImplicitSurfaceProxy`].

use bevy::prelude::*;

use super::proxy::{DEFAULT_RESOLUTION, DEFAULT_STIFFNESS, DEFAULT_THRESHOLD, ImplicitSurfaceProxy};
use crate::mesh::{MeshError, VegetationMesh};

/// Empty cells kept around the field bounds on every side.
pub const PADDING_CELLS: u32 = 2;

/// Default cap on grid cells along one axis.
pub const DEFAULT_MAX_CELLS_PER_AXIS: u32 = 256;

/// Cube corner pairs joined by an edge. Corner `c` sits at
/// `(c & 1, (c >> 1) & 1, (c >> 2) & 1)`.
const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// How shell proxies are built and tessellated.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct ShellMeshingConfig {
    /// Grid cell size in host units.
    pub resolution: f32,
    /// Iso-value of the extracted surface.
    pub threshold: f32,
    /// Peak contribution of each sphere.
    pub stiffness: f32,
    /// Upper bound on cells per axis. Larger shells get coarser cells.
    ///
    /// The sample grid is dense and stores 16 bytes per sample, so memory
    /// grows with the cube of this value: about 270 MB at 256, 34 MB at 128.
    pub max_cells_per_axis: u32,
}

impl Default for ShellMeshingConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            threshold: DEFAULT_THRESHOLD,
            stiffness: DEFAULT_STIFFNESS,
            max_cells_per_axis: DEFAULT_MAX_CELLS_PER_AXIS,
        }
    }
}

impl ShellMeshingConfig {
    /// An empty proxy carrying this configuration's field parameters.
    pub fn proxy(&self) -> ImplicitSurfaceProxy {
        ImplicitSurfaceProxy {
            spheres: Vec::new(),
            resolution: self.resolution,
            threshold: self.threshold,
            stiffness: self.stiffness,
        }
    }
}

// ============================================================================
// Sampling
// ============================================================================

/// Field values and gradients on a regular lattice of sample points.
struct SampleGrid {
    origin: Vec3,
    cell_size: f32,
    /// Samples per axis, one more than cells per axis.
    dims: UVec3,
    values: Vec<f32>,
    gradients: Vec<Vec3>,
}

impl SampleGrid {
    /// Samples `proxy` over its padded bounds. `None` when it has no spheres.
    fn sample(proxy: &ImplicitSurfaceProxy, max_cells_per_axis: u32) -> Option<Self> {
        let (lo, hi) = proxy.bounds()?;
        let extent = hi - lo;

        let mut cell_size = if proxy.resolution.is_finite() && proxy.resolution > 0.0 {
            proxy.resolution
        } else {
            DEFAULT_RESOLUTION
        };

        // A cell no wider than a sphere's iso-radius always has a sample
        // point inside that sphere, so small spheres cannot fall between samples.
        if let Some(iso) = proxy.min_iso_radius()
            && iso < cell_size
        {
            debug!("Refining shell cells from {} to {} for small spheres", cell_size, iso);
            cell_size = iso;
        }

        let max_cells = max_cells_per_axis.max(2 * PADDING_CELLS + 1);
        let cells_along = |length: f32, size: f32| (length / size).ceil() as u32 + 2 * PADDING_CELLS;

        if cells_along(extent.max_element(), cell_size) > max_cells {
            let enlarged = extent.max_element() / (max_cells - 2 * PADDING_CELLS) as f32;
            warn!(
                "Shell grid exceeds {} cells per axis at cell size {}, using {}; \
                 spheres smaller than {} may be missed",
                max_cells, cell_size, enlarged, enlarged
            );
            cell_size = enlarged;
        }

        let cells = UVec3::new(
            cells_along(extent.x, cell_size).min(max_cells),
            cells_along(extent.y, cell_size).min(max_cells),
            cells_along(extent.z, cell_size).min(max_cells),
        );
        let dims = cells + UVec3::ONE;
        let origin = lo - Vec3::splat(PADDING_CELLS as f32 * cell_size);
        let count = (dims.x * dims.y * dims.z) as usize;

        let mut grid = Self {
            origin,
            cell_size,
            dims,
            values: vec![0.0; count],
            gradients: vec![Vec3::ZERO; count],
        };
        grid.splat(proxy);

        debug!(
            "Sampled {} spheres on a {}x{}x{} grid",
            proxy.sphere_count(),
            dims.x,
            dims.y,
            dims.z
        );
        Some(grid)
    }

    /// Accumulates every sphere into the samples inside its bounds only.
    fn splat(&mut self, proxy: &ImplicitSurfaceProxy) {
        let last = (self.dims - UVec3::ONE).as_vec3();

        for sphere in &proxy.spheres {
            if sphere.radius <= 0.0 {
                continue;
            }
            let lo = ((sphere.min() - self.origin) / self.cell_size).ceil().max(Vec3::ZERO);
            let hi = ((sphere.max() - self.origin) / self.cell_size).floor().min(last);
            if lo.cmpgt(hi).any() {
                continue;
            }
            let (lo, hi) = (lo.as_uvec3(), hi.as_uvec3());

            for z in lo.z..=hi.z {
                for y in lo.y..=hi.y {
                    for x in lo.x..=hi.x {
                        let point = UVec3::new(x, y, z);
                        let p = self.position(point);
                        if let Some((value, gradient)) = proxy.sphere_contribution(sphere, p) {
                            let i = self.index(point);
                            self.values[i] += value;
                            self.gradients[i] += gradient;
                        }
                    }
                }
            }
        }
    }

    #[inline]
    fn index(&self, point: UVec3) -> usize {
        (point.x + self.dims.x * (point.y + self.dims.y * point.z)) as usize
    }

    #[inline]
    fn position(&self, point: UVec3) -> Vec3 {
        self.origin + point.as_vec3() * self.cell_size
    }

    #[inline]
    fn value(&self, point: UVec3) -> f32 {
        self.values[self.index(point)]
    }

    /// Trilinear blend of the corner gradients of `cell` at `local` in `[0, 1]³`.
    fn gradient_at(&self, cell: UVec3, local: Vec3) -> Vec3 {
        (0..8).fold(Vec3::ZERO, |acc, c| {
            let offset = corner_offset(c);
            let weight = Vec3::select(offset.cmpgt(Vec3::splat(0.5)), local, Vec3::ONE - local);
            acc + self.gradients[self.index(cell + offset.as_uvec3())] * weight.element_product()
        })
    }
}

#[inline]
fn corner_offset(corner: usize) -> Vec3 {
    Vec3::new(
        (corner & 1) as f32,
        ((corner >> 1) & 1) as f32,
        ((corner >> 2) & 1) as f32,
    )
}

// ============================================================================
// Tessellation
// ============================================================================

/// Extracts the proxy's iso-surface as a triangle mesh in proxy-local space.
///
/// One vertex is placed per grid cell straddling the threshold, at the
/// average of its edge crossings. Every lattice edge that crosses the surface
/// emits a quad joining the four cells around it, wound so the face normal
/// points out of the field. Each loop carries the negative field gradient as
/// its custom normal. An empty proxy yields an empty mesh.
///
/// # Arguments
/// * `proxy` - Sphere field to tessellate
/// * `max_cells_per_axis` - Grid size cap, see [`ShellMeshingConfig`]
pub fn tessellate(
    proxy: &ImplicitSurfaceProxy,
    max_cells_per_axis: u32,
) -> Result<VegetationMesh, MeshError> {
    let Some(grid) = SampleGrid::sample(proxy, max_cells_per_axis) else {
        return Ok(VegetationMesh::default());
    };

    let threshold = proxy.threshold;
    let dims = grid.dims;
    let cells = dims - UVec3::ONE;
    let cell_index = |c: UVec3| (c.x + cells.x * (c.y + cells.y * c.z)) as usize;

    let mut cell_vertex = vec![u32::MAX; (cells.x * cells.y * cells.z) as usize];
    let mut positions = Vec::new();
    let mut vertex_normals = Vec::new();

    for z in 0..cells.z {
        for y in 0..cells.y {
            for x in 0..cells.x {
                let cell = UVec3::new(x, y, z);
                let corners: [f32; 8] =
                    std::array::from_fn(|c| grid.value(cell + corner_offset(c).as_uvec3()));

                let inside = corners.iter().filter(|&&v| v >= threshold).count();
                if inside == 0 || inside == 8 {
                    continue;
                }

                let mut sum = Vec3::ZERO;
                let mut crossings = 0;
                for (a, b) in CUBE_EDGES {
                    let (va, vb) = (corners[a], corners[b]);
                    if (va >= threshold) != (vb >= threshold) {
                        let t = (threshold - va) / (vb - va);
                        sum += corner_offset(a).lerp(corner_offset(b), t);
                        crossings += 1;
                    }
                }
                let local = sum / crossings as f32;
                let position = grid.origin + (cell.as_vec3() + local) * grid.cell_size;

                let mut normal = (-grid.gradient_at(cell, local)).normalize_or_zero();
                if normal == Vec3::ZERO {
                    normal = proxy.normal(position);
                }

                cell_vertex[cell_index(cell)] = positions.len() as u32;
                positions.push(position);
                vertex_normals.push(normal);
            }
        }
    }

    let mut triangles: Vec<[u32; 3]> = Vec::new();
    for z in 0..dims.z {
        for y in 0..dims.y {
            for x in 0..dims.x {
                let point = UVec3::new(x, y, z);
                let inside = grid.value(point) >= threshold;

                for axis in 0..3 {
                    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
                    if point[axis] + 1 >= dims[axis]
                        || point[u] == 0
                        || point[v] == 0
                        || point[u] >= cells[u]
                        || point[v] >= cells[v]
                    {
                        continue;
                    }

                    let mut next = point;
                    next[axis] += 1;
                    if inside == (grid.value(next) >= threshold) {
                        continue;
                    }

                    let around = |du: u32, dv: u32| {
                        let mut c = point;
                        c[u] -= du;
                        c[v] -= dv;
                        cell_vertex[cell_index(c)]
                    };
                    let mut quad = [around(1, 1), around(0, 1), around(0, 0), around(1, 0)];
                    if quad.contains(&u32::MAX) {
                        continue;
                    }
                    // The quad faces +axis; flip it when the inside is above.
                    if !inside {
                        quad.reverse();
                    }

                    triangles.push([quad[0], quad[1], quad[2]]);
                    triangles.push([quad[0], quad[2], quad[3]]);
                }
            }
        }
    }

    let mut mesh = VegetationMesh::from_polygons(positions, triangles)?;
    let normals = mesh
        .loop_vertices()
        .iter()
        .map(|&v| vertex_normals[v as usize])
        .collect();
    mesh.set_custom_normals(normals)?;
    Ok(mesh)
}
