//! Nearest-surface normal transfer from a shell mesh onto leaf meshes.

use std::collections::HashMap;

use bevy::math::{Affine3A, Mat3};
use bevy::prelude::*;

use crate::mesh::{MeshError, VegetationMesh};
use crate::scene::SceneGraphExt;

/// Name of the binding that feeds shell normals to leaves.
pub const NORMAL_TRANSFER_NAME: &str = "VegetationNormals";

/// How a target loop finds its source normal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransferMapping {
    /// Closest point on the nearest source triangle, with the triangle's
    /// loop normals interpolated barycentrically.
    #[default]
    NearestPolygonInterpolated,
}

/// A named, live link from a source mesh entity to the owning entity.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalTransferBinding {
    pub name: String,
    pub source: Entity,
    pub mapping: TransferMapping,
    /// Cleared whenever the binding changes; set once normals are written.
    pub evaluated: bool,
    stamp: Option<TransferStamp>,
}

/// Inputs a transfer was last computed from. Any difference means the
/// target's normals are stale.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TransferStamp {
    target_world: Affine3A,
    source_world: Affine3A,
    target_mesh: u32,
    source_mesh: u32,
}

impl TransferStamp {
    fn read(world: &World, target: Entity, source: Entity) -> Option<Self> {
        let mesh_tick = |entity: Entity| -> Option<u32> {
            let mesh = world.get_entity(entity).ok()?.get_ref::<VegetationMesh>()?;
            Some(mesh.last_changed().get())
        };
        Some(Self {
            target_world: world.world_transform(target),
            source_world: world.world_transform(source),
            target_mesh: mesh_tick(target)?,
            source_mesh: mesh_tick(source)?,
        })
    }
}

/// Normal transfer bindings attached to a mesh entity, unique by name.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct NormalTransfers {
    bindings: Vec<NormalTransferBinding>,
}

impl NormalTransfers {
    /// Adds a binding or retargets the existing one with the same name.
    ///
    /// Returns `true` when a new binding was added. Either way the binding is
    /// marked for re-evaluation.
    pub fn upsert(&mut self, name: impl Into<String>, source: Entity) -> bool {
        let name = name.into();
        if let Some(binding) = self.bindings.iter_mut().find(|b| b.name == name) {
            binding.source = source;
            binding.mapping = TransferMapping::NearestPolygonInterpolated;
            binding.evaluated = false;
            binding.stamp = None;
            return false;
        }

        self.bindings.push(NormalTransferBinding {
            name,
            source,
            mapping: TransferMapping::NearestPolygonInterpolated,
            evaluated: false,
            stamp: None,
        });
        true
    }

    pub fn get(&self, name: &str) -> Option<&NormalTransferBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalTransferBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn mark_evaluated(&mut self, name: &str, stamp: Option<TransferStamp>) {
        if let Some(binding) = self.bindings.iter_mut().find(|b| b.name == name) {
            binding.evaluated = true;
            binding.stamp = stamp;
        }
    }
}

// ============================================================================
// Source surface
// ============================================================================

/// World-space triangles of a source mesh with per-corner normals.
pub struct ShellSurface {
    triangles: Vec<[Vec3; 3]>,
    normals: Vec<[Vec3; 3]>,
    /// Centroid and circumscribing radius of each triangle, for culling.
    bounds: Vec<(Vec3, f32)>,
}

impl ShellSurface {
    /// Flattens `mesh` into world space. Degenerate triangles are dropped.
    pub fn from_mesh(mesh: &VegetationMesh, world_from_local: &Affine3A) -> Self {
        let loop_normals = mesh.loop_normals();
        let loops = mesh.loop_vertices();
        let positions = mesh.positions();
        let normal_matrix = Mat3::from(world_from_local.matrix3).inverse().transpose();

        let mut surface = Self {
            triangles: Vec::new(),
            normals: Vec::new(),
            bounds: Vec::new(),
        };

        for corners in mesh.triangle_loops() {
            let tri = corners.map(|l| world_from_local.transform_point3(positions[loops[l as usize] as usize]));
            if (tri[1] - tri[0]).cross(tri[2] - tri[0]).length_squared() <= f32::EPSILON * f32::EPSILON {
                continue;
            }

            let center = (tri[0] + tri[1] + tri[2]) / 3.0;
            let radius = tri.iter().map(|p| p.distance(center)).fold(0.0, f32::max);

            surface.triangles.push(tri);
            surface
                .normals
                .push(corners.map(|l| (normal_matrix * loop_normals[l as usize]).normalize_or_zero()));
            surface.bounds.push((center, radius));
        }

        surface
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Interpolated world-space normal at the surface point nearest to `p`.
    pub fn sample_normal(&self, p: Vec3) -> Option<Vec3> {
        let mut best: Option<(f32, usize, Vec3)> = None;

        for (i, tri) in self.triangles.iter().enumerate() {
            let (center, radius) = self.bounds[i];
            if let Some((best_sq, _, _)) = best {
                let lower = (p.distance(center) - radius).max(0.0);
                if lower * lower > best_sq {
                    continue;
                }
            }

            let bary = closest_point_barycentric(p, tri[0], tri[1], tri[2]);
            let closest = tri[0] * bary.x + tri[1] * bary.y + tri[2] * bary.z;
            let d2 = p.distance_squared(closest);
            if best.is_none_or(|(best_sq, _, _)| d2 < best_sq) {
                best = Some((d2, i, bary));
            }
        }

        let (_, i, bary) = best?;
        let [a, b, c] = self.normals[i];
        Some((a * bary.x + b * bary.y + c * bary.z).normalize_or_zero())
    }
}

/// Barycentric coordinates of the point of triangle `abc` closest to `p`.
///
/// Voronoi-region walk over the vertices, edges and face of the triangle.
/// The triangle must not be degenerate.
pub fn closest_point_barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return Vec3::X;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return Vec3::Y;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return Vec3::new(1.0 - v, v, 0.0);
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return Vec3::Z;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return Vec3::new(1.0 - w, 0.0, w);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return Vec3::new(0.0, 1.0 - w, w);
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    Vec3::new(1.0 - v - w, v, w)
}

// ============================================================================
// Evaluation
// ============================================================================

/// Overwrites the custom normals of `target` with normals sampled from
/// `surface`, expressed in the target's local space.
///
/// Loops with no sample (empty surface) keep their current shading normal.
pub fn transfer_normals(
    target: &mut VegetationMesh,
    world_from_local: &Affine3A,
    surface: &ShellSurface,
) -> Result<(), MeshError> {
    // World-to-local for normals is the transpose of the local-to-world linear part.
    let local_from_world = Mat3::from(world_from_local.matrix3).transpose();
    let current = target.loop_normals();

    let normals = target
        .loop_positions()
        .zip(current)
        .map(|(p, fallback)| {
            surface
                .sample_normal(world_from_local.transform_point3(p))
                .map(|n| (local_from_world * n).normalize_or_zero())
                .filter(|n| *n != Vec3::ZERO)
                .unwrap_or(fallback)
        })
        .collect();

    target.set_custom_normals(normals)
}

/// Evaluates every binding that is new or whose inputs changed since it
/// was last evaluated. Returns how many targets received new normals.
///
/// Inputs are the world transforms of target and source, including their
/// parents, and both meshes. A binding whose source no longer exists or has
/// no mesh is skipped with a warning the first time.
pub fn evaluate_normal_transfers(world: &mut World) -> usize {
    let mut query = world.query::<(Entity, &NormalTransfers)>();
    let bindings: Vec<(Entity, NormalTransferBinding)> = query
        .iter(world)
        .flat_map(|(target, transfers)| transfers.iter().map(move |b| (target, b.clone())))
        .collect();

    let mut surfaces: HashMap<Entity, Option<ShellSurface>> = HashMap::new();
    let mut written = 0;

    for (target, binding) in bindings {
        let NormalTransferBinding {
            name,
            source,
            evaluated,
            stamp,
            ..
        } = binding;

        let current = TransferStamp::read(world, target, source);
        if evaluated && current == stamp {
            continue;
        }

        let surface = surfaces.entry(source).or_insert_with(|| {
            world
                .mesh(source)
                .map(|mesh| ShellSurface::from_mesh(mesh, &world.world_transform(source)))
        });

        match surface {
            Some(surface) => {
                let world_from_local = world.world_transform(target);
                if let Some(mut mesh) = world.mesh_mut(target) {
                    match transfer_normals(&mut mesh, &world_from_local, surface) {
                        Ok(()) => written += 1,
                        Err(err) => warn!("Normal transfer '{}' on {:?} failed: {}", name, target, err),
                    }
                }
            }
            None if !evaluated => warn!(
                "Normal transfer '{}' on {:?}: source {:?} is missing, skipping",
                name, target, source
            ),
            None => {}
        }

        // Read after the write so the transfer itself does not count as a change.
        let stamp = TransferStamp::read(world, target, source);
        if let Some(mut transfers) = world.get_mut::<NormalTransfers>(target) {
            transfers.mark_evaluated(&name, stamp);
        }
    }

    if written > 0 {
        debug!("Transferred normals onto {} meshes", written);
    }
    written
}

/// Exclusive system wrapper around [`evaluate_normal_transfers`].
pub fn apply_normal_transfers(world: &mut World) {
    evaluate_normal_transfers(world);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::BoundingSphere;
    use crate::shell::{DEFAULT_MAX_CELLS_PER_AXIS, ImplicitSurfaceProxy, tessellate};

    /// A large upward-facing quad at height `y`.
    fn floor(y: f32) -> VegetationMesh {
        let mut mesh = VegetationMesh::from_polygons(
            vec![
                Vec3::new(-10.0, y, -10.0),
                Vec3::new(-10.0, y, 10.0),
                Vec3::new(10.0, y, 10.0),
                Vec3::new(10.0, y, -10.0),
            ],
            [[0u32, 1, 2, 3]],
        )
        .unwrap();
        mesh.set_custom_normals(vec![Vec3::Y; 4]).unwrap();
        mesh
    }

    fn leaf() -> VegetationMesh {
        // Faces +Z on its own.
        VegetationMesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Y], [[0u32, 1, 2]]).unwrap()
    }

    #[test]
    fn test_closest_point_regions() {
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);
        assert_eq!(closest_point_barycentric(Vec3::new(-1.0, -1.0, 0.0), a, b, c), Vec3::X);
        assert_eq!(closest_point_barycentric(Vec3::new(2.0, 0.0, 0.0), a, b, c), Vec3::Y);
        assert_eq!(closest_point_barycentric(Vec3::new(0.0, 2.0, 1.0), a, b, c), Vec3::Z);

        let edge = closest_point_barycentric(Vec3::new(0.5, -1.0, 0.0), a, b, c);
        assert!((edge - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);

        let face = closest_point_barycentric(Vec3::new(0.25, 0.25, 3.0), a, b, c);
        assert!((face - Vec3::new(0.5, 0.25, 0.25)).length() < 1e-6);
    }

    #[test]
    fn test_sample_interpolates_corner_normals() {
        let mut mesh =
            VegetationMesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Z], [[0u32, 2, 1]]).unwrap();
        mesh.set_custom_normals(vec![Vec3::Y, Vec3::X, Vec3::Y]).unwrap();
        let surface = ShellSurface::from_mesh(&mesh, &Affine3A::IDENTITY);

        // Above vertex 0 the first corner normal wins outright.
        let n = surface.sample_normal(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert!((n - Vec3::Y).length() < 1e-6);

        let n = surface.sample_normal(Vec3::new(0.0, 1.0, 1.0)).unwrap();
        assert!((n - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_transfer_into_rotated_leaf() {
        let surface = ShellSurface::from_mesh(&floor(-1.0), &Affine3A::IDENTITY);
        let mut mesh = leaf();
        // Rotating a quarter turn about X maps local -Z onto world +Y.
        let world_from_local = Affine3A::from_rotation_x(std::f32::consts::FRAC_PI_2);

        transfer_normals(&mut mesh, &world_from_local, &surface).unwrap();
        for n in mesh.custom_normals().unwrap() {
            assert!((*n - Vec3::NEG_Z).length() < 1e-5, "{n}");
        }
    }

    #[test]
    fn test_upsert_by_name() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();

        let mut transfers = NormalTransfers::default();
        assert!(transfers.upsert(NORMAL_TRANSFER_NAME, a));
        transfers.mark_evaluated(NORMAL_TRANSFER_NAME, None);
        assert!(!transfers.upsert(NORMAL_TRANSFER_NAME, b));

        assert_eq!(transfers.len(), 1);
        let binding = transfers.get(NORMAL_TRANSFER_NAME).unwrap();
        assert_eq!(binding.source, b);
        assert!(!binding.evaluated);
    }

    #[test]
    fn test_evaluate_writes_once() {
        let mut world = World::new();
        let shell = world.spawn((Transform::default(), floor(-1.0))).id();
        let mut transfers = NormalTransfers::default();
        transfers.upsert(NORMAL_TRANSFER_NAME, shell);
        let target = world.spawn((Transform::from_xyz(0.0, 2.0, 0.0), leaf(), transfers)).id();

        assert_eq!(evaluate_normal_transfers(&mut world), 1);
        assert_eq!(evaluate_normal_transfers(&mut world), 0);

        let mesh = world.get::<VegetationMesh>(target).unwrap();
        assert!(mesh.custom_normals().unwrap().iter().all(|n| (*n - Vec3::Y).length() < 1e-5));
        assert!(world.get::<NormalTransfers>(target).unwrap().get(NORMAL_TRANSFER_NAME).unwrap().evaluated);
    }

    /// Tessellated ball of iso-radius about 2.3 around the origin.
    fn ball() -> VegetationMesh {
        let mut proxy = ImplicitSurfaceProxy::default();
        proxy.add_sphere(BoundingSphere {
            center: Vec3::ZERO,
            radius: 4.0,
        });
        tessellate(&proxy, DEFAULT_MAX_CELLS_PER_AXIS).unwrap()
    }

    #[test]
    fn test_moved_leaf_resampled() {
        let mut world = World::new();
        let shell = world.spawn((Transform::default(), ball())).id();
        let mut transfers = NormalTransfers::default();
        transfers.upsert(NORMAL_TRANSFER_NAME, shell);
        let target = world.spawn((Transform::from_xyz(2.0, 0.0, 0.0), leaf(), transfers)).id();

        assert_eq!(evaluate_normal_transfers(&mut world), 1);
        let normals = world.get::<VegetationMesh>(target).unwrap().custom_normals().unwrap();
        assert!(normals.iter().all(|n| n.x > 0.5), "{normals:?}");

        world.get_mut::<Transform>(target).unwrap().translation = Vec3::new(-3.0, 0.0, 0.0);
        assert_eq!(evaluate_normal_transfers(&mut world), 1);
        let normals = world.get::<VegetationMesh>(target).unwrap().custom_normals().unwrap();
        assert!(normals.iter().all(|n| n.x < -0.5), "{normals:?}");

        assert_eq!(evaluate_normal_transfers(&mut world), 0);
    }

    #[test]
    fn test_parent_move_resamples_child() {
        let mut world = World::new();
        let shell = world.spawn((Transform::default(), ball())).id();
        let parent = world.spawn(Transform::from_xyz(2.0, 0.0, 0.0)).id();
        let mut transfers = NormalTransfers::default();
        transfers.upsert(NORMAL_TRANSFER_NAME, shell);
        let target = world
            .spawn((Transform::default(), leaf(), transfers, ChildOf(parent)))
            .id();

        assert_eq!(evaluate_normal_transfers(&mut world), 1);
        world.get_mut::<Transform>(parent).unwrap().translation = Vec3::new(-3.0, 0.0, 0.0);
        assert_eq!(evaluate_normal_transfers(&mut world), 1);

        let normals = world.get::<VegetationMesh>(target).unwrap().custom_normals().unwrap();
        assert!(normals.iter().all(|n| n.x < -0.5), "{normals:?}");
    }

    #[test]
    fn test_source_edit_resampled() {
        let mut world = World::new();
        let shell = world.spawn((Transform::default(), floor(-1.0))).id();
        let mut transfers = NormalTransfers::default();
        transfers.upsert(NORMAL_TRANSFER_NAME, shell);
        let target = world.spawn((Transform::from_xyz(0.0, 2.0, 0.0), leaf(), transfers)).id();
        assert_eq!(evaluate_normal_transfers(&mut world), 1);

        world.increment_change_tick();
        world
            .get_mut::<VegetationMesh>(shell)
            .unwrap()
            .set_custom_normals(vec![Vec3::NEG_Y; 4])
            .unwrap();

        assert_eq!(evaluate_normal_transfers(&mut world), 1);
        let mesh = world.get::<VegetationMesh>(target).unwrap();
        assert!(mesh.custom_normals().unwrap().iter().all(|n| (*n - Vec3::NEG_Y).length() < 1e-5));
        assert_eq!(evaluate_normal_transfers(&mut world), 0);
    }

    #[test]
    fn test_missing_source_skipped() {
        let mut world = World::new();
        let shell = world.spawn(floor(0.0)).id();
        let mut transfers = NormalTransfers::default();
        transfers.upsert(NORMAL_TRANSFER_NAME, shell);
        let target = world.spawn((leaf(), transfers)).id();
        world.despawn(shell);

        assert_eq!(evaluate_normal_transfers(&mut world), 0);
        assert!(world.get::<VegetationMesh>(target).unwrap().custom_normals().is_none());
    }
}
