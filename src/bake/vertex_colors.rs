//! Vegetation vertex colors: branch IDs and distance falloffs for wind shaders.

use bevy::prelude::*;

use super::{BakeError, active_object, resolve_trunk};
use crate::branch_id::BranchIdAssignment;
use crate::mesh::{BRANCH_DISTANCE_CHANNEL, BRANCH_ID_CHANNEL, LEAF_DISTANCE_CHANNEL};
use crate::paint::{fill, find_max_distance, paint, paint_distance_channel};
use crate::scene::{HierarchyRole, SceneGraphExt, collect_hierarchy, with_preserved_context};

/// Parameters of the vertex color bake.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct VegetationColorSettings {
    /// Zero all four channels of the trunk mesh before baking.
    pub clear_trunk: bool,
    /// Falloff exponent of the branch distance channel.
    pub branch_exponent: f32,
    /// Falloff exponent of the per-leaf distance channel.
    pub leaf_exponent: f32,
}

impl Default for VegetationColorSettings {
    fn default() -> Self {
        Self {
            clear_trunk: false,
            branch_exponent: 1.0,
            leaf_exponent: 1.0,
        }
    }
}

impl VegetationColorSettings {
    pub fn validate(&self) -> Result<(), BakeError> {
        for (name, value) in [
            ("branch_exponent", self.branch_exponent),
            ("leaf_exponent", self.leaf_exponent),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(BakeError::InvalidParameter {
                    name,
                    value,
                    expected: "finite and greater than zero",
                });
            }
        }
        Ok(())
    }
}

/// What a vertex color bake touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexColorReport {
    pub trunk: Option<Entity>,
    pub branch_ids: BranchIdAssignment,
    /// Meshes that received a branch ID, branches and leaves alike.
    pub painted_meshes: usize,
    /// Meshes that received their own leaf falloff.
    pub painted_leaves: usize,
}

/// Bakes vertex colors with the active object as trunk.
pub fn bake_vertex_colors(
    world: &mut World,
    settings: &VegetationColorSettings,
) -> Result<VertexColorReport, BakeError> {
    let trunk = active_object(world);
    bake_vertex_colors_for(world, trunk, settings)
}

/// Bakes vertex colors over the hierarchy under `trunk`.
///
/// Per branch (a mesh child of the trunk), every mesh in the branch subtree
/// gets:
/// - G: the branch ID, other channels untouched
/// - B: distance from the branch origin, normalized over the whole subtree
///
/// and every leaf (depth 2 or more) additionally gets
/// - R: distance from its own origin, normalized over that leaf alone
///
/// Non-mesh nodes are skipped but their descendants are still visited.
///
/// # Errors
/// Cancelled before any mutation when `trunk` is missing or not a mesh, or
/// when a settings value is out of range.
pub fn bake_vertex_colors_for(
    world: &mut World,
    trunk: Option<Entity>,
    settings: &VegetationColorSettings,
) -> Result<VertexColorReport, BakeError> {
    let trunk = resolve_trunk(world, trunk)?;
    settings.validate()?;

    Ok(with_preserved_context(world, |world| {
        if settings.clear_trunk
            && let Some(mut mesh) = world.mesh_mut(trunk)
        {
            fill(&mut mesh, [0.0; 4]);
        }

        let branch_ids = BranchIdAssignment::compute(world, trunk);
        let mut report = VertexColorReport {
            trunk: Some(trunk),
            ..default()
        };

        for &(branch, id) in &branch_ids.branches {
            // Depths below are relative to the trunk.
            let cluster: Vec<(Entity, usize)> = collect_hierarchy(world, branch)
                .into_iter()
                .filter(|&(node, _)| world.mesh(node).is_some())
                .map(|(node, depth)| (node, depth + 1))
                .collect();

            let origin: Vec3 = world.world_transform(branch).translation.into();
            let max_distance = cluster
                .iter()
                .filter_map(|&(node, _)| {
                    let world_from_local = world.world_transform(node);
                    world
                        .mesh(node)
                        .map(|mesh| find_max_distance(mesh, &world_from_local, origin))
                })
                .fold(0.0, f32::max);

            for &(node, _) in &cluster {
                let world_from_local = world.world_transform(node);
                if let Some(mut mesh) = world.mesh_mut(node) {
                    paint(&mut mesh, [0.0, id, 0.0, 0.0], BRANCH_ID_CHANNEL.mask());
                    paint_distance_channel(
                        &mut mesh,
                        &world_from_local,
                        origin,
                        max_distance,
                        settings.branch_exponent,
                        BRANCH_DISTANCE_CHANNEL,
                    );
                    report.painted_meshes += 1;
                }
            }

            for &(leaf, depth) in &cluster {
                if HierarchyRole::from_depth(depth) != HierarchyRole::Leaf {
                    continue;
                }
                let world_from_local = world.world_transform(leaf);
                let leaf_origin: Vec3 = world_from_local.translation.into();
                if let Some(mut mesh) = world.mesh_mut(leaf) {
                    let leaf_max = find_max_distance(&mesh, &world_from_local, leaf_origin);
                    paint_distance_channel(
                        &mut mesh,
                        &world_from_local,
                        leaf_origin,
                        leaf_max,
                        settings.leaf_exponent,
                        LEAF_DISTANCE_CHANNEL,
                    );
                    report.painted_leaves += 1;
                }
            }

            debug!(
                "Branch {:?}: id {:.4}, {} meshes, max distance {:.3}",
                branch,
                id,
                cluster.len(),
                max_distance
            );
        }

        info!(
            "Baked vegetation vertex colors: {} branches, {} meshes, {} leaves",
            branch_ids.len(),
            report.painted_meshes,
            report.painted_leaves
        );
        report.branch_ids = branch_ids;
        report
    }))
}
