//! Vegetation normals: a smooth shell around the tree feeding leaf shading normals.

use bevy::prelude::*;

use super::{BakeError, active_object, resolve_trunk};
use crate::math::BoundingSphere;
use crate::scene::{HierarchyRole, SceneGraphExt, collect_hierarchy, with_preserved_context};
use crate::shell::{
    ImplicitSurfaceProxy, NORMAL_TRANSFER_NAME, NormalTransfers, ShellMeshingConfig, tessellate,
};

/// Suffix appended to the trunk name for the proxy entity.
pub const SHELL_PROXY_SUFFIX: &str = "NormalsShell";

/// Suffix appended to the trunk name for the tessellated shell entity.
pub const SHELL_MESH_SUFFIX: &str = "NormalsMesh";

/// Parameters of the normals bake.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct VegetationNormalSettings {
    /// How far each polygon sphere balloons past the polygon, as a fraction
    /// of its radius.
    pub inflation: f32,
}

impl Default for VegetationNormalSettings {
    fn default() -> Self {
        Self { inflation: 0.3 }
    }
}

impl VegetationNormalSettings {
    pub fn validate(&self) -> Result<(), BakeError> {
        if !self.inflation.is_finite() || self.inflation < 0.0 {
            return Err(BakeError::InvalidParameter {
                name: "inflation",
                value: self.inflation,
                expected: "finite and not negative",
            });
        }
        Ok(())
    }
}

/// What a normals bake created.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalsReport {
    pub trunk: Entity,
    /// Entity holding the [`ImplicitSurfaceProxy`].
    pub shell: Entity,
    /// Entity holding the tessellated shell mesh.
    pub shell_mesh: Entity,
    pub sphere_count: usize,
    pub shell_polygons: usize,
    /// Meshes at depth 2 or more, each bound to the shell mesh.
    pub leaves: Vec<Entity>,
}

/// Bakes leaf normals with the active object as trunk.
pub fn bake_normals(
    world: &mut World,
    settings: &VegetationNormalSettings,
    meshing: &ShellMeshingConfig,
) -> Result<NormalsReport, BakeError> {
    let trunk = active_object(world);
    bake_normals_for(world, trunk, settings, meshing)
}

/// Builds the shell for the hierarchy under `trunk` and binds every leaf to it.
///
/// Every polygon of every mesh in the hierarchy contributes one sphere, in
/// the space of a proxy anchored at the trunk's world translation. The proxy
/// and its tessellation are spawned as `<trunk>NormalsShell` and
/// `<trunk>NormalsMesh`, replacing any left by a previous run. Leaves get a
/// [`NORMAL_TRANSFER_NAME`] binding to the new shell mesh.
///
/// # Errors
/// Cancelled before any mutation when `trunk` is missing or not a mesh, when
/// `inflation` is out of range, or when an entity already named like the
/// proxy is not an [`ImplicitSurfaceProxy`].
pub fn bake_normals_for(
    world: &mut World,
    trunk: Option<Entity>,
    settings: &VegetationNormalSettings,
    meshing: &ShellMeshingConfig,
) -> Result<NormalsReport, BakeError> {
    let trunk = resolve_trunk(world, trunk)?;
    settings.validate()?;

    let base = world
        .node_name(trunk)
        .map(str::to_owned)
        .unwrap_or_else(|| trunk.to_string());
    let proxy_name = format!("{base}{SHELL_PROXY_SUFFIX}");
    let mesh_name = format!("{base}{SHELL_MESH_SUFFIX}");

    let stale_proxies = entities_named(world, &proxy_name);
    if let Some(&entity) = stale_proxies
        .iter()
        .find(|&&e| world.get::<ImplicitSurfaceProxy>(e).is_none())
    {
        return Err(BakeError::ShellTypeMismatch {
            name: proxy_name,
            entity,
        });
    }
    let stale_meshes = entities_named(world, &mesh_name);

    let anchor: Vec3 = world.world_transform(trunk).translation.into();
    let mut proxy = meshing.proxy();
    let mut leaves = Vec::new();

    for (node, depth) in collect_hierarchy(world, trunk) {
        let world_from_local = world.world_transform(node);
        let Some(mesh) = world.mesh(node) else {
            continue;
        };

        for polygon in 0..mesh.polygon_count() {
            let points: Vec<Vec3> = mesh
                .polygon_vertices(polygon)
                .iter()
                .map(|&v| world_from_local.transform_point3(mesh.positions()[v as usize]) - anchor)
                .collect();
            if let Some(sphere) = BoundingSphere::fit(&points, settings.inflation) {
                proxy.add_sphere(sphere);
            }
        }

        if HierarchyRole::from_depth(depth) == HierarchyRole::Leaf {
            leaves.push(node);
        }
    }

    let shell_mesh = tessellate(&proxy, meshing.max_cells_per_axis)?;
    let sphere_count = proxy.sphere_count();
    let shell_polygons = shell_mesh.polygon_count();
    if sphere_count > 0 && shell_polygons == 0 {
        warn!(
            "Shell for '{}' is empty: {} spheres produced no surface, leaves keep their normals",
            base, sphere_count
        );
    }

    Ok(with_preserved_context(world, |world| {
        for entity in stale_proxies.into_iter().chain(stale_meshes) {
            world.despawn(entity);
        }

        let shell = world
            .spawn((Name::new(proxy_name), Transform::from_translation(anchor), proxy))
            .id();
        let shell_mesh = world
            .spawn((Name::new(mesh_name), Transform::from_translation(anchor), shell_mesh))
            .id();

        for &leaf in &leaves {
            match world.get_mut::<NormalTransfers>(leaf) {
                Some(mut transfers) => {
                    transfers.upsert(NORMAL_TRANSFER_NAME, shell_mesh);
                }
                None => {
                    let mut transfers = NormalTransfers::default();
                    transfers.upsert(NORMAL_TRANSFER_NAME, shell_mesh);
                    if let Ok(mut entity) = world.get_entity_mut(leaf) {
                        entity.insert(transfers);
                    }
                }
            }
        }

        info!(
            "Baked vegetation normals: {} spheres, {} shell polygons, {} leaves bound",
            sphere_count,
            shell_polygons,
            leaves.len()
        );

        NormalsReport {
            trunk,
            shell,
            shell_mesh,
            sphere_count,
            shell_polygons,
            leaves,
        }
    }))
}

fn entities_named(world: &mut World, name: &str) -> Vec<Entity> {
    let mut query = world.query::<(Entity, &Name)>();
    query
        .iter(world)
        .filter(|(_, n)| n.as_str() == name)
        .map(|(entity, _)| entity)
        .collect()
}
