//! Read-mostly access to the host scene graph.
//!
//! Nodes are entities. Names come from [`Name`], local transforms from
//! [`Transform`] and the hierarchy from the [`ChildOf`]/[`Children`]
//! relationship. World transforms are composed along the parent chain, so
//! bakes see correct positions without transform propagation having run.

use bevy::math::Affine3A;
use bevy::prelude::*;

mod context;

pub use context::{ContextSnapshot, EditorContext, InteractionMode, with_preserved_context};

use crate::mesh::VegetationMesh;

/// Role of a node inside one vegetation hierarchy, derived from its depth
/// below the trunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HierarchyRole {
    Trunk,
    Branch,
    Leaf,
}

impl HierarchyRole {
    /// Depth 0 is the trunk, depth 1 a branch, anything deeper a leaf.
    #[inline]
    pub const fn from_depth(depth: usize) -> Self {
        match depth {
            0 => Self::Trunk,
            1 => Self::Branch,
            _ => Self::Leaf,
        }
    }
}

/// Scene-graph queries used by the bake operations.
pub trait SceneGraphExt {
    /// Children in host order. Empty for leaves and missing entities.
    fn children_of(&self, node: Entity) -> Vec<Entity>;

    fn parent_of(&self, node: Entity) -> Option<Entity>;

    /// Transform relative to the parent, identity when absent.
    fn local_transform(&self, node: Entity) -> Affine3A;

    /// Local-to-world transform composed along the parent chain.
    fn world_transform(&self, node: Entity) -> Affine3A;

    fn node_name(&self, node: Entity) -> Option<&str>;

    fn mesh(&self, node: Entity) -> Option<&VegetationMesh>;

    fn mesh_mut(&mut self, node: Entity) -> Option<Mut<'_, VegetationMesh>>;

    /// First entity whose [`Name`] equals `name`.
    fn find_by_name(&mut self, name: &str) -> Option<Entity>;
}

impl SceneGraphExt for World {
    fn children_of(&self, node: Entity) -> Vec<Entity> {
        self.get::<Children>(node)
            .map(|children| children.to_vec())
            .unwrap_or_default()
    }

    fn parent_of(&self, node: Entity) -> Option<Entity> {
        self.get::<ChildOf>(node).map(ChildOf::parent)
    }

    fn local_transform(&self, node: Entity) -> Affine3A {
        self.get::<Transform>(node)
            .map(Transform::compute_affine)
            .unwrap_or(Affine3A::IDENTITY)
    }

    fn world_transform(&self, node: Entity) -> Affine3A {
        let mut transform = self.local_transform(node);
        let mut current = node;
        while let Some(parent) = self.parent_of(current) {
            transform = self.local_transform(parent) * transform;
            current = parent;
        }
        transform
    }

    fn node_name(&self, node: Entity) -> Option<&str> {
        self.get::<Name>(node).map(Name::as_str)
    }

    fn mesh(&self, node: Entity) -> Option<&VegetationMesh> {
        self.get::<VegetationMesh>(node)
    }

    fn mesh_mut(&mut self, node: Entity) -> Option<Mut<'_, VegetationMesh>> {
        self.get_mut::<VegetationMesh>(node)
    }

    fn find_by_name(&mut self, name: &str) -> Option<Entity> {
        let mut query = self.query::<(Entity, &Name)>();
        query
            .iter(self)
            .find(|(_, n)| n.as_str() == name)
            .map(|(entity, _)| entity)
    }
}

/// Pre-order traversal of `root` and all its descendants.
///
/// `visit` receives each entity with its depth below `root` (0 for the root
/// itself). Depth is unbounded; use [`HierarchyRole::from_depth`] to classify.
pub fn walk_hierarchy<F>(world: &World, root: Entity, mut visit: F)
where
    F: FnMut(Entity, usize),
{
    fn walk<F: FnMut(Entity, usize)>(world: &World, node: Entity, depth: usize, visit: &mut F) {
        visit(node, depth);
        for child in world.children_of(node) {
            walk(world, child, depth + 1, visit);
        }
    }

    walk(world, root, 0, &mut visit);
}

/// `root` and its descendants as `(entity, depth)` pairs in pre-order.
pub fn collect_hierarchy(world: &World, root: Entity) -> Vec<(Entity, usize)> {
    let mut nodes = Vec::new();
    walk_hierarchy(world, root, |entity, depth| nodes.push((entity, depth)));
    nodes
}
