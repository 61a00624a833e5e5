//! Deterministic, well-spread branch identifiers.
//!
//! Each branch receives a scalar in `[0, 1)` from a golden-ratio
//! low-discrepancy sequence. The sequence start is drawn from a generator
//! seeded by the trunk's name, and branches are ranked by distance from the
//! trunk origin before the sequence is applied. Re-baking the same hierarchy
//! therefore yields bit-identical IDs, independent of child insertion order.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::math::fract01;
use crate::scene::SceneGraphExt;

/// `(1 + √5) / 2`
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Largest `f32` strictly below 1.
const MAX_ID: f32 = 1.0 - f32::EPSILON / 2.0;

/// 64-bit FNV-1a hash of a node identity string.
pub fn identity_hash(identity: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    identity
        .bytes()
        .fold(OFFSET, |hash, b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// One uniform sample in `[0, 1)` drawn from a generator seeded by `identity`.
pub fn seed_from_identity(identity: &str) -> f64 {
    let mut rng = StdRng::seed_from_u64(identity_hash(identity));
    rng.random::<f64>()
}

/// `frac(seed + i·φ)` for `i` in `0..count`.
///
/// # Example
/// ```
/// use bevy_vegetation_bake::branch_id::golden_ratio_sequence;
///
/// let ids = golden_ratio_sequence(0.37, 3);
/// assert!((ids[1] - 0.988).abs() < 1e-3);
/// ```
pub fn golden_ratio_sequence(seed: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| fract01(seed + i as f64 * GOLDEN_RATIO))
        .collect()
}

/// Assigns IDs to children given their offsets from the parent origin.
///
/// Children are ranked by ascending offset length (stable, so ties keep
/// their original order) and the i-th ranked child receives the i-th
/// sequence value. The result is indexed like `offsets`.
pub fn assign_ids(seed: f64, offsets: &[Vec3]) -> Vec<f32> {
    let mut ranked: Vec<usize> = (0..offsets.len()).collect();
    ranked.sort_by(|&a, &b| offsets[a].length().total_cmp(&offsets[b].length()));

    let sequence = golden_ratio_sequence(seed, offsets.len());
    let mut ids = vec![0.0; offsets.len()];
    for (rank, &child) in ranked.iter().enumerate() {
        ids[child] = (sequence[rank] as f32).min(MAX_ID);
    }
    ids
}

/// Branch IDs of one trunk, keyed by branch entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BranchIdAssignment {
    /// Branch entities in host child order, each with its ID.
    pub branches: Vec<(Entity, f32)>,
}

impl BranchIdAssignment {
    /// Assigns IDs to the mesh children of `trunk`.
    ///
    /// Non-mesh children are ignored entirely: they neither receive an ID nor
    /// shift the IDs of their mesh siblings. The seed comes from the trunk's
    /// [`Name`]; an unnamed trunk hashes the empty string.
    pub fn compute(world: &World, trunk: Entity) -> Self {
        let branches: Vec<Entity> = world
            .children_of(trunk)
            .into_iter()
            .filter(|&child| world.mesh(child).is_some())
            .collect();

        let offsets: Vec<Vec3> = branches
            .iter()
            .map(|&b| world.local_transform(b).translation.into())
            .collect();

        let seed = seed_from_identity(world.node_name(trunk).unwrap_or_default());
        let ids = assign_ids(seed, &offsets);

        Self {
            branches: branches.into_iter().zip(ids).collect(),
        }
    }

    pub fn get(&self, branch: Entity) -> Option<f32> {
        self.branches
            .iter()
            .find(|(e, _)| *e == branch)
            .map(|(_, id)| *id)
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::VegetationMesh;

    #[test]
    fn test_golden_ratio_reference_values() {
        let ids = golden_ratio_sequence(0.37, 5);
        let expected = [0.37, 0.988, 0.606, 0.224, 0.842];
        for (id, want) in ids.iter().zip(expected) {
            assert!((id - want).abs() < 1e-3, "{id} != {want}");
        }

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                assert!((ids[i] - ids[j]).abs() >= 0.1);
            }
        }
    }

    #[test]
    fn test_golden_ratio_spread() {
        let n = 5;
        let mut ids = golden_ratio_sequence(seed_from_identity("Oak"), n);
        ids.sort_by(f64::total_cmp);
        for pair in ids.windows(2) {
            assert!(pair[1] - pair[0] >= 1.0 / (2.0 * n as f64));
        }
        assert!(ids.iter().all(|id| (0.0..1.0).contains(id)));
    }

    #[test]
    fn test_seed_is_deterministic() {
        assert_eq!(
            seed_from_identity("Tree.001").to_bits(),
            seed_from_identity("Tree.001").to_bits()
        );
        assert_ne!(seed_from_identity("Tree.001"), seed_from_identity("Tree.002"));
        assert!((0.0..1.0).contains(&seed_from_identity("")));
    }

    #[test]
    fn test_identity_hash_known_value() {
        // FNV-1a reference: hash of the empty string is the offset basis.
        assert_eq!(identity_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(identity_hash("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_assign_ids_ranked_by_distance() {
        let offsets = [Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 2.0, 0.0)];
        let ids = assign_ids(0.37, &offsets);
        let sequence = golden_ratio_sequence(0.37, 3);

        assert_eq!(ids[1], sequence[0] as f32);
        assert_eq!(ids[2], sequence[1] as f32);
        assert_eq!(ids[0], sequence[2] as f32);
    }

    #[test]
    fn test_assign_ids_stable_ties() {
        let offsets = [Vec3::X, Vec3::Y, Vec3::Z];
        let ids = assign_ids(0.5, &offsets);
        let sequence = golden_ratio_sequence(0.5, 3);
        for (id, want) in ids.iter().zip(sequence) {
            assert_eq!(*id, want as f32);
        }
    }

    #[test]
    fn test_assignment_independent_of_insertion_order() {
        fn build(order: &[f32]) -> (World, Entity, Vec<(f32, Entity)>) {
            let mut world = World::new();
            let trunk = world.spawn((Name::new("Birch"), Transform::default())).id();
            let mut branches = Vec::new();
            for &height in order {
                let branch = world
                    .spawn((
                        Transform::from_xyz(0.0, height, 0.0),
                        VegetationMesh::default(),
                        ChildOf(trunk),
                    ))
                    .id();
                branches.push((height, branch));
            }
            (world, trunk, branches)
        }

        let id_by_height = |order: &[f32]| {
            let (world, trunk, branches) = build(order);
            let assignment = BranchIdAssignment::compute(&world, trunk);
            let mut ids: Vec<(u32, u32)> = branches
                .iter()
                .map(|(h, e)| (h.to_bits(), assignment.get(*e).unwrap().to_bits()))
                .collect();
            ids.sort();
            ids
        };

        assert_eq!(id_by_height(&[1.0, 2.0, 3.0]), id_by_height(&[3.0, 1.0, 2.0]));
    }

    #[test]
    fn test_non_mesh_children_ignored() {
        let mut world = World::new();
        let trunk = world.spawn(Name::new("Pine")).id();
        let empty = world.spawn((Transform::from_xyz(0.0, 0.5, 0.0), ChildOf(trunk))).id();
        let branch = world
            .spawn((Transform::from_xyz(0.0, 1.0, 0.0), VegetationMesh::default(), ChildOf(trunk)))
            .id();

        let assignment = BranchIdAssignment::compute(&world, trunk);
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.get(empty), None);
        assert_eq!(
            assignment.get(branch),
            Some(seed_from_identity("Pine") as f32)
        );
    }
}
