//! Normalized radial distance fields written into a single color channel.

use bevy::math::Affine3A;
use bevy::prelude::*;

use crate::math::distance;
use crate::mesh::{ColorChannel, VegetationMesh};

/// Lower bound on the normalization radius, so a mesh collapsed onto its
/// origin still paints finite values.
pub const MIN_DISTANCE: f32 = 1e-7;

/// Largest world-space distance from `origin` to any loop's vertex.
///
/// Loops are visited rather than unique vertices, matching how the channel
/// is painted. Returns `0.0` for a mesh without polygons.
pub fn find_max_distance(mesh: &VegetationMesh, world_from_local: &Affine3A, origin: Vec3) -> f32 {
    mesh.loop_positions()
        .map(|p| distance(world_from_local.transform_point3(p), origin))
        .fold(0.0, f32::max)
}

/// Writes a shaped distance falloff into one channel of every loop.
///
/// For each loop: `d = min(1, |p - origin| / max(max_distance, MIN_DISTANCE))`,
/// then `d^exponent` is stored in `channel`. The other channels keep their
/// current values. An exponent of `1.0` is a linear falloff; larger values
/// keep values low near the origin for longer.
///
/// # Arguments
/// * `mesh` - Mesh to paint (its color layer is created if missing)
/// * `world_from_local` - The mesh node's world transform
/// * `origin` - Reference point in world space
/// * `max_distance` - Distance mapped to `1.0`
/// * `exponent` - Falloff shaping exponent
/// * `channel` - Destination channel
pub fn paint_distance_channel(
    mesh: &mut VegetationMesh,
    world_from_local: &Affine3A,
    origin: Vec3,
    max_distance: f32,
    exponent: f32,
    channel: ColorChannel,
) {
    if mesh.is_empty() {
        return;
    }

    let max_distance = max_distance.max(MIN_DISTANCE);
    let values: Vec<f32> = mesh
        .loop_positions()
        .map(|p| {
            let d = distance(world_from_local.transform_point3(p), origin) / max_distance;
            shape(d, exponent)
        })
        .collect();

    let layer = mesh.active_color_layer_or_create();
    for (loop_index, value) in values.into_iter().enumerate() {
        layer.set_channel(loop_index, channel, value);
    }
}

/// Clamps a normalized distance to `[0, 1]` and applies the exponent.
#[inline]
fn shape(normalized: f32, exponent: f32) -> f32 {
    let d = normalized.clamp(0.0, 1.0);
    let shaped = d.powf(exponent);
    if shaped.is_finite() { shaped.clamp(0.0, 1.0) } else { 0.0 }
}
