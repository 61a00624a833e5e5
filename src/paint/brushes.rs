//! Whole-mesh color fills.

use crate::math::{ChannelWeights, Rgba, blend};
use crate::mesh::VegetationMesh;

/// Weight mask that replaces every channel.
pub const ALL_CHANNELS: ChannelWeights = [1.0; 4];

/// Blends `color` into every loop of the mesh's active color layer.
///
/// Each channel is mixed independently by `weights`, so a mask such as
/// `[0, 1, 0, 0]` stamps the green channel and leaves the rest alone.
/// The color layer is created zero-initialized if the mesh has none.
/// A mesh without polygons is left untouched.
///
/// # Arguments
/// * `mesh` - Mesh to paint
/// * `color` - Target RGBA value
/// * `weights` - Per-channel blend weights in `[0, 1]`
///
/// # Example
/// ```ignore
/// // Stamp a branch ID into the green channel only.
/// paint(&mut mesh, [0.0, branch_id, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]);
/// ```
pub fn paint(mesh: &mut VegetationMesh, color: Rgba, weights: ChannelWeights) {
    if mesh.is_empty() {
        return;
    }

    let layer = mesh.active_color_layer_or_create();
    for existing in layer.colors_mut() {
        *existing = blend(*existing, color, weights);
    }
}

/// Overwrites every loop with `color` on all four channels.
#[inline]
pub fn fill(mesh: &mut VegetationMesh, color: Rgba) {
    paint(mesh, color, ALL_CHANNELS);
}
