//! Plugin for vegetation bakes.
use bevy::prelude::*;

use crate::bake::{
    BakeOutcome, BakeRequest, VegetationColorSettings, VegetationNormalSettings,
    process_bake_requests,
};
use crate::scene::EditorContext;
use crate::shell::{ShellMeshingConfig, apply_normal_transfers};

/// System sets of [`VegetationBakePlugin`].
#[derive(SystemSet, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VegetationBakeSystems {
    /// Runs queued [`BakeRequest`]s.
    Bake,
    /// Evaluates pending normal transfer bindings.
    TransferNormals,
}

/// Plugin that adds vegetation bake operations to Bevy.
///
/// This plugin registers:
/// - [`EditorContext`] and the bake settings as resources
/// - [`BakeRequest`] and [`BakeOutcome`] messages
/// - Request processing in `Update` and normal transfer in `PostUpdate`
///
/// # Example
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_vegetation_bake::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(VegetationBakePlugin)
///     .run();
/// ```
pub struct VegetationBakePlugin;

impl Plugin for VegetationBakePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EditorContext>()
            .init_resource::<VegetationColorSettings>()
            .init_resource::<VegetationNormalSettings>()
            .init_resource::<ShellMeshingConfig>()
            .add_message::<BakeRequest>()
            .add_message::<BakeOutcome>()
            .add_systems(
                Update,
                process_bake_requests.in_set(VegetationBakeSystems::Bake),
            )
            .add_systems(
                PostUpdate,
                apply_normal_transfers.in_set(VegetationBakeSystems::TransferNormals),
            );
    }
}
