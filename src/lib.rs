//! # bevy_vegetation_bake
//!
//! Bakes wind-animation data into vegetation meshes held in a Bevy world.
//!
//! ## Features
//!
//! - Per-branch IDs from a golden-ratio sequence, stable across re-bakes
//! - Branch and per-leaf distance falloffs in separate color channels
//! - A smooth shell surface built from one sphere per polygon
//! - Shell normals transferred onto leaves for soft foliage shading
//! - Export to a bevy [`Mesh`](bevy::mesh::Mesh) or a raw vertex stream
//!
//! Channel layout of the baked vertex colors:
//!
//! | Channel | Content                                  |
//! |---------|------------------------------------------|
//! | R       | distance from the leaf origin            |
//! | G       | branch ID                                |
//! | B       | distance from the branch origin          |
//! | A       | untouched                                |
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_vegetation_bake::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(VegetationBakePlugin)
//!         .add_systems(Update, bake_on_key)
//!         .run();
//! }
//!
//! fn bake_on_key(
//!     keys: Res<ButtonInput<KeyCode>>,
//!     colors: Res<VegetationColorSettings>,
//!     normals: Res<VegetationNormalSettings>,
//!     mut requests: MessageWriter<BakeRequest>,
//! ) {
//!     if keys.just_pressed(KeyCode::KeyB) {
//!         // Both run on EditorContext::active as the trunk.
//!         requests.write(BakeRequest::VertexColors(colors.clone()));
//!         requests.write(BakeRequest::Normals(normals.clone()));
//!     }
//! }
//! ```

pub mod bake;
pub mod branch_id;
pub mod math;
pub mod mesh;
mod plugin;
pub mod paint;
pub mod scene;
pub mod shell;

pub mod prelude {
    pub use crate::bake::{
        BakeError, BakeOperation, BakeOutcome, BakeRequest, BakeStatus, VegetationColorSettings,
        VegetationNormalSettings, bake_normals, bake_vertex_colors,
    };
    pub use crate::branch_id::BranchIdAssignment;
    pub use crate::mesh::{BakedVertex, ColorChannel, VegetationMesh, VegetationMeshBuilder};
    pub use crate::plugin::{VegetationBakePlugin, VegetationBakeSystems};
    pub use crate::scene::{EditorContext, InteractionMode, SceneGraphExt};
    pub use crate::shell::{ImplicitSurfaceProxy, NormalTransfers, ShellMeshingConfig};
}

pub use plugin::{VegetationBakePlugin, VegetationBakeSystems};
