//! The two bake operations and their message-driven entry point.
//!
//! Both operations take the active object of [`EditorContext`] as the trunk,
//! check every precondition before touching the scene, and leave the editor
//! context as they found it.

mod normals;
mod vertex_colors;

use bevy::ecs::message::MessageCursor;
use bevy::prelude::*;
use thiserror::Error;

use crate::mesh::MeshError;
use crate::scene::{EditorContext, SceneGraphExt};
use crate::shell::ShellMeshingConfig;

pub use normals::{
    NormalsReport, SHELL_MESH_SUFFIX, SHELL_PROXY_SUFFIX, VegetationNormalSettings, bake_normals,
    bake_normals_for,
};
pub use vertex_colors::{
    VegetationColorSettings, VertexColorReport, bake_vertex_colors, bake_vertex_colors_for,
};

/// Reasons a bake is cancelled before it mutates anything.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BakeError {
    #[error("No active object to use as trunk")]
    NoActiveObject,

    #[error("Entity {0:?} does not exist")]
    MissingEntity(Entity),

    #[error("Entity {0:?} is not a mesh")]
    NotAMesh(Entity),

    #[error("'{name}' ({entity:?}) exists but is not an implicit surface proxy")]
    ShellTypeMismatch { name: String, entity: Entity },

    #[error("Parameter '{name}' must be {expected}, got {value}")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        expected: &'static str,
    },

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Checks that `trunk` names an existing mesh entity.
pub(crate) fn resolve_trunk(world: &World, trunk: Option<Entity>) -> Result<Entity, BakeError> {
    let trunk = trunk.ok_or(BakeError::NoActiveObject)?;
    if world.get_entity(trunk).is_err() {
        return Err(BakeError::MissingEntity(trunk));
    }
    if world.mesh(trunk).is_none() {
        return Err(BakeError::NotAMesh(trunk));
    }
    Ok(trunk)
}

/// The active object of the editor context, if any.
pub(crate) fn active_object(world: &World) -> Option<Entity> {
    world.get_resource::<EditorContext>().and_then(|c| c.active)
}

// ============================================================================
// Messages
// ============================================================================

/// Which operation a request or outcome refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BakeOperation {
    VertexColors,
    Normals,
}

/// Asks for one bake on the current active object.
#[derive(Message, Clone, Debug, PartialEq)]
pub enum BakeRequest {
    VertexColors(VegetationColorSettings),
    Normals(VegetationNormalSettings),
}

impl BakeRequest {
    pub fn operation(&self) -> BakeOperation {
        match self {
            Self::VertexColors(_) => BakeOperation::VertexColors,
            Self::Normals(_) => BakeOperation::Normals,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BakeStatus {
    Finished,
    Cancelled(BakeError),
}

/// Result of one [`BakeRequest`].
#[derive(Message, Clone, Debug, PartialEq)]
pub struct BakeOutcome {
    pub operation: BakeOperation,
    /// Active object at the time the request ran.
    pub trunk: Option<Entity>,
    pub status: BakeStatus,
}

/// Runs every [`BakeRequest`] not yet seen by this system, in order, and
/// reports a [`BakeOutcome`] for each.
///
/// Requests stay in the message buffer for other readers.
pub fn process_bake_requests(world: &mut World, mut cursor: Local<MessageCursor<BakeRequest>>) {
    let requests: Vec<BakeRequest> = match world.get_resource::<Messages<BakeRequest>>() {
        Some(messages) => cursor.read(messages).cloned().collect(),
        None => return,
    };

    for request in requests {
        let trunk = active_object(world);
        let result = match &request {
            BakeRequest::VertexColors(settings) => bake_vertex_colors(world, settings).map(|_| ()),
            BakeRequest::Normals(settings) => {
                let meshing = world
                    .get_resource::<ShellMeshingConfig>()
                    .cloned()
                    .unwrap_or_default();
                bake_normals(world, settings, &meshing).map(|_| ())
            }
        };

        let status = match result {
            Ok(()) => BakeStatus::Finished,
            Err(err) => {
                warn!("{:?} bake cancelled: {}", request.operation(), err);
                BakeStatus::Cancelled(err)
            }
        };

        if let Some(mut outcomes) = world.get_resource_mut::<Messages<BakeOutcome>>() {
            outcomes.write(BakeOutcome {
                operation: request.operation(),
                trunk,
                status,
            });
        }
    }
}
