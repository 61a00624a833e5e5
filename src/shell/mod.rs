//! Smooth shell surfaces used as a normal source for foliage.
//!
//! A shell is an [`ImplicitSurfaceProxy`] (one sphere per source polygon),
//! tessellated into a [`VegetationMesh`] whose loops carry the field's
//! outward normals. Leaves then pull their shading normals from the shell
//! through a [`NormalTransfers`] binding, evaluated by
//! [`apply_normal_transfers`].

mod meshing;
mod proxy;
mod transfer;

pub use meshing::{DEFAULT_MAX_CELLS_PER_AXIS, PADDING_CELLS, ShellMeshingConfig, tessellate};
pub use proxy::{DEFAULT_RESOLUTION, DEFAULT_STIFFNESS, DEFAULT_THRESHOLD, ImplicitSurfaceProxy};
pub use transfer::{
    NORMAL_TRANSFER_NAME, NormalTransferBinding, NormalTransfers, ShellSurface, TransferMapping,
    apply_normal_transfers, closest_point_barycentric, evaluate_normal_transfers, transfer_normals,
};
