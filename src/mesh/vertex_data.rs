//! Interleaved vertex layout for uploading baked meshes.

use bytemuck::{Pod, Zeroable};

/// A loop-split vertex with its baked attributes.
///
/// Layout matches a vertex buffer with `position` at location 0,
/// `normal` at location 1 and `color` at location 2 (40 bytes stride).
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BakedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl BakedVertex {
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// View a vertex slice as raw bytes for buffer upload.
    #[inline]
    pub fn as_bytes(vertices: &[Self]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }

    /// Reinterpret raw bytes as vertices.
    ///
    /// Returns `None` if the length is not a multiple of [`Self::STRIDE`]
    /// or the data is misaligned.
    pub fn from_bytes(bytes: &[u8]) -> Option<&[Self]> {
        bytemuck::try_cast_slice(bytes).ok()
    }
}
