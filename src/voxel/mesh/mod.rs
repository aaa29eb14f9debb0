//! Chunk to triangle mesh conversion

pub mod greedy;

use bytemuck::{Pod, Zeroable};

use crate::core::types::IVec3;
use crate::voxel::chunk::VoxChunk;
use crate::voxel::color::VoxColor;

pub use greedy::MeshBuilder;

/// Largest quad edge, in cells, the mesher will emit
pub const MAX_QUAD_SIZE: usize = 8;

/// Read access the mesher needs from a voxel grid.
///
/// Slots are opaque non-zero ids; two cells merge into one quad only when
/// their slots are equal.
pub trait VoxelGrid {
    /// Extent along each axis
    fn grid_size(&self) -> [u32; 3];

    /// Slot at an unshifted grid index (0 = empty)
    fn slot_at_grid(&self, g: IVec3) -> u16;

    /// Color of a non-empty slot
    fn slot_color(&self, slot: u16) -> Option<VoxColor>;

    /// Offset subtracted from grid indices to get cell coordinates
    fn grid_shift(&self) -> IVec3 {
        let [sx, sy, sz] = self.grid_size();
        IVec3::new((sx / 2) as i32, (sy / 2) as i32, (sz / 2) as i32)
    }
}

impl VoxelGrid for VoxChunk {
    fn grid_size(&self) -> [u32; 3] {
        self.size()
    }

    fn slot_at_grid(&self, g: IVec3) -> u16 {
        self.palette_index_at_grid(g)
    }

    fn slot_color(&self, slot: u16) -> Option<VoxColor> {
        VoxChunk::slot_color(self, slot)
    }

    fn grid_shift(&self) -> IVec3 {
        self.shift()
    }
}

/// Mesh vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Indexed triangle list
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoxMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl VoxMesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Four vertices per quad
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw vertex bytes, for upload or hashing
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}
