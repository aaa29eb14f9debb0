//! Edit operation representation.

use serde::{Deserialize, Serialize};

use crate::core::types::{IVec3, Result};
use crate::voxel::chunk::{SerializedChunk, VoxChunk};
use crate::voxel::color::REMOVE_VOXEL_COLOR;
use crate::voxel::vox::Vox;
use super::overlay::apply_delta;

/// Wire form of an operation: `{f, d: {size, palette, indices}, o}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireOp {
    /// Frame index
    pub f: usize,
    /// Serialized delta chunk
    pub d: SerializedChunk,
    /// Offset of the delta's pivot in frame cell space
    pub o: [i32; 3],
}

/// A delta chunk addressed to one frame at an offset.
///
/// The unit of both undo application and network synchronization.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxOp {
    pub frame: usize,
    pub delta: VoxChunk,
    pub offset: IVec3,
}

impl VoxOp {
    pub fn new(frame: usize, delta: VoxChunk, offset: IVec3) -> Self {
        Self { frame, delta, offset }
    }

    pub fn to_wire(&self) -> WireOp {
        WireOp {
            f: self.frame,
            d: self.delta.serialize(),
            o: self.offset.to_array(),
        }
    }

    pub fn from_wire(wire: &WireOp) -> Result<Self> {
        Ok(Self {
            frame: wire.f,
            delta: VoxChunk::deserialize(&wire.d)?,
            offset: IVec3::from_array(wire.o),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let wire: WireOp = serde_json::from_str(json)?;
        Self::from_wire(&wire)
    }

    /// Overlay this op onto its frame, creating the frame if needed.
    /// Returns the number of cells changed.
    pub fn apply_to(&self, vox: &mut Vox) -> Result<usize> {
        let frame = vox.ensure_frame(self.frame)?;
        Ok(apply_delta(frame, &self.delta, self.offset))
    }
}

/// Build the delta that undoes `delta` (placed at `offset`) when applied to
/// the result of applying it to `pre_edit`.
///
/// Every cell the delta touches gets the color it had before the edit, or
/// the removal marker if it was empty.
pub fn invert_delta(delta: &VoxChunk, offset: IVec3, pre_edit: &VoxChunk) -> VoxChunk {
    let mut inverse = VoxChunk::new(delta.size());
    for (cell, _) in delta.iter_voxels() {
        let prior = pre_edit.color_at(cell + offset).unwrap_or(REMOVE_VOXEL_COLOR);
        inverse.set_color_at(cell, prior);
    }
    inverse
}
