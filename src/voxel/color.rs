//! Voxel color type

use serde::{Deserialize, Serialize};

/// Packed RGBT voxel color: `t << 24 | r << 16 | g << 8 | b`.
///
/// `t` is the voxel type byte (0 = regular). The all-ones value is reserved
/// as [`REMOVE_VOXEL_COLOR`].
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoxColor(pub u32);

/// Marks a cell to be cleared when a delta chunk is applied.
/// Never assigned to a real voxel.
pub const REMOVE_VOXEL_COLOR: VoxColor = VoxColor(0xFFFF_FFFF);

impl VoxColor {
    /// Create a regular voxel color from RGB888 values
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// Create a color with an explicit voxel type byte
    pub fn from_rgbt(r: u8, g: u8, b: u8, t: u8) -> Self {
        Self((t as u32) << 24 | Self::from_rgb(r, g, b).0)
    }

    /// Get RGB888 components
    pub fn rgb(self) -> (u8, u8, u8) {
        ((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }

    /// Voxel type byte
    pub fn voxel_type(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Check if this is the removal sentinel
    pub fn is_remove(self) -> bool {
        self == REMOVE_VOXEL_COLOR
    }

    /// Normalized RGB for vertex colors
    pub fn to_rgb_f32(self) -> [f32; 3] {
        let (r, g, b) = self.rgb();
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
    }
}

impl From<u32> for VoxColor {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
