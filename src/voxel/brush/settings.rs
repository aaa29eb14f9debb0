//! Brush configuration

use serde::{Deserialize, Serialize};

use crate::core::types::IVec3;
use crate::voxel::color::VoxColor;
use crate::voxel::crawl::{CrawlExtents, CrawlType};

/// What a stroke builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushType {
    /// Box or sphere of `brush_size` around the cursor, accumulated over the stroke
    #[default]
    Voxel,
    /// Box spanning stroke start and end
    Box,
    /// Clicked face region extruded along its normal
    Face,
    /// Box centered on the stroke start
    Center,
    /// Clicked face region, one layer in place
    Fill,
    /// Sample a color instead of editing
    Pick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushMode {
    #[default]
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushShape {
    #[default]
    Box,
    Sphere,
}

/// Restriction applied against committed voxels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushFilter {
    #[default]
    None,
    /// Leave existing voxels alone, only fill empty cells
    Keep,
    /// Only recolor existing voxels, never create new ones
    Paint,
}

/// Color written by face brushes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorFillMode {
    /// The equipped color
    #[default]
    Selected,
    /// The color of the clicked voxel
    Existing,
}

/// Session-wide brush settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    pub brush_type: BrushType,
    pub mode: BrushMode,
    pub shape: BrushShape,
    pub filter: BrushFilter,
    pub crawl_type: CrawlType,
    pub crawl_extents: CrawlExtents,
    pub color_fill: ColorFillMode,
    /// Edge length in cells of the VOXEL brush
    pub brush_size: u32,
    pub mirror_x: bool,
    pub mirror_y: bool,
    pub mirror_z: bool,
    /// Colors selectable with the cycle input
    pub palette_slots: Vec<VoxColor>,
    pub equipped_slot: usize,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            brush_type: BrushType::Voxel,
            mode: BrushMode::Add,
            shape: BrushShape::Box,
            filter: BrushFilter::None,
            crawl_type: CrawlType::Geo,
            crawl_extents: CrawlExtents::Nsew,
            color_fill: ColorFillMode::Selected,
            brush_size: 1,
            mirror_x: false,
            mirror_y: false,
            mirror_z: false,
            palette_slots: vec![
                VoxColor::from_rgb(0xff, 0xff, 0xff),
                VoxColor::from_rgb(0xff, 0x00, 0x00),
                VoxColor::from_rgb(0x00, 0xff, 0x00),
                VoxColor::from_rgb(0x00, 0x00, 0xff),
            ],
            equipped_slot: 0,
        }
    }
}

impl BrushSettings {
    /// Color of the equipped slot, white when the palette is empty
    pub fn equipped_color(&self) -> VoxColor {
        self.palette_slots
            .get(self.equipped_slot)
            .copied()
            .unwrap_or(VoxColor::from_rgb(0xff, 0xff, 0xff))
    }

    /// Overwrite the equipped slot, creating it if the palette is empty
    pub fn set_equipped_color(&mut self, color: VoxColor) {
        match self.palette_slots.get_mut(self.equipped_slot) {
            Some(slot) => *slot = color,
            None => {
                self.palette_slots.push(color);
                self.equipped_slot = self.palette_slots.len() - 1;
            }
        }
    }

    /// Move the equipped slot by `steps`, wrapping around
    pub fn cycle_slot(&mut self, steps: i32) {
        let len = self.palette_slots.len() as i32;
        if len == 0 {
            return;
        }
        self.equipped_slot = (self.equipped_slot as i32 + steps).rem_euclid(len) as usize;
    }

    /// Sign vectors for every enabled mirror combination, identity first
    pub fn mirror_signs(&self) -> Vec<IVec3> {
        let xs: &[i32] = if self.mirror_x { &[1, -1] } else { &[1] };
        let ys: &[i32] = if self.mirror_y { &[1, -1] } else { &[1] };
        let zs: &[i32] = if self.mirror_z { &[1, -1] } else { &[1] };

        let mut signs = Vec::with_capacity(8);
        for &z in zs {
            for &y in ys {
                for &x in xs {
                    signs.push(IVec3::new(x, y, z));
                }
            }
        }
        signs
    }

    /// Whether edits land on the clicked voxel rather than next to it
    pub fn targets_hit_cell(&self) -> bool {
        self.mode == BrushMode::Remove || self.filter == BrushFilter::Paint
    }
}
