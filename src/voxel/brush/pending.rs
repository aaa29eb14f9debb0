//! Turning brush cell sets into a pending delta chunk

use std::collections::BTreeMap;

use crate::core::types::IVec3;
use crate::math::CellBounds;
use crate::voxel::chunk::VoxChunk;
use crate::voxel::color::VoxColor;
use super::settings::{BrushFilter, BrushMode};

/// Uncommitted delta for the active stroke
#[derive(Clone, Debug, PartialEq)]
pub struct PendingChunk {
    pub delta: VoxChunk,
    /// Where the delta's pivot lands in frame cell space
    pub offset: IVec3,
}

impl PendingChunk {
    /// Color the pending delta writes at a frame cell
    pub fn color_at(&self, cell: IVec3) -> Option<VoxColor> {
        self.delta.color_at(cell - self.offset)
    }

    pub fn cell_count(&self) -> usize {
        self.delta.total_non_empty_voxels()
    }
}

/// Colored writes keyed in (x, y, z) order; later writes to a cell win
#[derive(Clone, Debug, Default)]
pub struct CellWrites {
    cells: BTreeMap<[i32; 3], VoxColor>,
}

impl CellWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell: IVec3, color: VoxColor) {
        self.cells.insert(cell.to_array(), color);
    }

    pub fn extend(&mut self, cells: impl IntoIterator<Item = IVec3>, color: VoxColor) {
        for cell in cells {
            self.insert(cell, color);
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IVec3, VoxColor)> + '_ {
        self.cells.iter().map(|(c, &color)| (IVec3::from_array(*c), color))
    }

    /// Drop writes the filter forbids against the committed chunk
    pub fn apply_filter(&mut self, committed: &VoxChunk, filter: BrushFilter, mode: BrushMode) {
        match (filter, mode) {
            (BrushFilter::Keep, BrushMode::Add) => {
                self.cells.retain(|c, _| !committed.has_voxel_at(IVec3::from_array(*c)));
            }
            (BrushFilter::Paint, _) => {
                self.cells.retain(|c, _| committed.has_voxel_at(IVec3::from_array(*c)));
            }
            _ => {}
        }
    }

    /// Committed voxels these writes would clear
    pub fn removed_count(&self, committed: &VoxChunk) -> usize {
        self.iter()
            .filter(|(cell, color)| color.is_remove() && committed.has_voxel_at(*cell))
            .count()
    }

    /// False if applying to `committed` would leave the whole vox, holding
    /// `vox_total` voxels over all its frames, without any
    pub fn keeps_a_voxel(&self, committed: &VoxChunk, vox_total: usize) -> bool {
        let removed = self.removed_count(committed);
        removed == 0 || vox_total > removed
    }

    /// Pack into the smallest delta chunk that holds every write
    pub fn to_pending(&self) -> Option<PendingChunk> {
        let bounds = CellBounds::from_cells(self.iter().map(|(cell, _)| cell))?;
        let (mut delta, offset) = VoxChunk::for_bounds(&bounds);
        for (cell, color) in self.iter() {
            if !delta.set_color_at(cell - offset, color) {
                log::warn!("Brush cell {:?} outside max delta extent, dropped", cell);
            }
        }
        Some(PendingChunk { delta, offset })
    }
}
