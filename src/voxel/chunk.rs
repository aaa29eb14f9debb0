//! Dense palette-indexed voxel chunk
//!
//! Cells are addressed by signed coordinates centered on the chunk pivot.
//! Along each axis a chunk of size `s` stores grid indices `0..s`, and grid
//! index `g` holds cell `g - floor(s/2)`. Even sizes therefore reach one cell
//! further on the negative side: size 4 covers `-2..=1`.

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::{IVec3, Result};
use crate::math::CellBounds;
use crate::voxel::color::VoxColor;

/// Largest allowed extent of a chunk along any axis
pub const MAX_SIZE: u32 = 64;

/// Palette slot meaning "no voxel"
pub const EMPTY_SLOT: u16 = 0;

/// Wire/persistence form of a chunk: `{size, palette, indices}`.
///
/// `palette[i]` is referenced by index value `i + 1`; index 0 is empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedChunk {
    pub size: [u32; 3],
    pub palette: Vec<u32>,
    pub indices: Vec<u16>,
}

/// A bounded 3D grid of palette-indexed voxel colors
#[derive(Clone, Debug)]
pub struct VoxChunk {
    size: [u32; 3],
    /// Distinct colors; slot `n` refers to `palette[n - 1]`
    palette: Vec<VoxColor>,
    /// One palette slot per cell, x fastest
    indices: Vec<u16>,
}

/// Smallest size along one axis whose cell range covers `min..=max` and is at
/// least `current`.
fn required_extent(current: u32, min: i32, max: i32) -> u32 {
    let for_min = if min < 0 { 2 * (-min) as u32 } else { 0 };
    let for_max = if max >= 0 { 2 * max as u32 + 1 } else { 0 };
    current.max(for_min).max(for_max)
}

impl VoxChunk {
    /// Create an empty chunk. Extents above [`MAX_SIZE`] are clamped.
    pub fn new(size: [u32; 3]) -> Self {
        let size = size.map(|s| {
            if s > MAX_SIZE {
                log::warn!("Chunk extent {} exceeds max {}, clamping", s, MAX_SIZE);
            }
            s.min(MAX_SIZE)
        });
        let len = (size[0] * size[1] * size[2]) as usize;
        Self {
            size,
            palette: Vec::new(),
            indices: vec![EMPTY_SLOT; len],
        }
    }

    /// Create an empty cube chunk
    pub fn cube(edge: u32) -> Self {
        Self::new([edge; 3])
    }

    /// Create an empty chunk sized exactly to `bounds`, plus the offset at
    /// which it has to be placed so its cells line up with `bounds`.
    pub fn for_bounds(bounds: &CellBounds) -> (Self, IVec3) {
        let span = bounds.span();
        let chunk = Self::new([span.x as u32, span.y as u32, span.z as u32]);
        (chunk, bounds.center_offset())
    }

    pub fn size(&self) -> [u32; 3] {
        self.size
    }

    /// Per-axis `floor(size / 2)`; grid index = cell + shift
    pub fn shift(&self) -> IVec3 {
        IVec3::new(
            (self.size[0] / 2) as i32,
            (self.size[1] / 2) as i32,
            (self.size[2] / 2) as i32,
        )
    }

    /// Cell range of this chunk, None when any axis has zero extent
    pub fn bounds(&self) -> Option<CellBounds> {
        if self.size.contains(&0) {
            return None;
        }
        let shift = self.shift();
        let size = IVec3::new(self.size[0] as i32, self.size[1] as i32, self.size[2] as i32);
        Some(CellBounds::new(-shift, size - shift - IVec3::ONE))
    }

    pub fn palette(&self) -> &[VoxColor] {
        &self.palette
    }

    /// Check if a cell lies inside the allocated grid
    pub fn contains_cell(&self, cell: IVec3) -> bool {
        self.grid_index(cell).is_some()
    }

    fn grid_index(&self, cell: IVec3) -> Option<usize> {
        let g = cell + self.shift();
        self.grid_index_raw(g)
    }

    fn grid_index_raw(&self, g: IVec3) -> Option<usize> {
        let [sx, sy, sz] = self.size;
        if g.x < 0 || g.y < 0 || g.z < 0 {
            return None;
        }
        let (x, y, z) = (g.x as u32, g.y as u32, g.z as u32);
        if x >= sx || y >= sy || z >= sz {
            return None;
        }
        Some((x + sx * (y + sy * z)) as usize)
    }

    /// Palette slot at a grid (unshifted) index; 0 outside the grid
    pub fn palette_index_at_grid(&self, g: IVec3) -> u16 {
        self.grid_index_raw(g)
            .map(|i| self.indices[i])
            .unwrap_or(EMPTY_SLOT)
    }

    /// Color referenced by a non-empty palette slot
    pub fn slot_color(&self, slot: u16) -> Option<VoxColor> {
        if slot == EMPTY_SLOT {
            return None;
        }
        self.palette.get(slot as usize - 1).copied()
    }

    /// Palette slot at a cell; 0 when empty or outside the grid
    pub fn palette_index_at(&self, cell: IVec3) -> u16 {
        self.grid_index(cell)
            .map(|i| self.indices[i])
            .unwrap_or(EMPTY_SLOT)
    }

    pub fn has_voxel_at(&self, cell: IVec3) -> bool {
        self.palette_index_at(cell) != EMPTY_SLOT
    }

    pub fn color_at(&self, cell: IVec3) -> Option<VoxColor> {
        self.slot_color(self.palette_index_at(cell))
    }

    /// Palette slot for `color`, appending it if unseen.
    /// None when the palette is full.
    fn slot_for_color(&mut self, color: VoxColor) -> Option<u16> {
        if let Some(pos) = self.palette.iter().position(|&c| c == color) {
            return Some(pos as u16 + 1);
        }
        if self.palette.len() >= u16::MAX as usize {
            log::warn!("Chunk palette full, dropping color {:#010x}", color.0);
            return None;
        }
        self.palette.push(color);
        Some(self.palette.len() as u16)
    }

    /// Write a color at a cell, growing the chunk when needed.
    ///
    /// Returns false (and leaves the chunk untouched) if the chunk would have
    /// to grow past [`MAX_SIZE`].
    pub fn set_color_at(&mut self, cell: IVec3, color: VoxColor) -> bool {
        if !self.resize_to_fit(cell) {
            return false;
        }
        let Some(slot) = self.slot_for_color(color) else {
            return false;
        };
        match self.grid_index(cell) {
            Some(i) => {
                self.indices[i] = slot;
                true
            }
            None => false,
        }
    }

    /// Clear a cell. Cells outside the grid are already empty.
    pub fn remove_voxel_at(&mut self, cell: IVec3) {
        if let Some(i) = self.grid_index(cell) {
            self.indices[i] = EMPTY_SLOT;
        }
    }

    /// Grow so that `cell` is addressable. Never shrinks.
    pub fn resize_to_fit(&mut self, cell: IVec3) -> bool {
        self.resize_to_fit_bounds(&CellBounds::from_cell(cell))
    }

    /// Grow so that every cell of `bounds` is addressable, keeping existing
    /// voxels at their signed coordinates. Returns false without changes when
    /// the required size exceeds [`MAX_SIZE`].
    pub fn resize_to_fit_bounds(&mut self, bounds: &CellBounds) -> bool {
        let wanted = match self.bounds() {
            Some(current) => current.merged(bounds),
            None => *bounds,
        };

        let mut new_size = [0u32; 3];
        for axis in 0..3 {
            let current = if self.size.contains(&0) { 0 } else { self.size[axis] };
            new_size[axis] = required_extent(current, wanted.min[axis], wanted.max[axis]);
        }

        if new_size == self.size {
            return true;
        }
        if new_size.iter().any(|&s| s > MAX_SIZE) {
            log::debug!("Resize to {:?} rejected, max extent is {}", new_size, MAX_SIZE);
            return false;
        }

        let mut resized = VoxChunk::new(new_size);
        for (i, cell) in self.grid_cells() {
            let slot = self.indices[i];
            if slot == EMPTY_SLOT {
                continue;
            }
            if let Some(j) = resized.grid_index(cell) {
                resized.indices[j] = slot;
            }
        }
        resized.palette = std::mem::take(&mut self.palette);
        *self = resized;
        true
    }

    /// Remove all voxels, keeping the allocated size
    pub fn clear(&mut self) {
        self.indices.fill(EMPTY_SLOT);
        self.palette.clear();
    }

    pub fn total_non_empty_voxels(&self) -> usize {
        self.indices.iter().filter(|&&s| s != EMPTY_SLOT).count()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.iter().all(|&s| s == EMPTY_SLOT)
    }

    /// (grid index, signed cell) for every allocated cell, x fastest
    fn grid_cells(&self) -> impl Iterator<Item = (usize, IVec3)> + '_ {
        let shift = self.shift();
        let [sx, sy, sz] = self.size;
        (0..sz).flat_map(move |z| {
            (0..sy).flat_map(move |y| {
                (0..sx).map(move |x| {
                    let i = (x + sx * (y + sy * z)) as usize;
                    (i, IVec3::new(x as i32, y as i32, z as i32) - shift)
                })
            })
        })
    }

    /// Iterate non-empty voxels in grid order
    pub fn iter_voxels(&self) -> impl Iterator<Item = (IVec3, VoxColor)> + '_ {
        self.grid_cells().filter_map(move |(i, cell)| {
            self.slot_color(self.indices[i]).map(|color| (cell, color))
        })
    }

    pub fn serialize(&self) -> SerializedChunk {
        SerializedChunk {
            size: self.size,
            palette: self.palette.iter().map(|c| c.0).collect(),
            indices: self.indices.clone(),
        }
    }

    pub fn deserialize(data: &SerializedChunk) -> Result<Self> {
        if data.size.iter().any(|&s| s > MAX_SIZE) {
            return Err(Error::InvalidChunk(format!(
                "size {:?} exceeds max extent {}",
                data.size, MAX_SIZE
            )));
        }

        let expected = data.size.iter().map(|&s| s as usize).product::<usize>();
        if data.indices.len() != expected {
            return Err(Error::InvalidChunk(format!(
                "expected {} indices for size {:?}, got {}",
                expected,
                data.size,
                data.indices.len()
            )));
        }

        if let Some(&bad) = data.indices.iter().find(|&&s| s as usize > data.palette.len()) {
            return Err(Error::InvalidChunk(format!(
                "index {} out of palette range {}",
                bad,
                data.palette.len()
            )));
        }

        for (i, color) in data.palette.iter().enumerate() {
            if data.palette[..i].contains(color) {
                return Err(Error::InvalidChunk(format!("duplicate palette color {:#010x}", color)));
            }
        }

        Ok(Self {
            size: data.size,
            palette: data.palette.iter().map(|&c| VoxColor(c)).collect(),
            indices: data.indices.clone(),
        })
    }
}

impl Default for VoxChunk {
    fn default() -> Self {
        Self::new([0; 3])
    }
}

/// Content equality: same color at every signed cell, regardless of palette
/// order or allocated size.
impl PartialEq for VoxChunk {
    fn eq(&self, other: &Self) -> bool {
        self.total_non_empty_voxels() == other.total_non_empty_voxels()
            && self
                .iter_voxels()
                .all(|(cell, color)| other.color_at(cell) == Some(color))
    }
}
