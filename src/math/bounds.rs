//! Integer cell bounding box

use crate::core::types::IVec3;

/// Inclusive box of voxel cells defined by min and max corners
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellBounds {
    pub min: IVec3,
    pub max: IVec3,
}

impl CellBounds {
    /// Create bounds from min and max corners (inclusive)
    pub fn new(min: IVec3, max: IVec3) -> Self {
        Self { min, max }
    }

    /// Bounds containing exactly one cell
    pub fn from_cell(cell: IVec3) -> Self {
        Self { min: cell, max: cell }
    }

    /// Bounds spanning two cells in any order
    pub fn spanning(a: IVec3, b: IVec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Smallest bounds containing every cell, or None for an empty iterator
    pub fn from_cells(cells: impl IntoIterator<Item = IVec3>) -> Option<Self> {
        let mut iter = cells.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_cell(first);
        for cell in iter {
            bounds.expand(cell);
        }
        Some(bounds)
    }

    /// Number of cells along each axis
    pub fn span(&self) -> IVec3 {
        self.max - self.min + IVec3::ONE
    }

    /// Check if cell is inside bounds
    pub fn contains(&self, cell: IVec3) -> bool {
        cell.cmpge(self.min).all() && cell.cmple(self.max).all()
    }

    /// Expand bounds to include cell
    pub fn expand(&mut self, cell: IVec3) {
        self.min = self.min.min(cell);
        self.max = self.max.max(cell);
    }

    /// Return merged bounds containing both
    pub fn merged(&self, other: &CellBounds) -> CellBounds {
        CellBounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Offset that centers a chunk of `span()` cells over these bounds.
    ///
    /// A chunk of size `s` covers `[-floor(s/2), ceil(s/2) - 1]`, so the
    /// offset is `min + floor(span/2)`.
    pub fn center_offset(&self) -> IVec3 {
        self.min + self.span() / 2
    }

    /// Iterate all cells, x fastest
    pub fn cells(&self) -> impl Iterator<Item = IVec3> + '_ {
        let (min, max) = (self.min, self.max);
        (min.z..=max.z).flat_map(move |z| {
            (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| IVec3::new(x, y, z)))
        })
    }
}
