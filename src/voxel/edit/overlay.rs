//! Per-cell overlay merge of deltas onto chunks.
//!
//! Applying a delta touches only the cells the delta holds: removal markers
//! clear, colors overwrite. Deltas over disjoint cells commute, and for a
//! shared cell the last applied delta wins, so concurrent edits from several
//! clients converge without locking.

use crate::core::types::IVec3;
use crate::math::CellBounds;
use crate::voxel::chunk::VoxChunk;

/// Overlay `delta` placed at `offset` onto `target`.
///
/// The target grows to fit written cells; cells that would push it past
/// `MAX_SIZE` are dropped. Returns the number of cells written or cleared.
pub fn apply_delta(target: &mut VoxChunk, delta: &VoxChunk, offset: IVec3) -> usize {
    let writes: Vec<_> = delta
        .iter_voxels()
        .map(|(cell, color)| (cell + offset, color))
        .collect();

    // Grow once up front; fall back to per-cell growth if the whole delta
    // does not fit.
    if let Some(bounds) = CellBounds::from_cells(
        writes.iter().filter(|(_, c)| !c.is_remove()).map(|(cell, _)| *cell),
    ) {
        if !target.resize_to_fit_bounds(&bounds) {
            log::debug!("Delta bounds {:?} exceed max size, writing cell by cell", bounds);
        }
    }

    let mut changed = 0;
    for (cell, color) in writes {
        if color.is_remove() {
            if target.has_voxel_at(cell) {
                target.remove_voxel_at(cell);
                changed += 1;
            }
        } else if target.set_color_at(cell, color) {
            changed += 1;
        }
    }
    changed
}

/// Committed chunk with a pending delta overlaid, for previews
pub fn overlay_preview(committed: &VoxChunk, pending: &VoxChunk, offset: IVec3) -> VoxChunk {
    let mut preview = committed.clone();
    apply_delta(&mut preview, pending, offset);
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::MAX_SIZE;
    use crate::voxel::color::{VoxColor, REMOVE_VOXEL_COLOR};

    const RED: VoxColor = VoxColor(0xff0000);
    const BLUE: VoxColor = VoxColor(0x0000ff);

    fn single(cell: IVec3, color: VoxColor) -> VoxChunk {
        let mut chunk = VoxChunk::cube(1);
        chunk.set_color_at(cell, color);
        chunk
    }

    #[test]
    fn test_overwrite_and_grow() {
        let mut target = single(IVec3::ZERO, RED);
        let mut delta = VoxChunk::cube(3);
        delta.set_color_at(IVec3::ZERO, BLUE);
        delta.set_color_at(IVec3::X, BLUE);

        let changed = apply_delta(&mut target, &delta, IVec3::new(2, 0, 0));
        assert_eq!(changed, 2);
        assert_eq!(target.color_at(IVec3::ZERO), Some(RED));
        assert_eq!(target.color_at(IVec3::new(2, 0, 0)), Some(BLUE));
        assert_eq!(target.color_at(IVec3::new(3, 0, 0)), Some(BLUE));
    }

    #[test]
    fn test_remove_clears_only_marked_cells() {
        let mut target = VoxChunk::cube(3);
        target.set_color_at(IVec3::ZERO, RED);
        target.set_color_at(IVec3::ONE, RED);

        let delta = single(IVec3::ZERO, REMOVE_VOXEL_COLOR);
        assert_eq!(apply_delta(&mut target, &delta, IVec3::ONE), 1);
        assert!(target.has_voxel_at(IVec3::ZERO));
        assert!(!target.has_voxel_at(IVec3::ONE));
    }

    #[test]
    fn test_remove_outside_target_does_not_grow() {
        let mut target = single(IVec3::ZERO, RED);
        let delta = single(IVec3::ZERO, REMOVE_VOXEL_COLOR);
        assert_eq!(apply_delta(&mut target, &delta, IVec3::splat(10)), 0);
        assert_eq!(target.size(), [1, 1, 1]);
    }

    #[test]
    fn test_disjoint_deltas_commute() {
        let base = single(IVec3::ZERO, RED);
        let a = single(IVec3::ZERO, BLUE);
        let b = single(IVec3::ZERO, REMOVE_VOXEL_COLOR);

        let mut ab = base.clone();
        apply_delta(&mut ab, &a, IVec3::X);
        apply_delta(&mut ab, &b, IVec3::ZERO);

        let mut ba = base.clone();
        apply_delta(&mut ba, &b, IVec3::ZERO);
        apply_delta(&mut ba, &a, IVec3::X);

        assert_eq!(ab, ba);
    }

    #[test]
    fn test_same_cell_last_wins() {
        let mut target = VoxChunk::cube(1);
        apply_delta(&mut target, &single(IVec3::ZERO, RED), IVec3::ZERO);
        apply_delta(&mut target, &single(IVec3::ZERO, BLUE), IVec3::ZERO);
        assert_eq!(target.color_at(IVec3::ZERO), Some(BLUE));
    }

    #[test]
    fn test_cells_beyond_max_are_dropped() {
        let mut target = single(IVec3::ZERO, RED);
        let mut delta = VoxChunk::cube(1);
        delta.set_color_at(IVec3::ZERO, BLUE);
        delta.set_color_at(IVec3::X, BLUE);

        // First cell just fits, second would exceed the max extent
        let edge = (MAX_SIZE as i32 - 1) / 2;
        let changed = apply_delta(&mut target, &delta, IVec3::new(edge, 0, 0));
        assert_eq!(changed, 1);
        assert_eq!(target.color_at(IVec3::new(edge, 0, 0)), Some(BLUE));
        assert!(!target.has_voxel_at(IVec3::new(edge + 1, 0, 0)));
        assert_eq!(target.color_at(IVec3::ZERO), Some(RED));
    }

    #[test]
    fn test_overlay_preview_leaves_committed() {
        let committed = single(IVec3::ZERO, RED);
        let pending = single(IVec3::ZERO, REMOVE_VOXEL_COLOR);
        let preview = overlay_preview(&committed, &pending, IVec3::ZERO);
        assert!(preview.is_empty());
        assert_eq!(committed.total_non_empty_voxels(), 1);
    }
}
