//! Brush cell sets
//!
//! Each function returns the cells one brush type covers, before mirroring,
//! coloring and filtering.

use crate::core::types::{IVec3, Vec3};
use crate::math::{CellBounds, Face};
use crate::voxel::chunk::VoxChunk;
use super::settings::{BrushMode, BrushShape};

/// Slack added to squared radii so sphere edges are not too thin
const SPHERE_TOLERANCE: f32 = 0.5;

fn inside_ellipsoid(offset: Vec3, radii: Vec3) -> bool {
    let r = radii.max(Vec3::splat(0.5));
    let q = offset / r;
    // Squared distance vs squared radius, scaled per axis
    q.length_squared() <= 1.0 + SPHERE_TOLERANCE / r.min_element().powi(2)
}

/// Cube or sphere of edge `size` around `center`.
///
/// Even sizes reach one cell further on the negative side, like chunks do.
pub fn voxel_cells(center: IVec3, size: u32, shape: BrushShape) -> Vec<IVec3> {
    let n = size.max(1) as i32;
    let lo = -(n / 2);
    let hi = lo + n - 1;
    let bounds = CellBounds::new(center + IVec3::splat(lo), center + IVec3::splat(hi));

    match shape {
        BrushShape::Box => bounds.cells().collect(),
        BrushShape::Sphere => {
            let mid = (lo + hi) as f32 / 2.0;
            let r = n as f32 / 2.0;
            bounds
                .cells()
                .filter(|&cell| {
                    let o = (cell - center).as_vec3() - Vec3::splat(mid);
                    o.length_squared() <= r * r + SPHERE_TOLERANCE
                })
                .collect()
        }
    }
}

/// Axis-aligned box spanning `start` and `end`
pub fn box_cells(start: IVec3, end: IVec3) -> Vec<IVec3> {
    CellBounds::spanning(start, end).cells().collect()
}

/// Box centered on `start` with half-extent equal to the distance to `end`.
///
/// The axis along which `end` moved least keeps that smaller extent, so a
/// drag across a face gives a flat disc or square rather than a cube.
pub fn center_cells(start: IVec3, end: IVec3, shape: BrushShape) -> Vec<IVec3> {
    let delta = (end - start).abs();
    let radius = (end - start).as_vec3().length().round() as i32;

    let short = if delta.x <= delta.y && delta.x <= delta.z {
        0
    } else if delta.y <= delta.z {
        1
    } else {
        2
    };
    let mut half = IVec3::splat(radius);
    half[short] = delta[short];

    let bounds = CellBounds::new(start - half, start + half);
    match shape {
        BrushShape::Box => bounds.cells().collect(),
        BrushShape::Sphere => bounds
            .cells()
            .filter(|&cell| inside_ellipsoid((cell - start).as_vec3(), half.as_vec3()))
            .collect(),
    }
}

/// Stamp a crawl mask along the face normal.
///
/// `mask` holds region cells with the face axis flattened to 0 and `hit` is
/// the clicked cell. ADD starts one layer outside the face and grows outward,
/// REMOVE starts at the clicked layer and digs inward.
pub fn face_cells(mask: &VoxChunk, face: Face, hit: IVec3, sweep: u32, mode: BrushMode) -> Vec<IVec3> {
    let axis = face.axis.index();
    let (first, step) = match mode {
        BrushMode::Add => (hit[axis] + face.sign, face.sign),
        BrushMode::Remove => (hit[axis], -face.sign),
    };

    let mut cells = Vec::new();
    for layer in 0..sweep.max(1) as i32 {
        let depth = first + step * layer;
        cells.extend(mask.iter_voxels().map(|(mut cell, _)| {
            cell[axis] = depth;
            cell
        }));
    }
    cells
}

/// The crawl mask placed on the clicked layer
pub fn fill_cells(mask: &VoxChunk, face: Face, hit: IVec3) -> Vec<IVec3> {
    let axis = face.axis.index();
    mask.iter_voxels()
        .map(|(mut cell, _)| {
            cell[axis] = hit[axis];
            cell
        })
        .collect()
}

/// Apply every mirror sign vector to a cell set
pub fn mirror_cells(cells: &[IVec3], signs: &[IVec3]) -> Vec<IVec3> {
    signs
        .iter()
        .flat_map(|&sign| cells.iter().map(move |&cell| cell * sign))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Axis;
    use crate::voxel::color::VoxColor;

    fn sorted(mut cells: Vec<IVec3>) -> Vec<[i32; 3]> {
        let mut out: Vec<_> = cells.drain(..).map(|c| c.to_array()).collect();
        out.sort();
        out.dedup();
        out
    }

    #[test]
    fn test_voxel_single() {
        assert_eq!(voxel_cells(IVec3::new(2, 0, 0), 1, BrushShape::Box), vec![IVec3::new(2, 0, 0)]);
        assert_eq!(voxel_cells(IVec3::ZERO, 1, BrushShape::Sphere), vec![IVec3::ZERO]);
        assert_eq!(voxel_cells(IVec3::ZERO, 0, BrushShape::Box).len(), 1);
    }

    #[test]
    fn test_voxel_box_sizes() {
        let cells = voxel_cells(IVec3::ZERO, 3, BrushShape::Box);
        assert_eq!(cells.len(), 27);
        assert!(cells.contains(&IVec3::NEG_ONE) && cells.contains(&IVec3::ONE));

        let even = voxel_cells(IVec3::ZERO, 2, BrushShape::Box);
        assert_eq!(even.len(), 8);
        assert!(even.contains(&IVec3::NEG_ONE) && even.contains(&IVec3::ZERO));
        assert!(!even.contains(&IVec3::ONE));
    }

    #[test]
    fn test_voxel_sphere_drops_corners() {
        let cells = voxel_cells(IVec3::ZERO, 3, BrushShape::Sphere);
        assert!(cells.contains(&IVec3::ZERO));
        assert!(cells.contains(&IVec3::new(1, 1, 0)));
        assert!(!cells.contains(&IVec3::ONE));
        assert_eq!(cells.len(), 27 - 8);
    }

    #[test]
    fn test_box_any_order() {
        let a = box_cells(IVec3::new(1, 0, 0), IVec3::new(-1, 2, 0));
        let b = box_cells(IVec3::new(-1, 2, 0), IVec3::new(1, 0, 0));
        assert_eq!(a.len(), 9);
        assert_eq!(sorted(a), sorted(b));
    }

    #[test]
    fn test_center_keeps_short_axis() {
        // Drag 2 along x, 0 along y/z: flat 5x1x5 or 5x5x1 square, never a cube
        let cells = center_cells(IVec3::ZERO, IVec3::new(2, 0, 0), BrushShape::Box);
        let bounds = CellBounds::from_cells(cells.iter().copied()).unwrap();
        let span = bounds.span();
        assert_eq!(span.x, 5);
        assert_eq!(span.y * span.z, 5);
        assert_eq!(cells.len(), 25);

        let cells = center_cells(IVec3::ZERO, IVec3::new(2, 2, 1), BrushShape::Box);
        let bounds = CellBounds::from_cells(cells.iter().copied()).unwrap();
        assert_eq!(bounds.span(), IVec3::new(7, 7, 3));
    }

    #[test]
    fn test_center_zero_drag() {
        assert_eq!(center_cells(IVec3::ONE, IVec3::ONE, BrushShape::Sphere), vec![IVec3::ONE]);
    }

    #[test]
    fn test_face_sweep_add_and_remove() {
        let mut mask = VoxChunk::cube(1);
        mask.set_color_at(IVec3::ZERO, VoxColor(1));
        let face = Face::new(Axis::Y, true);

        let add = face_cells(&mask, face, IVec3::new(0, 2, 0), 3, BrushMode::Add);
        assert_eq!(add, vec![IVec3::new(0, 3, 0), IVec3::new(0, 4, 0), IVec3::new(0, 5, 0)]);

        let remove = face_cells(&mask, face, IVec3::new(0, 2, 0), 2, BrushMode::Remove);
        assert_eq!(remove, vec![IVec3::new(0, 2, 0), IVec3::new(0, 1, 0)]);

        let down = Face::new(Axis::Y, false);
        let add = face_cells(&mask, down, IVec3::ZERO, 1, BrushMode::Add);
        assert_eq!(add, vec![IVec3::new(0, -1, 0)]);
    }

    #[test]
    fn test_fill_in_place() {
        let mut mask = VoxChunk::cube(3);
        mask.set_color_at(IVec3::new(1, 0, 0), VoxColor(1));
        mask.set_color_at(IVec3::new(0, 0, 1), VoxColor(1));
        let cells = fill_cells(&mask, Face::new(Axis::Y, true), IVec3::new(0, -4, 0));
        assert_eq!(sorted(cells), vec![[0, -4, 1], [1, -4, 0]]);
    }

    #[test]
    fn test_mirror() {
        let cells = mirror_cells(&[IVec3::new(2, 0, 0)], &[IVec3::ONE, IVec3::new(-1, 1, 1)]);
        assert_eq!(cells, vec![IVec3::new(2, 0, 0), IVec3::new(-2, 0, 0)]);
    }
}
