//! Face region flood fill
//!
//! Starting from a clicked face, walks the plane orthogonal to the face
//! normal and collects every connected cell whose same face is exposed.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::types::IVec3;
use crate::math::{CellBounds, Face};
use crate::voxel::chunk::VoxChunk;
use crate::voxel::color::VoxColor;

/// What a neighbor must hold to join the region
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlType {
    /// Exactly the seed color
    Color,
    /// Any voxel
    #[default]
    Geo,
}

/// Neighborhood used within the face plane
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlExtents {
    /// 4-connected
    #[default]
    Nsew,
    /// 8-connected, diagonals included
    All,
}

fn pack_cell(cell: IVec3) -> u32 {
    let x = (cell.x + 512) as u32 & 0x3ff;
    let y = (cell.y + 512) as u32 & 0x3ff;
    let z = (cell.z + 512) as u32 & 0x3ff;
    x | y << 10 | z << 20
}

fn plane_offsets(face: Face, extents: CrawlExtents) -> Vec<IVec3> {
    let (a, b) = face.axis.plane_axes();
    let (ua, ub) = (a.unit(), b.unit());
    let mut offsets = vec![ua, -ua, ub, -ub];
    if extents == CrawlExtents::All {
        offsets.extend([ua + ub, ua - ub, -ua + ub, -ua - ub]);
    }
    offsets
}

/// Flood fill the face region containing `seed`.
///
/// Returns the seed color and a mask chunk holding every region cell, with
/// the face normal's axis flattened to 0 and colored with the seed color.
/// None if `seed` is empty.
pub fn crawl_face(
    chunk: &VoxChunk,
    seed: IVec3,
    face: Face,
    crawl_type: CrawlType,
    extents: CrawlExtents,
) -> Option<(VoxColor, VoxChunk)> {
    let seed_color = chunk.color_at(seed)?;
    let normal = face.normal();
    let offsets = plane_offsets(face, extents);

    let matches = |cell: IVec3| match crawl_type {
        CrawlType::Color => chunk.color_at(cell) == Some(seed_color),
        CrawlType::Geo => chunk.has_voxel_at(cell),
    };

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut region = Vec::new();
    visited.insert(pack_cell(seed));
    queue.push_back(seed);

    while let Some(cell) = queue.pop_front() {
        region.push(cell);
        for &offset in &offsets {
            let next = cell + offset;
            if !chunk.contains_cell(next) || !visited.insert(pack_cell(next)) {
                continue;
            }
            if matches(next) && !chunk.has_voxel_at(next + normal) {
                queue.push_back(next);
            }
        }
    }

    let axis = face.axis.index();
    let flatten = |mut cell: IVec3| {
        cell[axis] = 0;
        cell
    };

    let mut mask = VoxChunk::default();
    if let Some(bounds) = CellBounds::from_cells(region.iter().map(|&c| flatten(c))) {
        mask.resize_to_fit_bounds(&bounds);
    }
    for &cell in &region {
        mask.set_color_at(flatten(cell), seed_color);
    }

    log::debug!(
        "Crawled {} cells from {:?} (face {:?}, {:?}/{:?})",
        region.len(),
        seed,
        face.omit_axis(),
        crawl_type,
        extents
    );
    Some((seed_color, mask))
}
