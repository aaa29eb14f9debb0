//! Greedy meshing
//!
//! For each axis the grid is swept slice boundary by slice boundary. A 2D
//! mask records, per cell of the boundary plane, which side is occupied and
//! by which slot. Equal mask runs are then merged into rectangles, width
//! first, capped at [`MAX_QUAD_SIZE`] on both edges.

use rayon::prelude::*;

use crate::core::types::IVec3;
use crate::voxel::vox::Vox;
use super::{MeshVertex, VoxMesh, VoxelGrid, MAX_QUAD_SIZE};

/// Builds quad meshes from voxel grids
#[derive(Clone, Copy, Debug)]
pub struct MeshBuilder {
    /// World units per cell
    pub voxel_size: f32,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self { voxel_size: 1.0 }
    }
}

/// One merged rectangle of a boundary plane
struct Quad {
    u: usize,
    v: usize,
    width: usize,
    height: usize,
    /// Positive slot for faces pointing +axis, negated slot for -axis
    value: i32,
}

impl MeshBuilder {
    pub fn new(voxel_size: f32) -> Self {
        Self { voxel_size }
    }

    /// Mesh one grid. Identical input always yields identical output.
    pub fn build(&self, grid: &impl VoxelGrid) -> VoxMesh {
        let mut mesh = VoxMesh::default();
        let size = grid.grid_size();
        if size.contains(&0) {
            return mesh;
        }

        let dims = size.map(|s| s as usize);
        let shift = grid.grid_shift();
        let mut mask = Vec::new();
        let mut quads = Vec::new();

        for d in 0..3 {
            let u_axis = (d + 1) % 3;
            let v_axis = (d + 2) % 3;
            let (size_u, size_v) = (dims[u_axis], dims[v_axis]);
            mask.clear();
            mask.resize(size_u * size_v, 0i32);

            // Boundary `layer` sits between slices layer-1 and layer
            for layer in 0..=dims[d] {
                for v in 0..size_v {
                    for u in 0..size_u {
                        let mut g = IVec3::ZERO;
                        g[d] = layer as i32;
                        g[u_axis] = u as i32;
                        g[v_axis] = v as i32;

                        let behind = if layer > 0 {
                            let mut b = g;
                            b[d] -= 1;
                            grid.slot_at_grid(b)
                        } else {
                            0
                        };
                        let ahead = if layer < dims[d] { grid.slot_at_grid(g) } else { 0 };

                        mask[v * size_u + u] = match (behind != 0, ahead != 0) {
                            (true, false) => behind as i32,
                            (false, true) => -(ahead as i32),
                            _ => 0,
                        };
                    }
                }

                merge_mask(&mut mask, size_u, size_v, &mut quads);
                for quad in quads.drain(..) {
                    self.emit_quad(&mut mesh, grid, shift, d, layer, &quad);
                }
            }
        }

        mesh
    }

    /// Mesh every frame of a vox in parallel, in frame order
    pub fn build_frames(&self, vox: &Vox) -> Vec<VoxMesh> {
        let start = std::time::Instant::now();
        let meshes: Vec<_> = vox.frames().par_iter().map(|frame| self.build(frame)).collect();
        log::debug!(
            "Meshed {} frames ({} quads) in {:.2}ms",
            meshes.len(),
            meshes.iter().map(VoxMesh::quad_count).sum::<usize>(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        meshes
    }

    fn emit_quad(
        &self,
        mesh: &mut VoxMesh,
        grid: &impl VoxelGrid,
        shift: IVec3,
        d: usize,
        layer: usize,
        quad: &Quad,
    ) {
        let u_axis = (d + 1) % 3;
        let v_axis = (d + 2) % 3;
        let positive = quad.value > 0;

        let slot = quad.value.unsigned_abs() as u16;
        let color = grid.slot_color(slot).map(|c| c.to_rgb_f32()).unwrap_or([1.0; 3]);

        let mut normal = [0.0f32; 3];
        normal[d] = if positive { 1.0 } else { -1.0 };

        let mut base = IVec3::ZERO;
        base[d] = layer as i32;
        base[u_axis] = quad.u as i32;
        base[v_axis] = quad.v as i32;
        let mut du = IVec3::ZERO;
        du[u_axis] = quad.width as i32;
        let mut dv = IVec3::ZERO;
        dv[v_axis] = quad.height as i32;

        let corners = [base, base + du, base + du + dv, base + dv];
        let first = mesh.vertices.len() as u32;
        for corner in corners {
            let position = (corner - shift).as_vec3() * self.voxel_size;
            mesh.vertices.push(MeshVertex {
                position: position.to_array(),
                normal,
                color,
            });
        }

        // u x v points along +d, so counter-clockwise seen from +d
        let order: [u32; 6] = if positive {
            [0, 1, 2, 0, 2, 3]
        } else {
            [0, 2, 1, 0, 3, 2]
        };
        mesh.indices.extend(order.iter().map(|i| first + i));
    }
}

/// Greedily cover non-zero mask runs with rectangles, zeroing what is used
fn merge_mask(mask: &mut [i32], size_u: usize, size_v: usize, quads: &mut Vec<Quad>) {
    for v in 0..size_v {
        let mut u = 0;
        while u < size_u {
            let value = mask[v * size_u + u];
            if value == 0 {
                u += 1;
                continue;
            }

            let mut width = 1;
            while u + width < size_u
                && width < MAX_QUAD_SIZE
                && mask[v * size_u + u + width] == value
            {
                width += 1;
            }

            let mut height = 1;
            'grow: while v + height < size_v && height < MAX_QUAD_SIZE {
                for k in 0..width {
                    if mask[(v + height) * size_u + u + k] != value {
                        break 'grow;
                    }
                }
                height += 1;
            }

            for dv in 0..height {
                for k in 0..width {
                    mask[(v + dv) * size_u + u + k] = 0;
                }
            }

            quads.push(Quad { u, v, width, height, value });
            u += width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::voxel::chunk::VoxChunk;
    use crate::voxel::color::VoxColor;

    /// Unit faces as (min corner, normal)
    fn naive_faces(chunk: &VoxChunk) -> BTreeSet<([i32; 3], [i32; 3])> {
        let mut faces = BTreeSet::new();
        for (cell, _) in chunk.iter_voxels() {
            for d in 0..3 {
                for sign in [1, -1] {
                    let mut n = IVec3::ZERO;
                    n[d] = sign;
                    if chunk.has_voxel_at(cell + n) {
                        continue;
                    }
                    let mut corner = cell;
                    if sign > 0 {
                        corner[d] += 1;
                    }
                    faces.insert((corner.to_array(), n.to_array()));
                }
            }
        }
        faces
    }

    fn mesh_faces(mesh: &VoxMesh) -> BTreeSet<([i32; 3], [i32; 3])> {
        let mut faces = BTreeSet::new();
        for quad in mesh.vertices.chunks(4) {
            let n = IVec3::new(
                quad[0].normal[0] as i32,
                quad[0].normal[1] as i32,
                quad[0].normal[2] as i32,
            );
            let corners: Vec<IVec3> = quad
                .iter()
                .map(|v| IVec3::new(v.position[0].round() as i32, v.position[1].round() as i32, v.position[2].round() as i32))
                .collect();
            let min = corners.iter().copied().fold(IVec3::MAX, IVec3::min);
            let max = corners.iter().copied().fold(IVec3::MIN, IVec3::max);
            let hi = max.max(min + IVec3::ONE);
            for z in min.z..hi.z {
                for y in min.y..hi.y {
                    for x in min.x..hi.x {
                        let mut corner = IVec3::new(x, y, z);
                        let d = (0..3).find(|&d| n[d] != 0).unwrap();
                        corner[d] = min[d];
                        faces.insert((corner.to_array(), n.to_array()));
                    }
                }
            }
        }
        faces
    }

    fn scattered_chunk() -> VoxChunk {
        let colors = [VoxColor(0xff0000), VoxColor(0x00ff00), VoxColor(0x0000ff)];
        let mut chunk = VoxChunk::new([6, 5, 4]);
        let mut seed = 12345u32;
        for cell in chunk.bounds().unwrap().cells().collect::<Vec<_>>() {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            let roll = (seed >> 16) % 5;
            if roll < 3 {
                chunk.set_color_at(cell, colors[roll as usize]);
            }
        }
        chunk
    }

    #[test]
    fn test_single_voxel() {
        let mut chunk = VoxChunk::cube(1);
        chunk.set_color_at(IVec3::ZERO, VoxColor(0xff0000));
        let mesh = MeshBuilder::default().build(&chunk);

        assert_eq!(mesh.quad_count(), 6);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_deterministic_bytes() {
        let chunk = scattered_chunk();
        let builder = MeshBuilder::new(0.25);
        let a = builder.build(&chunk);
        let b = builder.build(&chunk.clone());
        assert!(!a.is_empty());
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn test_matches_naive_faces() {
        let chunk = scattered_chunk();
        let mesh = MeshBuilder::default().build(&chunk);
        assert_eq!(mesh_faces(&mesh), naive_faces(&chunk));
    }

    #[test]
    fn test_matches_naive_faces_even_sizes() {
        // Asymmetric content reaching the extra negative cell of even extents
        let mut chunk = VoxChunk::new([4, 2, 3]);
        chunk.set_color_at(IVec3::new(-2, -1, -1), VoxColor(1));
        chunk.set_color_at(IVec3::new(-1, -1, -1), VoxColor(1));
        chunk.set_color_at(IVec3::new(1, 0, 1), VoxColor(2));
        chunk.set_color_at(IVec3::new(1, 0, 0), VoxColor(2));
        let mesh = MeshBuilder::default().build(&chunk);
        assert_eq!(mesh_faces(&mesh), naive_faces(&chunk));
    }

    #[test]
    fn test_merges_flat_slab() {
        let mut chunk = VoxChunk::new([4, 1, 4]);
        for cell in chunk.bounds().unwrap().cells().collect::<Vec<_>>() {
            chunk.set_color_at(cell, VoxColor(7));
        }
        // One quad per side of a 4x1x4 slab
        assert_eq!(MeshBuilder::default().build(&chunk).quad_count(), 6);
    }

    #[test]
    fn test_colors_split_quads() {
        let mut chunk = VoxChunk::new([2, 1, 1]);
        chunk.set_color_at(IVec3::new(-1, 0, 0), VoxColor(1));
        chunk.set_color_at(IVec3::new(0, 0, 0), VoxColor(2));
        // +-x ends, then two quads each for +-y and +-z
        assert_eq!(MeshBuilder::default().build(&chunk).quad_count(), 10);
    }

    #[test]
    fn test_quad_size_cap() {
        let mut chunk = VoxChunk::new([16, 1, 1]);
        for x in -8..8 {
            chunk.set_color_at(IVec3::new(x, 0, 0), VoxColor(3));
        }
        let mesh = MeshBuilder::default().build(&chunk);
        assert_eq!(mesh.quad_count(), 2 + 4 * 2);
        assert_eq!(mesh_faces(&mesh), naive_faces(&chunk));
    }

    #[test]
    fn test_zero_extent() {
        let chunk = VoxChunk::new([0, 3, 3]);
        assert!(MeshBuilder::default().build(&chunk).is_empty());
        assert!(MeshBuilder::default().build(&VoxChunk::default()).is_empty());
    }

    #[test]
    fn test_positions_scaled_and_centered() {
        let mut chunk = VoxChunk::cube(1);
        chunk.set_color_at(IVec3::ZERO, VoxColor(1));
        let mesh = MeshBuilder::new(0.5).build(&chunk);
        for v in &mesh.vertices {
            for c in v.position {
                assert!(c == 0.0 || c == 0.5, "unexpected coordinate {c}");
            }
        }
    }

    #[test]
    fn test_winding_faces_outward() {
        let chunk = scattered_chunk();
        let mesh = MeshBuilder::default().build(&chunk);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
                glam::Vec3::from_array(mesh.vertices[i as usize].position)
            });
            let n = glam::Vec3::from_array(mesh.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn test_build_frames() {
        let mut vox = Vox::new();
        vox.ensure_frame(0).unwrap().set_color_at(IVec3::ZERO, VoxColor(1));
        vox.ensure_frame(2).unwrap().set_color_at(IVec3::new(1, 0, 0), VoxColor(1));
        let meshes = MeshBuilder::default().build_frames(&vox);
        assert_eq!(meshes.len(), 3);
        assert_eq!(meshes[0].quad_count(), 6);
        assert!(meshes[1].is_empty());
        assert_eq!(meshes[2].quad_count(), 6);
    }
}
