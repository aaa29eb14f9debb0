use criterion::{criterion_group, criterion_main, Criterion, black_box};

use voxedit::math::{Axis, Face};
use voxedit::voxel::chunk::VoxChunk;
use voxedit::voxel::color::VoxColor;
use voxedit::voxel::crawl::{crawl_face, CrawlExtents, CrawlType};
use voxedit::voxel::edit::apply_delta;
use voxedit::voxel::mesh::MeshBuilder;

use glam::IVec3;

/// Two-tone solid sphere filling a cube chunk of `size`
fn create_test_sphere(size: u32, radius: f32) -> VoxChunk {
    let mut chunk = VoxChunk::cube(size);
    let Some(bounds) = chunk.bounds() else {
        return chunk;
    };
    for cell in bounds.cells() {
        if cell.as_vec3().length() <= radius {
            let color = if cell.y >= 0 { VoxColor(0xc0a080) } else { VoxColor(0x406030) };
            chunk.set_color_at(cell, color);
        }
    }
    chunk
}

fn bench_greedy_mesh_32(c: &mut Criterion) {
    let chunk = create_test_sphere(32, 14.0);
    let builder = MeshBuilder::new(1.0 / 32.0);

    c.bench_function("greedy_mesh_sphere_32", |b| {
        b.iter(|| builder.build(black_box(&chunk)));
    });
}

fn bench_greedy_mesh_64(c: &mut Criterion) {
    let chunk = create_test_sphere(64, 28.0);
    let builder = MeshBuilder::new(1.0 / 32.0);

    c.bench_function("greedy_mesh_sphere_64", |b| {
        b.iter(|| builder.build(black_box(&chunk)));
    });
}

fn bench_face_crawl(c: &mut Criterion) {
    let mut plane = VoxChunk::new([64, 1, 64]);
    if let Some(bounds) = plane.bounds() {
        for cell in bounds.cells() {
            plane.set_color_at(cell, VoxColor(0x808080));
        }
    }
    let face = Face::new(Axis::Y, true);

    c.bench_function("face_crawl_plane_64", |b| {
        b.iter(|| {
            crawl_face(
                black_box(&plane),
                IVec3::ZERO,
                face,
                CrawlType::Geo,
                CrawlExtents::Nsew,
            )
        });
    });
}

fn bench_apply_delta(c: &mut Criterion) {
    let base = create_test_sphere(32, 14.0);
    let mut delta = VoxChunk::cube(8);
    if let Some(bounds) = delta.bounds() {
        for cell in bounds.cells() {
            delta.set_color_at(cell, VoxColor(0xff0000));
        }
    }

    c.bench_function("apply_delta_8_into_32", |b| {
        b.iter(|| {
            let mut target = base.clone();
            apply_delta(&mut target, black_box(&delta), IVec3::new(4, 4, 4))
        });
    });
}

criterion_group!(
    benches,
    bench_greedy_mesh_32,
    bench_greedy_mesh_64,
    bench_face_crawl,
    bench_apply_delta,
);
criterion_main!(benches);
