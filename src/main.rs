//! voxedit - headless editing session
//!
//! Usage: `voxedit [config.json] [snapshot.vox]`
//!
//! Drives a short scripted session through the brush engine, logs the
//! resulting mesh stats and optionally writes the vox snapshot to disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use voxedit::core::config::EditorConfig;
use voxedit::core::logging;
use voxedit::core::types::{IVec3, Result};
use voxedit::voxel::brush::{
    BrushInput, BrushType, BuilderEvent, BuilderSystem, HitTarget, VoxHit, VoxHost,
};
use voxedit::voxel::mesh::{MeshBuilder, VoxMesh};
use voxedit::voxel::sync::SyncRegistry;
use voxedit::voxel::vox::VoxId;

/// Host that only records what a renderer would be asked to do
#[derive(Default)]
struct LogHost {
    frozen: HashSet<VoxId>,
}

impl VoxHost for LogHost {
    fn freeze(&mut self, vox_id: &VoxId) {
        if self.frozen.insert(vox_id.clone()) {
            log::debug!("Froze {}", vox_id);
        }
    }

    fn unfreeze(&mut self, vox_id: &VoxId) {
        if self.frozen.remove(vox_id) {
            log::debug!("Unfroze {}", vox_id);
        }
    }

    fn set_live_visible(&mut self, vox_id: &VoxId, visible: bool) {
        log::debug!("{} live mesh visible: {}", vox_id, visible);
    }

    fn show_preview(&mut self, vox_id: &VoxId, frame: usize, mesh: VoxMesh) {
        log::debug!("Preview {}[{}]: {} quads", vox_id, frame, mesh.quad_count());
    }

    fn clear_preview(&mut self, _vox_id: &VoxId) {}

    fn can_edit(&self, _vox_id: &VoxId) -> bool {
        true
    }

    fn is_published(&self, _vox_id: &VoxId) -> bool {
        false
    }
}

fn load_config(path: Option<&Path>) -> EditorConfig {
    match path {
        Some(path) => match EditorConfig::load_sync(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to load config {}: {}, using defaults", path.display(), e);
                EditorConfig::default()
            }
        },
        None => EditorConfig::default(),
    }
}

fn stroke(
    builder: &mut BuilderSystem,
    host: &mut LogHost,
    syncs: &mut SyncRegistry,
    hits: &[VoxHit],
) -> Result<()> {
    for hit in hits {
        let input = BrushInput {
            hit: Some(HitTarget::Vox(hit.clone())),
            primary_down: true,
            ..BrushInput::default()
        };
        builder.tick(&input, host, syncs)?;
    }
    builder.tick(&BrushInput::default(), host, syncs)
}

fn run(config_path: Option<PathBuf>, snapshot_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref());
    let vox_id = VoxId::from("demo");

    let mut syncs = SyncRegistry::from_config(&config);
    syncs.get_or_create(&vox_id).readiness().mark_ready();

    let mut builder = BuilderSystem::new(&config);
    let mut host = LogHost::default();

    // Column of single voxels on the ground below the pivot
    builder.set_brush_type(BrushType::Voxel);
    let column: Vec<VoxHit> = (0..4)
        .map(|y| VoxHit::new(vox_id.clone(), 0, IVec3::new(0, y - 1, 0), IVec3::Y, config.voxel_size))
        .collect();
    stroke(&mut builder, &mut host, &mut syncs, &column)?;

    // Base slab spanning two corners
    builder.set_brush_type(BrushType::Box);
    let slab = [
        VoxHit::new(vox_id.clone(), 0, IVec3::new(-3, -2, -3), IVec3::Y, config.voxel_size),
        VoxHit::new(vox_id.clone(), 0, IVec3::new(3, -2, 3), IVec3::Y, config.voxel_size),
    ];
    stroke(&mut builder, &mut host, &mut syncs, &slab)?;

    for event in builder.take_events() {
        if let BuilderEvent::VoxUpdated { vox_id, frame } = event {
            log::info!("Updated {}[{}]", vox_id, frame);
        }
    }

    let Some(sync) = syncs.get_mut(&vox_id) else {
        return Ok(());
    };
    log::info!("{} ops ready to send", sync.take_outgoing().len());

    let doc = sync.doc();
    let meshes = MeshBuilder::new(config.voxel_size).build_frames(doc);
    for (frame, mesh) in meshes.iter().enumerate() {
        log::info!(
            "Frame {}: {} voxels, {} quads, {} triangles",
            frame,
            doc.frame(frame).map_or(0, |f| f.total_non_empty_voxels()),
            mesh.quad_count(),
            mesh.triangle_count()
        );
    }

    if let Some(path) = snapshot_path {
        doc.save_sync(&path)?;
        log::info!("Saved snapshot to {}", path.display());
    }

    Ok(())
}

fn main() {
    logging::init();
    log::info!("voxedit starting...");

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let config_path = args.next();
    let snapshot_path = args.next();

    if let Err(e) = run(config_path, snapshot_path) {
        log::error!("Session failed: {}", e);
        std::process::exit(1);
    }
}
