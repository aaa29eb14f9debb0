//! Brush orchestration
//!
//! [`BuilderSystem`] is ticked once per frame with the current pointer state.
//! It tracks the hovered vox, runs at most one stroke at a time, previews the
//! pending delta through the host and, on release, commits it through the
//! vox's sync and records it for undo.
//!
//! States: `Idle -> Hover -> Brushing -> Commit -> Hover/Idle`. A commit that
//! cannot go through yet (sync still connecting or failed) stays in `Commit`
//! with its pending delta intact and is retried on the following ticks.

use std::collections::BTreeSet;

use crate::core::config::EditorConfig;
use crate::core::error::Error;
use crate::core::types::{IVec3, Result, Vec3};
use crate::math::{Face, Plane, Ray};
use crate::voxel::chunk::{VoxChunk, MAX_SIZE};
use crate::voxel::color::{VoxColor, REMOVE_VOXEL_COLOR};
use crate::voxel::crawl::crawl_face;
use crate::voxel::edit::{overlay_preview, UndoDirection, UndoKey, UndoManager};
use crate::voxel::mesh::{MeshBuilder, VoxMesh};
use crate::voxel::sync::{SyncRegistry, SyncState};
use crate::voxel::vox::VoxId;
use super::pending::{CellWrites, PendingChunk};
use super::settings::{BrushFilter, BrushMode, BrushSettings, BrushShape, BrushType, ColorFillMode};
use super::shape;

/// Services the editor needs from the surrounding application
pub trait VoxHost {
    /// Switch a vox from batched rendering to an individually editable mesh
    fn freeze(&mut self, vox_id: &VoxId);
    /// Return a vox to batched rendering
    fn unfreeze(&mut self, vox_id: &VoxId);
    /// Show or hide the committed geometry while a preview replaces it
    fn set_live_visible(&mut self, vox_id: &VoxId, visible: bool);
    fn show_preview(&mut self, vox_id: &VoxId, frame: usize, mesh: VoxMesh);
    fn clear_preview(&mut self, vox_id: &VoxId);
    fn can_edit(&self, vox_id: &VoxId) -> bool;
    /// Published voxes are read-only until copied
    fn is_published(&self, vox_id: &VoxId) -> bool;
}

/// A ray hit on a vox
#[derive(Clone, Debug, PartialEq)]
pub struct VoxHit {
    pub vox_id: VoxId,
    pub frame: usize,
    /// The occupied cell that was hit
    pub cell: IVec3,
    /// Normal of the hit face in cell space
    pub normal: IVec3,
    /// Empty cell in front of the hit face
    pub adjacent: IVec3,
    pub world_point: Vec3,
    pub world_normal: Vec3,
}

impl VoxHit {
    /// Hit on the center of `cell`'s face pointing along `normal`, in world
    /// units around the vox pivot for cells of edge `voxel_size`
    pub fn new(vox_id: VoxId, frame: usize, cell: IVec3, normal: IVec3, voxel_size: f32) -> Self {
        let world_point = (cell.as_vec3() + Vec3::splat(0.5) + normal.as_vec3() * 0.5) * voxel_size;
        Self {
            vox_id,
            frame,
            cell,
            normal,
            adjacent: cell + normal,
            world_point,
            world_normal: normal.as_vec3(),
        }
    }

    pub fn with_world(mut self, point: Vec3, normal: Vec3) -> Self {
        self.world_point = point;
        self.world_normal = normal;
        self
    }
}

/// What the pointer ray hit
#[derive(Clone, Debug, PartialEq)]
pub enum HitTarget {
    Vox(VoxHit),
    /// Non-voxel geometry; only useful for picking
    Geometry { vertex_color: VoxColor },
}

/// Pointer state for one tick
#[derive(Clone, Debug, Default)]
pub struct BrushInput {
    pub hit: Option<HitTarget>,
    pub ray: Option<Ray>,
    pub primary_down: bool,
    /// Held to temporarily switch to the pick brush
    pub pick_modifier: bool,
    /// Equipped color slot steps (e.g. wheel clicks)
    pub color_cycle: i32,
}

impl BrushInput {
    fn vox_hit(&self) -> Option<&VoxHit> {
        match &self.hit {
            Some(HitTarget::Vox(hit)) => Some(hit),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BuilderEvent {
    SettingsChanged,
    EnabledChanged(bool),
    PickedColor(VoxColor),
    /// A frame's committed content changed and needs re-meshing
    VoxUpdated { vox_id: VoxId, frame: usize },
    /// An edit on a denied or published vox was refused
    EditRefused { vox_id: VoxId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderState {
    Idle,
    Hover,
    Brushing,
    Commit,
}

/// State of the active stroke
struct Stroke {
    vox_id: VoxId,
    frame: usize,
    start: VoxHit,
    /// Cell the stroke started on (hit or adjacent, by mode)
    start_cell: IVec3,
    end_cell: IVec3,
    /// Crawled face region for face brushes
    face: Option<(Face, VoxColor, VoxChunk)>,
    sweep_plane: Option<Plane>,
    sweep: u32,
    /// Cells painted so far by the VOXEL brush
    painted: BTreeSet<[i32; 3]>,
    pending: Option<PendingChunk>,
}

/// The brush engine
pub struct BuilderSystem {
    settings: BrushSettings,
    voxel_size: f32,
    enabled: bool,
    state: BuilderState,
    hovered: Option<VoxId>,
    stroke: Option<Stroke>,
    /// Brush type to restore when the pick modifier is released
    pick_restore: Option<BrushType>,
    undo: UndoManager,
    mesher: MeshBuilder,
    events: Vec<BuilderEvent>,
}

impl BuilderSystem {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            settings: config.brush.clone(),
            voxel_size: config.voxel_size,
            enabled: true,
            state: BuilderState::Idle,
            hovered: None,
            stroke: None,
            pick_restore: None,
            undo: UndoManager::with_capacity(config.max_undo_steps),
            mesher: MeshBuilder::new(config.voxel_size),
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &BrushSettings {
        &self.settings
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn hovered(&self) -> Option<&VoxId> {
        self.hovered.as_ref()
    }

    /// Pending delta of the active stroke
    pub fn pending(&self) -> Option<&PendingChunk> {
        self.stroke.as_ref().and_then(|s| s.pending.as_ref())
    }

    /// Extrusion depth of the active face stroke
    pub fn face_sweep(&self) -> Option<u32> {
        self.stroke.as_ref().map(|s| s.sweep)
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    /// Drain notifications
    pub fn take_events(&mut self) -> Vec<BuilderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Change settings through a closure; emits one `SettingsChanged`
    pub fn update_settings(&mut self, f: impl FnOnce(&mut BrushSettings)) {
        let before = self.settings.clone();
        f(&mut self.settings);
        if self.settings != before {
            self.events.push(BuilderEvent::SettingsChanged);
        }
    }

    pub fn set_brush_type(&mut self, brush_type: BrushType) {
        self.pick_restore = None;
        self.update_settings(|s| s.brush_type = brush_type);
    }

    pub fn set_mode(&mut self, mode: BrushMode) {
        self.update_settings(|s| s.mode = mode);
    }

    pub fn set_shape(&mut self, shape: BrushShape) {
        self.update_settings(|s| s.shape = shape);
    }

    pub fn set_filter(&mut self, filter: BrushFilter) {
        self.update_settings(|s| s.filter = filter);
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.update_settings(|s| s.brush_size = size.max(1));
    }

    pub fn set_mirror(&mut self, x: bool, y: bool, z: bool) {
        self.update_settings(|s| {
            s.mirror_x = x;
            s.mirror_y = y;
            s.mirror_z = z;
        });
    }

    pub fn set_equipped_color(&mut self, color: VoxColor) {
        self.update_settings(|s| s.set_equipped_color(color));
    }

    /// Enable or disable editing. Disabling drops any active stroke.
    pub fn set_enabled(&mut self, enabled: bool, host: &mut impl VoxHost) {
        if self.enabled == enabled {
            return;
        }
        if !enabled {
            self.cancel_stroke(host);
            if let Some(old) = self.hovered.take() {
                host.unfreeze(&old);
            }
            self.state = BuilderState::Idle;
        }
        self.enabled = enabled;
        self.events.push(BuilderEvent::EnabledChanged(enabled));
        log::info!("Builder {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Queue an undo for the next tick
    pub fn undo(&mut self, vox_id: &VoxId, frame: usize) {
        self.undo.request(UndoKey::new(vox_id.clone(), frame), UndoDirection::Undo);
    }

    /// Queue a redo for the next tick
    pub fn redo(&mut self, vox_id: &VoxId, frame: usize) {
        self.undo.request(UndoKey::new(vox_id.clone(), frame), UndoDirection::Redo);
    }

    /// Forget the history of one frame
    pub fn clear_undo(&mut self, vox_id: &VoxId, frame: usize) {
        self.undo.clear(&UndoKey::new(vox_id.clone(), frame));
    }

    /// Abandon the active stroke without committing
    pub fn cancel_stroke(&mut self, host: &mut impl VoxHost) {
        if let Some(stroke) = self.stroke.take() {
            log::debug!("Cancelled stroke on {}", stroke.vox_id);
            host.clear_preview(&stroke.vox_id);
            host.set_live_visible(&stroke.vox_id, true);
        }
        self.state = if self.hovered.is_some() {
            BuilderState::Hover
        } else {
            BuilderState::Idle
        };
    }

    /// Advance one frame
    pub fn tick(&mut self, input: &BrushInput, host: &mut impl VoxHost, syncs: &mut SyncRegistry) -> Result<()> {
        self.process_undo(syncs);

        if self.state == BuilderState::Commit {
            return self.commit(host, syncs);
        }

        if !self.enabled {
            return Ok(());
        }

        self.arbitrate_pick(input.pick_modifier);
        if input.color_cycle != 0 {
            self.update_settings(|s| s.cycle_slot(input.color_cycle));
        }

        match self.state {
            BuilderState::Idle | BuilderState::Hover => {
                self.update_target(input.vox_hit().map(|h| &h.vox_id), host);
                if input.primary_down {
                    self.press(input, host, syncs);
                }
            }
            BuilderState::Brushing => {
                if input.primary_down {
                    self.drag(input, syncs);
                    self.refresh_preview(host, syncs);
                } else {
                    self.state = BuilderState::Commit;
                    return self.commit(host, syncs);
                }
            }
            BuilderState::Commit => {}
        }
        Ok(())
    }

    fn arbitrate_pick(&mut self, held: bool) {
        if held
            && self.state != BuilderState::Brushing
            && self.pick_restore.is_none()
            && self.settings.brush_type != BrushType::Pick
        {
            let previous = self.settings.brush_type;
            self.update_settings(|s| s.brush_type = BrushType::Pick);
            self.pick_restore = Some(previous);
        } else if !held && self.state != BuilderState::Brushing {
            if let Some(previous) = self.pick_restore.take() {
                self.update_settings(|s| s.brush_type = previous);
            }
        }
    }

    fn update_target(&mut self, target: Option<&VoxId>, host: &mut impl VoxHost) {
        if self.hovered.as_ref() == target {
            return;
        }
        if let Some(old) = self.hovered.take() {
            host.clear_preview(&old);
            host.unfreeze(&old);
        }
        if let Some(new) = target {
            host.freeze(new);
            log::debug!("Hovering vox {}", new);
        }
        self.hovered = target.cloned();
        self.state = if self.hovered.is_some() {
            BuilderState::Hover
        } else {
            BuilderState::Idle
        };
    }

    fn press(&mut self, input: &BrushInput, host: &mut impl VoxHost, syncs: &mut SyncRegistry) {
        if self.settings.brush_type == BrushType::Pick {
            self.pick(input, syncs);
            return;
        }

        let Some(hit) = input.vox_hit() else {
            return;
        };
        if !host.can_edit(&hit.vox_id) || host.is_published(&hit.vox_id) {
            log::warn!("Edit refused on vox {}", hit.vox_id);
            self.events.push(BuilderEvent::EditRefused { vox_id: hit.vox_id.clone() });
            return;
        }

        let start_cell = if self.settings.targets_hit_cell() { hit.cell } else { hit.adjacent };
        let mut stroke = Stroke {
            vox_id: hit.vox_id.clone(),
            frame: hit.frame,
            start: hit.clone(),
            start_cell,
            end_cell: start_cell,
            face: None,
            sweep_plane: None,
            sweep: 1,
            painted: BTreeSet::new(),
            pending: None,
        };

        if matches!(self.settings.brush_type, BrushType::Face | BrushType::Fill) {
            let Some(face) = Face::from_normal(hit.normal) else {
                log::warn!("Face brush needs an axis-aligned normal, got {:?}", hit.normal);
                return;
            };
            let committed = committed_frame(syncs, &hit.vox_id, hit.frame);
            let crawl = crawl_face(
                &committed,
                hit.cell,
                face,
                self.settings.crawl_type,
                self.settings.crawl_extents,
            );
            let Some((seed_color, mask)) = crawl else {
                log::debug!("Face brush pressed on empty cell {:?}", hit.cell);
                return;
            };
            stroke.face = Some((face, seed_color, mask));
            stroke.sweep_plane = input.ray.and_then(|ray| sweep_plane(&ray, hit));
        }

        host.set_live_visible(&stroke.vox_id, false);
        log::debug!(
            "Stroke {:?}/{:?} started on {}/{} at {:?}",
            self.settings.brush_type,
            self.settings.mode,
            stroke.vox_id,
            stroke.frame,
            start_cell
        );
        self.stroke = Some(stroke);
        self.state = BuilderState::Brushing;
        self.drag(input, syncs);
        self.refresh_preview(host, syncs);
    }

    fn pick(&mut self, input: &BrushInput, syncs: &SyncRegistry) {
        let color = match &input.hit {
            Some(HitTarget::Vox(hit)) => syncs
                .get(&hit.vox_id)
                .and_then(|sync| sync.frame(hit.frame))
                .and_then(|frame| frame.color_at(hit.cell)),
            Some(HitTarget::Geometry { vertex_color }) => Some(*vertex_color),
            None => None,
        };
        if let Some(color) = color {
            self.set_equipped_color(color);
            self.events.push(BuilderEvent::PickedColor(color));
            log::info!("Picked color {:#08x}", color.0);
        }
    }

    /// Update the stroke end from the current input and rebuild the pending delta
    fn drag(&mut self, input: &BrushInput, syncs: &SyncRegistry) {
        let Some(mut stroke) = self.stroke.take() else {
            return;
        };

        if let Some(hit) = input.vox_hit().filter(|h| h.vox_id == stroke.vox_id) {
            stroke.end_cell = if self.settings.targets_hit_cell() { hit.cell } else { hit.adjacent };
        }
        if let (Some(plane), Some(ray)) = (stroke.sweep_plane, input.ray) {
            stroke.sweep = self.sweep_from_drag(&stroke.start, &plane, &ray);
        }

        let committed = committed_frame(syncs, &stroke.vox_id, stroke.frame);
        let vox_total = syncs
            .get(&stroke.vox_id)
            .map_or(0, |sync| sync.doc().total_non_empty_voxels());
        stroke.pending = self.build_pending(&mut stroke, &committed, vox_total);
        self.stroke = Some(stroke);
    }

    /// Extrusion depth from where the ray crosses the sweep plane
    fn sweep_from_drag(&self, start: &VoxHit, plane: &Plane, ray: &Ray) -> u32 {
        let Some(t) = ray.intersect_plane(plane) else {
            return 1;
        };
        let distance = (ray.at(t) - start.world_point).dot(start.world_normal);
        let outward = match self.settings.mode {
            BrushMode::Add => distance > 0.0,
            BrushMode::Remove => distance < 0.0,
        };
        if !outward {
            return 1;
        }
        ((distance.abs() / self.voxel_size).floor() as u32).clamp(1, MAX_SIZE)
    }

    /// `vox_total` counts committed voxels across every frame of the vox
    fn build_pending(&self, stroke: &mut Stroke, committed: &VoxChunk, vox_total: usize) -> Option<PendingChunk> {
        let settings = &self.settings;
        let signs = settings.mirror_signs();

        let cells = match settings.brush_type {
            BrushType::Voxel => {
                let stamp = shape::voxel_cells(stroke.end_cell, settings.brush_size, settings.shape);
                for cell in shape::mirror_cells(&stamp, &signs) {
                    stroke.painted.insert(cell.to_array());
                }
                stroke.painted.iter().map(|&c| IVec3::from_array(c)).collect()
            }
            BrushType::Box => {
                let cells = shape::box_cells(stroke.start_cell, stroke.end_cell);
                shape::mirror_cells(&cells, &signs)
            }
            BrushType::Center => {
                let cells = shape::center_cells(stroke.start_cell, stroke.end_cell, settings.shape);
                shape::mirror_cells(&cells, &signs)
            }
            BrushType::Face => {
                let (face, _, mask) = stroke.face.as_ref()?;
                let cells = shape::face_cells(mask, *face, stroke.start.cell, stroke.sweep, settings.mode);
                shape::mirror_cells(&cells, &signs)
            }
            BrushType::Fill => {
                let (face, _, mask) = stroke.face.as_ref()?;
                let cells = shape::fill_cells(mask, *face, stroke.start.cell);
                shape::mirror_cells(&cells, &signs)
            }
            BrushType::Pick => return None,
        };

        let color = match settings.mode {
            BrushMode::Remove => REMOVE_VOXEL_COLOR,
            BrushMode::Add => match (&stroke.face, settings.color_fill) {
                (Some((_, seed, _)), ColorFillMode::Existing) => *seed,
                _ => settings.equipped_color(),
            },
        };

        let mut writes = CellWrites::new();
        writes.extend(cells, color);
        writes.apply_filter(committed, settings.filter, settings.mode);

        if !writes.keeps_a_voxel(committed, vox_total) {
            log::warn!("Stroke would remove the last voxel of {}, ignored", stroke.vox_id);
            return None;
        }
        writes.to_pending()
    }

    fn refresh_preview(&mut self, host: &mut impl VoxHost, syncs: &SyncRegistry) {
        let Some(stroke) = &self.stroke else {
            return;
        };
        let committed = committed_frame(syncs, &stroke.vox_id, stroke.frame);
        let preview = match &stroke.pending {
            Some(pending) => overlay_preview(&committed, &pending.delta, pending.offset),
            None => committed,
        };
        host.show_preview(&stroke.vox_id, stroke.frame, self.mesher.build(&preview));
    }

    fn finish_stroke(&mut self, host: &mut impl VoxHost) {
        if let Some(stroke) = self.stroke.take() {
            host.clear_preview(&stroke.vox_id);
            host.set_live_visible(&stroke.vox_id, true);
        }
        self.state = if self.hovered.is_some() {
            BuilderState::Hover
        } else {
            BuilderState::Idle
        };
    }

    /// Push the pending delta through the sync. Leaves the stroke in place
    /// while the sync is not ready.
    fn commit(&mut self, host: &mut impl VoxHost, syncs: &mut SyncRegistry) -> Result<()> {
        let Some(stroke) = &self.stroke else {
            self.state = BuilderState::Idle;
            return Ok(());
        };
        let Some(pending) = stroke.pending.clone() else {
            self.finish_stroke(host);
            return Ok(());
        };
        let (vox_id, frame) = (stroke.vox_id.clone(), stroke.frame);

        let sync = syncs.get_or_create(&vox_id);
        match sync.state() {
            SyncState::Connecting => {
                log::debug!("Sync for {} not ready, holding stroke", vox_id);
                return Ok(());
            }
            SyncState::Failed(reason) => {
                log::warn!("Sync for {} failed, stroke kept for retry: {}", vox_id, reason);
                return Err(Error::SyncFailed { vox_id, reason });
            }
            SyncState::Ready => {}
        }

        let pre_edit = sync.frame(frame).cloned().unwrap_or_default();
        if let Err(e) = sync.apply_chunk(&pending.delta, frame, pending.offset) {
            log::warn!("Commit on {}/{} failed: {}", vox_id, frame, e);
            self.finish_stroke(host);
            return Err(e);
        }

        self.undo.push_to_undo_stack(
            UndoKey::new(vox_id.clone(), frame),
            &pending.delta,
            pending.offset,
            &pre_edit,
        );
        log::info!("Committed {} cells to {}/{}", pending.cell_count(), vox_id, frame);
        self.events.push(BuilderEvent::VoxUpdated { vox_id, frame });
        self.finish_stroke(host);
        Ok(())
    }

    /// Run queued undo/redo requests whose sync is ready.
    ///
    /// Requests that cannot run yet keep their key claimed until the queue
    /// has been scanned, so later requests on the same key wait behind them
    /// while other keys go ahead.
    fn process_undo(&mut self, syncs: &mut SyncRegistry) {
        let mut deferred = Vec::new();
        while let Some(pending) = self.undo.begin_next() {
            let busy = self
                .stroke
                .as_ref()
                .is_some_and(|s| s.vox_id == pending.key.vox_id && s.frame == pending.key.frame);
            if busy {
                deferred.push(pending);
                continue;
            }

            let sync = syncs.get_or_create(&pending.key.vox_id);
            match sync.state() {
                SyncState::Ready => {}
                SyncState::Connecting => {
                    deferred.push(pending);
                    continue;
                }
                SyncState::Failed(reason) => {
                    log::warn!(
                        "{:?} on {}/{} held, sync failed: {}",
                        pending.direction,
                        pending.key.vox_id,
                        pending.key.frame,
                        reason
                    );
                    deferred.push(pending);
                    continue;
                }
            }

            let op = &pending.op;
            let applied = match sync.apply_chunk(&op.delta, op.frame, op.offset) {
                Ok(_) => true,
                Err(e) => {
                    log::warn!("{:?} on {}/{} failed: {}", pending.direction, pending.key.vox_id, op.frame, e);
                    false
                }
            };
            if applied {
                self.events.push(BuilderEvent::VoxUpdated {
                    vox_id: pending.key.vox_id.clone(),
                    frame: pending.key.frame,
                });
            }
            self.undo.complete(pending, applied);
        }

        // Requeue pushes to the front; reverse keeps the original order
        for pending in deferred.into_iter().rev() {
            self.undo.requeue(pending);
        }
    }
}

/// Committed content of a frame, or an empty chunk if it does not exist yet
fn committed_frame(syncs: &SyncRegistry, vox_id: &VoxId, frame: usize) -> VoxChunk {
    syncs
        .get(vox_id)
        .and_then(|sync| sync.frame(frame))
        .cloned()
        .unwrap_or_default()
}

/// Plane containing the face normal and facing the viewer as much as possible
fn sweep_plane(ray: &Ray, hit: &VoxHit) -> Option<Plane> {
    let n = hit.world_normal.normalize_or_zero();
    let facing = ray.direction - n * ray.direction.dot(n);
    let normal = facing.try_normalize()?;
    Some(Plane::from_point_normal(hit.world_point, normal))
}
