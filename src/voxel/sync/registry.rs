//! Owner of every open [`VoxSync`]

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::config::EditorConfig;
use crate::voxel::vox::{Vox, VoxId, DEFAULT_FRAME_SIZE};
use super::vox_sync::{VoxSync, EXPIRATION_TIME_MS};

/// One sync per vox id, created on first use
pub struct SyncRegistry {
    syncs: HashMap<VoxId, VoxSync>,
    frame_size: u32,
    expiration: Duration,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self {
            syncs: HashMap::new(),
            frame_size: DEFAULT_FRAME_SIZE,
            expiration: Duration::from_millis(EXPIRATION_TIME_MS),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            syncs: HashMap::new(),
            frame_size: config.default_frame_size,
            expiration: Duration::from_millis(config.sync_expiration_ms),
        }
    }

    pub fn get_or_create(&mut self, vox_id: &VoxId) -> &mut VoxSync {
        let (frame_size, expiration) = (self.frame_size, self.expiration);
        self.syncs.entry(vox_id.clone()).or_insert_with(|| {
            VoxSync::with_doc(vox_id.clone(), Vox::with_frame_size(frame_size), expiration)
        })
    }

    pub fn get(&self, vox_id: &VoxId) -> Option<&VoxSync> {
        self.syncs.get(vox_id)
    }

    pub fn get_mut(&mut self, vox_id: &VoxId) -> Option<&mut VoxSync> {
        self.syncs.get_mut(vox_id)
    }

    /// Register an already constructed sync, replacing any previous one
    pub fn insert(&mut self, sync: VoxSync) {
        self.syncs.insert(sync.vox_id().clone(), sync);
    }

    pub fn remove(&mut self, vox_id: &VoxId) -> Option<VoxSync> {
        self.syncs.remove(vox_id)
    }

    pub fn len(&self) -> usize {
        self.syncs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syncs.is_empty()
    }

    /// Tear down syncs that are expired, have no remote collaborators and
    /// nothing left to send. Returns the removed ids, sorted.
    pub fn expire_idle(&mut self, now: Instant, has_collaborators: impl Fn(&VoxId) -> bool) -> Vec<VoxId> {
        let mut removed: Vec<VoxId> = self
            .syncs
            .iter_mut()
            .filter_map(|(id, sync)| {
                let idle = sync.try_expire(now) && !sync.has_outgoing() && !has_collaborators(id);
                idle.then(|| id.clone())
            })
            .collect();
        removed.sort();

        for id in &removed {
            self.syncs.remove(id);
            log::info!("Closed idle sync for vox {}", id);
        }
        removed
    }
}

impl Default for SyncRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;
    use crate::voxel::chunk::VoxChunk;
    use crate::voxel::color::VoxColor;

    fn later() -> Instant {
        Instant::now() + Duration::from_millis(EXPIRATION_TIME_MS + 1_000)
    }

    #[test]
    fn test_get_or_create_reuses() {
        let mut registry = SyncRegistry::new();
        let id = VoxId::from("chair");
        registry.get_or_create(&id).readiness().mark_ready();
        assert!(registry.get_or_create(&id).is_ready());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_frame_size_from_config() {
        let config = EditorConfig {
            default_frame_size: 4,
            ..EditorConfig::default()
        };
        let mut registry = SyncRegistry::from_config(&config);
        let id = VoxId::from("chair");
        let sync = registry.get_or_create(&id);
        sync.readiness().mark_ready();
        sync.apply_chunk(&VoxChunk::cube(1), 0, IVec3::ZERO).unwrap();
        assert_eq!(sync.frame(0).unwrap().size(), [4, 4, 4]);
    }

    #[test]
    fn test_expire_idle() {
        let mut registry = SyncRegistry::new();
        let (a, b, c) = (VoxId::from("a"), VoxId::from("b"), VoxId::from("c"));
        registry.get_or_create(&a);
        registry.get_or_create(&b);

        // c has an undelivered op
        let sync = registry.get_or_create(&c);
        sync.readiness().mark_ready();
        let mut delta = VoxChunk::cube(1);
        delta.set_color_at(IVec3::ZERO, VoxColor(1));
        sync.apply_chunk(&delta, 0, IVec3::ZERO).unwrap();

        // Nothing is idle yet
        assert!(registry.expire_idle(Instant::now(), |_| false).is_empty());

        // b still has a collaborator
        let removed = registry.expire_idle(later(), |id| id.0 == "b");
        assert_eq!(removed, vec![a.clone()]);
        assert!(registry.get(&b).is_some());
        assert!(registry.get(&c).is_some());

        registry.get_mut(&c).unwrap().take_outgoing();
        let removed = registry.expire_idle(later(), |_| false);
        assert_eq!(removed, vec![b, c]);
        assert!(registry.is_empty());
    }
}
