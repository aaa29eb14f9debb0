//! Bounded per-(vox, frame) undo/redo history.
//!
//! Each stack keeps two fixed-capacity arrays: `backward[i]` undoes step `i`
//! and `forward[i]` redoes it. `position` counts the steps that can be undone.
//! Undo and redo are requested now and executed on the next tick, one at a
//! time per key.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::types::IVec3;
use crate::voxel::chunk::VoxChunk;
use crate::voxel::vox::VoxId;
use super::delta::{invert_delta, VoxOp};

/// Default number of undo steps kept per key
pub const MAX_UNDO_STEPS: usize = 32;

/// Identifies one undo history: a frame of a vox
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UndoKey {
    pub vox_id: VoxId,
    pub frame: usize,
}

impl UndoKey {
    pub fn new(vox_id: VoxId, frame: usize) -> Self {
        Self { vox_id, frame }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndoDirection {
    Undo,
    Redo,
}

#[derive(Clone, Debug)]
struct UndoEntry {
    delta: VoxChunk,
    offset: IVec3,
}

/// Fixed-capacity double stack of deltas
#[derive(Clone, Debug)]
pub struct UndoStack {
    backward: Vec<Option<UndoEntry>>,
    forward: Vec<Option<UndoEntry>>,
    position: usize,
}

impl UndoStack {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            backward: vec![None; capacity],
            forward: vec![None; capacity],
            position: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.backward.len()
    }

    /// Record a step given its delta and the inverse of that delta.
    ///
    /// Discards any redo branch. When full, the oldest step is dropped and
    /// the rest shift down.
    pub fn push(&mut self, delta: VoxChunk, inverse: VoxChunk, offset: IVec3) {
        if self.position == self.capacity() {
            self.backward.remove(0);
            self.backward.push(None);
            self.forward.remove(0);
            self.forward.push(None);
            self.position -= 1;
        }

        self.backward[self.position] = Some(UndoEntry { delta: inverse, offset });
        self.forward[self.position] = Some(UndoEntry { delta, offset });
        for i in self.position + 1..self.capacity() {
            self.forward[i] = None;
            self.backward[i] = None;
        }
        self.position += 1;
    }

    /// Steps that can currently be undone
    pub fn undo_depth(&self) -> usize {
        self.position
    }

    /// Steps that can currently be redone
    pub fn redo_depth(&self) -> usize {
        self.forward[self.position.min(self.capacity())..]
            .iter()
            .take_while(|e| e.is_some())
            .count()
    }

    fn peek(&self, direction: UndoDirection) -> Option<&UndoEntry> {
        match direction {
            UndoDirection::Undo => {
                if self.position == 0 {
                    None
                } else {
                    self.backward[self.position - 1].as_ref()
                }
            }
            UndoDirection::Redo => self.forward.get(self.position).and_then(Option::as_ref),
        }
    }

    fn step(&mut self, direction: UndoDirection) {
        match direction {
            UndoDirection::Undo => self.position -= 1,
            UndoDirection::Redo => self.position += 1,
        }
    }
}

/// An undo/redo claimed for execution; hand back through
/// [`UndoManager::complete`] or [`UndoManager::requeue`].
#[derive(Clone, Debug)]
pub struct PendingUndo {
    pub key: UndoKey,
    pub direction: UndoDirection,
    pub op: VoxOp,
}

/// Owns every undo stack plus the deferred request queue
pub struct UndoManager {
    capacity: usize,
    stacks: HashMap<UndoKey, UndoStack>,
    requests: VecDeque<(UndoKey, UndoDirection)>,
    in_flight: HashSet<UndoKey>,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::with_capacity(MAX_UNDO_STEPS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            stacks: HashMap::new(),
            requests: VecDeque::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Record a committed edit. The inverse is computed against `pre_edit`,
    /// the frame as it was before `delta` was applied.
    pub fn push_to_undo_stack(&mut self, key: UndoKey, delta: &VoxChunk, offset: IVec3, pre_edit: &VoxChunk) {
        let inverse = invert_delta(delta, offset, pre_edit);
        let capacity = self.capacity;
        let stack = self.stacks.entry(key).or_insert_with(|| UndoStack::new(capacity));
        stack.push(delta.clone(), inverse, offset);
    }

    /// Queue an undo or redo for the next tick
    pub fn request(&mut self, key: UndoKey, direction: UndoDirection) {
        self.requests.push_back((key, direction));
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    pub fn is_in_flight(&self, key: &UndoKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Claim the oldest queued request whose key has nothing in flight.
    ///
    /// Requests with nothing to undo/redo are dropped as no-ops.
    pub fn begin_next(&mut self) -> Option<PendingUndo> {
        let mut i = 0;
        while i < self.requests.len() {
            if self.in_flight.contains(&self.requests[i].0) {
                i += 1;
                continue;
            }

            let (key, direction) = self.requests.remove(i)?;
            let entry = self.stacks.get(&key).and_then(|s| s.peek(direction));
            let Some(entry) = entry else {
                log::debug!("Nothing to {:?} for {}/{}", direction, key.vox_id, key.frame);
                continue;
            };

            let op = VoxOp::new(key.frame, entry.delta.clone(), entry.offset);
            self.in_flight.insert(key.clone());
            return Some(PendingUndo { key, direction, op });
        }
        None
    }

    /// Finish a claimed request; the stack only moves if the op was applied.
    pub fn complete(&mut self, pending: PendingUndo, applied: bool) {
        self.in_flight.remove(&pending.key);
        if !applied {
            return;
        }
        if let Some(stack) = self.stacks.get_mut(&pending.key) {
            stack.step(pending.direction);
            log::info!(
                "{:?} on {}/{} (position {})",
                pending.direction,
                pending.key.vox_id,
                pending.key.frame,
                stack.position
            );
        }
    }

    /// Release a claimed request and put it back at the front of the queue
    pub fn requeue(&mut self, pending: PendingUndo) {
        self.in_flight.remove(&pending.key);
        self.requests.push_front((pending.key, pending.direction));
    }

    /// Drop the history of one key
    pub fn clear(&mut self, key: &UndoKey) {
        self.stacks.remove(key);
        self.requests.retain(|(k, _)| k != key);
    }

    pub fn undo_depth(&self, key: &UndoKey) -> usize {
        self.stacks.get(key).map_or(0, UndoStack::undo_depth)
    }

    pub fn redo_depth(&self, key: &UndoKey) -> usize {
        self.stacks.get(key).map_or(0, UndoStack::redo_depth)
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::color::VoxColor;
    use crate::voxel::edit::overlay::apply_delta;

    fn key() -> UndoKey {
        UndoKey::new(VoxId::from("vox-a"), 0)
    }

    /// Commit a one-cell stroke to `chunk` and record it
    fn stroke(manager: &mut UndoManager, chunk: &mut VoxChunk, cell: IVec3, color: u32) {
        let mut delta = VoxChunk::cube(1);
        delta.set_color_at(IVec3::ZERO, VoxColor(color));
        let pre_edit = chunk.clone();
        apply_delta(chunk, &delta, cell);
        manager.push_to_undo_stack(key(), &delta, cell, &pre_edit);
    }

    /// Execute every queued request against `chunk`
    fn run_requests(manager: &mut UndoManager, chunk: &mut VoxChunk) -> usize {
        let mut executed = 0;
        while let Some(pending) = manager.begin_next() {
            apply_delta(chunk, &pending.op.delta, pending.op.offset);
            manager.complete(pending, true);
            executed += 1;
        }
        executed
    }

    #[test]
    fn test_undo_redo_single_step() {
        let mut manager = UndoManager::new();
        let mut chunk = VoxChunk::cube(1);
        stroke(&mut manager, &mut chunk, IVec3::ZERO, 0xff0000);
        assert_eq!(manager.undo_depth(&key()), 1);

        manager.request(key(), UndoDirection::Undo);
        assert_eq!(run_requests(&mut manager, &mut chunk), 1);
        assert!(chunk.is_empty());
        assert_eq!(manager.redo_depth(&key()), 1);

        manager.request(key(), UndoDirection::Redo);
        run_requests(&mut manager, &mut chunk);
        assert_eq!(chunk.color_at(IVec3::ZERO), Some(VoxColor(0xff0000)));
        assert_eq!(manager.undo_depth(&key()), 1);
        assert_eq!(manager.redo_depth(&key()), 0);
    }

    #[test]
    fn test_undo_restores_overwritten_color() {
        let mut manager = UndoManager::new();
        let mut chunk = VoxChunk::cube(1);
        stroke(&mut manager, &mut chunk, IVec3::ZERO, 0x111111);
        stroke(&mut manager, &mut chunk, IVec3::ZERO, 0x222222);

        manager.request(key(), UndoDirection::Undo);
        run_requests(&mut manager, &mut chunk);
        assert_eq!(chunk.color_at(IVec3::ZERO), Some(VoxColor(0x111111)));
    }

    #[test]
    fn test_new_edit_discards_redo_branch() {
        let mut manager = UndoManager::new();
        let mut chunk = VoxChunk::cube(1);
        stroke(&mut manager, &mut chunk, IVec3::ZERO, 1);
        stroke(&mut manager, &mut chunk, IVec3::X, 2);

        manager.request(key(), UndoDirection::Undo);
        run_requests(&mut manager, &mut chunk);
        assert_eq!(manager.redo_depth(&key()), 1);

        stroke(&mut manager, &mut chunk, IVec3::Y, 3);
        assert_eq!(manager.redo_depth(&key()), 0);
        assert_eq!(manager.undo_depth(&key()), 2);

        manager.request(key(), UndoDirection::Redo);
        assert_eq!(run_requests(&mut manager, &mut chunk), 0);
    }

    #[test]
    fn test_bounded_history() {
        let mut manager = UndoManager::new();
        let mut chunk = VoxChunk::cube(1);
        let mut snapshots = Vec::new();
        for i in 0..40 {
            snapshots.push(chunk.clone());
            stroke(&mut manager, &mut chunk, IVec3::new(i % 7, i / 7, 0), 0x010101 * (i as u32 + 1));
        }
        assert_eq!(manager.undo_depth(&key()), MAX_UNDO_STEPS);

        for _ in 0..MAX_UNDO_STEPS {
            manager.request(key(), UndoDirection::Undo);
        }
        assert_eq!(run_requests(&mut manager, &mut chunk), MAX_UNDO_STEPS);
        assert_eq!(chunk, snapshots[40 - MAX_UNDO_STEPS]);

        // Beyond the bound nothing happens
        manager.request(key(), UndoDirection::Undo);
        assert_eq!(run_requests(&mut manager, &mut chunk), 0);
        assert_eq!(chunk, snapshots[40 - MAX_UNDO_STEPS]);
        assert_eq!(manager.redo_depth(&key()), MAX_UNDO_STEPS);
    }

    #[test]
    fn test_in_flight_serializes_same_key() {
        let mut manager = UndoManager::new();
        let mut chunk = VoxChunk::cube(1);
        stroke(&mut manager, &mut chunk, IVec3::ZERO, 1);
        stroke(&mut manager, &mut chunk, IVec3::X, 2);

        let other = UndoKey::new(VoxId::from("vox-b"), 0);
        let mut other_chunk = VoxChunk::cube(1);
        let mut delta = VoxChunk::cube(1);
        delta.set_color_at(IVec3::ZERO, VoxColor(9));
        manager.push_to_undo_stack(other.clone(), &delta, IVec3::ZERO, &other_chunk);
        apply_delta(&mut other_chunk, &delta, IVec3::ZERO);

        manager.request(key(), UndoDirection::Undo);
        manager.request(key(), UndoDirection::Undo);
        manager.request(other.clone(), UndoDirection::Undo);

        let first = manager.begin_next().unwrap();
        assert_eq!(first.key, key());
        assert!(manager.is_in_flight(&key()));

        // Second request on the same key waits; the other key proceeds
        let second = manager.begin_next().unwrap();
        assert_eq!(second.key, other);
        assert!(manager.begin_next().is_none());

        manager.complete(first, true);
        manager.complete(second, true);
        let third = manager.begin_next().unwrap();
        assert_eq!(third.key, key());
        manager.complete(third, true);
        assert_eq!(manager.undo_depth(&key()), 0);
        assert_eq!(manager.undo_depth(&other), 0);
    }

    #[test]
    fn test_requeue_keeps_position() {
        let mut manager = UndoManager::new();
        let mut chunk = VoxChunk::cube(1);
        stroke(&mut manager, &mut chunk, IVec3::ZERO, 1);

        manager.request(key(), UndoDirection::Undo);
        let pending = manager.begin_next().unwrap();
        manager.requeue(pending);
        assert_eq!(manager.undo_depth(&key()), 1);
        assert!(manager.has_requests());
        assert!(!manager.is_in_flight(&key()));

        assert_eq!(run_requests(&mut manager, &mut chunk), 1);
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_undo_on_empty_stack_is_noop() {
        let mut manager = UndoManager::new();
        manager.request(key(), UndoDirection::Undo);
        manager.request(key(), UndoDirection::Redo);
        assert!(manager.begin_next().is_none());
        assert!(!manager.has_requests());
    }

    #[test]
    fn test_clear() {
        let mut manager = UndoManager::with_capacity(4);
        let mut chunk = VoxChunk::cube(1);
        stroke(&mut manager, &mut chunk, IVec3::ZERO, 1);
        manager.request(key(), UndoDirection::Undo);
        manager.clear(&key());
        assert_eq!(manager.undo_depth(&key()), 0);
        assert!(!manager.has_requests());
    }
}
