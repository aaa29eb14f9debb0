//! Per-vox synchronized document.
//!
//! Local edits apply immediately and are queued as wire ops for the
//! transport; remote ops go through the same overlay merge. Submitting is
//! only allowed once the transport has marked the document ready.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::core::error::Error;
use crate::core::types::{IVec3, Result};
use crate::voxel::chunk::VoxChunk;
use crate::voxel::edit::{VoxOp, WireOp};
use crate::voxel::vox::{Vox, VoxId};

/// Idle time after the last local write before a sync may be torn down
pub const EXPIRATION_TIME_MS: u64 = 30_000;

/// Connection state of a synchronized document
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncState {
    Connecting,
    Ready,
    Failed(String),
}

/// Handle the transport uses to publish document readiness
#[derive(Clone, Debug)]
pub struct SyncReadiness {
    tx: Arc<watch::Sender<SyncState>>,
}

impl SyncReadiness {
    pub fn mark_ready(&self) {
        self.tx.send_replace(SyncState::Ready);
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.tx.send_replace(SyncState::Failed(reason.into()));
    }

    /// Back to connecting, e.g. after a dropped connection
    pub fn reconnecting(&self) {
        self.tx.send_replace(SyncState::Connecting);
    }
}

pub struct VoxSync {
    vox_id: VoxId,
    doc: Vox,
    state: watch::Receiver<SyncState>,
    readiness: SyncReadiness,
    outgoing: Vec<WireOp>,
    updated_frames: Vec<usize>,
    last_write: Instant,
    expired: bool,
    expiration: Duration,
}

impl VoxSync {
    /// Empty document in the connecting state
    pub fn new(vox_id: VoxId) -> Self {
        Self::with_doc(vox_id, Vox::new(), Duration::from_millis(EXPIRATION_TIME_MS))
    }

    pub fn with_doc(vox_id: VoxId, doc: Vox, expiration: Duration) -> Self {
        let (tx, state) = watch::channel(SyncState::Connecting);
        log::info!("Opening sync for vox {}", vox_id);
        Self {
            vox_id,
            doc,
            state,
            readiness: SyncReadiness { tx: Arc::new(tx) },
            outgoing: Vec::new(),
            updated_frames: Vec::new(),
            last_write: Instant::now(),
            expired: false,
            expiration,
        }
    }

    pub fn vox_id(&self) -> &VoxId {
        &self.vox_id
    }

    pub fn doc(&self) -> &Vox {
        &self.doc
    }

    pub fn frame(&self, index: usize) -> Option<&VoxChunk> {
        self.doc.frame(index)
    }

    /// Readiness handle for the transport
    pub fn readiness(&self) -> SyncReadiness {
        self.readiness.clone()
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.state.borrow() == SyncState::Ready
    }

    /// Wait until the document is ready; a failure is returned as an error
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| *s != SyncState::Connecting)
            .await
            .map_err(|_| Error::SyncFailed {
                vox_id: self.vox_id.clone(),
                reason: "readiness channel closed".to_string(),
            })?
            .clone();

        match state {
            SyncState::Failed(reason) => Err(Error::SyncFailed {
                vox_id: self.vox_id.clone(),
                reason,
            }),
            _ => Ok(()),
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            SyncState::Ready => Ok(()),
            SyncState::Connecting => Err(Error::SyncNotReady(self.vox_id.clone())),
            SyncState::Failed(reason) => Err(Error::SyncFailed {
                vox_id: self.vox_id.clone(),
                reason,
            }),
        }
    }

    /// Submit a local edit: merge it into the document and queue it for the
    /// transport. Returns the number of cells changed.
    pub fn apply_chunk(&mut self, delta: &VoxChunk, frame: usize, offset: IVec3) -> Result<usize> {
        self.ensure_ready()?;

        let op = VoxOp::new(frame, delta.clone(), offset);
        let changed = op.apply_to(&mut self.doc)?;
        self.outgoing.push(op.to_wire());
        self.mark_updated(frame);
        self.last_write = Instant::now();
        self.expired = false;

        log::info!(
            "Applied op to {}/{}: {} cells changed at {:?}",
            self.vox_id,
            frame,
            changed,
            offset
        );
        Ok(changed)
    }

    /// Merge an op received from another client
    pub fn receive(&mut self, wire: &WireOp) -> Result<usize> {
        let op = VoxOp::from_wire(wire)?;
        let changed = op.apply_to(&mut self.doc)?;
        self.mark_updated(op.frame);
        log::debug!("Received op for {}/{}: {} cells changed", self.vox_id, op.frame, changed);
        Ok(changed)
    }

    fn mark_updated(&mut self, frame: usize) {
        if !self.updated_frames.contains(&frame) {
            self.updated_frames.push(frame);
        }
    }

    /// Drain ops awaiting delivery
    pub fn take_outgoing(&mut self) -> Vec<WireOp> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Drain frames changed since the last call, in first-change order
    pub fn take_updated_frames(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.updated_frames)
    }

    /// Mark expired if no local write happened within the expiration window
    pub fn try_expire(&mut self, now: Instant) -> bool {
        if !self.expired && now.saturating_duration_since(self.last_write) >= self.expiration {
            log::debug!("Sync for vox {} expired", self.vox_id);
            self.expired = true;
        }
        self.expired
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}
