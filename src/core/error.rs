//! Error types for the voxel editor

use thiserror::Error;

use crate::voxel::VoxId;

/// Main error type for the editor
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),

    #[error("Frame {frame} out of range (max {max})")]
    FrameOutOfRange { frame: usize, max: usize },

    #[error("Sync for vox {0} is not ready")]
    SyncNotReady(VoxId),

    #[error("Sync for vox {vox_id} failed: {reason}")]
    SyncFailed { vox_id: VoxId, reason: String },
}
