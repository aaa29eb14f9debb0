//! Concurrent editing of shared vox documents

pub mod vox_sync;
pub mod registry;

pub use vox_sync::{SyncReadiness, SyncState, VoxSync, EXPIRATION_TIME_MS};
pub use registry::SyncRegistry;
