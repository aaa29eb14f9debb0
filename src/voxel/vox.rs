//! Multi-frame voxel object

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::voxel::chunk::{SerializedChunk, VoxChunk};

/// Maximum number of animation frames in a vox
pub const MAX_FRAMES: usize = 32;

/// Edge length of a lazily created frame
pub const DEFAULT_FRAME_SIZE: u32 = 1;

/// Identifier of a persisted voxel object
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoxId(pub String);

impl fmt::Display for VoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VoxId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// On-disk snapshot of every frame
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VoxSnapshot {
    frames: Vec<SerializedChunk>,
    #[serde(default = "default_frame_size")]
    frame_size: u32,
}

fn default_frame_size() -> u32 {
    DEFAULT_FRAME_SIZE
}

/// An ordered sequence of chunk frames
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vox {
    frames: Vec<VoxChunk>,
    frame_size: u32,
}

impl Vox {
    /// Create a vox with no frames; frames appear on first write
    pub fn new() -> Self {
        Self::with_frame_size(DEFAULT_FRAME_SIZE)
    }

    /// Create a vox whose lazily created frames are cubes of `frame_size`
    pub fn with_frame_size(frame_size: u32) -> Self {
        Self {
            frames: Vec::new(),
            frame_size,
        }
    }

    /// Build from existing frames (truncated to [`MAX_FRAMES`])
    pub fn from_frames(mut frames: Vec<VoxChunk>) -> Self {
        if frames.len() > MAX_FRAMES {
            log::warn!("Dropping {} frames beyond max {}", frames.len() - MAX_FRAMES, MAX_FRAMES);
            frames.truncate(MAX_FRAMES);
        }
        Self {
            frames,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    /// Edge length of frames created on first address
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&VoxChunk> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[VoxChunk] {
        &self.frames
    }

    /// Get a frame for writing, creating it (and any gap before it) as an
    /// empty cube on first address.
    pub fn ensure_frame(&mut self, index: usize) -> Result<&mut VoxChunk> {
        if index >= MAX_FRAMES {
            return Err(Error::FrameOutOfRange { frame: index, max: MAX_FRAMES });
        }
        while self.frames.len() <= index {
            self.frames.push(VoxChunk::cube(self.frame_size));
        }
        Ok(&mut self.frames[index])
    }

    /// Non-empty voxels across all frames
    pub fn total_non_empty_voxels(&self) -> usize {
        self.frames.iter().map(VoxChunk::total_non_empty_voxels).sum()
    }

    /// Compress all frames into a snapshot blob
    pub fn to_snapshot_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = VoxSnapshot {
            frames: self.frames.iter().map(VoxChunk::serialize).collect(),
            frame_size: self.frame_size,
        };
        let json = serde_json::to_vec(&snapshot)?;
        Ok(lz4_flex::compress_prepend_size(&json))
    }

    /// Restore from a snapshot blob
    pub fn from_snapshot_bytes(data: &[u8]) -> Result<Self> {
        let json = lz4_flex::decompress_size_prepended(data)
            .map_err(|e| Error::Compression(format!("LZ4 decompression failed: {}", e)))?;
        let snapshot: VoxSnapshot = serde_json::from_slice(&json)?;
        let frames = snapshot
            .frames
            .iter()
            .map(VoxChunk::deserialize)
            .collect::<Result<Vec<_>>>()?;
        let mut vox = Self::from_frames(frames);
        vox.frame_size = snapshot.frame_size;
        Ok(vox)
    }

    /// Save snapshot to file (async)
    pub async fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_snapshot_bytes()?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    /// Load snapshot from file (async)
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_snapshot_bytes(&bytes)
    }

    /// Save snapshot to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let bytes = self.to_snapshot_bytes()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        log::info!("Saved {} frames to {}", self.frames.len(), path.display());
        Ok(())
    }

    /// Load snapshot from file (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty snapshot").into());
        }
        Self::from_snapshot_bytes(&bytes)
    }
}
