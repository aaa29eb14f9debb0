//! Editor configuration.
//!
//! Loaded from a JSON file; any field left out falls back to its default.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::voxel::brush::BrushSettings;
use crate::voxel::edit::MAX_UNDO_STEPS;
use crate::voxel::sync::EXPIRATION_TIME_MS;
use crate::voxel::vox::DEFAULT_FRAME_SIZE;

/// Top-level editor configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// World units per voxel cell. Used to turn sweep-plane drag distance
    /// into extrusion layers.
    pub voxel_size: f32,
    /// Undo steps kept per (vox, frame).
    pub max_undo_steps: usize,
    /// Idle time after the last local write before a sync counts as expired.
    pub sync_expiration_ms: u64,
    /// Edge length of a freshly created frame.
    pub default_frame_size: u32,
    /// Initial brush settings for the session.
    pub brush: BrushSettings,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            voxel_size: 1.0 / 32.0,
            max_undo_steps: MAX_UNDO_STEPS,
            sync_expiration_ms: EXPIRATION_TIME_MS,
            default_frame_size: DEFAULT_FRAME_SIZE,
            brush: BrushSettings::default(),
        }
    }
}

impl EditorConfig {
    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<(), io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)
    }

    /// Load from file (sync)
    pub fn load_sync(path: &Path) -> Result<Self, io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::brush::BrushType;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.max_undo_steps, 32);
        assert_eq!(config.sync_expiration_ms, 30_000);
        assert_eq!(config.brush.brush_type, BrushType::Voxel);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("editor.json");

        let mut config = EditorConfig::default();
        config.voxel_size = 0.5;
        config.brush.brush_type = BrushType::Face;
        config.save_sync(&path).unwrap();

        let loaded = EditorConfig::load_sync(&path).unwrap();
        assert_eq!(loaded.voxel_size, 0.5);
        assert_eq!(loaded.brush.brush_type, BrushType::Face);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "max_undo_steps": 8 }"#).unwrap();

        let loaded = EditorConfig::load_sync(&path).unwrap();
        assert_eq!(loaded.max_undo_steps, 8);
        assert_eq!(loaded.default_frame_size, 1);
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();

        let err = EditorConfig::load_sync(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
