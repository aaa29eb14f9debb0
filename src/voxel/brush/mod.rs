//! Brush system for interactive voxel editing
//!
//! Settings and cell-set generation are plain data and functions; the
//! [`BuilderSystem`] ties them to hover targets, previews, commits and undo.

pub mod settings;
pub mod shape;
pub mod pending;
pub mod engine;

// Re-exports
pub use settings::{BrushFilter, BrushMode, BrushSettings, BrushShape, BrushType, ColorFillMode};
pub use pending::{CellWrites, PendingChunk};
pub use engine::{BrushInput, BuilderEvent, BuilderState, BuilderSystem, HitTarget, VoxHit, VoxHost};
