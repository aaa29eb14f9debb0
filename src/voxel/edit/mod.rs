//! Voxel edit system built on chunk deltas.
//!
//! A delta is an ordinary chunk placed at an offset; cells holding
//! `REMOVE_VOXEL_COLOR` clear, every other cell overwrites. The same delta
//! form drives local commits, undo/redo and network sync.

pub mod delta;
pub mod overlay;
pub mod undo;

pub use delta::{invert_delta, VoxOp, WireOp};
pub use overlay::{apply_delta, overlay_preview};
pub use undo::{PendingUndo, UndoDirection, UndoKey, UndoManager, UndoStack, MAX_UNDO_STEPS};
