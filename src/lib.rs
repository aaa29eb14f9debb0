//! Voxedit - brush-driven voxel object editing

pub mod core;
pub mod math;
pub mod voxel;
