//! Mathematical utilities for cell-space editing

pub mod axis;
pub mod bounds;
pub mod plane;
pub mod ray;

pub use axis::{Axis, Face};
pub use bounds::CellBounds;
pub use plane::Plane;
pub use ray::Ray;
