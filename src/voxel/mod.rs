//! Voxel data structures and operations

pub mod color;
pub mod chunk;
pub mod vox;
pub mod edit;
pub mod mesh;
pub mod crawl;
pub mod sync;
pub mod brush;

pub use color::{VoxColor, REMOVE_VOXEL_COLOR};
pub use chunk::{SerializedChunk, VoxChunk, MAX_SIZE};
pub use vox::{Vox, VoxId, MAX_FRAMES};
pub use mesh::{MeshBuilder, MeshVertex, VoxMesh, VoxelGrid};
pub use crawl::{crawl_face, CrawlExtents, CrawlType};
pub use sync::{SyncRegistry, VoxSync};
pub use brush::{BrushSettings, BrushType, BuilderSystem};
