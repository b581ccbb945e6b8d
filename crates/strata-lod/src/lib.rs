//! Level-of-detail terrain quadtree: per-frame split/merge/cull decisions, node
//! status tracking, geometry transfer, and sorted draw emission.

mod backend;
mod error;
mod node;
mod quadtree;
mod selection;
mod settings;

pub use backend::{GeometryUploader, TerrainDraw, TerrainRenderer};
pub use error::LodError;
pub use node::{NodeStatus, TerrainNode};
pub use quadtree::{FrameStats, Renderable, TERRAIN_LAYER, TerrainQuadtree, TransferReport};
pub use selection::{LodAction, LodInputs, LodSettings, select_action};
pub use settings::{MAX_SUPPORTED_LOD, QuadtreeSettings};

pub use strata_render::{
    DrawQueue, GeometryHandle, Intersection, RenderSortKey, UploadError, ViewFrustum,
};
pub use strata_terrain::{CachePolicy, GridCoord, HeightCache, HeightSource, HeightTile};
