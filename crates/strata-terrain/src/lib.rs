//! Procedural height data for terrain tiles: fBm heightmap sampling, grid addressing,
//! and a shared, generate-once tile cache.

mod cache;
mod error;
mod grid;
mod heightmap;
mod parallel;
mod tile;

pub use cache::{CachePolicy, CacheStats, HeightCache};
pub use error::TerrainError;
pub use grid::{GridCoord, TileLayout};
pub use heightmap::{HeightSource, HeightmapParams, HeightmapSampler};
pub use tile::HeightTile;
