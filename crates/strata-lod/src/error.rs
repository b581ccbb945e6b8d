//! LOD quadtree error types.

use strata_render::{FrustumError, SortKeyError};
use strata_terrain::TerrainError;

/// Errors surfaced by quadtree construction and per-frame updates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    /// Construction parameters cannot describe a usable quadtree.
    #[error("invalid quadtree settings: {0}")]
    InvalidSettings(String),

    /// The camera's view-projection cannot be turned into a frustum.
    #[error(transparent)]
    DegenerateFrustum(#[from] FrustumError),

    /// Height data could not be produced (including allocation failure).
    #[error(transparent)]
    Terrain(#[from] TerrainError),

    /// A node's draw ordering did not fit the sort key layout.
    #[error(transparent)]
    SortKey(#[from] SortKeyError),
}
