//! Terrain data error types.

use crate::GridCoord;

/// Errors that can occur while producing height data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    /// Sample storage for a tile could not be allocated.
    #[error("out of memory allocating {samples} height samples")]
    ResourceExhausted { samples: usize },

    /// The tile layout cannot address the requested coordinate.
    #[error("invalid tile layout for {coord}: {reason}")]
    InvalidLayout { coord: GridCoord, reason: String },
}
