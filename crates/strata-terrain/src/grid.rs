//! Quadtree grid addressing and the mapping from grid cells to world space.

use std::fmt;

use glam::Vec3;

use crate::TerrainError;

/// Integer address of a quadtree cell: subdivision level plus the cell's
/// column/row within the `2^level × 2^level` grid of that level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridCoord {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl GridCoord {
    /// The single cell covering the whole root footprint.
    pub const ROOT: GridCoord = GridCoord {
        level: 0,
        x: 0,
        y: 0,
    };

    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Number of cells along one edge at `level`.
    pub fn grid_size(level: u32) -> u64 {
        1u64 << level
    }

    /// The cell one level up that contains this one, or `None` for the root.
    pub fn parent(&self) -> Option<GridCoord> {
        if self.level == 0 {
            return None;
        }
        Some(GridCoord {
            level: self.level - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// The four cells one level down, in quadrant order
    /// `[(2x, 2y), (2x+1, 2y), (2x, 2y+1), (2x+1, 2y+1)]`.
    pub fn children(&self) -> [GridCoord; 4] {
        let level = self.level + 1;
        let (x, y) = (self.x * 2, self.y * 2);
        [0u32, 1, 2, 3].map(|i| GridCoord {
            level,
            x: x + (i & 1),
            y: y + (i >> 1),
        })
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}({}, {})", self.level, self.x, self.y)
    }
}

/// World-space placement of the grid: where the root footprint sits, how large
/// it is, and how many samples each tile carries per edge.
///
/// Footprints span `+X` (grid x) and `+Z` (grid y) from their origin; heights
/// are measured along `+Y` relative to the root origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileLayout {
    pub root_origin: Vec3,
    pub root_side_length: f32,
    /// Samples per tile edge; edges are shared with neighbors, so the sample
    /// spacing is `side / (resolution - 1)`.
    pub resolution: usize,
}

impl TileLayout {
    pub fn new(root_origin: Vec3, root_side_length: f32, resolution: usize) -> Self {
        Self {
            root_origin,
            root_side_length,
            resolution,
        }
    }

    /// Side length of a cell at `level`.
    pub fn side_length(&self, level: u32) -> f32 {
        self.root_side_length / (1u64 << level) as f32
    }

    /// Minimum corner of the cell's footprint.
    pub fn origin(&self, coord: GridCoord) -> Vec3 {
        let side = self.side_length(coord.level);
        self.root_origin + Vec3::new(coord.x as f32 * side, 0.0, coord.y as f32 * side)
    }

    /// Distance between adjacent samples in a tile at `level`.
    pub fn sample_spacing(&self, level: u32) -> f32 {
        self.side_length(level) / (self.resolution - 1) as f32
    }

    /// Reject coordinates and layouts that cannot produce a tile.
    pub fn validate(&self, coord: GridCoord) -> Result<(), TerrainError> {
        let invalid = |reason: &str| TerrainError::InvalidLayout {
            coord,
            reason: reason.to_string(),
        };
        if self.resolution < 2 {
            return Err(invalid("tile resolution must be at least 2"));
        }
        if !(self.root_side_length.is_finite() && self.root_side_length > 0.0) {
            return Err(invalid("root side length must be positive"));
        }
        if coord.level >= 32 {
            return Err(invalid("level exceeds grid addressing range"));
        }
        let size = GridCoord::grid_size(coord.level);
        if u64::from(coord.x) >= size || u64::from(coord.y) >= size {
            return Err(invalid("cell lies outside the root footprint"));
        }
        Ok(())
    }
}
