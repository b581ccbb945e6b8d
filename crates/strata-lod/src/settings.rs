//! Construction parameters for the terrain quadtree.

use glam::Vec3;
use strata_terrain::CachePolicy;

use crate::LodError;
use crate::selection::LodSettings;

/// Deepest subdivision level the quadtree supports.
///
/// Grid columns and rows at this level still fit in 16 bits each, which keeps
/// a cell address packable into a sort key's user payload.
pub const MAX_SUPPORTED_LOD: u32 = 16;

/// Parameters fixed for the lifetime of a [`TerrainQuadtree`](crate::TerrainQuadtree).
#[derive(Clone, Debug, PartialEq)]
pub struct QuadtreeSettings {
    /// A node subdivides when the camera is closer than `split_factor × side`.
    pub split_factor: f32,
    /// An already subdivided node merges only once the camera is at least
    /// `merge_factor × side` away. Equal to `split_factor` by default.
    pub merge_factor: f32,
    /// Deepest level a node may subdivide to.
    pub max_lod: u32,
    /// Edge length of the root footprint.
    pub root_side_length: f32,
    /// Minimum corner of the root footprint.
    pub root_position: Vec3,
    /// Nodes whose center is farther than this are unloaded.
    pub max_render_distance: f32,
    /// Height samples per tile edge.
    pub tile_resolution: usize,
    pub cache: CachePolicy,
}

impl QuadtreeSettings {
    pub const DEFAULT_MAX_RENDER_DISTANCE: f32 = 100_000.0;
    pub const DEFAULT_TILE_RESOLUTION: usize = 17;

    pub fn new(split_factor: f32, max_lod: u32, root_side_length: f32, root_position: Vec3) -> Self {
        Self {
            split_factor,
            merge_factor: split_factor,
            max_lod,
            root_side_length,
            root_position,
            max_render_distance: Self::DEFAULT_MAX_RENDER_DISTANCE,
            tile_resolution: Self::DEFAULT_TILE_RESOLUTION,
            cache: CachePolicy::default(),
        }
    }

    pub fn with_merge_factor(mut self, merge_factor: f32) -> Self {
        self.merge_factor = merge_factor;
        self
    }

    pub fn with_max_render_distance(mut self, distance: f32) -> Self {
        self.max_render_distance = distance;
        self
    }

    pub fn with_tile_resolution(mut self, resolution: usize) -> Self {
        self.tile_resolution = resolution;
        self
    }

    pub fn with_cache_policy(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Side length of a node at `level`. Exact halving per level.
    pub fn side_length(&self, level: u32) -> f32 {
        self.root_side_length / (1u64 << level) as f32
    }

    /// The subset of settings the per-node decision depends on.
    pub fn lod(&self) -> LodSettings {
        LodSettings {
            split_factor: self.split_factor,
            merge_factor: self.merge_factor,
            max_lod: self.max_lod,
            max_render_distance: self.max_render_distance,
        }
    }

    /// Reject settings that cannot describe a usable quadtree.
    pub fn validate(&self) -> Result<(), LodError> {
        let invalid = |msg: String| Err(LodError::InvalidSettings(msg));

        if !(self.root_side_length.is_finite() && self.root_side_length > 0.0) {
            return invalid(format!(
                "root side length must be positive, got {}",
                self.root_side_length
            ));
        }
        if !self.root_position.is_finite() {
            return invalid(format!("root position must be finite, got {}", self.root_position));
        }
        if !(self.split_factor.is_finite() && self.split_factor >= 0.0) {
            return invalid(format!(
                "split factor must be non-negative, got {}",
                self.split_factor
            ));
        }
        if !(self.merge_factor.is_finite() && self.merge_factor >= self.split_factor) {
            return invalid(format!(
                "merge factor {} must be at least the split factor {}",
                self.merge_factor, self.split_factor
            ));
        }
        if self.max_lod > MAX_SUPPORTED_LOD {
            return invalid(format!(
                "max LOD {} exceeds the supported maximum {MAX_SUPPORTED_LOD}",
                self.max_lod
            ));
        }
        if self.max_lod == 0 && self.split_factor > 0.0 {
            return invalid(format!(
                "split factor {} requires a max LOD above 0",
                self.split_factor
            ));
        }
        if self.max_render_distance.is_nan() || self.max_render_distance <= 0.0 {
            return invalid(format!(
                "max render distance must be positive, got {}",
                self.max_render_distance
            ));
        }
        if self.tile_resolution < 2 {
            return invalid(format!(
                "tile resolution must be at least 2, got {}",
                self.tile_resolution
            ));
        }
        Ok(())
    }
}
