//! Seams to the GPU: geometry upload and draw submission.

use glam::Vec3;
use strata_render::{DrawQueue, GeometryHandle, UploadError};
use strata_terrain::{GridCoord, HeightTile};

/// Turns height tiles into GPU geometry.
pub trait GeometryUploader {
    /// Upload `tile` and return a handle to the resulting geometry.
    ///
    /// On failure the node stays waiting and the upload is retried on the next
    /// transfer.
    fn upload(&mut self, coord: GridCoord, tile: &HeightTile) -> Result<GeometryHandle, UploadError>;

    /// Free geometry that no node draws anymore.
    fn release(&mut self, handle: GeometryHandle);
}

/// Issues the frame's terrain draws.
pub trait TerrainRenderer {
    fn submit(&mut self, draws: &DrawQueue<TerrainDraw>);
}

/// Everything a renderer needs to draw one terrain leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainDraw {
    pub coord: GridCoord,
    pub geometry: GeometryHandle,
    /// Minimum corner of the footprint.
    pub origin: Vec3,
    pub side_length: f32,
}
