//! In-process stand-ins for the GPU: an uploader that meshes tiles into vertex
//! bytes and a renderer that logs its draw groups.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use strata_lod::{
    DrawQueue, GeometryHandle, GeometryUploader, GridCoord, HeightTile, TerrainDraw,
    TerrainRenderer, UploadError,
};
use tracing::{debug, trace};

/// One terrain mesh vertex as it would be laid out in a vertex buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
}

/// Grid mesh vertices for `tile`, row-major.
pub fn mesh_vertices(tile: &HeightTile) -> Vec<TerrainVertex> {
    let origin = tile.origin();
    let spacing = tile.spacing();
    let n = tile.resolution();
    let mut vertices = Vec::with_capacity(n * n);
    for (index, &height) in tile.samples().iter().enumerate() {
        let (i, j) = (index % n, index / n);
        vertices.push(TerrainVertex {
            position: [
                origin.x + i as f32 * spacing,
                height,
                origin.z + j as f32 * spacing,
            ],
        });
    }
    vertices
}

/// Keeps "uploaded" vertex buffers in memory.
#[derive(Default)]
pub struct MemoryUploader {
    next_id: u64,
    buffers: HashMap<GeometryHandle, Vec<u8>>,
    uploaded_total: u64,
}

impl MemoryUploader {
    pub fn resident(&self) -> usize {
        self.buffers.len()
    }

    pub fn resident_bytes(&self) -> usize {
        self.buffers.values().map(Vec::len).sum()
    }

    pub fn uploaded_total(&self) -> u64 {
        self.uploaded_total
    }
}

impl GeometryUploader for MemoryUploader {
    fn upload(&mut self, coord: GridCoord, tile: &HeightTile) -> Result<GeometryHandle, UploadError> {
        let vertices = mesh_vertices(tile);
        if vertices.is_empty() {
            return Err(UploadError::new(format!("tile {coord} has no samples")));
        }
        self.next_id += 1;
        let handle = GeometryHandle(self.next_id);
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        self.buffers.insert(handle, bytes.to_vec());
        self.uploaded_total += 1;
        trace!(%coord, %handle, bytes = bytes.len(), "uploaded tile geometry");
        Ok(handle)
    }

    fn release(&mut self, handle: GeometryHandle) {
        if self.buffers.remove(&handle).is_none() {
            debug!(%handle, "release of unknown geometry");
        }
    }
}

/// Counts submitted draws and logs each (layer, pass) group.
#[derive(Default)]
pub struct LoggingRenderer {
    pub last_draws: usize,
    pub total_draws: u64,
}

impl TerrainRenderer for LoggingRenderer {
    fn submit(&mut self, draws: &DrawQueue<TerrainDraw>) {
        for group in draws.groups() {
            let finest = group
                .draws
                .iter()
                .map(|(_, draw)| draw.coord.level)
                .max()
                .unwrap_or(0);
            debug!(
                layer = group.layer,
                pass = group.deferred_pass,
                draws = group.draws.len(),
                finest_level = finest,
                "draw group"
            );
        }
        self.last_draws = draws.len();
        self.total_draws += draws.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use strata_terrain::TileLayout;

    use super::*;

    #[test]
    fn test_mesh_vertices_follow_tile_grid() {
        let layout = TileLayout::new(Vec3::new(10.0, 0.0, 20.0), 8.0, 3);
        let tile = HeightTile::generate(GridCoord::ROOT, &layout, &|x: f64, _: f64| x).unwrap();
        let vertices = mesh_vertices(&tile);
        assert_eq!(vertices.len(), 9);
        assert_eq!(vertices[0].position, [10.0, 10.0, 20.0]);
        assert_eq!(vertices[5].position, [18.0, 18.0, 24.0]);
    }

    #[test]
    fn test_uploader_tracks_buffers() {
        let layout = TileLayout::new(Vec3::ZERO, 8.0, 3);
        let tile = HeightTile::generate(GridCoord::ROOT, &layout, &|_: f64, _: f64| 1.0).unwrap();
        let mut uploader = MemoryUploader::default();

        let a = uploader.upload(GridCoord::ROOT, &tile).unwrap();
        let b = uploader.upload(GridCoord::ROOT, &tile).unwrap();
        assert_ne!(a, b);
        assert_eq!(uploader.resident(), 2);
        assert_eq!(uploader.resident_bytes(), 2 * 9 * std::mem::size_of::<TerrainVertex>());

        uploader.release(a);
        assert_eq!(uploader.resident(), 1);
        assert_eq!(uploader.uploaded_total(), 2);
    }
}
