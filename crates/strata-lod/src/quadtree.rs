//! The terrain quadtree: owns the node tree and the height cache, and drives the
//! per-frame update, transfer, and draw emission.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use strata_render::{DrawQueue, GeometryHandle, RenderSortKey, SortKeyFields, ViewFrustum};
use strata_terrain::{GridCoord, HeightCache, HeightSource, TileLayout};
use tracing::{debug, info};

use crate::node::UpdateContext;
use crate::{
    GeometryUploader, LodError, MAX_SUPPORTED_LOD, NodeStatus, QuadtreeSettings, TerrainDraw,
    TerrainNode, TerrainRenderer,
};

/// Sort key layer for terrain draws.
pub const TERRAIN_LAYER: u8 = 0;

/// Counters from one update pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub visited: usize,
    pub culled: usize,
    pub out_of_range: usize,
    pub subdivided: usize,
    pub active: usize,
    pub needs_transfer: usize,
    /// Nodes that gained children this frame.
    pub splits: usize,
    /// Nodes whose children were dropped this frame.
    pub merges: usize,
}

impl FrameStats {
    /// Leaves drawn this frame, whether or not their geometry is ready.
    pub fn leaves(&self) -> usize {
        self.active + self.needs_transfer
    }
}

/// Outcome of one [`TerrainQuadtree::process_transfers`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub uploaded: usize,
    pub failed: usize,
    pub released: usize,
}

/// A visible leaf paired with its draw order.
#[derive(Clone, Copy, Debug)]
pub struct Renderable<'a> {
    pub node: &'a TerrainNode,
    pub key: RenderSortKey,
}

impl<'a> Renderable<'a> {
    pub(crate) fn new(node: &'a TerrainNode) -> Result<Self, LodError> {
        let coord = node.coord();
        let key = RenderSortKey::encode(&SortKeyFields {
            layer: TERRAIN_LAYER,
            deferred_pass: 0,
            user: (coord.x << 16) | coord.y,
            instanced: false,
            // Grid cell orders draws first; among equal cells, finer levels come first.
            depth: (MAX_SUPPORTED_LOD - coord.level) as u16,
            immediate_pass: 0,
        })?;
        Ok(Self { node, key })
    }

    /// The draw for this leaf, if its geometry has been uploaded.
    pub fn draw(&self) -> Option<TerrainDraw> {
        let geometry = self.node.geometry()?;
        (self.node.status() == NodeStatus::Active).then(|| TerrainDraw {
            coord: self.node.coord(),
            geometry,
            origin: self.node.origin(),
            side_length: self.node.side_length(),
        })
    }
}

/// Adaptive level-of-detail terrain over a square footprint.
pub struct TerrainQuadtree {
    settings: QuadtreeSettings,
    cache: HeightCache,
    root: TerrainNode,
    released: Vec<GeometryHandle>,
    frame: u64,
}

impl TerrainQuadtree {
    /// Validate `settings` and generate the root tile.
    pub fn new(settings: QuadtreeSettings, source: Arc<dyn HeightSource>) -> Result<Self, LodError> {
        settings.validate()?;
        let layout = TileLayout::new(
            settings.root_position,
            settings.root_side_length,
            settings.tile_resolution,
        );
        let cache = HeightCache::new(layout, source, settings.cache);
        let root = TerrainNode::new(cache.get_or_create(GridCoord::ROOT)?, settings.root_side_length);
        info!(
            split_factor = settings.split_factor,
            merge_factor = settings.merge_factor,
            max_lod = settings.max_lod,
            root_side_length = settings.root_side_length,
            "terrain quadtree created"
        );
        Ok(Self {
            settings,
            cache,
            root,
            released: Vec::new(),
            frame: 0,
        })
    }

    /// Recompute every node's status for this frame's camera.
    pub fn update_frame(
        &mut self,
        camera: Vec3,
        view: &Mat4,
        projection: &Mat4,
    ) -> Result<FrameStats, LodError> {
        let frustum = ViewFrustum::new(view, projection)?;
        self.update_with_frustum(camera, &frustum)
    }

    /// Like [`update_frame`](Self::update_frame) with a prebuilt frustum.
    pub fn update_with_frustum(
        &mut self,
        camera: Vec3,
        frustum: &ViewFrustum,
    ) -> Result<FrameStats, LodError> {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            ..Default::default()
        };
        let mut ctx = UpdateContext {
            camera,
            frustum,
            lod: self.settings.lod(),
            root_side_length: self.settings.root_side_length,
            cache: &self.cache,
            released: &mut self.released,
            stats: &mut stats,
        };
        self.root.update(&mut ctx)?;
        debug!(
            frame = stats.frame,
            visited = stats.visited,
            leaves = stats.leaves(),
            splits = stats.splits,
            merges = stats.merges,
            culled = stats.culled,
            "terrain update"
        );
        Ok(stats)
    }

    /// Release geometry given up since the last call, then upload every leaf
    /// still waiting for geometry.
    pub fn process_transfers<U>(&mut self, uploader: &mut U) -> TransferReport
    where
        U: GeometryUploader + ?Sized,
    {
        let mut report = TransferReport::default();
        for handle in self.released.drain(..) {
            uploader.release(handle);
            report.released += 1;
        }
        self.root.transfer(uploader, &mut report);
        if report.uploaded + report.failed + report.released > 0 {
            debug!(
                uploaded = report.uploaded,
                failed = report.failed,
                released = report.released,
                "terrain transfers"
            );
        }
        report
    }

    /// Every drawn leaf with its sort key, in tree order.
    pub fn collect_renderables(&self) -> Result<Vec<Renderable<'_>>, LodError> {
        let mut out = Vec::new();
        self.root.collect(&mut out)?;
        Ok(out)
    }

    /// Hand the sorted draws of all leaves with ready geometry to `renderer`.
    ///
    /// Returns the number of draws submitted.
    pub fn submit<R>(&self, renderer: &mut R) -> Result<usize, LodError>
    where
        R: TerrainRenderer + ?Sized,
    {
        let renderables = self.collect_renderables()?;
        let mut queue = DrawQueue::with_capacity(renderables.len());
        for renderable in &renderables {
            if let Some(draw) = renderable.draw() {
                queue.push(renderable.key, draw);
            }
        }
        queue.sort();
        renderer.submit(&queue);
        Ok(queue.len())
    }

    /// Collapse back to a single root, dropping all cached tiles.
    ///
    /// Geometry held by the old tree is released on the next transfer.
    pub fn reset(&mut self) -> Result<(), LodError> {
        self.root.release_all(&mut self.released);
        self.cache.clear();
        self.root = TerrainNode::new(
            self.cache.get_or_create(GridCoord::ROOT)?,
            self.settings.root_side_length,
        );
        info!(pending_releases = self.released.len(), "terrain quadtree reset");
        Ok(())
    }

    /// Drop the whole tree and free its geometry immediately.
    pub fn release_all<U>(&mut self, uploader: &mut U) -> TransferReport
    where
        U: GeometryUploader + ?Sized,
    {
        self.root.release_all(&mut self.released);
        self.root = TerrainNode::new(Arc::clone(self.root.tile()), self.settings.root_side_length);
        self.process_transfers(uploader)
    }

    /// Status of every node currently in the tree.
    pub fn status_map(&self) -> BTreeMap<GridCoord, NodeStatus> {
        let mut map = BTreeMap::new();
        self.root.for_each(&mut |node| {
            map.insert(node.coord(), node.status());
        });
        map
    }

    pub fn root(&self) -> &TerrainNode {
        &self.root
    }

    pub fn cache(&self) -> &HeightCache {
        &self.cache
    }

    pub fn settings(&self) -> &QuadtreeSettings {
        &self.settings
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.root.subtree_len()
    }

    /// Number of update passes run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Geometry handles waiting to be released.
    pub fn pending_releases(&self) -> &[GeometryHandle] {
        &self.released
    }
}
