//! Quadtree nodes and their per-frame state machine.

use std::sync::Arc;

use glam::Vec3;
use strata_render::{Aabb, GeometryHandle, ViewFrustum};
use strata_terrain::{GridCoord, HeightCache, HeightTile};
use tracing::{trace, warn};

use crate::quadtree::{FrameStats, Renderable, TransferReport};
use crate::selection::{LodAction, LodInputs, LodSettings, select_action};
use crate::{GeometryUploader, LodError};

/// Where a node stands after the most recent update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Created but not yet updated.
    #[default]
    Undefined,
    OutOfFrustum,
    /// Beyond the maximum render distance.
    OutOfRange,
    /// Drawn as a leaf with uploaded geometry.
    Active,
    /// Replaced by its children.
    Subdivided,
    /// A leaf waiting for its geometry upload.
    NeedsTransfer,
}

impl NodeStatus {
    /// Whether the node itself is drawn this frame.
    pub fn is_renderable(self) -> bool {
        matches!(self, NodeStatus::Active | NodeStatus::NeedsTransfer)
    }
}

/// Shared state for one recursive update pass.
pub(crate) struct UpdateContext<'a> {
    pub camera: Vec3,
    pub frustum: &'a ViewFrustum,
    pub lod: LodSettings,
    pub root_side_length: f32,
    pub cache: &'a HeightCache,
    /// Geometry given up this pass, handed to the uploader on the next transfer.
    pub released: &'a mut Vec<GeometryHandle>,
    pub stats: &'a mut FrameStats,
}

/// One cell of the terrain quadtree.
///
/// A node owns its children outright; the link back to the parent is only its
/// grid address. The height tile is shared with the cache.
#[derive(Debug)]
pub struct TerrainNode {
    coord: GridCoord,
    side_length: f32,
    status: NodeStatus,
    tile: Arc<HeightTile>,
    geometry: Option<GeometryHandle>,
    children: Option<Box<[TerrainNode; 4]>>,
}

impl TerrainNode {
    pub(crate) fn new(tile: Arc<HeightTile>, side_length: f32) -> Self {
        Self {
            coord: tile.coord(),
            side_length,
            status: NodeStatus::Undefined,
            tile,
            geometry: None,
            children: None,
        }
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn level(&self) -> u32 {
        self.coord.level
    }

    /// Grid address of the parent node, `None` for the root.
    pub fn parent(&self) -> Option<GridCoord> {
        self.coord.parent()
    }

    /// Minimum corner of the footprint.
    pub fn origin(&self) -> Vec3 {
        self.tile.origin()
    }

    pub fn side_length(&self) -> f32 {
        self.side_length
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn tile(&self) -> &Arc<HeightTile> {
        &self.tile
    }

    pub fn geometry(&self) -> Option<GeometryHandle> {
        self.geometry
    }

    pub fn children(&self) -> Option<&[TerrainNode; 4]> {
        self.children.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Footprint extruded over the tile's elevation range.
    pub fn bounds(&self) -> Aabb {
        let origin = self.origin();
        Aabb::new(
            Vec3::new(origin.x, self.tile.min_height(), origin.z),
            Vec3::new(
                origin.x + self.side_length,
                self.tile.max_height(),
                origin.z + self.side_length,
            ),
        )
    }

    pub fn center(&self) -> Vec3 {
        self.bounds().center()
    }

    /// Number of nodes in this subtree, this one included.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .flat_map(|children| children.iter())
            .map(TerrainNode::subtree_len)
            .sum::<usize>()
    }

    /// Visit this node and its descendants, parents first.
    pub fn for_each(&self, f: &mut impl FnMut(&TerrainNode)) {
        f(self);
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.for_each(f);
            }
        }
    }

    /// Recompute this subtree's status for the current camera.
    ///
    /// Children are created on demand and their tiles requested from the cache
    /// together. A height generation failure aborts the pass; a node whose
    /// split fails drops the children it just created and keeps its previous
    /// status and geometry.
    pub(crate) fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<NodeStatus, LodError> {
        ctx.stats.visited += 1;
        let bounds = self.bounds();
        let inputs = LodInputs {
            visibility: ctx.frustum.classify(&bounds),
            distance: ctx.camera.distance(bounds.center()),
            side_length: self.side_length,
            level: self.coord.level,
            subdivided: self.children.is_some(),
        };
        let action = select_action(&inputs, &ctx.lod);
        trace!(coord = %self.coord, ?action, distance = inputs.distance, "lod decision");

        match action {
            LodAction::Cull => {
                self.merge(ctx);
                ctx.stats.culled += 1;
            }
            LodAction::Unload => {
                self.merge(ctx);
                self.release_geometry(ctx.released);
                ctx.stats.out_of_range += 1;
            }
            LodAction::Split => {
                let created = self.children.is_none();
                if created {
                    self.children = Some(self.spawn_children(ctx.cache, ctx.root_side_length)?);
                }
                if let Err(err) = self.update_children(ctx) {
                    // Keep this node drawable as it was; the next frame retries the split.
                    if created {
                        self.prune(ctx.released);
                    }
                    return Err(err);
                }
                self.release_geometry(ctx.released);
                if created {
                    ctx.stats.splits += 1;
                }
                ctx.stats.subdivided += 1;
            }
            LodAction::Leaf => {
                self.merge(ctx);
                if self.geometry.is_some() {
                    ctx.stats.active += 1;
                } else {
                    ctx.stats.needs_transfer += 1;
                }
            }
        }

        self.status = action.status(self.geometry.is_some());
        Ok(self.status)
    }

    fn update_children(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), LodError> {
        if let Some(children) = self.children.as_deref_mut() {
            for child in children.iter_mut() {
                child.update(ctx)?;
            }
        }
        Ok(())
    }

    /// Build the four children without touching `self`.
    fn spawn_children(
        &self,
        cache: &HeightCache,
        root_side_length: f32,
    ) -> Result<Box<[TerrainNode; 4]>, LodError> {
        let coords = self.coord.children();
        let tiles = cache.get_or_create_many(&coords)?;
        let side = root_side_length / (1u64 << (self.coord.level + 1)) as f32;
        Ok(Box::new(std::array::from_fn(|i| {
            TerrainNode::new(Arc::clone(&tiles[i]), side)
        })))
    }

    /// Drop the children, queueing release of every handle below this node.
    fn merge(&mut self, ctx: &mut UpdateContext<'_>) {
        if self.prune(ctx.released) {
            ctx.stats.merges += 1;
        }
    }

    fn prune(&mut self, released: &mut Vec<GeometryHandle>) -> bool {
        let Some(children) = self.children.take() else {
            return false;
        };
        let children: [TerrainNode; 4] = *children;
        for mut child in children {
            child.prune(released);
            child.release_geometry(released);
        }
        true
    }

    fn release_geometry(&mut self, released: &mut Vec<GeometryHandle>) {
        if let Some(handle) = self.geometry.take() {
            released.push(handle);
        }
    }

    /// Queue release of all geometry in this subtree and drop its children.
    pub(crate) fn release_all(&mut self, released: &mut Vec<GeometryHandle>) {
        self.prune(released);
        self.release_geometry(released);
    }

    /// Upload geometry for every leaf waiting on it.
    pub(crate) fn transfer<U>(&mut self, uploader: &mut U, report: &mut TransferReport)
    where
        U: GeometryUploader + ?Sized,
    {
        match self.status {
            NodeStatus::NeedsTransfer => match uploader.upload(self.coord, &self.tile) {
                Ok(handle) => {
                    if let Some(stale) = self.geometry.replace(handle) {
                        uploader.release(stale);
                        report.released += 1;
                    }
                    self.status = NodeStatus::Active;
                    report.uploaded += 1;
                }
                Err(err) => {
                    warn!(coord = %self.coord, %err, "geometry upload failed; retrying next frame");
                    report.failed += 1;
                }
            },
            NodeStatus::Subdivided => {
                if let Some(children) = self.children.as_deref_mut() {
                    for child in children.iter_mut() {
                        child.transfer(uploader, report);
                    }
                }
            }
            _ => {}
        }
    }

    /// Push every drawn leaf under this node, skipping culled subtrees.
    pub(crate) fn collect<'a>(&'a self, out: &mut Vec<Renderable<'a>>) -> Result<(), LodError> {
        match self.status {
            NodeStatus::Active | NodeStatus::NeedsTransfer => out.push(Renderable::new(self)?),
            NodeStatus::Subdivided => {
                if let Some(children) = &self.children {
                    for child in children.iter() {
                        child.collect(out)?;
                    }
                }
            }
            NodeStatus::Undefined | NodeStatus::OutOfFrustum | NodeStatus::OutOfRange => {}
        }
        Ok(())
    }
}
