//! Backend-agnostic render plumbing: view-frustum culling, packed draw sort keys,
//! and the draw queue handed to a graphics backend.

mod frustum;
mod handle;
mod queue;
mod sort_key;

pub use frustum::{
    Aabb, BoundingSphere, BoundingVolume, FrustumError, FrustumPlane, Intersection, Plane,
    ViewFrustum,
};
pub use handle::{GeometryHandle, UploadError};
pub use queue::{DrawGroup, DrawGroupIter, DrawQueue};
pub use sort_key::{RenderSortKey, SortKeyError, SortKeyField, SortKeyFields};
