//! View-frustum culling against planes extracted from the view-projection matrix.
//!
//! The frustum is rebuilt once per frame and then used to classify every
//! bounding volume visited that frame. Volumes only have to report how far
//! they extend along a plane normal, so boxes and spheres share one test.

use glam::{DMat4, DVec4, Mat4, Vec3};

/// A normal shorter than this fraction of its raw plane vector has collapsed.
const MIN_NORMAL_RATIO: f64 = 1e-9;

/// Identifies one of the six frustum planes, in storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrustumPlane {
    Right,
    Left,
    Top,
    Bottom,
    Near,
    Far,
}

impl FrustumPlane {
    /// All planes in the order they are stored in a [`ViewFrustum`].
    pub const ALL: [FrustumPlane; 6] = [
        FrustumPlane::Right,
        FrustumPlane::Left,
        FrustumPlane::Top,
        FrustumPlane::Bottom,
        FrustumPlane::Near,
        FrustumPlane::Far,
    ];
}

/// Errors produced while building a frustum.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum FrustumError {
    /// The view-projection matrix collapses a plane normal to (near) zero length.
    #[error("degenerate view-projection: {0:?} plane has a zero-length normal")]
    DegeneratePlane(FrustumPlane),
}

/// Result of testing a bounding volume against the frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// The volume is entirely inside the frustum.
    Inside,
    /// The volume is entirely outside the frustum.
    Outside,
    /// The volume straddles one or more frustum planes.
    Intersecting,
}

/// A normalized plane: `normal.dot(p) + distance >= 0` is the inside half-space.
///
/// `normal` has unit length, except for a depth plane at infinity, which has
/// a zero normal and a positive distance so that every point is inside it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// The plane of an infinite projection's unbounded depth side.
    pub const UNBOUNDED: Plane = Plane {
        normal: Vec3::ZERO,
        distance: 1.0,
    };

    /// Normalize a raw `(a, b, c, d)` plane so that `(a, b, c)` has unit length.
    ///
    /// Works in `f64`: with a far/near ratio around `1e6` the far row nearly
    /// cancels, and single precision leaves nothing of its normal.
    fn from_raw(raw: DVec4, which: FrustumPlane) -> Result<Self, FrustumError> {
        let normal = raw.truncate();
        let len = normal.length();
        let scale = raw.length();
        if !len.is_finite() || !scale.is_finite() {
            return Err(FrustumError::DegeneratePlane(which));
        }
        if len <= MIN_NORMAL_RATIO * scale {
            // Only a depth plane pushed to infinity collapses to `(0, 0, 0, w > 0)`.
            let depth = matches!(which, FrustumPlane::Near | FrustumPlane::Far);
            if depth && raw.w > 0.0 {
                return Ok(Self::UNBOUNDED);
            }
            return Err(FrustumError::DegeneratePlane(which));
        }
        Ok(Self {
            normal: (normal / len).as_vec3(),
            distance: (raw.w / len) as f32,
        })
    }

    /// Signed distance from the plane; positive on the inside.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Anything that can report its extent along a plane normal.
///
/// `signed_extent` returns the minimum and maximum signed distance of the
/// volume's points from `plane`.
pub trait BoundingVolume {
    fn signed_extent(&self, plane: &Plane) -> (f32, f32);
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Vec3,
    /// Maximum corner of the bounding box.
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from two corners, sorting components per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Returns the center point of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents (half-size along each axis).
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

impl BoundingVolume for Aabb {
    fn signed_extent(&self, plane: &Plane) -> (f32, f32) {
        let center = plane.signed_distance(self.center());
        let radius = self.extents().dot(plane.normal.abs());
        (center - radius, center + radius)
    }
}

/// A bounding sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The smallest sphere enclosing `aabb`.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            radius: aabb.extents().length(),
        }
    }
}

impl BoundingVolume for BoundingSphere {
    fn signed_extent(&self, plane: &Plane) -> (f32, f32) {
        let d = plane.signed_distance(self.center);
        let radius = self.radius * plane.normal.length();
        (d - radius, d + radius)
    }
}

/// A view frustum defined by six inward-pointing normalized planes.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewFrustum {
    /// Right, left, top, bottom, near, far.
    planes: [Plane; 6],
}

impl ViewFrustum {
    /// Build the frustum for a camera from its view and projection transforms.
    pub fn new(view: &Mat4, projection: &Mat4) -> Result<Self, FrustumError> {
        Self::from_dmat4(&(projection.as_dmat4() * view.as_dmat4()))
    }

    /// Extract frustum planes from a combined view-projection matrix.
    ///
    /// Assumes the `[0, 1]` clip-space depth range. With reverse-Z the near and
    /// far rows swap roles, but both still bound the volume, so culling is
    /// unaffected. An infinite projection yields an unbounded depth plane.
    pub fn from_view_projection(vp: &Mat4) -> Result<Self, FrustumError> {
        Self::from_dmat4(&vp.as_dmat4())
    }

    fn from_dmat4(vp: &DMat4) -> Result<Self, FrustumError> {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];
        let raw = [
            rows[3] - rows[0],
            rows[3] + rows[0],
            rows[3] - rows[1],
            rows[3] + rows[1],
            rows[2],
            rows[3] - rows[2],
        ];

        let mut planes = [Plane::UNBOUNDED; 6];
        for ((slot, raw), which) in planes.iter_mut().zip(raw).zip(FrustumPlane::ALL) {
            *slot = Plane::from_raw(raw, which)?;
        }
        Ok(Self { planes })
    }

    /// The plane with the given identity.
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// All six planes in storage order.
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Classify a bounding volume against all six planes.
    ///
    /// A volume wholly behind any single plane is `Outside`; this is
    /// conservative near frustum corners, where it may report `Intersecting`
    /// for a volume that is not actually visible.
    pub fn classify<V: BoundingVolume + ?Sized>(&self, volume: &V) -> Intersection {
        let mut all_inside = true;
        for plane in &self.planes {
            let (min, max) = volume.signed_extent(plane);
            if max < 0.0 {
                return Intersection::Outside;
            }
            if min < 0.0 {
                all_inside = false;
            }
        }
        if all_inside {
            Intersection::Inside
        } else {
            Intersection::Intersecting
        }
    }

    /// Returns `true` if the volume is at least partially inside the frustum.
    pub fn is_visible<V: BoundingVolume + ?Sized>(&self, volume: &V) -> bool {
        self.classify(volume) != Intersection::Outside
    }

    /// Returns `true` if the point lies inside or on every plane.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.signed_distance(point) >= 0.0)
    }
}
