//! Per-node LOD decision: cull, split, unload, or draw as a leaf.
//!
//! The decision is a pure function of the node's frustum classification, its
//! distance to the camera, and the quadtree settings, so it can be tested
//! without building a tree.

use strata_render::Intersection;

use crate::NodeStatus;

/// What a node should do this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LodAction {
    /// Entirely outside the frustum.
    Cull,
    /// Close enough to be replaced by its four children.
    Split,
    /// Too far to split and beyond the maximum render distance.
    Unload,
    /// Drawn at its own resolution.
    Leaf,
}

impl LodAction {
    /// The status a node takes after performing this action.
    pub fn status(self, has_geometry: bool) -> NodeStatus {
        match self {
            LodAction::Cull => NodeStatus::OutOfFrustum,
            LodAction::Unload => NodeStatus::OutOfRange,
            LodAction::Split => NodeStatus::Subdivided,
            LodAction::Leaf if has_geometry => NodeStatus::Active,
            LodAction::Leaf => NodeStatus::NeedsTransfer,
        }
    }
}

/// Per-node measurements the decision depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodInputs {
    pub visibility: Intersection,
    /// Distance from the camera to the node's bounding box center.
    pub distance: f32,
    pub side_length: f32,
    pub level: u32,
    /// Whether the node currently has children.
    pub subdivided: bool,
}

/// Thresholds consulted by [`select_action`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodSettings {
    pub split_factor: f32,
    pub merge_factor: f32,
    pub max_lod: u32,
    pub max_render_distance: f32,
}

impl LodSettings {
    /// Distance below which a node keeps (or gains) children.
    ///
    /// Already subdivided nodes use the wider merge threshold.
    pub fn split_distance(&self, side_length: f32, subdivided: bool) -> f32 {
        let factor = if subdivided {
            self.merge_factor
        } else {
            self.split_factor
        };
        factor * side_length
    }
}

/// Decide what a node does this frame.
///
/// Checks run in order: frustum, split threshold, render distance. A node
/// whose center is beyond the render distance still splits when it is large
/// enough that the camera sits within its split threshold. The split
/// comparison is strict, so a node exactly at the threshold stays a leaf.
pub fn select_action(inputs: &LodInputs, settings: &LodSettings) -> LodAction {
    if inputs.visibility == Intersection::Outside {
        return LodAction::Cull;
    }
    let threshold = settings.split_distance(inputs.side_length, inputs.subdivided);
    if inputs.level < settings.max_lod && inputs.distance < threshold {
        LodAction::Split
    } else if inputs.distance > settings.max_render_distance {
        LodAction::Unload
    } else {
        LodAction::Leaf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LodSettings {
        LodSettings {
            split_factor: 2.0,
            merge_factor: 2.0,
            max_lod: 3,
            max_render_distance: 1000.0,
        }
    }

    fn inputs(distance: f32) -> LodInputs {
        LodInputs {
            visibility: Intersection::Inside,
            distance,
            side_length: 100.0,
            level: 0,
            subdivided: false,
        }
    }

    /// A node outside the frustum is culled regardless of distance.
    #[test]
    fn test_outside_is_culled_first() {
        let lod = select_action(
            &LodInputs {
                visibility: Intersection::Outside,
                ..inputs(0.0)
            },
            &settings(),
        );
        assert_eq!(lod, LodAction::Cull);
    }

    #[test]
    fn test_intersecting_is_treated_as_visible() {
        let lod = select_action(
            &LodInputs {
                visibility: Intersection::Intersecting,
                ..inputs(10.0)
            },
            &settings(),
        );
        assert_eq!(lod, LodAction::Split);
    }

    #[test]
    fn test_beyond_render_distance_unloads() {
        assert_eq!(select_action(&inputs(1000.5), &settings()), LodAction::Unload);
        assert_eq!(select_action(&inputs(1000.0), &settings()), LodAction::Leaf);
    }

    /// A root wider than the render distance refines around the camera.
    #[test]
    fn test_split_wins_over_render_distance() {
        let s = LodSettings {
            max_render_distance: 100_000.0,
            ..settings()
        };
        let huge_root = LodInputs {
            side_length: 300_000.0,
            ..inputs(150_000.0)
        };
        assert_eq!(select_action(&huge_root, &s), LodAction::Split);

        let finest = LodInputs {
            level: 3,
            ..huge_root
        };
        assert_eq!(select_action(&finest, &s), LodAction::Unload);
    }

    /// Exactly at `split_factor × side` the node does not subdivide.
    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(select_action(&inputs(199.9), &settings()), LodAction::Split);
        assert_eq!(select_action(&inputs(200.0), &settings()), LodAction::Leaf);
    }

    #[test]
    fn test_max_lod_stops_subdivision() {
        let lod = select_action(
            &LodInputs {
                level: 3,
                ..inputs(0.0)
            },
            &settings(),
        );
        assert_eq!(lod, LodAction::Leaf);
    }

    #[test]
    fn test_zero_split_factor_never_splits() {
        let s = LodSettings {
            split_factor: 0.0,
            merge_factor: 0.0,
            ..settings()
        };
        assert_eq!(select_action(&inputs(0.0), &s), LodAction::Leaf);
    }

    /// Between the split and merge thresholds a subdivided node stays split
    /// while a leaf stays a leaf.
    #[test]
    fn test_hysteresis_band() {
        let s = LodSettings {
            merge_factor: 3.0,
            ..settings()
        };
        let in_band = inputs(250.0);
        assert_eq!(select_action(&in_band, &s), LodAction::Leaf);
        assert_eq!(
            select_action(
                &LodInputs {
                    subdivided: true,
                    ..in_band
                },
                &s
            ),
            LodAction::Split
        );
        assert_eq!(
            select_action(
                &LodInputs {
                    subdivided: true,
                    ..inputs(300.0)
                },
                &s
            ),
            LodAction::Leaf
        );
    }

    #[test]
    fn test_action_to_status() {
        assert_eq!(LodAction::Cull.status(true), NodeStatus::OutOfFrustum);
        assert_eq!(LodAction::Unload.status(false), NodeStatus::OutOfRange);
        assert_eq!(LodAction::Split.status(false), NodeStatus::Subdivided);
        assert_eq!(LodAction::Leaf.status(true), NodeStatus::Active);
        assert_eq!(LodAction::Leaf.status(false), NodeStatus::NeedsTransfer);
    }
}
