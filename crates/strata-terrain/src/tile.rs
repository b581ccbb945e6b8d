//! A generated height tile: one grid cell's elevation samples.

use glam::Vec3;

use crate::{GridCoord, HeightSource, TerrainError, TileLayout};

/// Elevation samples covering one quadtree cell's footprint, edges included.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightTile {
    coord: GridCoord,
    origin: Vec3,
    resolution: usize,
    spacing: f32,
    samples: Vec<f32>,
    min_height: f32,
    max_height: f32,
}

impl HeightTile {
    /// Sample the tile for `coord` from `source`, placed according to `layout`.
    pub fn generate(
        coord: GridCoord,
        layout: &TileLayout,
        source: &dyn HeightSource,
    ) -> Result<Self, TerrainError> {
        layout.validate(coord)?;
        let origin = layout.origin(coord);
        let spacing = layout.sample_spacing(coord.level);
        let samples = source.sample_grid(origin, layout.resolution, spacing)?;
        Ok(Self::from_samples(
            coord,
            origin,
            layout.resolution,
            spacing,
            samples,
        ))
    }

    /// Wrap already-sampled data. `samples` must hold `resolution²` values.
    pub fn from_samples(
        coord: GridCoord,
        origin: Vec3,
        resolution: usize,
        spacing: f32,
        samples: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(samples.len(), resolution * resolution);
        let (min_height, max_height) = samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            });
        let (min_height, max_height) = if samples.is_empty() {
            (origin.y, origin.y)
        } else {
            (min_height, max_height)
        };
        Self {
            coord,
            origin,
            resolution,
            spacing,
            samples,
            min_height,
            max_height,
        }
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    /// Minimum corner of the footprint (before elevation).
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Samples per edge.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Edge length of the footprint.
    pub fn side_length(&self) -> f32 {
        self.spacing * (self.resolution.saturating_sub(1)) as f32
    }

    /// Row-major samples; row `j` runs along `+X` at `z = origin.z + j * spacing`.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample storage as raw bytes, for copying into a GPU buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.samples)
    }

    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// The sample at column `i`, row `j`.
    pub fn sample(&self, i: usize, j: usize) -> Option<f32> {
        if i >= self.resolution || j >= self.resolution {
            return None;
        }
        self.samples.get(j * self.resolution + i).copied()
    }

    /// Bilinearly interpolated elevation at world `(x, z)`, or `None` outside the footprint.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        if self.resolution < 2 {
            return None;
        }
        let u = (x - self.origin.x) / self.spacing;
        let v = (z - self.origin.z) / self.spacing;
        let last = (self.resolution - 1) as f32;
        if !(0.0..=last).contains(&u) || !(0.0..=last).contains(&v) {
            return None;
        }

        let i0 = (u.floor() as usize).min(self.resolution - 2);
        let j0 = (v.floor() as usize).min(self.resolution - 2);
        let (fu, fv) = (u - i0 as f32, v - j0 as f32);

        let h00 = self.sample(i0, j0)?;
        let h10 = self.sample(i0 + 1, j0)?;
        let h01 = self.sample(i0, j0 + 1)?;
        let h11 = self.sample(i0 + 1, j0 + 1)?;
        let top = h00 + (h10 - h00) * fu;
        let bottom = h01 + (h11 - h01) * fu;
        Some(top + (bottom - top) * fv)
    }
}
