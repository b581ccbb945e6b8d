//! Height sources and the multi-octave fractal Brownian motion (fBm) heightmap sampler.
//!
//! Composites multiple octaves of simplex noise to produce natural-looking
//! terrain height values with features at many spatial frequencies.

use glam::Vec3;
use noise::{NoiseFn, Simplex};

use crate::TerrainError;

/// A deterministic elevation function over the horizontal plane.
pub trait HeightSource: Send + Sync {
    /// Elevation at world-space `(x, z)`.
    fn height(&self, x: f64, z: f64) -> f64;

    /// Sample a `resolution × resolution` row-major grid starting at `origin`.
    ///
    /// Sample `(i, j)` is taken at `(origin.x + i * spacing, origin.z + j * spacing)`
    /// and offset by `origin.y`. Storage is reserved fallibly so that running
    /// out of memory surfaces as [`TerrainError::ResourceExhausted`].
    fn sample_grid(
        &self,
        origin: Vec3,
        resolution: usize,
        spacing: f32,
    ) -> Result<Vec<f32>, TerrainError> {
        let count = resolution
            .checked_mul(resolution)
            .ok_or(TerrainError::ResourceExhausted { samples: usize::MAX })?;
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(count)
            .map_err(|_| TerrainError::ResourceExhausted { samples: count })?;

        let (x0, z0) = (f64::from(origin.x), f64::from(origin.z));
        let step = f64::from(spacing);
        for j in 0..resolution {
            let z = z0 + j as f64 * step;
            for i in 0..resolution {
                let x = x0 + i as f64 * step;
                samples.push(origin.y + self.height(x, z) as f32);
            }
        }
        Ok(samples)
    }
}

impl<F> HeightSource for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn height(&self, x: f64, z: f64) -> f64 {
        self(x, z)
    }
}

/// Configuration for multi-octave fBm noise used in heightmap generation.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapParams {
    /// World seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first (lowest) octave.
    pub base_frequency: f64,
    /// Amplitude of the first octave in world units.
    pub amplitude: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            amplitude: 4000.0,
            base_frequency: 0.001,
        }
    }
}

/// Generates terrain height values using fractal Brownian motion over simplex noise.
///
/// Each successive octave multiplies frequency by `lacunarity` and amplitude by
/// `persistence`, producing self-similar detail at progressively finer scales.
pub struct HeightmapSampler {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapSampler {
    /// Create a new sampler with the given parameters.
    pub fn new(params: HeightmapParams) -> Self {
        let noise = Simplex::new(params.seed as u32);
        Self { noise, params }
    }

    /// Sample the heightmap at a horizontal world coordinate.
    ///
    /// The result lies within `[-max_amplitude, +max_amplitude]`.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        total
    }

    /// Theoretical maximum absolute height (geometric series of octave amplitudes).
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.params.amplitude;
        for _ in 0..self.params.octaves {
            sum += amp;
            amp *= self.params.persistence;
        }
        sum
    }

    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}

impl HeightSource for HeightmapSampler {
    fn height(&self, x: f64, z: f64) -> f64 {
        self.sample(x, z)
    }
}
