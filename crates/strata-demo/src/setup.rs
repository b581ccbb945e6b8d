//! Translating loaded configuration into terrain and camera parameters.

use glam::{Mat4, Vec3};
use strata_config::{CameraConfig, Config, HeightmapConfig};
use strata_lod::{CachePolicy, QuadtreeSettings};
use strata_terrain::HeightmapParams;

pub fn quadtree_settings(config: &Config) -> QuadtreeSettings {
    let terrain = &config.terrain;
    QuadtreeSettings::new(
        terrain.split_factor,
        terrain.max_lod,
        terrain.root_side_length,
        Vec3::from_array(terrain.root_position),
    )
    .with_merge_factor(terrain.merge_factor)
    .with_max_render_distance(terrain.max_render_distance)
    .with_tile_resolution(terrain.tile_resolution)
    .with_cache_policy(CachePolicy {
        max_tiles: (config.cache.max_tiles > 0).then_some(config.cache.max_tiles),
        worker_threads: config.cache.worker_threads,
    })
}

pub fn heightmap_params(config: &HeightmapConfig) -> HeightmapParams {
    HeightmapParams {
        seed: config.seed,
        octaves: config.octaves,
        lacunarity: config.lacunarity,
        persistence: config.persistence,
        base_frequency: config.base_frequency,
        amplitude: config.amplitude,
    }
}

pub fn projection(camera: &CameraConfig) -> Mat4 {
    Mat4::perspective_rh(
        camera.fov_y_degrees.to_radians(),
        camera.aspect,
        camera.near,
        camera.far,
    )
}

/// Camera orbiting the root center, `turns` of a full circle in.
///
/// Returns the eye position and the view matrix looking at the center.
pub fn orbit_camera(camera: &CameraConfig, settings: &QuadtreeSettings, turns: f32) -> (Vec3, Mat4) {
    let half = settings.root_side_length * 0.5;
    let center = settings.root_position + Vec3::new(half, 0.0, half);
    let angle = turns * std::f32::consts::TAU;
    let eye = center
        + Vec3::new(
            angle.cos() * camera.orbit_radius,
            camera.orbit_height,
            angle.sin() * camera.orbit_radius,
        );
    (eye, Mat4::look_at_rh(eye, center, Vec3::Y))
}
