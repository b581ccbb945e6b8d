//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Quadtree shape and LOD thresholds.
    pub terrain: TerrainConfig,
    /// Procedural height generation.
    pub heightmap: HeightmapConfig,
    /// Height tile cache.
    pub cache: CacheConfig,
    /// Demo camera.
    pub camera: CameraConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Terrain quadtree configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// A node subdivides when the camera is closer than `split_factor × side`.
    pub split_factor: f32,
    /// Subdivided nodes merge beyond `merge_factor × side`.
    pub merge_factor: f32,
    /// Deepest subdivision level.
    pub max_lod: u32,
    /// Edge length of the root footprint in world units.
    pub root_side_length: f32,
    /// Minimum corner of the root footprint.
    pub root_position: [f32; 3],
    /// Nodes farther than this are unloaded.
    pub max_render_distance: f32,
    /// Height samples per tile edge.
    pub tile_resolution: usize,
}

/// fBm heightmap configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeightmapConfig {
    pub seed: u64,
    pub octaves: u32,
    pub lacunarity: f64,
    pub persistence: f64,
    pub base_frequency: f64,
    /// First-octave amplitude in world units.
    pub amplitude: f64,
}

/// Height cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Soft bound on resident tiles (0 = unbounded).
    pub max_tiles: usize,
    /// Tile generation threads (0 = one per CPU).
    pub worker_threads: usize,
}

/// Camera used by the demo driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Horizontal distance of the orbit from the root center.
    pub orbit_radius: f32,
    /// Camera height above the root plane.
    pub orbit_height: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter override (e.g., "debug", "info,strata_lod=trace").
    pub log_level: String,
    /// Frames the demo driver simulates.
    pub frames: u32,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            split_factor: 2.0,
            merge_factor: 2.0,
            max_lod: 8,
            root_side_length: 16384.0,
            root_position: [-8192.0, 0.0, -8192.0],
            max_render_distance: 100_000.0,
            tile_resolution: 17,
        }
    }
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.001,
            amplitude: 400.0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_tiles: 4096,
            worker_threads: 0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.5,
            far: 50_000.0,
            orbit_radius: 2000.0,
            orbit_height: 600.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            frames: 120,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .map_err(ConfigError::read(&config_path))?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::write(config_dir))?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::write(&config_path))?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents =
            std::fs::read_to_string(&config_path).map_err(ConfigError::read(&config_path))?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
