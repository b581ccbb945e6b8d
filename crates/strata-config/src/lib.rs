//! Configuration for Strata terrain runs.
//!
//! Settings persist to disk as `config.ron`, can be overridden from the command
//! line, and tolerate missing or unknown fields so older and newer files keep
//! loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CacheConfig, CameraConfig, Config, DebugConfig, HeightmapConfig, TerrainConfig};
pub use error::ConfigError;

use std::path::PathBuf;

/// Default configuration directory: `<platform config dir>/strata`.
///
/// Falls back to the working directory when the platform reports none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("strata"))
        .unwrap_or_else(|| PathBuf::from("."))
}
