//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata terrain driver arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Adaptive LOD terrain quadtree driver")]
pub struct CliArgs {
    /// Subdivide when closer than this many node side lengths.
    #[arg(long)]
    pub split_factor: Option<f32>,

    /// Deepest subdivision level.
    #[arg(long)]
    pub max_lod: Option<u32>,

    /// Heightmap seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    ///
    /// Raising the split factor above the configured merge factor raises the
    /// merge factor with it.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(split) = args.split_factor {
            self.terrain.split_factor = split;
            self.terrain.merge_factor = self.terrain.merge_factor.max(split);
        }
        if let Some(max_lod) = args.max_lod {
            self.terrain.max_lod = max_lod;
        }
        if let Some(seed) = args.seed {
            self.heightmap.seed = seed;
        }
        if let Some(frames) = args.frames {
            self.debug.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            max_lod: Some(5),
            seed: Some(99),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.terrain.max_lod, 5);
        assert_eq!(config.heightmap.seed, 99);
        assert_eq!(config.debug.log_level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(config.terrain.split_factor, 2.0);
        assert_eq!(config.debug.frames, 120);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_split_override_keeps_merge_at_least_split() {
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs {
            split_factor: Some(3.0),
            ..Default::default()
        });
        assert_eq!(config.terrain.split_factor, 3.0);
        assert_eq!(config.terrain.merge_factor, 3.0);

        config.terrain.merge_factor = 4.0;
        config.apply_cli_overrides(&CliArgs {
            split_factor: Some(2.5),
            ..Default::default()
        });
        assert_eq!(config.terrain.merge_factor, 4.0);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "strata",
            "--split-factor",
            "1.5",
            "--frames",
            "10",
            "--config",
            "/tmp/strata",
        ]);
        assert_eq!(args.split_factor, Some(1.5));
        assert_eq!(args.frames, Some(10));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/strata")));
        assert_eq!(args.max_lod, None);
    }
}
