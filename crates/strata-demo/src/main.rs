//! Strata terrain driver: flies a camera around procedurally generated terrain
//! and runs the LOD quadtree frame by frame against in-memory GPU stand-ins.

mod backend;
mod setup;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use strata_config::{CliArgs, Config};
use strata_lod::{LodError, TerrainQuadtree};
use strata_terrain::HeightmapSampler;
use tracing::{error, info};

use crate::backend::{LoggingRenderer, MemoryUploader};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .unwrap_or_else(strata_config::default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    if let Err(e) = strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "terrain run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), LodError> {
    let settings = setup::quadtree_settings(config);
    let sampler = HeightmapSampler::new(setup::heightmap_params(&config.heightmap));
    info!(
        seed = config.heightmap.seed,
        max_height = sampler.max_amplitude(),
        "heightmap ready"
    );

    let mut tree = TerrainQuadtree::new(settings.clone(), Arc::new(sampler))?;
    let mut uploader = MemoryUploader::default();
    let mut renderer = LoggingRenderer::default();
    let projection = setup::projection(&config.camera);
    let frames = config.debug.frames;

    for frame in 0..frames {
        let turns = frame as f32 / frames.max(1) as f32;
        let (eye, view) = setup::orbit_camera(&config.camera, &settings, turns);

        let stats = tree.update_frame(eye, &view, &projection)?;
        let transfers = tree.process_transfers(&mut uploader);
        let draws = tree.submit(&mut renderer)?;

        info!(
            frame = stats.frame,
            nodes = tree.node_count(),
            leaves = stats.leaves(),
            splits = stats.splits,
            merges = stats.merges,
            culled = stats.culled,
            uploaded = transfers.uploaded,
            released = transfers.released,
            draws,
            "frame"
        );
    }

    let cache = tree.cache().stats();
    let released = tree.release_all(&mut uploader).released;
    info!(
        frames,
        total_draws = renderer.total_draws,
        uploads = uploader.uploaded_total(),
        released,
        resident_geometry = uploader.resident(),
        resident_bytes = uploader.resident_bytes(),
        cache_hits = cache.hits,
        cache_misses = cache.misses,
        cache_evictions = cache.evictions,
        cached_tiles = cache.resident,
        "terrain run finished"
    );
    Ok(())
}
