//! Fan-out of tile generation across scoped worker threads.
//!
//! Jobs go out over one channel and finished tiles come back over another.
//! The calling thread works the queue too, so generation still completes if no
//! worker thread could be spawned.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::warn;

use crate::{GridCoord, HeightCache, HeightTile, TerrainError};

type Job = (usize, GridCoord);
type Done = (usize, Result<Arc<HeightTile>, TerrainError>);

/// Generate `jobs` through `cache` using up to `workers` threads (caller included).
///
/// Returns `(index, tile)` pairs for every job, or the first error encountered.
pub(crate) fn generate(
    cache: &HeightCache,
    jobs: &[Job],
    workers: usize,
) -> Result<Vec<(usize, Arc<HeightTile>)>, TerrainError> {
    let (job_tx, job_rx) = unbounded::<Job>();
    let (done_tx, done_rx) = unbounded::<Done>();
    for job in jobs {
        // The receiver is alive for the whole scope, so sending cannot fail.
        let _ = job_tx.send(*job);
    }
    drop(job_tx);

    let extra = workers.min(jobs.len()).saturating_sub(1);
    std::thread::scope(|scope| {
        for _ in 0..extra {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            let spawned = std::thread::Builder::new()
                .name("tile-gen-worker".into())
                .spawn_scoped(scope, move || work(cache, &job_rx, &done_tx));
            if let Err(err) = spawned {
                warn!(%err, "failed to spawn tile generation worker; continuing on fewer threads");
                break;
            }
        }
        work(cache, &job_rx, &done_tx);
    });
    drop(done_tx);

    let mut tiles = Vec::with_capacity(jobs.len());
    for (index, result) in done_rx.try_iter() {
        tiles.push((index, result?));
    }
    Ok(tiles)
}

fn work(cache: &HeightCache, jobs: &Receiver<Job>, done: &Sender<Done>) {
    while let Ok((index, coord)) = jobs.recv() {
        let _ = done.send((index, cache.get_or_create(coord)));
    }
}
