//! Shared height-tile cache keyed by grid coordinate.
//!
//! Each coordinate owns a slot guarded by its own mutex. The first request for
//! a coordinate generates the tile while holding that slot; concurrent requests
//! for the same coordinate wait on the slot and reuse the result, so every tile
//! is materialized at most once. Requests for different coordinates never
//! contend beyond the brief map-shard lock used to find the slot.
//!
//! Tiles are handed out as `Arc`s. The cache only drops a tile when nothing
//! outside the cache still references it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::parallel;
use crate::{GridCoord, HeightSource, HeightTile, TerrainError, TileLayout};

type Slot = Arc<Mutex<Option<Arc<HeightTile>>>>;

/// Eviction and generation settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    /// Soft bound on resident tiles. When exceeded after a miss, tiles no node
    /// references are evicted; referenced tiles are always kept.
    pub max_tiles: Option<usize>,
    /// Worker threads used by [`HeightCache::get_or_create_many`]. `0` means one
    /// per logical CPU.
    pub worker_threads: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_tiles: Some(4096),
            worker_threads: 0,
        }
    }
}

impl CachePolicy {
    /// Resolved worker count, at least 1.
    pub fn workers(&self) -> usize {
        match self.worker_threads {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

/// Counters describing cache activity since construction or the last [`HeightCache::clear`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub resident: usize,
}

/// Generate-once, reference-counted store of height tiles.
pub struct HeightCache {
    layout: TileLayout,
    source: Arc<dyn HeightSource>,
    policy: CachePolicy,
    slots: DashMap<GridCoord, Slot>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl HeightCache {
    pub fn new(layout: TileLayout, source: Arc<dyn HeightSource>, policy: CachePolicy) -> Self {
        Self {
            layout,
            source,
            policy,
            slots: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Return the tile for `coord`, generating it on first request.
    ///
    /// A failed generation leaves the coordinate empty, so a later request
    /// tries again.
    pub fn get_or_create(&self, coord: GridCoord) -> Result<Arc<HeightTile>, TerrainError> {
        let slot = Arc::clone(&self.slots.entry(coord).or_default());
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tile) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(%coord, "height cache hit");
            return Ok(Arc::clone(tile));
        }

        let tile = Arc::new(HeightTile::generate(
            coord,
            &self.layout,
            self.source.as_ref(),
        )?);
        *guard = Some(Arc::clone(&tile));
        drop(guard);
        drop(slot);

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(%coord, min = tile.min_height(), max = tile.max_height(), "generated height tile");
        self.enforce_budget();
        Ok(tile)
    }

    /// Return tiles for every coordinate, in request order.
    ///
    /// When two or more coordinates are missing they are generated concurrently
    /// on worker threads; each still goes through the generate-once path.
    pub fn get_or_create_many(
        &self,
        coords: &[GridCoord],
    ) -> Result<Vec<Arc<HeightTile>>, TerrainError> {
        let mut tiles: Vec<Option<Arc<HeightTile>>> =
            coords.iter().map(|c| self.peek(*c)).collect();
        let missing: Vec<(usize, GridCoord)> = tiles
            .iter()
            .zip(coords)
            .enumerate()
            .filter(|(_, (tile, _))| tile.is_none())
            .map(|(i, (_, coord))| (i, *coord))
            .collect();

        let workers = self.policy.workers();
        if missing.len() >= 2 && workers > 1 {
            for (index, tile) in parallel::generate(self, &missing, workers)? {
                tiles[index] = Some(tile);
            }
        } else {
            for (index, coord) in missing {
                tiles[index] = Some(self.get_or_create(coord)?);
            }
        }

        let mut out = Vec::with_capacity(tiles.len());
        for (tile, coord) in tiles.into_iter().zip(coords) {
            out.push(match tile {
                Some(tile) => tile,
                None => self.get_or_create(*coord)?,
            });
        }
        Ok(out)
    }

    /// The resident tile for `coord`, without generating. Counts as a hit when found.
    ///
    /// Returns `None` while another thread is still generating the tile.
    pub fn peek(&self, coord: GridCoord) -> Option<Arc<HeightTile>> {
        let slot = Arc::clone(&*self.slots.get(&coord)?);
        let guard = slot.try_lock().ok()?;
        let tile = guard.as_ref().map(Arc::clone)?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(tile)
    }

    /// Whether a generated tile for `coord` is resident.
    pub fn contains(&self, coord: GridCoord) -> bool {
        self.slots
            .get(&coord)
            .is_some_and(|slot| slot.try_lock().is_ok_and(|guard| guard.is_some()))
    }

    /// Remove the tile for `coord` if nothing outside the cache references it.
    ///
    /// Returns `true` when an entry was removed.
    pub fn invalidate(&self, coord: GridCoord) -> bool {
        let removed = self
            .slots
            .remove_if(&coord, |_, slot| is_evictable(slot))
            .is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Drop every tile that only the cache references. Returns how many were dropped.
    pub fn evict_unreferenced(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !is_evictable(slot));
        let evicted = before.saturating_sub(self.slots.len());
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, resident = self.slots.len(), "evicted unreferenced height tiles");
        }
        evicted
    }

    /// Drop all tiles and reset the counters.
    pub fn clear(&self) {
        self.slots.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            resident: self.slots.len(),
        }
    }

    fn enforce_budget(&self) {
        if let Some(max) = self.policy.max_tiles
            && self.slots.len() > max
        {
            self.evict_unreferenced();
        }
    }
}

/// A slot can go when no request holds it and its tile (if any) is only
/// referenced by the slot itself. Callers hold the map shard's write lock, so
/// no new request can pick the slot up during the check.
fn is_evictable(slot: &Slot) -> bool {
    if Arc::strong_count(slot) != 1 {
        return false;
    }
    match slot.try_lock() {
        Ok(guard) => guard.as_ref().is_none_or(|tile| Arc::strong_count(tile) == 1),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use glam::Vec3;

    use super::*;

    fn counting_cache(calls: Arc<AtomicUsize>, policy: CachePolicy) -> HeightCache {
        let source = move |x: f64, z: f64| {
            calls.fetch_add(1, Ordering::SeqCst);
            x - z
        };
        HeightCache::new(
            TileLayout::new(Vec3::ZERO, 64.0, 3),
            Arc::new(source),
            policy,
        )
    }

    const SAMPLES_PER_TILE: usize = 9;

    #[test]
    fn test_repeated_requests_share_one_tile() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(Arc::clone(&calls), CachePolicy::default());
        let coord = GridCoord::new(2, 1, 3);

        let a = cache.get_or_create(coord).unwrap();
        let b = cache.get_or_create(coord).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), SAMPLES_PER_TILE);
        assert_eq!(Arc::strong_count(&a), 3);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.resident), (1, 1, 1));
    }

    #[test]
    fn test_concurrent_requests_materialize_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(Arc::clone(&calls), CachePolicy::default());
        let coord = GridCoord::new(3, 5, 2);

        let tiles: Vec<Arc<HeightTile>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.get_or_create(coord).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for tile in &tiles[1..] {
            assert!(Arc::ptr_eq(&tiles[0], tile));
        }
        assert_eq!(calls.load(Ordering::SeqCst), SAMPLES_PER_TILE);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_invalidate_respects_outstanding_references() {
        let cache = counting_cache(Arc::new(AtomicUsize::new(0)), CachePolicy::default());
        let coord = GridCoord::new(1, 0, 1);
        let tile = cache.get_or_create(coord).unwrap();

        assert!(!cache.invalidate(coord), "referenced tile must stay resident");
        assert!(cache.contains(coord));

        drop(tile);
        assert!(cache.invalidate(coord));
        assert!(!cache.contains(coord));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_evict_unreferenced_keeps_live_tiles() {
        let cache = counting_cache(Arc::new(AtomicUsize::new(0)), CachePolicy::default());
        let kept = cache.get_or_create(GridCoord::ROOT).unwrap();
        for coord in GridCoord::ROOT.children() {
            cache.get_or_create(coord).unwrap();
        }
        assert_eq!(cache.len(), 5);

        assert_eq!(cache.evict_unreferenced(), 4);
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&kept, &cache.peek(GridCoord::ROOT).unwrap()));
    }

    #[test]
    fn test_budget_evicts_after_miss() {
        let policy = CachePolicy {
            max_tiles: Some(2),
            worker_threads: 1,
        };
        let cache = counting_cache(Arc::new(AtomicUsize::new(0)), policy);
        let _root = cache.get_or_create(GridCoord::ROOT).unwrap();
        for coord in GridCoord::ROOT.children() {
            cache.get_or_create(coord).unwrap();
        }
        assert!(cache.len() <= 2, "resident = {}", cache.len());
        assert!(cache.contains(GridCoord::ROOT));
    }

    #[test]
    fn test_many_returns_tiles_in_request_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = CachePolicy {
            max_tiles: None,
            worker_threads: 4,
        };
        let cache = counting_cache(Arc::clone(&calls), policy);
        let hit = cache.get_or_create(GridCoord::new(1, 1, 1)).unwrap();

        let coords = [
            GridCoord::new(1, 0, 0),
            GridCoord::new(1, 1, 1),
            GridCoord::new(1, 1, 0),
            GridCoord::new(1, 0, 1),
        ];
        let tiles = cache.get_or_create_many(&coords).unwrap();
        assert_eq!(tiles.len(), 4);
        for (tile, coord) in tiles.iter().zip(coords) {
            assert_eq!(tile.coord(), coord);
        }
        assert!(Arc::ptr_eq(&tiles[1], &hit));
        assert_eq!(calls.load(Ordering::SeqCst), 4 * SAMPLES_PER_TILE);
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn test_failed_generation_can_be_retried() {
        let cache = counting_cache(Arc::new(AtomicUsize::new(0)), CachePolicy::default());
        let outside = GridCoord::new(1, 4, 4);
        assert!(cache.get_or_create(outside).is_err());
        assert!(!cache.contains(outside));
        assert!(cache.get_or_create(outside).is_err());
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = counting_cache(Arc::new(AtomicUsize::new(0)), CachePolicy::default());
        let tile = cache.get_or_create(GridCoord::ROOT).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
        // Outstanding references stay valid after the cache forgets them.
        assert_eq!(tile.coord(), GridCoord::ROOT);
    }
}
