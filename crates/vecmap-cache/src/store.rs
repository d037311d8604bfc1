//! Render-thread facade over the cache and the background loader.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::debug;
use vecmap_tile::{DecodedTile, TOP_LAYER, TilePosition};

use crate::cache::{StoreStats, TileCache};
use crate::error::StoreError;
use crate::loader::BackgroundLoader;
use crate::source::TileSource;

/// Called for each evicted tile so the renderer can free its GPU buffers.
pub type ReleaseHook = Arc<dyn Fn(TilePosition, &DecodedTile) + Send + Sync>;

/// Store construction options.
#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Spawn a worker that pre-loads candidate tiles.
    pub background_loading: bool,
    /// Name of the loader thread.
    pub loader_thread_name: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            background_loading: true,
            loader_thread_name: "tile-loader".to_string(),
        }
    }
}

/// Tile store driven by the render thread.
///
/// Each candidate update evicts tiles that are neither candidates, nor in the
/// caller's active set, nor on the top layer, and refills the loader queue.
pub struct TileStore {
    cache: Arc<TileCache>,
    loader: Option<BackgroundLoader>,
    candidates: FxHashSet<TilePosition>,
    release: Option<ReleaseHook>,
}

impl TileStore {
    /// Inventories `source` and starts the loader if enabled.
    pub fn new(source: Arc<dyn TileSource>, options: &StoreOptions) -> Result<Self, StoreError> {
        let cache = Arc::new(TileCache::new(source)?);
        let loader = if options.background_loading {
            Some(BackgroundLoader::spawn(
                Arc::clone(&cache),
                &options.loader_thread_name,
            )?)
        } else {
            None
        };
        Ok(Self {
            cache,
            loader,
            candidates: FxHashSet::default(),
            release: None,
        })
    }

    /// Installs the eviction callback.
    pub fn with_release_hook(mut self, hook: ReleaseHook) -> Self {
        self.release = Some(hook);
        self
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// See [`TileCache::get`].
    pub fn get(&self, pos: TilePosition) -> Option<Arc<DecodedTile>> {
        self.cache.get(pos)
    }

    pub fn is_loaded(&self, pos: TilePosition) -> bool {
        self.cache.is_loaded(pos)
    }

    /// The most recent candidate set.
    pub fn candidates(&self) -> &FxHashSet<TilePosition> {
        &self.candidates
    }

    /// Replaces the candidate set, evicts unneeded tiles and requeues the loader.
    ///
    /// `candidates` is in load priority order. Positions in `active` are
    /// currently being drawn and are kept. Returns the number of evicted tiles.
    pub fn update_candidates(
        &mut self,
        candidates: &[TilePosition],
        active: &FxHashSet<TilePosition>,
    ) -> usize {
        self.candidates = candidates.iter().copied().collect();

        let wanted = &self.candidates;
        let evicted = self.cache.evict_if(|pos, _| {
            pos.layer() != TOP_LAYER && !wanted.contains(&pos) && !active.contains(&pos)
        });
        if let Some(release) = &self.release {
            for (pos, tile) in &evicted {
                release(*pos, tile);
            }
        }

        if let Some(loader) = &self.loader {
            let cache = &self.cache;
            loader.replace_queue(candidates.iter().copied().filter(|&pos| {
                cache.exists(pos) && !cache.is_loaded(pos) && !cache.has_failed(pos)
            }));
        }

        debug!(
            "Candidates updated: {} wanted, {} evicted, {} cached",
            self.candidates.len(),
            evicted.len(),
            self.cache.len()
        );
        evicted.len()
    }

    /// Positions waiting in the loader queue.
    pub fn pending_loads(&self) -> usize {
        self.loader.as_ref().map_or(0, BackgroundLoader::pending)
    }

    pub fn stats(&self) -> StoreStats {
        self.cache.stats()
    }

    /// Stops the loader thread. Synchronous `get` keeps working.
    pub fn shutdown(&mut self) {
        if let Some(mut loader) = self.loader.take() {
            loader.shutdown();
        }
    }
}
