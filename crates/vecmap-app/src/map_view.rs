//! The interface the renderer drives once per frame.

use std::sync::Arc;

use tracing::debug;
use vecmap_cache::{ReleaseHook, StoreError, StoreOptions, StoreStats, TileSource, TileStore};
use vecmap_config::Config;
use vecmap_lod::{CandidateTracker, DrawItem, LodConfig, LodTree, ScreenEdges, layer_for_scale};
use vecmap_tile::{DecodedTile, TilePosition};

/// Owns the tile store, the LOD tree and the candidate tracker.
///
/// Render-thread only. The store's loader thread is the one other thread
/// touching tile data.
pub struct MapView {
    store: TileStore,
    tree: LodTree,
    tracker: CandidateTracker,
    background_loading: bool,
}

impl MapView {
    /// Inventories `source` and starts the loader if `config.loader.enabled`.
    pub fn new(source: Arc<dyn TileSource>, config: &Config) -> Result<Self, StoreError> {
        let options = StoreOptions {
            background_loading: config.loader.enabled,
            loader_thread_name: config.loader.thread_name.clone(),
        };
        let store = TileStore::new(source, &options)?;
        let tree = LodTree::new(&LodConfig {
            blend_duration_secs: config.lod.blend_duration_secs,
        });
        Ok(Self {
            store,
            tree,
            tracker: CandidateTracker::new(),
            background_loading: config.loader.enabled,
        })
    }

    /// Installs the callback run for each evicted tile.
    pub fn with_release_hook(mut self, hook: ReleaseHook) -> Self {
        self.store = self.store.with_release_hook(hook);
        self
    }

    /// Advances one frame and returns the tiles to draw, parents first.
    ///
    /// When the view changes materially the candidate set is refreshed, which
    /// evicts tiles nobody needs and refills the loader queue. Tiles the tree
    /// still blends are kept. Without a loader the candidates are decoded
    /// here, on the calling thread.
    pub fn get_draw_order(
        &mut self,
        edges: ScreenEdges,
        scale_factor: f32,
        elapsed_seconds: f32,
    ) -> Vec<DrawItem> {
        if let Some(candidates) = self.tracker.update(&edges, layer_for_scale(scale_factor)) {
            let active = self.tree.active_positions();
            self.store.update_candidates(&candidates, &active);
            if !self.background_loading {
                self.load_now(&candidates);
            }
        }

        let store = &self.store;
        self.tree.get_draw_order(
            edges,
            scale_factor,
            elapsed_seconds,
            &|pos: TilePosition| store.is_loaded(pos),
        )
    }

    fn load_now(&self, candidates: &[TilePosition]) {
        let cache = self.store.cache();
        let loaded = candidates
            .iter()
            .filter(|&&pos| cache.exists(pos) && !cache.is_loaded(pos))
            .filter_map(|&pos| cache.get(pos))
            .count();
        if loaded > 0 {
            debug!("Loaded {loaded} candidate tiles synchronously");
        }
    }

    /// Whether `pos` is decoded and resident. Never blocks on I/O.
    pub fn is_loaded(&self, pos: TilePosition) -> bool {
        self.store.is_loaded(pos)
    }

    /// Geometry for `pos`, decoding it now if needed.
    pub fn tile(&self, pos: TilePosition) -> Option<Arc<DecodedTile>> {
        self.store.get(pos)
    }

    /// Tiles the source holds.
    pub fn inventory_size(&self) -> usize {
        self.store.cache().inventory().len()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Nodes currently in the LOD tree.
    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    pub fn pending_loads(&self) -> usize {
        self.store.pending_loads()
    }

    /// Stops the loader thread.
    pub fn shutdown(&mut self) {
        self.store.shutdown();
    }
}
