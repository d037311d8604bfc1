//! Decode-once tile cache over a [`TileSource`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::{DashMap, DashSet};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};
use vecmap_tile::{DecodedTile, TileDecoder, TilePosition};

use crate::error::{LoadError, SourceError};
use crate::source::TileSource;

/// Counters describing cache activity since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Tiles successfully decoded.
    pub decoded: u64,
    /// Tiles that failed to load and will not be retried.
    pub failed: u64,
    /// Tiles removed by eviction.
    pub evicted: u64,
    /// Vertex and index bytes of all cached tiles.
    pub resident_bytes: usize,
}

/// Maps tile positions to decoded geometry.
///
/// Lookups go through a concurrent map. A miss takes the decoder lock, checks
/// again and only then decodes, so each position is decoded at most once no
/// matter how many threads ask for it. Positions that fail to load are
/// remembered and never retried.
pub struct TileCache {
    source: Arc<dyn TileSource>,
    inventory: FxHashSet<TilePosition>,
    tiles: DashMap<TilePosition, Arc<DecodedTile>>,
    failed: DashSet<TilePosition>,
    decoder: Mutex<TileDecoder>,
    decoded: AtomicU64,
    failed_count: AtomicU64,
    evicted: AtomicU64,
    resident_bytes: AtomicUsize,
}

impl TileCache {
    /// Inventories `source` without loading any tile.
    ///
    /// File names that do not parse as a tile position are skipped.
    pub fn new(source: Arc<dyn TileSource>) -> Result<Self, SourceError> {
        let mut inventory = FxHashSet::default();
        for name in source.list_tile_files()? {
            match TilePosition::from_file_name(&name) {
                Some(pos) => {
                    inventory.insert(pos);
                }
                None => debug!("Skipping unrecognized tile file {name}"),
            }
        }
        debug!("Tile inventory holds {} tiles", inventory.len());

        Ok(Self {
            source,
            inventory,
            tiles: DashMap::new(),
            failed: DashSet::new(),
            decoder: Mutex::new(TileDecoder::new()),
            decoded: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            resident_bytes: AtomicUsize::new(0),
        })
    }

    /// Positions for which the source holds a tile file.
    pub fn inventory(&self) -> &FxHashSet<TilePosition> {
        &self.inventory
    }

    /// Whether the source holds a tile at `pos`.
    pub fn exists(&self, pos: TilePosition) -> bool {
        self.inventory.contains(&pos)
    }

    /// Returns the tile at `pos`, decoding it on a miss.
    ///
    /// `None` if the tile is not in the inventory or failed to load.
    pub fn get(&self, pos: TilePosition) -> Option<Arc<DecodedTile>> {
        if !self.inventory.contains(&pos) {
            return None;
        }
        if let Some(tile) = self.cached(pos) {
            return Some(tile);
        }
        if self.failed.contains(&pos) {
            return None;
        }

        let mut decoder = self.decoder.lock().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have finished this tile while we waited.
        if let Some(tile) = self.cached(pos) {
            return Some(tile);
        }
        if self.failed.contains(&pos) {
            return None;
        }

        match self.load(&mut decoder, pos) {
            Ok(tile) => {
                let tile = Arc::new(tile);
                self.resident_bytes
                    .fetch_add(tile.byte_size(), Ordering::Relaxed);
                self.decoded.fetch_add(1, Ordering::Relaxed);
                self.tiles.insert(pos, Arc::clone(&tile));
                debug!(
                    "Loaded tile {pos} ({} tris, {} verts)",
                    tile.triangle_count(),
                    tile.vertex_count()
                );
                Some(tile)
            }
            Err(err) => {
                warn!("Failed to load tile {pos}: {err}");
                self.failed.insert(pos);
                self.failed_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn cached(&self, pos: TilePosition) -> Option<Arc<DecodedTile>> {
        self.tiles.get(&pos).map(|entry| Arc::clone(entry.value()))
    }

    fn load(&self, decoder: &mut TileDecoder, pos: TilePosition) -> Result<DecodedTile, LoadError> {
        let reader = self.source.open(&pos.file_name())?;
        let tile = decoder.decode(reader)?;
        if tile.position() != pos {
            debug!("Tile file for {pos} declares position {}", tile.position());
        }
        Ok(tile)
    }

    /// Non-blocking check whether `pos` is decoded and cached.
    pub fn is_loaded(&self, pos: TilePosition) -> bool {
        self.tiles.contains_key(&pos)
    }

    /// Whether `pos` failed to load earlier in this session.
    pub fn has_failed(&self, pos: TilePosition) -> bool {
        self.failed.contains(&pos)
    }

    /// Removes every cached tile for which `evict` returns true and hands the
    /// removed entries back.
    pub fn evict_if(
        &self,
        mut evict: impl FnMut(TilePosition, &DecodedTile) -> bool,
    ) -> Vec<(TilePosition, Arc<DecodedTile>)> {
        let mut removed = Vec::new();
        self.tiles.retain(|&pos, tile| {
            if evict(pos, tile) {
                removed.push((pos, Arc::clone(tile)));
                false
            } else {
                true
            }
        });

        let bytes: usize = removed.iter().map(|(_, tile)| tile.byte_size()).sum();
        self.resident_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.evicted
            .fetch_add(removed.len() as u64, Ordering::Relaxed);
        removed
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            decoded: self.decoded.load(Ordering::Relaxed),
            failed: self.failed_count.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            resident_bytes: self.resident_bytes.load(Ordering::Relaxed),
        }
    }
}
