//! Tiles worth having in the cache for the current view, in load priority order.

use rustc_hash::FxHashSet;
use tracing::debug;
use vecmap_tile::{TILE_SHIFTS, TOP_LAYER, TilePosition};

use crate::viewport::{ScreenEdges, TileEdges};

/// Candidate tiles for `edges` viewed at `layer`:
///
/// 1. on-screen tiles at `layer`
/// 2. the one-tile ring around them
/// 3. the next coarser layer's covering tiles plus a one-tile margin
/// 4. the next finer layer's on-screen tiles
///
/// Duplicates and out-of-range indices are dropped.
pub fn compute_candidates(edges: &ScreenEdges, layer: u8) -> Vec<TilePosition> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let mut push = |layer: u8, tx: i32, ty: i32| {
        let (Ok(tx), Ok(ty)) = (u32::try_from(tx), u32::try_from(ty)) else {
            return;
        };
        if let Some(pos) = TilePosition::new(layer, tx, ty)
            && seen.insert(pos)
        {
            out.push(pos);
        }
    };

    // One tile past the valid range keeps the ring intact and the loops bounded.
    let max = TilePosition::MAX_INDEX as i32 + 1;
    let on_screen = edges.tile_edges(layer).intersect(&TileEdges {
        tx0: -1,
        ty0: -1,
        tx1: max,
        ty1: max,
    });
    let TileEdges { tx0, ty0, tx1, ty1 } = on_screen;
    if !on_screen.is_empty() {
        for ty in ty0..=ty1 {
            for tx in tx0..=tx1 {
                push(layer, tx, ty);
            }
        }

        for tx in tx0 - 1..=tx1 + 1 {
            push(layer, tx, ty0 - 1);
            push(layer, tx, ty1 + 1);
        }
        for ty in ty0..=ty1 {
            push(layer, tx0 - 1, ty);
            push(layer, tx1 + 1, ty);
        }

        if layer < TOP_LAYER {
            let diff = TILE_SHIFTS[layer as usize + 1] - TILE_SHIFTS[layer as usize];
            let coarse = on_screen.coarser(diff).expand(1).clamped();
            for ty in coarse.ty0..=coarse.ty1 {
                for tx in coarse.tx0..=coarse.tx1 {
                    push(layer + 1, tx, ty);
                }
            }
        }
    }

    if layer > 0 {
        let fine = edges.tile_edges(layer - 1).clamped();
        for ty in fine.ty0..=fine.ty1 {
            for tx in fine.tx0..=fine.tx1 {
                push(layer - 1, tx, ty);
            }
        }
    }

    out
}

/// Recomputes candidates only when the view changes materially: a different
/// layer, or a different tile window one layer finer than it.
#[derive(Debug, Default)]
pub struct CandidateTracker {
    last: Option<(u8, TileEdges)>,
}

impl CandidateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// New candidates if the view changed since the last call, else `None`.
    pub fn update(&mut self, edges: &ScreenEdges, layer: u8) -> Option<Vec<TilePosition>> {
        let window = edges.tile_edges(layer.saturating_sub(1));
        if self.last == Some((layer, window)) {
            return None;
        }
        self.last = Some((layer, window));
        debug!(
            "Tile set changed: layer {layer}, window {},{} - {},{}",
            window.tx0, window.ty0, window.tx1, window.ty1
        );
        Some(compute_candidates(edges, layer))
    }

    /// Forces the next update to recompute.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
