//! Screen edges in map coordinates and the per-layer tile windows they cover.

use vecmap_tile::{GLOBAL_OFS_X, GLOBAL_OFS_Y, TILE_SHIFTS, TOP_LAYER, TilePosition};

/// Scale factors above which each finer layer is selected, coarse to fine.
pub const LAYER_SCALE_THRESHOLDS: [f32; 4] = [300.0, 900.0, 3000.0, 12000.0];

/// Most zoomed-out scale factor.
pub const MIN_SCALE: f32 = 128.0;

/// Most zoomed-in scale factor.
pub const MAX_SCALE: f32 = 64.0 * 65536.0;

const NEAR_PLANE: f32 = 0.01;

/// Desired layer for a zoom scale factor. Larger scales pick finer layers.
#[must_use]
pub fn layer_for_scale(scale: f32) -> u8 {
    let n = LAYER_SCALE_THRESHOLDS.len();
    for k in (0..n).rev() {
        if scale > LAYER_SCALE_THRESHOLDS[k] {
            return (n - 1 - k) as u8;
        }
    }
    TOP_LAYER
}

/// Clamps a scale factor to the supported zoom range.
#[must_use]
pub fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Camera height above the map plane for a scale factor.
#[must_use]
pub fn camera_distance(scale: f32) -> f32 {
    1000.0 * 1024.0 / scale
}

/// Visible rectangle in offset map coordinates (global offset removed),
/// inclusive on all sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenEdges {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl ScreenEdges {
    #[must_use]
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Edges seen by a camera looking straight down at `center`.
    ///
    /// `aspect` is width over height.
    #[must_use]
    pub fn from_camera(center: [f32; 2], scale: f32, aspect: f32) -> Self {
        let f = camera_distance(scale) / NEAR_PLANE;
        let [cx, cy] = center;
        Self {
            x0: (cx - f * aspect + 0.5) as i32,
            y0: (cy - f + 0.5) as i32,
            x1: (cx + f * aspect + 0.5) as i32,
            y1: (cy + f + 0.5) as i32,
        }
    }

    /// Edges exactly covering one tile.
    #[must_use]
    pub fn from_tile(pos: TilePosition) -> Self {
        let size = i64::from(pos.size());
        let x0 = i64::from(pos.tx()) * size - i64::from(GLOBAL_OFS_X);
        let y0 = i64::from(pos.ty()) * size - i64::from(GLOBAL_OFS_Y);
        Self {
            x0: saturate(x0),
            y0: saturate(y0),
            x1: saturate(x0 + size - 1),
            y1: saturate(y0 + size - 1),
        }
    }

    #[must_use]
    pub fn intersects(&self, other: &ScreenEdges) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1 && self.y0 <= other.y1 && other.y0 <= self.y1
    }

    #[must_use]
    pub fn width(&self) -> i64 {
        i64::from(self.x1) - i64::from(self.x0)
    }

    #[must_use]
    pub fn height(&self) -> i64 {
        i64::from(self.y1) - i64::from(self.y0)
    }

    /// Tile index window at `layer`. Not clamped to the valid index range.
    #[must_use]
    pub fn tile_edges(&self, layer: u8) -> TileEdges {
        let shift = TILE_SHIFTS[layer as usize];
        let index = |edge: i32, ofs: i32| saturate((i64::from(ofs) + i64::from(edge)) >> shift);
        TileEdges {
            tx0: index(self.x0, GLOBAL_OFS_X),
            ty0: index(self.y0, GLOBAL_OFS_Y),
            tx1: index(self.x1, GLOBAL_OFS_X),
            ty1: index(self.y1, GLOBAL_OFS_Y),
        }
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Inclusive window of tile indices within one layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileEdges {
    pub tx0: i32,
    pub ty0: i32,
    pub tx1: i32,
    pub ty1: i32,
}

impl TileEdges {
    /// The window of `layer - 1` indices covered by `pos`.
    #[must_use]
    pub fn children_of(pos: TilePosition) -> Self {
        let n = vecmap_tile::layers::children_per_axis(pos.layer()) as i32;
        let (tx, ty) = (pos.tx() as i32, pos.ty() as i32);
        Self {
            tx0: tx * n,
            ty0: ty * n,
            tx1: tx * n + n - 1,
            ty1: ty * n + n - 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx0 > self.tx1 || self.ty0 > self.ty1
    }

    #[must_use]
    pub fn contains(&self, tx: u32, ty: u32) -> bool {
        let (tx, ty) = (i64::from(tx), i64::from(ty));
        i64::from(self.tx0) <= tx
            && tx <= i64::from(self.tx1)
            && i64::from(self.ty0) <= ty
            && ty <= i64::from(self.ty1)
    }

    #[must_use]
    pub fn intersect(&self, other: &TileEdges) -> TileEdges {
        TileEdges {
            tx0: self.tx0.max(other.tx0),
            ty0: self.ty0.max(other.ty0),
            tx1: self.tx1.min(other.tx1),
            ty1: self.ty1.min(other.ty1),
        }
    }

    /// Grows the window by `margin` tiles on every side.
    #[must_use]
    pub fn expand(&self, margin: i32) -> TileEdges {
        TileEdges {
            tx0: self.tx0.saturating_sub(margin),
            ty0: self.ty0.saturating_sub(margin),
            tx1: self.tx1.saturating_add(margin),
            ty1: self.ty1.saturating_add(margin),
        }
    }

    /// The same window one layer coarser, given the shift difference.
    #[must_use]
    pub fn coarser(&self, shift_diff: u32) -> TileEdges {
        TileEdges {
            tx0: self.tx0 >> shift_diff,
            ty0: self.ty0 >> shift_diff,
            tx1: self.tx1 >> shift_diff,
            ty1: self.ty1 >> shift_diff,
        }
    }

    /// Restricted to valid tile indices.
    #[must_use]
    pub fn clamped(&self) -> TileEdges {
        let max = TilePosition::MAX_INDEX as i32;
        TileEdges {
            tx0: self.tx0.max(0),
            ty0: self.ty0.max(0),
            tx1: self.tx1.min(max),
            ty1: self.ty1.min(max),
        }
    }

    /// Number of valid tiles in the window.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        let c = self.clamped();
        if c.is_empty() {
            return 0;
        }
        (c.tx1 - c.tx0 + 1) as usize * (c.ty1 - c.ty0 + 1) as usize
    }

    /// Valid positions in the window at `layer`, row by row.
    pub fn positions(&self, layer: u8) -> impl Iterator<Item = TilePosition> + use<> {
        let c = self.clamped();
        let (xs, ys) = if c.is_empty() {
            (0..0, 0..0)
        } else {
            (c.tx0 as u32..c.tx1 as u32 + 1, c.ty0 as u32..c.ty1 as u32 + 1)
        };
        ys.flat_map(move |ty| {
            xs.clone()
                .filter_map(move |tx| TilePosition::new(layer, tx, ty))
        })
    }
}

/// Tile edges of every layer for one set of screen edges.
pub(crate) fn all_tile_edges(edges: &ScreenEdges) -> [TileEdges; vecmap_tile::NR_LAYERS] {
    std::array::from_fn(|layer| edges.tile_edges(layer as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_for_scale_thresholds() {
        assert_eq!(layer_for_scale(MIN_SCALE), 4);
        assert_eq!(layer_for_scale(300.0), 4);
        assert_eq!(layer_for_scale(301.0), 3);
        assert_eq!(layer_for_scale(900.0), 3);
        assert_eq!(layer_for_scale(901.0), 2);
        assert_eq!(layer_for_scale(3001.0), 1);
        assert_eq!(layer_for_scale(12001.0), 0);
        assert_eq!(layer_for_scale(MAX_SCALE), 0);
    }

    #[test]
    fn test_clamp_scale() {
        assert_eq!(clamp_scale(1.0), MIN_SCALE);
        assert_eq!(clamp_scale(1e9), MAX_SCALE);
        assert_eq!(clamp_scale(4096.0), 4096.0);
    }

    #[test]
    fn test_from_camera_is_centered() {
        // scale 4096: distance 250, f = 25000; rounding truncates toward zero
        let edges = ScreenEdges::from_camera([0.0, -30000.0], 4096.0, 2.0);
        assert_eq!(edges, ScreenEdges::new(-49999, -54999, 50000, -4999));
        assert_eq!(edges.width(), 99_999);
        assert_eq!(edges.height(), 50_000);
    }

    #[test]
    fn test_from_tile_covers_tile_exactly() {
        let pos = TilePosition::new(4, 2, 24).unwrap();
        let edges = ScreenEdges::from_tile(pos);
        assert_eq!(edges, ScreenEdges::new(124288, 91456, 386431, 353599));

        let te = edges.tile_edges(4);
        assert_eq!((te.tx0, te.ty0, te.tx1, te.ty1), (2, 24, 2, 24));
        let te = edges.tile_edges(3);
        assert_eq!((te.tx0, te.ty0, te.tx1, te.ty1), (4, 48, 5, 49));
        assert_eq!(edges.tile_edges(3), TileEdges::children_of(pos));
    }

    #[test]
    fn test_intersects() {
        let a = ScreenEdges::from_tile(TilePosition::new(4, 2, 24).unwrap());
        let b = ScreenEdges::from_tile(TilePosition::new(4, 3, 24).unwrap());
        let c = ScreenEdges::new(386431, 91456, 386431, 91456);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(b.intersects(&ScreenEdges::new(386000, 100000, 400000, 100001)));
    }

    #[test]
    fn test_positions_are_clamped() {
        let edges = TileEdges {
            tx0: -1,
            ty0: 16382,
            tx1: 0,
            ty1: 16390,
        };
        let positions: Vec<_> = edges.positions(0).collect();
        assert_eq!(
            positions,
            vec![
                TilePosition::new(0, 0, 16382).unwrap(),
                TilePosition::new(0, 0, 16383).unwrap(),
            ]
        );
        assert_eq!(edges.tile_count(), 2);
    }

    #[test]
    fn test_empty_window_yields_nothing() {
        let edges = TileEdges {
            tx0: 5,
            ty0: 0,
            tx1: 4,
            ty1: 3,
        };
        assert!(edges.is_empty());
        assert_eq!(edges.positions(1).count(), 0);
        assert_eq!(edges.tile_count(), 0);
    }
}
