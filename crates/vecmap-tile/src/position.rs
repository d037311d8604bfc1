//! Packed tile key: layer plus tile grid coordinates in one `u32`.

use std::fmt;

use crate::layers::{TOP_LAYER, children_per_axis, layer_for_size, tile_size};

/// Identifies one tile: `layer` (4 bits), `tx` and `ty` (14 bits each).
///
/// Packed as `(layer << 28) | (tx << 14) | ty`. The packed value is the key
/// used by the cache and the loader queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePosition(u32);

impl TilePosition {
    /// Largest representable tile grid coordinate.
    pub const MAX_INDEX: u32 = (1 << 14) - 1;

    /// Creates a tile position.
    ///
    /// Returns `None` if `layer > TOP_LAYER` or either coordinate exceeds
    /// [`MAX_INDEX`](Self::MAX_INDEX).
    #[must_use]
    pub fn new(layer: u8, tx: u32, ty: u32) -> Option<Self> {
        if layer > TOP_LAYER || tx > Self::MAX_INDEX || ty > Self::MAX_INDEX {
            return None;
        }
        Some(Self((u32::from(layer) << 28) | (tx << 14) | ty))
    }

    /// Reconstructs a position from its packed form, validating the layer.
    #[must_use]
    pub fn from_packed(packed: u32) -> Option<Self> {
        ((packed >> 28) as u8 <= TOP_LAYER).then_some(Self(packed))
    }

    /// The packed `u32` key.
    #[must_use]
    pub fn packed(self) -> u32 {
        self.0
    }

    /// Zoom layer (0 = most detailed).
    #[must_use]
    pub fn layer(self) -> u8 {
        (self.0 >> 28) as u8
    }

    /// Tile grid x coordinate.
    #[must_use]
    pub fn tx(self) -> u32 {
        (self.0 >> 14) & Self::MAX_INDEX
    }

    /// Tile grid y coordinate.
    #[must_use]
    pub fn ty(self) -> u32 {
        self.0 & Self::MAX_INDEX
    }

    /// Tile extent in map units.
    #[must_use]
    pub fn size(self) -> u32 {
        tile_size(self.layer())
    }

    /// Asset file name: `tri_<size>_<tx>_<ty>.tri`.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("tri_{}_{}_{}.tri", self.size(), self.tx(), self.ty())
    }

    /// Parses an asset file name of the form `tri_<size>_<tx>_<ty>.tri`.
    ///
    /// Returns `None` for malformed names and sizes not in the layer table.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_prefix("tri_")?.strip_suffix(".tri")?;
        let mut parts = stem.split('_');
        let size: u32 = parts.next()?.parse().ok()?;
        let tx: u32 = parts.next()?.parse().ok()?;
        let ty: u32 = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(layer_for_size(size)?, tx, ty)
    }

    /// The tile one layer coarser that contains this one.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        let layer = self.layer();
        if layer == TOP_LAYER {
            return None;
        }
        let per_axis = children_per_axis(layer + 1);
        Self::new(layer + 1, self.tx() / per_axis, self.ty() / per_axis)
    }

    /// The tiles one layer finer that this tile covers, row by row.
    pub fn children(self) -> impl Iterator<Item = TilePosition> {
        let per_axis = children_per_axis(self.layer());
        let (x0, y0) = (self.tx() * per_axis, self.ty() * per_axis);
        let child_layer = self.layer().saturating_sub(1);
        (0..per_axis * per_axis)
            .filter_map(move |i| Self::new(child_layer, x0 + i % per_axis, y0 + i / per_axis))
    }
}

impl fmt::Display for TilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}:{},{}", self.layer(), self.tx(), self.ty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_roundtrip() {
        for layer in 0..=TOP_LAYER {
            for &(tx, ty) in &[(0, 0), (1, 2), (16383, 0), (0, 16383), (16383, 16383)] {
                let pos = TilePosition::new(layer, tx, ty).unwrap();
                assert_eq!(pos.layer(), layer);
                assert_eq!(pos.tx(), tx);
                assert_eq!(pos.ty(), ty);
                assert_eq!(TilePosition::from_packed(pos.packed()), Some(pos));
            }
        }
    }

    #[test]
    fn test_packed_layout() {
        let pos = TilePosition::new(3, 5, 7).unwrap();
        assert_eq!(pos.packed(), (3 << 28) | (5 << 14) | 7);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(TilePosition::new(TOP_LAYER + 1, 0, 0).is_none());
        assert!(TilePosition::new(0, 16384, 0).is_none());
        assert!(TilePosition::new(0, 0, 16384).is_none());
        assert!(TilePosition::from_packed(0xF000_0000).is_none());
    }

    #[test]
    fn test_file_name_roundtrip() {
        let pos = TilePosition::new(2, 6, 94).unwrap();
        assert_eq!(pos.file_name(), "tri_65536_6_94.tri");
        assert_eq!(TilePosition::from_file_name(&pos.file_name()), Some(pos));
    }

    #[test]
    fn test_malformed_file_names_skipped() {
        assert_eq!(TilePosition::from_file_name("tri_65536_6.tri"), None);
        assert_eq!(TilePosition::from_file_name("tri_65536_6_94_1.tri"), None);
        assert_eq!(TilePosition::from_file_name("tri_1000_6_94.tri"), None);
        assert_eq!(TilePosition::from_file_name("tri_65536_a_94.tri"), None);
        assert_eq!(TilePosition::from_file_name("readme.txt"), None);
    }

    #[test]
    fn test_parent_contains_child() {
        let top = TilePosition::new(TOP_LAYER, 3, 4).unwrap();
        for child in top.children() {
            assert_eq!(child.layer(), TOP_LAYER - 1);
            assert_eq!(child.parent(), Some(top));
        }
        assert_eq!(top.children().count(), 4);
        assert_eq!(top.parent(), None);
    }

    #[test]
    fn test_layer_zero_has_no_children() {
        let pos = TilePosition::new(0, 10, 10).unwrap();
        assert_eq!(pos.children().count(), 0);
        assert_eq!(pos.parent().unwrap().layer(), 1);
        assert_eq!(pos.parent().unwrap().tx(), 2);
    }
}
