//! Fixed zoom-layer table shared by the codec, the cache and the LOD tree.
//!
//! Layer 0 is the most detailed; each coarser layer covers a larger square
//! extent per tile. Tile extents are powers of two in map units.

/// Log2 of the tile extent (in map units) for each layer.
pub const TILE_SHIFTS: [u32; 5] = [12, 14, 16, 17, 18];

/// Number of zoom layers.
pub const NR_LAYERS: usize = TILE_SHIFTS.len();

/// The coarsest (most zoomed-out) layer.
pub const TOP_LAYER: u8 = (NR_LAYERS - 1) as u8;

/// Global map offset subtracted from every vertex so on-GPU floats stay small.
pub const GLOBAL_OFS_X: i32 = 400_000;
/// See [`GLOBAL_OFS_X`].
pub const GLOBAL_OFS_Y: i32 = 6_200_000;

/// Bits per quantized axis in a packed vertex value.
pub const QUANT_BITS: u32 = 13;

/// Largest vertex count addressable by a 16-bit index buffer.
pub const MAX_VERTEX_COUNT: u32 = 65_534;

/// Tile extent in map units for `layer`.
///
/// # Panics
///
/// Panics if `layer > TOP_LAYER`.
#[must_use]
pub fn tile_size(layer: u8) -> u32 {
    1 << TILE_SHIFTS[layer as usize]
}

/// Inverse of [`tile_size`]. Returns `None` for sizes not in the layer table.
#[must_use]
pub fn layer_for_size(size: u32) -> Option<u8> {
    TILE_SHIFTS
        .iter()
        .position(|&shift| 1u32 << shift == size)
        .map(|layer| layer as u8)
}

/// Number of child tiles per axis between `layer` and `layer - 1`.
///
/// Returns 0 for layer 0, which has no finer layer.
#[must_use]
pub fn children_per_axis(layer: u8) -> u32 {
    if layer == 0 || layer > TOP_LAYER {
        return 0;
    }
    let l = layer as usize;
    1 << (TILE_SHIFTS[l] - TILE_SHIFTS[l - 1])
}
