//! Tile decode error types.

use std::io;

/// Errors that abort decoding a single tile.
///
/// Every variant is fatal for that tile: the caller treats the position as
/// not loadable for the rest of the session.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Reading the tile's bytes failed (including truncation).
    #[error("failed to read tile data: {0}")]
    Io(#[from] io::Error),

    /// The header's vertex count is negative or more than a 16-bit index
    /// can address.
    #[error("max vertex count is 65534, got {0}")]
    TooManyVertices(i32),

    /// A header count field is negative.
    #[error("negative {field} in slot {slot}: {value}")]
    NegativeCount {
        /// Which header field.
        field: &'static str,
        /// Surface-type slot.
        slot: usize,
        /// The offending value.
        value: i32,
    },

    /// A breakpoint or primitive-count width is outside `0..=32`.
    #[error("invalid bit width {0}")]
    InvalidBitWidth(i32),

    /// The header's tile coordinates or size do not form a valid tile.
    #[error("tile index out of range: size={size}, tx={tx}, ty={ty}")]
    TileIndexOutOfRange {
        /// Declared tile size.
        size: i32,
        /// Declared x index.
        tx: i32,
        /// Declared y index.
        ty: i32,
    },

    /// An index stream references a vertex past `vertex_count`.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// The raw index read from the stream.
        index: u32,
        /// Vertices declared in the header.
        vertex_count: u32,
    },

    /// Strip or fan expansion produced a different triangle count than the
    /// header declared.
    #[error("slot {slot}: {kind} expanded to {actual} triangles, header says {expected}")]
    TriangleCountMismatch {
        /// Surface-type slot.
        slot: usize,
        /// `"strip"` or `"fan"`.
        kind: &'static str,
        /// Count from the header.
        expected: u32,
        /// Count produced by expansion.
        actual: u32,
    },

    /// A decoded vertex value has bits above the two quantized axes.
    #[error("decoded vertex value {0:#x} exceeds the quantized range")]
    QuantizedOutOfRange(u64),

    /// The dedup hash table's fixed bucket depth was exceeded.
    #[error("hash bucket overflow at {unique} of {vertex_count} vertices")]
    BucketOverflow {
        /// Unique vertices assigned before the overflow.
        unique: u32,
        /// Vertices declared in the header.
        vertex_count: u32,
    },
}
