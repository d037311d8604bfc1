//! Tile addressing and decoding for the compressed `.tri` vector tile format.
//!
//! A tile is a triangulated mesh per surface type, stored as bit-packed,
//! delta-coded, quantized vertices plus triangle/strip/fan index streams.
//! [`TileDecoder`] turns one tile's bytes into a [`DecodedTile`].

pub mod bit_reader;
pub mod codec;
mod dedup;
pub mod error;
pub mod layers;
pub mod position;
pub mod surface;
pub mod tile;

#[cfg(any(test, feature = "test-util"))]
pub mod fixtures;

pub use bit_reader::BitReader;
pub use codec::{TileDecoder, TileHeader};
pub use error::DecodeError;
pub use layers::{
    GLOBAL_OFS_X, GLOBAL_OFS_Y, MAX_VERTEX_COUNT, NR_LAYERS, QUANT_BITS, TILE_SHIFTS, TOP_LAYER,
};
pub use position::TilePosition;
pub use surface::{NR_SURFACE_TYPES, SurfaceType};
pub use tile::{DecodedTile, SurfaceMesh};
