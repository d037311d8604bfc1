//! Decoder for the `.tri` tile format.
//!
//! ## Binary Layout
//!
//! All header integers are big-endian `i32`.
//!
//! | Field | Notes |
//! |-------|-------|
//! | `vertexCount`, `tx`, `ty`, `size` | header position is authoritative |
//! | 10 × `triCount`, `stripCount`, `fanCount` | per surface-type slot |
//! | `stripTriCount`, `fanTriCount`, `primitiveCountBits` | only if the slot is non-empty |
//! | 4 × breakpoint byte | bit width per 2-bit selector |
//! | bit-packed vertex deltas | selector + delta per vertex |
//! | bit-packed index streams | per non-empty slot: tris, strips, fans |
//!
//! Vertex values are a monotonic delta code: each value is the previous one
//! plus the delta plus one, starting from a virtual `-1`. A value packs two
//! [`QUANT_BITS`]-bit axes, x in the low bits.

use std::io::Read;

use tracing::trace;

use crate::bit_reader::BitReader;
use crate::dedup::VertexDedup;
use crate::error::DecodeError;
use crate::layers::{GLOBAL_OFS_X, GLOBAL_OFS_Y, MAX_VERTEX_COUNT, QUANT_BITS, layer_for_size};
use crate::position::TilePosition;
use crate::surface::{NR_SURFACE_TYPES, SurfaceType};
use crate::tile::{DecodedTile, SurfaceMesh};

/// Primitive counts for one surface-type slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotHeader {
    pub tri_count: u32,
    pub strip_count: u32,
    pub fan_count: u32,
    /// Triangles produced by expanding all strips.
    pub strip_tri_count: u32,
    /// Triangles produced by expanding all fans.
    pub fan_tri_count: u32,
    /// Width of each strip/fan length field.
    pub primitive_count_bits: u32,
}

impl SlotHeader {
    /// A slot with no primitives carries no further header fields or indices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tri_count == 0 && self.strip_count == 0 && self.fan_count == 0
    }

    /// Triangles after strip and fan expansion.
    #[must_use]
    pub fn total_triangles(&self) -> u64 {
        u64::from(self.tri_count) + u64::from(self.strip_tri_count) + u64::from(self.fan_tri_count)
    }
}

/// Per-tile header preceding the bit-packed payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileHeader {
    pub vertex_count: u32,
    pub position: TilePosition,
    pub slots: [SlotHeader; NR_SURFACE_TYPES],
}

impl TileHeader {
    /// Reads and validates the header.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] on I/O failure, a vertex count above
    /// [`MAX_VERTEX_COUNT`], an invalid tile position, or a bad count field.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let vertex_count = read_i32(reader)?;
        if !(0..=MAX_VERTEX_COUNT as i32).contains(&vertex_count) {
            return Err(DecodeError::TooManyVertices(vertex_count));
        }

        let tx = read_i32(reader)?;
        let ty = read_i32(reader)?;
        let size = read_i32(reader)?;
        let position = u32::try_from(size)
            .ok()
            .and_then(layer_for_size)
            .zip(u32::try_from(tx).ok().zip(u32::try_from(ty).ok()))
            .and_then(|(layer, (tx, ty))| TilePosition::new(layer, tx, ty))
            .ok_or(DecodeError::TileIndexOutOfRange { size, tx, ty })?;

        let mut slots = [SlotHeader::default(); NR_SURFACE_TYPES];
        for (slot, header) in slots.iter_mut().enumerate() {
            header.tri_count = read_count(reader, "triangle count", slot)?;
            header.strip_count = read_count(reader, "strip count", slot)?;
            header.fan_count = read_count(reader, "fan count", slot)?;
            if header.is_empty() {
                continue;
            }
            header.strip_tri_count = read_count(reader, "strip triangle count", slot)?;
            header.fan_tri_count = read_count(reader, "fan triangle count", slot)?;
            header.primitive_count_bits = read_width(reader)?;
        }

        Ok(Self {
            vertex_count: vertex_count as u32,
            position,
            slots,
        })
    }
}

/// Reusable tile decoder.
///
/// Holds the dedup hash table and scratch vectors so repeated decodes do not
/// reallocate them. Not shareable across threads; callers serialize access.
pub struct TileDecoder {
    dedup: VertexDedup,
    deltas: Vec<u32>,
    values: Vec<u32>,
}

impl TileDecoder {
    /// Creates a decoder with an empty dedup table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dedup: VertexDedup::new(),
            deltas: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Decodes one complete tile from `reader`.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]; all are fatal for this tile.
    pub fn decode<R: Read>(&mut self, mut reader: R) -> Result<DecodedTile, DecodeError> {
        let header = TileHeader::read(&mut reader)?;

        let mut breakpoints = [0u8; 4];
        reader.read_exact(&mut breakpoints)?;
        let mut widths = [0u32; 4];
        for (width, &b) in widths.iter_mut().zip(&breakpoints) {
            *width = checked_width(i32::from(b as i8))?;
        }

        let mut bits = BitReader::new(reader);
        let vertex_count = header.vertex_count;

        self.deltas.clear();
        for _ in 0..vertex_count {
            let selector = bits.read(2)?;
            self.deltas.push(bits.read(widths[selector as usize])?);
        }

        let index_bits = index_bits(vertex_count);
        let mut streams = Vec::new();
        for (slot, slot_header) in header.slots.iter().enumerate() {
            if slot_header.is_empty() {
                continue;
            }
            let indices = read_slot_indices(&mut bits, slot, slot_header, index_bits, vertex_count)?;
            if let Some(surface) = SurfaceType::from_slot(slot) {
                streams.push(SurfaceMesh { surface, indices });
            }
        }

        self.delta_decode()?;

        self.dedup.reset(vertex_count);
        for mesh in &mut streams {
            for index in &mut mesh.indices {
                *index = self.dedup.index_of(self.values[*index as usize])?;
            }
        }

        let position = header.position;
        let vertices: Vec<[f32; 2]> = self
            .dedup
            .order()
            .iter()
            .map(|&value| unquantize(value, position))
            .collect();

        let tile = DecodedTile::new(position, vertices, streams);
        trace!(
            "Decoded tile {position}: {} tris, {} of {vertex_count} verts",
            tile.triangle_count(),
            tile.vertex_count()
        );
        Ok(tile)
    }

    fn delta_decode(&mut self) -> Result<(), DecodeError> {
        const LIMIT: u64 = 1 << (2 * QUANT_BITS);
        self.values.clear();
        let mut prev: Option<u64> = None;
        for &delta in &self.deltas {
            let value = match prev {
                None => u64::from(delta),
                Some(p) => p + u64::from(delta) + 1,
            };
            if value >= LIMIT {
                return Err(DecodeError::QuantizedOutOfRange(value));
            }
            self.values.push(value as u32);
            prev = Some(value);
        }
        Ok(())
    }
}

impl Default for TileDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Width of each raw vertex index: the bit length of `vertex_count`, with a
/// minimum of 1.
#[must_use]
pub fn index_bits(vertex_count: u32) -> u32 {
    if vertex_count == 0 {
        1
    } else {
        32 - vertex_count.leading_zeros()
    }
}

fn read_slot_indices<R: Read>(
    bits: &mut BitReader<R>,
    slot: usize,
    header: &SlotHeader,
    index_bits: u32,
    vertex_count: u32,
) -> Result<Vec<u16>, DecodeError> {
    let read_index = |bits: &mut BitReader<R>| -> Result<u16, DecodeError> {
        let index = bits.read(index_bits)?;
        if index >= vertex_count {
            return Err(DecodeError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        Ok(index as u16)
    };

    let capacity = (header.total_triangles() * 3).min(u64::from(MAX_VERTEX_COUNT) * 3) as usize;
    let mut tris = Vec::with_capacity(capacity);

    for _ in 0..u64::from(header.tri_count) * 3 {
        tris.push(read_index(bits)?);
    }

    // Strip: each new index forms a triangle with the previous two.
    let mut produced = 0u32;
    for _ in 0..header.strip_count {
        let len = bits.read(header.primitive_count_bits)?;
        let mut v0 = read_index(bits)?;
        let mut v1 = read_index(bits)?;
        for _ in 0..len {
            produced = check_expansion(slot, "strip", header.strip_tri_count, produced)?;
            let v2 = read_index(bits)?;
            tris.extend_from_slice(&[v0, v1, v2]);
            v0 = v1;
            v1 = v2;
        }
    }
    finish_expansion(slot, "strip", header.strip_tri_count, produced)?;

    // Fan: each new index forms a triangle with the first and the previous one.
    let mut produced = 0u32;
    for _ in 0..header.fan_count {
        let len = bits.read(header.primitive_count_bits)?;
        let v0 = read_index(bits)?;
        let mut v1 = read_index(bits)?;
        for _ in 0..len {
            produced = check_expansion(slot, "fan", header.fan_tri_count, produced)?;
            let v2 = read_index(bits)?;
            tris.extend_from_slice(&[v0, v1, v2]);
            v1 = v2;
        }
    }
    finish_expansion(slot, "fan", header.fan_tri_count, produced)?;

    Ok(tris)
}

fn check_expansion(
    slot: usize,
    kind: &'static str,
    expected: u32,
    produced: u32,
) -> Result<u32, DecodeError> {
    if produced >= expected {
        return Err(DecodeError::TriangleCountMismatch {
            slot,
            kind,
            expected,
            actual: produced + 1,
        });
    }
    Ok(produced + 1)
}

fn finish_expansion(
    slot: usize,
    kind: &'static str,
    expected: u32,
    produced: u32,
) -> Result<(), DecodeError> {
    if produced != expected {
        return Err(DecodeError::TriangleCountMismatch {
            slot,
            kind,
            expected,
            actual: produced,
        });
    }
    Ok(())
}

/// Maps a packed quantized value to offset map coordinates within the tile.
fn unquantize(value: u32, position: TilePosition) -> [f32; 2] {
    let max = f64::from((1u32 << QUANT_BITS) - 1);
    let size = f64::from(position.size());
    let qx = f64::from(value & ((1 << QUANT_BITS) - 1));
    let qy = f64::from(value >> QUANT_BITS);
    let px = (qx / max * size + 0.5) as i64;
    let py = (qy / max * size + 0.5) as i64;

    let tile_size = i64::from(position.size());
    let x = px + i64::from(position.tx()) * tile_size - i64::from(GLOBAL_OFS_X);
    let y = py + i64::from(position.ty()) * tile_size - i64::from(GLOBAL_OFS_Y);
    [x as f32, y as f32]
}

fn read_i32<R: Read>(reader: &mut R) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_count<R: Read>(
    reader: &mut R,
    field: &'static str,
    slot: usize,
) -> Result<u32, DecodeError> {
    let value = read_i32(reader)?;
    u32::try_from(value).map_err(|_| DecodeError::NegativeCount { field, slot, value })
}

fn read_width<R: Read>(reader: &mut R) -> Result<u32, DecodeError> {
    checked_width(read_i32(reader)?)
}

fn checked_width(width: i32) -> Result<u32, DecodeError> {
    if (0..=32).contains(&width) {
        Ok(width as u32)
    } else {
        Err(DecodeError::InvalidBitWidth(width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{TileBuilder, quantized};
    use crate::layers::TOP_LAYER;

    fn push_i32(buf: &mut Vec<u8>, v: i32) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Three vertices and one triangle, with the bit stream written out by hand.
    ///
    /// Values 5, 8197, 8207 give deltas 5, 8191, 9. With breakpoints all 16,
    /// each vertex is `00` + 16 bits; then three 2-bit indices `00 01 10`,
    /// then 4 bits of padding:
    ///
    /// ```text
    /// 00 0000000000000101 00 0001111111111111 00 0000000000001001 000110 0000
    /// ```
    fn hand_written_tile() -> Vec<u8> {
        let mut buf = Vec::new();
        for v in [3, 100, 1515, 4096] {
            push_i32(&mut buf, v);
        }
        for v in [1, 0, 0, 0, 0, 0] {
            push_i32(&mut buf, v);
        }
        for _ in 1..NR_SURFACE_TYPES {
            for _ in 0..3 {
                push_i32(&mut buf, 0);
            }
        }
        buf.extend_from_slice(&[16, 16, 16, 16]);
        buf.extend_from_slice(&0x0001_41FFu32.to_be_bytes());
        buf.extend_from_slice(&0xF000_2460u32.to_be_bytes());
        buf
    }

    #[test]
    fn test_hand_written_tile_decodes() {
        let tile = TileDecoder::new().decode(&hand_written_tile()[..]).unwrap();

        assert_eq!(tile.position(), TilePosition::new(0, 100, 1515).unwrap());
        assert_eq!(tile.size(), 4096);
        assert_eq!(tile.origin(), [9600.0, 5440.0]);
        // qx=5 -> round(5/8191*4096)=3, qy=1 -> 1, qx=15 -> 8
        assert_eq!(
            tile.vertices(),
            &[[9603.0, 5440.0], [9603.0, 5441.0], [9608.0, 5441.0]]
        );
        assert_eq!(tile.surfaces().len(), 1);
        assert_eq!(tile.surfaces()[0].surface, SurfaceType::Water);
        assert_eq!(tile.surfaces()[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_builder_matches_hand_written_bytes() {
        let bytes = TileBuilder::new(TilePosition::new(0, 100, 1515).unwrap())
            .breakpoints([16, 16, 16, 16])
            .vertex_values(vec![5, 8197, 8207])
            .triangles(0, vec![[0, 1, 2]])
            .build();
        assert_eq!(bytes, hand_written_tile());
    }

    #[test]
    fn test_strip_expansion() {
        let bytes = TileBuilder::new(TilePosition::new(1, 10, 10).unwrap())
            .vertex_values(vec![0, 1, 2, 3])
            .strip(2, vec![0, 1, 2, 3])
            .build();
        let tile = TileDecoder::new().decode(&bytes[..]).unwrap();
        let mesh = tile.surface(SurfaceType::Industrial).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_fan_expansion() {
        let bytes = TileBuilder::new(TilePosition::new(1, 10, 10).unwrap())
            .vertex_values(vec![0, 1, 2, 3])
            .fan(4, vec![0, 1, 2, 3])
            .build();
        let tile = TileDecoder::new().decode(&bytes[..]).unwrap();
        let mesh = tile.surface(SurfaceType::OpenLand).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_tris_strips_and_fans_in_one_slot() {
        let bytes = TileBuilder::new(TilePosition::new(2, 1, 1).unwrap())
            .vertex_values((0..6).map(|v| v * 10).collect())
            .triangles(6, vec![[5, 4, 3]])
            .strip(6, vec![0, 1, 2])
            .fan(6, vec![3, 4, 5, 0])
            .build();
        let tile = TileDecoder::new().decode(&bytes[..]).unwrap();
        let mesh = tile.surface(SurfaceType::Forest).unwrap();
        assert_eq!(mesh.triangle_count(), 4);
        // Dense order follows first reference: 5, 4, 3, 0, 1, 2.
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5, 2, 1, 0, 2, 0, 3]);
    }

    #[test]
    fn test_shared_vertices_deduplicated_across_surfaces() {
        let bytes = TileBuilder::new(TilePosition::new(0, 0, 0).unwrap())
            .vertex_values(vec![quantized(0, 0), quantized(10, 0), quantized(0, 10), quantized(10, 10)])
            .triangles(0, vec![[2, 0, 1]])
            .triangles(5, vec![[1, 3, 2]])
            .build();
        let tile = TileDecoder::new().decode(&bytes[..]).unwrap();

        assert_eq!(tile.vertex_count(), 4);
        let water = tile.surface(SurfaceType::Water).unwrap();
        let mountain = tile.surface(SurfaceType::Mountain).unwrap();
        assert_eq!(water.indices, vec![0, 1, 2]);
        // raw 1 -> dense 2, raw 3 -> new dense 3, raw 2 -> dense 0
        assert_eq!(mountain.indices, vec![2, 3, 0]);
        assert_eq!(tile.vertices()[water.indices[0] as usize], tile.vertices()[mountain.indices[2] as usize]);
    }

    #[test]
    fn test_unreferenced_vertices_dropped() {
        let bytes = TileBuilder::new(TilePosition::new(0, 0, 0).unwrap())
            .vertex_values(vec![1, 2, 3, 4, 5])
            .triangles(1, vec![[4, 3, 0]])
            .build();
        let tile = TileDecoder::new().decode(&bytes[..]).unwrap();
        assert_eq!(tile.vertex_count(), 3);
        assert_eq!(tile.surfaces()[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_random_tile_stays_within_bounds() {
        let position = TilePosition::new(TOP_LAYER, 2, 24).unwrap();
        let mut state = 0x2545_f491u32;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };

        let mut values = Vec::new();
        let mut value = next() % 1000;
        for _ in 0..500 {
            values.push(value);
            value += 1 + next() % 100_000;
        }
        let tris: Vec<[u16; 3]> = (0..400)
            .map(|_| [(next() % 500) as u16, (next() % 500) as u16, (next() % 500) as u16])
            .collect();

        let bytes = TileBuilder::new(position)
            .vertex_values(values)
            .triangles(3, tris.clone())
            .build();
        let tile = TileDecoder::new().decode(&bytes[..]).unwrap();

        let [ox, oy] = tile.origin();
        let size = tile.size() as f32;
        for &[x, y] in tile.vertices() {
            assert!(x >= ox && x <= ox + size, "x={x} outside [{ox}, {}]", ox + size);
            assert!(y >= oy && y <= oy + size, "y={y} outside [{oy}, {}]", oy + size);
        }
        let mesh = &tile.surfaces()[0];
        assert_eq!(mesh.indices.len(), tris.len() * 3);
        for &i in &mesh.indices {
            assert!((i as usize) < tile.vertex_count());
        }

        let mut referenced: Vec<u16> = tris.iter().flatten().copied().collect();
        referenced.sort_unstable();
        referenced.dedup();
        assert_eq!(tile.vertex_count(), referenced.len());
    }

    #[test]
    fn test_decoder_reuse_is_independent() {
        let mut decoder = TileDecoder::new();
        let first = TileBuilder::new(TilePosition::new(0, 1, 1).unwrap())
            .vertex_values(vec![7, 8, 9])
            .triangles(0, vec![[0, 1, 2]])
            .build();
        let second = TileBuilder::new(TilePosition::new(0, 1, 2).unwrap())
            .vertex_values(vec![9, 30, 31, 40])
            .triangles(0, vec![[3, 0, 1]])
            .build();

        decoder.decode(&first[..]).unwrap();
        let tile = decoder.decode(&second[..]).unwrap();
        assert_eq!(tile.vertex_count(), 3);
        assert_eq!(tile.surfaces()[0].indices, vec![0, 1, 2]);
        assert_eq!(tile.position().ty(), 2);
    }

    #[test]
    fn test_vertex_count_limit() {
        let mut buf = Vec::new();
        push_i32(&mut buf, 65535);
        let err = TileDecoder::new().decode(&buf[..]).unwrap_err();
        assert!(matches!(err, DecodeError::TooManyVertices(65535)));
    }

    #[test]
    fn test_truncated_tile_is_io_error() {
        let bytes = hand_written_tile();
        let err = TileDecoder::new().decode(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn test_index_out_of_range_rejected() {
        let bytes = TileBuilder::new(TilePosition::new(0, 0, 0).unwrap())
            .vertex_values(vec![1, 2, 3])
            .triangles(0, vec![[0, 1, 3]])
            .build();
        let err = TileDecoder::new().decode(&bytes[..]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            }
        ));
    }

    #[test]
    fn test_value_beyond_quantized_range_rejected() {
        let bytes = TileBuilder::new(TilePosition::new(0, 0, 0).unwrap())
            .vertex_values(vec![1, 1 << 26])
            .triangles(0, vec![[0, 1, 1]])
            .build();
        let err = TileDecoder::new().decode(&bytes[..]).unwrap_err();
        assert!(matches!(err, DecodeError::QuantizedOutOfRange(v) if v == 1 << 26));
    }

    #[test]
    fn test_strip_count_mismatch_rejected() {
        let bytes = TileBuilder::new(TilePosition::new(0, 0, 0).unwrap())
            .vertex_values(vec![1, 2, 3, 4])
            .strip(0, vec![0, 1, 2, 3])
            .strip_tri_count_override(0, 1)
            .build();
        let err = TileDecoder::new().decode(&bytes[..]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TriangleCountMismatch { kind: "strip", .. }
        ));
    }

    #[test]
    fn test_invalid_header_size_rejected() {
        let mut buf = Vec::new();
        for v in [3, 0, 0, 1000] {
            push_i32(&mut buf, v);
        }
        let err = TileDecoder::new().decode(&buf[..]).unwrap_err();
        assert!(matches!(err, DecodeError::TileIndexOutOfRange { size: 1000, .. }));
    }

    #[test]
    fn test_index_bits_is_bit_length() {
        assert_eq!(index_bits(0), 1);
        assert_eq!(index_bits(1), 1);
        assert_eq!(index_bits(3), 2);
        assert_eq!(index_bits(4), 3);
        assert_eq!(index_bits(65534), 16);
    }
}
