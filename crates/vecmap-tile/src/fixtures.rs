//! Synthetic tile writer for tests.
//!
//! [`TileBuilder`] produces bytes in the exact format [`crate::TileDecoder`]
//! reads, so downstream crates can exercise the cache and LOD code without
//! real map data.

use crate::codec::index_bits;
use crate::layers::QUANT_BITS;
use crate::position::TilePosition;
use crate::surface::NR_SURFACE_TYPES;

/// Packs quantized `(qx, qy)` into one vertex value.
#[must_use]
pub fn quantized(qx: u32, qy: u32) -> u32 {
    (qy << QUANT_BITS) | qx
}

/// MSB-first bit writer emitting big-endian 32-bit words.
#[derive(Default)]
pub struct BitWriter {
    out: Vec<u8>,
    acc: u64,
    pending: u32,
}

impl BitWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `bits` bits of `value`.
    pub fn write(&mut self, bits: u32, value: u32) {
        assert!(bits <= 32, "width {bits} exceeds 32");
        if bits == 0 {
            return;
        }
        let mask = (1u64 << bits) - 1;
        self.acc = (self.acc << bits) | (u64::from(value) & mask);
        self.pending += bits;
        while self.pending >= 32 {
            self.pending -= 32;
            let word = (self.acc >> self.pending) as u32;
            self.out.extend_from_slice(&word.to_be_bytes());
            self.acc &= (1u64 << self.pending) - 1;
        }
    }

    /// Zero-pads to a word boundary and returns the bytes.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        if self.pending > 0 {
            self.write(32 - self.pending, 0);
        }
        self.out
    }
}

#[derive(Clone, Default)]
struct SlotContents {
    triangles: Vec<[u16; 3]>,
    strips: Vec<Vec<u16>>,
    fans: Vec<Vec<u16>>,
    strip_tri_count: Option<u32>,
}

impl SlotContents {
    fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.strips.is_empty() && self.fans.is_empty()
    }
}

/// Builds the bytes of one `.tri` tile.
#[derive(Clone)]
pub struct TileBuilder {
    position: TilePosition,
    breakpoints: [u8; 4],
    values: Vec<u32>,
    slots: Vec<SlotContents>,
}

impl TileBuilder {
    /// An empty tile at `position`.
    #[must_use]
    pub fn new(position: TilePosition) -> Self {
        Self {
            position,
            breakpoints: [4, 8, 16, 26],
            values: Vec::new(),
            slots: vec![SlotContents::default(); NR_SURFACE_TYPES],
        }
    }

    /// Delta-coding widths selected by each 2-bit selector.
    #[must_use]
    pub fn breakpoints(mut self, breakpoints: [u8; 4]) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    /// Strictly increasing packed vertex values, in raw index order.
    #[must_use]
    pub fn vertex_values(mut self, values: Vec<u32>) -> Self {
        assert!(
            values.windows(2).all(|w| w[0] < w[1]),
            "vertex values must be strictly increasing"
        );
        self.values = values;
        self
    }

    /// Adds plain triangles to `slot`.
    #[must_use]
    pub fn triangles(mut self, slot: usize, tris: Vec<[u16; 3]>) -> Self {
        self.slots[slot].triangles.extend(tris);
        self
    }

    /// Adds a strip: two seed indices followed by one index per triangle.
    #[must_use]
    pub fn strip(mut self, slot: usize, indices: Vec<u16>) -> Self {
        assert!(indices.len() >= 2);
        self.slots[slot].strips.push(indices);
        self
    }

    /// Adds a fan: center and first rim index followed by one index per triangle.
    #[must_use]
    pub fn fan(mut self, slot: usize, indices: Vec<u16>) -> Self {
        assert!(indices.len() >= 2);
        self.slots[slot].fans.push(indices);
        self
    }

    /// Writes `count` as the slot's strip triangle count instead of the real one.
    #[must_use]
    pub fn strip_tri_count_override(mut self, slot: usize, count: u32) -> Self {
        self.slots[slot].strip_tri_count = Some(count);
        self
    }

    /// Serializes the tile.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let vertex_count = self.values.len() as u32;
        for v in [
            vertex_count,
            self.position.tx(),
            self.position.ty(),
            self.position.size(),
        ] {
            out.extend_from_slice(&v.to_be_bytes());
        }

        let mut primitive_bits = [0u32; NR_SURFACE_TYPES];
        for (slot, contents) in self.slots.iter().enumerate() {
            for count in [contents.triangles.len(), contents.strips.len(), contents.fans.len()] {
                out.extend_from_slice(&(count as u32).to_be_bytes());
            }
            if contents.is_empty() {
                continue;
            }
            let strip_tris: usize = contents.strips.iter().map(|s| s.len() - 2).sum();
            let fan_tris: usize = contents.fans.iter().map(|f| f.len() - 2).sum();
            let longest = contents
                .strips
                .iter()
                .chain(&contents.fans)
                .map(|p| p.len() - 2)
                .max();
            primitive_bits[slot] = longest.map_or(0, |n| bit_length(n as u32).max(1));

            let strip_tris = contents.strip_tri_count.unwrap_or(strip_tris as u32);
            for v in [strip_tris, fan_tris as u32, primitive_bits[slot]] {
                out.extend_from_slice(&v.to_be_bytes());
            }
        }
        out.extend_from_slice(&self.breakpoints);

        let mut bits = BitWriter::new();
        let mut prev: Option<u32> = None;
        for &value in &self.values {
            let delta = match prev {
                None => value,
                Some(p) => value - p - 1,
            };
            let needed = bit_length(delta);
            let selector = self
                .breakpoints
                .iter()
                .position(|&w| u32::from(w) >= needed)
                .unwrap_or_else(|| panic!("no breakpoint fits a {needed}-bit delta"));
            bits.write(2, selector as u32);
            bits.write(u32::from(self.breakpoints[selector]), delta);
            prev = Some(value);
        }

        let width = index_bits(vertex_count);
        for (slot, contents) in self.slots.iter().enumerate() {
            for &index in contents.triangles.iter().flatten() {
                bits.write(width, u32::from(index));
            }
            for primitive in contents.strips.iter().chain(&contents.fans) {
                bits.write(primitive_bits[slot], (primitive.len() - 2) as u32);
                for &index in primitive {
                    bits.write(width, u32::from(index));
                }
            }
        }

        out.extend(bits.finish());
        out
    }
}

fn bit_length(v: u32) -> u32 {
    32 - v.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_writer_pads_to_word() {
        let mut w = BitWriter::new();
        w.write(3, 0b101);
        assert_eq!(w.finish(), vec![0xA0, 0, 0, 0]);
    }

    #[test]
    fn test_bit_writer_spans_words() {
        let mut w = BitWriter::new();
        w.write(30, 0);
        w.write(4, 0b1111);
        assert_eq!(w.finish(), vec![0, 0, 0, 0b11, 0xC0, 0, 0, 0]);
    }
}
