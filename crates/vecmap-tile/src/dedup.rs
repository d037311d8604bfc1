//! Fixed-size bucketed hash table mapping decoded vertex values to dense indices.
//!
//! Sized once for the largest tile and reused across decodes. Buckets have a
//! fixed depth; filling one is treated as corrupt tile data.

use crate::error::DecodeError;

const HASH_SIZE: usize = 16384;
const BUCKET_BITS: u32 = 5;
const BUCKET_SIZE: usize = 1 << BUCKET_BITS;

/// Integer finalizer spreading clustered vertex values across buckets.
pub(crate) fn hash(x: u32) -> u32 {
    let x = ((x >> 16) ^ x).wrapping_mul(0x45d9f3b);
    let x = ((x >> 16) ^ x).wrapping_mul(0x45d9f3b);
    (x >> 16) ^ x
}

pub(crate) struct VertexDedup {
    bucket_len: Vec<u8>,
    /// `HASH_SIZE` buckets of `BUCKET_SIZE` dense indices each.
    slots: Vec<u16>,
    /// Decoded value for each dense index, in first-seen order.
    order: Vec<u32>,
    vertex_count: u32,
}

impl VertexDedup {
    pub(crate) fn new() -> Self {
        Self {
            bucket_len: vec![0; HASH_SIZE],
            slots: vec![0; HASH_SIZE * BUCKET_SIZE],
            order: Vec::new(),
            vertex_count: 0,
        }
    }

    /// Clears all buckets for a tile with `vertex_count` vertices.
    pub(crate) fn reset(&mut self, vertex_count: u32) {
        self.bucket_len.fill(0);
        self.order.clear();
        self.order.reserve(vertex_count as usize);
        self.vertex_count = vertex_count;
    }

    /// Dense index for `value`, assigning the next one on first sight.
    pub(crate) fn index_of(&mut self, value: u32) -> Result<u16, DecodeError> {
        let bucket = (hash(value) as usize) & (HASH_SIZE - 1);
        let base = bucket << BUCKET_BITS;
        let len = self.bucket_len[bucket] as usize;

        for &idx in &self.slots[base..base + len] {
            if self.order[idx as usize] == value {
                return Ok(idx);
            }
        }

        let idx = self.order.len() as u16;
        self.order.push(value);
        self.slots[base + len] = idx;
        self.bucket_len[bucket] += 1;
        if len + 1 >= BUCKET_SIZE {
            return Err(DecodeError::BucketOverflow {
                unique: self.order.len() as u32,
                vertex_count: self.vertex_count,
            });
        }
        Ok(idx)
    }

    /// Decoded values in dense-index order.
    pub(crate) fn order(&self) -> &[u32] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_value_same_index() {
        let mut dedup = VertexDedup::new();
        dedup.reset(8);
        assert_eq!(dedup.index_of(100).unwrap(), 0);
        assert_eq!(dedup.index_of(7).unwrap(), 1);
        assert_eq!(dedup.index_of(100).unwrap(), 0);
        assert_eq!(dedup.index_of(7).unwrap(), 1);
        assert_eq!(dedup.index_of(3).unwrap(), 2);
        assert_eq!(dedup.order(), &[100, 7, 3]);
    }

    #[test]
    fn test_reset_forgets_previous_tile() {
        let mut dedup = VertexDedup::new();
        dedup.reset(4);
        dedup.index_of(5).unwrap();
        dedup.index_of(6).unwrap();
        dedup.reset(4);
        assert_eq!(dedup.index_of(6).unwrap(), 0);
        assert_eq!(dedup.order(), &[6]);
    }

    #[test]
    fn test_bucket_overflow_is_fatal() {
        let target = (hash(0) as usize) & (HASH_SIZE - 1);
        let colliding: Vec<u32> = (0u32..)
            .filter(|&v| (hash(v) as usize) & (HASH_SIZE - 1) == target)
            .take(BUCKET_SIZE)
            .collect();

        let mut dedup = VertexDedup::new();
        dedup.reset(BUCKET_SIZE as u32);
        for &v in &colliding[..BUCKET_SIZE - 1] {
            dedup.index_of(v).unwrap();
        }
        let err = dedup.index_of(colliding[BUCKET_SIZE - 1]).unwrap_err();
        assert!(matches!(err, DecodeError::BucketOverflow { unique: 32, .. }));
    }

    #[test]
    fn test_hash_spreads_values() {
        assert_eq!(hash(0), 0);
        assert_ne!(hash(1), hash(2));
    }
}
