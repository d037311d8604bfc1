//! Most-significant-bit-first reader for arbitrary-width unsigned integers.
//!
//! The underlying stream is consumed in big-endian 32-bit words. A 32-bit
//! scratch register holds the current word; `bits_left` counts how many of
//! its low bits are still unread.

use std::io::{self, Read};

/// Reads `1..=32`-bit values from a big-endian bit stream.
#[derive(Debug)]
pub struct BitReader<R> {
    inner: R,
    scratch: u32,
    bits_left: u32,
}

impl<R: Read> BitReader<R> {
    /// Wraps `inner`. Nothing is read until the first call to [`read`](Self::read).
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            scratch: 0,
            bits_left: 0,
        }
    }

    /// Returns the next `bits` bits as an unsigned integer.
    ///
    /// A width of 0 yields 0 without touching the stream. When the request
    /// exceeds what remains in the scratch register, the leftover high bits
    /// are combined with the top of a freshly read word.
    ///
    /// # Errors
    ///
    /// Propagates the stream's I/O error (`UnexpectedEof` for a truncated
    /// tile) and rejects widths above 32 with `InvalidInput`.
    pub fn read(&mut self, bits: u32) -> io::Result<u32> {
        if bits > 32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bit width {bits} exceeds 32"),
            ));
        }
        if bits > self.bits_left {
            let high = (u64::from(self.scratch) & mask(self.bits_left)) << (bits - self.bits_left);
            self.scratch = self.next_word()?;
            self.bits_left += 32 - bits;
            Ok((high + (u64::from(self.scratch) >> self.bits_left)) as u32)
        } else {
            self.bits_left -= bits;
            Ok(((u64::from(self.scratch) >> self.bits_left) & mask(bits)) as u32)
        }
    }

    /// Same as [`read`](Self::read), truncated to 16 bits for index streams.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn read_short(&mut self, bits: u32) -> io::Result<u16> {
        self.read(bits).map(|v| v as u16)
    }

    /// Gives back the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_word(&mut self) -> io::Result<u32> {
        let mut word = [0u8; 4];
        self.inner.read_exact(&mut word)?;
        Ok(u32::from_be_bytes(word))
    }
}

fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_msb_first() {
        let data = [0b1011_0000, 0, 0, 0];
        let mut br = BitReader::new(&data[..]);
        assert_eq!(br.read(1).unwrap(), 1);
        assert_eq!(br.read(1).unwrap(), 0);
        assert_eq!(br.read(2).unwrap(), 0b11);
        assert_eq!(br.read(28).unwrap(), 0);
    }

    #[test]
    fn test_value_spanning_word_boundary() {
        // 30 zero bits, then 0b1111 split across the two words, then zeros.
        let data = [0x00, 0x00, 0x00, 0x03, 0xC0, 0x00, 0x00, 0x00];
        let mut br = BitReader::new(&data[..]);
        assert_eq!(br.read(30).unwrap(), 0);
        assert_eq!(br.read(4).unwrap(), 0b1111);
        assert_eq!(br.read(30).unwrap(), 0);
    }

    #[test]
    fn test_full_width_reads() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x23, 0x45, 0x67];
        let mut br = BitReader::new(&data[..]);
        assert_eq!(br.read(32).unwrap(), 0xDEAD_BEEF);
        assert_eq!(br.read(4).unwrap(), 0x0);
        assert_eq!(br.read(28).unwrap(), 0x123_4567);
    }

    #[test]
    fn test_zero_width_read_consumes_nothing() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF];
        let mut br = BitReader::new(&data[..]);
        assert_eq!(br.read(0).unwrap(), 0);
        assert_eq!(br.read(8).unwrap(), 0xFF);
        assert_eq!(br.read(0).unwrap(), 0);
        assert_eq!(br.read(24).unwrap(), 0xFF_FFFF);
    }

    #[test]
    fn test_read_short_truncates() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut br = BitReader::new(&data[..]);
        assert_eq!(br.read_short(20).unwrap(), 0x2345);
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let data = [0xFF, 0xFF];
        let mut br = BitReader::new(&data[..]);
        let err = br.read(3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_width_above_32_rejected() {
        let data = [0u8; 8];
        let mut br = BitReader::new(&data[..]);
        assert_eq!(br.read(33).unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }
}
