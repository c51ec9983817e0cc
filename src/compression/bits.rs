//! LSB-first bit reader shared by the LZW and DEFLATE decoders.
//!
//! Both formats pack values starting at the least significant bit of each
//! byte: the first value occupies the low bits of byte 0, and a value that
//! straddles a byte boundary continues in the low bits of the next byte.
//! The reader keeps a small window of pending bits and refills it one byte
//! at a time, so after any read fewer than eight bits are buffered.

use crate::{Error, Result};

/// Bit-level reader over a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    window: u32,
    count: u32,
}

impl<'a> BitReader<'a> {
    /// Start reading at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            window: 0,
            count: 0,
        }
    }

    /// Number of whole bytes pulled from the input so far.
    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }

    /// Bits still available (buffered plus unread bytes).
    pub fn bits_remaining(&self) -> usize {
        self.count as usize + (self.data.len() - self.pos) * 8
    }

    /// Read `n` bits (at most 24) as an unsigned value.
    ///
    /// Fails with [`Error::UnexpectedEndOfBuffer`] when the input runs out.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        self.try_read_bits(n).ok_or(Error::UnexpectedEndOfBuffer {
            offset: self.pos,
            needed: n.div_ceil(8) as usize,
        })
    }

    /// Read `n` bits, or `None` if fewer than `n` bits remain.
    ///
    /// The reader is left unchanged when `None` is returned.
    pub fn try_read_bits(&mut self, n: u32) -> Option<u32> {
        debug_assert!(n <= 24);
        if self.bits_remaining() < n as usize {
            return None;
        }
        while self.count < n {
            self.window |= (self.data[self.pos] as u32) << self.count;
            self.pos += 1;
            self.count += 8;
        }
        let value = self.window & ((1u32 << n) - 1);
        self.window >>= n;
        self.count -= n;
        Some(value)
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<u32> {
        self.read_bits(1)
    }

    /// Discard buffered bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        self.window = 0;
        self.count = 0;
    }

    /// Read `n` whole bytes starting at the next byte boundary.
    pub fn read_aligned_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.align_to_byte();
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::UnexpectedEndOfBuffer {
                offset: self.pos,
                needed: n,
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_straddle_byte_boundaries() {
        // 3-bit values 4, 0, 0, 1 then 4-bit values 1, 5.
        let data = [0x04, 0x12, 0x05];
        let mut r = BitReader::new(&data);
        assert_eq!(r.read_bits(3).unwrap(), 4);
        assert_eq!(r.read_bits(3).unwrap(), 0);
        assert_eq!(r.read_bits(3).unwrap(), 0);
        assert_eq!(r.read_bits(3).unwrap(), 1);
        assert_eq!(r.read_bits(4).unwrap(), 1);
        assert_eq!(r.read_bits(4).unwrap(), 5);
        assert_eq!(r.bits_remaining(), 4);
        assert!(r.try_read_bits(5).is_none());
        assert_eq!(r.read_bits(4).unwrap(), 0);
        assert!(r.read_bit().is_err());
    }

    #[test]
    fn aligned_bytes_skip_partial_byte() {
        let data = [0b1010_1101, 0xAA, 0xBB, 0xCC];
        let mut r = BitReader::new(&data);
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_aligned_bytes(2).unwrap(), &[0xAA, 0xBB]);
        assert_eq!(r.read_bits(8).unwrap(), 0xCC);
        assert!(r.read_aligned_bytes(1).is_err());
    }
}
