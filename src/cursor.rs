//! Byte cursor shared by all parsers.
//!
//! A [`Cursor`] borrows a read-only byte buffer and walks it with an offset
//! that can be moved freely: parsers jump to header-declared offsets, read a
//! record, and jump back. Each read either returns exactly the bytes it
//! promises or fails with [`Error::UnexpectedEndOfBuffer`], leaving the
//! offset untouched.
//!
//! Seeking never fails: out-of-range targets are clamped into
//! `0..=len`, and the next read reports the shortfall instead.

use crate::{Error, Result};

/// Byte order used to decode multi-byte integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Least significant byte first. Every container in this crate uses it.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

/// Random-access reader over a borrowed byte buffer.
///
/// Cloning a cursor is cheap and yields an independent offset over the same
/// bytes.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Cursor<'a> {
    /// Create a little-endian cursor at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_endian(data, Endian::Little)
    }

    /// Create a cursor at offset 0 with the given default byte order.
    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    /// Default byte order for integer reads.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Change the default byte order for subsequent integer reads.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// The whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether every byte has been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes left between the offset and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute offset, clamped to the end of the buffer.
    pub fn seek(&mut self, offset: usize) {
        self.pos = offset.min(self.data.len());
    }

    /// Move back `n` bytes, stopping at offset 0.
    pub fn rewind(&mut self, n: usize) {
        self.pos = self.pos.saturating_sub(n);
    }

    /// Advance `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.data[self.pos])
    }

    /// Read `n` bytes as a view into the buffer.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read exactly `N` bytes into a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut b = [0u8; N];
        b.copy_from_slice(self.read_bytes(N)?);
        Ok(b)
    }

    /// Read a 4-byte chunk identifier.
    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        self.read_array::<4>()
    }

    /// Verify that the next `N` bytes match `expected`.
    ///
    /// Returns [`Error::SignatureMismatch`] naming `what` on mismatch.
    pub fn expect_magic<const N: usize>(
        &mut self,
        expected: &[u8; N],
        what: &'static str,
    ) -> Result<()> {
        let got = self.read_array::<N>()?;
        if &got != expected {
            return Err(Error::SignatureMismatch(what));
        }
        Ok(())
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    /// Read one signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a `u16` in the cursor's byte order.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_u16_as(self.endian)
    }

    /// Read a `u16` in an explicit byte order.
    pub fn read_u16_as(&mut self, endian: Endian) -> Result<u16> {
        let b = self.read_array::<2>()?;
        Ok(match endian {
            Endian::Little => u16::from_le_bytes(b),
            Endian::Big => u16::from_be_bytes(b),
        })
    }

    /// Read an `i16` in the cursor's byte order.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_i16_as(self.endian)
    }

    /// Read an `i16` in an explicit byte order.
    pub fn read_i16_as(&mut self, endian: Endian) -> Result<i16> {
        Ok(self.read_u16_as(endian)? as i16)
    }

    /// Read a `u32` in the cursor's byte order.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_u32_as(self.endian)
    }

    /// Read a `u32` in an explicit byte order.
    pub fn read_u32_as(&mut self, endian: Endian) -> Result<u32> {
        let b = self.read_array::<4>()?;
        Ok(match endian {
            Endian::Little => u32::from_le_bytes(b),
            Endian::Big => u32::from_be_bytes(b),
        })
    }

    /// Read an `i32` in the cursor's byte order.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_i32_as(self.endian)
    }

    /// Read an `i32` in an explicit byte order.
    pub fn read_i32_as(&mut self, endian: Endian) -> Result<i32> {
        Ok(self.read_u32_as(endian)? as i32)
    }

    /// Read `n` bytes as a Latin-1 string (one char per byte).
    pub fn read_latin1(&mut self, n: usize) -> Result<String> {
        Ok(latin1(self.read_bytes(n)?))
    }

    /// Borrow `len` bytes starting at absolute `offset` without moving.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(Error::UnexpectedEndOfBuffer {
                offset,
                needed: len,
            })
    }

    /// A new cursor scoped to `len` bytes at absolute `offset`.
    ///
    /// The sub-cursor shares the buffer and byte order; its offsets are
    /// relative to the start of the range.
    pub fn sub_cursor(&self, offset: usize, len: usize) -> Result<Cursor<'a>> {
        Ok(Cursor::with_endian(self.slice(offset, len)?, self.endian))
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::UnexpectedEndOfBuffer {
                offset: self.pos,
                needed: n,
            });
        }
        Ok(())
    }
}

/// Map each byte to the Unicode code point of the same value.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BYTES: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0xFE, 0xFF, 0x80, 0x7F];

    #[test]
    fn integer_reads_follow_endianness() {
        let mut c = Cursor::new(&BYTES);
        assert_eq!(c.read_u16().unwrap(), 0x0201);
        assert_eq!(c.read_u16_as(Endian::Big).unwrap(), 0x0304);
        assert_eq!(c.read_i16().unwrap(), -2);
        assert_eq!(c.read_i8().unwrap(), -128);
        assert_eq!(c.read_u8().unwrap(), 0x7F);
        assert!(c.is_eof());

        let mut c = Cursor::with_endian(&BYTES, Endian::Big);
        assert_eq!(c.read_u32().unwrap(), 0x0102_0304);
        assert_eq!(c.read_i32_as(Endian::Little).unwrap(), 0x7F80_FFFEu32 as i32);
    }

    #[test]
    fn seek_then_read_is_repeatable() {
        let mut c = Cursor::new(&BYTES);
        for k in 0..BYTES.len() {
            for n in 0..=BYTES.len() - k {
                c.seek(k);
                let first = c.read_bytes(n).unwrap();
                c.seek(k);
                assert_eq!(c.read_bytes(n).unwrap(), first);
            }
        }
    }

    #[test]
    fn rewind_restores_offset() {
        let mut c = Cursor::new(&BYTES);
        c.skip(2).unwrap();
        for n in 0..=6 {
            let before = c.position();
            c.read_bytes(n).unwrap();
            c.rewind(n);
            assert_eq!(c.position(), before);
        }
        c.rewind(100);
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn seek_is_clamped() {
        let mut c = Cursor::new(&BYTES);
        c.seek(1000);
        assert_eq!(c.position(), BYTES.len());
        assert_eq!(c.remaining(), 0);
        assert!(matches!(
            c.read_u8(),
            Err(Error::UnexpectedEndOfBuffer { offset: 8, needed: 1 })
        ));
    }

    #[test]
    fn failed_read_does_not_advance() {
        let mut c = Cursor::new(&BYTES);
        c.seek(6);
        assert!(c.read_u32().is_err());
        assert_eq!(c.position(), 6);
        assert_eq!(c.read_u16().unwrap(), 0x7F80);
    }

    #[test]
    fn sub_cursor_is_scoped() {
        let c = Cursor::new(&BYTES);
        let mut sub = c.sub_cursor(2, 3).unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.read_bytes(3).unwrap(), &[0x03, 0x04, 0xFE]);
        assert!(sub.read_u8().is_err());
        assert!(c.sub_cursor(6, 3).is_err());
    }

    #[test]
    fn magic_mismatch_names_record() {
        let mut c = Cursor::new(b"RIFX");
        assert!(matches!(
            c.expect_magic(b"RIFF", "RIFF header"),
            Err(Error::SignatureMismatch("RIFF header"))
        ));
    }
}
