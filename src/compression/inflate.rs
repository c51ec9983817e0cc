//! DEFLATE (RFC 1951) decompression: stored, fixed-Huffman and
//! dynamic-Huffman blocks with LZ77 back-references.
//!
//! ## Block header
//! ```text
//! BFINAL  1 bit   set on the last block
//! BTYPE   2 bits  00 stored, 01 fixed Huffman, 10 dynamic Huffman, 11 reserved
//! ```
//!
//! ## Fixed literal/length code
//! ```text
//! symbols   0–143   8 bits   00110000 ..  10111111
//! symbols 144–255   9 bits  110010000 .. 111111111
//! symbols 256–279   7 bits    0000000 ..   0010111   (256 = end of block)
//! symbols 280–287   8 bits   11000000 ..  11000111
//! ```
//! Fixed distance codes are the 5-bit values 0–29.
//!
//! ## Dynamic block header
//! ```text
//! HLIT    5 bits  literal/length code count - 257
//! HDIST   5 bits  distance code count - 1
//! HCLEN   4 bits  code-length code count - 4
//! (HCLEN + 4) × 3 bits   code-length code lengths, in CODE_LENGTH_ORDER
//! HLIT + HDIST lengths   Huffman-coded with the code-length code
//! ```

use log::trace;

use crate::compression::bits::BitReader;
use crate::compression::huffman::HuffmanTree;
use crate::{Error, Result};

/// Base match length for length symbols 257–285.
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits following length symbols 257–285.
const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base distance for distance symbols 0–29.
const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits following distance symbols 0–29.
const DISTANCE_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Transmission order of the code-length code lengths.
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// A decoded literal/length symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitLen {
    /// Output this byte.
    Literal(u8),
    /// Symbol 256.
    EndOfBlock,
    /// Start of a back-reference: `base` plus `extra_bits` more bits.
    Length { base: u16, extra_bits: u8 },
}

impl LitLen {
    /// Map a literal/length symbol (0–285) to its meaning.
    pub fn from_symbol(symbol: usize) -> Option<Self> {
        match symbol {
            0..=255 => Some(LitLen::Literal(symbol as u8)),
            256 => Some(LitLen::EndOfBlock),
            257..=285 => Some(LitLen::Length {
                base: LENGTH_BASE[symbol - 257],
                extra_bits: LENGTH_EXTRA[symbol - 257],
            }),
            _ => None,
        }
    }
}

/// A decoded distance symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distance {
    /// Smallest distance this symbol covers.
    pub base: u16,
    /// Bits to read and add to `base`.
    pub extra_bits: u8,
}

impl Distance {
    /// Map a distance symbol (0–29) to its base and extra bits.
    pub fn from_symbol(symbol: usize) -> Option<Self> {
        (symbol < DISTANCE_BASE.len()).then(|| Distance {
            base: DISTANCE_BASE[symbol],
            extra_bits: DISTANCE_EXTRA[symbol],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockType {
    Stored,
    Fixed,
    Dynamic,
}

impl BlockType {
    fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            0b00 => Ok(BlockType::Stored),
            0b01 => Ok(BlockType::Fixed),
            0b10 => Ok(BlockType::Dynamic),
            _ => Err(Error::Parse("reserved DEFLATE block type")),
        }
    }
}

/// Build the fixed literal/length trie from its explicit code ranges.
pub fn fixed_literal_tree() -> Result<HuffmanTree<LitLen>> {
    let mut tree = HuffmanTree::new();
    for code in 0b0011_0000..=0b1011_1111u32 {
        tree.insert(code, 8, LitLen::Literal((code - 0b0011_0000) as u8))?;
    }
    for code in 0b1_1001_0000..=0b1_1111_1111u32 {
        tree.insert(code, 9, LitLen::Literal((code - 0b1_1001_0000 + 144) as u8))?;
    }
    for code in 0b000_0000..=0b001_0111u32 {
        if let Some(v) = LitLen::from_symbol(256 + code as usize) {
            tree.insert(code, 7, v)?;
        }
    }
    // 286 and 287 take part in the code space but never occur in valid data.
    for code in 0b1100_0000..=0b1100_0111u32 {
        if let Some(v) = LitLen::from_symbol(280 + (code - 0b1100_0000) as usize) {
            tree.insert(code, 8, v)?;
        }
    }
    Ok(tree)
}

/// Build the fixed distance trie (5-bit codes 0–29).
pub fn fixed_distance_tree() -> Result<HuffmanTree<Distance>> {
    let mut tree = HuffmanTree::new();
    for code in 0..32u32 {
        if let Some(v) = Distance::from_symbol(code as usize) {
            tree.insert(code, 5, v)?;
        }
    }
    Ok(tree)
}

/// Decompress a raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    inflate_with_capacity(data, data.len().saturating_mul(3))
}

/// Decompress a raw DEFLATE stream when the output size is known ahead of
/// time, avoiding reallocations.
pub fn inflate_with_capacity(data: &[u8], capacity: usize) -> Result<Vec<u8>> {
    let mut bits = BitReader::new(data);
    let mut out = Vec::with_capacity(capacity);

    loop {
        let is_final = bits.read_bit()? == 1;
        let block_type = BlockType::from_bits(bits.read_bits(2)?)?;
        trace!(
            "DEFLATE {block_type:?} block at byte {} (final: {is_final})",
            bits.bytes_consumed()
        );

        match block_type {
            BlockType::Stored => copy_stored(&mut bits, &mut out)?,
            BlockType::Fixed => {
                let literals = fixed_literal_tree()?;
                let distances = fixed_distance_tree()?;
                decode_block(&mut bits, &literals, &distances, &mut out)?;
            }
            BlockType::Dynamic => {
                let (literals, distances) = read_dynamic_trees(&mut bits)?;
                decode_block(&mut bits, &literals, &distances, &mut out)?;
            }
        }

        if is_final {
            break;
        }
    }

    Ok(out)
}

fn copy_stored(bits: &mut BitReader<'_>, out: &mut Vec<u8>) -> Result<()> {
    let header = bits.read_aligned_bytes(4)?;
    let len = u16::from_le_bytes([header[0], header[1]]);
    let nlen = u16::from_le_bytes([header[2], header[3]]);
    if len != !nlen {
        return Err(Error::Parse("stored block length complement mismatch"));
    }
    out.extend_from_slice(bits.read_aligned_bytes(len as usize)?);
    Ok(())
}

/// Read the code-length code and the literal/length and distance code
/// lengths of a dynamic block, and build both tries.
pub fn read_dynamic_trees(
    bits: &mut BitReader<'_>,
) -> Result<(HuffmanTree<LitLen>, HuffmanTree<Distance>)> {
    let hlit = bits.read_bits(5)? as usize + 257;
    let hdist = bits.read_bits(5)? as usize + 1;
    let hclen = bits.read_bits(4)? as usize + 4;

    let mut cl_lengths = [0u8; 19];
    for &symbol in &CODE_LENGTH_ORDER[..hclen] {
        cl_lengths[symbol] = bits.read_bits(3)? as u8;
    }
    let cl_tree = HuffmanTree::from_lengths(&cl_lengths, |s| Some(s as u8))?;

    let total = hlit + hdist;
    let mut lengths: Vec<u8> = Vec::with_capacity(total);
    while lengths.len() < total {
        let (value, repeat) = match cl_tree.decode(bits)? {
            len @ 0..=15 => (len, 1),
            16 => {
                let prev = *lengths
                    .last()
                    .ok_or(Error::Parse("code length repeat with no previous length"))?;
                (prev, 3 + bits.read_bits(2)? as usize)
            }
            17 => (0, 3 + bits.read_bits(3)? as usize),
            18 => (0, 11 + bits.read_bits(7)? as usize),
            _ => return Err(Error::Parse("invalid code length symbol")),
        };
        if lengths.len() + repeat > total {
            return Err(Error::Parse("code length repeat overruns table"));
        }
        lengths.extend(std::iter::repeat_n(value, repeat));
    }

    trace!("dynamic block: {hlit} literal/length codes, {hdist} distance codes, {hclen} code length codes");

    let literals = HuffmanTree::from_lengths(&lengths[..hlit], LitLen::from_symbol)?;
    let distances = HuffmanTree::from_lengths(&lengths[hlit..], Distance::from_symbol)?;
    Ok((literals, distances))
}

fn decode_block(
    bits: &mut BitReader<'_>,
    literals: &HuffmanTree<LitLen>,
    distances: &HuffmanTree<Distance>,
    out: &mut Vec<u8>,
) -> Result<()> {
    loop {
        match literals.decode(bits)? {
            LitLen::Literal(b) => out.push(b),
            LitLen::EndOfBlock => return Ok(()),
            LitLen::Length { base, extra_bits } => {
                let length = base as usize + bits.read_bits(extra_bits as u32)? as usize;
                let d = distances.decode(bits)?;
                let distance = d.base as usize + bits.read_bits(d.extra_bits as u32)? as usize;
                if distance > out.len() {
                    return Err(Error::Parse("back-reference before start of output"));
                }
                // Byte by byte: the source may overlap the bytes being written.
                let start = out.len() - distance;
                for i in 0..length {
                    let b = out[start + i];
                    out.push(b);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_block_single_literal() {
        assert_eq!(inflate(&[0x4B, 0x04, 0x00]).unwrap(), b"a");
    }

    #[test]
    fn fixed_block_overlapping_back_reference() {
        // 'a', then length 4 at distance 1.
        assert_eq!(inflate(&[0x4B, 0x04, 0x01, 0x00]).unwrap(), b"aaaaa");
    }

    #[test]
    fn stored_block() {
        let data = [0x01, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c'];
        assert_eq!(inflate(&data).unwrap(), b"abc");
    }

    #[test]
    fn stored_block_with_bad_complement() {
        let data = [0x01, 0x03, 0x00, 0xFD, 0xFF, b'a', b'b', b'c'];
        assert!(matches!(inflate(&data), Err(Error::Parse(_))));
    }

    #[test]
    fn reserved_block_type() {
        assert!(matches!(
            inflate(&[0x07]),
            Err(Error::Parse("reserved DEFLATE block type"))
        ));
    }

    #[test]
    fn back_reference_before_output_start() {
        // Length 4 at distance 1 with nothing decoded yet.
        assert!(matches!(
            inflate(&[0x03, 0x01, 0x00]),
            Err(Error::Parse("back-reference before start of output"))
        ));
    }

    /// Pack `(value, width)` fields LSB-first.
    fn pack(fields: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let (mut acc, mut n) = (0u32, 0u32);
        for &(value, width) in fields {
            acc |= value << n;
            n += width;
            while n >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                n -= 8;
            }
        }
        if n > 0 {
            out.push(acc as u8);
        }
        out
    }

    /// Final dynamic block header: 257 literal/length and 1 distance code,
    /// code length codes given for symbols 16, 17, 18 and 0.
    fn dynamic_header(lengths: [u32; 4]) -> Vec<(u32, u32)> {
        let mut fields = vec![(1, 1), (2, 2), (0, 5), (0, 5), (0, 4)];
        fields.extend(lengths.iter().map(|&len| (len, 3)));
        fields
    }

    #[test]
    fn dynamic_repeat_without_previous_length() {
        // Code length codes: 0 -> "0", 16 -> "1"; the first symbol is 16.
        let mut fields = dynamic_header([1, 0, 0, 1]);
        fields.extend([(1, 1), (0, 2)]);
        assert!(matches!(
            inflate(&pack(&fields)),
            Err(Error::Parse("code length repeat with no previous length"))
        ));
    }

    #[test]
    fn dynamic_zero_run_overruns_table() {
        // Code length codes: 0 -> "0", 18 -> "1"; 138 + 138 zeros > 258.
        let mut fields = dynamic_header([0, 0, 1, 1]);
        fields.extend([(1, 1), (127, 7), (1, 1), (127, 7)]);
        assert!(matches!(
            inflate(&pack(&fields)),
            Err(Error::Parse("code length repeat overruns table"))
        ));
    }

    #[test]
    fn dynamic_short_zero_run_overruns_table() {
        // Code length codes: 0 -> "0", 17 -> "1"; 26 runs of 10 zeros > 258.
        let mut fields = dynamic_header([0, 1, 0, 1]);
        for _ in 0..26 {
            fields.extend([(1, 1), (7, 3)]);
        }
        assert!(matches!(
            inflate(&pack(&fields)),
            Err(Error::Parse("code length repeat overruns table"))
        ));
    }

    #[test]
    fn truncated_stream() {
        assert!(matches!(
            inflate(&[0x4B]),
            Err(Error::UnexpectedEndOfBuffer { .. })
        ));
    }

    #[test]
    fn fixed_tables_cover_the_code_space() {
        let literals = fixed_literal_tree().unwrap();
        // 286 literal/length symbols; 286 and 287 are left out.
        assert_eq!(literals.len(), 286);
        assert_eq!(literals.lookup("00110000"), Some(LitLen::Literal(0)));
        assert_eq!(literals.lookup("111111111"), Some(LitLen::Literal(255)));
        assert_eq!(literals.lookup("0000000"), Some(LitLen::EndOfBlock));
        assert_eq!(
            literals.lookup("11000101"),
            Some(LitLen::Length {
                base: 258,
                extra_bits: 0
            })
        );
        assert_eq!(literals.lookup("11000110"), None);
        assert_eq!(fixed_distance_tree().unwrap().len(), 30);
    }

    #[test]
    fn length_symbols_carry_extra_bits() {
        assert_eq!(
            LitLen::from_symbol(265),
            Some(LitLen::Length {
                base: 11,
                extra_bits: 1
            })
        );
        assert_eq!(LitLen::from_symbol(286), None);
        assert_eq!(
            Distance::from_symbol(29),
            Some(Distance {
                base: 24577,
                extra_bits: 13
            })
        );
    }
}
