//! Variable-width LZW decompression for GIF image data.
//!
//! ## Code stream
//! Given the minimum code size `m` stored before the image sub-blocks:
//! ```text
//! initial code width   m + 1 bits
//! CLEAR                2^m       resets width and table
//! END                  2^m + 1   stops decoding
//! first free code      2^m + 2
//! maximum width        12 bits   (4096 table entries)
//! ```
//! Codes are packed LSB-first across the concatenated sub-block payloads.
//!
//! ## Table
//! Entries are stored as prefix chains: each entry records the code of its
//! prefix, its last byte, its first byte and its length, so appending
//! `conjecture + byte` is O(1) and emitting an entry writes its bytes back to
//! front into the output.

use log::{trace, warn};

use crate::compression::bits::BitReader;
use crate::{Error, Result};

/// Largest code width GIF allows.
pub const MAX_CODE_WIDTH: u32 = 12;

const MAX_TABLE_SIZE: usize = 1 << MAX_CODE_WIDTH;

/// Marks a root entry (single byte, no prefix).
const NO_PREFIX: u16 = u16::MAX;

#[derive(Debug, Clone, Copy)]
struct Entry {
    prefix: u16,
    last: u8,
    first: u8,
    len: u16,
}

/// Code table for one decode call.
struct CodeTable {
    entries: Vec<Entry>,
    roots: usize,
}

impl CodeTable {
    fn new(min_code_size: u8) -> Self {
        let roots = 1usize << min_code_size;
        let mut table = Self {
            entries: Vec::with_capacity(MAX_TABLE_SIZE),
            roots,
        };
        table.reset();
        table
    }

    /// Drop every appended entry, keeping the roots and the two control codes.
    fn reset(&mut self) {
        self.entries.clear();
        for value in 0..self.roots {
            let b = value as u8;
            self.entries.push(Entry {
                prefix: NO_PREFIX,
                last: b,
                first: b,
                len: 1,
            });
        }
        // CLEAR and END occupy codes but never expand to bytes.
        for _ in 0..2 {
            self.entries.push(Entry {
                prefix: NO_PREFIX,
                last: 0,
                first: 0,
                len: 0,
            });
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, code: u16) -> Option<Entry> {
        self.entries.get(code as usize).copied()
    }

    /// Append `entry(prefix) + last`; a no-op once the table is full.
    fn push(&mut self, prefix: u16, last: u8) {
        if self.entries.len() >= MAX_TABLE_SIZE {
            return;
        }
        let parent = self.entries[prefix as usize];
        self.entries.push(Entry {
            prefix,
            last,
            first: parent.first,
            len: parent.len + 1,
        });
    }

    /// Append the bytes of `code` to `out`.
    fn emit(&self, code: u16, out: &mut Vec<u8>) {
        let entry = self.entries[code as usize];
        let start = out.len();
        out.resize(start + entry.len as usize, 0);
        let mut at = out.len();
        let mut cur = entry;
        loop {
            at -= 1;
            out[at] = cur.last;
            if cur.prefix == NO_PREFIX {
                break;
            }
            cur = self.entries[cur.prefix as usize];
        }
    }
}

/// Decompress a GIF LZW stream into colour indices.
///
/// `data` is the concatenation of the image's data sub-blocks (without
/// their length bytes). Decoding stops at the END code, or when the input
/// runs out before one is seen.
pub fn decode(data: &[u8], min_code_size: u8) -> Result<Vec<u8>> {
    if !(1..=11).contains(&min_code_size) {
        return Err(Error::Parse("LZW minimum code size out of range"));
    }

    let clear = 1u16 << min_code_size;
    let end = clear + 1;
    let initial_width = min_code_size as u32 + 1;

    let mut bits = BitReader::new(data);
    let mut table = CodeTable::new(min_code_size);
    let mut width = initial_width;
    let mut conjecture: Option<u16> = None;
    let mut out = Vec::with_capacity(data.len() * 2);

    loop {
        let Some(code) = bits.try_read_bits(width) else {
            warn!("LZW stream ended without END code after {} bytes", out.len());
            break;
        };
        let code = code as u16;

        if code == clear {
            table.reset();
            width = initial_width;
            conjecture = None;
            continue;
        }
        if code == end {
            break;
        }

        let next_free = table.len();
        if (code as usize) < next_free {
            let entry = table.get(code).ok_or(Error::Parse("invalid LZW code"))?;
            if entry.len == 0 {
                return Err(Error::Parse("LZW control code used as data"));
            }
            table.emit(code, &mut out);
            if let Some(prev) = conjecture {
                table.push(prev, entry.first);
            }
        } else if code as usize == next_free {
            // The code being defined by this very step: conjecture + conjecture[0].
            let prev = conjecture.ok_or(Error::Parse("LZW code references empty table slot"))?;
            let first = table
                .get(prev)
                .ok_or(Error::Parse("invalid LZW code"))?
                .first;
            table.push(prev, first);
            table.emit(code, &mut out);
        } else {
            return Err(Error::Parse("LZW code beyond table end"));
        }
        conjecture = Some(code);

        if width < MAX_CODE_WIDTH && table.len() == 1 << width {
            width += 1;
        }
    }

    trace!(
        "LZW decoded {} bytes into {} indices",
        bits.bytes_consumed(),
        out.len()
    );
    Ok(out)
}
