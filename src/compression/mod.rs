//! Decompressors for the payloads found inside the supported containers.
//!
//! Everything here works on fully buffered input and returns a fresh
//! `Vec<u8>`; no encoder is provided. Decoder state lives in locals of each
//! call, so the functions are safe to call from any thread.
//!
//! ## Submodules
//!
//! | Module | Algorithm | Used by |
//! |--------|-----------|---------|
//! | [`bits`]     | LSB-first bit reader        | [`lzw`], [`inflate`] |
//! | [`lzw`]      | Variable-width LZW          | GIF image data |
//! | [`huffman`]  | Canonical Huffman codes     | [`inflate`] |
//! | [`inflate`]  | DEFLATE (RFC 1951)          | ZIP method 8 |
//! | [`zstd`]     | Zstandard                   | ZIP method 93 (`compression` feature) |
//!
//! ## Choosing the right function
//!
//! * **GIF image data** - concatenate the data sub-blocks and call
//!   [`lzw::decode`] with the image's minimum code size, or simply use
//!   [`crate::formats::gif::TableBasedImage::decode_indices`].
//! * **ZIP entries** - [`crate::formats::zip::ZipEntry::decompress`] picks the
//!   decoder from the entry's method and checks the CRC-32. Call
//!   [`inflate::inflate_with_capacity`] directly when the uncompressed size
//!   is known and no CRC is available.

pub mod bits;
pub mod huffman;
pub mod inflate;
pub mod lzw;

#[cfg(feature = "compression")]
pub mod zstd;
