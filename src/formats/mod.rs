//! Parsers for the supported container formats.
//!
//! Each submodule targets one format family. All parsers follow the same
//! conventions:
//!
//! * **Cursor based** - every top-level type has a `parse(&mut Cursor)`
//!   constructor. The whole file is in memory, so parsers jump freely to
//!   offsets declared in headers and come back.
//! * **Little-endian** - every multi-byte field in these formats is LE, the
//!   [`crate::cursor::Cursor`] default.
//! * **Decompression is separate** - parsers hand back raw payloads; call
//!   [`gif::TableBasedImage::decode_indices`] or [`zip::ZipEntry::decompress`]
//!   (both built on [`crate::compression`]) when the bytes are needed.
//!
//! ## Format overview
//!
//! | Module   | Format     | Description |
//! |----------|------------|-------------|
//! | [`gif`]  | GIF89a     | Block stream of images and extensions; image data is LZW-compressed |
//! | [`wav`]  | RIFF/WAVE  | Chunk tree with a format chunk, sample data and INFO metadata |
//! | [`zip`]  | PKZIP      | Central directory, local headers and data descriptors |
//! | [`bcx`]  | BCX        | FF7 field model: skeleton, mesh parts and animations |
//! | [`tdb`]  | TDB        | FF7 field textures: 4-bit images and A1B5G5R5 palettes |

pub mod bcx;
pub mod gif;
pub mod tdb;
pub mod wav;
pub mod zip;
