//! **binscope** - byte-exact parsers for a handful of binary container
//! formats, with the LZW and DEFLATE decoders their payloads need.
//!
//! # Supported formats
//! | Module | Format | Entry point |
//! |--------|--------|-------------|
//! | [`formats::gif`] | GIF87a / GIF89a | [`parse_gif`] |
//! | [`formats::wav`] | RIFF/WAVE | [`parse_wav`] |
//! | [`formats::zip`] | PKZIP | [`parse_zip`] |
//! | [`formats::bcx`] | BCX (FF7 field model) | [`parse_bcx`] |
//! | [`formats::tdb`] | TDB (FF7 field textures) | [`parse_tdb`] |
//!
//! # Decoders
//! | Module | Algorithm |
//! |--------|-----------|
//! | [`compression::lzw`] | GIF variable-width LZW |
//! | [`compression::inflate`] | DEFLATE: stored, fixed and dynamic Huffman blocks |
//! | [`compression::zstd`] | Zstandard (`compression` feature) |
//!
//! Every parser reads from a borrowed [`Cursor`] and fails with a single
//! [`Error`] type. The library logs through the [`log`] facade and never
//! installs a logger itself.

pub mod compression;
pub mod cursor;
pub mod error;
pub mod formats;

pub use cursor::{Cursor, Endian};
pub use error::{Error, Result};

use formats::bcx::Model;
use formats::gif::Gif;
use formats::tdb::TextureDatabase;
use formats::wav::WavData;
use formats::zip::ZipArchive;

/// Parse a GIF file.
pub fn parse_gif(bytes: &[u8]) -> Result<Gif> {
    Gif::parse(&mut Cursor::new(bytes))
}

/// Parse a RIFF/WAVE file.
pub fn parse_wav(bytes: &[u8]) -> Result<WavData> {
    WavData::parse(&mut Cursor::new(bytes))
}

/// Parse a ZIP archive. Entry payloads borrow `bytes`.
pub fn parse_zip(bytes: &[u8]) -> Result<ZipArchive<'_>> {
    ZipArchive::parse(&mut Cursor::new(bytes))
}

/// Parse a BCX model.
pub fn parse_bcx(bytes: &[u8]) -> Result<Model> {
    Model::parse(&mut Cursor::new(bytes))
}

/// Parse a TDB texture database.
pub fn parse_tdb(bytes: &[u8]) -> Result<TextureDatabase> {
    TextureDatabase::parse(&mut Cursor::new(bytes))
}
