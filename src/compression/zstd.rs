//! Zstandard entry payloads (requires the `compression` feature).
//!
//! ZIP method 93 stores each entry as one complete Zstd frame. The central
//! directory already records the uncompressed size, so the decoder works
//! into a buffer of exactly that capacity and a frame that expands past it
//! is rejected.

#![cfg(feature = "compression")]

use log::trace;

use crate::{Error, Result};

/// Decode a single Zstd frame expected to expand to `expected_size` bytes.
///
/// Returns [`Error::Zstd`] when the frame is corrupt or expands past
/// `expected_size`. A frame that comes up short is returned as is; the
/// caller compares lengths against its own directory.
pub fn decompress_zstd(frame: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let out = zstd::bulk::decompress(frame, expected_size).map_err(|_| Error::Zstd)?;
    trace!("zstd frame: {} -> {} bytes", frame.len(), out.len());
    Ok(out)
}
