//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout binscope.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Every error is fatal to the parse or decode call that raised it; there is
/// no local recovery. Messages are kept terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// A magic/signature field did not match the expected value. The payload
    /// names the record whose signature was checked.
    SignatureMismatch(&'static str),
    /// The signature was recognised but the variant is not handled (a RIFF
    /// form other than `WAVE`, a ZIP compression method without a decoder).
    UnsupportedFormat(String),
    /// A 4-byte tag outside a closed set (WAVE `INFO` sub-chunks, `LIST`
    /// types).
    UnknownChunkType([u8; 4]),
    /// A GIF block marker or extension label outside the known set.
    UnknownLabel(u8),
    /// A read needed more bytes than the buffer holds.
    UnexpectedEndOfBuffer {
        /// Offset at which the read was attempted.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
    },
    /// A fixed-size block declared the wrong length.
    MalformedBlockSize {
        /// Length the format mandates.
        expected: u8,
        /// Length found in the data.
        found: u8,
    },
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
    /// Zstandard decompression failed.
    #[cfg(feature = "compression")]
    Zstd,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SignatureMismatch(what) => write!(f, "signature mismatch: {what}"),
            Error::UnsupportedFormat(s) => write!(f, "unsupported format: {s}"),
            Error::UnknownChunkType(tag) => {
                write!(f, "unknown chunk type: {}", String::from_utf8_lossy(tag))
            }
            Error::UnknownLabel(label) => write!(f, "unknown label: {label:#04x}"),
            Error::UnexpectedEndOfBuffer { offset, needed } => write!(
                f,
                "unexpected end of buffer at offset {offset:#x} (needed {needed} bytes)"
            ),
            Error::MalformedBlockSize { expected, found } => {
                write!(f, "malformed block size: expected {expected}, found {found}")
            }
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "compression")]
            Error::Zstd => write!(f, "zstd decompression failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
