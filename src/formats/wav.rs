//! RIFF/WAVE audio container.
//!
//! ## Layout
//! ```text
//! [0x00] "RIFF"             (4 bytes)
//! [0x04] Size               (u32) - bytes after this field
//! [0x08] Form type "WAVE"   (4 bytes)
//! [0x0C] Chunks until the end of the RIFF region
//! ```
//!
//! ## Chunk
//! ```text
//! [0x00] Tag                (4 bytes)
//! [0x04] Size               (u32)
//! [0x08] Payload            (Size bytes, + 1 pad byte when Size is odd)
//! ```
//!
//! ## "fmt " payload
//! ```text
//! [0x00] Format tag         (u16) - 1 PCM, 0x101 µ-law, 0x102 A-law, 0x103 ADPCM
//! [0x02] Channels           (u16)
//! [0x04] Sample rate        (u32)
//! [0x08] Byte rate          (u32)
//! [0x0C] Block align        (u16)
//! [0x0E] Bits per sample    (u16) - read for PCM only
//! ```
//!
//! ## "LIST" payload
//! A 4-byte list type followed by sub-chunks. Only `INFO` lists are
//! understood; their sub-chunk tags come from a closed set of 23 metadata
//! fields ([`InfoField`]) and hold NUL-padded text.
//!
//! The `fmt ` chunk comes first. Chunks other than `fmt `, `data` and `LIST`
//! are skipped.

use std::fmt;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::cursor::{Cursor, latin1};
use crate::{Error, Result};

/// Audio encoding named by the format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveFormat {
    /// Uncompressed PCM (`0x0001`).
    Pcm,
    /// IBM µ-law (`0x0101`).
    IbmMuLaw,
    /// IBM A-law (`0x0102`).
    IbmALaw,
    /// IBM AVC ADPCM (`0x0103`).
    IbmAdpcm,
    /// Any other tag, kept verbatim.
    Other(u16),
}

impl WaveFormat {
    /// Classify a `fmt ` format tag.
    pub fn from_tag(tag: u16) -> Self {
        match tag {
            0x0001 => WaveFormat::Pcm,
            0x0101 => WaveFormat::IbmMuLaw,
            0x0102 => WaveFormat::IbmALaw,
            0x0103 => WaveFormat::IbmAdpcm,
            other => WaveFormat::Other(other),
        }
    }

    /// The numeric format tag.
    pub fn tag(self) -> u16 {
        match self {
            WaveFormat::Pcm => 0x0001,
            WaveFormat::IbmMuLaw => 0x0101,
            WaveFormat::IbmALaw => 0x0102,
            WaveFormat::IbmAdpcm => 0x0103,
            WaveFormat::Other(tag) => tag,
        }
    }
}

/// Contents of the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChunk {
    pub format: WaveFormat,
    /// Interleaved channel count.
    pub channels: u16,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Bytes per second of audio.
    pub byte_rate: u32,
    /// Bytes per sample frame across all channels.
    pub block_align: u16,
    /// Only present for PCM.
    pub bits_per_sample: Option<u16>,
}

impl FormatChunk {
    /// Parse a `fmt ` payload. `c` is scoped to the chunk.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let format = WaveFormat::from_tag(c.read_u16()?);
        let channels = c.read_u16()?;
        let sample_rate = c.read_u32()?;
        let byte_rate = c.read_u32()?;
        let block_align = c.read_u16()?;
        let bits_per_sample = match format {
            WaveFormat::Pcm => Some(c.read_u16()?),
            _ => None,
        };
        Ok(Self {
            format,
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
        })
    }
}

macro_rules! info_fields {
    ($($variant:ident => $tag:literal, $name:literal;)*) => {
        /// Metadata field of a `LIST`/`INFO` sub-chunk.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum InfoField {
            $($variant,)*
        }

        impl InfoField {
            /// Every field, in tag order.
            pub const ALL: &'static [InfoField] = &[$(InfoField::$variant,)*];

            /// Map a sub-chunk tag to its field.
            pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
                match tag {
                    $($tag => Some(InfoField::$variant),)*
                    _ => None,
                }
            }

            /// The 4-byte sub-chunk tag.
            pub fn tag(self) -> &'static [u8; 4] {
                match self {
                    $(InfoField::$variant => $tag,)*
                }
            }

            /// Human-readable field name.
            pub fn name(self) -> &'static str {
                match self {
                    $(InfoField::$variant => $name,)*
                }
            }
        }
    };
}

info_fields! {
    ArchivalLocation => b"IARL", "archival location";
    Artist => b"IART", "artist";
    Commissioned => b"ICMS", "commissioned";
    Comments => b"ICMT", "comments";
    Copyright => b"ICOP", "copyright";
    CreationDate => b"ICRD", "creation date";
    Cropped => b"ICRP", "cropped";
    Dimensions => b"IDIM", "dimensions";
    Dpi => b"IDPI", "dots per inch";
    Engineer => b"IENG", "engineer";
    Genre => b"IGNR", "genre";
    Keywords => b"IKEY", "keywords";
    Lightness => b"ILGT", "lightness";
    Medium => b"IMED", "medium";
    Name => b"INAM", "name";
    PaletteSetting => b"IPLT", "palette setting";
    Product => b"IPRD", "product";
    Subject => b"ISBJ", "subject";
    Software => b"ISFT", "software";
    Sharpness => b"ISHP", "sharpness";
    Source => b"ISRC", "source";
    SourceForm => b"ISRF", "source form";
    Technician => b"ITCH", "technician";
}

impl fmt::Display for InfoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed WAVE file.
#[derive(Debug, Clone)]
pub struct WavData {
    /// Size declared in the RIFF header.
    pub riff_size: u32,
    /// The leading `fmt ` chunk.
    pub format: FormatChunk,
    /// `INFO` metadata in file order, NUL bytes stripped.
    pub info: Vec<(InfoField, String)>,
    /// Raw sample bytes of the `data` chunk.
    pub data: Vec<u8>,
}

impl WavData {
    /// Parse a RIFF/WAVE file from `c`, positioned at the `RIFF` tag.
    ///
    /// The first chunk must be `fmt `. Chunks are read only within the region
    /// the RIFF header declares (clamped to the buffer); the cursor is left at
    /// its end.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let start = c.position();
        c.expect_magic(b"RIFF", "RIFF header")?;
        let riff_size = c.read_u32()?;
        let form = c.read_tag()?;
        if &form != b"WAVE" {
            return Err(Error::UnsupportedFormat(format!(
                "RIFF form type {:?}",
                latin1(&form)
            )));
        }

        let body_start = c.position();
        let end = start
            .saturating_add(8)
            .saturating_add(riff_size as usize)
            .clamp(body_start, c.len());
        let mut body = c.sub_cursor(body_start, end - body_start)?;

        let mut format = None;
        let mut info = Vec::new();
        let mut data: Option<&[u8]> = None;

        while body.remaining() >= 8 {
            let tag = body.read_tag()?;
            let size = body.read_u32()? as usize;
            let offset = body.position();
            let payload = body.slice(offset, size)?;
            trace!(
                "WAVE chunk {:?} at {:#x}: {size} bytes",
                latin1(&tag),
                body_start + offset - 8
            );

            match &tag {
                b"fmt " if format.is_none() => {
                    format = Some(FormatChunk::parse(&mut Cursor::new(payload))?)
                }
                _ if format.is_none() => {
                    return Err(Error::Parse("WAVE fmt chunk is not the first chunk"));
                }
                b"fmt " => warn!("ignoring extra WAVE fmt chunk ({size} bytes)"),
                b"data" => {
                    if data.is_some() {
                        warn!("ignoring extra WAVE data chunk ({size} bytes)");
                    } else {
                        data = Some(payload);
                    }
                }
                b"LIST" => info.extend(parse_list(&mut Cursor::new(payload))?),
                _ => warn!("skipping WAVE chunk {:?} ({size} bytes)", latin1(&tag)),
            }

            body.seek(offset + size);
            if size % 2 == 1 && !body.is_eof() {
                body.skip(1)?;
            }
        }

        c.seek(end);

        let format = format.ok_or(Error::Parse("WAVE file has no fmt chunk"))?;
        let data = data
            .ok_or(Error::Parse("WAVE file has no data chunk"))?
            .to_vec();

        debug!(
            "WAVE {:?}: {} ch, {} Hz, {} data bytes, {} INFO fields",
            format.format,
            format.channels,
            format.sample_rate,
            data.len(),
            info.len()
        );

        Ok(Self {
            riff_size,
            format,
            info,
            data,
        })
    }

    /// First value recorded for `field`.
    pub fn info(&self, field: InfoField) -> Option<&str> {
        self.info
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Play time of the sample data, or `None` when the byte rate is zero.
    pub fn duration(&self) -> Option<Duration> {
        match self.format.byte_rate {
            0 => None,
            rate => Some(Duration::from_secs_f64(
                self.data.len() as f64 / rate as f64,
            )),
        }
    }
}

/// Parse a `LIST` payload, which must be of type `INFO`.
fn parse_list(c: &mut Cursor<'_>) -> Result<Vec<(InfoField, String)>> {
    let list_type = c.read_tag()?;
    if &list_type != b"INFO" {
        return Err(Error::UnknownChunkType(list_type));
    }

    let mut fields = Vec::new();
    while c.remaining() >= 8 {
        let tag = c.read_tag()?;
        let size = c.read_u32()? as usize;
        let field = InfoField::from_tag(&tag).ok_or(Error::UnknownChunkType(tag))?;
        let raw = c.read_bytes(size)?;
        let value: String = raw.iter().filter(|&&b| b != 0).map(|&b| b as char).collect();
        trace!("INFO {field}: {value:?}");
        fields.push((field, value));
        if size % 2 == 1 && !c.is_eof() {
            c.skip(1)?;
        }
    }
    Ok(fields)
}
