//! GIF87a / GIF89a data stream.
//!
//! ## Layout
//! ```text
//! [0x00] Header                     (6 bytes)
//! [0x06] Logical Screen Descriptor  (7 bytes)
//! [0x0D] Global Color Table         (optional, 3 × 2^(size+1) bytes)
//! [...]  Blocks, each introduced by a marker byte:
//!          0x2C  Image Descriptor (+ Local Color Table) + image data
//!          0x21  Extension, followed by a label byte
//!          0x3B  Trailer
//! ```
//!
//! ## Header (6 bytes)
//! ```text
//! [0x00] Signature "GIF"    (3 bytes)
//! [0x03] Version            (3 bytes, two digits + lowercase letter, e.g. "89a")
//! ```
//!
//! ## Logical Screen Descriptor (7 bytes)
//! ```text
//! [0x00] Width              (u16)
//! [0x02] Height             (u16)
//! [0x04] Packed             (u8)
//!         bit 7     Global Color Table flag
//!         bits 6-4  Color resolution
//!         bit 3     Sort flag
//!         bits 2-0  Global Color Table size exponent
//! [0x05] Background color index (u8)
//! [0x06] Pixel aspect ratio     (u8)
//! ```
//!
//! ## Image Descriptor (9 bytes after the 0x2C marker)
//! ```text
//! [0x00] Left               (u16)
//! [0x02] Top                (u16)
//! [0x04] Width              (u16)
//! [0x06] Height             (u16)
//! [0x08] Packed             (u8)
//!         bit 7     Local Color Table flag
//!         bit 6     Interlace flag
//!         bit 5     Sort flag
//!         bits 2-0  Local Color Table size exponent
//! ```
//! Followed by the LZW minimum code size (u8) and data sub-blocks.
//!
//! ## Extensions (after the 0x21 introducer)
//! ```text
//! 0xF9  Graphic Control   block size 4: packed, delay (u16), transparent index, terminator 0
//!         packed bits 4-2 disposal method, bit 1 user input, bit 0 transparent color
//! 0xFE  Comment           data sub-blocks
//! 0x01  Plain Text        block size 12: left, top, width, height (u16),
//!                         cell width, cell height, fg index, bg index (u8); sub-blocks
//! 0xFF  Application       block size 11: identifier (8), authentication code (3); sub-blocks
//! ```
//!
//! ## Data sub-blocks
//! A length byte followed by that many bytes, repeated until a zero length.
//!
//! A Graphic Control Extension applies to the next graphic rendering block
//! (an image or a plain text extension), which is why both are grouped into
//! one [`GraphicBlock`].

use log::{debug, trace, warn};

use crate::compression::lzw;
use crate::cursor::{Cursor, latin1};
use crate::{Error, Result};

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const COMMENT_LABEL: u8 = 0xFE;
const PLAIN_TEXT_LABEL: u8 = 0x01;
const APPLICATION_LABEL: u8 = 0xFF;

/// RGB triplets of a global or local colour table.
pub type ColorTable = Vec<[u8; 3]>;

/// Parsed GIF data stream.
#[derive(Debug, Clone)]
pub struct Gif {
    /// Version token, e.g. `"89a"`.
    pub version: String,
    /// Canvas size and global table flags.
    pub screen: LogicalScreenDescriptor,
    /// Present when the screen descriptor's flag is set.
    pub global_color_table: Option<ColorTable>,
    /// Blocks in stream order, up to (not including) the trailer.
    pub blocks: Vec<Block>,
}

/// Canvas size and global colour table flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    /// Canvas width in pixels.
    pub width: u16,
    /// Canvas height in pixels.
    pub height: u16,
    /// Whether a global colour table follows the descriptor.
    pub global_color_table: bool,
    /// Bits per primary colour in the source image, minus one.
    pub color_resolution: u8,
    /// Whether the global table is sorted by importance.
    pub sort: bool,
    /// Size exponent; the table holds `2^(size + 1)` colours.
    pub global_color_table_size: u8,
    /// Global table index used for uncovered canvas pixels.
    pub background_color_index: u8,
    /// Raw aspect ratio byte; 0 means no information.
    pub pixel_aspect_ratio: u8,
}

/// One top-level block of the data stream.
#[derive(Debug, Clone)]
pub enum Block {
    /// An image or plain text block, with its control extension if any.
    Graphic(GraphicBlock),
    /// Comment extension (label `0xFE`).
    Comment(CommentExtension),
    /// Application extension (label `0xFF`).
    Application(ApplicationExtension),
}

/// A graphic rendering block and the control extension preceding it.
#[derive(Debug, Clone)]
pub struct GraphicBlock {
    /// Graphic control extension that preceded the block, if any.
    pub control: Option<GraphicControlExtension>,
    pub rendering: RenderingBlock,
}

/// Something drawn on the canvas.
#[derive(Debug, Clone)]
pub enum RenderingBlock {
    /// Image descriptor (marker `0x2C`) and its data.
    Image(TableBasedImage),
    /// Plain text extension (label `0x01`).
    PlainText(PlainTextExtension),
}

/// Graphic control extension (label `0xF9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicControlExtension {
    /// 0 unspecified, 1 leave in place, 2 restore background, 3 restore previous.
    pub disposal_method: u8,
    /// Whether the viewer should wait for user input before continuing.
    pub user_input: bool,
    /// Whether `transparent_color_index` is meaningful.
    pub transparent_color: bool,
    /// Hundredths of a second.
    pub delay_time: u16,
    pub transparent_color_index: u8,
}

/// Position and size of an image on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// Whether a local colour table follows the descriptor.
    pub local_color_table: bool,
    /// Whether rows are stored in four interlaced passes.
    pub interlace: bool,
    /// Whether the local table is sorted by importance.
    pub sort: bool,
    /// Size exponent; the table holds `2^(size + 1)` colours.
    pub local_color_table_size: u8,
}

/// Image descriptor, optional local colour table and compressed image data.
#[derive(Debug, Clone)]
pub struct TableBasedImage {
    pub descriptor: ImageDescriptor,
    /// Present when the descriptor's flag is set.
    pub local_color_table: Option<ColorTable>,
    /// Root code size for [`lzw::decode`].
    pub lzw_minimum_code_size: u8,
    /// Compressed image data.
    pub data: SubBlocks,
}

impl TableBasedImage {
    /// Run the LZW decoder over the image data, yielding one colour index
    /// per pixel (in stream order; interlaced rows are not reordered).
    pub fn decode_indices(&self) -> Result<Vec<u8>> {
        lzw::decode(&self.data.bytes, self.lzw_minimum_code_size)
    }
}

/// Text grid rendered with the global colour table.
#[derive(Debug, Clone)]
pub struct PlainTextExtension {
    /// Grid position and size on the canvas, in pixels.
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// Character cell size in pixels.
    pub cell_width: u8,
    pub cell_height: u8,
    pub foreground_color_index: u8,
    pub background_color_index: u8,
    /// Text to render, one character per byte.
    pub text: SubBlocks,
}

/// Free-form comment text.
#[derive(Debug, Clone)]
pub struct CommentExtension {
    pub data: SubBlocks,
}

impl CommentExtension {
    /// Comment text, one character per byte.
    pub fn text(&self) -> String {
        latin1(&self.data.bytes)
    }
}

/// Application-specific data, identified by name.
#[derive(Debug, Clone)]
pub struct ApplicationExtension {
    /// 8-character application identifier, e.g. `"NETSCAPE"`.
    pub identifier: String,
    /// 3-byte code qualifying the identifier, e.g. `b"2.0"`.
    pub authentication_code: [u8; 3],
    /// Application data.
    pub data: SubBlocks,
}

impl ApplicationExtension {
    /// Animation loop count from a NETSCAPE2.0 / ANIMEXTS1.0 extension.
    ///
    /// `Some(0)` means loop forever; `None` if this is some other extension.
    pub fn loop_count(&self) -> Option<u16> {
        let known = matches!(
            (self.identifier.as_str(), &self.authentication_code),
            ("NETSCAPE", b"2.0") | ("ANIMEXTS", b"1.0")
        );
        match self.data.bytes.as_slice() {
            [1, lo, hi, ..] if known => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }
}

/// Location of one data sub-block within the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubBlock {
    /// Offset of the first payload byte (after the length byte).
    pub offset: usize,
    /// Payload length (1..=255).
    pub length: u8,
}

/// A chain of data sub-blocks and their concatenated payload.
#[derive(Debug, Clone, Default)]
pub struct SubBlocks {
    /// Non-empty sub-blocks in stream order; the terminator is not listed.
    pub blocks: Vec<SubBlock>,
    /// All payloads joined together.
    pub bytes: Vec<u8>,
}

impl SubBlocks {
    /// Read sub-blocks up to and including the zero-length terminator.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let mut out = Self::default();
        loop {
            let length = c.read_u8()?;
            if length == 0 {
                break;
            }
            let offset = c.position();
            out.bytes.extend_from_slice(c.read_bytes(length as usize)?);
            out.blocks.push(SubBlock { offset, length });
        }
        Ok(out)
    }
}

impl Gif {
    /// Parse a GIF data stream from `c`, positioned at the signature.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        c.expect_magic(b"GIF", "GIF signature")?;
        let version = c.read_array::<3>()?;
        if !(version[0].is_ascii_digit()
            && version[1].is_ascii_digit()
            && version[2].is_ascii_lowercase())
        {
            return Err(Error::SignatureMismatch("GIF version"));
        }
        let version = latin1(&version);

        let width = c.read_u16()?;
        let height = c.read_u16()?;
        let packed = c.read_u8()?;
        let screen = LogicalScreenDescriptor {
            width,
            height,
            global_color_table: packed & 0x80 != 0,
            color_resolution: (packed & 0x70) >> 4,
            sort: packed & 0x08 != 0,
            global_color_table_size: packed & 0x07,
            background_color_index: c.read_u8()?,
            pixel_aspect_ratio: c.read_u8()?,
        };

        let global_color_table = if screen.global_color_table {
            Some(read_color_table(c, screen.global_color_table_size)?)
        } else {
            None
        };

        let mut blocks = Vec::new();
        let mut pending_control: Option<GraphicControlExtension> = None;

        loop {
            let offset = c.position();
            let marker = c.read_u8()?;
            match marker {
                TRAILER => break,
                IMAGE_SEPARATOR => {
                    let image = read_image(c)?;
                    trace!(
                        "GIF image at {offset:#x}: {}x{} ({} data bytes)",
                        image.descriptor.width,
                        image.descriptor.height,
                        image.data.bytes.len()
                    );
                    blocks.push(Block::Graphic(GraphicBlock {
                        control: pending_control.take(),
                        rendering: RenderingBlock::Image(image),
                    }));
                }
                EXTENSION_INTRODUCER => {
                    let label = c.read_u8()?;
                    trace!("GIF extension {label:#04x} at {offset:#x}");
                    match label {
                        GRAPHIC_CONTROL_LABEL => {
                            if pending_control.is_some() {
                                warn!("GIF graphic control at {offset:#x} replaces an unused one");
                            }
                            pending_control = Some(read_graphic_control(c)?);
                        }
                        PLAIN_TEXT_LABEL => {
                            let text = read_plain_text(c)?;
                            blocks.push(Block::Graphic(GraphicBlock {
                                control: pending_control.take(),
                                rendering: RenderingBlock::PlainText(text),
                            }));
                        }
                        COMMENT_LABEL => blocks.push(Block::Comment(CommentExtension {
                            data: SubBlocks::parse(c)?,
                        })),
                        APPLICATION_LABEL => {
                            blocks.push(Block::Application(read_application(c)?))
                        }
                        other => return Err(Error::UnknownLabel(other)),
                    }
                }
                other => return Err(Error::UnknownLabel(other)),
            }
        }

        if pending_control.is_some() {
            warn!("GIF graphic control extension not followed by a rendering block");
        }

        debug!(
            "GIF{version} {}x{}: {} blocks",
            screen.width,
            screen.height,
            blocks.len()
        );

        Ok(Self {
            version,
            screen,
            global_color_table,
            blocks,
        })
    }

    /// Every table-based image, in stream order.
    pub fn images(&self) -> impl Iterator<Item = &TableBasedImage> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Graphic(GraphicBlock {
                rendering: RenderingBlock::Image(image),
                ..
            }) => Some(image),
            _ => None,
        })
    }

    /// The colour table `image` is drawn with: its local table if it has
    /// one, else the global table.
    pub fn palette_for<'a>(&'a self, image: &'a TableBasedImage) -> Option<&'a ColorTable> {
        image
            .local_color_table
            .as_ref()
            .or(self.global_color_table.as_ref())
    }

    /// Loop count of the first looping application extension, if any.
    pub fn loop_count(&self) -> Option<u16> {
        self.blocks.iter().find_map(|b| match b {
            Block::Application(app) => app.loop_count(),
            _ => None,
        })
    }
}

fn read_color_table(c: &mut Cursor<'_>, size: u8) -> Result<ColorTable> {
    let entries = 1usize << (size + 1);
    let raw = c.read_bytes(3 * entries)?;
    Ok(raw.chunks_exact(3).map(|rgb| [rgb[0], rgb[1], rgb[2]]).collect())
}

fn expect_block_size(c: &mut Cursor<'_>, expected: u8) -> Result<()> {
    let found = c.read_u8()?;
    if found != expected {
        return Err(Error::MalformedBlockSize { expected, found });
    }
    Ok(())
}

fn read_image(c: &mut Cursor<'_>) -> Result<TableBasedImage> {
    let left = c.read_u16()?;
    let top = c.read_u16()?;
    let width = c.read_u16()?;
    let height = c.read_u16()?;
    let packed = c.read_u8()?;
    let descriptor = ImageDescriptor {
        left,
        top,
        width,
        height,
        local_color_table: packed & 0x80 != 0,
        interlace: packed & 0x40 != 0,
        sort: packed & 0x20 != 0,
        local_color_table_size: packed & 0x07,
    };

    let local_color_table = if descriptor.local_color_table {
        Some(read_color_table(c, descriptor.local_color_table_size)?)
    } else {
        None
    };

    Ok(TableBasedImage {
        descriptor,
        local_color_table,
        lzw_minimum_code_size: c.read_u8()?,
        data: SubBlocks::parse(c)?,
    })
}

fn read_graphic_control(c: &mut Cursor<'_>) -> Result<GraphicControlExtension> {
    expect_block_size(c, 4)?;
    let packed = c.read_u8()?;
    let delay_time = c.read_u16()?;
    let transparent_color_index = c.read_u8()?;
    // Fixed-size block: the terminator must follow immediately.
    expect_block_size(c, 0)?;
    Ok(GraphicControlExtension {
        disposal_method: (packed & 0x1C) >> 2,
        user_input: packed & 0x02 != 0,
        transparent_color: packed & 0x01 != 0,
        delay_time,
        transparent_color_index,
    })
}

fn read_plain_text(c: &mut Cursor<'_>) -> Result<PlainTextExtension> {
    expect_block_size(c, 12)?;
    Ok(PlainTextExtension {
        left: c.read_u16()?,
        top: c.read_u16()?,
        width: c.read_u16()?,
        height: c.read_u16()?,
        cell_width: c.read_u8()?,
        cell_height: c.read_u8()?,
        foreground_color_index: c.read_u8()?,
        background_color_index: c.read_u8()?,
        text: SubBlocks::parse(c)?,
    })
}

fn read_application(c: &mut Cursor<'_>) -> Result<ApplicationExtension> {
    expect_block_size(c, 11)?;
    Ok(ApplicationExtension {
        identifier: c.read_latin1(8)?,
        authentication_code: c.read_array::<3>()?,
        data: SubBlocks::parse(c)?,
    })
}
