//! TDB - FF7 field texture database, the texture set BCX models sample.
//!
//! ## Layout
//! ```text
//! [0x00] Total data size             (u32)
//! [0x04] Image count                 (u16)
//! [0x06] Palette count               (u16)
//! [0x08] Image offset                (u32)
//! [0x0C] Palette offset              (u32)
//! [image offset]   Images            (512 bytes each)
//! [palette offset] Palettes          (16 × u16 each)
//! ```
//!
//! ## Image (512 bytes)
//! 32×32 pixels of 4-bit palette indices, two per byte, low nibble first.
//!
//! ## Palette colour (u16, A1B5G5R5)
//! ```text
//! bit 15     transparent when set
//! bits 14-10 blue
//! bits 9-5   green
//! bits 4-0   red
//! ```
//! Channels are scaled to 8 bits by multiplying by 8.

use log::debug;

use crate::cursor::Cursor;
use crate::{Error, Result};

/// Width and height of every image.
pub const IMAGE_DIMENSION: usize = 32;
/// Encoded size of one image.
pub const IMAGE_BYTES: usize = IMAGE_DIMENSION * IMAGE_DIMENSION / 2;
/// Colours per palette.
pub const PALETTE_COLORS: usize = 16;

/// 16 RGBA colours.
pub type Palette = [[u8; 4]; PALETTE_COLORS];

/// A decoded 32×32 image of palette indices, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdbImage {
    pub indices: Vec<u8>,
}

impl TdbImage {
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let raw = c.read_bytes(IMAGE_BYTES)?;
        let indices = raw.iter().flat_map(|&b| [b & 0x0F, b >> 4]).collect();
        Ok(Self { indices })
    }

    /// Palette index at (`x`, `y`).
    pub fn index_at(&self, x: usize, y: usize) -> Option<u8> {
        if x >= IMAGE_DIMENSION || y >= IMAGE_DIMENSION {
            return None;
        }
        self.indices.get(y * IMAGE_DIMENSION + x).copied()
    }
}

/// Convert an A1B5G5R5 colour to `[r, g, b, a]`.
pub fn color_from_a1b5g5r5(c: u16) -> [u8; 4] {
    let r = (c & 0x1F) as u8 * 8;
    let g = ((c >> 5) & 0x1F) as u8 * 8;
    let b = ((c >> 10) & 0x1F) as u8 * 8;
    let a = if c & 0x8000 != 0 { 0 } else { 255 };
    [r, g, b, a]
}

fn read_palette(c: &mut Cursor<'_>) -> Result<Palette> {
    let mut palette = [[0u8; 4]; PALETTE_COLORS];
    for color in &mut palette {
        *color = color_from_a1b5g5r5(c.read_u16()?);
    }
    Ok(palette)
}

/// Parsed texture database.
#[derive(Debug, Clone)]
pub struct TextureDatabase {
    pub total_size: u32,
    pub image_offset: u32,
    pub palette_offset: u32,
    pub images: Vec<TdbImage>,
    pub palettes: Vec<Palette>,
}

impl TextureDatabase {
    /// Parse a TDB file from `c`, positioned at its header.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let start = c.position();
        let total_size = c.read_u32()?;
        let image_count = c.read_u16()?;
        let palette_count = c.read_u16()?;
        let image_offset = c.read_u32()?;
        let palette_offset = c.read_u32()?;

        c.seek(start + image_offset as usize);
        let mut images = Vec::with_capacity(image_count as usize);
        for _ in 0..image_count {
            images.push(TdbImage::parse(c)?);
        }

        c.seek(start + palette_offset as usize);
        let mut palettes = Vec::with_capacity(palette_count as usize);
        for _ in 0..palette_count {
            palettes.push(read_palette(c)?);
        }

        debug!(
            "TDB: {} images, {} palettes",
            images.len(),
            palettes.len()
        );

        Ok(Self {
            total_size,
            image_offset,
            palette_offset,
            images,
            palettes,
        })
    }

    /// Render image `image` with palette `palette` to 32×32 RGBA pixels.
    pub fn rgba(&self, image: usize, palette: usize) -> Result<Vec<u8>> {
        let img = self
            .images
            .get(image)
            .ok_or(Error::Parse("TDB image index out of range"))?;
        let pal = self
            .palettes
            .get(palette)
            .ok_or(Error::Parse("TDB palette index out of range"))?;
        Ok(img
            .indices
            .iter()
            .flat_map(|&i| pal[i as usize & 0x0F])
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1b5g5r5_channels() {
        assert_eq!(color_from_a1b5g5r5(0x0000), [0, 0, 0, 255]);
        assert_eq!(color_from_a1b5g5r5(0x801F), [248, 0, 0, 0]);
        assert_eq!(color_from_a1b5g5r5(0x03E0), [0, 248, 0, 255]);
        assert_eq!(color_from_a1b5g5r5(0x7C00), [0, 0, 248, 255]);
    }
}
