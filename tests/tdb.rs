use binscope::formats::tdb::{IMAGE_BYTES, IMAGE_DIMENSION};
use binscope::parse_tdb;

fn sample_tdb() -> Vec<u8> {
    let mut b = Vec::new();
    let image_offset = 16u32;
    let palette_offset = image_offset + IMAGE_BYTES as u32;
    let total = palette_offset + 32;
    b.extend_from_slice(&total.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&image_offset.to_le_bytes());
    b.extend_from_slice(&palette_offset.to_le_bytes());

    // Pixel pairs (0, 1), then (2, 15) for the rest of the image.
    b.push(0x10);
    b.extend(std::iter::repeat_n(0xF2, IMAGE_BYTES - 1));

    // Palette: colour 0 black, 1 red, 2 transparent green, 15 white.
    let mut palette = [0u16; 16];
    palette[1] = 0x001F;
    palette[2] = 0x8000 | 0x03E0;
    palette[15] = 0x7FFF;
    for c in palette {
        b.extend_from_slice(&c.to_le_bytes());
    }
    b
}

#[test]
fn nibbles_are_low_first() {
    let tdb = parse_tdb(&sample_tdb()).unwrap();
    assert_eq!(tdb.images.len(), 1);
    let image = &tdb.images[0];
    assert_eq!(image.indices.len(), IMAGE_DIMENSION * IMAGE_DIMENSION);
    assert_eq!(&image.indices[..4], &[0, 1, 2, 15]);
    assert_eq!(image.index_at(1, 0), Some(1));
    assert_eq!(image.index_at(31, 31), Some(15));
    assert_eq!(image.index_at(32, 0), None);
}

#[test]
fn palette_colours_are_expanded() {
    let tdb = parse_tdb(&sample_tdb()).unwrap();
    let palette = &tdb.palettes[0];
    assert_eq!(palette[0], [0, 0, 0, 255]);
    assert_eq!(palette[1], [248, 0, 0, 255]);
    assert_eq!(palette[2], [0, 248, 0, 0]);
    assert_eq!(palette[15], [248, 248, 248, 255]);
}

#[test]
fn renders_rgba() {
    let tdb = parse_tdb(&sample_tdb()).unwrap();
    let pixels = tdb.rgba(0, 0).unwrap();
    assert_eq!(pixels.len(), 32 * 32 * 4);
    assert_eq!(&pixels[..8], &[0, 0, 0, 255, 248, 0, 0, 255]);
    assert!(tdb.rgba(1, 0).is_err());
    assert!(tdb.rgba(0, 1).is_err());
}

#[test]
fn truncated_palette() {
    let bytes = sample_tdb();
    assert!(parse_tdb(&bytes[..bytes.len() - 2]).is_err());
}
