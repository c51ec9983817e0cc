use binscope::formats::bcx::{Frame, PolygonKind};
use binscope::{Error, parse_bcx};
use rstest::rstest;

const SKELETON: u32 = 0x28;
const PART_DATA: u32 = 0x60;
const ANIM_DATA: u32 = 0xA0;

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Two bones, one part (a colour-textured quad and a mono triangle) and one
/// two-frame animation. `high_bit` sets bit 31 on every 31-bit offset.
fn sample_bcx(high_bit: bool) -> Vec<u8> {
    let quirk = if high_bit { 0x8000_0000 } else { 0 };
    let mut b = Vec::new();

    // File header.
    put32(&mut b, 0xBE);
    put32(&mut b, 0x08);

    // Model header.
    put16(&mut b, 0xFF01);
    b.extend_from_slice(&[2, 1, 1]);
    b.extend_from_slice(&[0; 17]);
    put16(&mut b, 1024);
    put16(&mut b, 0x30);
    put16(&mut b, 0x50);
    put32(&mut b, SKELETON | quirk);
    assert_eq!(b.len(), SKELETON as usize);

    // Skeleton.
    put16(&mut b, 100);
    b.extend_from_slice(&[0xFF, 0]);
    put16(&mut b, 50);
    b.extend_from_slice(&[0, 1]);

    // Part header.
    b.extend_from_slice(&[1, 1, 3, 2]);
    b.extend_from_slice(&[1, 0, 0, 0, 1, 0, 0, 0]);
    b.extend_from_slice(&[0, 0]);
    put16(&mut b, 32); // polygons
    put16(&mut b, 28); // texcoords
    put16(&mut b, 0);
    put16(&mut b, 0);
    put16(&mut b, 0);
    put32(&mut b, PART_DATA | quirk);
    put32(&mut b, 0);

    // Animation header.
    put16(&mut b, 2);
    b.extend_from_slice(&[2, 1, 2, 1]);
    put16(&mut b, 22); // frame translations
    put16(&mut b, 26); // static translations
    put16(&mut b, 20); // frame rotations
    put32(&mut b, ANIM_DATA | quirk);
    assert_eq!(b.len(), PART_DATA as usize);

    // Part data.
    b.extend_from_slice(&[0; 4]);
    for v in [[1i16, 2, 3], [-1, -2, -3], [100, -100, 0]] {
        for c in v {
            put16(&mut b, c as u16);
        }
        b.extend_from_slice(&[0; 2]);
    }
    b.extend_from_slice(&[0, 0, 32, 16]);
    // Colour-textured quad.
    b.extend_from_slice(&[0, 1, 2, 0]);
    b.extend_from_slice(&[255, 0, 0, 0, 0, 255, 0, 0, 0, 0, 255, 0, 9, 9, 9, 0]);
    b.extend_from_slice(&[0, 1, 1, 0]);
    // Mono triangle.
    b.extend_from_slice(&[2, 1, 0, 0xEE]);
    b.extend_from_slice(&[10, 20, 30, 0]);
    assert_eq!(b.len(), ANIM_DATA as usize);

    // Animation data.
    b.extend_from_slice(&[0; 4]);
    b.extend_from_slice(&[0b0001_0001, 0, 10, 20, 0, 0xFF, 1, 0]);
    b.extend_from_slice(&[0, 5, 6, 7, 0xFF, 0xFF, 0, 0]);
    b.extend_from_slice(&[64, 128]);
    put16(&mut b, 100);
    put16(&mut b, -100i16 as u16);
    put16(&mut b, 7);
    put16(&mut b, -7i16 as u16);
    assert_eq!(b.len(), 0xBE);
    b
}

#[test]
fn parses_header_and_skeleton() {
    let model = parse_bcx(&sample_bcx(false)).unwrap();
    assert_eq!(model.file_size, 0xBE);
    assert_eq!(model.header.unknown, 0xFF01);
    assert_eq!(model.header.scale, 1024);
    assert_eq!(model.header.skeleton_offset, SKELETON);

    assert_eq!(model.skeleton.len(), 2);
    assert_eq!(model.skeleton[0].length, 100);
    assert!(model.skeleton[0].is_root());
    assert!(!model.skeleton[0].has_mesh);
    assert_eq!(model.skeleton[1].parent, 0);
    assert!(model.skeleton[1].has_mesh);
}

#[test]
fn parses_part_geometry() {
    let model = parse_bcx(&sample_bcx(false)).unwrap();
    let part = &model.parts[0];
    assert_eq!(part.header.bone_index, 1);
    assert_eq!(part.header.polygon_count(PolygonKind::ColorTexturedQuad), 1);
    assert_eq!(part.header.polygon_count(PolygonKind::MonoTriangle), 1);
    assert_eq!(part.vertices, [[1, 2, 3], [-1, -2, -3], [100, -100, 0]]);
    assert_eq!(part.texcoords, [[0, 0], [32, 16]]);

    let kinds: Vec<_> = part.polygons().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        [PolygonKind::ColorTexturedQuad, PolygonKind::MonoTriangle]
    );

    let quad = &part.polygons[0];
    assert_eq!(quad.vertices, [0, 1, 2, 0]);
    assert_eq!(quad.colors, [[255, 0, 0], [0, 255, 0], [0, 0, 255], [9, 9, 9]]);
    assert_eq!(quad.texcoords.as_deref(), Some(&[0, 1, 1, 0][..]));

    let triangle = part.polygons_of(PolygonKind::MonoTriangle).next().unwrap();
    assert_eq!(triangle.vertices, [2, 1, 0]);
    assert_eq!(triangle.color(2), Some([10, 20, 30]));
    assert!(triangle.texcoords.is_none());
}

#[test]
fn resolves_animation_frames() {
    let model = parse_bcx(&sample_bcx(false)).unwrap();
    let animation = &model.animations[0];
    assert_eq!(animation.header.frame_count, 2);
    assert_eq!(animation.channels.len(), 2);

    assert_eq!(
        animation.frames[0],
        [
            Frame {
                rotation: [64, 10, 20],
                translation: [100, 0, -7]
            },
            Frame {
                rotation: [128, 10, 20],
                translation: [-100, 0, -7]
            },
        ]
    );
    let still = Frame {
        rotation: [5, 6, 7],
        translation: [0, 0, 7],
    };
    assert_eq!(animation.frames[1], [still, still]);
}

#[rstest]
#[case::clear(false)]
#[case::set(true)]
fn high_offset_bit_is_ignored(#[case] high_bit: bool) {
    let reference = parse_bcx(&sample_bcx(false)).unwrap();
    let model = parse_bcx(&sample_bcx(high_bit)).unwrap();
    assert_eq!(format!("{model:?}"), format!("{reference:?}"));
    assert_eq!(model.parts[0].header.vertex_offset, PART_DATA);
    assert_eq!(model.animations[0].header.data_offset, ANIM_DATA);
}

#[test]
fn truncated_part_data() {
    let bytes = sample_bcx(false);
    assert!(matches!(
        parse_bcx(&bytes[..0x70]),
        Err(Error::UnexpectedEndOfBuffer { .. })
    ));
}
