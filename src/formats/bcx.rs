//! BCX - Final Fantasy VII field model container.
//!
//! Every offset below is absolute within the file. 32-bit offsets only use
//! their low 31 bits; bit 31 is masked off ([`OFFSET_MASK`]) and carries no
//! meaning.
//!
//! ## Layout
//! ```text
//! [0x00] File size                   (u32)
//! [0x04] Model offset                (u32)
//! [model offset]
//!        Model header                (0x20 bytes)
//! [skeleton offset]
//!        Bones                       (4 bytes each)
//!        Part headers                (0x20 bytes each, directly after the bones)
//!        Animation headers           (0x10 bytes each, directly after the parts)
//! ```
//!
//! ## Model Header (0x20 bytes)
//! ```text
//! [0x00] Unknown (always 0xFF01)     (u16)
//! [0x02] Bone count                  (u8)
//! [0x03] Part count                  (u8)
//! [0x04] Animation count             (u8)
//! [0x05] Blank                       (17 bytes)
//! [0x16] Scale                       (u16)
//! [0x18] Parts offset                (u16)
//! [0x1A] Animations offset           (u16)
//! [0x1C] Skeleton offset             (u32, 31 bits)
//! ```
//!
//! ## Bone (4 bytes)
//! ```text
//! [0x00] Length                      (i16)
//! [0x02] Parent index, -1 for root   (i8)
//! [0x03] Has mesh                    (u8)
//! ```
//!
//! ## Part Header (0x20 bytes)
//! ```text
//! [0x00] Lighting flag               (u8) - 1 = compute stage lighting
//! [0x01] Bone index                  (u8)
//! [0x02] Vertex count                (u8)
//! [0x03] Texture coordinate count    (u8)
//! [0x04] Polygon counts              (8 × u8, in PolygonKind order)
//! [0x0C] Flag bytes                  (u8)
//! [0x0D] Control bytes               (u8)
//! [0x0E] Polygon offset              (u16, relative to vertex offset)
//! [0x10] Texture coordinate offset   (u16, relative to vertex offset)
//! [0x12] Flags offset                (u16)
//! [0x14] Control offset              (u16)
//! [0x16] Buffer size                 (u16)
//! [0x18] Vertex offset               (u32, 31 bits)
//! [0x1C] Prec offset                 (u32)
//! ```
//!
//! ## Part Data (at vertex offset)
//! ```text
//! [+0x00]              Padding                  (4 bytes)
//! [+0x04]              Vertices                 (x, y, z i16 + 2 padding bytes each)
//! [+texcoord offset]   Texture coordinates      (u, v u8 each)
//! [+polygon offset]    Polygons, grouped by kind in PolygonKind order:
//!                        vertex indices   4 bytes (3 used by triangles)
//!                        colours          4 bytes each (RGB + padding), one per
//!                                         corner or a single one for mono kinds
//!                        texcoord indices 4 bytes (textured kinds only)
//! ```
//!
//! ## Animation Header (0x10 bytes)
//! ```text
//! [0x00] Frame count                 (u16)
//! [0x02] Channel count               (u8)
//! [0x03] Frame translation count     (u8)
//! [0x04] Static translation count    (u8)
//! [0x05] Frame rotation count        (u8)
//! [0x06] Frame translation offset    (u16, relative to data offset)
//! [0x08] Static translation offset   (u16, relative to data offset)
//! [0x0A] Frame rotation offset       (u16, relative to data offset)
//! [0x0C] Data offset                 (u32, 31 bits)
//! ```
//!
//! ## Animation Channel (8 bytes, from data offset + 4)
//! ```text
//! [0x00] Flag                        (u8)
//!         bits 0-2  rotation x/y/z varies per frame
//!         bits 4-6  translation x/y/z varies per frame
//! [0x01] Rotation x, y, z            (3 × u8) - value, or frame table index
//! [0x04] Translation x, y, z         (3 × u8) - frame or static table index
//! [0x07] Padding
//! ```
//! A per-frame rotation reads the u8 at `rotation table + index × frames +
//! frame`; a per-frame translation reads the i16 at `translation table +
//! index × frames × 2 + frame × 2`. A static translation reads the i16 at
//! `static table + index × 2`, except that index `0xFF` means 0.

use log::{debug, trace};

use crate::cursor::Cursor;
use crate::Result;

/// Valid bits of a 32-bit offset field.
pub const OFFSET_MASK: u32 = 0x7FFF_FFFF;

/// Static translation index meaning "no translation".
const NO_TRANSLATION: u8 = 0xFF;

/// Parsed BCX model.
#[derive(Debug, Clone)]
pub struct Model {
    /// Size recorded in the file header.
    pub file_size: u32,
    /// Absolute offset of the model header.
    pub model_offset: u32,
    pub header: ModelHeader,
    /// Bones in file order.
    pub skeleton: Vec<Bone>,
    pub parts: Vec<Part>,
    pub animations: Vec<Animation>,
}

/// Counts and offsets describing the rest of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHeader {
    /// Always `0xFF01` in shipped files.
    pub unknown: u16,
    pub bone_count: u8,
    pub part_count: u8,
    pub animation_count: u8,
    /// Model scale factor.
    pub scale: u16,
    pub parts_offset: u16,
    pub animations_offset: u16,
    /// Absolute offset of the bone table, bit 31 cleared.
    pub skeleton_offset: u32,
}

impl ModelHeader {
    /// Parse the 0x20-byte model header at the cursor.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let unknown = c.read_u16()?;
        let bone_count = c.read_u8()?;
        let part_count = c.read_u8()?;
        let animation_count = c.read_u8()?;
        c.skip(17)?;
        Ok(Self {
            unknown,
            bone_count,
            part_count,
            animation_count,
            scale: c.read_u16()?,
            parts_offset: c.read_u16()?,
            animations_offset: c.read_u16()?,
            skeleton_offset: c.read_u32()? & OFFSET_MASK,
        })
    }
}

/// One skeleton bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bone {
    /// Bone length in model units.
    pub length: i16,
    /// Index of the parent bone, `-1` for the root.
    pub parent: i8,
    /// Whether a part is attached to this bone.
    pub has_mesh: bool,
}

impl Bone {
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            length: c.read_i16()?,
            parent: c.read_i8()?,
            has_mesh: c.read_u8()? != 0,
        })
    }

    /// Whether the bone has no parent.
    pub fn is_root(&self) -> bool {
        self.parent < 0
    }
}

/// Polygon groups of a part, in the order they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonKind {
    ColorTexturedQuad,
    ColorTexturedTriangle,
    MonoTexturedQuad,
    MonoTexturedTriangle,
    MonoTriangle,
    MonoQuad,
    ColorTriangle,
    ColorQuad,
}

impl PolygonKind {
    /// Storage order.
    pub const ALL: [PolygonKind; 8] = [
        PolygonKind::ColorTexturedQuad,
        PolygonKind::ColorTexturedTriangle,
        PolygonKind::MonoTexturedQuad,
        PolygonKind::MonoTexturedTriangle,
        PolygonKind::MonoTriangle,
        PolygonKind::MonoQuad,
        PolygonKind::ColorTriangle,
        PolygonKind::ColorQuad,
    ];

    /// 4 for quads, 3 for triangles.
    pub fn corners(self) -> usize {
        match self {
            PolygonKind::ColorTexturedQuad
            | PolygonKind::MonoTexturedQuad
            | PolygonKind::MonoQuad
            | PolygonKind::ColorQuad => 4,
            _ => 3,
        }
    }

    /// Whether polygons of this kind carry texture coordinate indices.
    pub fn is_textured(self) -> bool {
        matches!(
            self,
            PolygonKind::ColorTexturedQuad
                | PolygonKind::ColorTexturedTriangle
                | PolygonKind::MonoTexturedQuad
                | PolygonKind::MonoTexturedTriangle
        )
    }

    /// Whether each corner has its own colour.
    pub fn is_per_vertex_color(self) -> bool {
        matches!(
            self,
            PolygonKind::ColorTexturedQuad
                | PolygonKind::ColorTexturedTriangle
                | PolygonKind::ColorTriangle
                | PolygonKind::ColorQuad
        )
    }

    /// Size of one polygon record in bytes.
    pub fn record_size(self) -> usize {
        let colors = if self.is_per_vertex_color() {
            self.corners()
        } else {
            1
        };
        4 + 4 * colors + if self.is_textured() { 4 } else { 0 }
    }
}

/// A triangle or quad of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    /// Group the polygon was read from.
    pub kind: PolygonKind,
    /// One vertex index per corner.
    pub vertices: Vec<u8>,
    /// One colour per corner, or a single colour for mono kinds.
    pub colors: Vec<[u8; 3]>,
    /// One texture coordinate index per corner for textured kinds.
    pub texcoords: Option<Vec<u8>>,
}

impl Polygon {
    /// Read one polygon record of `kind` at the cursor.
    pub fn parse(c: &mut Cursor<'_>, kind: PolygonKind) -> Result<Self> {
        let corners = kind.corners();
        let vertices = c.read_bytes(4)?[..corners].to_vec();
        let color_count = if kind.is_per_vertex_color() {
            corners
        } else {
            1
        };
        let mut colors = Vec::with_capacity(color_count);
        for _ in 0..color_count {
            let [r, g, b, _] = c.read_array::<4>()?;
            colors.push([r, g, b]);
        }
        let texcoords = if kind.is_textured() {
            Some(c.read_bytes(4)?[..corners].to_vec())
        } else {
            None
        };
        Ok(Self {
            kind,
            vertices,
            colors,
            texcoords,
        })
    }

    /// Colour of corner `i`; mono polygons return their single colour.
    pub fn color(&self, i: usize) -> Option<[u8; 3]> {
        if self.kind.is_per_vertex_color() {
            self.colors.get(i).copied()
        } else {
            self.colors.first().copied()
        }
    }
}

/// Counts and offsets for one part's mesh data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartHeader {
    /// 1 when stage lighting is computed for the part.
    pub lighting: u8,
    /// Bone the part is attached to.
    pub bone_index: u8,
    pub vertex_count: u8,
    pub texcoord_count: u8,
    /// Polygon count per kind, indexed like [`PolygonKind::ALL`].
    pub polygon_counts: [u8; 8],
    /// Size of the render flag block in bytes.
    pub flag_bytes: u8,
    /// Size of the render control block in bytes.
    pub control_bytes: u8,
    /// Relative to `vertex_offset`.
    pub polygon_offset: u16,
    /// Relative to `vertex_offset`.
    pub texcoord_offset: u16,
    pub flags_offset: u16,
    pub control_offset: u16,
    pub buffer_size: u16,
    /// Absolute offset of the part data, bit 31 cleared.
    pub vertex_offset: u32,
    /// Kept as stored; not used for parsing.
    pub prec_offset: u32,
}

impl PartHeader {
    /// Parse the 0x20-byte part header at the cursor.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            lighting: c.read_u8()?,
            bone_index: c.read_u8()?,
            vertex_count: c.read_u8()?,
            texcoord_count: c.read_u8()?,
            polygon_counts: c.read_array::<8>()?,
            flag_bytes: c.read_u8()?,
            control_bytes: c.read_u8()?,
            polygon_offset: c.read_u16()?,
            texcoord_offset: c.read_u16()?,
            flags_offset: c.read_u16()?,
            control_offset: c.read_u16()?,
            buffer_size: c.read_u16()?,
            vertex_offset: c.read_u32()? & OFFSET_MASK,
            prec_offset: c.read_u32()?,
        })
    }

    /// Number of polygons of `kind`.
    pub fn polygon_count(&self, kind: PolygonKind) -> u8 {
        self.polygon_counts[kind as usize]
    }
}

/// A mesh attached to one bone.
#[derive(Debug, Clone)]
pub struct Part {
    pub header: PartHeader,
    /// Vertex positions (x, y, z).
    pub vertices: Vec<[i16; 3]>,
    /// Texture coordinates (u, v).
    pub texcoords: Vec<[u8; 2]>,
    /// All polygons in file order (grouped by kind).
    pub polygons: Vec<Polygon>,
}

impl Part {
    /// Read a part header at the cursor and the part data it points to.
    ///
    /// The cursor ends up just past the header, ready for the next one.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let header = PartHeader::parse(c)?;
        let resume = c.position();
        let base = header.vertex_offset as usize;

        c.seek(base + 4);
        let mut vertices = Vec::with_capacity(header.vertex_count as usize);
        for _ in 0..header.vertex_count {
            let x = c.read_i16()?;
            let y = c.read_i16()?;
            let z = c.read_i16()?;
            c.skip(2)?;
            vertices.push([x, y, z]);
        }

        c.seek(base + header.texcoord_offset as usize);
        let mut texcoords = Vec::with_capacity(header.texcoord_count as usize);
        for _ in 0..header.texcoord_count {
            texcoords.push(c.read_array::<2>()?);
        }

        c.seek(base + header.polygon_offset as usize);
        let total: usize = header.polygon_counts.iter().map(|&n| n as usize).sum();
        let mut polygons = Vec::with_capacity(total);
        for kind in PolygonKind::ALL {
            for _ in 0..header.polygon_count(kind) {
                polygons.push(Polygon::parse(c, kind)?);
            }
        }

        c.seek(resume);
        trace!(
            "BCX part on bone {}: {} vertices, {} texcoords, {} polygons",
            header.bone_index,
            vertices.len(),
            texcoords.len(),
            polygons.len()
        );

        Ok(Self {
            header,
            vertices,
            texcoords,
            polygons,
        })
    }

    /// All polygons, in file order.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.polygons.iter()
    }

    /// Polygons of one kind.
    pub fn polygons_of(&self, kind: PolygonKind) -> impl Iterator<Item = &Polygon> {
        self.polygons.iter().filter(move |p| p.kind == kind)
    }
}

/// Counts and table offsets for one animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationHeader {
    pub frame_count: u16,
    /// One channel per bone.
    pub channel_count: u8,
    pub frame_translation_count: u8,
    pub static_translation_count: u8,
    pub frame_rotation_count: u8,
    /// Relative to `data_offset`.
    pub frame_translation_offset: u16,
    /// Relative to `data_offset`.
    pub static_translation_offset: u16,
    /// Relative to `data_offset`.
    pub frame_rotation_offset: u16,
    /// Absolute offset of the animation data, bit 31 cleared.
    pub data_offset: u32,
}

impl AnimationHeader {
    /// Parse the 0x10-byte animation header at the cursor.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            frame_count: c.read_u16()?,
            channel_count: c.read_u8()?,
            frame_translation_count: c.read_u8()?,
            static_translation_count: c.read_u8()?,
            frame_rotation_count: c.read_u8()?,
            frame_translation_offset: c.read_u16()?,
            static_translation_offset: c.read_u16()?,
            frame_rotation_offset: c.read_u16()?,
            data_offset: c.read_u32()? & OFFSET_MASK,
        })
    }
}

/// Per-bone animation channel as stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// Per-frame bits; see [`Channel::rotation_per_frame`] and
    /// [`Channel::translation_per_frame`].
    pub flag: u8,
    /// Constant rotation, or a frame rotation table index.
    pub rotation: [u8; 3],
    /// Frame or static translation table index.
    pub translation: [u8; 3],
}

impl Channel {
    /// Read one 8-byte channel record at the cursor.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let flag = c.read_u8()?;
        let rotation = c.read_array::<3>()?;
        let translation = c.read_array::<3>()?;
        c.skip(1)?;
        Ok(Self {
            flag,
            rotation,
            translation,
        })
    }

    /// Whether rotation `axis` (0..3) is read from the frame table.
    pub fn rotation_per_frame(&self, axis: usize) -> bool {
        self.flag & (1 << axis) != 0
    }

    /// Whether translation `axis` (0..3) is read from the frame table.
    pub fn translation_per_frame(&self, axis: usize) -> bool {
        self.flag & (0x10 << axis) != 0
    }
}

/// Resolved pose of one channel at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    /// Rotation per axis, 0..=255 spanning 0..=360 degrees.
    pub rotation: [u8; 3],
    /// Translation per axis in model units.
    pub translation: [i16; 3],
}

impl Frame {
    /// Rotation scaled to degrees; 255 maps to a full 360.
    pub fn rotation_degrees(&self) -> [f32; 3] {
        self.rotation.map(|r| r as f32 * 360.0 / 255.0)
    }
}

/// An animation with every channel resolved to per-frame poses.
#[derive(Debug, Clone)]
pub struct Animation {
    pub header: AnimationHeader,
    /// Channels as stored, one per bone.
    pub channels: Vec<Channel>,
    /// `frames[channel][frame]`.
    pub frames: Vec<Vec<Frame>>,
}

impl Animation {
    /// Read an animation header at the cursor and resolve every frame.
    ///
    /// The cursor ends up just past the header.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let header = AnimationHeader::parse(c)?;
        let resume = c.position();
        let data = header.data_offset as usize;

        c.seek(data + 4);
        let mut channels = Vec::with_capacity(header.channel_count as usize);
        for _ in 0..header.channel_count {
            channels.push(Channel::parse(c)?);
        }

        let mut frames = Vec::with_capacity(channels.len());
        for channel in &channels {
            let mut track = Vec::with_capacity(header.frame_count as usize);
            for frame in 0..header.frame_count as usize {
                track.push(resolve_frame(c, &header, channel, frame)?);
            }
            frames.push(track);
        }

        c.seek(resume);
        trace!(
            "BCX animation: {} frames × {} channels at {data:#x}",
            header.frame_count,
            header.channel_count
        );

        Ok(Self {
            header,
            channels,
            frames,
        })
    }
}

fn resolve_frame(
    c: &mut Cursor<'_>,
    header: &AnimationHeader,
    channel: &Channel,
    frame: usize,
) -> Result<Frame> {
    let data = header.data_offset as usize;
    let frames = header.frame_count as usize;
    let mut out = Frame::default();

    for axis in 0..3 {
        let index = channel.rotation[axis];
        out.rotation[axis] = if channel.rotation_per_frame(axis) {
            c.seek(data + header.frame_rotation_offset as usize + index as usize * frames + frame);
            c.read_u8()?
        } else {
            index
        };

        let index = channel.translation[axis];
        out.translation[axis] = if channel.translation_per_frame(axis) {
            c.seek(
                data + header.frame_translation_offset as usize
                    + index as usize * frames * 2
                    + frame * 2,
            );
            c.read_i16()?
        } else if index != NO_TRANSLATION {
            c.seek(data + header.static_translation_offset as usize + index as usize * 2);
            c.read_i16()?
        } else {
            0
        };
    }

    Ok(out)
}

impl Model {
    /// Parse a BCX file from `c`, positioned at the file header.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let file_size = c.read_u32()?;
        let model_offset = c.read_u32()?;

        c.seek(model_offset as usize);
        let header = ModelHeader::parse(c)?;

        c.seek(header.skeleton_offset as usize);
        let mut skeleton = Vec::with_capacity(header.bone_count as usize);
        for _ in 0..header.bone_count {
            skeleton.push(Bone::parse(c)?);
        }

        let mut parts = Vec::with_capacity(header.part_count as usize);
        for _ in 0..header.part_count {
            parts.push(Part::parse(c)?);
        }

        let mut animations = Vec::with_capacity(header.animation_count as usize);
        for _ in 0..header.animation_count {
            animations.push(Animation::parse(c)?);
        }

        debug!(
            "BCX model: {} bones, {} parts, {} animations",
            skeleton.len(),
            parts.len(),
            animations.len()
        );

        Ok(Self {
            file_size,
            model_offset,
            header,
            skeleton,
            parts,
            animations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_record_sizes() {
        let sizes: Vec<_> = PolygonKind::ALL.iter().map(|k| k.record_size()).collect();
        assert_eq!(sizes, [24, 20, 12, 12, 8, 8, 16, 20]);
    }

    #[test]
    fn channel_flag_bits() {
        let channel = Channel {
            flag: 0b0101_0010,
            rotation: [0; 3],
            translation: [0; 3],
        };
        assert!(!channel.rotation_per_frame(0));
        assert!(channel.rotation_per_frame(1));
        assert!(channel.translation_per_frame(0));
        assert!(!channel.translation_per_frame(1));
        assert!(channel.translation_per_frame(2));
    }

    #[test]
    fn rotation_units_to_degrees() {
        let frame = Frame {
            rotation: [0, 255, 51],
            translation: [0; 3],
        };
        assert_eq!(frame.rotation_degrees(), [0.0, 360.0, 72.0]);
    }
}
