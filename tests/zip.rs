use std::io::Write;

#[cfg(feature = "compression")]
use binscope::formats::zip::METHOD_ZSTD;
use binscope::formats::zip::{DosDateTime, METHOD_DEFLATED, METHOD_STORED};
use binscope::{Error, parse_zip};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use rstest::rstest;

// 2024-02-29 12:34:56
const DOS_TIME: u16 = (12 << 11) | (34 << 5) | (56 / 2);
const DOS_DATE: u16 = ((2024 - 1980) << 9) | (2 << 5) | 29;

struct Member<'a> {
    name: &'a str,
    contents: &'a [u8],
    method: u16,
    descriptor: bool,
}

impl<'a> Member<'a> {
    fn stored(name: &'a str, contents: &'a [u8]) -> Self {
        Self {
            name,
            contents,
            method: METHOD_STORED,
            descriptor: false,
        }
    }

    fn deflated(name: &'a str, contents: &'a [u8]) -> Self {
        Self {
            method: METHOD_DEFLATED,
            ..Self::stored(name, contents)
        }
    }
}

fn deflate(data: &[u8], level: Compression) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), level);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Build an archive with one local header and directory entry per member.
fn build_zip(members: &[Member<'_>], comment: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut directory = Vec::new();

    for m in members {
        let payload = match m.method {
            METHOD_DEFLATED => deflate(m.contents, Compression::default()),
            #[cfg(feature = "compression")]
            METHOD_ZSTD => zstd::encode_all(m.contents, 3).unwrap(),
            _ => m.contents.to_vec(),
        };
        let crc = crc32fast::hash(m.contents);
        let flags: u16 = if m.descriptor { 1 << 3 } else { 0 };
        let offset = out.len() as u32;

        put32(&mut out, 0x0403_4b50);
        put16(&mut out, 20);
        put16(&mut out, flags);
        put16(&mut out, m.method);
        put16(&mut out, DOS_TIME);
        put16(&mut out, DOS_DATE);
        let (local_crc, local_comp, local_size) = if m.descriptor {
            (0, 0, 0)
        } else {
            (crc, payload.len() as u32, m.contents.len() as u32)
        };
        put32(&mut out, local_crc);
        put32(&mut out, local_comp);
        put32(&mut out, local_size);
        put16(&mut out, m.name.len() as u16);
        put16(&mut out, 0);
        out.extend_from_slice(m.name.as_bytes());
        out.extend_from_slice(&payload);
        if m.descriptor {
            put32(&mut out, 0x0807_4b50);
            put32(&mut out, crc);
            put32(&mut out, payload.len() as u32);
            put32(&mut out, m.contents.len() as u32);
        }

        put32(&mut directory, 0x0201_4b50);
        directory.extend_from_slice(&[20, 3]);
        put16(&mut directory, 20);
        put16(&mut directory, flags);
        put16(&mut directory, m.method);
        put16(&mut directory, DOS_TIME);
        put16(&mut directory, DOS_DATE);
        put32(&mut directory, crc);
        put32(&mut directory, payload.len() as u32);
        put32(&mut directory, m.contents.len() as u32);
        put16(&mut directory, m.name.len() as u16);
        put16(&mut directory, 0);
        put16(&mut directory, 0);
        put16(&mut directory, 0);
        put16(&mut directory, 0);
        put32(&mut directory, 0o100644 << 16);
        put32(&mut directory, offset);
        directory.extend_from_slice(m.name.as_bytes());
    }

    let directory_offset = out.len() as u32;
    out.extend_from_slice(&directory);
    put32(&mut out, 0x0605_4b50);
    put16(&mut out, 0);
    put16(&mut out, 0);
    put16(&mut out, members.len() as u16);
    put16(&mut out, members.len() as u16);
    put32(&mut out, directory.len() as u32);
    put32(&mut out, directory_offset);
    put16(&mut out, comment.len() as u16);
    out.extend_from_slice(comment);
    out
}

const TEXT: &[u8] = b"It is a truth universally acknowledged, that a single man in \
possession of a good fortune, must be in want of a wife. It is a truth universally \
acknowledged, that a single man in possession of a good fortune, must be in want of a wife.";

#[test]
fn reads_directory_and_local_headers() {
    let bytes = build_zip(
        &[Member::stored("a.txt", b"hello"), Member::deflated("dir/b.txt", TEXT)],
        b"",
    );
    let zip = parse_zip(&bytes).unwrap();

    assert_eq!(zip.len(), 2);
    assert_eq!(zip.end_of_central_directory.total_entries, 2);
    assert_eq!(zip.end_of_central_directory.offset, bytes.len() - 22);

    let a = &zip.entries[0];
    assert_eq!(a.name(), "a.txt");
    assert_eq!(a.data, b"hello");
    assert_eq!(a.compression_method_name(), Some("no compression"));
    assert_eq!(a.central.version_made_by.host_name(), "UNIX");
    assert_eq!(a.central.version_made_by.spec_version, 20);
    assert_eq!(a.local.file_name, "a.txt");
    assert!(!a.is_encrypted());
    assert!(a.descriptor.is_none());
    assert_eq!(
        a.central.modified,
        DosDateTime {
            year: 2024,
            month: 2,
            day: 29,
            hour: 12,
            minute: 34,
            second: 56
        }
    );

    let b = zip.by_name("dir/b.txt").unwrap();
    assert_eq!(b.compression_method_name(), Some("deflated"));
    assert_eq!(b.central.uncompressed_size as usize, TEXT.len());
    assert!(zip.by_name("missing").is_none());
}

#[test]
fn decompresses_entries() {
    let bytes = build_zip(
        &[Member::stored("a.txt", b"hello"), Member::deflated("b.txt", TEXT)],
        b"",
    );
    let zip = parse_zip(&bytes).unwrap();
    assert_eq!(zip.entries[0].decompress().unwrap(), b"hello");
    assert_eq!(zip.entries[1].decompress().unwrap(), TEXT);
}

#[cfg(feature = "compression")]
#[test]
fn decompresses_zstd_entries() {
    let mut member = Member::stored("c.txt", TEXT);
    member.method = METHOD_ZSTD;
    let bytes = build_zip(&[member], b"");
    let zip = parse_zip(&bytes).unwrap();
    let entry = &zip.entries[0];
    assert_eq!(entry.compression_method(), METHOD_ZSTD);
    assert!(entry.data.len() < TEXT.len());
    assert_eq!(entry.decompress().unwrap(), TEXT);
}

#[cfg(feature = "compression")]
#[test]
fn zstd_crc_mismatch_is_detected() {
    let mut member = Member::stored("c.txt", TEXT);
    member.method = METHOD_ZSTD;
    let mut bytes = build_zip(&[member], b"");
    // The directory CRC sits 16 bytes into the central directory record.
    let at = bytes
        .windows(4)
        .position(|w| w == [0x50, 0x4b, 0x01, 0x02])
        .unwrap();
    bytes[at + 16] ^= 0xFF;
    let zip = parse_zip(&bytes).unwrap();
    assert!(matches!(
        zip.entries[0].decompress(),
        Err(Error::Parse("ZIP entry CRC-32 mismatch"))
    ));
}

#[cfg(feature = "compression")]
#[test]
fn corrupt_zstd_frame_is_rejected() {
    let mut member = Member::stored("c.txt", b"not a zstd frame");
    member.method = METHOD_ZSTD;
    let mut bytes = build_zip(&[member], b"");
    let at = bytes
        .windows(4)
        .position(|w| w == [0x28, 0xb5, 0x2f, 0xfd])
        .unwrap();
    bytes[at] = 0;
    let zip = parse_zip(&bytes).unwrap();
    assert!(matches!(zip.entries[0].decompress(), Err(Error::Zstd)));
}

#[rstest]
#[case::with_comment(true)]
#[case::without_comment(false)]
fn finds_end_record_before_trailing_bytes(#[case] declared: bool) {
    let trailer = b"0123456789";
    let mut bytes;
    if declared {
        bytes = build_zip(&[Member::stored("a", b"x")], trailer);
    } else {
        bytes = build_zip(&[Member::stored("a", b"x")], b"");
        bytes.extend_from_slice(trailer);
    }
    let zip = parse_zip(&bytes).unwrap();
    assert_eq!(zip.end_of_central_directory.offset, bytes.len() - 32);
    assert_eq!(zip.entries[0].data, b"x");
    let expected = if declared { "0123456789" } else { "" };
    assert_eq!(zip.end_of_central_directory.comment, expected);
}

#[test]
fn data_descriptor_supplies_sizes() {
    let mut member = Member::deflated("streamed.txt", TEXT);
    member.descriptor = true;
    let bytes = build_zip(&[member], b"");
    let zip = parse_zip(&bytes).unwrap();

    let entry = &zip.entries[0];
    assert_eq!(entry.local.compressed_size, 0);
    let descriptor = entry.descriptor.unwrap();
    assert!(descriptor.signed);
    assert_eq!(descriptor.uncompressed_size as usize, TEXT.len());
    assert_eq!(descriptor.compressed_size as usize, entry.data.len());
    assert_eq!(descriptor.crc32, crc32fast::hash(TEXT));
    assert_eq!(entry.decompress().unwrap(), TEXT);
}

#[test]
fn crc_mismatch_is_detected() {
    let mut bytes = build_zip(&[Member::stored("a.txt", b"hello")], b"");
    // Corrupt the stored payload in place.
    let at = bytes.windows(5).position(|w| w == b"hello").unwrap();
    bytes[at] = b'j';
    let zip = parse_zip(&bytes).unwrap();
    assert!(matches!(
        zip.entries[0].decompress(),
        Err(Error::Parse("ZIP entry CRC-32 mismatch"))
    ));
}

#[rstest]
#[case::bzip2(12, Some("compressed using BZIP2"))]
#[case::reserved(7, None)]
#[case::unknown(99, None)]
fn other_methods_parse_but_do_not_decompress(
    #[case] method: u16,
    #[case] name: Option<&str>,
) {
    let mut member = Member::stored("x.bin", b"payload");
    member.method = method;
    let bytes = build_zip(&[member], b"");
    let zip = parse_zip(&bytes).unwrap();
    let entry = &zip.entries[0];
    assert_eq!(entry.compression_method(), method);
    assert_eq!(entry.compression_method_name(), name);
    assert!(matches!(entry.decompress(), Err(Error::UnsupportedFormat(_))));
}

#[test]
fn empty_archive() {
    let bytes = build_zip(&[], b"");
    assert_eq!(bytes.len(), 22);
    let zip = parse_zip(&bytes).unwrap();
    assert!(zip.is_empty());
}

#[rstest]
#[case::too_short(vec![0x50, 0x4b, 0x05, 0x06])]
#[case::no_signature(vec![0; 64])]
fn missing_end_record(#[case] bytes: Vec<u8>) {
    assert!(matches!(
        parse_zip(&bytes),
        Err(Error::SignatureMismatch("end of central directory"))
    ));
}

#[test]
fn bad_local_header_signature() {
    let mut bytes = build_zip(&[Member::stored("a.txt", b"hello")], b"");
    bytes[0] = 0;
    assert!(matches!(
        parse_zip(&bytes),
        Err(Error::SignatureMismatch("local file header"))
    ));
}
