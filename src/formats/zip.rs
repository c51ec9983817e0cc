//! PKZIP archive (APPNOTE.TXT).
//!
//! The archive is read from its end: the End Of Central Directory record
//! (EOCD) sits in the last 22 bytes plus a variable-length comment, so it is
//! found by scanning backward for its signature. The EOCD points at the
//! central directory, and each central directory entry points back at the
//! local file header that precedes the entry's data.
//!
//! ## Layout
//! ```text
//! [local file header 1][data 1][data descriptor 1]
//! ...
//! [local file header n][data n][data descriptor n]
//! [central directory entry 1] ... [central directory entry n]
//! [end of central directory record]
//! ```
//!
//! ## End Of Central Directory (22 bytes + comment)
//! ```text
//! [0x00] Signature 0x06054b50        (u32)
//! [0x04] Number of this disk         (u16)
//! [0x06] Disk with central directory (u16)
//! [0x08] Entries on this disk        (u16)
//! [0x0A] Total entries               (u16)
//! [0x0C] Central directory size      (u32)
//! [0x10] Central directory offset    (u32)
//! [0x14] Comment length              (u16)
//! [0x16] Comment
//! ```
//!
//! ## Central Directory Entry (46 bytes + variable)
//! ```text
//! [0x00] Signature 0x02014b50        (u32)
//! [0x04] Version made by             (u8 spec version, u8 host system)
//! [0x06] Version needed              (u16)
//! [0x08] Flags                       (u16) - bit 0 encrypted, bit 3 data descriptor
//! [0x0A] Compression method          (u16)
//! [0x0C] Modification time           (u16, MS-DOS)
//! [0x0E] Modification date           (u16, MS-DOS)
//! [0x10] CRC-32                      (u32)
//! [0x14] Compressed size             (u32)
//! [0x18] Uncompressed size           (u32)
//! [0x1C] File name length            (u16)
//! [0x1E] Extra field length          (u16)
//! [0x20] File comment length         (u16)
//! [0x22] Disk number start           (u16)
//! [0x24] Internal attributes         (u16)
//! [0x26] External attributes         (u32)
//! [0x2A] Local header offset         (u32)
//! [0x2E] File name, extra field, comment
//! ```
//!
//! ## Local File Header (30 bytes + variable)
//! ```text
//! [0x00] Signature 0x04034b50        (u32)
//! [0x04] Version needed              (u16)
//! [0x06] Flags                       (u16)
//! [0x08] Compression method          (u16)
//! [0x0A] Modification time           (u16)
//! [0x0C] Modification date           (u16)
//! [0x0E] CRC-32                      (u32)
//! [0x12] Compressed size             (u32)
//! [0x16] Uncompressed size           (u32)
//! [0x1A] File name length            (u16)
//! [0x1C] Extra field length          (u16)
//! [0x1E] File name, extra field
//! ```
//!
//! ## Data Descriptor (flag bit 3)
//! ```text
//! [0x00] Signature 0x08074b50        (u32, optional)
//! [....] CRC-32                      (u32)
//! [....] Compressed size             (u32)
//! [....] Uncompressed size           (u32)
//! ```

use crc32fast::Hasher;
use log::{debug, trace, warn};

use crate::compression::inflate::inflate_with_capacity;
use crate::cursor::Cursor;
use crate::{Error, Result};

/// `PK\x05\x06`
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
/// `PK\x01\x02`
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
/// `PK\x03\x04`
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
/// `PK\x07\x08`, optional before a data descriptor.
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Size of the EOCD record without its comment.
const END_OF_CENTRAL_DIRECTORY_SIZE: usize = 22;

/// General purpose flag: the payload is encrypted.
pub const FLAG_ENCRYPTED: u16 = 1 << 0;
/// General purpose flag: CRC and sizes follow the payload.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// Stored (no compression).
pub const METHOD_STORED: u16 = 0;
/// DEFLATE.
pub const METHOD_DEFLATED: u16 = 8;
/// Zstandard.
pub const METHOD_ZSTD: u16 = 93;

const COMPRESSION_METHODS: [Option<&str>; 20] = [
    Some("no compression"),
    Some("shrunk"),
    Some("reduced with compression factor 1"),
    Some("reduced with compression factor 2"),
    Some("reduced with compression factor 3"),
    Some("reduced with compression factor 4"),
    Some("imploded"),
    None,
    Some("deflated"),
    Some("enhanced deflated"),
    Some("PKWare DCL imploded"),
    None,
    Some("compressed using BZIP2"),
    None,
    Some("LZMA"),
    None,
    None,
    None,
    Some("compressed using IBM TERSE"),
    Some("IBM LZ77 z"),
];

const HOST_SYSTEMS: [&str; 20] = [
    "MS-DOS and OS/2 (FAT / VFAT / FAT32 file systems)",
    "Amiga",
    "OpenVMS",
    "UNIX",
    "VM/CMS",
    "Atari ST",
    "OS/2 H.P.F.S.",
    "Macintosh",
    "Z-System",
    "CP/M",
    "Windows NTFS",
    "MVS (OS/390 - Z/OS)",
    "VSE",
    "Acorn Risc",
    "VFAT",
    "alternate MVS",
    "BeOS",
    "Tandem",
    "OS/400",
    "OS/X (Darwin)",
];

/// Name of a compression method, or `None` for reserved and unknown
/// method numbers.
pub fn compression_method_name(method: u16) -> Option<&'static str> {
    COMPRESSION_METHODS.get(method as usize).copied().flatten()
}

/// Name of the host system in a "version made by" field.
pub fn host_system_name(host: u8) -> &'static str {
    HOST_SYSTEMS.get(host as usize).copied().unwrap_or("unknown")
}

/// MS-DOS packed modification time and date.
///
/// ```text
/// time: bits 15-11 hour, 10-5 minute, 4-0 second / 2
/// date: bits 15-9 year - 1980, 8-5 month, 4-0 day
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DosDateTime {
    pub year: u16,
    /// 1..=12
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// Always even.
    pub second: u8,
}

impl DosDateTime {
    /// Unpack the MS-DOS `time` and `date` words. Fields are not range-checked.
    pub fn from_dos(time: u16, date: u16) -> Self {
        Self {
            year: (date >> 9) + 1980,
            month: ((date >> 5) & 0x0F) as u8,
            day: (date & 0x1F) as u8,
            hour: (time >> 11) as u8,
            minute: ((time >> 5) & 0x3F) as u8,
            second: ((time & 0x1F) * 2) as u8,
        }
    }
}

impl std::fmt::Display for DosDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// "Version made by": the ZIP specification version and the host system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMadeBy {
    /// Specification version × 10 (e.g. 20 = 2.0).
    pub spec_version: u8,
    /// Host system code; see [`host_system_name`].
    pub host: u8,
}

impl VersionMadeBy {
    /// Name of the host system.
    pub fn host_name(&self) -> &'static str {
        host_system_name(self.host)
    }
}

/// End of central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Absolute offset of the record's signature.
    pub offset: usize,
    /// Number of this disk.
    pub disk_number: u16,
    /// Disk on which the central directory starts.
    pub central_directory_disk: u16,
    /// Directory entries on this disk.
    pub disk_entries: u16,
    /// Directory entries in the whole archive.
    pub total_entries: u16,
    /// Size of the central directory in bytes.
    pub central_directory_size: u32,
    /// Absolute offset of the first central directory entry.
    pub central_directory_offset: u32,
    /// Archive comment, truncated to the bytes actually present.
    pub comment: String,
}

impl EndOfCentralDirectory {
    /// Locate and parse the EOCD record.
    ///
    /// Scans backward one byte at a time from `len - 22`, so a trailing
    /// archive comment of any length is skipped over.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let offset = find_end_of_central_directory(c.data())?;
        c.seek(offset + 4);

        let disk_number = c.read_u16()?;
        let central_directory_disk = c.read_u16()?;
        let disk_entries = c.read_u16()?;
        let total_entries = c.read_u16()?;
        let central_directory_size = c.read_u32()?;
        let central_directory_offset = c.read_u32()?;
        let comment_length = c.read_u16()? as usize;
        if comment_length > c.remaining() {
            warn!(
                "ZIP comment length {comment_length} exceeds the {} bytes left",
                c.remaining()
            );
        }
        let comment = c.read_latin1(comment_length.min(c.remaining()))?;

        Ok(Self {
            offset,
            disk_number,
            central_directory_disk,
            disk_entries,
            total_entries,
            central_directory_size,
            central_directory_offset,
            comment,
        })
    }
}

fn find_end_of_central_directory(data: &[u8]) -> Result<usize> {
    let signature = END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();
    let last = data
        .len()
        .checked_sub(END_OF_CENTRAL_DIRECTORY_SIZE)
        .ok_or(Error::SignatureMismatch("end of central directory"))?;
    (0..=last)
        .rev()
        .find(|&i| data[i..i + 4] == signature)
        .ok_or(Error::SignatureMismatch("end of central directory"))
}

/// Central directory record for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub version_made_by: VersionMadeBy,
    /// Minimum specification version needed to extract, × 10.
    pub version_needed: u16,
    /// General purpose flags (`FLAG_*`).
    pub flags: u16,
    /// Compression method code (`METHOD_*`).
    pub compression_method: u16,
    /// Last modification time.
    pub modified: DosDateTime,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name: String,
    /// Raw extra field.
    pub extra: Vec<u8>,
    /// Per-file comment.
    pub comment: String,
    /// Disk on which the member starts.
    pub disk_start: u16,
    /// Bit 0 set marks a text file.
    pub internal_attributes: u16,
    /// Host-dependent attributes; Unix mode in the high 16 bits.
    pub external_attributes: u32,
    /// Absolute offset of the member's local header.
    pub local_header_offset: u32,
}

impl CentralDirectoryEntry {
    /// Parse one record at the cursor, signature included.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        if c.read_u32()? != CENTRAL_DIRECTORY_SIGNATURE {
            return Err(Error::SignatureMismatch("central directory entry"));
        }
        let version_made_by = VersionMadeBy {
            spec_version: c.read_u8()?,
            host: c.read_u8()?,
        };
        let version_needed = c.read_u16()?;
        let flags = c.read_u16()?;
        let compression_method = c.read_u16()?;
        let time = c.read_u16()?;
        let date = c.read_u16()?;
        let crc32 = c.read_u32()?;
        let compressed_size = c.read_u32()?;
        let uncompressed_size = c.read_u32()?;
        let name_length = c.read_u16()? as usize;
        let extra_length = c.read_u16()? as usize;
        let comment_length = c.read_u16()? as usize;
        let disk_start = c.read_u16()?;
        let internal_attributes = c.read_u16()?;
        let external_attributes = c.read_u32()?;
        let local_header_offset = c.read_u32()?;

        Ok(Self {
            version_made_by,
            version_needed,
            flags,
            compression_method,
            modified: DosDateTime::from_dos(time, date),
            crc32,
            compressed_size,
            uncompressed_size,
            file_name: c.read_latin1(name_length)?,
            extra: c.read_bytes(extra_length)?.to_vec(),
            comment: c.read_latin1(comment_length)?,
            disk_start,
            internal_attributes,
            external_attributes,
            local_header_offset,
        })
    }
}

/// Local header stored directly before a member's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub modified: DosDateTime,
    /// Zero when flag bit 3 defers it to the data descriptor.
    pub crc32: u32,
    /// Zero when flag bit 3 defers the sizes to the data descriptor.
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name: String,
    /// Raw extra field; may differ from the central directory copy.
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Parse a local header at the cursor, leaving it at the payload.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        if c.read_u32()? != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(Error::SignatureMismatch("local file header"));
        }
        let version_needed = c.read_u16()?;
        let flags = c.read_u16()?;
        let compression_method = c.read_u16()?;
        let time = c.read_u16()?;
        let date = c.read_u16()?;
        let crc32 = c.read_u32()?;
        let compressed_size = c.read_u32()?;
        let uncompressed_size = c.read_u32()?;
        let name_length = c.read_u16()? as usize;
        let extra_length = c.read_u16()? as usize;

        Ok(Self {
            version_needed,
            flags,
            compression_method,
            modified: DosDateTime::from_dos(time, date),
            crc32,
            compressed_size,
            uncompressed_size,
            file_name: c.read_latin1(name_length)?,
            extra: c.read_bytes(extra_length)?.to_vec(),
        })
    }
}

/// CRC and sizes written after a streamed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    /// Whether the optional `0x08074b50` signature was present.
    pub signed: bool,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl DataDescriptor {
    /// Parse a descriptor directly after the payload, with or without its
    /// signature.
    pub fn parse(c: &mut Cursor<'_>) -> Result<Self> {
        let signed = c
            .slice(c.position(), 4)
            .is_ok_and(|b| b == DATA_DESCRIPTOR_SIGNATURE.to_le_bytes());
        if signed {
            c.skip(4)?;
        }
        Ok(Self {
            signed,
            crc32: c.read_u32()?,
            compressed_size: c.read_u32()?,
            uncompressed_size: c.read_u32()?,
        })
    }
}

/// One archive member: its directory record, local header and the raw
/// (possibly compressed) payload borrowed from the input.
#[derive(Debug, Clone)]
pub struct ZipEntry<'a> {
    pub central: CentralDirectoryEntry,
    pub local: LocalFileHeader,
    /// Payload as stored in the archive.
    pub data: &'a [u8],
    /// Present when the local header sets flag bit 3.
    pub descriptor: Option<DataDescriptor>,
}

impl ZipEntry<'_> {
    /// File name from the central directory.
    pub fn name(&self) -> &str {
        &self.central.file_name
    }

    pub fn is_encrypted(&self) -> bool {
        self.central.flags & FLAG_ENCRYPTED != 0
    }

    /// Directory entries are named with a trailing `/`.
    pub fn is_dir(&self) -> bool {
        self.central.file_name.ends_with('/')
    }

    pub fn compression_method(&self) -> u16 {
        self.central.compression_method
    }

    /// Name of the compression method, if the code is assigned.
    pub fn compression_method_name(&self) -> Option<&'static str> {
        compression_method_name(self.central.compression_method)
    }

    /// Decompress the payload and check it against the recorded CRC-32.
    ///
    /// Supports stored and DEFLATE entries, plus Zstandard with the
    /// `compression` feature. Encrypted entries and other methods yield
    /// [`Error::UnsupportedFormat`].
    pub fn decompress(&self) -> Result<Vec<u8>> {
        if self.is_encrypted() {
            return Err(Error::UnsupportedFormat(format!(
                "encrypted ZIP entry {:?}",
                self.name()
            )));
        }

        let size = self.central.uncompressed_size as usize;
        let out = match self.central.compression_method {
            METHOD_STORED => self.data.to_vec(),
            METHOD_DEFLATED => inflate_with_capacity(self.data, size)?,
            #[cfg(feature = "compression")]
            METHOD_ZSTD => crate::compression::zstd::decompress_zstd(self.data, size)?,
            method => {
                return Err(Error::UnsupportedFormat(format!(
                    "ZIP compression method {method} ({})",
                    compression_method_name(method).unwrap_or("unknown")
                )));
            }
        };

        if out.len() != size {
            return Err(Error::Parse("ZIP entry size does not match directory"));
        }
        let mut hasher = Hasher::new();
        hasher.update(&out);
        if hasher.finalize() != self.central.crc32 {
            return Err(Error::Parse("ZIP entry CRC-32 mismatch"));
        }
        trace!("ZIP {:?}: {} -> {} bytes", self.name(), self.data.len(), size);
        Ok(out)
    }
}

/// Parsed ZIP archive. Entry payloads borrow the input buffer.
#[derive(Debug, Clone)]
pub struct ZipArchive<'a> {
    /// Trailing record the directory was located from.
    pub end_of_central_directory: EndOfCentralDirectory,
    /// Entries in central directory order.
    pub entries: Vec<ZipEntry<'a>>,
}

impl<'a> ZipArchive<'a> {
    /// Parse the archive occupying the whole of `c`'s buffer.
    pub fn parse(c: &mut Cursor<'a>) -> Result<Self> {
        let eocd = EndOfCentralDirectory::parse(c)?;
        trace!(
            "ZIP EOCD at {:#x}: {} entries, directory at {:#x}",
            eocd.offset, eocd.total_entries, eocd.central_directory_offset
        );

        c.seek(eocd.central_directory_offset as usize);
        let mut directory = Vec::with_capacity(eocd.total_entries as usize);
        for _ in 0..eocd.total_entries {
            directory.push(CentralDirectoryEntry::parse(c)?);
        }

        let mut entries = Vec::with_capacity(directory.len());
        for central in directory {
            c.seek(central.local_header_offset as usize);
            let local = LocalFileHeader::parse(c)?;
            let length = match local.compressed_size {
                0 => central.compressed_size,
                n => n,
            };
            let data = c.read_bytes(length as usize)?;
            let descriptor = if local.flags & FLAG_DATA_DESCRIPTOR != 0 {
                Some(DataDescriptor::parse(c)?)
            } else {
                None
            };
            trace!(
                "ZIP entry {:?}: method {}, {} bytes at {:#x}",
                central.file_name,
                central.compression_method,
                length,
                central.local_header_offset
            );
            entries.push(ZipEntry {
                central,
                local,
                data,
                descriptor,
            });
        }

        debug!("ZIP archive: {} entries", entries.len());

        Ok(Self {
            end_of_central_directory: eocd,
            entries,
        })
    }

    /// Find an entry by its exact name.
    pub fn by_name(&self, name: &str) -> Option<&ZipEntry<'a>> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
