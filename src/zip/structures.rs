use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Local File Header signature (`PK\x03\x04`), read as a little-endian u32.
pub const LFH_SIGNATURE: u32 = 0x0403_4B50;

/// Central Directory File Header signature (`PK\x01\x02`), read as a little-endian u32.
pub const CDFH_SIGNATURE: u32 = 0x0201_4B50;

/// Central Directory File Header (CDFH) - 46 bytes fixed part
///
/// Only the fixed part is decoded. The variable-length file name, extra
/// field and comment that follow it in an archive are not read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub lfh_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIZE: usize = 46;

    /// Decode the fixed header from the start of `data`.
    ///
    /// Returns `None` if fewer than [`Self::SIZE`] bytes are available or the
    /// signature does not match. Fields are read one by one as unaligned
    /// little-endian integers, so `data` may start at any offset of a sample.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }

        let mut cursor = Cursor::new(&data[..Self::SIZE]);
        let header = Self {
            signature: cursor.read_u32::<LittleEndian>().ok()?,
            version_made_by: cursor.read_u16::<LittleEndian>().ok()?,
            version_needed: cursor.read_u16::<LittleEndian>().ok()?,
            flags: cursor.read_u16::<LittleEndian>().ok()?,
            compression_method: cursor.read_u16::<LittleEndian>().ok()?,
            last_mod_time: cursor.read_u16::<LittleEndian>().ok()?,
            last_mod_date: cursor.read_u16::<LittleEndian>().ok()?,
            crc32: cursor.read_u32::<LittleEndian>().ok()?,
            compressed_size: cursor.read_u32::<LittleEndian>().ok()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>().ok()?,
            file_name_length: cursor.read_u16::<LittleEndian>().ok()?,
            extra_field_length: cursor.read_u16::<LittleEndian>().ok()?,
            file_comment_length: cursor.read_u16::<LittleEndian>().ok()?,
            disk_number_start: cursor.read_u16::<LittleEndian>().ok()?,
            internal_attrs: cursor.read_u16::<LittleEndian>().ok()?,
            external_attrs: cursor.read_u32::<LittleEndian>().ok()?,
            lfh_offset: cursor.read_u32::<LittleEndian>().ok()?,
        };

        if header.signature != CDFH_SIGNATURE {
            return None;
        }

        Some(header)
    }
}

/// Read a little-endian u32 at `offset`, or `None` if it does not fit.
pub fn read_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    data.get(offset..end).map(LittleEndian::read_u32)
}

/// Check for a Local File Header signature at the start of `data`.
///
/// This is a sanity check that the sample looks like a ZIP archive, not a
/// validation of the archive.
pub fn is_zip_file(data: &[u8]) -> bool {
    read_u32_at(data, 0) == Some(LFH_SIGNATURE)
}
