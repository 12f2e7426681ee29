use std::io::Cursor;
use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{EstimateError, Result};

/// End of Central Directory signature (`PK\x05\x06`)
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;
/// Central Directory File Header signature (`PK\x01\x02`)
pub const CDFH_SIGNATURE: u32 = 0x0201_4b50;
/// Local File Header signature (`PK\x03\x04`)
pub const LFH_SIGNATURE: u32 = 0x0403_4b50;
/// Optional data descriptor signature (`PK\x07\x08`)
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Central Directory File Header - 46 bytes before the file name
pub const CDFH_SIZE: usize = 46;
/// Local File Header - 30 bytes before the file name
pub const LFH_SIZE: usize = 30;

// Field offsets inside a central directory record.
pub const CDFH_FLAGS: usize = 8;
pub const CDFH_METHOD: usize = 10;
pub const CDFH_CRC32: usize = 16;
pub const CDFH_COMPRESSED_SIZE: usize = 20;
pub const CDFH_UNCOMPRESSED_SIZE: usize = 24;
pub const CDFH_NAME_LEN: usize = 28;
pub const CDFH_EXTRA_LEN: usize = 30;
pub const CDFH_COMMENT_LEN: usize = 32;
pub const CDFH_LFH_OFFSET: usize = 42;

/// General purpose flag bit 3: sizes and CRC follow the data in a descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// Encode `value` as `width` little-endian bytes.
///
/// `width` must be between 1 and 8 and `value` must fit in it.
pub fn encode_le(value: u64, width: usize) -> Result<Vec<u8>> {
    if !(1..=8).contains(&width) {
        return Err(EstimateError::Unsupported(format!(
            "little-endian field width {width}"
        )));
    }
    if width < 8 && value >> (width * 8) != 0 {
        return Err(EstimateError::Unsupported(format!(
            "value {value} does not fit in {width} bytes"
        )));
    }
    let mut buf = vec![0u8; width];
    LittleEndian::write_uint(&mut buf, value, width);
    Ok(buf)
}

/// Decode a little-endian integer of 1 to 8 bytes.
pub fn decode_le(bytes: &[u8]) -> Result<u64> {
    if !(1..=8).contains(&bytes.len()) {
        return Err(EstimateError::Unsupported(format!(
            "little-endian field width {}",
            bytes.len()
        )));
    }
    Ok(LittleEndian::read_uint(bytes, bytes.len()))
}

/// Read `width` little-endian bytes at `pos`, failing if the field runs past `buf`.
pub fn read_field(buf: &[u8], pos: usize, width: usize) -> Result<u64> {
    let end = pos
        .checked_add(width)
        .filter(|end| *end <= buf.len())
        .ok_or_else(|| {
            EstimateError::malformed(format!(
                "field of {width} bytes at offset {pos} runs past the end of a {} byte archive",
                buf.len()
            ))
        })?;
    decode_le(&buf[pos..end])
}

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIZE: usize = 22;

    /// Parse the record starting at its signature.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(EstimateError::malformed("truncated End of Central Directory"));
        }

        let mut cursor = Cursor::new(data);
        if cursor.read_u32::<LittleEndian>().map_err(truncated)? != EOCD_SIGNATURE {
            return Err(EstimateError::malformed("invalid End of Central Directory signature"));
        }

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            disk_with_cd: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            disk_entries: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            total_entries: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            cd_size: cursor.read_u32::<LittleEndian>().map_err(truncated)?,
            cd_offset: cursor.read_u32::<LittleEndian>().map_err(truncated)?,
            comment_len: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
        })
    }

    /// Serialize the record without an archive comment.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::SIZE];
        LittleEndian::write_u32(&mut buf[0..4], EOCD_SIGNATURE);
        LittleEndian::write_u16(&mut buf[4..6], self.disk_number);
        LittleEndian::write_u16(&mut buf[6..8], self.disk_with_cd);
        LittleEndian::write_u16(&mut buf[8..10], self.disk_entries);
        LittleEndian::write_u16(&mut buf[10..12], self.total_entries);
        LittleEndian::write_u32(&mut buf[12..16], self.cd_size);
        LittleEndian::write_u32(&mut buf[16..20], self.cd_offset);
        LittleEndian::write_u16(&mut buf[20..22], 0);
        buf
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFF_FFFF
            || self.cd_offset == 0xFFFF_FFFF
    }
}

fn truncated(_: std::io::Error) -> EstimateError {
    EstimateError::malformed("truncated End of Central Directory")
}

/// One entry of an archive's central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name lossily decoded as UTF-8, for display only.
    pub name: String,
    /// Entry name bytes exactly as stored. Lookups and set membership use these.
    pub raw_name: Vec<u8>,
    /// Offset of the entry's local file header from the start of the archive.
    pub offset: u64,
    pub compression_method: CompressionMethod,
    pub flags: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    /// Byte range of the raw central directory record inside the archive.
    pub record: Range<usize>,
}

impl ArchiveEntry {
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips_through_le_helpers() {
        let bytes = encode_le(EOCD_SIGNATURE as u64, 4).unwrap();
        assert_eq!(bytes, b"PK\x05\x06");
        assert_eq!(decode_le(&bytes).unwrap(), EOCD_SIGNATURE as u64);
    }

    #[test]
    fn encode_rejects_values_wider_than_field() {
        assert!(encode_le(0x1_0000, 2).is_err());
        assert!(encode_le(1, 0).is_err());
        assert!(encode_le(1, 9).is_err());
        assert_eq!(encode_le(u64::MAX, 8).unwrap(), vec![0xFF; 8]);
    }

    #[test]
    fn read_field_bounds_checked() {
        let buf = [1u8, 2, 3];
        assert_eq!(read_field(&buf, 1, 2).unwrap(), 0x0302);
        assert!(matches!(
            read_field(&buf, 2, 2),
            Err(EstimateError::MalformedArchive { .. })
        ));
        assert!(read_field(&buf, usize::MAX, 4).is_err());
    }

    #[test]
    fn eocd_round_trip() {
        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 3,
            total_entries: 3,
            cd_size: 150,
            cd_offset: 4096,
            comment_len: 0,
        };
        let bytes = eocd.to_bytes();
        assert_eq!(bytes.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(EndOfCentralDirectory::from_bytes(&bytes).unwrap(), eocd);
        assert!(!eocd.is_zip64());
    }
}
