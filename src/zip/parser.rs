//! Minimal ZIP central directory reader.
//!
//! ## Parsing Strategy
//!
//! 1. Scan backwards from the end of the buffer for the End of Central
//!    Directory (EOCD) signature
//! 2. Read the central directory start offset from the EOCD
//! 3. Walk central directory records until the signature stops matching
//!
//! Local file headers are only consulted on demand, when an entry's raw
//! record or data has to be copied out of the archive.

use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;

use log::debug;

use crate::error::{EstimateError, Result};
use crate::io::{LocalFileReader, ReadAt};

use super::structures::*;

/// Parsed central directory of one archive, backed by the archive's bytes.
///
/// Entries keep central directory order. Duplicate name bytes are rejected
/// at parse time, so lookups by name are unambiguous.
#[derive(Debug)]
pub struct ArchiveDirectory {
    bytes: Vec<u8>,
    entries: Vec<ArchiveEntry>,
    cd_offset: usize,
}

/// Where an entry's local record and data live inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalLayout {
    /// Local header through the end of the data descriptor, if any.
    pub record: Range<usize>,
    /// Compressed data only.
    pub data: Range<usize>,
}

impl ArchiveDirectory {
    /// Read and parse the archive at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let reader = LocalFileReader::new(path)?;
        let dir = Self::from_reader(&reader).await.map_err(|e| match e {
            EstimateError::MalformedArchive { reason } => {
                EstimateError::malformed(format!("{}: {reason}", path.display()))
            }
            other => other,
        })?;
        debug!("{}: {} central directory entries", path.display(), dir.entries.len());
        Ok(dir)
    }

    /// Load the full contents of `reader` and parse them.
    pub async fn from_reader<R: ReadAt + ?Sized>(reader: &R) -> Result<Self> {
        let bytes = reader.read_all().await?;
        Self::parse(bytes)
    }

    /// Parse an in-memory archive.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError::MalformedArchive`] if no EOCD signature is
    /// found, if a record's declared lengths run past the buffer, if the walk
    /// finds fewer or more records than the EOCD declares, or if two entries
    /// share the same name bytes. ZIP64 archives yield [`EstimateError::Unsupported`].
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        let eocd_offset = find_eocd(&bytes)?;
        let eocd = EndOfCentralDirectory::from_bytes(&bytes[eocd_offset..])?;
        if eocd.is_zip64() {
            return Err(EstimateError::Unsupported("ZIP64 archives".into()));
        }

        let cd_offset = eocd.cd_offset as usize;
        if cd_offset > eocd_offset {
            return Err(EstimateError::malformed(format!(
                "central directory offset {cd_offset} lies beyond the EOCD at {eocd_offset}"
            )));
        }

        let entries = parse_records(&bytes, cd_offset)?;
        if entries.len() != usize::from(eocd.total_entries) {
            return Err(EstimateError::malformed(format!(
                "EOCD declares {} entries but the central directory at offset {cd_offset} holds {}",
                eocd.total_entries,
                entries.len()
            )));
        }

        ensure_unique_names(&entries)?;

        Ok(Self {
            bytes,
            entries,
            cd_offset,
        })
    }

    /// Entries in central directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Look an entry up by its stored name bytes.
    pub fn entry(&self, name: impl AsRef<[u8]>) -> Option<&ArchiveEntry> {
        let name = name.as_ref();
        self.entries.iter().find(|e| e.raw_name == name)
    }

    /// Display names, lossily decoded.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Stored name bytes, in central directory order.
    pub fn raw_names(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|e| e.raw_name.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The raw archive bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn central_directory_offset(&self) -> usize {
        self.cd_offset
    }

    /// Locate the local header, data and optional data descriptor of `entry`.
    pub fn local_layout(&self, entry: &ArchiveEntry) -> Result<LocalLayout> {
        let buf = &self.bytes;
        let start = usize::try_from(entry.offset)
            .map_err(|_| EstimateError::malformed("local header offset overflows"))?;

        if read_field(buf, start, 4)? != LFH_SIGNATURE as u64 {
            return Err(EstimateError::malformed(format!(
                "invalid local file header for `{}` at offset {start}",
                entry.name
            )));
        }
        let name_len = read_field(buf, start + 26, 2)? as usize;
        let extra_len = read_field(buf, start + 28, 2)? as usize;

        let data_start = start + LFH_SIZE + name_len + extra_len;
        let data_end = usize::try_from(entry.compressed_size)
            .ok()
            .and_then(|size| data_start.checked_add(size))
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| {
                EstimateError::malformed(format!("data of `{}` runs past the archive end", entry.name))
            })?;

        let mut record_end = data_end;
        if entry.has_data_descriptor() {
            // The descriptor signature is optional.
            let signed = read_field(buf, data_end, 4).ok() == Some(DATA_DESCRIPTOR_SIGNATURE as u64);
            record_end += if signed { 16 } else { 12 };
            if record_end > buf.len() {
                return Err(EstimateError::malformed(format!(
                    "data descriptor of `{}` runs past the archive end",
                    entry.name
                )));
            }
        }

        Ok(LocalLayout {
            record: start..record_end,
            data: data_start..data_end,
        })
    }
}

/// Scan backwards for the EOCD signature.
fn find_eocd(buf: &[u8]) -> Result<usize> {
    let signature = EOCD_SIGNATURE.to_le_bytes();
    let last = buf
        .len()
        .checked_sub(EndOfCentralDirectory::SIZE)
        .ok_or_else(|| EstimateError::malformed("buffer is too small to hold an EOCD record"))?;

    (0..=last)
        .rev()
        .find(|&i| buf[i..i + 4] == signature)
        .ok_or_else(|| EstimateError::malformed("no End of Central Directory signature found"))
}

fn ensure_unique_names(entries: &[ArchiveEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    match entries.iter().find(|e| !seen.insert(e.raw_name.as_slice())) {
        Some(dup) => Err(EstimateError::malformed(format!(
            "duplicate entry name `{}`",
            dup.name
        ))),
        None => Ok(()),
    }
}

/// Walk central directory records starting at `cd_offset`.
fn parse_records(buf: &[u8], cd_offset: usize) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    let mut pos = cd_offset;

    while pos + 4 <= buf.len() && read_field(buf, pos, 4)? == CDFH_SIGNATURE as u64 {
        if pos + CDFH_SIZE > buf.len() {
            return Err(EstimateError::malformed(format!(
                "central directory record at offset {pos} is truncated"
            )));
        }

        let name_len = read_field(buf, pos + CDFH_NAME_LEN, 2)? as usize;
        let extra_len = read_field(buf, pos + CDFH_EXTRA_LEN, 2)? as usize;
        let comment_len = read_field(buf, pos + CDFH_COMMENT_LEN, 2)? as usize;

        let name_start = pos + CDFH_SIZE;
        let record_end = name_start + name_len + extra_len + comment_len;
        if record_end > buf.len() {
            return Err(EstimateError::malformed(format!(
                "central directory record at offset {pos} declares {} bytes past the archive end",
                record_end - buf.len()
            )));
        }

        let raw_name = buf[name_start..name_start + name_len].to_vec();

        entries.push(ArchiveEntry {
            name: String::from_utf8_lossy(&raw_name).into_owned(),
            raw_name,
            offset: read_field(buf, pos + CDFH_LFH_OFFSET, 4)?,
            compression_method: CompressionMethod::from_u16(read_field(buf, pos + CDFH_METHOD, 2)? as u16),
            flags: read_field(buf, pos + CDFH_FLAGS, 2)? as u16,
            crc32: read_field(buf, pos + CDFH_CRC32, 4)? as u32,
            compressed_size: read_field(buf, pos + CDFH_COMPRESSED_SIZE, 4)?,
            uncompressed_size: read_field(buf, pos + CDFH_UNCOMPRESSED_SIZE, 4)?,
            record: pos..record_end,
        });

        pos = record_end;
    }

    Ok(entries)
}
