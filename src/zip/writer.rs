//! Rewrite an archive keeping only a subset of its entries.
//!
//! Local records are copied verbatim, so compressed data is never touched.
//! Each kept central directory record is re-emitted with its local header
//! offset patched to the new position, followed by a fresh EOCD record.
//! Bytes between the last local record and the central directory (an APK
//! signing block, for instance) and the archive comment are not carried over.

use std::collections::BTreeSet;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::error::{EstimateError, IoContext, Result};

use super::parser::ArchiveDirectory;
use super::structures::{ArchiveEntry, CDFH_LFH_OFFSET, EndOfCentralDirectory};

/// Build the bytes of a copy of `directory` holding only entries accepted by `keep`.
pub fn subset_bytes<F>(directory: &ArchiveDirectory, mut keep: F) -> Result<Vec<u8>>
where
    F: FnMut(&ArchiveEntry) -> bool,
{
    let source = directory.bytes();
    let mut out = Vec::with_capacity(source.len());
    let mut central = Vec::new();
    let mut count = 0usize;

    for entry in directory.entries() {
        if !keep(entry) {
            continue;
        }
        let layout = directory.local_layout(entry)?;
        let new_offset = u32::try_from(out.len())
            .map_err(|_| EstimateError::Unsupported("sub-archive larger than 4 GiB".into()))?;
        out.extend_from_slice(&source[layout.record]);

        let record_start = central.len();
        central.extend_from_slice(&source[entry.record.clone()]);
        let field = record_start + CDFH_LFH_OFFSET;
        LittleEndian::write_u32(&mut central[field..field + 4], new_offset);
        count += 1;
    }

    let total_entries = u16::try_from(count)
        .map_err(|_| EstimateError::Unsupported(format!("{count} entries need ZIP64")))?;
    let cd_offset = u32::try_from(out.len())
        .map_err(|_| EstimateError::Unsupported("sub-archive larger than 4 GiB".into()))?;
    let cd_size = u32::try_from(central.len())
        .map_err(|_| EstimateError::Unsupported("central directory larger than 4 GiB".into()))?;

    out.extend_from_slice(&central);
    out.extend_from_slice(
        &EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: total_entries,
            total_entries,
            cd_size,
            cd_offset,
            comment_len: 0,
        }
        .to_bytes(),
    );
    Ok(out)
}

/// Write a copy of `directory` holding only entries accepted by `keep`.
pub async fn write_subset<F>(directory: &ArchiveDirectory, keep: F, output: &Path) -> Result<()>
where
    F: FnMut(&ArchiveEntry) -> bool,
{
    let bytes = subset_bytes(directory, keep)?;
    tokio::fs::write(output, &bytes)
        .await
        .io_context(|| format!("write {}", output.display()))?;
    debug!("wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

/// Write a copy of `directory` with every entry whose name bytes are in `names` removed.
pub async fn strip(directory: &ArchiveDirectory, names: &BTreeSet<Vec<u8>>, output: &Path) -> Result<()> {
    write_subset(directory, |e| !names.contains(&e.raw_name), output).await
}

/// Write a sub-archive containing exactly the entries of one file block.
///
/// Block entries never include boundary entries, so the result holds no
/// common embedded archive either.
pub async fn materialize(directory: &ArchiveDirectory, block: &[Vec<u8>], output: &Path) -> Result<()> {
    let members: BTreeSet<&[u8]> = block.iter().map(Vec::as_slice).collect();
    write_subset(directory, |e| members.contains(e.raw_name.as_slice()), output).await
}
