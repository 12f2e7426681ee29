use std::io::Read;
use std::path::Path;

use flate2::read::DeflateDecoder;

use crate::error::{EstimateError, IoContext, Result};

use super::parser::ArchiveDirectory;
use super::structures::CompressionMethod;

/// Return the uncompressed contents of the entry whose stored name is `name`.
pub fn read_entry(directory: &ArchiveDirectory, name: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    let raw = name.as_ref();
    let entry = directory.entry(raw).ok_or_else(|| {
        EstimateError::malformed(format!("no entry named `{}`", String::from_utf8_lossy(raw)))
    })?;
    let name = &entry.name;
    let layout = directory.local_layout(entry)?;
    let data = &directory.bytes()[layout.data];

    match entry.compression_method {
        CompressionMethod::Stored => Ok(data.to_vec()),
        CompressionMethod::Deflate => {
            let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
            DeflateDecoder::new(data)
                .read_to_end(&mut out)
                .io_context(|| format!("inflate `{name}`"))?;
            Ok(out)
        }
        CompressionMethod::Unknown(method) => Err(EstimateError::Unsupported(format!(
            "compression method {method} used by `{name}`"
        ))),
    }
}

/// Extract the entry called `name` to `output`.
pub async fn extract_to_file(directory: &ArchiveDirectory, name: impl AsRef<[u8]>, output: &Path) -> Result<()> {
    let data = read_entry(directory, name)?;

    // Create parent directories if needed
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .io_context(|| format!("create {}", parent.display()))?;
        }
    }

    tokio::fs::write(output, &data)
        .await
        .io_context(|| format!("write {}", output.display()))
}
