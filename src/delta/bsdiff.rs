use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bzip2::read::MultiBzDecoder;

use super::DeltaStrategy;
use crate::error::{EstimateError, IoContext, Result};
use crate::scratch::remove_file_if_exists;
use crate::tools::{Tool, ToolInvocation, ToolRunner};

/// Length of the header bsdiff writes before its compressed body.
///
/// This and the body compressor (bzip2) are fixed by the bsdiff 4.x patch
/// format; a different bsdiff build breaks both assumptions here and nowhere else.
pub const BSDIFF_HEADER_LEN: usize = 32;

/// Undo bsdiff's built-in bzip2 compression.
///
/// Returns the 32-byte header followed by the decompressed body, so that
/// the estimator's own compression pass applies to the raw delta. The body
/// is a sequence of bzip2 streams and all of them are decoded.
pub fn split_bsdiff_payload(raw: &[u8]) -> Result<Vec<u8>> {
    if raw.len() < BSDIFF_HEADER_LEN {
        return Err(EstimateError::tool(
            Tool::Bsdiff.id(),
            format!("patch is {} bytes, shorter than its {BSDIFF_HEADER_LEN}-byte header", raw.len()),
        ));
    }
    let (header, body) = raw.split_at(BSDIFF_HEADER_LEN);

    let mut rebuilt = header.to_vec();
    MultiBzDecoder::new(body)
        .read_to_end(&mut rebuilt)
        .map_err(|e| EstimateError::tool(Tool::Bsdiff.id(), format!("body is not bzip2 data: {e}")))?;
    Ok(rebuilt)
}

/// Binary diff of the whole archive with bsdiff, body decompressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bsdiff;

#[async_trait]
impl DeltaStrategy for Bsdiff {
    async fn compute(&self, old: &Path, new: &Path, scratch: &Path, tools: &dyn ToolRunner) -> Result<PathBuf> {
        let patch = scratch.join("patch.bsdiff");
        let rebuilt = scratch.join("patch.raw_bsdiff.rebuilt");

        tools
            .run(&ToolInvocation::new(Tool::Bsdiff).arg(old).arg(new).arg(&patch))
            .await?;

        let raw = tokio::fs::read(&patch)
            .await
            .io_context(|| format!("read {}", patch.display()))?;
        let payload = split_bsdiff_payload(&raw)?;
        tokio::fs::write(&rebuilt, &payload)
            .await
            .io_context(|| format!("write {}", rebuilt.display()))?;

        remove_file_if_exists(&patch).await?;
        Ok(rebuilt)
    }

    fn required_tools(&self) -> &'static [Tool] {
        &[Tool::Bsdiff]
    }
}
