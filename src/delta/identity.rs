use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::DeltaStrategy;
use crate::error::Result;
use crate::scratch::{copy_file, ensure_exists};
use crate::tools::{Tool, ToolRunner};

/// No delta at all: the patch is a copy of the new archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

#[async_trait]
impl DeltaStrategy for Identity {
    async fn compute(&self, _old: &Path, new: &Path, scratch: &Path, _tools: &dyn ToolRunner) -> Result<PathBuf> {
        let copy = scratch.join("new_apk.diff");
        copy_file(new, &copy).await?;
        ensure_exists(&[&copy])?;
        Ok(copy)
    }

    fn required_tools(&self) -> &'static [Tool] {
        &[]
    }
}
