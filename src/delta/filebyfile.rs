use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::DeltaStrategy;
use crate::error::Result;
use crate::scratch::{ensure_exists, remove_file_if_exists};
use crate::tools::{Tool, ToolInvocation, ToolRunner};

/// Generation of the archive-patcher file-by-file generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileByFileVersion {
    V1,
    /// Passes `--v2` to the generator.
    V2,
}

/// Run the file-by-file generator, writing the patch to `patch`.
pub async fn generate_file_by_file(
    tools: &dyn ToolRunner,
    old: &Path,
    new: &Path,
    patch: &Path,
    version: FileByFileVersion,
) -> Result<()> {
    ensure_exists(&[old, new])?;
    remove_file_if_exists(patch).await?;

    let mut invocation = ToolInvocation::new(Tool::FileByFile).arg("--generate");
    if version == FileByFileVersion::V2 {
        invocation = invocation.arg("--v2");
    }
    let invocation = invocation
        .arg("--old")
        .arg(old)
        .arg("--new")
        .arg(new)
        .arg("--patch")
        .arg(patch);

    tools.run(&invocation).await?;
    ensure_exists(&[patch])
}

/// Whole-archive file-by-file patch; the generator is a black box.
#[derive(Debug, Clone, Copy)]
pub struct FileByFile {
    version: FileByFileVersion,
}

impl FileByFile {
    pub fn new(version: FileByFileVersion) -> Self {
        Self { version }
    }
}

#[async_trait]
impl DeltaStrategy for FileByFile {
    async fn compute(&self, old: &Path, new: &Path, scratch: &Path, tools: &dyn ToolRunner) -> Result<PathBuf> {
        let patch = match self.version {
            FileByFileVersion::V1 => scratch.join("patch.filebyfile"),
            FileByFileVersion::V2 => scratch.join("patch.filebyfilev2"),
        };
        generate_file_by_file(tools, old, new, &patch, self.version).await?;
        Ok(patch)
    }

    fn required_tools(&self) -> &'static [Tool] {
        &[Tool::FileByFile]
    }
}
