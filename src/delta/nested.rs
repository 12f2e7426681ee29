//! Estimates that treat nested archives as independently patchable units.
//!
//! All three strategies start from the set of embedded archives common to
//! the old and new archive. With an empty set they fall back to a plain v1
//! file-by-file patch of the unmodified inputs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::info;

use super::DeltaStrategy;
use super::filebyfile::{FileByFileVersion, generate_file_by_file};
use crate::embedded::{ARCHIVE_EXTENSIONS, common_embedded_archives};
use crate::error::Result;
use crate::partition::{describe, ensure_aligned, partition};
use crate::scratch::{concat, create_fresh_dir};
use crate::tools::{Tool, ToolRunner};
use crate::zip::ArchiveDirectory;
use crate::zip::extract::extract_to_file;
use crate::zip::writer::{materialize, strip};

/// Parsed inputs plus their common embedded archives.
struct NestedInputs {
    old: ArchiveDirectory,
    new: ArchiveDirectory,
    common: BTreeSet<Vec<u8>>,
}

impl NestedInputs {
    async fn load(old: &Path, new: &Path) -> Result<Self> {
        let old = ArchiveDirectory::open(old).await?;
        let new = ArchiveDirectory::open(new).await?;
        let common = common_embedded_archives(&old, &new);
        info!("{} common embedded archives", common.len());
        Ok(Self { old, new, common })
    }
}

async fn plain_v1(tools: &dyn ToolRunner, old: &Path, new: &Path, scratch: &Path) -> Result<PathBuf> {
    let patch = scratch.join("patch.filebyfile");
    generate_file_by_file(tools, old, new, &patch, FileByFileVersion::V1).await?;
    Ok(patch)
}

/// v1 patch between both archives with the common embedded archives removed.
async fn stripped_patch(tools: &dyn ToolRunner, inputs: &NestedInputs, scratch: &Path) -> Result<PathBuf> {
    let old = scratch.join("stripped_old.apk");
    let new = scratch.join("stripped_new.apk");
    strip(&inputs.old, &inputs.common, &old).await?;
    strip(&inputs.new, &inputs.common, &new).await?;

    let patch = scratch.join("patch.fbfv2-stripped");
    generate_file_by_file(tools, &old, &new, &patch, FileByFileVersion::V1).await?;
    Ok(patch)
}

/// Index-based file name for an extracted embedded archive.
///
/// Entry names are never used as paths, so `../` inside an archive cannot
/// escape the scratch directory.
fn embedded_file_name(index: usize, name: &[u8]) -> String {
    let ext = ARCHIVE_EXTENSIONS
        .iter()
        .find(|ext| name.ends_with(ext.as_bytes()))
        .unwrap_or(&".zip");
    format!("{index}{ext}")
}

/// One v1 patch per common embedded archive, in sorted name order.
async fn embedded_patches(tools: &dyn ToolRunner, inputs: &NestedInputs, scratch: &Path) -> Result<Vec<PathBuf>> {
    let old_root = scratch.join("embedded_old");
    let new_root = scratch.join("embedded_new");
    create_fresh_dir(&old_root).await?;
    create_fresh_dir(&new_root).await?;

    let mut patches = Vec::with_capacity(inputs.common.len());
    for (index, name) in inputs.common.iter().enumerate() {
        let file = embedded_file_name(index, name);
        let old = old_root.join(&file);
        let new = new_root.join(&file);
        extract_to_file(&inputs.old, name, &old).await?;
        extract_to_file(&inputs.new, name, &new).await?;

        info!("embedded archive {}: generating patch", String::from_utf8_lossy(name));
        let patch = scratch.join(format!("embedded-{index}.fbf"));
        generate_file_by_file(tools, &old, &new, &patch, FileByFileVersion::V1).await?;
        patches.push(patch);
    }
    Ok(patches)
}

/// Strip every common embedded archive, then patch what is left.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stripped;

#[async_trait]
impl DeltaStrategy for Stripped {
    async fn compute(&self, old: &Path, new: &Path, scratch: &Path, tools: &dyn ToolRunner) -> Result<PathBuf> {
        let inputs = NestedInputs::load(old, new).await?;
        if inputs.common.is_empty() {
            return plain_v1(tools, old, new, scratch).await;
        }
        stripped_patch(tools, &inputs, scratch).await
    }

    fn required_tools(&self) -> &'static [Tool] {
        &[Tool::FileByFile]
    }
}

/// Stripped outer patch plus an independent patch per embedded archive,
/// regardless of where the embedded archives sit in the host archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reorder;

#[async_trait]
impl DeltaStrategy for Reorder {
    async fn compute(&self, old: &Path, new: &Path, scratch: &Path, tools: &dyn ToolRunner) -> Result<PathBuf> {
        let inputs = NestedInputs::load(old, new).await?;
        if inputs.common.is_empty() {
            return plain_v1(tools, old, new, scratch).await;
        }

        let mut parts = vec![stripped_patch(tools, &inputs, scratch).await?];
        parts.extend(embedded_patches(tools, &inputs, scratch).await?);

        let patch = scratch.join("patch.fbfv2-reorder");
        concat(&parts, &patch).await?;
        Ok(patch)
    }

    fn required_tools(&self) -> &'static [Tool] {
        &[Tool::FileByFile]
    }
}

/// Position-preserving estimate: file blocks between embedded archives are
/// patched pairwise by index, then each embedded archive is patched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReorder;

#[async_trait]
impl DeltaStrategy for NoReorder {
    async fn compute(&self, old: &Path, new: &Path, scratch: &Path, tools: &dyn ToolRunner) -> Result<PathBuf> {
        let inputs = NestedInputs::load(old, new).await?;
        if inputs.common.is_empty() {
            return plain_v1(tools, old, new, scratch).await;
        }

        let old_blocks = partition(&inputs.old, &inputs.common);
        let new_blocks = partition(&inputs.new, &inputs.common);
        info!(
            "computing deltas between {} and {}",
            describe(&old_blocks),
            describe(&new_blocks)
        );
        // Blocks are paired by index; membership is not compared.
        ensure_aligned(&old_blocks, &new_blocks)?;

        let old_root = scratch.join("sub_apk_old");
        let new_root = scratch.join("sub_apk_new");
        create_fresh_dir(&old_root).await?;
        create_fresh_dir(&new_root).await?;

        let mut parts = Vec::with_capacity(old_blocks.len() + inputs.common.len());
        for (index, (old_block, new_block)) in old_blocks.iter().zip(&new_blocks).enumerate() {
            let old_sub = old_root.join(format!("{index}.apk"));
            let new_sub = new_root.join(format!("{index}.apk"));
            materialize(&inputs.old, &old_block.entries, &old_sub).await?;
            materialize(&inputs.new, &new_block.entries, &new_sub).await?;

            info!("block {index}: generating patch between {old_block} and {new_block}");
            let patch = scratch.join(format!("block-{index}.fbf"));
            generate_file_by_file(tools, &old_sub, &new_sub, &patch, FileByFileVersion::V1).await?;
            parts.push(patch);
        }
        parts.extend(embedded_patches(tools, &inputs, scratch).await?);

        let patch = scratch.join("patch.fbfv2-noreorder");
        concat(&parts, &patch).await?;
        Ok(patch)
    }

    fn required_tools(&self) -> &'static [Tool] {
        &[Tool::FileByFile]
    }
}
