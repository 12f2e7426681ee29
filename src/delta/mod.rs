//! Pluggable delta strategies and their registry.
//!
//! A strategy turns `(old archive, new archive, scratch directory)` into a
//! single uncompressed patch artifact. Compression is applied afterwards, by
//! the estimator, uniformly for every strategy.

mod bsdiff;
mod filebyfile;
mod identity;
mod nested;

pub use bsdiff::{BSDIFF_HEADER_LEN, Bsdiff, split_bsdiff_payload};
pub use filebyfile::{FileByFile, FileByFileVersion, generate_file_by_file};
pub use identity::Identity;
pub use nested::{NoReorder, Reorder, Stripped};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{EstimateError, Result};
use crate::scratch::ensure_exists;
use crate::tools::{Tool, ToolRunner};

/// A single capability: compute a patch artifact.
#[async_trait]
pub trait DeltaStrategy: Send + Sync {
    /// Produce the patch between `old` and `new`, writing only under `scratch`.
    async fn compute(&self, old: &Path, new: &Path, scratch: &Path, tools: &dyn ToolRunner) -> Result<PathBuf>;

    /// External tools this strategy calls.
    fn required_tools(&self) -> &'static [Tool];
}

/// Registered strategy with its presentation metadata.
pub struct StrategyDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub patch_extension: &'static str,
    /// Lower runs (and is listed) first.
    pub priority: u8,
    strategy: Box<dyn DeltaStrategy>,
}

impl StrategyDescriptor {
    pub fn new(
        id: &'static str,
        display_name: &'static str,
        patch_extension: &'static str,
        priority: u8,
        strategy: impl DeltaStrategy + 'static,
    ) -> Self {
        Self {
            id,
            display_name,
            patch_extension,
            priority,
            strategy: Box::new(strategy),
        }
    }

    /// Check the inputs exist, then compute the patch.
    pub async fn run(&self, old: &Path, new: &Path, scratch: &Path, tools: &dyn ToolRunner) -> Result<PathBuf> {
        ensure_exists(&[old, new, scratch])?;
        let patch = self.strategy.compute(old, new, scratch, tools).await?;
        ensure_exists(&[&patch])?;
        Ok(patch)
    }

    pub fn required_tools(&self) -> &'static [Tool] {
        self.strategy.required_tools()
    }
}

impl std::fmt::Debug for StrategyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyDescriptor")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("patch_extension", &self.patch_extension)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Immutable set of strategies, looked up by id.
#[derive(Debug)]
pub struct StrategyRegistry {
    descriptors: Vec<StrategyDescriptor>,
}

impl StrategyRegistry {
    pub fn new(descriptors: Vec<StrategyDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Every strategy the estimator knows about.
    pub fn standard() -> Self {
        Self::new(vec![
            StrategyDescriptor::new("identity", "Identity", ".identity", 0, Identity),
            StrategyDescriptor::new("bsdiff", "BSDIFF", ".bsdiff", 1, Bsdiff),
            StrategyDescriptor::new(
                "fbfv1",
                "File-By-File-V1",
                ".fbf",
                2,
                FileByFile::new(FileByFileVersion::V1),
            ),
            StrategyDescriptor::new(
                "fbfv2",
                "File-By-File-V2",
                ".fbfv2",
                3,
                FileByFile::new(FileByFileVersion::V2),
            ),
            StrategyDescriptor::new(
                "fbfv2-stripped",
                "File-By-File-V2-Stripped",
                ".fbfv2-stripped",
                3,
                Stripped,
            ),
            StrategyDescriptor::new(
                "fbfv2-reorder",
                "File-By-File-V2-w-Reorder",
                ".fbfv2-reorder",
                3,
                Reorder,
            ),
            StrategyDescriptor::new(
                "fbfv2-noreorder",
                "File-By-File-V2-wo-Reorder",
                ".fbfv2-noreorder",
                4,
                NoReorder,
            ),
        ])
    }

    pub fn get(&self, id: &str) -> Result<&StrategyDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| EstimateError::UnknownStrategy(id.to_string()))
    }

    /// Registered strategies in priority order.
    pub fn all(&self) -> Vec<&StrategyDescriptor> {
        let mut all: Vec<_> = self.descriptors.iter().collect();
        // Stable: equal priorities keep registration order.
        all.sort_by_key(|d| d.priority);
        all
    }

    /// Resolve `ids` (all strategies when empty), deduplicated, in priority order.
    pub fn select(&self, ids: &[String]) -> Result<Vec<&StrategyDescriptor>> {
        if ids.is_empty() {
            return Ok(self.all());
        }
        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(ids.len());
        for id in ids {
            let descriptor = self.get(id)?;
            if seen.insert(descriptor.id) {
                selected.push(descriptor);
            }
        }
        let order = |d: &StrategyDescriptor| self.descriptors.iter().position(|r| r.id == d.id);
        selected.sort_by_key(|d| (d.priority, order(d)));
        Ok(selected)
    }
}
