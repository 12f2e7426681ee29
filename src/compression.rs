//! Compression passes applied to every patch artifact.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{EstimateError, Result};
use crate::scratch::{copy_file, ensure_exists, remove_file_if_exists, unused_sibling};
use crate::tools::{Tool, ToolInvocation, ToolRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    /// No compression; the output is a copy of the input.
    Identity,
    /// `gzip -9`, stdin to stdout.
    Gzip,
    /// `brotli -9`, writing `<input>.br` next to the input.
    Brotli,
}

#[derive(Debug, Clone)]
pub struct CompressionDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    /// Appended to saved patch file names.
    pub extension: &'static str,
    pub priority: u8,
    pub kind: CompressionKind,
}

impl CompressionDescriptor {
    pub fn is_identity(&self) -> bool {
        self.kind == CompressionKind::Identity
    }

    pub fn required_tool(&self) -> Option<Tool> {
        match self.kind {
            CompressionKind::Identity => None,
            CompressionKind::Gzip => Some(Tool::Gzip),
            CompressionKind::Brotli => Some(Tool::Brotli),
        }
    }

    /// Compress `input` into a new file next to it, leaving `input` untouched.
    pub async fn compress(&self, input: &Path, tools: &dyn ToolRunner) -> Result<PathBuf> {
        ensure_exists(&[input])?;
        let output = match self.kind {
            CompressionKind::Identity => {
                let output = unused_sibling(input, "copy");
                copy_file(input, &output).await?;
                output
            }
            CompressionKind::Gzip => {
                let output = with_suffix(input, ".gz");
                tools
                    .run(
                        &ToolInvocation::new(Tool::Gzip)
                            .arg("-9")
                            .stdin(input)
                            .stdout(&output),
                    )
                    .await?;
                output
            }
            CompressionKind::Brotli => {
                // brotli refuses to overwrite an existing output.
                let output = with_suffix(input, ".br");
                remove_file_if_exists(&output).await?;
                tools
                    .run(&ToolInvocation::new(Tool::Brotli).arg("-9").arg(input))
                    .await?;
                output
            }
        };
        ensure_exists(&[&output])?;
        Ok(output)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Immutable set of compressions, looked up by id.
#[derive(Debug, Clone)]
pub struct CompressionRegistry {
    descriptors: Vec<CompressionDescriptor>,
}

impl CompressionRegistry {
    pub fn new(descriptors: Vec<CompressionDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            CompressionDescriptor {
                id: "identity",
                display_name: "Identity",
                extension: ".identity",
                priority: 0,
                kind: CompressionKind::Identity,
            },
            CompressionDescriptor {
                id: "gzip",
                display_name: "GZIP",
                extension: ".gzip",
                priority: 1,
                kind: CompressionKind::Gzip,
            },
            CompressionDescriptor {
                id: "brotli",
                display_name: "BROTLI",
                extension: ".brotli",
                priority: 2,
                kind: CompressionKind::Brotli,
            },
        ])
    }

    pub fn get(&self, id: &str) -> Result<&CompressionDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| EstimateError::UnknownCompression(id.to_string()))
    }

    pub fn all(&self) -> Vec<&CompressionDescriptor> {
        let mut all: Vec<_> = self.descriptors.iter().collect();
        all.sort_by_key(|d| d.priority);
        all
    }

    /// Resolve `ids` (all compressions when empty), deduplicated, in priority order.
    pub fn select(&self, ids: &[String]) -> Result<Vec<&CompressionDescriptor>> {
        if ids.is_empty() {
            return Ok(self.all());
        }
        let mut seen = HashSet::new();
        let mut selected = Vec::new();
        for id in ids {
            let descriptor = self.get(id)?;
            if seen.insert(descriptor.id) {
                selected.push(descriptor);
            }
        }
        selected.sort_by_key(|d| d.priority);
        Ok(selected)
    }
}
