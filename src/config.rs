//! Run configuration shared by the CLI and library callers.

use std::path::{Path, PathBuf};

use crate::error::{EstimateError, Result};

/// What to do when a strategy row fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole run on the first failing strategy.
    #[default]
    Abort,
    /// Record the failure, leave the row out and keep going.
    Continue,
}

/// Locations of the external binaries. `None` means "look it up on `PATH`".
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    pub bsdiff: Option<PathBuf>,
    pub gzip: Option<PathBuf>,
    pub brotli: Option<PathBuf>,
    pub java: Option<PathBuf>,
    /// The archive-patcher file-by-file generator jar.
    pub file_by_file_jar: Option<PathBuf>,
}

impl ToolPaths {
    /// Default jar location: `lib/file-by-file-tools.jar` next to the executable.
    pub fn default_jar() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join("lib")
            .join("file-by-file-tools.jar")
    }
}

/// Everything an estimation run needs besides the registries and tools.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub old_file: PathBuf,
    pub new_file: PathBuf,
    /// Parent of the run's scratch directory.
    pub temp_dir: PathBuf,
    /// Prefix for saved compressed patches, if any.
    pub save_patch: Option<PathBuf>,
    /// Requested strategy ids; empty means all.
    pub strategies: Vec<String>,
    /// Requested compression ids; empty means all.
    pub compressions: Vec<String>,
    pub failure_policy: FailurePolicy,
}

impl EstimatorConfig {
    pub fn new(old_file: impl Into<PathBuf>, new_file: impl Into<PathBuf>) -> Self {
        Self {
            old_file: old_file.into(),
            new_file: new_file.into(),
            temp_dir: std::env::temp_dir(),
            save_patch: None,
            strategies: Vec::new(),
            compressions: Vec::new(),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Check paths before any work starts.
    pub fn validate(&self) -> Result<()> {
        for input in [&self.old_file, &self.new_file] {
            if !input.is_file() {
                return Err(EstimateError::missing(input));
            }
        }
        if !self.temp_dir.is_dir() {
            return Err(EstimateError::InvalidConfig(format!(
                "temp directory does not exist: {}",
                self.temp_dir.display()
            )));
        }
        if let Some(prefix) = &self.save_patch {
            if prefix.is_dir() {
                return Err(EstimateError::InvalidConfig(format!(
                    "please include the file name in the save patch path: {}",
                    prefix.display()
                )));
            }
            let parent = match prefix.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            if !parent.is_dir() {
                return Err(EstimateError::InvalidConfig(format!(
                    "save patch directory does not exist: {}",
                    parent.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_checks_inputs_and_save_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.apk");
        let new = dir.path().join("new.apk");
        std::fs::write(&old, b"old").unwrap();

        let mut config = EstimatorConfig::new(&old, &new);
        assert!(matches!(config.validate(), Err(EstimateError::MissingInput { .. })));

        std::fs::write(&new, b"new").unwrap();
        assert!(config.validate().is_ok());

        config.save_patch = Some(dir.path().to_path_buf());
        assert!(matches!(config.validate(), Err(EstimateError::InvalidConfig(_))));

        config.save_patch = Some(dir.path().join("missing").join("patch"));
        assert!(matches!(config.validate(), Err(EstimateError::InvalidConfig(_))));

        config.save_patch = Some(dir.path().join("patch"));
        assert!(config.validate().is_ok());
    }
}
