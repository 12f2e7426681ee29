//! Error taxonomy shared by every stage of an estimation run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, EstimateError>;

/// Errors produced while parsing archives, running tools or driving strategies.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// An expected file does not exist at the point of use.
    #[error("file does not exist: {}", path.display())]
    MissingInput { path: PathBuf },

    /// An external tool exited with a non-zero status or could not be started.
    #[error("external tool `{tool}` failed: {reason}")]
    ExternalToolFailure { tool: String, reason: String },

    /// The End-Of-Central-Directory record or a central directory record is invalid.
    #[error("malformed archive: {reason}")]
    MalformedArchive { reason: String },

    /// Old and new archives split into a different number of file blocks.
    #[error("unaligned partition: old archive has {old_blocks} file blocks, new archive has {new_blocks}")]
    UnalignedPartition { old_blocks: usize, new_blocks: usize },

    #[error("unknown delta strategy `{0}`")]
    UnknownStrategy(String),

    #[error("unknown compression `{0}`")]
    UnknownCompression(String),

    /// A valid ZIP feature the minimal reader/writer does not handle.
    #[error("unsupported archive feature: {0}")]
    Unsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Wraps the failure of a single strategy row.
    #[error("strategy `{strategy}` failed: {source}")]
    StrategyFailed {
        strategy: String,
        #[source]
        source: Box<EstimateError>,
    },
}

impl EstimateError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedArchive {
            reason: reason.into(),
        }
    }

    pub fn tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalToolFailure {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self::MissingInput { path: path.into() }
    }
}

/// Attach a human-readable context to I/O results.
pub trait IoContext<T> {
    fn io_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::result::Result<T, io::Error> {
    fn io_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| EstimateError::Io {
            context: context().into(),
            source,
        })
    }
}
