//! # apkdelta
//!
//! Estimates the size of APK update patches produced by combinations of
//! delta strategies and compressions.
//!
//! The numbers are ESTIMATES meant to characterize the impact of changes
//! to an APK. There is no guarantee that any distribution service produces
//! patches of these sizes.
//!
//! ## Features
//!
//! - Minimal ZIP central directory reader, subset writer and entry extraction
//! - Detection of nested archives (`.apk`, `.jar`, `.zip`) shared by both APKs
//! - Delta strategies: identity, bsdiff, file-by-file v1/v2, and v2
//!   estimates that strip, reorder or partition around nested archives
//! - Compression passes: identity, gzip, brotli
//!
//! ## Example
//!
//! ```no_run
//! use apkdelta::{CompressionRegistry, Estimator, EstimatorConfig, StrategyRegistry, SystemTools, ToolPaths};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EstimatorConfig::new("old.apk", "new.apk");
//!     let strategies = StrategyRegistry::standard();
//!     let compressions = CompressionRegistry::standard();
//!
//!     let needed = Estimator::required_tools(&strategies, &compressions, &config)?;
//!     let tools = SystemTools::resolve(&ToolPaths::default(), &needed)?;
//!
//!     let matrix = Estimator::new(&strategies, &compressions, &tools).run(&config).await?;
//!     println!("{:?}", matrix.get("bsdiff", "gzip"));
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod compression;
pub mod config;
pub mod delta;
pub mod embedded;
pub mod error;
pub mod estimator;
pub mod io;
pub mod partition;
pub mod report;
pub mod scratch;
pub mod tools;
pub mod zip;

pub use cli::Cli;
pub use compression::{CompressionDescriptor, CompressionRegistry};
pub use config::{EstimatorConfig, FailurePolicy, ToolPaths};
pub use delta::{DeltaStrategy, StrategyDescriptor, StrategyRegistry};
pub use error::{EstimateError, Result};
pub use estimator::{Estimator, PatchSizeMatrix};
pub use io::{LocalFileReader, ReadAt};
pub use tools::{SystemTools, Tool, ToolInvocation, ToolRunner};
pub use zip::{ArchiveDirectory, ArchiveEntry};
