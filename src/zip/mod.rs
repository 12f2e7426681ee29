//! ZIP archive reading and rewriting.
//!
//! This module provides the minimal ZIP support the estimator needs: listing
//! entries from the central directory, rewriting an archive with a subset of
//! its entries, and extracting the contents of a single entry.
//!
//! ## Architecture
//!
//! - [`structures`]: ZIP record layouts, signatures and little-endian helpers
//! - [`parser`]: the central directory reader ([`ArchiveDirectory`])
//! - [`writer`]: subset copies (strip / materialize)
//! - [`extract`]: uncompressed contents of one entry
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Limitations
//!
//! - No ZIP64 support
//! - No multi-disk archive support
//! - Extraction handles STORED and DEFLATE only

pub mod extract;
pub mod parser;
pub mod structures;
pub mod writer;

pub use parser::{ArchiveDirectory, LocalLayout};
pub use structures::*;
