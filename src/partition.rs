//! Splitting an archive's entry list into file blocks around boundary entries.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{EstimateError, Result};
use crate::zip::ArchiveDirectory;

/// A contiguous run of non-boundary entries, by stored name bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileBlock {
    pub entries: Vec<Vec<u8>>,
}

impl FileBlock {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for FileBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => {
                write!(
                    f,
                    "{} files from '{}' to '{}'",
                    self.len(),
                    String::from_utf8_lossy(first),
                    String::from_utf8_lossy(last)
                )
            }
            _ => write!(f, "0 files"),
        }
    }
}

/// Split `names` into blocks, starting a new block at every boundary name.
///
/// Boundary entries belong to no block and empty blocks are dropped.
pub fn partition_names<'a, I>(names: I, boundaries: &BTreeSet<Vec<u8>>) -> Vec<FileBlock>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut blocks = vec![FileBlock::default()];
    for name in names {
        if boundaries.contains(name) {
            blocks.push(FileBlock::default());
        } else if let Some(current) = blocks.last_mut() {
            current.entries.push(name.to_vec());
        }
    }
    blocks.retain(|b| !b.is_empty());
    blocks
}

/// Partition an archive's entries in central directory order.
pub fn partition(directory: &ArchiveDirectory, boundaries: &BTreeSet<Vec<u8>>) -> Vec<FileBlock> {
    partition_names(directory.raw_names(), boundaries)
}

/// Check that old and new partitions can be paired index by index.
///
/// Only the block counts are compared; block membership is not.
pub fn ensure_aligned(old: &[FileBlock], new: &[FileBlock]) -> Result<()> {
    if old.len() != new.len() {
        return Err(EstimateError::UnalignedPartition {
            old_blocks: old.len(),
            new_blocks: new.len(),
        });
    }
    Ok(())
}

/// One-line summary used in progress logs.
pub fn describe(blocks: &[FileBlock]) -> String {
    let parts: Vec<String> = blocks.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<Vec<u8>> {
        names.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    fn split<const N: usize>(entries: [&str; N], boundaries: &[&str]) -> Vec<FileBlock> {
        partition_names(entries.map(str::as_bytes), &set(boundaries))
    }

    fn names(block: &FileBlock) -> Vec<&str> {
        block
            .entries
            .iter()
            .map(|n| std::str::from_utf8(n).unwrap())
            .collect()
    }

    #[test]
    fn splits_around_boundaries() {
        let entries = ["a", "b", "x.apk", "c", "y.jar", "d", "e"];
        let blocks = split(entries, &["x.apk", "y.jar"]);
        assert_eq!(blocks.len(), 3);
        assert_eq!(names(&blocks[0]), ["a", "b"]);
        assert_eq!(names(&blocks[1]), ["c"]);
        assert_eq!(names(&blocks[2]), ["d", "e"]);
    }

    #[test]
    fn drops_empty_blocks() {
        let entries = ["x.apk", "y.jar", "a", "z.zip"];
        let blocks = split(entries, &["x.apk", "y.jar", "z.zip"]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(names(&blocks[0]), ["a"]);
    }

    #[test]
    fn no_boundaries_is_one_block() {
        assert_eq!(split(["a", "b"], &[]).len(), 1);
        assert!(split([], &[]).is_empty());
    }

    #[test]
    fn unaligned_counts_are_rejected() {
        let one = split(["a", "x.apk"], &["x.apk"]);
        let two = split(["a", "x.apk", "b"], &["x.apk"]);
        assert!(ensure_aligned(&one, &one).is_ok());
        assert!(matches!(
            ensure_aligned(&one, &two),
            Err(EstimateError::UnalignedPartition {
                old_blocks: 1,
                new_blocks: 2
            })
        ));
    }

    #[test]
    fn describe_blocks() {
        let blocks = split(["a", "b", "x.apk", "c"], &["x.apk"]);
        assert_eq!(
            describe(&blocks),
            "[2 files from 'a' to 'b', 1 files from 'c' to 'c']"
        );
    }

    #[test]
    fn names_that_decode_alike_stay_distinct() {
        let names: [&[u8]; 3] = [b"\xff.txt", b"x.apk", b"\xfe.txt"];
        let boundaries = BTreeSet::from([b"x.apk".to_vec()]);
        let blocks = partition_names(names, &boundaries);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].entries, [b"\xff.txt".to_vec()]);
        assert_eq!(blocks[1].entries, [b"\xfe.txt".to_vec()]);
    }
}
