//! Detection of nested archives shared by the old and new archive.

use std::collections::BTreeSet;

use crate::zip::ArchiveDirectory;

/// File name extensions treated as archive-like entries.
pub const ARCHIVE_EXTENSIONS: [&str; 3] = [".apk", ".jar", ".zip"];

/// Whether an entry name looks like a nested archive.
pub fn is_archive_like(name: impl AsRef<[u8]>) -> bool {
    let name = name.as_ref();
    ARCHIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext.as_bytes()))
}

/// Name bytes of archive-like entries present in both `old` and `new`.
pub fn common_embedded_archives(old: &ArchiveDirectory, new: &ArchiveDirectory) -> BTreeSet<Vec<u8>> {
    let old_archives: BTreeSet<&[u8]> = old.raw_names().filter(|n| is_archive_like(n)).collect();
    new.raw_names()
        .filter(|n| is_archive_like(n) && old_archives.contains(n))
        .map(<[u8]>::to_vec)
        .collect()
}
