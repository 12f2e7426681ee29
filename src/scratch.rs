//! Scratch directories and small file helpers.

use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

use crate::error::{EstimateError, IoContext, Result};

/// Run-scoped scratch directory, removed in full when dropped.
#[derive(Debug)]
pub struct RunScratch {
    dir: TempDir,
}

impl RunScratch {
    /// Create a fresh, uniquely named directory under `root`.
    pub fn new(root: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("apkdelta-")
            .tempdir_in(root)
            .io_context(|| format!("create scratch directory in {}", root.display()))?;
        debug!("scratch directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fresh, empty subdirectory reserved for one strategy.
    pub async fn strategy_dir(&self, id: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(id);
        create_fresh_dir(&path).await?;
        Ok(path)
    }

    /// Remove the directory now, reporting failures instead of ignoring them.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .io_context(|| format!("remove {}", path.display()))
    }
}

/// Fail with [`EstimateError::MissingInput`] for the first path that does not exist.
pub fn ensure_exists<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EstimateError::missing(path));
        }
    }
    Ok(())
}

/// Remove `path` if it exists and recreate it empty.
pub async fn create_fresh_dir(path: &Path) -> Result<()> {
    if path.exists() {
        tokio::fs::remove_dir_all(path)
            .await
            .io_context(|| format!("remove {}", path.display()))?;
    }
    tokio::fs::create_dir_all(path)
        .await
        .io_context(|| format!("create {}", path.display()))
}

pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(EstimateError::Io {
            context: format!("remove {}", path.display()),
            source: e,
        }),
        _ => Ok(()),
    }
}

pub async fn file_size(path: &Path) -> Result<u64> {
    ensure_exists(&[path])?;
    let meta = tokio::fs::metadata(path)
        .await
        .io_context(|| format!("stat {}", path.display()))?;
    Ok(meta.len())
}

pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    ensure_exists(&[from])?;
    tokio::fs::copy(from, to)
        .await
        .io_context(|| format!("copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

/// Path next to `path` that does not exist yet: `<path>.copy0`, `<path>.copy1`, ...
pub fn unused_sibling(path: &Path, tag: &str) -> PathBuf {
    let mut n = 0usize;
    loop {
        let mut candidate = path.as_os_str().to_os_string();
        candidate.push(format!(".{tag}{n}"));
        let candidate = PathBuf::from(candidate);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Write the concatenation of `parts` to `output`.
pub async fn concat(parts: &[PathBuf], output: &Path) -> Result<()> {
    ensure_exists(parts)?;
    let mut out = tokio::fs::File::create(output)
        .await
        .io_context(|| format!("create {}", output.display()))?;
    for part in parts {
        let data = tokio::fs::read(part)
            .await
            .io_context(|| format!("read {}", part.display()))?;
        out.write_all(&data)
            .await
            .io_context(|| format!("write {}", output.display()))?;
    }
    out.flush()
        .await
        .io_context(|| format!("flush {}", output.display()))
}
