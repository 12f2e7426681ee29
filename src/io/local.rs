use super::ReadAt;
use crate::error::{EstimateError, IoContext, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Local file reader with random access support
pub struct LocalFileReader {
    path: PathBuf,
    file: std::fs::File,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EstimateError::missing(path));
        }
        let file = std::fs::File::open(path).io_context(|| format!("open {}", path.display()))?;
        let size = file
            .metadata()
            .io_context(|| format!("stat {}", path.display()))?
            .len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        let n = {
            use std::os::unix::fs::FileExt;
            self.file.read_at(buf, offset)
        };

        #[cfg(windows)]
        let n = {
            use std::os::windows::fs::FileExt;
            self.file.seek_read(buf, offset)
        };

        n.io_context(|| format!("read {} at offset {offset}", self.path.display()))
    }

    fn size(&self) -> u64 {
        self.size
    }
}
