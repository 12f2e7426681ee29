mod local;

pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::{EstimateError, Result};

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill `buf` completely starting at `offset`.
    async fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            let n = self.read_at(offset, buf).await?;
            if n == 0 {
                return Err(EstimateError::Io {
                    context: format!("short read at offset {offset}"),
                    source: std::io::ErrorKind::UnexpectedEof.into(),
                });
            }
            offset += n as u64;
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Read the whole source into memory.
    async fn read_all(&self) -> Result<Vec<u8>> {
        let len = usize::try_from(self.size())
            .map_err(|_| EstimateError::Unsupported("source does not fit in memory".into()))?;
        let mut buf = vec![0u8; len];
        self.read_exact_at(0, &mut buf).await?;
        Ok(buf)
    }
}
