use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::AsyncReadExt;

use super::{FetchStatus, TileAddress, TileSource};
use crate::error::SourceError;

/// Tile source reading tiles from a directory tree.
///
/// A tile lives at `{root}/{tile path}{suffix}`. Files never redirect, so
/// `fetch_local` is only reached through redirects issued by other sources
/// sharing the same tree.
#[derive(Debug, Clone)]
pub struct FileTileSource {
    root: PathBuf,
    suffix: String,
    identifier: String,
}

impl FileTileSource {
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        let root = root.into();
        let identifier = format!("file://{}", root.display());
        Self {
            root,
            suffix: suffix.into(),
            identifier,
        }
    }

    /// Map a slash separated relative path below the root.
    ///
    /// Parent and prefix components are refused.
    fn resolve(&self, relative: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(relative.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(SourceError::InvalidPath(relative.display().to_string())),
            }
        }
        Ok(path)
    }

    async fn read(
        &self,
        path: &Path,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(FetchStatus::NotFound),
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Ok(FetchStatus::NotFound);
        }
        if metadata.len() > capacity as u64 {
            return Err(SourceError::TooLarge { capacity });
        }

        // Read one byte past capacity to catch files that grew after stat.
        let start = buf.len();
        buf.reserve(metadata.len() as usize);
        let mut limited = file.take(capacity as u64 + 1);
        while limited.read_buf(buf).await? > 0 {}
        if buf.len() - start > capacity {
            buf.truncate(start);
            return Err(SourceError::TooLarge { capacity });
        }

        Ok(FetchStatus::Ok)
    }
}

#[async_trait]
impl TileSource for FileTileSource {
    async fn fetch(
        &self,
        tile: &TileAddress,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        let path = self.resolve(&tile.path(&self.suffix))?;
        self.read(&path, buf, capacity).await
    }

    async fn fetch_local(
        &self,
        path: &str,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        let path = self.resolve(path)?;
        self.read(&path, buf, capacity).await
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
