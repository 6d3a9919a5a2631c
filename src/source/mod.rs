//! Upstream tile sources.
//!
//! A [`TileSource`] fetches the encoded bytes of one tile. Tiles are opaque:
//! sources never look inside the payload.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             TileAggregator              │
//! └──────────┬──────────────────┬───────────┘
//!            │ fetch()          │ fetch_local()  (after a redirect)
//!            ▼                  ▼
//! ┌─────────────────────────────────────────┐
//! │            TileSource trait             │
//! └──────────┬──────────────────┬───────────┘
//!            ▼                  ▼
//! ┌──────────────────┐  ┌──────────────────┐
//! │  HttpTileSource  │  │  FileTileSource  │
//! └──────────────────┘  └──────────────────┘
//! ```

mod file;
mod http;
mod redirect;

pub use file::FileTileSource;
pub use http::HttpTileSource;
pub use redirect::resolve_redirect;

use async_trait::async_trait;
use bytes::BytesMut;
use url::Url;

use crate::error::SourceError;

/// Coordinates of a single tile at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    /// Pyramid level
    pub level: u32,
    /// Extra dimension index, only for rasters that have one
    pub extra: Option<u32>,
    /// Tile row
    pub row: u64,
    /// Tile column
    pub col: u64,
}

impl TileAddress {
    /// Relative path of this tile below a source base, with `suffix` appended.
    ///
    /// `{extra}/{level}/{row}/{col}{suffix}`, the extra segment only when set.
    pub fn path(&self, suffix: &str) -> String {
        match self.extra {
            Some(extra) => format!(
                "{}/{}/{}/{}{}",
                extra, self.level, self.row, self.col, suffix
            ),
            None => format!("{}/{}/{}{}", self.level, self.row, self.col, suffix),
        }
    }
}

/// Result of a successful exchange with a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// Payload was appended to the buffer
    Ok,
    /// Tile lives elsewhere
    Redirect { location: Option<String> },
    /// Tile does not exist
    NotFound,
}

/// Trait for fetching tile bytes.
///
/// Both operations append the payload to `buf` and must fail with
/// [`SourceError::TooLarge`] rather than grow it past `capacity` bytes.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Fetch a tile by coordinates.
    async fn fetch(
        &self,
        tile: &TileAddress,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError>;

    /// Fetch a resource by path, used to follow a redirect.
    async fn fetch_local(
        &self,
        path: &str,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError>;

    /// Origin that redirect locations must match, if any.
    fn origin(&self) -> Option<&Url> {
        None
    }

    /// Identifier for logging.
    fn identifier(&self) -> &str;
}

/// A source selected at startup from configuration.
pub enum AnySource {
    Http(HttpTileSource),
    File(FileTileSource),
}

#[async_trait]
impl TileSource for AnySource {
    async fn fetch(
        &self,
        tile: &TileAddress,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        match self {
            AnySource::Http(source) => source.fetch(tile, buf, capacity).await,
            AnySource::File(source) => source.fetch(tile, buf, capacity).await,
        }
    }

    async fn fetch_local(
        &self,
        path: &str,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        match self {
            AnySource::Http(source) => source.fetch_local(path, buf, capacity).await,
            AnySource::File(source) => source.fetch_local(path, buf, capacity).await,
        }
    }

    fn origin(&self) -> Option<&Url> {
        match self {
            AnySource::Http(source) => source.origin(),
            AnySource::File(source) => source.origin(),
        }
    }

    fn identifier(&self) -> &str {
        match self {
            AnySource::Http(source) => source.identifier(),
            AnySource::File(source) => source.identifier(),
        }
    }
}
