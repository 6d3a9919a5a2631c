//! Tar tile service.
//!
//! The service is built once at startup from the validated configuration and
//! shared by all requests. It turns a request path into a ready-to-run
//! [`TileAggregator`]:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TarTileService                         │
//! │   path ──► TileRange::from_path ──► validate_range ──┐      │
//! │                                                      ▼      │
//! │              TiledRaster (level bounds)      TileAggregator │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::io::AsyncWrite;

use crate::error::{RangeError, TarTilesError};
use crate::range::{validate_range, TileRange, DEFAULT_MAX_LINEAR_TILES, MAX_LINEAR_TILES_CEILING};
use crate::raster::TiledRaster;
use crate::source::TileSource;

use super::aggregator::TileAggregator;

/// Service producing tile archives for range requests.
///
/// # Example
///
/// ```ignore
/// use tartiles::raster::TiledRaster;
/// use tartiles::source::FileTileSource;
/// use tartiles::tile::TarTileService;
///
/// let raster = TiledRaster::load("raster.json")?;
/// let service = TarTileService::new(FileTileSource::new("/data/tiles", ".jpg"), raster);
///
/// let mut out = tokio::fs::File::create("area.tar").await?;
/// service.write_archive("/3/10/20/2/2", &mut out).await?;
/// ```
pub struct TarTileService<S: TileSource> {
    source: Arc<S>,
    raster: TiledRaster,
    max_linear_tiles: u32,
}

impl<S: TileSource> TarTileService<S> {
    /// Create a service with the default range limit.
    pub fn new(source: S, raster: TiledRaster) -> Self {
        Self {
            source: Arc::new(source),
            raster,
            max_linear_tiles: DEFAULT_MAX_LINEAR_TILES,
        }
    }

    /// Set the maximum width and height of a range, in tiles.
    ///
    /// The value is clamped to `1..=MAX_LINEAR_TILES_CEILING`.
    pub fn with_max_linear_tiles(mut self, max_linear_tiles: u32) -> Self {
        self.max_linear_tiles = max_linear_tiles.clamp(1, MAX_LINEAR_TILES_CEILING);
        self
    }

    /// Parse and validate a request path, returning an aggregator for it.
    pub fn aggregator(&self, path: &str) -> Result<TileAggregator<S>, RangeError> {
        let extra_required = self.raster.has_extra_dimension();
        let range = TileRange::from_path(path, extra_required)?;
        let bounds = validate_range(
            &range,
            self.raster.level_bounds(range.level),
            self.raster.level_count(),
            self.max_linear_tiles,
        )?;

        let extra = extra_required.then_some(range.extra_index);
        Ok(TileAggregator::new(
            Arc::clone(&self.source),
            range,
            bounds,
            self.raster.source_level(range.level),
            extra,
        ))
    }

    /// Validate a request path and fetch its first tile.
    ///
    /// The returned aggregator holds that tile pending, so nothing needs to be
    /// written (or opened for writing) before the outcome is known. Fails with
    /// [`TarTilesError::NoContent`] when the range is valid but yields no
    /// tiles.
    pub async fn open_archive(&self, path: &str) -> Result<TileAggregator<S>, TarTilesError> {
        let mut aggregator = self.aggregator(path)?;
        if aggregator.next_entry().await.is_none() {
            return Err(TarTilesError::NoContent);
        }
        Ok(aggregator)
    }

    /// Write the archive for a request path into `sink`.
    ///
    /// Fails with [`TarTilesError::NoContent`] when the range is valid but
    /// yields no tiles.
    pub async fn write_archive<W>(&self, path: &str, sink: &mut W) -> Result<u64, TarTilesError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut aggregator = self.open_archive(path).await?;
        Ok(aggregator.write_to(sink).await?)
    }

    pub fn raster(&self) -> &TiledRaster {
        &self.raster
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn max_linear_tiles(&self) -> u32 {
        self.max_linear_tiles
    }
}
