//! # tartiles
//!
//! A tile server endpoint that streams a rectangular range of raster tiles
//! as a single tar archive.
//!
//! A client asks for `{mount}/{level}/{row}/{col}/{width}/{height}` and gets
//! back every tile of that range that exists, in row-major order, each as one
//! ustar entry. Missing tiles are skipped; a range with no tiles at all is a
//! 404.
//!
//! ## Architecture
//!
//! - [`range`] - Request path parsing and validation
//! - [`raster`] - Raster pyramid metadata
//! - [`archive`] - ustar entry encoding and a sequential reader
//! - [`source`] - Upstream tile sources (HTTP and filesystem)
//! - [`tile`] - Tile aggregation and the archive service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use tartiles::{create_router, FileTileSource, RouterConfig, TarTileService, TiledRaster};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let raster = TiledRaster::load("raster.json")?;
//!     let source = FileTileSource::new("/data/tiles", ".jpg");
//!     let service = TarTileService::new(source, raster);
//!
//!     let router = create_router(service, RouterConfig::default());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod range;
pub mod raster;
pub mod server;
pub mod source;
pub mod tile;

// Re-export commonly used types
pub use archive::{entry_name, ArchiveEntry, ArchiveReader, EntryFields, EntryHeader, BLOCK_SIZE};
pub use config::{CheckConfig, Cli, Command, FetchConfig, ServeConfig, SourceConfig};
pub use error::{ArchiveError, RangeError, RasterError, SourceError, TarTilesError};
pub use range::{validate_range, TileRange, DEFAULT_MAX_LINEAR_TILES};
pub use raster::{RasterLevelBounds, TiledRaster};
pub use server::{
    create_router, health_handler, tar_handler, AppState, ErrorResponse, HealthResponse,
    RouterConfig, Subrequest,
};
pub use source::{
    resolve_redirect, AnySource, FetchStatus, FileTileSource, HttpTileSource, TileAddress,
    TileSource,
};
pub use tile::{TarTileService, TileAggregator, TileCell};
