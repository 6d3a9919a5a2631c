//! Test utilities for integration tests.
//!
//! This module provides an in-memory tile source and helpers for building
//! rasters, routers and decoding archive bodies.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

use tartiles::archive::ArchiveReader;
use tartiles::error::SourceError;
use tartiles::raster::TiledRaster;
use tartiles::source::{FetchStatus, TileAddress, TileSource};
use tartiles::tile::TarTileService;
use tartiles::{create_router, RouterConfig};

// =============================================================================
// Mock Tile Source
// =============================================================================

#[derive(Clone)]
enum MockTile {
    Data(Vec<u8>),
    Redirect(String),
    Failure,
}

/// An in-memory tile source that records every request.
///
/// Clones share the request log, so a test can keep one handle while the
/// service owns another.
#[derive(Clone, Default)]
pub struct MockTileSource {
    tiles: HashMap<TileAddress, MockTile>,
    local: HashMap<String, Vec<u8>>,
    origin: Option<Url>,
    requests: Arc<Mutex<Vec<TileAddress>>>,
    local_requests: Arc<Mutex<Vec<String>>>,
}

pub fn address(level: u32, row: u64, col: u64) -> TileAddress {
    TileAddress {
        level,
        extra: None,
        row,
        col,
    }
}

impl MockTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tile payload.
    pub fn with_tile(self, level: u32, row: u64, col: u64, data: impl Into<Vec<u8>>) -> Self {
        self.with_tile_at(address(level, row, col), data)
    }

    /// Add a tile payload at a full address.
    pub fn with_tile_at(mut self, tile: TileAddress, data: impl Into<Vec<u8>>) -> Self {
        self.tiles.insert(tile, MockTile::Data(data.into()));
        self
    }

    /// Answer a tile request with a redirect.
    pub fn with_redirect(
        mut self,
        level: u32,
        row: u64,
        col: u64,
        location: impl Into<String>,
    ) -> Self {
        self.tiles
            .insert(address(level, row, col), MockTile::Redirect(location.into()));
        self
    }

    /// Make a tile request fail with an I/O error.
    pub fn with_failure(mut self, level: u32, row: u64, col: u64) -> Self {
        self.tiles.insert(address(level, row, col), MockTile::Failure);
        self
    }

    /// Add a resource reachable through `fetch_local`.
    pub fn with_local(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.local.insert(path.into(), data.into());
        self
    }

    /// Restrict redirects to an origin.
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(Url::parse(origin).unwrap());
        self
    }

    pub fn requests(&self) -> Vec<TileAddress> {
        self.requests.lock().unwrap().clone()
    }

    pub fn local_requests(&self) -> Vec<String> {
        self.local_requests.lock().unwrap().clone()
    }
}

fn copy_into(data: &[u8], buf: &mut BytesMut, capacity: usize) -> Result<FetchStatus, SourceError> {
    if data.len() > capacity {
        return Err(SourceError::TooLarge { capacity });
    }
    buf.extend_from_slice(data);
    Ok(FetchStatus::Ok)
}

#[async_trait]
impl TileSource for MockTileSource {
    async fn fetch(
        &self,
        tile: &TileAddress,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        self.requests.lock().unwrap().push(*tile);

        match self.tiles.get(tile) {
            Some(MockTile::Data(data)) => copy_into(data, buf, capacity),
            Some(MockTile::Redirect(location)) => Ok(FetchStatus::Redirect {
                location: Some(location.clone()),
            }),
            Some(MockTile::Failure) => Err(SourceError::Io("connection reset".to_string())),
            None => Ok(FetchStatus::NotFound),
        }
    }

    async fn fetch_local(
        &self,
        path: &str,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<FetchStatus, SourceError> {
        self.local_requests.lock().unwrap().push(path.to_string());

        match self.local.get(path) {
            Some(data) => copy_into(data, buf, capacity),
            None => Ok(FetchStatus::NotFound),
        }
    }

    fn origin(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    fn identifier(&self) -> &str {
        "mock"
    }
}

// =============================================================================
// Rasters
// =============================================================================

/// 4096x4096 px raster with 256 px tiles: levels 0..=4, the finest level is
/// a 16x16 tile grid. Tiles are capped at 4 KiB.
pub fn test_raster() -> TiledRaster {
    TiledRaster::from_json(
        r#"{"size": {"x": 4096, "y": 4096}, "page_size": {"x": 256, "y": 256}, "max_tile_size": 4096}"#,
    )
    .unwrap()
}

/// Same grid as [`test_raster`] with an extra dimension of 3 bands.
pub fn test_raster_with_bands() -> TiledRaster {
    TiledRaster::from_json(
        r#"{"size": {"x": 4096, "y": 4096, "z": 3}, "page_size": {"x": 256, "y": 256}, "max_tile_size": 4096}"#,
    )
    .unwrap()
}

/// Same grid as [`test_raster`] with the two coarsest levels hidden.
pub fn test_raster_skipping_levels() -> TiledRaster {
    TiledRaster::from_json(
        r#"{"size": {"x": 4096, "y": 4096}, "page_size": {"x": 256, "y": 256}, "max_tile_size": 4096, "skip_levels": 2}"#,
    )
    .unwrap()
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Router mounted at the default prefix, without request tracing.
pub fn test_router<S: TileSource + 'static>(source: S, raster: TiledRaster) -> Router {
    test_router_with_config(source, raster, RouterConfig::default())
}

pub fn test_router_with_config<S: TileSource + 'static>(
    source: S,
    raster: TiledRaster,
    config: RouterConfig,
) -> Router {
    let service = TarTileService::new(source, raster);
    create_router(service, config.with_tracing(false))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Decode an archive body into `(name, payload)` pairs, panicking on any
/// malformed entry.
pub fn read_entries(data: &[u8]) -> Vec<(String, Vec<u8>)> {
    ArchiveReader::new(data)
        .map(|entry| {
            let entry = entry.unwrap();
            (entry.fields.name, entry.payload.to_vec())
        })
        .collect()
}
