//! Tile archive service layer.
//!
//! This module turns range requests into streamed tile archives.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             TarTileService              │
//! │   (parse + validate request range)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             TileAggregator              │
//! │  (fetch cells, emit archive entries)    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               TileSource                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TarTileService`]: shared entry point, owns the source and raster
//! - [`TileAggregator`]: per-request loop over the tile grid
//! - [`TileCell`]: a row/column position within the range

mod aggregator;
mod service;

pub use aggregator::{TileAggregator, TileCell};
pub use service::TarTileService;
