//! Tile aggregation loop.
//!
//! The aggregator walks a validated range in row-major order, fetches each
//! cell from the tile source and writes every tile it gets as one archive
//! entry. Cells that are missing, fail, redirect somewhere unusable, or come
//! back empty are skipped without surfacing an error.
//!
//! ```text
//! next_entry() ──► fetch ──► Redirect? ──► resolve_redirect ──► fetch_local
//!      ▲             │                                              │
//!      │             ▼                                              ▼
//!      │       Ok + non-empty ──► encode header ──► pending entry ◄─┘
//!      │                                              │
//!      └──────────── write_pending(): header + payload + padding
//! ```

use std::io;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::archive::{entry_name, padding_len, EntryHeader, BLOCK_SIZE, ZERO_BLOCK};
use crate::error::SourceError;
use crate::range::TileRange;
use crate::raster::RasterLevelBounds;
use crate::source::{resolve_redirect, FetchStatus, TileAddress, TileSource};

/// A grid cell within the requested range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCell {
    pub row: u64,
    pub col: u64,
}

/// Streams the tiles of one range request into an archive.
///
/// Owns the fetch buffer and the header record for the duration of the
/// request; both are reset before every cell.
pub struct TileAggregator<S: TileSource> {
    source: Arc<S>,
    range: TileRange,
    bounds: RasterLevelBounds,
    source_level: u32,
    extra: Option<u32>,

    next_cell: u64,
    pending: Option<TileCell>,
    buffer: BytesMut,
    header: EntryHeader,

    entries: u64,
    bytes_written: u64,
}

impl<S: TileSource> TileAggregator<S> {
    /// Create an aggregator for an already validated range.
    ///
    /// `source_level` is the level index passed to the source, `extra` the
    /// extra dimension index for rasters that have one.
    pub fn new(
        source: Arc<S>,
        range: TileRange,
        bounds: RasterLevelBounds,
        source_level: u32,
        extra: Option<u32>,
    ) -> Self {
        Self {
            source,
            range,
            bounds,
            source_level,
            extra,
            next_cell: 0,
            pending: None,
            buffer: BytesMut::with_capacity(bounds.max_tile_size),
            header: EntryHeader::new(),
            entries: 0,
            bytes_written: 0,
        }
    }

    /// Number of entries written so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Advance to the next cell that yields a tile.
    ///
    /// Returns `None` once the range is exhausted. The found tile stays
    /// pending until [`write_pending`](Self::write_pending) is called; calling
    /// this again first discards it.
    pub async fn next_entry(&mut self) -> Option<TileCell> {
        self.pending = None;

        while self.next_cell < self.range.tile_count() {
            let cell = self.cell_at(self.next_cell);
            self.next_cell += 1;

            self.buffer.clear();
            let tile = TileAddress {
                level: self.source_level,
                extra: self.extra,
                row: cell.row,
                col: cell.col,
            };

            match self.fetch_cell(&tile).await {
                Ok(true) if !self.buffer.is_empty() => {}
                Ok(_) => {
                    debug!(level = tile.level, row = cell.row, col = cell.col, "no tile");
                    continue;
                }
                Err(e) => {
                    debug!(
                        level = tile.level,
                        row = cell.row,
                        col = cell.col,
                        "tile skipped: {}",
                        e
                    );
                    continue;
                }
            }

            let name = entry_name(self.range.level, cell.row, cell.col);
            if let Err(e) = self.header.encode(&name, self.buffer.len() as u64) {
                debug!(row = cell.row, col = cell.col, "tile skipped: {}", e);
                continue;
            }

            self.pending = Some(cell);
            return Some(cell);
        }

        None
    }

    /// Write the pending tile as header, payload and padding.
    ///
    /// Returns the number of bytes written, 0 when nothing was pending.
    pub async fn write_pending<W>(&mut self, sink: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if self.pending.take().is_none() {
            return Ok(0);
        }

        let len = self.buffer.len() as u64;
        let pad = padding_len(len);
        sink.write_all(self.header.as_bytes()).await?;
        sink.write_all(&self.buffer).await?;
        sink.write_all(&ZERO_BLOCK[..pad]).await?;

        let written = BLOCK_SIZE as u64 + len + pad as u64;
        self.entries += 1;
        self.bytes_written += written;
        Ok(written)
    }

    /// Write the pending tile and every remaining tile of the range.
    ///
    /// Returns the total number of bytes written by this aggregator. A write
    /// failure stops the loop without fetching further tiles.
    pub async fn write_to<W>(&mut self, sink: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.write_pending(sink).await?;
        while self.next_entry().await.is_some() {
            self.write_pending(sink).await?;
        }
        sink.flush().await?;

        debug!(
            level = self.range.level,
            entries = self.entries,
            bytes = self.bytes_written,
            "archive complete"
        );
        Ok(self.bytes_written)
    }

    fn cell_at(&self, index: u64) -> TileCell {
        let width = self.range.width as u64;
        TileCell {
            row: self.range.row_origin as u64 + index / width,
            col: self.range.col_origin as u64 + index % width,
        }
    }

    /// Fetch one cell into the buffer, chasing at most one redirect.
    ///
    /// `Ok(false)` means the cell has no tile.
    async fn fetch_cell(&mut self, tile: &TileAddress) -> Result<bool, SourceError> {
        let capacity = self.bounds.max_tile_size;

        let location = match self.source.fetch(tile, &mut self.buffer, capacity).await? {
            FetchStatus::Ok => return Ok(true),
            FetchStatus::NotFound => return Ok(false),
            FetchStatus::Redirect { location } => location,
        };

        let Some(path) = location
            .as_deref()
            .and_then(|l| resolve_redirect(l, self.source.origin()))
        else {
            debug!(?location, "unusable redirect location");
            return Ok(false);
        };

        self.buffer.clear();
        let status = self
            .source
            .fetch_local(&path, &mut self.buffer, capacity)
            .await?;
        Ok(status == FetchStatus::Ok)
    }
}
