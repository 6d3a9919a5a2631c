use thiserror::Error;

/// Errors produced while parsing or validating a tile range request.
///
/// Every variant is a client error and maps to HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The request path does not end with enough numeric segments
    #[error("Malformed tile range: {reason}")]
    Malformed { reason: String },

    /// Requested pyramid level does not exist
    #[error("Invalid level: {level} (raster has {levels} levels)")]
    LevelOutOfRange { level: u32, levels: u32 },

    /// Range does not fit strictly inside the level's tile grid
    #[error(
        "Range rows {row}+{height}, columns {col}+{width} at level {level} \
         exceed the {grid_height}x{grid_width} tile grid"
    )]
    OutOfBounds {
        level: u32,
        row: u64,
        col: u64,
        width: u64,
        height: u64,
        grid_width: u64,
        grid_height: u64,
    },

    /// Range spans more tiles per dimension than configured
    #[error("Range of {width}x{height} tiles exceeds the limit of {max} tiles per side")]
    TooLarge { width: u32, height: u32, max: u32 },
}

impl RangeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RangeError::Malformed {
            reason: reason.into(),
        }
    }
}

/// Errors from a tile source while fetching a single tile.
///
/// These never reach the client: the tile is skipped.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Transport failure talking to an HTTP source
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream answered with an unexpected status code
    #[error("Unexpected upstream status: {0}")]
    Status(u16),

    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Tile payload does not fit in the fetch buffer
    #[error("Tile exceeds buffer capacity of {capacity} bytes")]
    TooLarge { capacity: usize },

    /// Path or location cannot be mapped onto this source
    #[error("Invalid tile path: {0}")]
    InvalidPath(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Http(err.to_string())
    }
}

/// Errors encoding or decoding archive entry headers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// Entry name does not fit the 100 byte name field
    #[error("Entry name is {0} bytes, the name field holds at most 99")]
    NameTooLong(usize),

    /// Payload size does not fit 11 octal digits
    #[error("Entry size {0} does not fit the size field")]
    SizeOverflow(u64),

    /// Stream ended inside a header or payload
    #[error("Archive truncated at offset {offset}")]
    Truncated { offset: usize },

    /// Stored checksum does not match the header bytes
    #[error("Checksum mismatch: stored {stored:o}, computed {computed:o}")]
    BadChecksum { stored: u32, computed: u32 },

    /// A numeric field is not valid octal
    #[error("Invalid octal value in {field} field")]
    InvalidField { field: &'static str },
}

/// Errors loading the raster description at startup.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Raster file could not be read
    #[error("Cannot read raster file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Raster file is not valid JSON for the expected shape
    #[error("Invalid raster description: {0}")]
    Json(#[from] serde_json::Error),

    /// Raster values are inconsistent
    #[error("Invalid raster: {0}")]
    Invalid(String),
}

/// Outcome errors for a whole tar-tiles request.
#[derive(Debug, Error)]
pub enum TarTilesError {
    /// Request range is malformed or out of bounds (HTTP 400)
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Valid range, but no tile in it produced data (HTTP 404)
    #[error("No tiles found in the requested range")]
    NoContent,

    /// Writing the archive failed, typically a closed client connection
    #[error("Archive write aborted: {0}")]
    Aborted(#[from] std::io::Error),
}
