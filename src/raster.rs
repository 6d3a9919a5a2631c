//! Raster pyramid metadata.
//!
//! A [`TiledRaster`] describes the tile grid of every pyramid level. It is
//! loaded once at startup from a small JSON description:
//!
//! ```json
//! {
//!   "size": { "x": 40000, "y": 20000, "z": 1 },
//!   "page_size": { "x": 512, "y": 512 },
//!   "max_tile_size": 1048576,
//!   "skip_levels": 0
//! }
//! ```
//!
//! Levels are derived by halving the full-resolution size until the level
//! fits in a single tile. Level 0 is the coarsest level, the highest level
//! index is the full-resolution grid. `skip_levels` hides that many of the
//! coarsest levels from requests.

use std::path::Path;

use serde::Deserialize;

use crate::error::RasterError;

/// Default upper bound on the encoded size of a single tile (1 MiB).
pub const DEFAULT_MAX_TILE_SIZE: usize = 1024 * 1024;

/// Pixel extent of the raster, with an optional extra dimension.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RasterSize {
    pub x: u64,
    pub y: u64,
    #[serde(default = "default_z")]
    pub z: u64,
}

fn default_z() -> u64 {
    1
}

/// Pixel size of a single tile.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageSize {
    pub x: u64,
    pub y: u64,
}

/// On-disk raster description.
#[derive(Debug, Clone, Deserialize)]
pub struct RasterConfig {
    pub size: RasterSize,
    pub page_size: PageSize,
    #[serde(default = "default_max_tile_size")]
    pub max_tile_size: usize,
    #[serde(default)]
    pub skip_levels: u32,
}

fn default_max_tile_size() -> usize {
    DEFAULT_MAX_TILE_SIZE
}

/// Tile grid facts for one requestable level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLevelBounds {
    /// Number of tile columns
    pub grid_width: u64,
    /// Number of tile rows
    pub grid_height: u64,
    /// Upper bound on any single tile's encoded size
    pub max_tile_size: usize,
}

/// A tiled raster pyramid.
#[derive(Debug, Clone)]
pub struct TiledRaster {
    size: RasterSize,
    page_size: PageSize,
    max_tile_size: usize,
    skip_levels: u32,
    /// Requestable levels, coarsest first
    levels: Vec<(u64, u64)>,
}

impl TiledRaster {
    /// Build a raster from its description.
    pub fn from_config(config: &RasterConfig) -> Result<Self, RasterError> {
        let RasterConfig {
            size,
            page_size,
            max_tile_size,
            skip_levels,
        } = *config;

        if size.x == 0 || size.y == 0 || size.z == 0 {
            return Err(RasterError::Invalid("size must be nonzero".to_string()));
        }
        if page_size.x == 0 || page_size.y == 0 {
            return Err(RasterError::Invalid("page_size must be nonzero".to_string()));
        }
        if max_tile_size == 0 {
            return Err(RasterError::Invalid(
                "max_tile_size must be nonzero".to_string(),
            ));
        }

        let mut levels = Vec::new();
        let (mut width, mut height) = (size.x, size.y);
        loop {
            let grid = (width.div_ceil(page_size.x), height.div_ceil(page_size.y));
            levels.push(grid);
            if grid == (1, 1) {
                break;
            }
            width = width.div_ceil(2);
            height = height.div_ceil(2);
        }
        levels.reverse();

        let skip = skip_levels as usize;
        if skip >= levels.len() {
            return Err(RasterError::Invalid(format!(
                "skip_levels {} leaves no levels out of {}",
                skip_levels,
                levels.len()
            )));
        }
        levels.drain(..skip);

        Ok(Self {
            size,
            page_size,
            max_tile_size,
            skip_levels,
            levels,
        })
    }

    /// Parse a raster from JSON text.
    pub fn from_json(text: &str) -> Result<Self, RasterError> {
        let config: RasterConfig = serde_json::from_str(text)?;
        Self::from_config(&config)
    }

    /// Load a raster description file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RasterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Number of requestable levels.
    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Grid bounds of a requestable level.
    pub fn level_bounds(&self, level: u32) -> Option<RasterLevelBounds> {
        self.levels
            .get(level as usize)
            .map(|&(grid_width, grid_height)| RasterLevelBounds {
                grid_width,
                grid_height,
                max_tile_size: self.max_tile_size,
            })
    }

    /// Level index used at the tile source for a requested level.
    pub fn source_level(&self, level: u32) -> u32 {
        level + self.skip_levels
    }

    /// Whether requests must carry an extra dimension index.
    pub fn has_extra_dimension(&self) -> bool {
        self.size.z > 1
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn max_tile_size(&self) -> usize {
        self.max_tile_size
    }
}
