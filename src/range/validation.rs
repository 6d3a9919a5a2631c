use crate::error::RangeError;
use crate::raster::RasterLevelBounds;

use super::TileRange;

/// Default limit on the width and height of a range, in tiles.
pub const DEFAULT_MAX_LINEAR_TILES: u32 = 4;

/// Largest accepted value for the per-side tile limit.
pub const MAX_LINEAR_TILES_CEILING: u32 = 16;

/// Check a range against the raster and the configured size limit.
///
/// `bounds` is `None` when the level does not exist, in which case
/// `level_count` is reported back in the error. The range must fit strictly
/// inside the level grid: a range whose last row or column touches the grid
/// edge is rejected.
pub fn validate_range(
    range: &TileRange,
    bounds: Option<RasterLevelBounds>,
    level_count: u32,
    max_linear_tiles: u32,
) -> Result<RasterLevelBounds, RangeError> {
    let bounds = match bounds {
        Some(b) if range.level < level_count => b,
        _ => {
            return Err(RangeError::LevelOutOfRange {
                level: range.level,
                levels: level_count,
            })
        }
    };

    let row_end = range.row_origin as u64 + range.height as u64;
    let col_end = range.col_origin as u64 + range.width as u64;
    if row_end >= bounds.grid_height || col_end >= bounds.grid_width {
        return Err(RangeError::OutOfBounds {
            level: range.level,
            row: range.row_origin as u64,
            col: range.col_origin as u64,
            width: range.width as u64,
            height: range.height as u64,
            grid_width: bounds.grid_width,
            grid_height: bounds.grid_height,
        });
    }

    if range.width > max_linear_tiles || range.height > max_linear_tiles {
        return Err(RangeError::TooLarge {
            width: range.width,
            height: range.height,
            max: max_linear_tiles,
        });
    }

    Ok(bounds)
}
