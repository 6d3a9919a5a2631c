//! Tile range requests.
//!
//! A range request names a rectangle of tiles at one pyramid level through
//! the trailing segments of the request path:
//!
//! ```text
//! .../{level}/{row}/{col}/{width}/{height}
//! .../{extra}/{level}/{row}/{col}/{width}/{height}
//! ```
//!
//! Parsing turns a path into a [`TileRange`]; [`validate_range`] then checks
//! it against the raster level bounds and the configured size limit.

mod parser;
mod validation;

pub use parser::TileRange;
pub use validation::{validate_range, DEFAULT_MAX_LINEAR_TILES, MAX_LINEAR_TILES_CEILING};
