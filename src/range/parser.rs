use crate::error::RangeError;

/// A rectangular range of tiles at one pyramid level.
///
/// Parsed once per request and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    /// Pyramid level (0 = coarsest)
    pub level: u32,

    /// Extra dimension index, 0 when absent
    pub extra_index: u32,

    /// Top row of the range
    pub row_origin: u32,

    /// Left column of the range
    pub col_origin: u32,

    /// Number of columns
    pub width: u32,

    /// Number of rows
    pub height: u32,
}

impl TileRange {
    /// Parse a range from the trailing segments of a request path.
    ///
    /// The last five segments are `level/row/col/width/height`. When
    /// `extra_required` is set a sixth segment must precede them; it becomes
    /// the extra index, falling back to 0 if it is not a number.
    ///
    /// # Example
    ///
    /// ```
    /// use tartiles::range::TileRange;
    ///
    /// let range = TileRange::from_path("/tartiles/3/10/20/2/2", false).unwrap();
    /// assert_eq!((range.level, range.row_origin, range.col_origin), (3, 10, 20));
    /// ```
    pub fn from_path(path: &str, extra_required: bool) -> Result<Self, RangeError> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).rev();

        let mut next = |name: &str| -> Result<u32, RangeError> {
            let token = segments
                .next()
                .ok_or_else(|| RangeError::malformed(format!("missing {} segment", name)))?;
            token
                .parse::<u32>()
                .map_err(|_| RangeError::malformed(format!("invalid {} '{}'", name, token)))
        };

        let height = next("height")?;
        let width = next("width")?;
        let col_origin = next("column")?;
        let row_origin = next("row")?;
        let level = next("level")?;

        if width == 0 || height == 0 {
            return Err(RangeError::malformed("width and height must be positive"));
        }

        let extra_index = if extra_required {
            let token = segments
                .next()
                .ok_or_else(|| RangeError::malformed("missing extra index segment"))?;
            token.parse::<u32>().unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            level,
            extra_index,
            row_origin,
            col_origin,
            width,
            height,
        })
    }

    /// Number of cells in the range.
    pub fn tile_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Cells in row-major order: rows outer, columns inner.
    pub fn cells(&self) -> impl Iterator<Item = (u64, u64)> {
        let rows = self.row_origin as u64..self.row_origin as u64 + self.height as u64;
        let cols = self.col_origin as u64..self.col_origin as u64 + self.width as u64;
        rows.flat_map(move |row| cols.clone().map(move |col| (row, col)))
    }
}
