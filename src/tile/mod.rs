//! Slippy-map tile addressing
//!
//! Maps XYZ tile coordinates (origin top-left, `2^zoom` tiles per axis) onto
//! Web Mercator (EPSG:3857) extents, which is what ArcGIS export requests take.

mod export;

pub use export::ExportRequest;

use crate::proxy::ProxyError;
use std::fmt;

/// Edge length of a tile in pixels at pixel ratio 1
pub const TILE_SIZE: u32 = 256;

/// Half the width of the Web Mercator world, in meters
pub const WORLD_EXTENT: f64 = 20_037_508.342_789_2;

/// Spatial reference id of Web Mercator
pub const WEB_MERCATOR_WKID: u32 = 3857;

/// One tile of the XYZ grid.
///
/// The range `0 <= x, y < 2^zoom` is not checked: an
/// out-of-range address still yields a well-formed (if empty) extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub zoom: u32,
    pub x: u32,
    pub y: u32,
}

impl TileAddress {
    pub const fn new(zoom: u32, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Parse the `{zoom}/{x}/{y}` path segments.
    ///
    /// The row segment may carry an image extension (`2.png`), which is ignored.
    pub fn parse(zoom: &str, x: &str, y: &str) -> Result<Self, ProxyError> {
        let y = y.split_once('.').map_or(y, |(row, _ext)| row);
        Ok(Self::new(
            parse_segment("zoom", zoom)?,
            parse_segment("x", x)?,
            parse_segment("y", y)?,
        ))
    }

    /// Side length of this tile in meters
    pub fn span(&self) -> f64 {
        let tiles_per_axis = 2f64.powi(i32::try_from(self.zoom).unwrap_or(i32::MAX));
        2.0 * WORLD_EXTENT / tiles_per_axis
    }

    /// Web Mercator extent covered by this tile
    pub fn bounds(&self) -> BoundingBox {
        let span = self.span();
        let min_x = -WORLD_EXTENT + f64::from(self.x) * span;
        let max_y = WORLD_EXTENT - f64::from(self.y) * span;
        BoundingBox {
            min_x,
            min_y: max_y - span,
            max_x: min_x + span,
            max_y,
        }
    }
}

#[cfg(test)]
impl TileAddress {
    /// The four tiles one zoom level down, in row-major order
    const fn children(&self) -> [Self; 4] {
        let (zoom, x, y) = (self.zoom + 1, self.x * 2, self.y * 2);
        [
            Self::new(zoom, x, y),
            Self::new(zoom, x + 1, y),
            Self::new(zoom, x, y + 1),
            Self::new(zoom, x + 1, y + 1),
        ]
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

fn parse_segment(name: &str, value: &str) -> Result<u32, ProxyError> {
    value
        .parse::<u32>()
        .map_err(|e| ProxyError::InvalidTileAddress(format!("{name} '{value}': {e}")))
}

/// Axis-aligned extent in EPSG:3857 meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[cfg(test)]
impl BoundingBox {
    fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Renders as the `minx,miny,maxx,maxy` form ArcGIS expects for `bbox`
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}
