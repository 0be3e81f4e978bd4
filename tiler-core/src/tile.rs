//! Slippy-map tile addressing.
//!
//! Tiles follow the standard Web Mercator scheme: zoom level `z` splits the
//! world into `2^z × 2^z` tiles with `x` growing eastward from the
//! antimeridian and `y` growing southward from the northern Mercator limit.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::fmt;

use thiserror::Error;

use crate::BoundingBox;

/// Deepest zoom level accepted by tile arithmetic.
pub const MAX_ZOOM: u8 = 24;

/// Northern and southern limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Number of coarser levels produced by [`make_levels`] for offline formats.
pub const PYRAMID_DEPTH: u8 = 3;

/// Errors raised by tile arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    /// The requested zoom level exceeds [`MAX_ZOOM`].
    #[error("zoom level {zoom} exceeds the supported maximum {max}", max = MAX_ZOOM)]
    ZoomOutOfRange {
        /// Rejected zoom level.
        zoom: u8,
    },
}

/// Address of a single tile at a given zoom level.
///
/// Ordering is zoom-major, then `x`, then `y`, which matches the order in
/// which [`tiles_covering`] enumerates a bounding box.
///
/// # Examples
/// ```
/// use tiler_core::TileCoord;
///
/// let tile = TileCoord::containing(-105.0, 40.5, 15)?;
/// assert_eq!((tile.x, tile.y), (6826, 12345));
/// assert_eq!(tile.to_string(), "15/6826/12345");
/// # Ok::<(), tiler_core::TileError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileCoord {
    /// Zoom level.
    pub zoom: u8,
    /// Column, counted eastward.
    pub x: u32,
    /// Row, counted southward.
    pub y: u32,
}

impl TileCoord {
    /// Construct a tile address without validation.
    #[must_use]
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Return the tile containing the given WGS84 position.
    ///
    /// Longitudes are clamped to `[-180, 180]` and latitudes to the Mercator
    /// limit, so positions on the eastern or southern world edge resolve to
    /// the last row or column instead of overflowing.
    pub fn containing(lon: f64, lat: f64, zoom: u8) -> Result<Self, TileError> {
        let count = tiles_per_axis(zoom)?;
        let size = f64::from(count);
        let last = count.saturating_sub(1);

        let lon = lon.clamp(-180.0, 180.0);
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

        let x = ((lon + 180.0) / 360.0 * size).floor();
        let rad = lat.to_radians();
        let y = ((1.0 - (rad.tan() + 1.0 / rad.cos()).ln() / PI) / 2.0 * size).floor();

        Ok(Self {
            zoom,
            x: to_index(x).min(last),
            y: to_index(y).min(last),
        })
    }

    /// Return the ancestor `levels` zoom steps above this tile.
    ///
    /// Returns `None` when the ancestor would sit above zoom zero.
    #[must_use]
    pub fn parent(&self, levels: u8) -> Option<Self> {
        let zoom = self.zoom.checked_sub(levels)?;
        Some(Self {
            zoom,
            x: self.x >> levels,
            y: self.y >> levels,
        })
    }

    /// Geographic extent covered by this tile.
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        let size = 2f64.powi(i32::from(self.zoom));
        let lon_at = |x: f64| x / size * 360.0 - 180.0;
        let lat_at = |y: f64| (PI * (1.0 - 2.0 * y / size)).sinh().atan().to_degrees();
        let west = f64::from(self.x);
        let north = f64::from(self.y);
        BoundingBox::new(
            lon_at(west),
            lon_at(west + 1.0),
            lat_at(north + 1.0),
            lat_at(north),
        )
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Tiles belonging to one derived pyramid level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLevel {
    /// Zoom level shared by every tile in the set.
    pub zoom: u8,
    /// Deduplicated tiles in ascending order.
    pub tiles: Vec<TileCoord>,
}

/// Enumerate the tiles covering `bbox` at `zoom`.
///
/// The range is inclusive on all four corners of the box. Tiles are yielded
/// column by column (`x` outer, `y` inner), so repeated calls produce the
/// same list in the same order.
///
/// # Examples
/// ```
/// use tiler_core::{BoundingBox, tiles_covering};
///
/// let bbox = BoundingBox::new(-105.0, -104.99, 40.49, 40.5);
/// let tiles = tiles_covering(&bbox, 15)?;
/// assert_eq!(tiles.len(), 4);
/// # Ok::<(), tiler_core::TileError>(())
/// ```
pub fn tiles_covering(bbox: &BoundingBox, zoom: u8) -> Result<Vec<TileCoord>, TileError> {
    let upper_left = TileCoord::containing(bbox.min_lon, bbox.max_lat, zoom)?;
    let lower_right = TileCoord::containing(bbox.max_lon, bbox.min_lat, zoom)?;

    Ok((upper_left.x..=lower_right.x)
        .flat_map(|x| (upper_left.y..=lower_right.y).map(move |y| TileCoord::new(zoom, x, y)))
        .collect())
}

/// Derive the [`PYRAMID_DEPTH`] coarser levels above the given tiles.
///
/// Each level `k` maps every tile to `(zoom - k, x >> k, y >> k)` and keeps a
/// single copy of tiles that collapse onto the same ancestor. Levels are
/// returned nearest first; levels that would fall above zoom zero are
/// omitted.
///
/// # Examples
/// ```
/// use tiler_core::{TileCoord, make_levels};
///
/// let base = [TileCoord::new(16, 10, 20), TileCoord::new(16, 11, 21)];
/// let levels = make_levels(&base);
/// assert_eq!(levels[0].zoom, 15);
/// assert_eq!(levels[0].tiles, vec![TileCoord::new(15, 5, 10)]);
/// ```
#[must_use]
pub fn make_levels(tiles: &[TileCoord]) -> Vec<TileLevel> {
    let mut levels: BTreeMap<u8, BTreeSet<TileCoord>> = BTreeMap::new();
    for depth in 1..=PYRAMID_DEPTH {
        for parent in tiles.iter().filter_map(|tile| tile.parent(depth)) {
            levels.entry(parent.zoom).or_default().insert(parent);
        }
    }
    levels
        .into_iter()
        .rev()
        .map(|(zoom, tiles)| TileLevel {
            zoom,
            tiles: tiles.into_iter().collect(),
        })
        .collect()
}

fn tiles_per_axis(zoom: u8) -> Result<u32, TileError> {
    if zoom > MAX_ZOOM {
        return Err(TileError::ZoomOutOfRange { zoom });
    }
    Ok(1_u32 << zoom)
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is floored and clamped to the tile grid before conversion"
)]
fn to_index(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value as u32
    }
}
