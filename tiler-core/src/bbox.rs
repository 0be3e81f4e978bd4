//! Axis-aligned WGS84 bounding boxes.

use geo::{Coord, Rect};

/// An axis-aligned bounding box in WGS84 degrees.
///
/// Fields follow the polygon-file convention of reporting longitudes first:
/// `(min_lon, max_lon, min_lat, max_lat)`.
///
/// # Examples
/// ```
/// use tiler_core::BoundingBox;
///
/// let bbox = BoundingBox::new(-105.0, -104.0, 40.0, 40.5);
/// assert_eq!(bbox.xapi(), "40,-105,40.5,-104");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Construct a bounding box, normalising swapped edges.
    #[must_use]
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lon: min_lon.min(max_lon),
            max_lon: min_lon.max(max_lon),
            min_lat: min_lat.min(max_lat),
            max_lat: min_lat.max(max_lat),
        }
    }

    /// Bounding box as an Overpass/XAPI box: `south,west,north,east`.
    #[must_use]
    pub fn xapi(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }

    /// Return true when the point lies inside or on the edge of the box.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    /// Corner coordinates in ring order, starting north-west.
    #[must_use]
    pub fn corners(&self) -> [Coord<f64>; 4] {
        [
            Coord {
                x: self.min_lon,
                y: self.max_lat,
            },
            Coord {
                x: self.max_lon,
                y: self.max_lat,
            },
            Coord {
                x: self.max_lon,
                y: self.min_lat,
            },
            Coord {
                x: self.min_lon,
                y: self.min_lat,
            },
        ]
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.max().x, rect.min().y, rect.max().y)
    }
}

impl From<BoundingBox> for Rect<f64> {
    fn from(bbox: BoundingBox) -> Self {
        Self::new(
            Coord {
                x: bbox.min_lon,
                y: bbox.min_lat,
            },
            Coord {
                x: bbox.max_lon,
                y: bbox.max_lat,
            },
        )
    }
}
