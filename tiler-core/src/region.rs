//! Region boundaries read from Osmosis polygon (`.poly`) files.
//!
//! The format is line-oriented: a region name, then one or more sections,
//! each opened by a section name (prefixed with `!` for holes), followed by
//! whitespace-separated `lon lat` pairs and closed by `END`. A final `END`
//! terminates the file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use geo::{BoundingRect, Coord, LineString, MultiPoint, Point};
use thiserror::Error;

use crate::BoundingBox;

const END_MARKER: &str = "END";
const HOLE_PREFIX: char = '!';

/// Errors raised while reading a polygon file.
#[derive(Debug, Error)]
pub enum RegionError {
    /// The polygon file could not be opened.
    #[error("failed to open polygon file {path:?}: {source}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Reading from the polygon source failed.
    #[error("failed to read polygon data: {0}")]
    Read(#[from] io::Error),
    /// The header line carrying the region name was missing or blank.
    #[error("polygon file is missing its region name")]
    MissingName,
    /// A vertex line did not hold two numeric values.
    #[error("line {line}: expected `lon lat`, found {text:?}")]
    InvalidVertex {
        /// One-based line number.
        line: usize,
        /// Offending line content.
        text: String,
    },
    /// A section was still open when the input ended.
    #[error("section {section:?} is not terminated by END")]
    UnterminatedSection {
        /// Name of the unterminated section.
        section: String,
    },
    /// No vertices were found.
    #[error("polygon file contains no vertices")]
    Empty,
}

/// One closed ring of a region boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    /// Section name from the polygon file.
    pub name: String,
    /// True for `!`-prefixed sections that cut holes in the region.
    pub hole: bool,
    /// Ring vertices as `x = longitude`, `y = latitude`.
    pub vertices: LineString<f64>,
}

/// A named region parsed from a polygon file.
///
/// # Examples
/// ```
/// use tiler_core::Region;
///
/// let text = "boulder\n1\n  -105.0  40.0\n  -104.0  40.5\nEND\nEND\n";
/// let region = Region::parse(text.as_bytes())?;
/// assert_eq!(region.name(), "boulder");
/// assert_eq!(region.bbox().max_lat, 40.5);
/// # Ok::<(), tiler_core::RegionError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    name: String,
    rings: Vec<Ring>,
    bbox: BoundingBox,
}

impl Region {
    /// Read and parse the polygon file at `path`.
    pub fn read(path: &Path) -> Result<Self, RegionError> {
        let file = File::open(path).map_err(|source| RegionError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(BufReader::new(file))
    }

    /// Parse polygon data from any buffered reader.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, RegionError> {
        let mut lines = reader.lines().enumerate();
        let name = match lines.next() {
            Some((_, line)) => line?.trim().to_owned(),
            None => String::new(),
        };
        if name.is_empty() {
            return Err(RegionError::MissingName);
        }

        let mut rings = Vec::new();
        let mut current: Option<(String, Vec<Coord<f64>>)> = None;
        for (index, line) in lines {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match current.take() {
                None if trimmed == END_MARKER => break,
                None => current = Some((trimmed.to_owned(), Vec::new())),
                Some((section, points)) if trimmed == END_MARKER => {
                    rings.push(Ring::new(section, points));
                }
                Some((section, mut points)) => {
                    points.push(parse_vertex(trimmed, index + 1)?);
                    current = Some((section, points));
                }
            }
        }
        if let Some((section, _)) = current {
            return Err(RegionError::UnterminatedSection { section });
        }

        let bbox = bounding_box(&rings).ok_or(RegionError::Empty)?;
        Ok(Self { name, rings, bbox })
    }

    /// Display name taken from the polygon file's header line.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Axis-aligned box covering every vertex of every ring.
    #[must_use]
    pub const fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// All rings in file order.
    #[must_use]
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Rings that form the outer boundary (not holes).
    pub fn outer_rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter().filter(|ring| !ring.hole)
    }
}

impl Ring {
    fn new(section: String, points: Vec<Coord<f64>>) -> Self {
        let (name, hole) = match section.strip_prefix(HOLE_PREFIX) {
            Some(stripped) => (stripped.to_owned(), true),
            None => (section, false),
        };
        Self {
            name,
            hole,
            vertices: LineString::from(points),
        }
    }
}

fn parse_vertex(text: &str, line: usize) -> Result<Coord<f64>, RegionError> {
    let invalid = || RegionError::InvalidVertex {
        line,
        text: text.to_owned(),
    };
    let mut fields = text.split_whitespace();
    let lon = fields.next().and_then(|value| value.parse::<f64>().ok());
    let lat = fields.next().and_then(|value| value.parse::<f64>().ok());
    match (lon, lat, fields.next()) {
        (Some(x), Some(y), None) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
        _ => Err(invalid()),
    }
}

fn bounding_box(rings: &[Ring]) -> Option<BoundingBox> {
    let points: MultiPoint<f64> = rings
        .iter()
        .flat_map(|ring| ring.vertices.coords().copied().map(Point::from))
        .collect();
    points.bounding_rect().map(BoundingBox::from)
}
