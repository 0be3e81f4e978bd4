//! Raster tile sources and output formats understood by the tiler.
//!
//! # Examples
//! ```
//! use tiler_core::TileSource;
//!
//! let source: TileSource = "topo".parse()?;
//! assert_eq!(source.mirrors().len(), 3);
//! assert_eq!(source.default_zoom(), 15);
//! # Ok::<(), tiler_core::UnknownName>(())
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A name that does not correspond to any known source or format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported {kind} {name:?}")]
pub struct UnknownName {
    /// What was being parsed (`"source"` or `"format"`).
    pub kind: &'static str,
    /// The rejected value.
    pub name: String,
}

/// Remote raster tile providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TileSource {
    /// Esri World Imagery satellite tiles.
    Ersi,
    /// OpenTopoMap topographic tiles.
    Topo,
    /// USGS National Map topographic tiles.
    Usgs,
    /// CalTopo terrain tiles.
    Terrain,
}

impl TileSource {
    /// Every supported source, in processing order.
    pub const ALL: [Self; 4] = [Self::Usgs, Self::Topo, Self::Ersi, Self::Terrain];

    /// Lowercase identifier used on the command line and in the catalog.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ersi => "ersi",
            Self::Topo => "topo",
            Self::Usgs => "usgs",
            Self::Terrain => "terrain",
        }
    }

    /// Directory name holding this source's tiles beneath the output root.
    #[must_use]
    pub const fn directory(&self) -> &'static str {
        match self {
            Self::Ersi => "ERSI",
            Self::Topo => "Topo",
            Self::Usgs => "USGS",
            Self::Terrain => "Terrain",
        }
    }

    /// Label embedded in manifest file names.
    #[must_use]
    pub const fn manifest_label(&self) -> &'static str {
        match self {
            Self::Ersi => "Sat",
            Self::Topo => "Topo",
            Self::Usgs => "USGS",
            Self::Terrain => "Terrain",
        }
    }

    /// Zoom level used when none is requested explicitly.
    #[must_use]
    pub const fn default_zoom(&self) -> u8 {
        match self {
            Self::Topo | Self::Usgs => 15,
            Self::Ersi | Self::Terrain => 16,
        }
    }

    /// File extension for cached tiles.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Ersi | Self::Usgs => "jpg",
            Self::Topo | Self::Terrain => "png",
        }
    }

    /// URL templates tried in order; `{z}`, `{x}` and `{y}` are substituted.
    #[must_use]
    pub const fn mirrors(&self) -> &'static [&'static str] {
        match self {
            Self::Ersi => &[
                "http://clarity.maptiles.arcgis.com/arcgis/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            ],
            Self::Topo => &[
                "https://a.tile.opentopomap.org/{z}/{x}/{y}.png",
                "https://b.tile.opentopomap.org/{z}/{x}/{y}.png",
                "https://c.tile.opentopomap.org/{z}/{x}/{y}.png",
            ],
            Self::Usgs => &[
                "https://basemap.nationalmap.gov/ArcGIS/rest/services/USGSTopo/MapServer/tile/{z}/{y}/{x}",
            ],
            Self::Terrain => &["http://caltopo.s3.amazonaws.com/topo/{z}/{x}/{y}.png"],
        }
    }
}

impl fmt::Display for TileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TileSource {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ersi" => Ok(Self::Ersi),
            "topo" => Ok(Self::Topo),
            "usgs" => Ok(Self::Usgs),
            "terrain" => Ok(Self::Terrain),
            _ => Err(UnknownName {
                kind: "source",
                name: s.to_owned(),
            }),
        }
    }
}

/// Requested output products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OutputFormat {
    /// Georeferenced TIFF mosaic.
    Gtiff,
    /// Georeferenced PDF mosaic.
    Pdf,
    /// OsmAnd-style multi-resolution tile pyramid.
    Osmand,
}

impl OutputFormat {
    /// Lowercase identifier used on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gtiff => "gtiff",
            Self::Pdf => "pdf",
            Self::Osmand => "osmand",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gtiff" => Ok(Self::Gtiff),
            "pdf" => Ok(Self::Pdf),
            "osmand" => Ok(Self::Osmand),
            _ => Err(UnknownName {
                kind: "format",
                name: s.to_owned(),
            }),
        }
    }
}

/// Parse a comma-separated list, rejecting the first unknown entry.
///
/// Blank entries are ignored and duplicates collapse to one, preserving the
/// order of first appearance.
///
/// # Examples
/// ```
/// use tiler_core::{TileSource, parse_list};
///
/// let sources: Vec<TileSource> = parse_list("topo, usgs,topo")?;
/// assert_eq!(sources, vec![TileSource::Topo, TileSource::Usgs]);
/// # Ok::<(), tiler_core::UnknownName>(())
/// ```
pub fn parse_list<T>(list: &str) -> Result<Vec<T>, UnknownName>
where
    T: FromStr<Err = UnknownName> + PartialEq,
{
    let mut parsed = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let value = entry.parse::<T>()?;
        if !parsed.contains(&value) {
            parsed.push(value);
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ersi", TileSource::Ersi)]
    #[case("TOPO", TileSource::Topo)]
    #[case(" usgs ", TileSource::Usgs)]
    #[case("terrain", TileSource::Terrain)]
    fn parses_sources(#[case] text: &str, #[case] expected: TileSource) {
        assert_eq!(text.parse::<TileSource>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_source() {
        let err = "google".parse::<TileSource>().expect_err("unknown source");
        assert_eq!(err.kind, "source");
        assert_eq!(err.to_string(), "unsupported source \"google\"");
    }

    #[rstest]
    fn every_mirror_has_placeholders() {
        for source in TileSource::ALL {
            for template in source.mirrors() {
                for placeholder in ["{z}", "{x}", "{y}"] {
                    assert!(
                        template.contains(placeholder),
                        "{source} mirror {template} lacks {placeholder}"
                    );
                }
            }
        }
    }

    #[rstest]
    fn parses_format_list() {
        let formats: Vec<OutputFormat> = parse_list("gtiff,osmand").expect("valid formats");
        assert_eq!(formats, vec![OutputFormat::Gtiff, OutputFormat::Osmand]);
        let err = parse_list::<OutputFormat>("gtiff,aqm").expect_err("unknown format");
        assert_eq!(err.name, "aqm");
    }
}
