//! Error types emitted by the tiler CLI.
//!
//! Every variant belongs to one failure category, and [`CliError::exit_code`]
//! maps categories to distinct process exit codes.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use tiler_core::{RegionError, TileError, UnknownName};
use tiler_data::{
    CatalogError, ChangesetError, OverpassError, TileCacheError, TransportError,
};
use tiler_osm::{OsmWriteError, RulesError};

/// Exit code for usage and validation failures.
pub const EXIT_USAGE: i32 = 2;
/// Exit code for filesystem failures.
pub const EXIT_IO: i32 = 3;
/// Exit code for network failures.
pub const EXIT_NETWORK: i32 = 4;
/// Exit code for external tool failures.
pub const EXIT_TOOL: i32 = 5;
/// Exit code for anything else.
pub const EXIT_OTHER: i32 = 1;

/// Errors emitted by the tiler CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A source or format name was not recognised.
    #[error(transparent)]
    UnknownName(#[from] UnknownName),
    /// A zoom entry is not a number.
    #[error("invalid zoom level {value:?}")]
    InvalidZoom {
        /// Offending entry.
        value: String,
    },
    /// A zoom level lies outside the accepted range.
    #[error("zoom level {zoom} is outside {min}..={max}")]
    ZoomOutOfRange {
        /// Rejected zoom.
        zoom: u8,
        /// Lowest accepted zoom.
        min: u8,
        /// Highest accepted zoom.
        max: u8,
    },
    /// The polygon file could not be read or parsed.
    #[error("failed to load region from {path:?}: {source}")]
    Region {
        /// Polygon file path.
        path: Utf8PathBuf,
        /// Parser error.
        #[source]
        source: RegionError,
    },
    /// Tile arithmetic failed.
    #[error(transparent)]
    Tiles(#[from] TileError),
    /// The tag rule file could not be loaded.
    #[error(transparent)]
    Rules(#[from] RulesError),
    /// The output directory could not be prepared.
    #[error("failed to prepare output directory {path:?}: {source}")]
    OutputDirectory {
        /// Output directory.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Building the HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] TransportError),
    /// Building the async runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Storing tiles or manifests failed.
    #[error(transparent)]
    TileCache(#[from] TileCacheError),
    /// Appending to the catalog failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Pulling OSM data failed.
    #[error(transparent)]
    Overpass(#[from] OverpassError),
    /// Writing the boundary OSM file failed.
    #[error("failed to write boundary {path:?}: {source}")]
    Boundary {
        /// Output path.
        path: Utf8PathBuf,
        /// Writer error.
        #[source]
        source: OsmWriteError,
    },
    /// Writing the KML overlay failed.
    #[error("failed to write KML {path:?}: {source}")]
    Kml {
        /// Output path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// Process exit code for this error's category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ArgumentParsing(_)
            | Self::Configuration(_)
            | Self::MissingArgument { .. }
            | Self::MissingSourceFile { .. }
            | Self::SourcePathNotFile { .. }
            | Self::UnknownName(_)
            | Self::InvalidZoom { .. }
            | Self::ZoomOutOfRange { .. }
            | Self::Tiles(_)
            | Self::HttpClient(TransportError::InvalidUrl { .. }) => EXIT_USAGE,
            Self::Region { source, .. } => match source {
                RegionError::Open { .. } | RegionError::Read(_) => EXIT_IO,
                _ => EXIT_USAGE,
            },
            Self::Rules(RulesError::Parse { .. }) => EXIT_USAGE,
            Self::Rules(_)
            | Self::OutputDirectory { .. }
            | Self::TileCache(_)
            | Self::Catalog(_)
            | Self::Boundary { .. }
            | Self::Kml { .. } => EXIT_IO,
            Self::Overpass(err) => match err {
                OverpassError::Transport(_) => EXIT_NETWORK,
                OverpassError::Changeset(
                    ChangesetError::Spawn { .. } | ChangesetError::Failed { .. },
                ) => EXIT_TOOL,
                _ => EXIT_IO,
            },
            Self::HttpClient(_) => EXIT_NETWORK,
            Self::Runtime(_) => EXIT_OTHER,
        }
    }
}
