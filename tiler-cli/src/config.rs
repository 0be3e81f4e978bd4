//! Command-line arguments and their layered, validated configuration.

use std::path::PathBuf;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tiler_core::{OutputFormat, TileSource, parse_list};
use tiler_data::{
    CatalogMode, DEFAULT_ATTEMPTS, DEFAULT_OSMCONVERT, DEFAULT_OVERPASS_URL, DEFAULT_RETRY_DELAY,
    DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, RetryPolicy,
};
use tiler_osm::OsmWriterConfig;

use crate::CliError;

pub(crate) const ARG_OUTFILE: &str = "outfile";
pub(crate) const ARG_SOURCE: &str = "source";
pub(crate) const ARG_POLY: &str = "poly";
pub(crate) const ARG_FORMAT: &str = "format";
pub(crate) const ARG_ZOOMS: &str = "zooms";
pub(crate) const ARG_TAG_RULES: &str = "tag-rules";
pub(crate) const ENV_POLY: &str = "TILER_POLY";

/// Lowest zoom accepted by `--zooms`.
pub const MIN_REQUEST_ZOOM: u8 = 14;
/// Highest zoom accepted by `--zooms`.
pub const MAX_REQUEST_ZOOM: u8 = 18;

const DEFAULT_SOURCES: &str = "ersi,topo,usgs,terrain";
const DEFAULT_FORMATS: &str = "gtiff";
const DEFAULT_OUTDIR: &str = ".";

/// Arguments accepted by the `tiler` binary.
///
/// Every field can also come from a configuration file or a `TILER_*`
/// environment variable; command-line values win.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "tiler",
    about = "Download map tiles and OSM data for a polygon region",
    long_about = "Read a region boundary from a polygon file, pull its OSM data \
                  from Overpass, and download, index and outline the raster \
                  tiles covering it.",
    version
)]
#[ortho_config(prefix = "TILER")]
pub struct TilerArgs {
    /// Output directory for tiles, manifests and OSM data.
    #[arg(short = 'o', long = ARG_OUTFILE, value_name = "dir")]
    #[serde(default)]
    pub(crate) outfile: Option<Utf8PathBuf>,
    /// Comma-separated tile sources: ersi, topo, usgs, terrain.
    #[arg(short = 's', long = ARG_SOURCE, value_name = "list")]
    #[serde(default)]
    pub(crate) source: Option<String>,
    /// Polygon file describing the region.
    #[arg(short = 'p', long = ARG_POLY, value_name = "path")]
    #[serde(default)]
    pub(crate) poly: Option<Utf8PathBuf>,
    /// Comma-separated output formats: gtiff, pdf, osmand.
    #[arg(short = 'f', long = ARG_FORMAT, value_name = "list")]
    #[serde(default)]
    pub(crate) format: Option<String>,
    /// Comma-separated zoom levels between 14 and 18.
    #[arg(short = 'z', long = ARG_ZOOMS, value_name = "list")]
    #[serde(default)]
    pub(crate) zooms: Option<String>,
    /// Download map tiles.
    #[arg(short = 'd', long)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) download: bool,
    /// Build a mosaic from downloaded tiles.
    #[arg(short = 'm', long)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) mosaic: bool,
    /// Skip pulling OSM data.
    #[arg(short = 'n', long)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) nodata: bool,
    /// Log at debug level.
    #[arg(short = 'v', long)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) verbose: bool,
    /// User name stamped on written OSM elements.
    #[arg(long, value_name = "name")]
    #[serde(default)]
    pub(crate) osm_user: Option<String>,
    /// User ID stamped on written OSM elements.
    #[arg(long, value_name = "id")]
    #[serde(default)]
    pub(crate) osm_uid: Option<u64>,
    /// Overpass interpreter endpoint.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_url: Option<String>,
    /// User agent sent with HTTP requests.
    #[arg(long, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Passes over a source's mirror list before a tile is given up on.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) retries: Option<u32>,
    /// Pause between mirror-list passes, in milliseconds.
    #[arg(long, value_name = "ms")]
    #[serde(default)]
    pub(crate) retry_delay_ms: Option<u64>,
    /// Per-request HTTP timeout, in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Path to the `osmconvert` program.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) osmconvert: Option<PathBuf>,
    /// Skip catalog rows that are already present.
    #[arg(long)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) dedupe_catalog: bool,
    /// JSON file with extra tag rules for the boundary output.
    #[arg(long = ARG_TAG_RULES, value_name = "path")]
    #[serde(default)]
    pub(crate) tag_rules: Option<Utf8PathBuf>,
}

impl TilerArgs {
    /// Merge configuration files and environment beneath these arguments and
    /// validate the result.
    ///
    /// # Errors
    /// Returns [`CliError`] when layering fails or a value is invalid.
    pub fn into_config(self) -> Result<TilerConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        let config = TilerConfig::try_from(merged)?;
        config.validate_sources()?;
        Ok(config)
    }
}

/// Resolved run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TilerConfig {
    pub(crate) outdir: Utf8PathBuf,
    pub(crate) sources: Vec<TileSource>,
    pub(crate) poly: Utf8PathBuf,
    pub(crate) formats: Vec<OutputFormat>,
    pub(crate) zooms: Option<Vec<u8>>,
    pub(crate) download: bool,
    pub(crate) mosaic: bool,
    pub(crate) nodata: bool,
    pub(crate) verbose: bool,
    pub(crate) osm_user: String,
    pub(crate) osm_uid: u64,
    pub(crate) overpass_url: String,
    pub(crate) user_agent: String,
    pub(crate) retry: RetryPolicy,
    pub(crate) timeout: Duration,
    pub(crate) osmconvert: PathBuf,
    pub(crate) catalog_mode: CatalogMode,
    pub(crate) tag_rules: Option<Utf8PathBuf>,
}

impl TilerConfig {
    /// Whether debug logging was requested.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Zoom levels to process for `source`.
    pub(crate) fn zooms_for(&self, source: TileSource) -> Vec<u8> {
        self.zooms
            .clone()
            .unwrap_or_else(|| vec![source.default_zoom()])
    }

    /// Region stem used for per-region file names.
    pub(crate) fn region_stem(&self) -> &str {
        self.poly
            .file_stem()
            .unwrap_or_else(|| self.poly.as_str())
    }

    /// Writer settings for OSM output.
    pub(crate) fn osm_writer_config(&self) -> OsmWriterConfig {
        OsmWriterConfig {
            user: self.osm_user.clone(),
            uid: self.osm_uid,
            ..OsmWriterConfig::default()
        }
    }

    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_file(&self.poly, ARG_POLY)?;
        if let Some(rules) = &self.tag_rules {
            require_file(rules, ARG_TAG_RULES)?;
        }
        Ok(())
    }
}

fn require_file(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match tiler_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(_) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
    }
}

impl TryFrom<TilerArgs> for TilerConfig {
    type Error = CliError;

    fn try_from(args: TilerArgs) -> Result<Self, Self::Error> {
        let poly = args.poly.ok_or(CliError::MissingArgument {
            field: ARG_POLY,
            env: ENV_POLY,
        })?;
        let sources = parse_list(args.source.as_deref().unwrap_or(DEFAULT_SOURCES))?;
        let formats = parse_list(args.format.as_deref().unwrap_or(DEFAULT_FORMATS))?;
        let zooms = args.zooms.as_deref().map(parse_zooms).transpose()?;
        let writer_defaults = OsmWriterConfig::default();
        let retry = RetryPolicy {
            attempts: args.retries.unwrap_or(DEFAULT_ATTEMPTS),
            delay: args
                .retry_delay_ms
                .map_or(DEFAULT_RETRY_DELAY, Duration::from_millis),
        };
        Ok(Self {
            outdir: args
                .outfile
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTDIR)),
            sources,
            poly,
            formats,
            zooms,
            download: args.download,
            mosaic: args.mosaic,
            nodata: args.nodata,
            verbose: args.verbose,
            osm_user: args.osm_user.unwrap_or(writer_defaults.user),
            osm_uid: args.osm_uid.unwrap_or(writer_defaults.uid),
            overpass_url: args
                .overpass_url
                .unwrap_or_else(|| DEFAULT_OVERPASS_URL.to_owned()),
            user_agent: args
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            retry,
            timeout: args
                .timeout_secs
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            osmconvert: args
                .osmconvert
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OSMCONVERT)),
            catalog_mode: if args.dedupe_catalog {
                CatalogMode::Deduplicate
            } else {
                CatalogMode::Append
            },
            tag_rules: args.tag_rules,
        })
    }
}

/// Parse a comma-separated zoom list, keeping first occurrences in order.
pub(crate) fn parse_zooms(list: &str) -> Result<Vec<u8>, CliError> {
    let mut zooms = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let zoom: u8 = entry.parse().map_err(|_| CliError::InvalidZoom {
            value: entry.to_owned(),
        })?;
        if !(MIN_REQUEST_ZOOM..=MAX_REQUEST_ZOOM).contains(&zoom) {
            return Err(CliError::ZoomOutOfRange {
                zoom,
                min: MIN_REQUEST_ZOOM,
                max: MAX_REQUEST_ZOOM,
            });
        }
        if !zooms.contains(&zoom) {
            zooms.push(zoom);
        }
    }
    if zooms.is_empty() {
        return Err(CliError::InvalidZoom {
            value: list.to_owned(),
        });
    }
    Ok(zooms)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<TilerConfig, CliError> {
    let merged = TilerArgs::merge_from_layers(layers).map_err(CliError::from)?;
    TilerConfig::try_from(merged)
}
