//! One tiler run: region, OSM pull, tiles, manifests, catalog and overlays.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use log::{info, warn};
use tiler_core::{OutputFormat, Region, TileSource, make_levels, tiles_covering};
use tiler_data::{
    CATALOG_FILE, ChangesetApplier, DownloadReport, OverpassError, OverpassSource, PullOutcome,
    PullRequest, TileCache, TileTransport, manifest_path, pull_osm_data, write_cache, write_db,
};
use tiler_osm::TagMapper;

use crate::outputs::{BoundaryStats, Coverage, write_boundary, write_kml};
use crate::{CliError, TilerConfig};

/// Work done for one source at one zoom.
#[derive(Debug)]
pub(crate) struct SourceRun {
    pub(crate) source: TileSource,
    pub(crate) zoom: u8,
    pub(crate) tiles: usize,
    pub(crate) manifest: Utf8PathBuf,
    pub(crate) levels: Vec<Utf8PathBuf>,
    pub(crate) report: DownloadReport,
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub(crate) struct RunSummary {
    pub(crate) boundary: Option<BoundaryStats>,
    pub(crate) pull: Option<PullOutcome>,
    pub(crate) sources: Vec<SourceRun>,
    pub(crate) kml: Option<Utf8PathBuf>,
}

impl RunSummary {
    pub(crate) fn failed_tiles(&self) -> usize {
        self.sources.iter().map(|run| run.report.failed.len()).sum()
    }
}

/// Execute a run against the given network seams.
pub(crate) async fn execute<T, O>(
    config: &TilerConfig,
    transport: &T,
    overpass: &O,
    now: DateTime<Utc>,
) -> Result<RunSummary, CliError>
where
    T: TileTransport + ?Sized,
    O: OverpassSource + ?Sized,
{
    let region = Region::read(config.poly.as_std_path()).map_err(|source| CliError::Region {
        path: config.poly.clone(),
        source,
    })?;
    let bbox = region.bbox();
    let stem = config.region_stem();
    info!("region {:?} covers {}", region.name(), bbox.xapi());
    tiler_fs::ensure_dir(&config.outdir).map_err(|source| CliError::OutputDirectory {
        path: config.outdir.clone(),
        source,
    })?;

    let mut summary = RunSummary::default();
    let boundary_path = config.outdir.join(format!("{stem}-boundary.osm"));
    let mut mapper = TagMapper::builtin();
    if let Some(rules) = &config.tag_rules {
        mapper.extend_from_path(rules.as_std_path())?;
    }
    summary.boundary = Some(
        write_boundary(&boundary_path, &region, config.osm_writer_config(), mapper).map_err(
            |source| CliError::Boundary {
                path: boundary_path.clone(),
                source,
            },
        )?,
    );

    if config.nodata {
        info!("skipping OSM data");
    } else {
        info!("downloading OSM data, which could take a while");
        let applier = ChangesetApplier::new(config.osmconvert.clone());
        let request = PullRequest {
            outdir: &config.outdir,
            region: stem,
            bbox,
            now,
        };
        match pull_osm_data(overpass, &applier, &request).await {
            Ok(outcome) => summary.pull = Some(outcome),
            Err(OverpassError::Transport(err)) => warn!("skipping OSM data: {err}"),
            Err(err) => return Err(err.into()),
        }
    }

    if !config.download {
        info!("not downloading anything");
        return Ok(summary);
    }

    let catalog = config.outdir.join(CATALOG_FILE);
    let pyramid = config.formats.contains(&OutputFormat::Osmand);
    let mut coverage = Vec::new();
    for &source in &config.sources {
        let cache = TileCache::new(config.outdir.clone(), source);
        for zoom in config.zooms_for(source) {
            let tiles = tiles_covering(&bbox, zoom)?;
            info!("{source} at zoom {zoom}: {} tiles", tiles.len());
            let report = cache
                .download(transport, source.mirrors(), &tiles, config.retry)
                .await?;
            let manifest = manifest_path(&config.outdir, stem, source, zoom);
            write_cache(&tiles, &manifest)?;
            write_db(&tiles, &catalog, region.name(), source, config.catalog_mode)?;

            let mut levels = Vec::new();
            if pyramid {
                for level in make_levels(&tiles) {
                    let path = manifest_path(&config.outdir, stem, source, level.zoom);
                    write_cache(&level.tiles, &path)?;
                    levels.push(path);
                }
            }
            coverage.push(Coverage::of(source, zoom, &tiles));
            summary.sources.push(SourceRun {
                source,
                zoom,
                tiles: tiles.len(),
                manifest,
                levels,
                report,
            });
        }
    }

    for format in &config.formats {
        if matches!(format, OutputFormat::Gtiff | OutputFormat::Pdf) {
            warn!("{format} output is not supported; skipping");
        }
    }
    if config.mosaic {
        warn!("mosaic output is not supported; skipping");
    }

    let kml = config.outdir.join(format!("{stem}.kml"));
    write_kml(&kml, &region, &coverage).map_err(|source| CliError::Kml {
        path: kml.clone(),
        source,
    })?;
    summary.kml = Some(kml);

    let failed = summary.failed_tiles();
    if failed > 0 {
        warn!("{failed} tiles could not be downloaded");
    }
    Ok(summary)
}

/// Pull outcome as a log line.
pub(crate) fn describe_pull(outcome: &PullOutcome) -> String {
    match outcome {
        PullOutcome::Created { path, bytes } => format!("wrote {bytes} bytes of OSM data to {path}"),
        PullOutcome::Updated { path, changes } => format!("applied {changes} to {path}"),
        PullOutcome::Unchanged { path } => format!("no changes found for {path}"),
    }
}
