//! Command-line interface for the tiler.
//!
//! Reads a region from a polygon file, pulls its OSM data from Overpass and,
//! when asked, downloads the covering raster tiles and records them in
//! manifests and the shared catalog.
#![forbid(unsafe_code)]

mod config;
mod error;
mod outputs;
mod pipeline;

use chrono::Utc;
use clap::Parser;
use log::{debug, info};
use tiler_data::HttpTransport;

pub use config::{MAX_REQUEST_ZOOM, MIN_REQUEST_ZOOM, TilerArgs, TilerConfig};
pub use error::{CliError, EXIT_IO, EXIT_NETWORK, EXIT_OTHER, EXIT_TOOL, EXIT_USAGE};

/// Run the tiler with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when configuration is invalid or the run fails.
pub fn run() -> Result<(), CliError> {
    let args = TilerArgs::try_parse().map_err(CliError::ArgumentParsing)?;
    let config = args.into_config()?;
    init_logging(config.verbose());
    run_with_config(&config)
}

/// Run with an already resolved configuration over HTTP.
///
/// # Errors
/// Returns [`CliError`] when the run fails.
pub fn run_with_config(config: &TilerConfig) -> Result<(), CliError> {
    let transport = HttpTransport::new(config.timeout)
        .and_then(|transport| {
            transport
                .with_user_agent(config.user_agent.as_str())
                .with_overpass_url(&config.overpass_url)
        })
        .map_err(CliError::HttpClient)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let summary = runtime.block_on(pipeline::execute(config, &transport, &transport, Utc::now()))?;
    if let Some(stats) = &summary.boundary {
        debug!(
            "boundary written as {} nodes, {} ways, {} relations",
            stats.nodes, stats.ways, stats.relations
        );
    }
    if let Some(outcome) = &summary.pull {
        info!("{}", pipeline::describe_pull(outcome));
    }
    for run in &summary.sources {
        info!(
            "{} zoom {}: {} tiles ({} fetched, {} present, {} failed), manifest {}",
            run.source,
            run.zoom,
            run.tiles,
            run.report.fetched.len(),
            run.report.skipped.len(),
            run.report.failed.len(),
            run.manifest
        );
        for level in &run.levels {
            debug!("derived manifest {level}");
        }
    }
    if let Some(kml) = &summary.kml {
        info!("coverage overlay written to {kml}");
    }
    Ok(())
}

/// Install the process logger; `verbose` lowers the default filter to debug.
///
/// `RUST_LOG` still takes precedence.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let installed = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .try_init();
    if installed.is_err() {
        debug!("logger already installed");
    }
}

#[cfg(test)]
mod tests;
