//! Shared catalog of `region,source,zoom,x,y` rows.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, BufWriter, Write};

use camino::Utf8Path;
use log::{debug, info};
use tiler_core::{TileCoord, TileSource};

use super::CatalogError;

/// File name of the catalog beneath the output directory.
pub const CATALOG_FILE: &str = "tiledb";

/// Whether repeated rows are written again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogMode {
    /// Append every row, even when the catalog already holds it.
    #[default]
    Append,
    /// Skip rows already present in the catalog or earlier in the batch.
    Deduplicate,
}

/// Rows written and skipped by one [`write_db`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    /// Rows appended.
    pub written: usize,
    /// Rows skipped as duplicates.
    pub duplicates: usize,
}

/// Format one catalog row.
///
/// Commas and line breaks in the region name become spaces so every row
/// keeps exactly five fields.
#[must_use]
pub fn catalog_row(region: &str, source: TileSource, tile: TileCoord) -> String {
    let region = region.replace([',', '\n', '\r'], " ");
    format!("{region},{source},{},{},{}", tile.zoom, tile.x, tile.y)
}

/// Append `tiles` to the catalog at `path`, tagged with region and source.
///
/// # Errors
/// Returns [`CatalogError`] when existing rows cannot be read or new rows
/// cannot be appended.
pub fn write_db(
    tiles: &[TileCoord],
    path: &Utf8Path,
    region: &str,
    source: TileSource,
    mode: CatalogMode,
) -> Result<CatalogSummary, CatalogError> {
    let mut seen = match mode {
        CatalogMode::Append => HashSet::new(),
        CatalogMode::Deduplicate => existing_rows(path)?,
    };
    let wrap = |source| CatalogError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = tiler_fs::append_file(path).map_err(wrap)?;
    let mut out = BufWriter::new(file);
    let mut summary = CatalogSummary::default();
    for &tile in tiles {
        let row = catalog_row(region, source, tile);
        if mode == CatalogMode::Deduplicate && !seen.insert(row.clone()) {
            summary.duplicates += 1;
            continue;
        }
        writeln!(out, "{row}").map_err(wrap)?;
        summary.written += 1;
    }
    out.flush().map_err(wrap)?;
    if summary.duplicates > 0 {
        debug!("{path}: skipped {} duplicate rows", summary.duplicates);
    }
    info!("{path}: appended {} rows for {region}/{source}", summary.written);
    Ok(summary)
}

fn existing_rows(path: &Utf8Path) -> Result<HashSet<String>, CatalogError> {
    if !tiler_fs::file_exists(path) {
        return Ok(HashSet::new());
    }
    let wrap = |source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = tiler_fs::open_utf8_file(path).map_err(wrap)?;
    BufReader::new(file)
        .lines()
        .map(|line| line.map(|text| text.trim().to_owned()).map_err(wrap))
        .filter(|line| !matches!(line, Ok(text) if text.is_empty()))
        .collect()
}
