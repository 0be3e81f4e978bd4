//! Flat text manifests listing one `zoom x y` tile per line.

use std::io::{BufRead, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use tiler_core::{TileCoord, TileSource};

use super::TileCacheError;

/// Manifest location for one region, source and zoom.
///
/// # Examples
/// ```
/// use camino::Utf8Path;
/// use tiler_core::TileSource;
/// use tiler_data::manifest_path;
///
/// let path = manifest_path(Utf8Path::new("/tmp/out"), "boulder", TileSource::Ersi, 16);
/// assert_eq!(path, "/tmp/out/boulder-Sat16.txt");
/// ```
#[must_use]
pub fn manifest_path(outdir: &Utf8Path, region: &str, source: TileSource, zoom: u8) -> Utf8PathBuf {
    outdir.join(format!("{region}-{}{zoom}.txt", source.manifest_label()))
}

/// Write `tiles` to `path`, replacing any previous manifest.
///
/// # Errors
/// Returns [`TileCacheError::WriteManifest`] on I/O failure.
pub fn write_cache(tiles: &[TileCoord], path: &Utf8Path) -> Result<(), TileCacheError> {
    let wrap = |source| TileCacheError::WriteManifest {
        path: path.to_path_buf(),
        source,
    };
    let file = tiler_fs::create_file(path).map_err(wrap)?;
    let mut out = BufWriter::new(file);
    for tile in tiles {
        writeln!(out, "{} {} {}", tile.zoom, tile.x, tile.y).map_err(wrap)?;
    }
    out.flush().map_err(wrap)?;
    info!("wrote {} tiles to {path}", tiles.len());
    Ok(())
}

/// Read a manifest written by [`write_cache`] in the order it was written.
///
/// Blank lines are ignored.
///
/// # Errors
/// Returns [`TileCacheError::ReadManifest`] on I/O failure and
/// [`TileCacheError::ParseManifest`] for a malformed line.
pub fn read_manifest(path: &Utf8Path) -> Result<Vec<TileCoord>, TileCacheError> {
    let wrap = |source| TileCacheError::ReadManifest {
        path: path.to_path_buf(),
        source,
    };
    let file = tiler_fs::open_utf8_file(path).map_err(wrap)?;
    let mut tiles = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(wrap)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let tile = parse_line(trimmed).ok_or_else(|| TileCacheError::ParseManifest {
            path: path.to_path_buf(),
            line: index + 1,
            text: line.clone(),
        })?;
        tiles.push(tile);
    }
    Ok(tiles)
}

fn parse_line(line: &str) -> Option<TileCoord> {
    let mut fields = line.split_whitespace();
    let zoom = fields.next()?.parse().ok()?;
    let x = fields.next()?.parse().ok()?;
    let y = fields.next()?.parse().ok()?;
    fields
        .next()
        .is_none()
        .then_some(TileCoord::new(zoom, x, y))
}
