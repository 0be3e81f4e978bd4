//! Sequential tile downloads with bounded retry.

use std::time::Duration;

use log::{debug, info, warn};
use tiler_core::TileCoord;

use super::{TileCache, TileCacheError};
use crate::transport::{TileTransport, TransportError};

/// Number of passes over the mirror list before a tile is given up on.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Pause between passes over the mirror list.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How often and how patiently a tile is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Passes over the mirror list; at least one pass is always made.
    pub attempts: u32,
    /// Delay between passes.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Single pass without delay.
    #[must_use]
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Tile that could not be fetched from any mirror.
#[derive(Debug)]
pub struct TileFailure {
    /// Tile identity.
    pub tile: TileCoord,
    /// Last transport error seen, if any mirror was tried.
    pub last_error: Option<TransportError>,
}

/// Per-tile accounting for one [`TileCache::download`] call.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Tiles written during this call.
    pub fetched: Vec<TileCoord>,
    /// Tiles already present on disk.
    pub skipped: Vec<TileCoord>,
    /// Tiles no mirror could serve.
    pub failed: Vec<TileFailure>,
}

impl DownloadReport {
    /// Whether at least one tile was fetched.
    #[must_use]
    pub fn fetched_any(&self) -> bool {
        !self.fetched.is_empty()
    }
}

/// Substitute `{z}`, `{x}` and `{y}` in a mirror template.
///
/// # Examples
/// ```
/// use tiler_core::TileCoord;
/// use tiler_data::expand_template;
///
/// let url = expand_template("https://a.example/{z}/{x}/{y}.png", TileCoord::new(15, 6826, 12345));
/// assert_eq!(url, "https://a.example/15/6826/12345.png");
/// ```
#[must_use]
pub fn expand_template(template: &str, tile: TileCoord) -> String {
    template
        .replace("{z}", &tile.zoom.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
}

impl TileCache {
    /// Fetch every tile not already on disk.
    ///
    /// Mirrors are tried in order until one returns a non-empty body; the
    /// whole list is retried up to `policy.attempts` times. Tiles no mirror
    /// serves are recorded in the report and do not abort the run.
    ///
    /// # Errors
    /// Returns [`TileCacheError::WriteTile`] when a fetched tile cannot be
    /// stored.
    pub async fn download<T>(
        &self,
        transport: &T,
        mirrors: &[&str],
        tiles: &[TileCoord],
        policy: RetryPolicy,
    ) -> Result<DownloadReport, TileCacheError>
    where
        T: TileTransport + ?Sized,
    {
        let mut report = DownloadReport::default();
        for &tile in tiles {
            let path = self.tile_path(tile);
            if tiler_fs::file_exists(&path) {
                debug!("{path} exists; skipping");
                report.skipped.push(tile);
                continue;
            }
            match fetch_with_retry(transport, mirrors, tile, policy).await {
                Ok(body) => {
                    tiler_fs::write_file(&path, &body).map_err(|source| {
                        TileCacheError::WriteTile {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    debug!("fetched {tile} into {path}");
                    report.fetched.push(tile);
                }
                Err(last_error) => {
                    warn!(
                        "giving up on tile {tile} after {} attempt(s)",
                        policy.attempts.max(1)
                    );
                    report.failed.push(TileFailure { tile, last_error });
                }
            }
        }
        info!(
            "{}: {} fetched, {} present, {} failed",
            self.source(),
            report.fetched.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

async fn fetch_with_retry<T>(
    transport: &T,
    mirrors: &[&str],
    tile: TileCoord,
    policy: RetryPolicy,
) -> Result<Vec<u8>, Option<TransportError>>
where
    T: TileTransport + ?Sized,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        for mirror in mirrors {
            let url = expand_template(mirror, tile);
            match transport.fetch(&url).await {
                Ok(body) if !body.is_empty() => return Ok(body),
                Ok(_) => {
                    warn!("{url} returned an empty body");
                    last_error = Some(TransportError::EmptyBody { url });
                }
                Err(err) => {
                    warn!("{err}");
                    last_error = Some(err);
                }
            }
        }
        if attempt < attempts && !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
    }
    Err(last_error)
}
