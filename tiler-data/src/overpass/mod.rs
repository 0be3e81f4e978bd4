//! Pulling OSM data for a region from an Overpass interpreter.
//!
//! A first pull writes `<outdir>/<region>.osm`. Later pulls request an
//! augmented diff starting just after the newest timestamp in that file and
//! merge it through [`ChangesetApplier`].

mod changeset;

use std::fmt;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use log::{debug, info};
use thiserror::Error;
use tiler_core::BoundingBox;

use crate::transport::{HttpTransport, TransportError};

pub use changeset::{ChangesetApplier, ChangesetError, DEFAULT_OSMCONVERT};

/// File receiving augmented-diff responses beneath the output directory.
pub const ADIFF_FILE: &str = "interpreter";

/// Responses at or below this many bytes hold no changes.
pub const CHANGE_THRESHOLD: usize = 300;

/// Seconds added to the newest local timestamp before asking for changes.
pub const TIMESTAMP_SLACK_SECS: i64 = 10;

/// Answers Overpass QL queries.
#[async_trait(?Send)]
pub trait OverpassSource {
    /// Run `query` and return the raw response body.
    async fn query(&self, query: &str) -> Result<Vec<u8>, TransportError>;
}

#[async_trait(?Send)]
impl OverpassSource for HttpTransport {
    async fn query(&self, query: &str) -> Result<Vec<u8>, TransportError> {
        self.post_query(query).await
    }
}

/// Overpass query for everything inside a bounding box.
///
/// # Examples
/// ```
/// use tiler_core::BoundingBox;
/// use tiler_data::OverpassQuery;
///
/// let query = OverpassQuery::new(BoundingBox::new(-105.0, -104.0, 40.0, 40.5));
/// assert_eq!(
///     query.to_string(),
///     "(way(40,-105,40.5,-104);node(40,-105,40.5,-104);rel(40,-105,40.5,-104);<;>;);out meta;"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverpassQuery {
    bbox: BoundingBox,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl OverpassQuery {
    /// Query for the current state of `bbox`.
    #[must_use]
    pub const fn new(bbox: BoundingBox) -> Self {
        Self { bbox, window: None }
    }

    /// Ask for an augmented diff between `past` and `now` instead.
    #[must_use]
    pub const fn changes_between(mut self, past: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        self.window = Some((past, now));
        self
    }
}

impl fmt::Display for OverpassQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((past, now)) = self.window {
            write!(
                f,
                "[adiff: \"{}\",\"{}\"];",
                past.to_rfc3339_opts(SecondsFormat::Secs, true),
                now.to_rfc3339_opts(SecondsFormat::Secs, true)
            )?;
        }
        let area = self.bbox.xapi();
        write!(f, "(way({area});node({area});rel({area});<;>;);out meta;")
    }
}

/// Errors raised while pulling OSM data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OverpassError {
    /// The Overpass request failed.
    #[error("overpass request failed: {0}")]
    Transport(#[from] TransportError),
    /// A response could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Output path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Reading the existing file or merging changes failed.
    #[error(transparent)]
    Changeset(#[from] ChangesetError),
}

/// Inputs to [`pull_osm_data`].
#[derive(Debug, Clone, Copy)]
pub struct PullRequest<'a> {
    /// Output directory.
    pub outdir: &'a Utf8Path,
    /// Region name; the data lands in `<outdir>/<region>.osm`.
    pub region: &'a str,
    /// Area to pull.
    pub bbox: BoundingBox,
    /// End of the change window for incremental pulls.
    pub now: DateTime<Utc>,
}

impl PullRequest<'_> {
    /// Path of the region's OSM file.
    #[must_use]
    pub fn osm_path(&self) -> Utf8PathBuf {
        self.outdir.join(format!("{}.osm", self.region))
    }
}

/// What [`pull_osm_data`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// No previous file existed; the full extract was written.
    Created {
        /// Written OSM file.
        path: Utf8PathBuf,
        /// Response size.
        bytes: usize,
    },
    /// Changes were found and merged into the existing file.
    Updated {
        /// Updated OSM file.
        path: Utf8PathBuf,
        /// Change file that was applied.
        changes: Utf8PathBuf,
    },
    /// The diff held no changes.
    Unchanged {
        /// Existing OSM file.
        path: Utf8PathBuf,
    },
}

/// Pull OSM data for a region, incrementally when a previous pull exists.
///
/// # Errors
/// Returns [`OverpassError`] when the request fails, a response cannot be
/// written, or merging changes fails.
pub async fn pull_osm_data<S>(
    source: &S,
    applier: &ChangesetApplier,
    request: &PullRequest<'_>,
) -> Result<PullOutcome, OverpassError>
where
    S: OverpassSource + ?Sized,
{
    let osm_path = request.osm_path();
    let last = applier.last_timestamp(&osm_path)?;
    let mut query = OverpassQuery::new(request.bbox);
    if let Some(last) = last {
        let past = last + TimeDelta::seconds(TIMESTAMP_SLACK_SECS);
        info!("last timestamp in {osm_path} is {last}; requesting changes since {past}");
        query = query.changes_between(past, request.now);
    }
    let rendered = query.to_string();
    debug!("overpass query: {rendered}");
    let body = source.query(&rendered).await?;

    if last.is_none() {
        write_response(&osm_path, &body)?;
        info!("wrote {} bytes to {osm_path}", body.len());
        return Ok(PullOutcome::Created {
            path: osm_path,
            bytes: body.len(),
        });
    }

    let adiff = request.outdir.join(ADIFF_FILE);
    write_response(&adiff, &body)?;
    if body.len() <= CHANGE_THRESHOLD {
        info!("no changes found for {osm_path}");
        return Ok(PullOutcome::Unchanged { path: osm_path });
    }
    let changes = applier.create_changes(&adiff).await?;
    applier.apply_changes(&osm_path, &changes).await?;
    Ok(PullOutcome::Updated {
        path: osm_path,
        changes,
    })
}

fn write_response(path: &Utf8Path, body: &[u8]) -> Result<(), OverpassError> {
    tiler_fs::write_file(path, body).map_err(|source| OverpassError::Write {
        path: path.to_path_buf(),
        source,
    })
}
