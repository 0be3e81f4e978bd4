//! Network and disk access for the tiler.
//!
//! Responsibilities:
//! - Fetch map tiles from mirror lists into a local cache.
//! - Record fetched tiles in per-zoom manifests and the shared catalog.
//! - Pull OSM data from an Overpass interpreter and merge later changes.
//!
//! Boundaries:
//! - Tile maths and region parsing live in `tiler-core`.
//! - Transport sits behind [`TileTransport`] and [`OverpassSource`] so tests
//!   never touch the network.
#![forbid(unsafe_code)]

mod cache;
mod overpass;
mod transport;

#[cfg(any(test, feature = "test-support"))]
mod test_support;

pub use cache::{
    CATALOG_FILE, CatalogError, CatalogMode, CatalogSummary, DEFAULT_ATTEMPTS,
    DEFAULT_RETRY_DELAY, DownloadReport, RetryPolicy, TileCache, TileCacheError, TileFailure,
    catalog_row, expand_template, manifest_path, read_manifest, write_cache, write_db,
};
pub use overpass::{
    ADIFF_FILE, CHANGE_THRESHOLD, ChangesetApplier, ChangesetError, DEFAULT_OSMCONVERT,
    OverpassError, OverpassQuery, OverpassSource, PullOutcome, PullRequest,
    TIMESTAMP_SLACK_SECS, pull_osm_data,
};
#[cfg(any(test, feature = "test-support"))]
pub use test_support::{StubOverpass, StubTransport, block_on_for_tests};
pub use transport::{
    DEFAULT_OVERPASS_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpTransport, TileTransport,
    TransportError,
};
