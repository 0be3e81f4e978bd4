//! Facade crate for the tiler.
//!
//! This crate re-exports the region and tile types, the OSM tag mapping and
//! writers, and, behind the `download` feature, the tile cache and Overpass
//! client.

#![forbid(unsafe_code)]

pub use tiler_core::{
    BoundingBox, OutputFormat, Region, RegionError, Ring, TileCoord, TileError, TileLevel,
    TileSource, make_levels, tiles_covering,
};

pub use tiler_osm::{
    ElementAttrs, ElementContext, KmlWriter, OsmWriteError, OsmWriter, OsmWriterConfig, TagMapper,
    TagSet, Tags, cleanup, merge_tags,
};

#[cfg(feature = "download")]
pub use tiler_data::{
    ChangesetApplier, HttpTransport, OverpassSource, PullOutcome, PullRequest, TileCache,
    TileCacheError, TileTransport, pull_osm_data, write_cache, write_db,
};
