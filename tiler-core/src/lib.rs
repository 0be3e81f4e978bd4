//! Core domain types for the tiler.
//!
//! This crate covers the pure parts of region processing: reading a region
//! boundary from a polygon file, computing its bounding box, enumerating the
//! slippy-map tiles that cover it, and deriving coarser pyramid levels. It
//! performs no network access.

mod bbox;
mod region;
mod source;
mod tile;

pub use bbox::BoundingBox;
pub use region::{Region, RegionError, Ring};
pub use source::{OutputFormat, TileSource, UnknownName, parse_list};
pub use tile::{
    MAX_LATITUDE, MAX_ZOOM, PYRAMID_DEPTH, TileCoord, TileError, TileLevel, make_levels,
    tiles_covering,
};
