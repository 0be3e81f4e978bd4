//! Local tile storage, manifests, and the shared catalog.
//!
//! Tiles live at `<root>/<source dir>/<zoom>/<x>/<y>.<ext>`. A tile that
//! already exists on disk is never fetched again.

mod catalog;
mod download;
mod error;
mod manifest;

use camino::{Utf8Path, Utf8PathBuf};
use tiler_core::{TileCoord, TileSource};

pub use catalog::{CATALOG_FILE, CatalogMode, CatalogSummary, catalog_row, write_db};
pub use download::{
    DEFAULT_ATTEMPTS, DEFAULT_RETRY_DELAY, DownloadReport, RetryPolicy, TileFailure,
    expand_template,
};
pub use error::{CatalogError, TileCacheError};
pub use manifest::{manifest_path, read_manifest, write_cache};

/// Tile store for one source beneath an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileCache {
    root: Utf8PathBuf,
    source: TileSource,
}

impl TileCache {
    /// Cache for `source` tiles under `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, source: TileSource) -> Self {
        Self {
            root: root.into(),
            source,
        }
    }

    /// Output root shared by every source.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Source whose tiles this cache stores.
    #[must_use]
    pub const fn source(&self) -> TileSource {
        self.source
    }

    /// Directory holding this source's tiles.
    #[must_use]
    pub fn directory(&self) -> Utf8PathBuf {
        self.root.join(self.source.directory())
    }

    /// Local file path for `tile`.
    ///
    /// # Examples
    /// ```
    /// use tiler_core::{TileCoord, TileSource};
    /// use tiler_data::TileCache;
    ///
    /// let cache = TileCache::new("/srv/tiles", TileSource::Topo);
    /// let path = cache.tile_path(TileCoord::new(15, 6826, 12345));
    /// assert_eq!(path, "/srv/tiles/Topo/15/6826/12345.png");
    /// ```
    #[must_use]
    pub fn tile_path(&self, tile: TileCoord) -> Utf8PathBuf {
        self.directory()
            .join(tile.zoom.to_string())
            .join(tile.x.to_string())
            .join(format!("{}.{}", tile.y, self.source.extension()))
    }

    /// Whether `tile` is already stored.
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        tiler_fs::file_exists(&self.tile_path(tile))
    }
}

#[cfg(test)]
mod tests;
