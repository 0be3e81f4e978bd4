//! Error types produced by the tile cache.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while storing tiles or manifests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TileCacheError {
    /// A downloaded tile could not be written.
    #[error("failed to write tile {path}: {source}")]
    WriteTile {
        /// Tile file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The manifest could not be written.
    #[error("failed to write manifest {path}: {source}")]
    WriteManifest {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The manifest could not be read.
    #[error("failed to read manifest {path}: {source}")]
    ReadManifest {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A manifest line is not a `zoom x y` triple.
    #[error("malformed manifest line {line} in {path}: {text:?}")]
    ParseManifest {
        /// Manifest path.
        path: Utf8PathBuf,
        /// One-based line number.
        line: usize,
        /// Offending line.
        text: String,
    },
}

/// Errors raised while updating the shared tile catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// Existing catalog rows could not be read.
    #[error("failed to read catalog {path}: {source}")]
    Read {
        /// Catalog path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Rows could not be appended.
    #[error("failed to append to catalog {path}: {source}")]
    Write {
        /// Catalog path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}
