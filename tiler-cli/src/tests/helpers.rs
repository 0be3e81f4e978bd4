//! Test helpers for building regions, configurations and stub services.

use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use tiler_core::{BoundingBox, TileCoord, TileSource, tiles_covering};
use tiler_data::{StubTransport, expand_template};

/// Polygon whose bounding box is covered by four tiles at zoom 15.
pub(super) const SMALL_POLYGON: &str = "boulder creek\n\
    1\n\
    -105.0 40.49\n\
    -104.99 40.49\n\
    -104.99 40.5\n\
    -105.0 40.5\n\
    END\n\
    END\n";

pub(super) fn small_bbox() -> BoundingBox {
    BoundingBox::new(-105.0, -104.99, 40.49, 40.5)
}

/// Temporary workspace holding a polygon file and an output directory.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        tiler_fs::write_file(&root.join("boulder.poly"), SMALL_POLYGON.as_bytes())
            .expect("write polygon");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn poly(&self) -> Utf8PathBuf {
        self.root.join("boulder.poly")
    }

    pub(super) fn outdir(&self) -> Utf8PathBuf {
        self.root.join("out")
    }

    /// Command line naming this workspace's polygon and output directory.
    pub(super) fn invocation(&self, extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            "tiler".to_owned(),
            "--poly".to_owned(),
            self.poly().into_string(),
            "--outfile".to_owned(),
            self.outdir().into_string(),
            "--retries".to_owned(),
            "1".to_owned(),
            "--retry-delay-ms".to_owned(),
            "0".to_owned(),
        ];
        args.extend(extra.iter().map(|arg| (*arg).to_owned()));
        args
    }

    /// Resolve a configuration without consulting files or the environment.
    pub(super) fn config(&self, extra: &[&str]) -> TilerConfig {
        let args = TilerArgs::try_parse_from(self.invocation(extra)).expect("valid arguments");
        TilerConfig::try_from(args).expect("valid configuration")
    }
}

/// Tiles covering [`small_bbox`] at `zoom`.
pub(super) fn small_tiles(zoom: u8) -> Vec<TileCoord> {
    tiles_covering(&small_bbox(), zoom).expect("valid zoom")
}

/// Transport serving every tile of `source` at `zoom` from its first mirror.
pub(super) fn serving_transport(source: TileSource, zoom: u8) -> StubTransport {
    let first_mirror = source.mirrors().first().copied().expect("source has mirrors");
    small_tiles(zoom)
        .into_iter()
        .fold(StubTransport::new(), |stub, tile| {
            stub.with_body(expand_template(first_mirror, tile), b"tile".to_vec())
        })
}

pub(super) fn read_lines(path: &Utf8Path) -> Vec<String> {
    std::fs::read_to_string(path.as_std_path())
        .unwrap_or_else(|err| panic!("failed to read {path}: {err}"))
        .lines()
        .map(str::to_owned)
        .collect()
}
