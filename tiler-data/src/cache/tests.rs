//! Unit tests for the tile cache.

use super::*;
use crate::test_support::{StubTransport, block_on_for_tests};
use rstest::{fixture, rstest};
use std::time::Duration;
use tempfile::TempDir;
use tiler_core::{BoundingBox, tiles_covering};

#[fixture]
fn workspace() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
    (dir, root)
}

const TILE: TileCoord = TileCoord::new(15, 6826, 12345);

fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        delay: Duration::from_millis(1),
    }
}

#[rstest]
fn download_falls_back_to_later_mirrors(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let cache = TileCache::new(root, TileSource::Topo);
    let transport =
        StubTransport::new().with_body("https://b.test/15/6826/12345.png", b"png".to_vec());
    let mirrors = [
        "https://a.test/{z}/{x}/{y}.png",
        "https://b.test/{z}/{x}/{y}.png",
    ];

    let report = block_on_for_tests(cache.download(
        &transport,
        &mirrors,
        &[TILE],
        RetryPolicy::once(),
    ))
    .expect("download succeeds");

    assert!(report.fetched_any());
    assert_eq!(report.fetched, vec![TILE]);
    assert_eq!(
        transport.requests(),
        vec![
            "https://a.test/15/6826/12345.png".to_owned(),
            "https://b.test/15/6826/12345.png".to_owned(),
        ]
    );
    let stored = std::fs::read(cache.tile_path(TILE).as_std_path()).expect("tile written");
    assert_eq!(stored, b"png");
}

#[rstest]
fn existing_tiles_are_skipped(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let cache = TileCache::new(root, TileSource::Usgs);
    tiler_fs::write_file(&cache.tile_path(TILE), b"old").expect("seed tile");
    let transport = StubTransport::new();

    let report = block_on_for_tests(cache.download(
        &transport,
        &["https://x.test/{z}/{y}/{x}"],
        &[TILE],
        RetryPolicy::once(),
    ))
    .expect("download succeeds");

    assert!(!report.fetched_any());
    assert_eq!(report.skipped, vec![TILE]);
    assert!(transport.requests().is_empty());
    assert!(cache.contains(TILE));
}

#[rstest]
fn transient_failures_are_retried(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let cache = TileCache::new(root, TileSource::Ersi);
    let url = "https://sat.test/tile/15/12345/6826";
    let transport = StubTransport::new()
        .with_body(url, b"jpg".to_vec())
        .failing_first(url, 2);

    let report = block_on_for_tests(cache.download(
        &transport,
        &["https://sat.test/tile/{z}/{y}/{x}"],
        &[TILE],
        fast_policy(3),
    ))
    .expect("download succeeds");

    assert_eq!(report.fetched, vec![TILE]);
    assert_eq!(transport.requests().len(), 3);
}

#[rstest]
fn exhausted_tiles_are_reported_not_fatal(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let cache = TileCache::new(root, TileSource::Terrain);
    let other = TileCoord::new(15, 6827, 12345);
    let transport =
        StubTransport::new().with_body("https://t.test/15/6827/12345.png", b"ok".to_vec());

    let report = block_on_for_tests(cache.download(
        &transport,
        &["https://t.test/{z}/{x}/{y}.png"],
        &[TILE, other],
        fast_policy(2),
    ))
    .expect("download succeeds");

    assert_eq!(report.fetched, vec![other]);
    assert_eq!(report.failed.len(), 1);
    let failure = report.failed.first().expect("one failure");
    assert_eq!(failure.tile, TILE);
    assert!(matches!(
        failure.last_error,
        Some(crate::TransportError::Http { status: 404, .. })
    ));
    assert!(!cache.contains(TILE));
}

#[rstest]
fn empty_bodies_count_as_failures(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let cache = TileCache::new(root, TileSource::Topo);
    let transport = StubTransport::new().with_body("https://e.test/15/6826/12345", Vec::new());

    let report = block_on_for_tests(cache.download(
        &transport,
        &["https://e.test/{z}/{x}/{y}"],
        &[TILE],
        RetryPolicy::once(),
    ))
    .expect("download succeeds");

    assert!(!report.fetched_any());
    assert!(matches!(
        report.failed.first().and_then(|failure| failure.last_error.as_ref()),
        Some(crate::TransportError::EmptyBody { .. })
    ));
}

#[rstest]
fn manifest_round_trips_in_order(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let bbox = BoundingBox::new(-105.0, -104.99, 40.49, 40.5);
    let mut tiles = tiles_covering(&bbox, 15).expect("valid zoom");
    tiles.reverse();
    let path = manifest_path(&root, "boulder", TileSource::Usgs, 15);

    write_cache(&tiles, &path).expect("manifest written");
    assert_eq!(read_manifest(&path).expect("manifest read"), tiles);

    let first: Vec<TileCoord> = tiles.iter().take(1).copied().collect();
    write_cache(&first, &path).expect("manifest rewritten");
    assert_eq!(
        read_manifest(&path).expect("manifest read").len(),
        1,
        "rewriting truncates the previous manifest"
    );
}

#[rstest]
#[case("15 6826", 1)]
#[case("15 6826 12345\nfifteen 1 2", 2)]
#[case("15 6826 12345 9", 1)]
fn malformed_manifest_lines_are_reported(
    workspace: (TempDir, Utf8PathBuf),
    #[case] contents: &str,
    #[case] bad_line: usize,
) {
    let (_guard, root) = workspace;
    let path = root.join("bad.txt");
    tiler_fs::write_file(&path, contents.as_bytes()).expect("seed manifest");
    let err = read_manifest(&path).expect_err("malformed manifest");
    assert!(matches!(err, TileCacheError::ParseManifest { line, .. } if line == bad_line));
}

#[rstest]
fn catalog_appends_duplicates_by_default(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let path = root.join(CATALOG_FILE);
    for _ in 0..2 {
        let summary = write_db(&[TILE], &path, "boulder", TileSource::Topo, CatalogMode::Append)
            .expect("catalog written");
        assert_eq!(summary.written, 1);
    }
    let contents = std::fs::read_to_string(path.as_std_path()).expect("catalog read");
    assert_eq!(contents, "boulder,topo,15,6826,12345\nboulder,topo,15,6826,12345\n");
}

#[rstest]
#[case("Boulder, CO", "Boulder  CO,topo,15,6826,12345")]
#[case("two\nlines", "two lines,topo,15,6826,12345")]
#[case("boulder", "boulder,topo,15,6826,12345")]
fn catalog_rows_keep_five_fields(#[case] region: &str, #[case] expected: &str) {
    let row = catalog_row(region, TileSource::Topo, TILE);
    assert_eq!(row, expected);
    assert_eq!(row.split(',').count(), 5);
}

#[rstest]
fn catalog_deduplicates_regions_with_commas(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let path = root.join(CATALOG_FILE);
    for _ in 0..2 {
        write_db(&[TILE], &path, "Boulder, CO", TileSource::Topo, CatalogMode::Deduplicate)
            .expect("catalog written");
    }
    let contents = std::fs::read_to_string(path.as_std_path()).expect("catalog read");
    assert_eq!(contents, "Boulder  CO,topo,15,6826,12345\n");
}

#[rstest]
fn catalog_deduplicates_on_request(workspace: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = workspace;
    let path = root.join(CATALOG_FILE);
    let other = TileCoord::new(15, 6827, 12345);
    write_db(&[TILE], &path, "boulder", TileSource::Topo, CatalogMode::Deduplicate)
        .expect("first run");
    let summary = write_db(
        &[TILE, other, other],
        &path,
        "boulder",
        TileSource::Topo,
        CatalogMode::Deduplicate,
    )
    .expect("second run");
    assert_eq!(summary, CatalogSummary { written: 1, duplicates: 2 });
    let contents = std::fs::read_to_string(path.as_std_path()).expect("catalog read");
    assert_eq!(contents.lines().count(), 2);
}
