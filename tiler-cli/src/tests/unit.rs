//! Focused unit tests covering tiler configuration and error categories.

use super::helpers::Workspace;
use super::*;
use crate::config::{ARG_POLY, ENV_POLY, config_from_layers_for_test, parse_zooms};
use camino::Utf8PathBuf;
use rstest::rstest;
use tiler_core::{OutputFormat, RegionError, TileSource};
use tiler_data::{CatalogMode, ChangesetError, OverpassError, RetryPolicy, TransportError};

#[rstest]
#[case("14,16", vec![14, 16])]
#[case(" 15 , 15,18", vec![15, 18])]
#[case("18,14", vec![18, 14])]
fn parses_zoom_lists(#[case] list: &str, #[case] expected: Vec<u8>) {
    assert_eq!(parse_zooms(list).expect("valid zooms"), expected);
}

#[rstest]
#[case("13", 13)]
#[case("14,19", 19)]
fn rejects_out_of_range_zooms(#[case] list: &str, #[case] rejected: u8) {
    match parse_zooms(list).expect_err("zoom outside 14..=18") {
        CliError::ZoomOutOfRange { zoom, min, max } => {
            assert_eq!(zoom, rejected);
            assert_eq!((min, max), (MIN_REQUEST_ZOOM, MAX_REQUEST_ZOOM));
        }
        other => panic!("expected ZoomOutOfRange, found {other:?}"),
    }
}

#[rstest]
#[case("fifteen")]
#[case("")]
#[case(" , ")]
fn rejects_malformed_zooms(#[case] list: &str) {
    let err = parse_zooms(list).expect_err("malformed zoom list");
    assert!(matches!(err, CliError::InvalidZoom { .. }), "{err:?}");
    assert_eq!(err.exit_code(), EXIT_USAGE);
}

#[rstest]
fn converting_without_poly_errors() {
    let err = TilerConfig::try_from(TilerArgs::default()).expect_err("poly is required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_POLY);
            assert_eq!(env, ENV_POLY);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn defaults_cover_every_source() {
    let args = TilerArgs {
        poly: Some(Utf8PathBuf::from("regions/boulder.poly")),
        ..TilerArgs::default()
    };
    let config = TilerConfig::try_from(args).expect("defaults are valid");
    assert_eq!(config.outdir, Utf8PathBuf::from("."));
    assert_eq!(
        config.sources,
        vec![
            TileSource::Ersi,
            TileSource::Topo,
            TileSource::Usgs,
            TileSource::Terrain
        ]
    );
    assert_eq!(config.formats, vec![OutputFormat::Gtiff]);
    assert_eq!(config.zooms, None);
    assert_eq!(config.zooms_for(TileSource::Ersi), vec![16]);
    assert_eq!(config.zooms_for(TileSource::Topo), vec![15]);
    assert_eq!(config.retry, RetryPolicy::default());
    assert_eq!(config.catalog_mode, CatalogMode::Append);
    assert_eq!(config.region_stem(), "boulder");
    assert!(!config.download && !config.nodata && !config.mosaic);
}

#[rstest]
fn explicit_zooms_apply_to_every_source() {
    let workspace = Workspace::new();
    let config = workspace.config(&["-s", "usgs,terrain", "-z", "14,17", "--dedupe-catalog"]);
    assert_eq!(config.zooms_for(TileSource::Usgs), vec![14, 17]);
    assert_eq!(config.zooms_for(TileSource::Terrain), vec![14, 17]);
    assert_eq!(config.catalog_mode, CatalogMode::Deduplicate);
}

#[rstest]
fn short_flags_match_long_flags() {
    let args = TilerArgs::try_parse_from([
        "tiler", "-o", "out", "-s", "topo", "-p", "a.poly", "-f", "osmand", "-z", "15", "-d",
        "-m", "-n", "-v",
    ])
    .expect("short flags parse");
    let config = TilerConfig::try_from(args).expect("valid configuration");
    assert_eq!(config.outdir, Utf8PathBuf::from("out"));
    assert_eq!(config.sources, vec![TileSource::Topo]);
    assert_eq!(config.formats, vec![OutputFormat::Osmand]);
    assert_eq!(config.zooms, Some(vec![15]));
    assert!(config.download && config.mosaic && config.nodata && config.verbose());
}

#[rstest]
#[case(&["-s", "google"][..], "google")]
#[case(&["-f", "gtiff,aqm"][..], "aqm")]
fn unknown_names_are_usage_errors(#[case] extra: &[&str], #[case] rejected: &str) {
    let workspace = Workspace::new();
    let args = TilerArgs::try_parse_from(workspace.invocation(extra)).expect("flags parse");
    let err = TilerConfig::try_from(args).expect_err("unknown name");
    match &err {
        CliError::UnknownName(name) => assert_eq!(name.name, rejected),
        other => panic!("expected UnknownName, found {other:?}"),
    }
    assert_eq!(err.exit_code(), EXIT_USAGE);
}

#[rstest]
fn validate_sources_reports_missing_poly() {
    let workspace = Workspace::new();
    let mut config = workspace.config(&[]);
    config.poly = workspace.root().join("absent.poly");
    match config.validate_sources().expect_err("missing polygon") {
        CliError::MissingSourceFile { field, path } => {
            assert_eq!(field, ARG_POLY);
            assert_eq!(path, workspace.root().join("absent.poly"));
        }
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

#[rstest]
fn validate_sources_rejects_directories() {
    let workspace = Workspace::new();
    let mut config = workspace.config(&[]);
    config.poly = workspace.root().to_path_buf();
    let err = config.validate_sources().expect_err("directory is not a file");
    assert!(matches!(err, CliError::SourcePathNotFile { .. }), "{err:?}");
}

#[rstest]
fn osm_credentials_reach_the_writer() {
    let workspace = Workspace::new();
    let config = workspace.config(&["--osm-user", "mapper", "--osm-uid", "7"]);
    let writer = config.osm_writer_config();
    assert_eq!(writer.user, "mapper");
    assert_eq!(writer.uid, 7);
    assert_eq!(writer.first_id, -1);
}

fn io_error() -> std::io::Error {
    std::io::Error::other("disk full")
}

#[rstest]
#[case(
    CliError::MissingArgument { field: ARG_POLY, env: ENV_POLY },
    EXIT_USAGE
)]
#[case(
    CliError::Region { path: Utf8PathBuf::from("a.poly"), source: RegionError::Empty },
    EXIT_USAGE
)]
#[case(
    CliError::Region { path: Utf8PathBuf::from("a.poly"), source: RegionError::Read(io_error()) },
    EXIT_IO
)]
#[case(
    CliError::Kml { path: Utf8PathBuf::from("a.kml"), source: io_error() },
    EXIT_IO
)]
#[case(
    CliError::Overpass(OverpassError::Transport(TransportError::EmptyBody { url: "u".to_owned() })),
    EXIT_NETWORK
)]
#[case(
    CliError::Overpass(OverpassError::Changeset(ChangesetError::Spawn {
        program: "osmconvert".into(),
        source: io_error(),
    })),
    EXIT_TOOL
)]
#[case(CliError::Runtime(io_error()), EXIT_OTHER)]
fn errors_map_to_exit_codes(#[case] err: CliError, #[case] code: i32) {
    assert_eq!(err.exit_code(), code, "{err}");
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "retries": "many" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    assert!(matches!(err, CliError::Configuration(_)), "{err:?}");
    assert_eq!(err.exit_code(), EXIT_USAGE);
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "poly": "from-file.poly",
            "source": "usgs",
            "zooms": "14",
            "overpass_url": "https://overpass.example/api/interpreter",
        }),
        None,
    );
    composer.push_environment(json!({
        "zooms": "15",
        "osm_user": "env-user",
    }));
    composer.push_cli(json!({
        "poly": "from-cli.poly",
    }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.poly, Utf8PathBuf::from("from-cli.poly"));
    assert_eq!(config.sources, vec![TileSource::Usgs]);
    assert_eq!(config.zooms, Some(vec![15]));
    assert_eq!(config.osm_user, "env-user");
    assert_eq!(
        config.overpass_url,
        "https://overpass.example/api/interpreter"
    );
}
