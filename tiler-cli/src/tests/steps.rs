//! Behaviour-driven step definitions driving the tiler CLI scenarios.

use super::helpers::{Workspace, read_lines, serving_transport};
use super::*;
use crate::pipeline::{RunSummary, execute};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tiler_core::TileSource;
use tiler_data::{CATALOG_FILE, StubOverpass, block_on_for_tests, manifest_path};

/// Aggregates scenario state so each step only needs a single world argument.
#[derive(Debug)]
struct TilerWorld {
    workspace: Workspace,
    cli_args: RefCell<Vec<String>>,
    config: RefCell<Option<Result<TilerConfig, CliError>>>,
    summary: RefCell<Option<RunSummary>>,
}

impl TilerWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            cli_args: RefCell::new(Vec::new()),
            config: RefCell::new(None),
            summary: RefCell::new(None),
        }
    }

    fn push_args(&self, args: &[&str]) {
        self.cli_args
            .borrow_mut()
            .extend(args.iter().map(|arg| (*arg).to_owned()));
    }

    fn configure(&self) -> Result<TilerConfig, CliError> {
        let cli_args = self.cli_args.borrow();
        let extra: Vec<&str> = cli_args.iter().map(String::as_str).collect();
        let invocation = self.workspace.invocation(&extra);
        TilerArgs::try_parse_from(invocation)
            .map_err(CliError::ArgumentParsing)
            .and_then(TilerConfig::try_from)
    }
}

#[fixture]
fn world() -> TilerWorld {
    TilerWorld::new()
}

#[given("a polygon file exists on disk")]
fn polygon_exists(#[from(world)] world: &TilerWorld) {
    assert!(
        tiler_fs::file_exists(&world.workspace.poly()),
        "expected the polygon file to exist on disk",
    );
}

#[given("I request topo and usgs tiles at zooms 14 and 16")]
fn request_two_sources(#[from(world)] world: &TilerWorld) {
    world.push_args(&["--source", "topo,usgs", "--zooms", "14,16"]);
}

#[given("I request tiles at zoom 12")]
fn request_low_zoom(#[from(world)] world: &TilerWorld) {
    world.push_args(&["--zooms", "12"]);
}

#[given("I request topo tiles at zoom 15 with downloading enabled")]
fn request_download(#[from(world)] world: &TilerWorld) {
    world.push_args(&["-s", "topo", "-z", "15", "-d", "-n"]);
}

#[when("I configure the tiler")]
fn configure_tiler(#[from(world)] world: &TilerWorld) {
    let outcome = world.configure();
    world.config.replace(Some(outcome));
}

#[when("I run the tiler against stub services")]
fn run_tiler(#[from(world)] world: &TilerWorld) {
    let config = world.configure().expect("valid configuration");
    let transport = serving_transport(TileSource::Topo, 15);
    let now = Utc::now();
    let summary = block_on_for_tests(execute(
        &config,
        &transport,
        &StubOverpass::unavailable(),
        now,
    ))
    .expect("run succeeds");
    world.summary.replace(Some(summary));
}

#[then("every selected source is processed at zooms 14 and 16")]
fn zooms_apply(#[from(world)] world: &TilerWorld) {
    let borrowed = world.config.borrow();
    let config = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect("expected success");
    assert_eq!(config.sources, vec![TileSource::Topo, TileSource::Usgs]);
    for &source in &config.sources {
        assert_eq!(config.zooms_for(source), vec![14, 16]);
    }
}

#[then("the CLI reports a usage error for zoom 12")]
fn reports_zoom(#[from(world)] world: &TilerWorld) {
    let borrowed = world.config.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::ZoomOutOfRange { zoom, .. } => assert_eq!(*zoom, 12),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(error.exit_code(), EXIT_USAGE);
}

#[then("four Topo tiles are cached and listed in the manifest")]
fn tiles_cached(#[from(world)] world: &TilerWorld) {
    let borrowed = world.summary.borrow();
    let summary = borrowed.as_ref().expect("run recorded");
    let run = summary.sources.first().expect("one source run");
    assert_eq!(run.report.fetched.len(), 4);
    let manifest = manifest_path(&world.workspace.outdir(), "boulder", TileSource::Topo, 15);
    assert_eq!(read_lines(&manifest).len(), 4);
}

#[then("the catalog holds one row per tile")]
fn catalog_rows(#[from(world)] world: &TilerWorld) {
    let rows = read_lines(&world.workspace.outdir().join(CATALOG_FILE));
    assert_eq!(rows.len(), 4);
    assert!(
        rows.iter().all(|row| row.starts_with("boulder creek,topo,15,")),
        "{rows:?}"
    );
}

#[then("the region outline is written as KML")]
fn kml_written(#[from(world)] world: &TilerWorld) {
    let kml = world.workspace.outdir().join("boulder.kml");
    let text = std::fs::read_to_string(kml.as_std_path()).expect("read kml");
    assert!(text.contains("<name>boulder creek</name>"), "{text}");
}

macro_rules! register_tiler_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/tiler_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: TilerWorld) {
            let _ = world;
        }
    };
}

register_tiler_scenario!(cli_flag_selection, "selecting sources and zooms via CLI flags");
register_tiler_scenario!(rejecting_low_zoom, "rejecting zooms outside the supported range");
register_tiler_scenario!(downloading_small_region, "downloading a small region");
