//! Behavioural tests for tag mapping and OSM-XML output.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tiler_osm::{
    ElementAttrs, ElementContext, OsmWriter, OsmWriterConfig, TagMapper, TagSet,
};

#[derive(Debug, Default)]
struct WriteOutcome {
    ids: Vec<i64>,
    xml: String,
    misses: usize,
}

#[fixture]
fn mapper() -> RefCell<TagMapper> {
    RefCell::new(TagMapper::empty())
}

#[fixture]
fn mapped() -> RefCell<Vec<(String, String)>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn outcome() -> RefCell<WriteOutcome> {
    RefCell::new(WriteOutcome::default())
}

#[given("the built-in tag rules")]
fn builtin_rules(#[from(mapper)] mapper: &RefCell<TagMapper>) {
    *mapper.borrow_mut() = TagMapper::builtin();
}

#[when("I map the field St with value Main St")]
fn map_street(
    #[from(mapper)] mapper: &RefCell<TagMapper>,
    #[from(mapped)] mapped: &RefCell<Vec<(String, String)>>,
) {
    let result = mapper
        .borrow()
        .map_field(&mut ElementContext::new(), "St", "Main St");
    assert!(result.miss.is_none(), "St has a rule");
    *mapped.borrow_mut() = result.tags;
}

#[then("the mapped tags are exactly highway=Main Street")]
fn highway_main_street(#[from(mapped)] mapped: &RefCell<Vec<(String, String)>>) {
    assert_eq!(
        *mapped.borrow(),
        vec![("highway".to_owned(), "Main Street".to_owned())]
    );
}

#[when("I write two imported nodes and a way joining them")]
fn write_way(
    #[from(mapper)] mapper: &RefCell<TagMapper>,
    #[from(outcome)] outcome: &RefCell<WriteOutcome>,
) {
    let mut writer = OsmWriter::new(Vec::new(), OsmWriterConfig::default(), mapper.borrow().clone())
        .unwrap_or_else(|err| panic!("header should write: {err}"));
    let attrs = ElementAttrs::default();
    let first = writer
        .write_imported_node(&attrs, 40.01, -105.27, [("name", "pearl st mall")])
        .unwrap_or_else(|err| panic!("node should write: {err}"));
    let second = writer
        .write_imported_node(&attrs, 40.02, -105.28, [("TRAIL_ID", "88")])
        .unwrap_or_else(|err| panic!("node should write: {err}"));
    let tags: TagSet = [("highway", "footway")].into_iter().collect();
    let way = writer
        .make_way(&attrs, &[first, second], &tags)
        .unwrap_or_else(|err| panic!("way should write: {err}"));
    let misses = writer.diagnostics().total();
    let bytes = writer
        .finish()
        .unwrap_or_else(|err| panic!("finish should flush: {err}"));
    *outcome.borrow_mut() = WriteOutcome {
        ids: vec![first, second, way],
        xml: String::from_utf8(bytes).unwrap_or_else(|err| panic!("utf-8 output: {err}")),
        misses,
    };
}

#[then("the nodes receive IDs -1 and -2 and the way receives -3")]
fn synthetic_ids(#[from(outcome)] outcome: &RefCell<WriteOutcome>) {
    assert_eq!(outcome.borrow().ids, vec![-1, -2, -3]);
}

#[then("the way references both nodes in order")]
fn way_refs(#[from(outcome)] outcome: &RefCell<WriteOutcome>) {
    let outcome = outcome.borrow();
    assert!(outcome.xml.contains("<tag k='name' v='Pearl Street Mall'/>"));
    assert!(
        outcome
            .xml
            .contains("    <nd ref='-1'/>\n    <nd ref='-2'/>\n    <tag k='highway' v='footway'/>\n  </way>\n")
    );
}

#[then("one unmapped field is reported")]
fn one_miss(#[from(outcome)] outcome: &RefCell<WriteOutcome>) {
    assert_eq!(outcome.borrow().misses, 1);
}

#[scenario(path = "tests/features/write_osm_import.feature", index = 0)]
fn mapping_a_street_abbreviation(
    mapper: RefCell<TagMapper>,
    mapped: RefCell<Vec<(String, String)>>,
    outcome: RefCell<WriteOutcome>,
) {
    let _ = (mapper, mapped, outcome);
}

#[scenario(path = "tests/features/write_osm_import.feature", index = 1)]
fn writing_a_way_over_imported_nodes(
    mapper: RefCell<TagMapper>,
    mapped: RefCell<Vec<(String, String)>>,
    outcome: RefCell<WriteOutcome>,
) {
    let _ = (mapper, mapped, outcome);
}
