//! OSM tag mapping and XML output.
//!
//! Turns loosely named import fields into OSM tags through a [`TagMapper`],
//! combines tag maps with [`merge_tags`] and [`cleanup`], and serialises
//! elements with [`OsmWriter`]. [`KmlWriter`] produces coverage overlays.
#![forbid(unsafe_code)]

pub mod kml;
pub mod mapper;
pub mod tags;
pub mod text;
pub mod writer;

pub use kml::{KmlGeometry, KmlWriter, Placemark};
pub use mapper::{
    AttributeOutcome, ElementContext, FieldMatch, MappedField, MappingDiagnostics, MappingMiss,
    RulesError, TagMapper, TagRule, ValueRewrite,
};
pub use tags::{ALT_PREFIX, TagSet, Tags, VALUE_SEPARATOR, cleanup, merge_tags};
pub use text::{AddressParts, normalize_name, split_full_address};
pub use writer::{
    Action, ElementAttrs, Member, MemberKind, OsmWriteError, OsmWriter, OsmWriterConfig,
    TIMESTAMP_FORMAT,
};
