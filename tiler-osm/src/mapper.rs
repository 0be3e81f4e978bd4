//! Mapping of arbitrary import fields onto OSM tag conventions.
//!
//! A [`TagMapper`] owns a rule table keyed by lower-cased field name. Each
//! [`TagRule`] names the canonical OSM key and an optional table of value
//! rewrites. Unknown fields pass through unchanged and are reported as a
//! [`MappingMiss`] so the rule table can be reviewed later.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tags::TagSet;
use crate::text::{AddressParts, normalize_name, split_full_address};

const ADDR_FULL: &str = "addr:full";
const ADDR_STREET: &str = "addr:street";
const ADDR_HOUSENUMBER: &str = "addr:housenumber";
const ADDR_UNIT: &str = "addr:unit";

/// Keys whose values are always name-normalised.
const NAME_TAGS: &[&str] = &["name", "alt_name"];

/// Replacement for a raw value found in a rule's value table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRewrite {
    /// Keep the tag, replace the value.
    Value(String),
    /// Replace both the tag and the value.
    Retag {
        /// Tag that overrides the rule's canonical key.
        tag: String,
        /// Replacement value.
        value: String,
    },
}

/// Mapping from one input field name to a canonical OSM key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRule {
    /// Canonical OSM key.
    pub tag: String,
    /// Raw value (case-insensitive) to replacement.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, ValueRewrite>,
    /// Apply name normalisation to values mapped by this rule.
    #[serde(default)]
    pub normalize: bool,
}

impl TagRule {
    /// Rule mapping onto `tag` without value rewrites.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            values: BTreeMap::new(),
            normalize: false,
        }
    }

    /// Enable name normalisation for this rule.
    #[must_use]
    pub const fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    /// Add a value rewrite.
    #[must_use]
    pub fn with_value(mut self, raw: &str, rewrite: ValueRewrite) -> Self {
        self.values.insert(raw.to_lowercase(), rewrite);
        self
    }
}

/// Outcome of [`TagMapper::match_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMatch<'a> {
    /// A rule covers the field.
    Rule(&'a TagRule),
    /// No rule exists; the trimmed field name is used as the key.
    Passthrough(&'a str),
}

impl<'a> FieldMatch<'a> {
    /// Canonical key for the matched field.
    #[must_use]
    pub fn tag(&self) -> &'a str {
        match *self {
            Self::Rule(rule) => rule.tag.as_str(),
            Self::Passthrough(field) => field,
        }
    }

    /// Whether the lookup fell back to the raw field name.
    #[must_use]
    pub const fn is_miss(&self) -> bool {
        matches!(self, Self::Passthrough(_))
    }

    const fn normalizes(&self) -> bool {
        match self {
            Self::Rule(rule) => rule.normalize,
            Self::Passthrough(_) => false,
        }
    }
}

/// Outcome of [`TagMapper::attribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeOutcome {
    /// Key replacing the caller's tag, when the value implies another key.
    pub tag_override: Option<String>,
    /// Resulting value.
    pub value: String,
}

impl AttributeOutcome {
    /// Resolve into a `(key, value)` pair, falling back to `tag`.
    #[must_use]
    pub fn into_pair(self, tag: &str) -> (String, String) {
        let key = self.tag_override.unwrap_or_else(|| tag.to_owned());
        (key, self.value)
    }
}

/// Field name that had no rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingMiss {
    /// Trimmed field name as supplied by the import data.
    pub field: String,
}

impl fmt::Display for MappingMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no tag rule for field {:?}", self.field)
    }
}

/// Count of mapping misses per field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingDiagnostics {
    misses: BTreeMap<String, usize>,
}

impl MappingDiagnostics {
    /// Record a miss, logging it the first time the field is seen.
    pub fn record(&mut self, miss: &MappingMiss) {
        let count = self.misses.entry(miss.field.clone()).or_default();
        if *count == 0 {
            warn!("{miss}; passing it through unchanged");
        } else {
            debug!("{miss}");
        }
        *count += 1;
    }

    /// Total number of misses recorded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.misses.values().sum()
    }

    /// Miss count for one field.
    #[must_use]
    pub fn count(&self, field: &str) -> usize {
        self.misses.get(field).copied().unwrap_or_default()
    }

    /// Fields that missed, in name order, with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.misses.iter().map(|(field, count)| (field.as_str(), *count))
    }

    /// Whether no miss was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.misses.is_empty()
    }
}

/// State shared between the fields of one element.
///
/// An `addr:full` field caches its split parts here so a later
/// `addr:street` field on the same element resolves to the same street.
/// Create a fresh context, or call [`ElementContext::clear`], per element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementContext {
    full_address: Option<AddressParts>,
}

impl ElementContext {
    /// Empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget cached state before the next element.
    pub fn clear(&mut self) {
        self.full_address = None;
    }

    /// Address parts cached from an `addr:full` field.
    #[must_use]
    pub const fn full_address(&self) -> Option<&AddressParts> {
        self.full_address.as_ref()
    }

    fn cached_street(&self) -> Option<&str> {
        self.full_address
            .as_ref()
            .map(|parts| parts.street.as_str())
            .filter(|street| !street.is_empty())
    }
}

/// Tags produced for one field, plus the miss if no rule matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedField {
    /// Resulting `(key, value)` pairs; empty for blank input.
    pub tags: Vec<(String, String)>,
    /// Set when the field fell through to passthrough.
    pub miss: Option<MappingMiss>,
}

/// Errors raised while loading a rule file.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The rule file could not be opened.
    #[error("failed to open tag rules at {path}")]
    Open {
        /// Rule file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The rule file is not a JSON object of rules.
    #[error("failed to parse tag rules at {path}")]
    Parse {
        /// Rule file path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Rule table turning import fields into OSM tags.
///
/// # Examples
/// ```
/// use tiler_osm::{ElementContext, TagMapper};
///
/// let mapper = TagMapper::builtin();
/// let mapped = mapper.map_field(&mut ElementContext::new(), "St", "Main St");
/// assert_eq!(mapped.tags, vec![("highway".to_owned(), "Main Street".to_owned())]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TagMapper {
    rules: BTreeMap<String, TagRule>,
    values: BTreeMap<String, BTreeMap<String, ValueRewrite>>,
}

/// Built-in field aliases as `(field, canonical key, normalise)`.
const BUILTIN_FIELDS: &[(&str, &str, bool)] = &[
    ("name", "name", true),
    ("alt_name", "alt_name", true),
    ("fullname", "name", true),
    ("label", "name", true),
    ("ref", "ref", false),
    ("highway", "highway", false),
    ("rd_class", "highway", false),
    ("road_type", "highway", false),
    ("surface", "surface", false),
    ("surf_type", "surface", false),
    ("oneway", "oneway", false),
    ("one_way", "oneway", false),
    ("amenity", "amenity", false),
    ("building", "building", false),
    ("access", "access", false),
    ("note", "note", false),
    ("source", "source", false),
    ("addr:full", ADDR_FULL, false),
    ("address", ADDR_FULL, false),
    ("fulladdr", ADDR_FULL, false),
    ("site_addr", ADDR_FULL, false),
    ("addr:street", ADDR_STREET, false),
    ("st", "highway", true),
    ("street", ADDR_STREET, false),
    ("street_name", ADDR_STREET, false),
    ("addr:housenumber", ADDR_HOUSENUMBER, false),
    ("addrnum", ADDR_HOUSENUMBER, false),
    ("house_num", ADDR_HOUSENUMBER, false),
    ("addr:unit", ADDR_UNIT, false),
    ("addr:city", "addr:city", false),
    ("city", "addr:city", true),
    ("addr:postcode", "addr:postcode", false),
    ("zip", "addr:postcode", false),
    ("zipcode", "addr:postcode", false),
];

/// Built-in value rewrites as `(canonical key, raw value, replacement)`.
const BUILTIN_VALUES: &[(&str, &str, &str)] = &[
    ("highway", "interstate", "motorway"),
    ("highway", "major", "primary"),
    ("highway", "minor", "secondary"),
    ("highway", "local", "residential"),
    ("highway", "trail", "path"),
    ("highway", "4wd", "track"),
    ("surface", "paved", "paved"),
    ("surface", "asphalt", "asphalt"),
    ("surface", "gravel", "gravel"),
    ("surface", "dirt", "dirt"),
    ("surface", "native", "ground"),
    ("oneway", "y", "yes"),
    ("oneway", "n", "no"),
    ("oneway", "t", "yes"),
    ("oneway", "f", "no"),
];

/// Built-in rewrites that move the value to another key.
const BUILTIN_RETAGS: &[(&str, &str, &str, &str)] = &[
    ("highway", "private", "access", "private"),
    ("highway", "closed", "access", "no"),
];

impl TagMapper {
    /// Mapper without rules: every field passes through.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Mapper holding the built-in rule table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut mapper = Self::empty();
        for &(field, tag, normalize) in BUILTIN_FIELDS {
            let rule = TagRule::new(tag);
            let rule = if normalize { rule.normalized() } else { rule };
            mapper.insert_rule(field, rule);
        }
        for &(tag, raw, value) in BUILTIN_VALUES {
            mapper.insert_value(tag, raw, ValueRewrite::Value(value.to_owned()));
        }
        for &(tag, raw, new_tag, value) in BUILTIN_RETAGS {
            let rewrite = ValueRewrite::Retag {
                tag: new_tag.to_owned(),
                value: value.to_owned(),
            };
            mapper.insert_value(tag, raw, rewrite);
        }
        mapper
    }

    /// Add or replace the rule for `field`.
    ///
    /// Field names match case-insensitively. The rule's value table is
    /// registered against its canonical key.
    pub fn insert_rule(&mut self, field: &str, rule: TagRule) {
        for (raw, rewrite) in &rule.values {
            self.insert_value(&rule.tag, raw, rewrite.clone());
        }
        self.rules.insert(field_key(field), rule);
    }

    fn insert_value(&mut self, tag: &str, raw: &str, rewrite: ValueRewrite) {
        self.values
            .entry(tag.to_owned())
            .or_default()
            .insert(raw.to_lowercase(), rewrite);
    }

    /// Merge rules from a JSON object of `field -> rule`.
    ///
    /// # Errors
    /// Returns the JSON error when the input is not a rule object.
    pub fn extend_from_reader<R: Read>(&mut self, reader: R) -> Result<(), serde_json::Error> {
        let rules: BTreeMap<String, TagRule> = serde_json::from_reader(reader)?;
        for (field, rule) in rules {
            self.insert_rule(&field, rule);
        }
        Ok(())
    }

    /// Merge rules from a JSON rule file.
    ///
    /// # Errors
    /// Returns [`RulesError`] when the file cannot be opened or parsed.
    pub fn extend_from_path(&mut self, path: &Path) -> Result<(), RulesError> {
        let file = File::open(path).map_err(|source| RulesError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.extend_from_reader(BufReader::new(file))
            .map_err(|source| RulesError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Number of field rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the mapper has no field rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Look up the rule for `field`; total over every input.
    #[must_use]
    pub fn match_field<'a>(&'a self, field: &'a str) -> FieldMatch<'a> {
        self.rules
            .get(&field_key(field))
            .map_or_else(|| FieldMatch::Passthrough(field.trim()), FieldMatch::Rule)
    }

    /// Rewrite `value` for canonical key `tag`.
    ///
    /// Values without a rewrite are returned trimmed and unchanged.
    #[must_use]
    pub fn attribute(&self, tag: &str, value: &str) -> AttributeOutcome {
        let value = value.trim();
        let rewrite = self
            .values
            .get(tag)
            .and_then(|table| table.get(&value.to_lowercase()));
        match rewrite {
            Some(ValueRewrite::Value(new_value)) => AttributeOutcome {
                tag_override: None,
                value: new_value.clone(),
            },
            Some(ValueRewrite::Retag {
                tag: new_tag,
                value: new_value,
            }) => AttributeOutcome {
                tag_override: Some(new_tag.clone()),
                value: new_value.clone(),
            },
            None => AttributeOutcome {
                tag_override: None,
                value: value.to_owned(),
            },
        }
    }

    /// Map one import field to OSM tags.
    ///
    /// Blank values produce no tags. `addr:full` values are split into
    /// house number, street and unit and cached in `context`; a later
    /// `addr:street` field on the same element resolves to the cached
    /// street.
    pub fn map_field(&self, context: &mut ElementContext, field: &str, value: &str) -> MappedField {
        let value = value.trim();
        if value.is_empty() {
            return MappedField::default();
        }
        let matched = self.match_field(field);
        let miss = matched.is_miss().then(|| MappingMiss {
            field: field.trim().to_owned(),
        });
        let tags = match matched.tag() {
            ADDR_FULL => self.map_full_address(context, value),
            ADDR_STREET => self.map_street(context, value),
            tag => {
                let (key, value) = self.attribute(tag, value).into_pair(tag);
                let value = if matched.normalizes() || NAME_TAGS.contains(&key.as_str()) {
                    normalize_name(&value)
                } else {
                    value
                };
                vec![(key, value)]
            }
        };
        MappedField {
            tags: tags
                .into_iter()
                .filter(|(key, value)| !key.is_empty() && !value.is_empty())
                .collect(),
            miss,
        }
    }

    /// Map every field of one element with a fresh [`ElementContext`].
    ///
    /// Misses are recorded in `diagnostics`.
    pub fn map_element<'f, I>(&self, fields: I, diagnostics: &mut MappingDiagnostics) -> TagSet
    where
        I: IntoIterator<Item = (&'f str, &'f str)>,
    {
        let mut context = ElementContext::new();
        let mut tags = TagSet::new();
        for (field, value) in fields {
            let mapped = self.map_field(&mut context, field, value);
            if let Some(miss) = &mapped.miss {
                diagnostics.record(miss);
            }
            tags.extend(mapped.tags);
        }
        tags
    }

    fn map_full_address(&self, context: &mut ElementContext, value: &str) -> Vec<(String, String)> {
        let parts = split_full_address(value);
        let mut tags = Vec::new();
        if let Some(number) = &parts.housenumber {
            tags.push((ADDR_HOUSENUMBER.to_owned(), number.clone()));
        }
        if !parts.street.is_empty() {
            tags.push(self.attribute(ADDR_STREET, &parts.street).into_pair(ADDR_STREET));
        }
        if let Some(unit) = &parts.unit {
            tags.push((ADDR_UNIT.to_owned(), unit.clone()));
        }
        context.full_address = Some(parts);
        tags
    }

    fn map_street(&self, context: &ElementContext, value: &str) -> Vec<(String, String)> {
        let street = context
            .cached_street()
            .map_or_else(|| normalize_name(value), str::to_owned);
        vec![self.attribute(ADDR_STREET, &street).into_pair(ADDR_STREET)]
    }
}

fn field_key(field: &str) -> String {
    field.trim().to_lowercase()
}
