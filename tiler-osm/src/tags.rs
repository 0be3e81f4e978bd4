//! Tag collections and the helpers that combine them.
//!
//! Provides helpers to:
//! - merge two tag maps while keeping conflicting values for review; and
//! - fold many single-tag maps into one multi-valued [`TagSet`].

use std::collections::BTreeMap;

/// Single-valued tag map keyed by OSM tag key.
pub type Tags = BTreeMap<String, String>;

/// Separator used when a key carries several values.
pub const VALUE_SEPARATOR: char = ';';

/// Prefix recording a conflicting value in [`merge_tags`].
pub const ALT_PREFIX: &str = "alt_";

/// Multi-valued tag map: each key holds an ordered set of values.
///
/// Values keep their first-insertion order and are joined with
/// [`VALUE_SEPARATOR`] only when serialised.
///
/// # Examples
/// ```
/// use tiler_osm::TagSet;
///
/// let mut tags = TagSet::new();
/// tags.insert("cuisine", "pizza");
/// tags.insert("cuisine", "burger");
/// tags.insert("cuisine", "pizza");
/// assert_eq!(tags.joined("cuisine").as_deref(), Some("pizza;burger"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    entries: BTreeMap<String, Vec<String>>,
}

impl TagSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` under `key` unless the key already holds it.
    ///
    /// Blank keys or values are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if key.trim().is_empty() || value.trim().is_empty() {
            return;
        }
        let values = self.entries.entry(key).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// Values recorded under `key`, in insertion order.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Values recorded under `key`, joined for serialisation.
    #[must_use]
    pub fn joined(&self, key: &str) -> Option<String> {
        self.get(key).map(join_values)
    }

    /// Iterate keys with their joined values in key order.
    pub fn iter_joined(&self) -> impl Iterator<Item = (&str, String)> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), join_values(values)))
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collapse into a single-valued map with joined values.
    #[must_use]
    pub fn into_tags(self) -> Tags {
        self.entries
            .into_iter()
            .map(|(key, values)| {
                let joined = join_values(&values);
                (key, joined)
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K, V> Extend<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

fn join_values(values: &[String]) -> String {
    values.join(&VALUE_SEPARATOR.to_string())
}

/// Fold a sequence of tag maps into one [`TagSet`].
///
/// Colliding keys accumulate every distinct value rather than overwriting.
///
/// # Examples
/// ```
/// use tiler_osm::{Tags, cleanup};
///
/// let first = Tags::from([("amenity".to_owned(), "cafe".to_owned())]);
/// let second = Tags::from([("amenity".to_owned(), "bar".to_owned())]);
/// let set = cleanup([first, second]);
/// assert_eq!(set.joined("amenity").as_deref(), Some("cafe;bar"));
/// ```
pub fn cleanup<I>(tag_list: I) -> TagSet
where
    I: IntoIterator<Item = Tags>,
{
    tag_list.into_iter().flatten().collect()
}

/// Merge two tag maps, keeping `tags1` authoritative on conflicts.
///
/// Keys with equal values pass through once. When the maps disagree the
/// value from `tags1` stays under the key and the value from `tags2` is
/// recorded under `alt_<key>`, so both survive for manual review. A value
/// already present under that alternate key is extended rather than
/// replaced.
///
/// # Examples
/// ```
/// use tiler_osm::{Tags, merge_tags};
///
/// let ours = Tags::from([("name".to_owned(), "Main Street".to_owned())]);
/// let theirs = Tags::from([("name".to_owned(), "Main St".to_owned())]);
/// let merged = merge_tags(&ours, &theirs);
/// assert_eq!(merged["name"], "Main Street");
/// assert_eq!(merged["alt_name"], "Main St");
/// ```
#[must_use]
pub fn merge_tags(tags1: &Tags, tags2: &Tags) -> Tags {
    let mut merged = tags1.clone();
    for (key, value) in tags2 {
        match merged.get(key) {
            None => {
                merged.insert(key.clone(), value.clone());
            }
            Some(existing) if existing == value => {}
            Some(_) => record_alternate(&mut merged, key, value),
        }
    }
    merged
}

fn record_alternate(merged: &mut Tags, key: &str, value: &str) {
    let alternate = format!("{ALT_PREFIX}{key}");
    match merged.get_mut(&alternate) {
        Some(existing) => {
            if !existing.split(VALUE_SEPARATOR).any(|part| part == value) {
                existing.push(VALUE_SEPARATOR);
                existing.push_str(value);
            }
        }
        None => {
            merged.insert(alternate, value.to_owned());
        }
    }
}
