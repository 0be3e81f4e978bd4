//! Streaming OSM-XML writer with synthetic negative IDs.

use std::fmt;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use log::warn;
use quick_xml::escape::escape;
use thiserror::Error;

use crate::mapper::{MappingDiagnostics, TagMapper};
use crate::tags::TagSet;

/// Timestamp layout used on every element.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Errors raised while writing OSM-XML.
#[derive(Debug, Error)]
pub enum OsmWriteError {
    /// No synthetic ID remains below the last one handed out.
    #[error("synthetic IDs exhausted at {next}")]
    IdsExhausted {
        /// ID that would have been allocated.
        next: i64,
    },
    /// Writing to the output stream failed.
    #[error("failed to write OSM output")]
    Write(#[from] io::Error),
}

/// Settings stamped onto every written element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsmWriterConfig {
    /// `generator` attribute of the root element.
    pub generator: String,
    /// Editing user name.
    pub user: String,
    /// Editing user ID.
    pub uid: u64,
    /// First synthetic ID; later IDs count down from here.
    ///
    /// Allocation fails with [`OsmWriteError::IdsExhausted`] once it reaches
    /// `i64::MIN`, which has no successor.
    pub first_id: i64,
    /// Fixed timestamp, or `None` to use the current time per element.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for OsmWriterConfig {
    fn default() -> Self {
        Self {
            generator: format!("tiler {}", env!("CARGO_PKG_VERSION")),
            user: String::new(),
            uid: 0,
            first_id: -1,
            timestamp: None,
        }
    }
}

/// Edit action recorded on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// New element.
    Create,
    /// Changed element.
    Modify,
    /// Removed element.
    Delete,
}

impl Action {
    /// Attribute value for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

/// Optional per-element attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementAttrs {
    /// Explicit ID; when absent a synthetic ID is allocated.
    pub id: Option<i64>,
    /// Edit action.
    pub action: Option<Action>,
    /// Timestamp overriding the writer's.
    pub timestamp: Option<DateTime<Utc>>,
}

impl ElementAttrs {
    /// Attributes carrying an explicit ID.
    #[must_use]
    pub fn with_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

/// Kind of a relation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Node member.
    Node,
    /// Way member.
    Way,
    /// Relation member.
    Relation,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        })
    }
}

/// Relation member reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Referenced element type.
    pub kind: MemberKind,
    /// Referenced element ID.
    pub reference: i64,
    /// Member role, possibly empty.
    pub role: String,
}

impl Member {
    /// Member of `kind` with a role.
    #[must_use]
    pub fn new(kind: MemberKind, reference: i64, role: impl Into<String>) -> Self {
        Self {
            kind,
            reference,
            role: role.into(),
        }
    }
}

/// Writes nodes, ways and relations to an OSM-XML stream.
///
/// Elements without an explicit ID receive strictly decreasing negative
/// IDs starting at [`OsmWriterConfig::first_id`]. The header is written on
/// construction and `</osm>` by [`OsmWriter::finish`].
///
/// # Examples
/// ```
/// use tiler_osm::{ElementAttrs, OsmWriter, OsmWriterConfig, TagMapper, TagSet};
///
/// let mut writer = OsmWriter::new(Vec::new(), OsmWriterConfig::default(), TagMapper::builtin())?;
/// let first = writer.write_node(&ElementAttrs::default(), 40.0, -105.0, &TagSet::new())?;
/// let second = writer.write_node(&ElementAttrs::default(), 40.1, -105.1, &TagSet::new())?;
/// assert_eq!((first, second), (-1, -2));
/// let xml = String::from_utf8(writer.finish()?).expect("utf-8");
/// assert!(xml.ends_with("</osm>\n"));
/// # Ok::<(), tiler_osm::OsmWriteError>(())
/// ```
#[derive(Debug)]
pub struct OsmWriter<W: Write> {
    out: W,
    config: OsmWriterConfig,
    next_id: i64,
    mapper: TagMapper,
    diagnostics: MappingDiagnostics,
}

impl<W: Write> OsmWriter<W> {
    /// Wrap `out` and write the XML header.
    ///
    /// # Errors
    /// Returns [`OsmWriteError::Write`] when the header cannot be written.
    pub fn new(mut out: W, config: OsmWriterConfig, mapper: TagMapper) -> Result<Self, OsmWriteError> {
        writeln!(out, "<?xml version='1.0' encoding='UTF-8'?>")?;
        writeln!(
            out,
            "<osm version=\"0.6\" generator=\"{}\">",
            escape(config.generator.as_str())
        )?;
        Ok(Self {
            out,
            next_id: config.first_id,
            config,
            mapper,
            diagnostics: MappingDiagnostics::default(),
        })
    }

    /// Write a node whose tags are already OSM tags.
    ///
    /// Returns the node's ID.
    ///
    /// # Errors
    /// Returns [`OsmWriteError::Write`] on stream failure and
    /// [`OsmWriteError::IdsExhausted`] when no synthetic ID is left.
    pub fn write_node(
        &mut self,
        attrs: &ElementAttrs,
        lat: f64,
        lon: f64,
        tags: &TagSet,
    ) -> Result<i64, OsmWriteError> {
        let id = self.allocate_id(attrs)?;
        write!(self.out, "  <node")?;
        self.write_common_attrs(id, attrs)?;
        write!(self.out, " lat='{lat}' lon='{lon}'")?;
        self.close_element("node", tags, |_| Ok(()))?;
        Ok(id)
    }

    /// Write a node from raw import fields, mapping them through the
    /// writer's [`TagMapper`].
    ///
    /// # Errors
    /// Returns [`OsmWriteError::Write`] on stream failure or
    /// [`OsmWriteError::IdsExhausted`].
    pub fn write_imported_node<'f, I>(
        &mut self,
        attrs: &ElementAttrs,
        lat: f64,
        lon: f64,
        fields: I,
    ) -> Result<i64, OsmWriteError>
    where
        I: IntoIterator<Item = (&'f str, &'f str)>,
    {
        let tags = self.map_fields(fields);
        self.write_node(attrs, lat, lon, &tags)
    }

    /// Map raw import fields for one element.
    pub fn map_fields<'f, I>(&mut self, fields: I) -> TagSet
    where
        I: IntoIterator<Item = (&'f str, &'f str)>,
    {
        self.mapper.map_element(fields, &mut self.diagnostics)
    }

    /// Write a way referencing `refs`.
    ///
    /// References equal to the way's own ID are skipped with a warning.
    ///
    /// # Errors
    /// Returns [`OsmWriteError::Write`] on stream failure or
    /// [`OsmWriteError::IdsExhausted`].
    pub fn make_way(
        &mut self,
        attrs: &ElementAttrs,
        refs: &[i64],
        tags: &TagSet,
    ) -> Result<i64, OsmWriteError> {
        let id = self.allocate_id(attrs)?;
        write!(self.out, "  <way")?;
        self.write_common_attrs(id, attrs)?;
        let has_refs = !refs.is_empty();
        self.close_element_with("way", has_refs, tags, |out| {
            for &reference in refs {
                if reference == id {
                    warn!("way {id} references itself; skipping the reference");
                    continue;
                }
                writeln!(out, "    <nd ref='{reference}'/>")?;
            }
            Ok(())
        })?;
        Ok(id)
    }

    /// Write a relation with `members`.
    ///
    /// # Errors
    /// Returns [`OsmWriteError::Write`] on stream failure or
    /// [`OsmWriteError::IdsExhausted`].
    pub fn make_relation(
        &mut self,
        attrs: &ElementAttrs,
        members: &[Member],
        tags: &TagSet,
    ) -> Result<i64, OsmWriteError> {
        let id = self.allocate_id(attrs)?;
        write!(self.out, "  <relation")?;
        self.write_common_attrs(id, attrs)?;
        let has_members = !members.is_empty();
        self.close_element_with("relation", has_members, tags, |out| {
            for member in members {
                writeln!(
                    out,
                    "    <member type='{}' ref='{}' role='{}'/>",
                    member.kind,
                    member.reference,
                    escape(member.role.as_str())
                )?;
            }
            Ok(())
        })?;
        Ok(id)
    }

    /// Mapping misses seen so far.
    #[must_use]
    pub const fn diagnostics(&self) -> &MappingDiagnostics {
        &self.diagnostics
    }

    /// ID the next element without an explicit ID will receive.
    #[must_use]
    pub const fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Write `</osm>`, flush, and return the stream.
    ///
    /// # Errors
    /// Returns [`OsmWriteError::Write`] on stream failure.
    pub fn finish(mut self) -> Result<W, OsmWriteError> {
        writeln!(self.out, "</osm>")?;
        self.out.flush()?;
        if !self.diagnostics.is_empty() {
            warn!(
                "{} import fields had no tag rule ({} occurrences)",
                self.diagnostics.iter().count(),
                self.diagnostics.total()
            );
        }
        Ok(self.out)
    }

    fn allocate_id(&mut self, attrs: &ElementAttrs) -> Result<i64, OsmWriteError> {
        if let Some(id) = attrs.id {
            return Ok(id);
        }
        let id = self.next_id;
        self.next_id = id
            .checked_sub(1)
            .ok_or(OsmWriteError::IdsExhausted { next: id })?;
        Ok(id)
    }

    fn write_common_attrs(&mut self, id: i64, attrs: &ElementAttrs) -> io::Result<()> {
        let timestamp = attrs
            .timestamp
            .or(self.config.timestamp)
            .unwrap_or_else(Utc::now)
            .format(TIMESTAMP_FORMAT);
        write!(
            self.out,
            " id='{id}' visible='true' version='1' timestamp='{timestamp}' user='{}' uid='{}'",
            escape(self.config.user.as_str()),
            self.config.uid
        )?;
        if let Some(action) = attrs.action {
            write!(self.out, " action='{}'", action.as_str())?;
        }
        Ok(())
    }

    fn close_element<F>(&mut self, name: &str, tags: &TagSet, body: F) -> io::Result<()>
    where
        F: FnOnce(&mut W) -> io::Result<()>,
    {
        self.close_element_with(name, false, tags, body)
    }

    fn close_element_with<F>(
        &mut self,
        name: &str,
        has_body: bool,
        tags: &TagSet,
        body: F,
    ) -> io::Result<()>
    where
        F: FnOnce(&mut W) -> io::Result<()>,
    {
        if !has_body && tags.is_empty() {
            return writeln!(self.out, "/>");
        }
        writeln!(self.out, ">")?;
        body(&mut self.out)?;
        for (key, value) in tags.iter_joined() {
            writeln!(
                self.out,
                "    <tag k='{}' v='{}'/>",
                escape(key),
                escape(value.as_str())
            )?;
        }
        writeln!(self.out, "  </{name}>")
    }
}
