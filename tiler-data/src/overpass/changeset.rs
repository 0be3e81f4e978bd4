//! Wrapper around the external `osmconvert` tool.

use std::ffi::OsString;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use log::{debug, info};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

/// Program name used when none is configured.
pub const DEFAULT_OSMCONVERT: &str = "osmconvert";

/// Errors raised while reading OSM files or running `osmconvert`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChangesetError {
    /// The tool could not be started.
    #[error("failed to run {program:?}: {source}")]
    Spawn {
        /// Program that was invoked.
        program: PathBuf,
        /// Spawn error.
        source: io::Error,
    },
    /// The tool exited unsuccessfully.
    #[error("{program:?} exited with {status}")]
    Failed {
        /// Program that was invoked.
        program: PathBuf,
        /// Exit status.
        status: ExitStatus,
    },
    /// An OSM file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// An OSM file is not well-formed XML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path.
        path: Utf8PathBuf,
        /// XML error.
        source: quick_xml::Error,
    },
    /// An element carries an unreadable timestamp.
    #[error("invalid timestamp {value:?} in {path}: {source}")]
    Timestamp {
        /// File path.
        path: Utf8PathBuf,
        /// Offending attribute value.
        value: String,
        /// Parser error.
        source: chrono::ParseError,
    },
    /// The merged file could not replace the base file.
    #[error("failed to replace {path}: {source}")]
    Replace {
        /// File being replaced.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Creates and applies change files with `osmconvert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetApplier {
    program: PathBuf,
}

impl Default for ChangesetApplier {
    fn default() -> Self {
        Self::new(DEFAULT_OSMCONVERT)
    }
}

impl ChangesetApplier {
    /// Applier invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program invoked for conversions.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Latest element `timestamp` in an OSM file.
    ///
    /// Returns `None` when the file is absent or carries no timestamps.
    ///
    /// # Errors
    /// Returns [`ChangesetError`] when the file cannot be read, is not
    /// well-formed, or holds a timestamp that is not RFC 3339.
    pub fn last_timestamp(
        &self,
        path: &Utf8Path,
    ) -> Result<Option<DateTime<Utc>>, ChangesetError> {
        if !tiler_fs::file_exists(path) {
            return Ok(None);
        }
        let file = tiler_fs::open_utf8_file(path).map_err(|source| ChangesetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parse = |source| ChangesetError::Parse {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut latest = None;
        loop {
            match reader.read_event_into(&mut buf).map_err(parse)? {
                Event::Start(element) | Event::Empty(element) => {
                    let stamp = element_timestamp(&element, path)?;
                    latest = latest.max(stamp);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(latest)
    }

    /// Convert an augmented diff into an `.osc` change file beside it.
    ///
    /// # Errors
    /// Returns [`ChangesetError::Spawn`] or [`ChangesetError::Failed`] when
    /// the tool cannot run or reports failure.
    pub async fn create_changes(&self, adiff: &Utf8Path) -> Result<Utf8PathBuf, ChangesetError> {
        let changes = adiff.with_extension("osc");
        self.run(create_changes_args(adiff, &changes)).await?;
        info!("wrote change file {changes}");
        Ok(changes)
    }

    /// Merge `changes` into `base`, replacing it.
    ///
    /// # Errors
    /// Returns [`ChangesetError`] when the tool fails or the merged file
    /// cannot replace `base`.
    pub async fn apply_changes(
        &self,
        base: &Utf8Path,
        changes: &Utf8Path,
    ) -> Result<(), ChangesetError> {
        let merged = base.with_extension("new");
        self.run(apply_changes_args(base, changes, &merged)).await?;
        tiler_fs::replace_file(&merged, base).map_err(|source| ChangesetError::Replace {
            path: base.to_path_buf(),
            source,
        })?;
        info!("applied {changes} to {base}");
        Ok(())
    }

    async fn run(&self, args: Vec<OsString>) -> Result<(), ChangesetError> {
        debug!("running {:?} {args:?}", self.program);
        let status = tokio::process::Command::new(&self.program)
            .args(&args)
            .status()
            .await
            .map_err(|source| ChangesetError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ChangesetError::Failed {
                program: self.program.clone(),
                status,
            })
        }
    }
}

fn create_changes_args(adiff: &Utf8Path, changes: &Utf8Path) -> Vec<OsString> {
    vec![
        adiff.as_str().into(),
        "--out-osc".into(),
        format!("-o={changes}").into(),
    ]
}

fn apply_changes_args(base: &Utf8Path, changes: &Utf8Path, merged: &Utf8Path) -> Vec<OsString> {
    vec![
        base.as_str().into(),
        changes.as_str().into(),
        format!("-o={merged}").into(),
    ]
}

fn element_timestamp(
    element: &BytesStart<'_>,
    path: &Utf8Path,
) -> Result<Option<DateTime<Utc>>, ChangesetError> {
    let parse = |source| ChangesetError::Parse {
        path: path.to_path_buf(),
        source,
    };
    for attr in element.attributes().with_checks(false) {
        let attr = attr.map_err(|err| parse(quick_xml::Error::from(err)))?;
        if attr.key.as_ref() != b"timestamp" {
            continue;
        }
        let value = attr.unescape_value().map_err(parse)?;
        let stamp = DateTime::parse_from_rfc3339(&value).map_err(|source| {
            ChangesetError::Timestamp {
                path: path.to_path_buf(),
                value: value.to_string(),
                source,
            }
        })?;
        return Ok(Some(stamp.with_timezone(&Utc)));
    }
    Ok(None)
}
