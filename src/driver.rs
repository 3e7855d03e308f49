//! Batch conversion of one input into one MARC binary output.
//!
//! A [`ConversionDriver`] owns the output writer and runs a
//! [`SourceMapping`] over every record of a [`RecordSource`]:
//!
//! ```text
//! Init -> (ParentIndexPass)? -> ConvertPass -> Closed
//! ```
//!
//! The parent index pass only runs for mappings that ask for it. It reads
//! the whole input and builds a [`ParentTitleIndex`] before the first
//! record is converted, since children may precede their parents.
//!
//! Per-record data errors (see [`ConvertError::is_record_level`]) are
//! logged with the record identifier and counted as failures; the batch
//! continues. Every other error aborts the run.

use crate::encoding::TargetEncoding;
use crate::error::{ConvertError, Result};
use crate::reader::MarcReader;
use crate::record::Record;
use crate::source_record::SourceRecord;
use crate::writer::{serialize_record, MarcWriter};
use crate::xml_stream::{open_input, XmlRecordStream};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Where records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// One XML file (optionally `.gz`) holding many `tag` elements.
    XmlStream {
        /// Input file
        path: PathBuf,
        /// Record element name, namespace prefix ignored
        tag: String,
    },
    /// A directory tree with one XML document per record.
    ///
    /// Files ending in `.xml` are visited in file-name order.
    XmlDirectory {
        /// Root directory
        path: PathBuf,
    },
    /// An ISO 2709 file.
    MarcFile {
        /// Input file
        path: PathBuf,
    },
}

/// One input record, as handed to a [`SourceMapping`].
#[derive(Debug, Clone)]
pub enum InputRecord {
    /// A record parsed from XML
    Xml(SourceRecord),
    /// A record read from MARC binary input
    Marc(Record),
}

type RecordIter = Box<dyn Iterator<Item = Result<InputRecord>>>;

impl RecordSource {
    /// Open the source for one pass.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the input cannot be opened.
    pub fn records(&self) -> Result<RecordIter> {
        match self {
            RecordSource::XmlStream { path, tag } => {
                let stream = XmlRecordStream::open(path, tag)?;
                Ok(Box::new(stream.map(|snippet| {
                    SourceRecord::parse(&snippet?).map(InputRecord::Xml)
                })))
            },
            RecordSource::XmlDirectory { path } => {
                if !path.is_dir() {
                    return Err(ConvertError::IoError(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("input directory {} not found", path.display()),
                    )));
                }
                let files = WalkDir::new(path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|entry| match entry {
                        Ok(entry) if is_xml_file(entry.path()) => Some(Ok(entry.into_path())),
                        Ok(_) => None,
                        Err(e) => Some(Err(ConvertError::IoError(e.into()))),
                    });
                Ok(Box::new(files.map(|file| {
                    let file = file?;
                    let xml = std::fs::read_to_string(&file)?;
                    SourceRecord::parse(&xml)
                        .map(InputRecord::Xml)
                        .map_err(|e| ConvertError::ParseError(format!("{}: {e}", file.display())))
                })))
            },
            RecordSource::MarcFile { path } => {
                let reader = MarcReader::new(open_input(path)?);
                Ok(Box::new(reader.map(|record| record.map(InputRecord::Marc))))
            },
        }
    }

    fn path(&self) -> &Path {
        match self {
            RecordSource::XmlStream { path, .. }
            | RecordSource::XmlDirectory { path }
            | RecordSource::MarcFile { path } => path,
        }
    }
}

fn is_xml_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// Parent identifiers and their titles, built before conversion starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentTitleIndex {
    parents: HashSet<String>,
    titles: HashMap<String, String>,
}

impl ParentTitleIndex {
    /// Whether some record references `id` as its parent.
    #[must_use]
    pub fn is_parent(&self, id: &str) -> bool {
        self.parents.contains(id)
    }

    /// Non-empty title of parent `id`.
    #[must_use]
    pub fn title(&self, id: &str) -> Option<&str> {
        self.titles
            .get(id)
            .map(String::as_str)
            .filter(|title| !title.is_empty())
    }

    /// Number of referenced parents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether no parent is referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Accumulates a [`ParentTitleIndex`] during the index pass.
#[derive(Debug, Default)]
pub struct ParentIndexBuilder {
    referenced: HashSet<String>,
    titles: HashMap<String, String>,
}

impl ParentIndexBuilder {
    /// Note that some record names `parent_id` as its parent.
    pub fn reference_parent(&mut self, parent_id: &str) {
        if !parent_id.is_empty() {
            self.referenced.insert(parent_id.to_string());
        }
    }

    /// Remember the title of record `id`, in case it turns out to be a parent.
    pub fn record_title(&mut self, id: &str, title: &str) {
        if !id.is_empty() {
            self.titles.insert(id.to_string(), title.to_string());
        }
    }

    /// Keep only titles of referenced records.
    #[must_use]
    pub fn finish(self) -> ParentTitleIndex {
        let referenced = self.referenced;
        let titles = self
            .titles
            .into_iter()
            .filter(|(id, _)| referenced.contains(id))
            .collect();
        ParentTitleIndex {
            parents: referenced,
            titles,
        }
    }
}

/// What a mapping made of one input record.
#[derive(Debug, Clone)]
pub enum Mapped {
    /// Write this record.
    Record(Record),
    /// Leave the input record out.
    Skip {
        /// Source-local identifier, for the diagnostic
        id: String,
        /// Why the record is left out
        reason: String,
    },
}

impl Mapped {
    /// Shorthand for [`Mapped::Skip`].
    pub fn skip(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Mapped::Skip {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Per-source field mapping plugged into the driver.
pub trait SourceMapping {
    /// Source identifier, e.g. `"109"`.
    fn source_id(&self) -> &str;

    /// Whether the driver must run the parent index pass first.
    fn needs_parent_index(&self) -> bool {
        false
    }

    /// Source-local identifier of an input record, for diagnostics.
    fn local_id(&self, record: &InputRecord) -> String {
        match record {
            InputRecord::Marc(record) => record.get_control_field("001").unwrap_or_default().to_string(),
            InputRecord::Xml(_) => String::new(),
        }
    }

    /// Contribute one record to the parent index.
    fn index_record(&self, _record: &InputRecord, _index: &mut ParentIndexBuilder) {}

    /// Map one record.
    ///
    /// # Errors
    ///
    /// Record-level errors skip the record, anything else aborts the run.
    fn map(&self, record: &InputRecord, parents: &ParentTitleIndex) -> Result<Mapped>;
}

/// Counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// Records written to the output
    pub written: usize,
    /// Records left out on purpose
    pub skipped: usize,
    /// Records that could not be converted
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Init,
    ParentIndexPass,
    ConvertPass,
    Closed,
}

/// Runs one conversion into a writer it owns.
#[derive(Debug)]
pub struct ConversionDriver<W: Write> {
    writer: MarcWriter<W>,
    state: DriverState,
}

impl<W: Write> ConversionDriver<W> {
    /// Create a driver writing records in `encoding`.
    pub fn new(output: W, encoding: TargetEncoding) -> Self {
        ConversionDriver {
            writer: MarcWriter::new(output, encoding),
            state: DriverState::Init,
        }
    }

    fn transition(&mut self, next: DriverState) {
        debug!(from = ?self.state, to = ?next, "driver state");
        self.state = next;
    }

    /// Convert every record of `source` and close the output.
    ///
    /// # Errors
    ///
    /// Returns the first structural error: unreadable or malformed input,
    /// an unknown format label, an output I/O error, or a second call on
    /// the same driver.
    pub fn run(
        &mut self,
        source: &RecordSource,
        mapping: &dyn SourceMapping,
    ) -> Result<ConversionReport> {
        if self.state != DriverState::Init {
            return Err(ConvertError::InvalidRecord(
                "conversion driver has already run".to_string(),
            ));
        }
        info!(
            source = mapping.source_id(),
            input = %source.path().display(),
            "starting conversion"
        );

        let parents = if mapping.needs_parent_index() {
            self.transition(DriverState::ParentIndexPass);
            let mut builder = ParentIndexBuilder::default();
            for record in source.records()? {
                mapping.index_record(&record?, &mut builder);
            }
            let index = builder.finish();
            info!(parents = index.len(), "parent index complete");
            index
        } else {
            ParentTitleIndex::default()
        };

        self.transition(DriverState::ConvertPass);
        let mut report = ConversionReport::default();
        for record in source.records()? {
            self.convert_one(&record?, mapping, &parents, &mut report)?;
        }

        self.writer.finish()?;
        self.transition(DriverState::Closed);
        info!(
            source = mapping.source_id(),
            written = report.written,
            skipped = report.skipped,
            failed = report.failed,
            "conversion finished"
        );
        Ok(report)
    }

    fn convert_one(
        &mut self,
        input: &InputRecord,
        mapping: &dyn SourceMapping,
        parents: &ParentTitleIndex,
        report: &mut ConversionReport,
    ) -> Result<()> {
        let outcome = match mapping.map(input, parents) {
            Err(e) if e.is_record_level() => {
                error!(id = %mapping.local_id(input), error = %e, "record could not be mapped");
                report.failed += 1;
                return Ok(());
            },
            other => other?,
        };

        let record = match outcome {
            Mapped::Record(record) => record,
            Mapped::Skip { id, reason } => {
                warn!(id = %id, reason = %reason, "record skipped");
                report.skipped += 1;
                return Ok(());
            },
        };

        match serialize_record(&record, self.writer.encoding()) {
            Ok(bytes) => {
                self.writer.write_serialized(&bytes)?;
                report.written += 1;
            },
            Err(e) if e.is_record_level() => {
                let id = record.get_control_field("001").unwrap_or("<no 001>");
                error!(id = %id, error = %e, "record not written");
                report.failed += 1;
            },
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
