#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # finc-marc
//!
//! Converts library exports (XML record streams, directories of XML
//! documents, MARC dumps) into MARC21 binary records, one output file per
//! data source.
//!
//! ## Quick Start
//!
//! ### Extracting values from an XML record
//!
//! ```
//! use finc_marc::{FieldExtractor, SourceRecord, XmlRecordStream};
//!
//! # fn main() -> Result<(), finc_marc::ConvertError> {
//! let xml = r#"<export>
//!   <record><datafield tag="331"><subfield code="a">Titel</subfield></datafield></record>
//! </export>"#;
//!
//! let extractor = FieldExtractor::default();
//! for snippet in XmlRecordStream::from_reader(xml.as_bytes(), "record") {
//!     let record = SourceRecord::parse(&snippet?)?;
//!     assert_eq!(extractor.value(&record, "331", "a"), "Titel");
//!     assert_eq!(extractor.value(&record, "359", "a"), "");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Classifying and building a record
//!
//! ```
//! use finc_marc::{
//!     Classification, FormatClassifier, FormatLabel, FormatSignals, FormatTable,
//!     MarcRecordBuilder, TargetEncoding,
//! };
//!
//! # fn main() -> Result<(), finc_marc::ConvertError> {
//! let classifier = FormatClassifier::default();
//! let signals = FormatSignals::new("1 DVD-Video (90 Min.)", false, false);
//! assert_eq!(classifier.classify(&signals), Classification::Format(FormatLabel::Dvd));
//!
//! let formats = FormatTable::default();
//! let mut builder = MarcRecordBuilder::new(&formats);
//! builder.set_leader(FormatLabel::Dvd)?;
//! builder.add_control_field("001", "finc-109-1");
//! builder.add_data_field("245", &[('a', "Titel"), ('b', "")]);
//! let bytes = builder.serialize(TargetEncoding::Utf8)?;
//! assert_eq!(bytes.last(), Some(&0x1D));
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading MARC records back
//!
//! ```
//! use finc_marc::{Field, Leader, MarcReader, MarcWriter, Record, TargetEncoding};
//!
//! # fn main() -> Result<(), finc_marc::ConvertError> {
//! let mut record = Record::new(Leader::default());
//! record.add_control_field("001".to_string(), "12345".to_string());
//! let mut field = Field::new("245".to_string(), '1', '0');
//! field.add_subfield('a', "Test Title".to_string());
//! record.add_field(field);
//!
//! let mut buffer = Vec::new();
//! {
//!     let mut writer = MarcWriter::new(&mut buffer, TargetEncoding::Utf8);
//!     writer.write_record(&record)?;
//!     writer.finish()?;
//! }
//!
//! let mut reader = MarcReader::new(buffer.as_slice());
//! let read = reader.read_record()?.expect("one record");
//! assert_eq!(read.title(), Some("Test Title"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`xml_stream`] — Streaming record elements out of large XML files
//! - [`source_record`] — Generic tree view of one XML record
//! - [`extract`] — Datafield/subfield lookups on source records
//! - [`format_table`] — Format labels and their leader/007/008/935 values
//! - [`classify`] — Rule cascade from physical description to format label
//! - [`builder`] — Assembling output records
//! - [`record`], [`leader`] — MARC record structures
//! - [`writer`], [`reader`] — ISO 2709 serialization
//! - [`encoding`] — Output character encodings
//! - [`driver`] — Batch conversion and the two-pass parent index
//! - [`sources`] — Per-source field mappings
//! - [`config`], [`logging`] — Settings and log output for the binary
//! - [`error`] — Error types and result type

pub mod builder;
pub mod classify;
pub mod config;
pub mod driver;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod format_table;
pub mod leader;
pub mod logging;
pub mod reader;
/// Core MARC record structures (`Record`, `Field`, `Subfield`)
pub mod record;
pub mod source_record;
pub mod sources;
pub mod writer;
pub mod xml_stream;

pub use builder::MarcRecordBuilder;
pub use classify::{Classification, ClassifierRule, Condition, FormatClassifier, FormatSignals};
pub use driver::{
    ConversionDriver, ConversionReport, InputRecord, Mapped, ParentIndexBuilder,
    ParentTitleIndex, RecordSource, SourceMapping,
};
pub use encoding::TargetEncoding;
pub use error::{ConvertError, Result};
pub use extract::FieldExtractor;
pub use format_table::{FormatLabel, FormatRule, FormatTable};
pub use leader::Leader;
pub use reader::MarcReader;
pub use record::{Field, Record, Subfield};
pub use source_record::SourceRecord;
pub use sources::Source;
pub use writer::{serialize_record, MarcWriter};
pub use xml_stream::XmlRecordStream;
