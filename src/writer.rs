//! Writing MARC records to binary format.
//!
//! This module provides [`serialize_record`], which turns a [`Record`] into
//! ISO 2709 bytes, and [`MarcWriter`], which appends serialized records to
//! any destination implementing [`std::io::Write`].
//!
//! # Examples
//!
//! ```
//! use finc_marc::{Field, Leader, MarcWriter, Record, TargetEncoding};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut buffer = Vec::new();
//! {
//!     let mut writer = MarcWriter::new(&mut buffer, TargetEncoding::Utf8);
//!     let mut record = Record::new(Leader::default());
//!     let mut field = Field::new("245".to_string(), ' ', ' ');
//!     field.add_subfield('a', "Titel".to_string());
//!     record.add_field(field);
//!     writer.write_record(&record)?;
//! }
//! assert_eq!(buffer.last(), Some(&0x1D));
//! # Ok(())
//! # }
//! ```

use crate::encoding::TargetEncoding;
use crate::error::{ConvertError, Result};
use crate::record::Record;
use std::io::Write;

const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;
const RECORD_TERMINATOR: u8 = 0x1D;

const MAX_FIELD_LENGTH: usize = 9_999;
const MAX_RECORD_LENGTH: usize = 99_999;

/// Serialize a record to ISO 2709 bytes.
///
/// Control fields are written first, then data fields, each in insertion
/// order. Record length, base address and leader position 9 are computed
/// on every call from the current contents.
///
/// # Errors
///
/// Returns [`ConvertError::Encoding`] if a value cannot be represented in
/// `encoding`, and [`ConvertError::RecordTooLong`] if a field or the whole
/// record exceeds ISO 2709 limits.
pub fn serialize_record(record: &Record, encoding: TargetEncoding) -> Result<Vec<u8>> {
    let mut data_area = Vec::new();
    let mut directory = Vec::new();

    for (tag, value) in record.control_fields_iter() {
        let mut field_data = encoding.encode(tag, value)?.into_owned();
        field_data.push(FIELD_TERMINATOR);
        push_directory_entry(&mut directory, tag, field_data.len(), data_area.len())?;
        data_area.extend_from_slice(&field_data);
    }

    for field in record.fields() {
        let mut field_data = Vec::new();
        field_data.extend_from_slice(encoding.encode(&field.tag, &field.indicator1.to_string())?.as_ref());
        field_data.extend_from_slice(encoding.encode(&field.tag, &field.indicator2.to_string())?.as_ref());

        for subfield in &field.subfields {
            field_data.push(SUBFIELD_DELIMITER);
            field_data.extend_from_slice(
                encoding
                    .encode(&field.tag, subfield.code.encode_utf8(&mut [0u8; 4]))?
                    .as_ref(),
            );
            field_data.extend_from_slice(encoding.encode(&field.tag, &subfield.value)?.as_ref());
        }

        field_data.push(FIELD_TERMINATOR);
        push_directory_entry(&mut directory, &field.tag, field_data.len(), data_area.len())?;
        data_area.extend_from_slice(&field_data);
    }

    directory.push(FIELD_TERMINATOR);

    let base_address = 24 + directory.len();
    let record_length = base_address + data_area.len() + 1;
    if record_length > MAX_RECORD_LENGTH {
        return Err(ConvertError::RecordTooLong(format!(
            "{record_length} bytes exceeds the ISO 2709 limit of {MAX_RECORD_LENGTH}"
        )));
    }

    let mut leader = record.leader.clone();
    leader.character_coding = encoding.as_leader_char();
    leader.record_length = u32::try_from(record_length)
        .map_err(|_| ConvertError::RecordTooLong(format!("{record_length} bytes")))?;
    leader.data_base_address = u32::try_from(base_address)
        .map_err(|_| ConvertError::RecordTooLong(format!("base address {base_address}")))?;

    let mut bytes = Vec::with_capacity(record_length);
    bytes.extend_from_slice(&leader.as_bytes()?);
    bytes.extend_from_slice(&directory);
    bytes.extend_from_slice(&data_area);
    bytes.push(RECORD_TERMINATOR);
    Ok(bytes)
}

fn push_directory_entry(
    directory: &mut Vec<u8>,
    tag: &str,
    length: usize,
    start: usize,
) -> Result<()> {
    if tag.len() != 3 || !tag.is_ascii() {
        return Err(ConvertError::InvalidField(format!(
            "Tag must be 3 ASCII characters, got '{tag}'"
        )));
    }
    if length > MAX_FIELD_LENGTH {
        return Err(ConvertError::RecordTooLong(format!(
            "field {tag} is {length} bytes, limit is {MAX_FIELD_LENGTH}"
        )));
    }
    if start > MAX_RECORD_LENGTH {
        return Err(ConvertError::RecordTooLong(format!(
            "field {tag} starts at offset {start}"
        )));
    }
    directory.extend_from_slice(tag.as_bytes());
    directory.extend_from_slice(format!("{length:04}").as_bytes());
    directory.extend_from_slice(format!("{start:05}").as_bytes());
    Ok(())
}

/// Writer for ISO 2709 binary MARC format.
///
/// Records are serialized with [`serialize_record`] and appended to the
/// destination without any wrapping container.
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: W,
    encoding: TargetEncoding,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new MARC writer.
    pub fn new(writer: W, encoding: TargetEncoding) -> Self {
        MarcWriter {
            writer,
            encoding,
            records_written: 0,
            finished: false,
        }
    }

    /// Serialize and write a single MARC record.
    ///
    /// Nothing is written if serialization fails.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails, the writer was finished, or
    /// an I/O error occurs.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let bytes = serialize_record(record, self.encoding)?;
        self.write_serialized(&bytes)
    }

    /// Write bytes previously produced by [`serialize_record`].
    ///
    /// # Errors
    ///
    /// Returns an error if the writer was finished or an I/O error occurs.
    pub fn write_serialized(&mut self, bytes: &[u8]) -> Result<()> {
        if self.finished {
            return Err(ConvertError::InvalidRecord(
                "Cannot write to a finished writer".to_string(),
            ));
        }
        self.writer.write_all(bytes)?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the writer and mark it as finished.
    ///
    /// After calling `finish`, no more records can be written.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying writer fails.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Returns the number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// The encoding records are written in.
    #[must_use]
    pub fn encoding(&self) -> TargetEncoding {
        self.encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::Leader;
    use crate::reader::MarcReader;
    use crate::record::Field;
    use std::io::Cursor;

    fn make_test_record() -> Record {
        let mut record = Record::new(Leader::from_fragment("cam", None).unwrap());
        let mut field = Field::new("245".to_string(), '1', '0');
        field.add_subfield('a', "Test title".to_string());
        record.add_field(field);
        record
    }

    #[test]
    fn test_write_simple_record() {
        let bytes = serialize_record(&make_test_record(), TargetEncoding::Utf8).unwrap();

        // 24 (leader) + 13 (directory: 245 + 0015 + 00000 + terminator) + 15 (field data) + 1 (record term) = 53
        assert_eq!(&bytes[0..5], b"00053");
        assert_eq!(&bytes[12..17], b"00037");
        assert_eq!(bytes[9], b'a');
        assert_eq!(&bytes[24..36], b"245001500000");
        assert_eq!(bytes.last(), Some(&RECORD_TERMINATOR));
    }

    #[test]
    fn test_length_recomputed_after_mutation() {
        let mut record = make_test_record();
        let before = serialize_record(&record, TargetEncoding::Utf8).unwrap();

        let mut field = Field::new("650".to_string(), ' ', ' ');
        field.add_subfield('a', "Film".to_string());
        record.add_field(field);
        let after = serialize_record(&record, TargetEncoding::Utf8).unwrap();

        assert_eq!(after.len(), before.len() + 12 + 9);
        assert_eq!(&after[0..5], format!("{:05}", after.len()).as_bytes());
    }

    #[test]
    fn test_write_and_read_roundtrip() {
        let mut record = make_test_record();
        record.add_control_field("001".to_string(), "finc-109-1".to_string());
        let mut field = Field::new("650".to_string(), ' ', ' ');
        field.add_subfield('a', "Köln".to_string());
        field.add_subfield('x', "Geschichte".to_string());
        record.add_field(field);

        let mut buffer = Vec::new();
        {
            let mut writer = MarcWriter::new(&mut buffer, TargetEncoding::Utf8);
            writer.write_record(&record).unwrap();
            writer.write_record(&record).unwrap();
            assert_eq!(writer.records_written(), 2);
            writer.finish().unwrap();
        }

        let mut reader = MarcReader::new(Cursor::new(buffer));
        let read_record = reader.read_record().unwrap().unwrap();
        assert_eq!(read_record.get_control_field("001"), Some("finc-109-1"));
        assert_eq!(read_record.subfield_triples(), record.subfield_triples());
        assert!(reader.read_record().unwrap().is_some());
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_windows_1252_output() {
        let mut record = Record::new(Leader::default());
        let mut field = Field::new("245".to_string(), ' ', ' ');
        field.add_subfield('a', "Köln".to_string());
        record.add_field(field);

        let bytes = serialize_record(&record, TargetEncoding::Windows1252).unwrap();
        assert_eq!(bytes[9], b' ');
        assert!(bytes.windows(4).any(|w| w == b"K\xF6ln"));
    }

    #[test]
    fn test_oversized_field_is_record_level_error() {
        let mut record = Record::new(Leader::default());
        let mut field = Field::new("500".to_string(), ' ', ' ');
        field.add_subfield('a', "x".repeat(10_000));
        record.add_field(field);

        let err = serialize_record(&record, TargetEncoding::Utf8).unwrap_err();
        assert!(matches!(err, ConvertError::RecordTooLong(_)));
        assert!(err.is_record_level());
    }

    #[test]
    fn test_failed_serialization_writes_nothing() {
        let mut record = Record::new(Leader::default());
        let mut field = Field::new("245".to_string(), ' ', ' ');
        field.add_subfield('a', "数学".to_string());
        record.add_field(field);

        let mut buffer = Vec::new();
        let mut writer = MarcWriter::new(&mut buffer, TargetEncoding::Windows1252);
        assert!(writer.write_record(&record).is_err());
        assert_eq!(writer.records_written(), 0);
        drop(writer);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_writer_cannot_write_after_finish() {
        let mut buffer = Vec::new();
        let mut writer = MarcWriter::new(&mut buffer, TargetEncoding::Utf8);
        writer.finish().unwrap();
        assert!(writer.write_record(&make_test_record()).is_err());
    }
}
