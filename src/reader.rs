//! Reading MARC records from binary streams.
//!
//! This module provides [`MarcReader`] for reading ISO 2709 formatted MARC records
//! from any source that implements [`std::io::Read`]. Sources whose input is
//! already MARC (rather than XML) feed the conversion driver through it.
//!
//! # Examples
//!
//! ```no_run
//! use finc_marc::MarcReader;
//! use std::fs::File;
//!
//! let file = File::open("148_input.mrc")?;
//! let mut reader = MarcReader::new(file);
//!
//! while let Some(record) = reader.read_record()? {
//!     println!("Record type: {}", record.leader.record_type);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::encoding::TargetEncoding;
use crate::error::{ConvertError, Result};
use crate::leader::Leader;
use crate::record::{is_control_tag, Field, Record};
use std::io::Read;

const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;

/// Reader for ISO 2709 binary MARC format.
///
/// `MarcReader` reads one MARC record at a time. Malformed records are
/// reported as errors; there is no salvage mode.
#[derive(Debug)]
pub struct MarcReader<R: Read> {
    reader: R,
    records_read: usize,
}

impl<R: Read> MarcReader<R> {
    /// Create a new MARC reader.
    pub fn new(reader: R) -> Self {
        MarcReader {
            reader,
            records_read: 0,
        }
    }

    /// Returns the number of records read so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Read a single MARC record.
    ///
    /// Returns `Ok(Some(record))` if a record was successfully read, `Ok(None)` if EOF
    /// was reached, or `Err` if a parsing error occurred.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The binary data is malformed or truncated
    /// - The record structure is invalid
    /// - An I/O error occurs
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let mut leader_bytes = [0u8; 24];
        match self.reader.read_exact(&mut leader_bytes) {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            },
            Err(e) => return Err(ConvertError::IoError(e)),
        }

        let leader = Leader::from_bytes(&leader_bytes)?;
        leader.validate_for_reading()?;

        let record_length = leader.record_length as usize;
        let base_address = leader.data_base_address as usize;

        let mut record_data = vec![0u8; record_length - 24];
        match self.reader.read_exact(&mut record_data) {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ConvertError::InvalidRecord(
                    "Unexpected end of file while reading record data".to_string(),
                ));
            },
            Err(e) => return Err(ConvertError::IoError(e)),
        }

        let directory = &record_data[..base_address - 24];
        let data = &record_data[base_address - 24..];

        let encoding = TargetEncoding::from_leader_char(leader.character_coding);
        let mut record = Record::new(leader);

        // Directory entries are 12 bytes each: tag(3) + length(4) + start position(5)
        for entry in directory.chunks(12) {
            if entry[0] == FIELD_TERMINATOR {
                break;
            }
            if entry.len() < 12 {
                return Err(ConvertError::InvalidRecord(
                    "Incomplete directory entry".to_string(),
                ));
            }

            let tag = String::from_utf8_lossy(&entry[0..3]).to_string();
            let field_length = parse_number(&entry[3..7])?;
            let start_position = parse_number(&entry[7..12])?;

            let end_position = start_position + field_length;
            if end_position > data.len() {
                return Err(ConvertError::InvalidRecord(format!(
                    "Field {tag} exceeds data area"
                )));
            }
            let field_data = &data[start_position..end_position];

            if is_control_tag(&tag) {
                let value = field_data.strip_suffix(&[FIELD_TERMINATOR]).unwrap_or(field_data);
                record.add_control_field(tag, encoding.decode(value));
            } else {
                let field = parse_data_field(field_data, &tag, encoding)
                    .map_err(|e| ConvertError::InvalidField(format!("Tag {tag}: {e}")))?;
                record.add_field(field);
            }
        }

        self.records_read += 1;
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for MarcReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Parse a data field from raw bytes
fn parse_data_field(data: &[u8], tag: &str, encoding: TargetEncoding) -> Result<Field> {
    if data.len() < 2 {
        return Err(ConvertError::InvalidField(
            "Data field too short (needs indicators)".to_string(),
        ));
    }

    let mut field = Field::new(tag.to_string(), data[0] as char, data[1] as char);

    let body = &data[2..];
    let body = body.strip_suffix(&[FIELD_TERMINATOR]).unwrap_or(body);
    if body.is_empty() {
        return Ok(field);
    }
    if body[0] != SUBFIELD_DELIMITER {
        return Err(ConvertError::InvalidField(
            "Expected subfield delimiter".to_string(),
        ));
    }

    for chunk in body[1..].split(|b| *b == SUBFIELD_DELIMITER) {
        let Some((&code, value)) = chunk.split_first() else {
            continue;
        };
        if memchr::memchr(FIELD_TERMINATOR, value).is_some() {
            return Err(ConvertError::InvalidField(
                "Field terminator inside subfield".to_string(),
            ));
        }
        field.add_subfield(code as char, encoding.decode(value));
    }

    Ok(field)
}

/// Parse a fixed-width ASCII number from bytes
fn parse_number(bytes: &[u8]) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if byte.is_ascii_digit() {
            result = result * 10 + (byte - b'0') as usize;
        } else {
            return Err(ConvertError::InvalidRecord(format!(
                "Invalid numeric field: expected digits, got byte {}",
                byte as char
            )));
        }
    }
    Ok(result)
}
