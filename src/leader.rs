//! MARC record leader parsing and construction.
//!
//! The MARC leader is a 24-byte fixed-length field at the start of every MARC record.
//! It contains metadata describing the record's structure, content type, and encoding.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Record type (a = language material, c = music, etc.)
//! - Position 7: Bibliographic level (m = monograph, s = serial, etc.)
//! - Position 8: Control record type
//! - Position 9: Character coding (space = non-Unicode, a = UTF-8)
//! - Position 10: Indicator count (usually 2)
//! - Position 11: Subfield code count (usually 2)
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Entry map (usually "4500")
//!
//! Conversions usually write leaders as templates such as
//! `"     cam  22        4500"`, leaving the length and base address blank.
//! [`Leader::from_template`] accepts those; the writer fills in both numbers.

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};

/// MARC Leader - 24 bytes at the start of every MARC record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader {
    /// Record length (5 digits) - positions 0-4
    pub record_length: u32,
    /// Record status (1 char) - position 5
    pub record_status: char,
    /// Type of record (1 char) - position 6
    pub record_type: char,
    /// Bibliographic level (1 char) - position 7
    pub bibliographic_level: char,
    /// Type of control record (1 char) - position 8
    pub control_record_type: char,
    /// Character coding scheme (1 char) - position 9
    pub character_coding: char,
    /// Indicator count (1 digit) - position 10 (usually 2)
    pub indicator_count: u8,
    /// Subfield code count (1 digit) - position 11 (usually 2)
    pub subfield_code_count: u8,
    /// Base address of data (5 digits) - positions 12-16
    pub data_base_address: u32,
    /// Encoding level (1 char) - position 17
    pub encoding_level: char,
    /// Cataloging form (1 char) - position 18
    pub cataloging_form: char,
    /// Multipart resource record level (1 char) - position 19
    pub multipart_level: char,
    /// Entry map (4 chars) - positions 20-23
    pub reserved: String,
}

impl Default for Leader {
    fn default() -> Self {
        Leader {
            record_length: 0,
            record_status: ' ',
            record_type: ' ',
            bibliographic_level: ' ',
            control_record_type: ' ',
            character_coding: ' ',
            indicator_count: 2,
            subfield_code_count: 2,
            data_base_address: 0,
            encoding_level: ' ',
            cataloging_form: ' ',
            multipart_level: ' ',
            reserved: "4500".to_string(),
        }
    }
}

impl Leader {
    /// Build an output leader from a three-character fragment for positions 5-7.
    ///
    /// The fragment is the `"cam"` / `"ngm"` style value stored in the format
    /// table: record status, type of record and bibliographic level.
    ///
    /// # Errors
    ///
    /// Returns an error if the fragment is not exactly three ASCII characters.
    pub fn from_fragment(fragment: &str, multipart_level: Option<char>) -> Result<Self> {
        if fragment.len() != 3 || !fragment.is_ascii() {
            return Err(ConvertError::InvalidLeader(format!(
                "Leader fragment must be 3 ASCII characters, got '{fragment}'"
            )));
        }
        let bytes = fragment.as_bytes();
        Ok(Leader {
            record_status: bytes[0] as char,
            record_type: bytes[1] as char,
            bibliographic_level: bytes[2] as char,
            multipart_level: multipart_level.unwrap_or(' '),
            ..Leader::default()
        })
    }

    /// Parse a leader template whose numeric positions may be blank.
    ///
    /// Blank record length (0-4) or base address (12-16) become 0 and are
    /// recomputed when the record is serialized. Blank indicator or subfield
    /// code counts default to 2.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not 24 ASCII bytes or a numeric
    /// position holds something other than digits or blanks.
    pub fn from_template(template: &str) -> Result<Self> {
        let bytes = template.as_bytes();
        if bytes.len() != 24 || !template.is_ascii() {
            return Err(ConvertError::InvalidLeader(format!(
                "Leader template must be 24 ASCII characters, got {} bytes",
                bytes.len()
            )));
        }

        let mut normalized = bytes.to_vec();
        for range in [0..5, 12..17] {
            if normalized[range.clone()].iter().all(|b| *b == b' ') {
                normalized[range].copy_from_slice(b"00000");
            }
        }
        for pos in [10, 11] {
            if normalized[pos] == b' ' {
                normalized[pos] = b'2';
            }
        }
        Self::from_bytes(&normalized)
    }

    /// Parse a leader from 24 bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are invalid or too short.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 24 {
            return Err(ConvertError::InvalidLeader(format!(
                "Leader must be at least 24 bytes, got {}",
                bytes.len()
            )));
        }

        let record_length = parse_digits(&bytes[0..5])?;
        let indicator_count = parse_count(bytes[10], 10)?;
        let subfield_code_count = parse_count(bytes[11], 11)?;
        let data_base_address = parse_digits(&bytes[12..17])?;

        Ok(Leader {
            record_length,
            record_status: bytes[5] as char,
            record_type: bytes[6] as char,
            bibliographic_level: bytes[7] as char,
            control_record_type: bytes[8] as char,
            character_coding: bytes[9] as char,
            indicator_count,
            subfield_code_count,
            data_base_address,
            encoding_level: bytes[17] as char,
            cataloging_form: bytes[18] as char,
            multipart_level: bytes[19] as char,
            reserved: String::from_utf8_lossy(&bytes[20..24]).to_string(),
        })
    }

    /// Validate that the leader is suitable for binary record reading.
    ///
    /// Checks that `record_length` and `data_base_address` are at least 24,
    /// which is required before performing arithmetic on these fields during
    /// binary ISO 2709 parsing.
    ///
    /// # Errors
    ///
    /// Returns an error if `record_length` or `data_base_address` is less than 24,
    /// or if the base address lies beyond the record length.
    pub fn validate_for_reading(&self) -> Result<()> {
        if self.record_length < 24 {
            return Err(ConvertError::InvalidLeader(format!(
                "Record length must be at least 24, got {}",
                self.record_length
            )));
        }
        if self.data_base_address < 24 {
            return Err(ConvertError::InvalidLeader(format!(
                "Base address of data must be at least 24, got {}",
                self.data_base_address
            )));
        }
        if self.data_base_address > self.record_length {
            return Err(ConvertError::InvalidLeader(format!(
                "Base address {} exceeds record length {}",
                self.data_base_address, self.record_length
            )));
        }
        Ok(())
    }

    /// Serialize leader to 24-byte array
    ///
    /// # Errors
    ///
    /// Returns an error if the leader values are invalid for serialization.
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        if self.record_length > 99_999 || self.data_base_address > 99_999 {
            return Err(ConvertError::RecordTooLong(format!(
                "leader numbers exceed 5 digits (length {}, base address {})",
                self.record_length, self.data_base_address
            )));
        }

        let mut bytes = Vec::with_capacity(24);
        bytes.extend_from_slice(format!("{:05}", self.record_length).as_bytes());
        for c in [
            self.record_status,
            self.record_type,
            self.bibliographic_level,
            self.control_record_type,
            self.character_coding,
        ] {
            push_ascii(&mut bytes, c)?;
        }
        bytes.push(b'0' + self.indicator_count);
        bytes.push(b'0' + self.subfield_code_count);
        bytes.extend_from_slice(format!("{:05}", self.data_base_address).as_bytes());
        for c in [
            self.encoding_level,
            self.cataloging_form,
            self.multipart_level,
        ] {
            push_ascii(&mut bytes, c)?;
        }

        let reserved_bytes = self.reserved.as_bytes();
        if reserved_bytes.len() != 4 {
            return Err(ConvertError::InvalidLeader(format!(
                "Reserved field must be 4 characters, got {}",
                reserved_bytes.len()
            )));
        }
        bytes.extend_from_slice(reserved_bytes);

        Ok(bytes)
    }
}

fn push_ascii(bytes: &mut Vec<u8>, c: char) -> Result<()> {
    if !c.is_ascii() {
        return Err(ConvertError::InvalidLeader(format!(
            "Leader position {} holds non-ASCII character '{c}'",
            bytes.len()
        )));
    }
    bytes.push(c as u8);
    Ok(())
}

fn parse_count(byte: u8, position: usize) -> Result<u8> {
    (byte as char)
        .to_digit(10)
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| {
            ConvertError::InvalidLeader(format!(
                "Invalid count at position {position}: {}",
                byte as char
            ))
        })
}

/// Parse 5-digit ASCII number from bytes
fn parse_digits(bytes: &[u8]) -> Result<u32> {
    if bytes.len() != 5 {
        return Err(ConvertError::InvalidLeader(format!(
            "Expected 5-digit field, got {} bytes",
            bytes.len()
        )));
    }

    let s = String::from_utf8_lossy(bytes);
    s.parse::<u32>()
        .map_err(|_| ConvertError::InvalidLeader(format!("Invalid numeric field: '{s}'")))
}
