//! Error types for conversion operations.
//!
//! This module provides the [`ConvertError`] type for all library operations
//! and the [`Result`] convenience type.
//!
//! Errors fall into two classes. Structural errors (unreadable input,
//! malformed XML, unknown format labels, output I/O) abort a conversion run.
//! Record-level errors (unencodable characters, oversized records) only
//! affect the record being converted; see [`ConvertError::is_record_level`].

use thiserror::Error;

/// Error type for all conversion operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Error indicating an invalid or malformed MARC record.
    #[error("Invalid MARC record: {0}")]
    InvalidRecord(String),

    /// Error indicating an invalid leader (24-byte header).
    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    /// Error indicating an invalid field structure.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// A value cannot be represented in the target encoding.
    #[error("Encoding error in field {tag}: {message}")]
    Encoding {
        /// Tag of the field holding the offending value
        tag: String,
        /// What could not be encoded
        message: String,
    },

    /// The serialized record exceeds ISO 2709 length limits.
    #[error("Record too long: {0}")]
    RecordTooLong(String),

    /// Error while tokenizing or parsing XML input.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A format label has no entry in the format table, or a label string is unknown.
    #[error("Unknown format label: {0}")]
    UnknownFormat(String),

    /// Invalid configuration or mapping file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConvertError {
    /// Whether the error only concerns the record being converted.
    ///
    /// Record-level errors are logged and skipped by the conversion driver;
    /// every other error aborts the run.
    #[must_use]
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            ConvertError::Encoding { .. } | ConvertError::RecordTooLong(_)
        )
    }
}

impl From<quick_xml::Error> for ConvertError {
    fn from(err: quick_xml::Error) -> Self {
        ConvertError::ParseError(err.to_string())
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(err: serde_json::Error) -> Self {
        ConvertError::Config(err.to_string())
    }
}

/// Convenience type alias for [`std::result::Result`] with [`ConvertError`].
pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_level_classification() {
        let encoding = ConvertError::Encoding {
            tag: "245".to_string(),
            message: "unmappable character".to_string(),
        };
        assert!(encoding.is_record_level());
        assert!(ConvertError::RecordTooLong("100000 bytes".to_string()).is_record_level());

        assert!(!ConvertError::UnknownFormat("Hörbuch".to_string()).is_record_level());
        assert!(!ConvertError::ParseError("eof".to_string()).is_record_level());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(!ConvertError::from(io).is_record_level());
    }

    #[test]
    fn test_encoding_error_names_tag() {
        let err = ConvertError::Encoding {
            tag: "245".to_string(),
            message: "character U+6570 not representable in windows-1252".to_string(),
        };
        assert!(err.to_string().contains("field 245"));
    }
}
