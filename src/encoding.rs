//! Target character encodings for MARC output.
//!
//! Output records are written either as UTF-8 (leader position 9 = `a`) or
//! in the single-byte `windows-1252` code page (leader position 9 = blank)
//! for consumers that cannot read Unicode records.
//!
//! Values are normalized to Unicode NFC before encoding, so decomposed
//! umlauts from XML exports encode the same way as precomposed ones.

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::{is_nfc, UnicodeNormalization};

const RECORD_TERMINATOR: u8 = 0x1D;
const FIELD_TERMINATOR: u8 = 0x1E;
const SUBFIELD_DELIMITER: u8 = 0x1F;

/// Character encoding used when serializing records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetEncoding {
    /// UTF-8 (MARC21 UCS/Unicode)
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    /// Windows-1252, a Latin-1 superset
    #[serde(rename = "windows-1252", alias = "latin1", alias = "cp1252")]
    Windows1252,
}

impl TargetEncoding {
    /// Get the leader character (position 9) for this encoding
    #[must_use]
    pub fn as_leader_char(self) -> char {
        match self {
            TargetEncoding::Utf8 => 'a',
            TargetEncoding::Windows1252 => ' ',
        }
    }

    /// Encode one field value.
    ///
    /// `tag` only labels the error.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Encoding`] if the value contains a MARC
    /// delimiter or terminator byte, or a character the target encoding
    /// cannot represent.
    pub fn encode<'a>(self, tag: &str, value: &'a str) -> Result<Cow<'a, [u8]>> {
        let normalized: Cow<'a, str> = if is_nfc(value) {
            Cow::Borrowed(value)
        } else {
            Cow::Owned(value.nfc().collect())
        };

        if let Some(pos) = memchr::memchr3(
            RECORD_TERMINATOR,
            FIELD_TERMINATOR,
            SUBFIELD_DELIMITER,
            normalized.as_bytes(),
        ) {
            return Err(ConvertError::Encoding {
                tag: tag.to_string(),
                message: format!(
                    "structural control character 0x{:02X} at byte {pos}",
                    normalized.as_bytes()[pos]
                ),
            });
        }

        match self {
            TargetEncoding::Utf8 => Ok(match normalized {
                Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
                Cow::Owned(s) => Cow::Owned(s.into_bytes()),
            }),
            TargetEncoding::Windows1252 => {
                let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(&normalized);
                if had_errors {
                    let message = match normalized.chars().find(|c| !representable_in_1252(*c)) {
                        Some(c) => format!(
                            "character U+{:04X} not representable in windows-1252",
                            u32::from(c)
                        ),
                        None => "value not representable in windows-1252".to_string(),
                    };
                    return Err(ConvertError::Encoding {
                        tag: tag.to_string(),
                        message,
                    });
                }
                Ok(Cow::Owned(bytes.into_owned()))
            },
        }
    }

    /// Decode a value read from a record in this encoding.
    ///
    /// Invalid UTF-8 sequences become U+FFFD.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TargetEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TargetEncoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }

    /// Encoding announced by leader position 9.
    #[must_use]
    pub fn from_leader_char(c: char) -> Self {
        if c == 'a' {
            TargetEncoding::Utf8
        } else {
            TargetEncoding::Windows1252
        }
    }
}

fn representable_in_1252(c: char) -> bool {
    let mut buf = [0u8; 4];
    let s: &str = c.encode_utf8(&mut buf);
    let (_, _, had_errors) = encoding_rs::WINDOWS_1252.encode(s);
    !had_errors
}

impl fmt::Display for TargetEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetEncoding::Utf8 => f.write_str("utf-8"),
            TargetEncoding::Windows1252 => f.write_str("windows-1252"),
        }
    }
}

impl FromStr for TargetEncoding {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TargetEncoding::Utf8),
            "windows-1252" | "cp1252" | "latin1" => Ok(TargetEncoding::Windows1252),
            other => Err(ConvertError::Config(format!(
                "Unknown target encoding: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_chars() {
        assert_eq!(TargetEncoding::Utf8.as_leader_char(), 'a');
        assert_eq!(TargetEncoding::Windows1252.as_leader_char(), ' ');
    }

    #[test]
    fn test_utf8_passes_through() {
        let bytes = TargetEncoding::Utf8.encode("245", "数学").unwrap();
        assert_eq!(bytes.as_ref(), "数学".as_bytes());
    }

    #[test]
    fn test_nfc_normalization() {
        let decomposed = "Mu\u{0308}nchen";
        let bytes = TargetEncoding::Utf8.encode("260", decomposed).unwrap();
        assert_eq!(bytes.as_ref(), "München".as_bytes());

        let latin = TargetEncoding::Windows1252.encode("260", decomposed).unwrap();
        assert_eq!(latin.as_ref(), b"M\xFCnchen");
    }

    #[test]
    fn test_windows_1252_rejects_cjk() {
        let err = TargetEncoding::Windows1252
            .encode("245", "Einführung in die 数学")
            .unwrap_err();
        assert!(matches!(err, ConvertError::Encoding { ref tag, .. } if tag == "245"));
        assert!(err.to_string().contains("U+6570"));
    }

    #[test]
    fn test_structural_bytes_rejected() {
        let err = TargetEncoding::Utf8
            .encode("500", "broken\u{1e}value")
            .unwrap_err();
        assert!(err.is_record_level());
    }

    #[test]
    fn test_decode_windows_1252() {
        let text = TargetEncoding::Windows1252.decode(b"K\xF6ln");
        assert_eq!(text, "Köln");
        assert_eq!(TargetEncoding::Utf8.decode(b"K\xF6ln"), "K\u{fffd}ln");
        assert_eq!(TargetEncoding::from_leader_char(' '), TargetEncoding::Windows1252);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "UTF-8".parse::<TargetEncoding>().unwrap(),
            TargetEncoding::Utf8
        );
        assert_eq!(
            "windows-1252".parse::<TargetEncoding>().unwrap(),
            TargetEncoding::Windows1252
        );
        assert!("ebcdic".parse::<TargetEncoding>().is_err());
    }
}
