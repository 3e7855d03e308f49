//! Field mappings for the individual data sources.
//!
//! Each submodule implements [`SourceMapping`] for one institution:
//!
//! - [`khm`] — source 109, Kunsthochschule für Medien Köln (XML export with
//!   parent/child records)
//! - [`marburg`] — source 73, MEDIENwissenschaft reviews (DataCite XML)
//! - [`bundesarchiv`] — source 148, Bundesarchiv Filmarchiv (MARC input)
//! - [`imslp`] — source 15, IMSLP (directory of XML documents)
//!
//! [`Source`] ties the mappings to their input shapes and default paths.
//! The helpers below are shared between mappings.

pub mod bundesarchiv;
pub mod imslp;
pub mod khm;
pub mod marburg;

use crate::driver::{RecordSource, SourceMapping};
use crate::error::{ConvertError, Result};
use crate::format_table::FormatTable;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// 109 Kunsthochschule für Medien Köln
    Khm,
    /// 73 MEDIENwissenschaft (Marburg)
    Marburg,
    /// 148 Bundesarchiv Filmarchiv
    Bundesarchiv,
    /// 15 IMSLP
    Imslp,
}

impl Source {
    /// Numeric source identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Source::Khm => "109",
            Source::Marburg => "73",
            Source::Bundesarchiv => "148",
            Source::Imslp => "15",
        }
    }

    /// Input path used when none is given.
    #[must_use]
    pub fn default_input(self) -> PathBuf {
        PathBuf::from(match self {
            Source::Khm => "109_input.xml",
            Source::Marburg => "73_input_datacite.xml",
            Source::Bundesarchiv => "148_input.mrc",
            Source::Imslp => "IMSLP_neu",
        })
    }

    /// Output path used when none is given.
    #[must_use]
    pub fn default_output(self) -> PathBuf {
        PathBuf::from(format!("{}_output.mrc", self.id()))
    }

    /// How records are read from `input`.
    #[must_use]
    pub fn record_source(self, input: &Path) -> RecordSource {
        let path = input.to_path_buf();
        match self {
            Source::Khm => RecordSource::XmlStream {
                path,
                tag: "record".to_string(),
            },
            Source::Marburg => RecordSource::XmlStream {
                path,
                tag: "Record".to_string(),
            },
            Source::Bundesarchiv => RecordSource::MarcFile { path },
            Source::Imslp => RecordSource::XmlDirectory { path },
        }
    }

    /// Build the mapping for this source.
    ///
    /// `extra` is the optional extra mapping argument; only IMSLP uses it.
    ///
    /// # Errors
    ///
    /// Returns an error if the extra mapping cannot be loaded.
    pub fn mapping(
        self,
        formats: FormatTable,
        extra: Option<&Path>,
    ) -> Result<Box<dyn SourceMapping>> {
        Ok(match self {
            Source::Khm => Box::new(khm::KhmMapping::new(formats)),
            Source::Marburg => Box::new(marburg::MarburgMapping::new()),
            Source::Bundesarchiv => Box::new(bundesarchiv::BundesarchivMapping::new()),
            Source::Imslp => {
                let fieldmap = match extra {
                    Some(path) if path.is_dir() => imslp::Fieldmap::from_legacy_directory(path)?,
                    Some(path) => imslp::Fieldmap::from_json_file(path)?,
                    None => {
                        let legacy = Path::new(imslp::LEGACY_DIRECTORY);
                        if legacy.is_dir() {
                            imslp::Fieldmap::from_legacy_directory(legacy)?
                        } else {
                            imslp::Fieldmap::default()
                        }
                    },
                };
                Box::new(imslp::ImslpMapping::new(fieldmap))
            },
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Source {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "109" | "khm" => Ok(Source::Khm),
            "73" | "marburg" => Ok(Source::Marburg),
            "148" | "bundesarchiv" => Ok(Source::Bundesarchiv),
            "15" | "imslp" => Ok(Source::Imslp),
            other => Err(ConvertError::Config(format!(
                "unknown source '{other}', expected one of 109, 73, 148, 15"
            ))),
        }
    }
}

/// Output identifier `finc-<source>-<local id>`.
#[must_use]
pub fn finc_id(source_id: &str, local_id: &str) -> String {
    format!("finc-{source_id}-{local_id}")
}

/// Remove `<<` and `>>` non-sorting markers.
#[must_use]
pub fn remove_brackets(value: &str) -> String {
    value.replace("<<", "").replace(">>", "")
}

/// 260 subfields with ISBD punctuation for place, publisher and year.
///
/// Empty parts are left out and the punctuation adapts:
/// `Leipzig : Hirzel, 1850`.
#[must_use]
pub fn imprint(place: &str, publisher: &str, year: &str) -> Vec<(char, String)> {
    let parts: Vec<(char, &str)> = [('a', place), ('b', publisher), ('c', year)]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();

    parts
        .iter()
        .enumerate()
        .map(|(i, (code, value))| {
            let separator = match (*code, parts.get(i + 1).map(|(next, _)| *next)) {
                ('a', Some('b')) => " : ",
                (_, Some('c')) => ", ",
                _ => "",
            };
            (*code, format!("{value}{separator}"))
        })
        .collect()
}

/// Capitalize the first letter of every word and lowercase the rest.
#[must_use]
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Decode the five predefined XML entities.
#[must_use]
pub fn html_unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Borrow `(code, String)` pairs as `(code, &str)`.
#[must_use]
pub fn as_pairs(subfields: &[(char, String)]) -> Vec<(char, &str)> {
    subfields
        .iter()
        .map(|(code, value)| (*code, value.as_str()))
        .collect()
}
