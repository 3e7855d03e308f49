//! Physical format labels and the MARC values they imply.
//!
//! A [`FormatTable`] maps every [`FormatLabel`] a classifier may produce to
//! a [`FormatRule`]: the leader fragment for positions 05-07, the 007
//! control field, an optional 008 literal and optional 935 $b/$c codes.
//! The table is an immutable value handed to whoever needs it; the
//! built-in default can be replaced by a JSON file.
//!
//! # Examples
//!
//! ```
//! use finc_marc::{FormatLabel, FormatTable};
//!
//! let table = FormatTable::default();
//! let dvd = table.get(FormatLabel::Dvd).unwrap();
//! assert_eq!(dvd.leader, "ngm");
//! assert_eq!(dvd.field_007, "vd");
//! assert_eq!(dvd.field_935b.as_deref(), Some("dvdv"));
//! ```

use crate::error::{ConvertError, Result};
use crate::leader::Leader;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Closed set of physical format labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatLabel {
    /// Printed book
    Buch,
    /// Multi-volume work (parent record)
    #[serde(rename = "Mehrbänder")]
    Mehrbaende,
    /// DVD video
    #[serde(rename = "DVD")]
    Dvd,
    /// Blu-ray disc
    #[serde(rename = "Blu-ray")]
    BluRay,
    /// Video file
    Videodatei,
    /// Audio CD
    #[serde(rename = "CD")]
    Cd,
    /// Video cassette
    Videokassette,
    /// Printed music
    Noten,
    /// Loose-leaf publication
    Loseblattsammlung,
    /// Film
    Film,
    /// Article
    Aufsatz,
    /// Physical object
    Objekt,
    /// Journal
    Zeitschrift,
    /// Anything else
    Sonstiges,
}

impl FormatLabel {
    /// Every label, in table order.
    pub const ALL: [FormatLabel; 14] = [
        FormatLabel::Buch,
        FormatLabel::Mehrbaende,
        FormatLabel::Dvd,
        FormatLabel::BluRay,
        FormatLabel::Videodatei,
        FormatLabel::Cd,
        FormatLabel::Videokassette,
        FormatLabel::Noten,
        FormatLabel::Loseblattsammlung,
        FormatLabel::Film,
        FormatLabel::Aufsatz,
        FormatLabel::Objekt,
        FormatLabel::Zeitschrift,
        FormatLabel::Sonstiges,
    ];

    /// The label as written in source data and format files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FormatLabel::Buch => "Buch",
            FormatLabel::Mehrbaende => "Mehrbänder",
            FormatLabel::Dvd => "DVD",
            FormatLabel::BluRay => "Blu-ray",
            FormatLabel::Videodatei => "Videodatei",
            FormatLabel::Cd => "CD",
            FormatLabel::Videokassette => "Videokassette",
            FormatLabel::Noten => "Noten",
            FormatLabel::Loseblattsammlung => "Loseblattsammlung",
            FormatLabel::Film => "Film",
            FormatLabel::Aufsatz => "Aufsatz",
            FormatLabel::Objekt => "Objekt",
            FormatLabel::Zeitschrift => "Zeitschrift",
            FormatLabel::Sonstiges => "Sonstiges",
        }
    }
}

impl fmt::Display for FormatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatLabel {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        FormatLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| ConvertError::UnknownFormat(s.to_string()))
    }
}

/// MARC values implied by one format label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRule {
    /// Leader positions 05-07 (record status, type, bibliographic level)
    pub leader: String,
    /// Leader position 19, blank when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipart_level: Option<char>,
    /// Control field 007
    #[serde(rename = "007")]
    pub field_007: String,
    /// Control field 008 literal
    #[serde(rename = "008", default, skip_serializing_if = "Option::is_none")]
    pub field_008: Option<String>,
    /// 935 $b (carrier code)
    #[serde(rename = "935b", default, skip_serializing_if = "Option::is_none")]
    pub field_935b: Option<String>,
    /// 935 $c (content code)
    #[serde(rename = "935c", default, skip_serializing_if = "Option::is_none")]
    pub field_935c: Option<String>,
}

impl FormatRule {
    fn new(leader: &str, field_007: &str) -> Self {
        FormatRule {
            leader: leader.to_string(),
            multipart_level: None,
            field_007: field_007.to_string(),
            field_008: None,
            field_935b: None,
            field_935c: None,
        }
    }

    fn with_935(mut self, b: Option<&str>, c: Option<&str>) -> Self {
        self.field_935b = b.map(str::to_string);
        self.field_935c = c.map(str::to_string);
        self
    }

    /// Output leader for records of this format.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidLeader`] if the fragment is not three
    /// ASCII characters.
    pub fn leader(&self) -> Result<Leader> {
        Leader::from_fragment(&self.leader, self.multipart_level)
    }
}

/// Immutable label → rule lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatTable {
    rules: IndexMap<FormatLabel, FormatRule>,
}

impl Default for FormatTable {
    fn default() -> Self {
        let mut multipart = FormatRule::new("cam", "tu").with_935(Some("druck"), None);
        multipart.multipart_level = Some('a');
        let mut journal = FormatRule::new("nas", "tu");
        journal.field_008 = Some(format!("{:21}p", ""));

        FormatTable::from_rules([
            (
                FormatLabel::Buch,
                FormatRule::new("cam", "tu").with_935(Some("druck"), None),
            ),
            (FormatLabel::Mehrbaende, multipart),
            (
                FormatLabel::Dvd,
                FormatRule::new("ngm", "vd").with_935(Some("dvdv"), Some("vide")),
            ),
            (
                FormatLabel::BluRay,
                FormatRule::new("ngm", "vd").with_935(Some("bray"), Some("vide")),
            ),
            (
                FormatLabel::Videodatei,
                FormatRule::new("cam", "cr").with_935(Some("cofz"), Some("vide")),
            ),
            (
                FormatLabel::Cd,
                FormatRule::new("  m", "c").with_935(Some("cdda"), None),
            ),
            (
                FormatLabel::Videokassette,
                FormatRule::new("cgm", "vf").with_935(Some("vika"), Some("vide")),
            ),
            (
                FormatLabel::Noten,
                FormatRule::new("nom", "zm").with_935(None, Some("muno")),
            ),
            (FormatLabel::Loseblattsammlung, FormatRule::new("nai", "td")),
            (
                FormatLabel::Film,
                FormatRule::new("cam", "mu").with_935(Some("sobildtt"), None),
            ),
            (FormatLabel::Aufsatz, FormatRule::new("naa", "tu")),
            (
                FormatLabel::Objekt,
                FormatRule::new("crm", "zz").with_935(Some("gegenst"), None),
            ),
            (FormatLabel::Zeitschrift, journal),
            (FormatLabel::Sonstiges, FormatRule::new("npa", "tu")),
        ])
    }
}

impl FormatTable {
    /// Build a table from (label, rule) pairs. Later pairs replace earlier ones.
    pub fn from_rules(rules: impl IntoIterator<Item = (FormatLabel, FormatRule)>) -> Self {
        FormatTable {
            rules: rules.into_iter().collect(),
        }
    }

    /// Parse a table from JSON keyed by label, e.g. `{"Buch": {"leader": "cam", "007": "tu"}}`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Config`] for invalid JSON, unknown labels, or
    /// leader fragments that are not three ASCII characters.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: FormatTable = serde_json::from_str(json)?;
        for (label, rule) in &table.rules {
            rule.leader().map_err(|e| {
                ConvertError::Config(format!("format {label}: {e}"))
            })?;
        }
        Ok(table)
    }

    /// Load a table from a JSON file, see [`FormatTable::from_json`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`FormatTable::from_json`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Rule for `label`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::UnknownFormat`] if the table has no entry for
    /// the label.
    pub fn get(&self, label: FormatLabel) -> Result<&FormatRule> {
        self.rules
            .get(&label)
            .ok_or_else(|| ConvertError::UnknownFormat(label.to_string()))
    }

    /// Labels present in the table, in table order.
    pub fn labels(&self) -> impl Iterator<Item = FormatLabel> + '_ {
        self.rules.keys().copied()
    }
}
