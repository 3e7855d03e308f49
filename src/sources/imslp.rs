//! Source 15: IMSLP, Petrucci Music Library.
//!
//! Input is a directory of XML files, each holding one `<document>`. Work
//! titles and VIAF identifiers do not come with the documents; they are
//! looked up in a [`Fieldmap`], either a JSON file or one scanned from a
//! legacy export directory.

use super::{finc_id, html_unescape, title_case};
use crate::builder::MarcRecordBuilder;
use crate::driver::{InputRecord, Mapped, ParentTitleIndex, SourceMapping};
use crate::error::{ConvertError, Result};
use crate::format_table::FormatTable;
use crate::source_record::{items, lookup, value_text, SourceRecord};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

const SOURCE_ID: &str = "15";
const COLLECTION: &str = "sid-15-col-imslp";

/// Directory scanned for a fieldmap when none is given.
pub const LEGACY_DIRECTORY: &str = "IMSLP_alt";

/// Abstracts longer than this many characters are cut.
pub const MAX_ABSTRACT_CHARS: usize = 8000;

// Score format
const LEADER: &str = "     ncm  22        4500";
const F007: &str = "q";
const F336B: &str = "ntm";
const F338B: &str = "nc";
const F338A: &str = "Noten";
const F3382: &str = "gnd-content";
const F935C: &str = "muno";

lazy_static! {
    static ref RECORD_ID: Regex = Regex::new(r"<recordId>(.*)</recordId>").expect("recordId pattern is valid");
    static ref WORK_TITLE_MARKER: Regex = Regex::new(r#"name="worktitle""#).expect("worktitle pattern is valid");
    static ref STRING_VALUE: Regex = Regex::new(r"<string>(.*)</string>").expect("string pattern is valid");
    static ref VIAF_ID: Regex = Regex::new(r"<viafId>(\d+)</viafId>").expect("viafId pattern is valid");
}

/// MARC language code for a language name used in IMSLP documents.
#[must_use]
pub fn language_code(name: &str) -> Option<&'static str> {
    let code = match name {
        "Ancient Greek" => "grc",
        "Armenian" => "arm",
        "Catalan" | "Catalàn" => "cat",
        "Church Slavonic" => "chu",
        "Croatian" => "hrv",
        "Czech" => "cze",
        "Danish" => "dan",
        "Deutsch" | "German" | "german" => "ger",
        "Dutch" => "dut",
        "English" => "eng",
        "Esperanto" => "epo",
        "Finnish" => "fin",
        "Français" | "french" | "French" => "fre",
        "Greek" => "ell",
        "Hebrew" => "heb",
        "Hungarian" => "hun",
        "Icelandic" => "ice",
        "Irish" => "gle",
        "Italian" | "italian" | "Italiano" | "Italien" => "ita",
        "Japanese" => "jpn",
        "Latein" | "Latin" | "latin" => "lat",
        "Middle French" => "frm",
        "Neapolitan" => "nap",
        "Norwegian" => "nor",
        "Polish" => "pol",
        "Portuguese" => "por",
        "Romanian" => "rom",
        "Russian" => "rus",
        "Serbian (Cyrillic)" | "Serbian" => "srp",
        "Spanish" => "spa",
        "Swedish" => "swe",
        "Telugu" => "tel",
        "Turkish" => "tur",
        "Ukrainian" => "ukr",
        "Welsh" => "wel",
        "Yiddish" => "yid",
        _ => return None,
    };
    Some(code)
}

/// Work title and VIAF identifier of one IMSLP record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldmapEntry {
    /// Uniform work title, used for 240 $a
    #[serde(default)]
    pub title: String,
    /// `(VIAF)<number>`, used for 100 $0
    #[serde(default)]
    pub viaf: String,
}

/// Record id to [`FieldmapEntry`].
///
/// The JSON form is `{"<id>": {"title": "...", "viaf": "(VIAF)..."}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fieldmap {
    entries: IndexMap<String, FieldmapEntry>,
}

impl Fieldmap {
    /// Parse a JSON fieldmap.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Config`] if the JSON does not have the
    /// expected shape.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON fieldmap file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            ConvertError::Config(format!("cannot read fieldmap {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Build a fieldmap by scanning the `.xml` files of a legacy export.
    ///
    /// The export is scanned line by line: a `<string>` following a
    /// `name="worktitle"` line is the work title, `<recordId>` assigns the
    /// title seen so far to that record and `<viafId>` attaches a VIAF
    /// number to the last record id.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or one of its files cannot be read.
    pub fn from_legacy_directory(dir: &Path) -> Result<Self> {
        let mut fieldmap = Fieldmap::default();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ConvertError::IoError(e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "xml") {
                continue;
            }
            fieldmap.scan_legacy_file(&fs::read_to_string(path)?);
        }
        debug!(dir = %dir.display(), entries = fieldmap.len(), "built fieldmap from legacy export");
        Ok(fieldmap)
    }

    fn scan_legacy_file(&mut self, contents: &str) {
        let mut record_id = String::new();
        let mut work_title = String::new();
        let mut after_marker = false;

        for line in contents.lines() {
            if let Some(caps) = RECORD_ID.captures(line) {
                record_id = caps[1].to_string();
                self.entries.entry(record_id.clone()).or_default().title = work_title.clone();
                continue;
            }
            if after_marker {
                if let Some(caps) = STRING_VALUE.captures(line) {
                    work_title = html_unescape(&caps[1]);
                }
            }
            after_marker = WORK_TITLE_MARKER.is_match(line);
            if let Some(caps) = VIAF_ID.captures(line) {
                self.entries.entry(record_id.clone()).or_default().viaf = format!("(VIAF){}", &caps[1]);
            }
        }
    }

    /// Entry for a record id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FieldmapEntry> {
        self.entries.get(id)
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, id: impl Into<String>, entry: FieldmapEntry) {
        self.entries.insert(id.into(), entry);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the fieldmap is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mapping for source 15.
#[derive(Debug, Clone, Default)]
pub struct ImslpMapping {
    fieldmap: Fieldmap,
    formats: FormatTable,
}

fn main_form(value: &serde_json::Value) -> &str {
    lookup(value, "mainForm")
        .and_then(value_text)
        .unwrap_or_default()
}

impl ImslpMapping {
    /// Create the mapping with a fieldmap.
    #[must_use]
    pub fn new(fieldmap: Fieldmap) -> Self {
        ImslpMapping {
            fieldmap,
            formats: FormatTable::default(),
        }
    }

    /// Epoch heading from `<subject>`.
    ///
    /// A single subject is the epoch. With several, the first is the style
    /// and the second the epoch.
    fn epoch(record: &SourceRecord) -> String {
        let subjects: Vec<_> = record.root().get("subject").into_iter().flat_map(items).collect();
        let epoch = match subjects.as_slice() {
            [] => "",
            [single] => main_form(single),
            [_style, epoch, ..] => main_form(epoch),
        };
        title_case(epoch)
    }

    fn convert(&self, record: &SourceRecord) -> Result<Mapped> {
        let id = record.text("identifier");
        if record.root_name() != "document" {
            return Ok(Mapped::skip(id, format!("unexpected root element <{}>", record.root_name())));
        }
        let Some(title) = record.get("title").and_then(value_text) else {
            return Ok(Mapped::skip(id, "missing title"));
        };
        let entry = self.fieldmap.get(&id).cloned().unwrap_or_default();

        let mut builder = MarcRecordBuilder::new(&self.formats);
        builder.set_leader_template(LEADER)?;
        builder.add_control_field("001", &finc_id(SOURCE_ID, &id));
        builder.add_control_field("007", F007);

        let language = record.text("languages");
        let code = match language_code(&language) {
            Some(code) => code.to_string(),
            None => {
                if !language.is_empty() {
                    warn!(id = %id, language = %language, "language not in language map");
                }
                language
            },
        };
        if !code.is_empty() {
            builder.add_control_field("008", &format!("130227uu20uuuuuuxx uuup{code}  c"));
            builder.add_data_field("041", &[('a', &code)]);
        }

        let creator = record.text("creator/mainForm");
        if !creator.is_empty() {
            builder.add_data_field("100", &[('a', &creator), ('e', "cmp"), ('0', &entry.viaf)]);
        }
        builder.add_data_field("240", &[('a', &entry.title)]);
        builder.add_data_field("245", &[('a', &html_unescape(title))]);
        builder.add_data_field("246", &[('a', &html_unescape(&record.text("additionalTitle")))]);
        builder.add_data_field("336", &[('b', F336B)]);
        builder.add_data_field("338", &[('b', F338B)]);
        builder.add_data_field("338", &[('a', F338A), ('2', F3382)]);

        let year = record.text("date");
        builder.add_data_field("260", &[('c', &year)]);
        builder.add_data_field("650", &[('y', &year)]);

        let abstract_text: String = record.text("abstract").chars().take(MAX_ABSTRACT_CHARS).collect();
        builder.add_data_field("500", &[('a', &abstract_text)]);

        let epoch = Self::epoch(record);
        let instrumentation = title_case(&record.text("music_arrangement_of"));
        builder.add_data_field("590", &[('a', &epoch), ('b', &instrumentation)]);

        let mut headings: Vec<String> = Vec::new();
        for heading in [&epoch, &instrumentation] {
            let heading = title_case(heading);
            if !heading.is_empty() && !headings.contains(&heading) {
                headings.push(heading);
            }
        }
        for heading in &headings {
            builder.add_data_field("689", &[('a', heading)]);
        }

        let contributor = record.text("contributor/mainForm");
        if !contributor.is_empty() {
            builder.add_data_field("700", &[('a', &contributor), ('e', "ctb")]);
        }

        let url = record.text("url");
        if !url.is_empty() {
            builder.add_data_field(
                "856",
                &[('q', "text/html"), ('3', "Petrucci Musikbibliothek"), ('u', &url)],
            );
        }
        builder.add_data_field("935", &[('c', F935C)]);
        builder.add_data_field("970", &[('c', "PN")]);
        builder.add_data_field("980", &[('a', &id), ('b', SOURCE_ID), ('c', COLLECTION)]);

        Ok(Mapped::Record(builder.into_record()))
    }
}

impl SourceMapping for ImslpMapping {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn local_id(&self, record: &InputRecord) -> String {
        match record {
            InputRecord::Xml(record) => record.text("identifier"),
            InputRecord::Marc(_) => String::new(),
        }
    }

    fn map(&self, record: &InputRecord, _parents: &ParentTitleIndex) -> Result<Mapped> {
        match record {
            InputRecord::Xml(record) => self.convert(record),
            InputRecord::Marc(_) => Ok(Mapped::skip("", "source 15 expects XML input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<document>
  <identifier type="imslp">IMSLP00042</identifier>
  <title>Nocturnes, Op.9 &amp;quot;Three&amp;quot;</title>
  <additionalTitle>Trois Nocturnes</additionalTitle>
  <creator><mainForm>Chopin, Frédéric</mainForm></creator>
  <contributor><mainForm>Mikuli, Karl</mainForm></contributor>
  <languages>French</languages>
  <date>1832</date>
  <subject><mainForm>piano piece</mainForm></subject>
  <subject><mainForm>romantic</mainForm></subject>
  <music_arrangement_of>piano</music_arrangement_of>
  <abstract>Three nocturnes.</abstract>
  <url type="imslpPage">https://imslp.org/wiki/Nocturnes,_Op.9</url>
</document>"#;

    fn mapping() -> ImslpMapping {
        let mut fieldmap = Fieldmap::default();
        fieldmap.insert(
            "IMSLP00042",
            FieldmapEntry {
                title: "Nocturnes, op. 9".to_string(),
                viaf: "(VIAF)12345".to_string(),
            },
        );
        ImslpMapping::new(fieldmap)
    }

    fn convert(mapping: &ImslpMapping, xml: &str) -> Mapped {
        let record = SourceRecord::parse(xml).unwrap();
        mapping
            .map(&InputRecord::Xml(record), &ParentTitleIndex::default())
            .unwrap()
    }

    #[test]
    fn test_score_record() {
        let Mapped::Record(out) = convert(&mapping(), DOCUMENT) else {
            panic!("record skipped");
        };
        assert_eq!(out.leader.record_type, 'c');
        assert_eq!(out.get_control_field("001"), Some("finc-15-IMSLP00042"));
        assert_eq!(out.get_control_field("007"), Some("q"));
        assert_eq!(out.subfield_value("041", 'a'), Some("fre"));
        let composer = out.get_field("100").unwrap();
        assert_eq!(composer.get_subfield('a'), Some("Chopin, Frédéric"));
        assert_eq!(composer.get_subfield('0'), Some("(VIAF)12345"));
        assert_eq!(out.subfield_value("240", 'a'), Some("Nocturnes, op. 9"));
        assert_eq!(out.subfield_value("245", 'a'), Some("Nocturnes, Op.9 \"Three\""));
        assert_eq!(out.subfield_value("590", 'a'), Some("Romantic"));
        assert_eq!(out.subfield_value("590", 'b'), Some("Piano"));
        let headings: Vec<_> = out
            .fields_by_tag("689")
            .filter_map(|f| f.get_subfield('a'))
            .collect();
        assert_eq!(headings, vec!["Romantic", "Piano"]);
        let carriers: Vec<Vec<(char, &str)>> = out
            .fields_by_tag("338")
            .map(|f| f.subfields.iter().map(|s| (s.code, s.value.as_str())).collect())
            .collect();
        assert_eq!(carriers, vec![vec![('b', "nc")], vec![('a', "Noten"), ('2', "gnd-content")]]);
        assert!(out.get_field("655").is_none());
        assert_eq!(out.subfield_value("700", 'e'), Some("ctb"));
        assert_eq!(
            out.subfield_value("856", 'u'),
            Some("https://imslp.org/wiki/Nocturnes,_Op.9")
        );
        assert_eq!(out.subfield_value("970", 'c'), Some("PN"));
    }

    #[test]
    fn test_absent_people_and_url_leave_no_fields() {
        let xml = r#"<document><identifier>IMSLP9</identifier><title>Etude</title></document>"#;
        let Mapped::Record(out) = convert(&ImslpMapping::default(), xml) else {
            panic!("record skipped");
        };
        assert_eq!(out.title(), Some("Etude"));
        assert!(out.get_field("100").is_none());
        assert!(out.get_field("700").is_none());
        assert!(out.get_field("856").is_none());
    }

    #[test]
    fn test_missing_contributor_leaves_no_700() {
        let xml = DOCUMENT.replace("<contributor><mainForm>Mikuli, Karl</mainForm></contributor>", "");
        let Mapped::Record(out) = convert(&mapping(), &xml) else {
            panic!("record skipped");
        };
        assert!(out.get_field("700").is_none());
        assert_eq!(out.subfield_value("100", 'e'), Some("cmp"));
        assert!(out.get_field("856").is_some());
    }

    #[test]
    fn test_missing_title_is_skipped() {
        let xml = DOCUMENT.replace("<title>Nocturnes, Op.9 &amp;quot;Three&amp;quot;</title>", "");
        assert!(matches!(convert(&mapping(), &xml), Mapped::Skip { .. }));
    }

    #[test]
    fn test_abstract_is_truncated() {
        let long = "ä".repeat(MAX_ABSTRACT_CHARS + 10);
        let xml = DOCUMENT.replace("Three nocturnes.", &long);
        let Mapped::Record(out) = convert(&ImslpMapping::default(), &xml) else {
            panic!("record skipped");
        };
        assert_eq!(out.subfield_value("500", 'a').unwrap().chars().count(), MAX_ABSTRACT_CHARS);
        assert!(out.get_field("240").is_none());
        assert_eq!(out.get_field("100").unwrap().get_subfield('0'), None);
    }

    #[test]
    fn test_single_subject_is_epoch() {
        let xml = DOCUMENT.replace("<subject><mainForm>piano piece</mainForm></subject>", "");
        let Mapped::Record(out) = convert(&mapping(), &xml) else {
            panic!("record skipped");
        };
        assert_eq!(out.subfield_value("590", 'a'), Some("Romantic"));
    }

    #[test]
    fn test_unknown_language_is_kept() {
        let xml = DOCUMENT.replace("<languages>French</languages>", "<languages>Klingon</languages>");
        let Mapped::Record(out) = convert(&mapping(), &xml) else {
            panic!("record skipped");
        };
        assert_eq!(out.subfield_value("041", 'a'), Some("Klingon"));
    }

    #[test]
    fn test_fieldmap_from_json() {
        let fieldmap =
            Fieldmap::from_json(r#"{"IMSLP1": {"title": "Werk"}, "IMSLP2": {"viaf": "(VIAF)1"}}"#).unwrap();
        assert_eq!(fieldmap.len(), 2);
        assert_eq!(fieldmap.get("IMSLP1").unwrap().title, "Werk");
        assert_eq!(fieldmap.get("IMSLP2").unwrap().viaf, "(VIAF)1");
        assert!(Fieldmap::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_fieldmap_from_legacy_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.xml"),
            "<doc>\n<field name=\"worktitle\">\n<string>Sonate &amp; Fuge</string>\n</field>\n\
             <recordId>IMSLP7</recordId>\n<viafId>999</viafId>\n<viafId></viafId>\n</doc>\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "<recordId>ignored</recordId>").unwrap();

        let fieldmap = Fieldmap::from_legacy_directory(dir.path()).unwrap();
        assert_eq!(fieldmap.len(), 1);
        let entry = fieldmap.get("IMSLP7").unwrap();
        assert_eq!(entry.title, "Sonate & Fuge");
        assert_eq!(entry.viaf, "(VIAF)999");
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(language_code("Deutsch"), Some("ger"));
        assert_eq!(language_code("Serbian (Cyrillic)"), Some("srp"));
        assert_eq!(language_code("Klingon"), None);
    }
}
