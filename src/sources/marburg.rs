//! Source 73: MEDIENwissenschaft: Rezensionen | Reviews (Marburg).
//!
//! Input is an OAI-style DataCite export with one `<Record>` per review.
//! Identifiers are OAI identifiers, encoded as unpadded base64 to get a
//! stable local id. Whole-issue records are left out.

use super::finc_id;
use crate::builder::MarcRecordBuilder;
use crate::driver::{InputRecord, Mapped, ParentTitleIndex, SourceMapping};
use crate::error::Result;
use crate::format_table::FormatTable;
use crate::source_record::{items, lookup, value_text, SourceRecord};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use serde_json::Value;
use tracing::warn;

const SOURCE_ID: &str = "73";
const COLLECTION: &str = "sid-73-col-medienw";
const LEADER: &str = "     nab  22        4500";
const JOURNAL_TITLE: &str = "MEDIENwissenschaft: Rezensionen | Reviews";
const RESOURCE: &str = "metadata/resource";

/// Mapping for source 73.
#[derive(Debug, Clone, Default)]
pub struct MarburgMapping {
    formats: FormatTable,
}

fn language_code(language: &str) -> Option<&'static str> {
    match language {
        "" | "de" | "deu" => Some("ger"),
        _ => None,
    }
}

/// Local identifier: the OAI identifier as unpadded base64.
#[must_use]
pub fn local_id(oai_identifier: &str) -> String {
    STANDARD_NO_PAD.encode(oai_identifier.as_bytes())
}

/// Split `Main: Sub: Rest: More` into `245 $a` "Main - Sub" and `$b` "Rest : More".
#[must_use]
pub fn split_title(title: &str) -> (String, String) {
    let mut parts = title.split(':').map(|part| part.trim_matches(' '));
    let mut main = parts.next().unwrap_or_default().to_string();
    if let Some(sub) = parts.next() {
        main.push_str(" - ");
        main.push_str(sub);
    }
    let rest: Vec<&str> = parts.collect();
    let remainder = rest.join(" : ");
    (main, remainder.trim_end_matches([' ', ':']).to_string())
}

impl MarburgMapping {
    /// Create the mapping.
    #[must_use]
    pub fn new() -> Self {
        MarburgMapping::default()
    }

    fn resource<'r>(&self, record: &'r SourceRecord, path: &str) -> Option<&'r Value> {
        record.get(RESOURCE).and_then(|resource| lookup(resource, path))
    }

    fn resource_text(&self, record: &SourceRecord, path: &str) -> String {
        self.resource(record, path)
            .and_then(value_text)
            .unwrap_or_default()
            .to_string()
    }

    /// First related identifier of the given type.
    fn related_identifier(&self, record: &SourceRecord, kind: &str) -> String {
        self.resource(record, "relatedIdentifiers/relatedIdentifier")
            .into_iter()
            .flat_map(items)
            .find(|identifier| {
                identifier.get("@relatedIdentifierType").and_then(Value::as_str) == Some(kind)
            })
            .and_then(value_text)
            .unwrap_or_default()
            .to_string()
    }

    fn creator(&self, record: &SourceRecord) -> String {
        let Some(creator) = self.resource(record, "creators/creator").into_iter().flat_map(items).next()
        else {
            return String::new();
        };
        lookup(creator, "creatorName")
            .and_then(value_text)
            .or_else(|| value_text(creator))
            .unwrap_or_default()
            .to_string()
    }

    fn convert(&self, record: &SourceRecord) -> Result<Mapped> {
        let oai_id = record.text("header/identifier");
        let id = local_id(&oai_id);

        let title = match self.resource(record, "titles/title") {
            Some(Value::Array(_)) => {
                return Ok(Mapped::skip(oai_id, "title is not a single string"));
            },
            Some(value) => value_text(value).unwrap_or_default().to_string(),
            None => String::new(),
        };
        if title.contains(JOURNAL_TITLE) {
            return Ok(Mapped::skip(oai_id, "whole journal issue"));
        }
        if title.trim().is_empty() {
            return Ok(Mapped::skip(oai_id, "missing title"));
        }

        let mut builder = MarcRecordBuilder::new(&self.formats);
        builder.set_leader_template(LEADER)?;
        builder.add_control_field("001", &finc_id(SOURCE_ID, &id));
        builder.add_control_field("007", "cr");

        builder.add_data_field("022", &[('a', &self.related_identifier(record, "ISSN"))]);

        let language = self.resource_text(record, "language");
        match language_code(&language) {
            Some(code) => {
                builder.add_control_field("008", &format!("130227uu20uuuuuuxx uuup{code}  c"));
                builder.add_data_field("041", &[('a', code)]);
            },
            None => warn!(id = %oai_id, language = %language, "language not in language map"),
        }

        builder.add_data_field("100", &[('a', &self.creator(record))]);

        let (f245a, f245b) = split_title(&title);
        builder.add_data_field("245", &[('a', &f245a), ('b', &f245b)]);

        let year = self.resource_text(record, "publicationYear");
        builder.add_data_field(
            "260",
            &[('a', "Marburg"), ('b', " : Schüren Verlag, "), ('c', &year)],
        );

        let rights = self
            .resource(record, "rightsList/rights")
            .into_iter()
            .flat_map(items)
            .next()
            .and_then(value_text)
            .unwrap_or_default();
        builder.add_data_field("500", &[('a', rights)]);

        for subject in self
            .resource(record, "subjects")
            .and_then(|subjects| subjects.get("subject"))
            .into_iter()
            .flat_map(items)
            .filter_map(value_text)
        {
            builder.add_data_field("650", &[('a', subject)]);
        }

        let host_year = if year.is_empty() { String::new() } else { format!("({year})") };
        builder.add_data_field("773", &[('g', &host_year), ('t', JOURNAL_TITLE)]);

        let url = self.related_identifier(record, "URL");
        if !url.is_empty() {
            builder.add_data_field(
                "856",
                &[('q', "text/html"), ('3', "Link zur Ressource"), ('u', &url)],
            );
        }

        builder.add_data_field("935", &[('b', "cofz")]);
        builder.add_data_field("980", &[('a', &id), ('b', SOURCE_ID), ('c', COLLECTION)]);

        Ok(Mapped::Record(builder.into_record()))
    }
}

impl SourceMapping for MarburgMapping {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn local_id(&self, record: &InputRecord) -> String {
        match record {
            InputRecord::Xml(record) => record.text("header/identifier"),
            InputRecord::Marc(_) => String::new(),
        }
    }

    fn map(&self, record: &InputRecord, _parents: &ParentTitleIndex) -> Result<Mapped> {
        match record {
            InputRecord::Xml(record) => self.convert(record),
            InputRecord::Marc(_) => Ok(Mapped::skip("", "source 73 expects XML input")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW: &str = r#"<Record>
      <header><identifier>oai:archiv.ub.uni-marburg.de:ubfind/1</identifier></header>
      <metadata>
        <dcite:resource xmlns:dcite="http://datacite.org/schema/kernel-4">
          <dcite:creators>
            <dcite:creator><dcite:creatorName nameType="Personal">Muster, Erika</dcite:creatorName></dcite:creator>
            <dcite:creator><dcite:creatorName nameType="Personal">Beispiel, Max</dcite:creatorName></dcite:creator>
          </dcite:creators>
          <dcite:titles><dcite:title>Kino: Theorie: Bedeutung und Gef&#xE4;hrdung: der Sinne</dcite:title></dcite:titles>
          <dcite:publicationYear>2019</dcite:publicationYear>
          <dcite:language>de</dcite:language>
          <dcite:subjects><dcite:subject>Film</dcite:subject><dcite:subject/><dcite:subject>Medien</dcite:subject></dcite:subjects>
          <dcite:rightsList><dcite:rights>CC BY 4.0</dcite:rights></dcite:rightsList>
          <dcite:relatedIdentifiers>
            <dcite:relatedIdentifier relatedIdentifierType="URL">https://example.org/1</dcite:relatedIdentifier>
            <dcite:relatedIdentifier relatedIdentifierType="ISSN">1234-5678</dcite:relatedIdentifier>
          </dcite:relatedIdentifiers>
        </dcite:resource>
      </metadata>
    </Record>"#;

    fn convert(xml: &str) -> Mapped {
        let record = SourceRecord::parse(xml).unwrap();
        MarburgMapping::new()
            .map(&InputRecord::Xml(record), &ParentTitleIndex::default())
            .unwrap()
    }

    #[test]
    fn test_review_record() {
        let Mapped::Record(out) = convert(REVIEW) else {
            panic!("record skipped");
        };
        let id = local_id("oai:archiv.ub.uni-marburg.de:ubfind/1");
        assert!(!id.ends_with('='));
        assert_eq!(out.get_control_field("001"), Some(format!("finc-73-{id}").as_str()));
        assert_eq!(out.leader.bibliographic_level, 'b');
        assert_eq!(out.subfield_value("022", 'a'), Some("1234-5678"));
        assert_eq!(out.subfield_value("041", 'a'), Some("ger"));
        assert!(out.get_control_field("008").unwrap().contains("pger"));
        assert_eq!(out.subfield_value("100", 'a'), Some("Muster, Erika"));
        assert_eq!(out.subfield_value("245", 'a'), Some("Kino - Theorie"));
        assert_eq!(out.subfield_value("245", 'b'), Some("Bedeutung und Gefährdung : der Sinne"));
        assert_eq!(out.subfield_value("500", 'a'), Some("CC BY 4.0"));
        assert_eq!(out.fields_by_tag("650").count(), 2);
        assert_eq!(out.subfield_value("773", 'g'), Some("(2019)"));
        assert_eq!(out.subfield_value("856", 'u'), Some("https://example.org/1"));
        assert_eq!(out.subfield_value("980", 'a'), Some(id.as_str()));
    }

    #[test]
    fn test_issue_record_is_skipped() {
        let xml = REVIEW.replace(
            "Kino: Theorie: Bedeutung und Gef&#xE4;hrdung: der Sinne",
            "MEDIENwissenschaft: Rezensionen | Reviews 3/2019",
        );
        assert!(matches!(convert(&xml), Mapped::Skip { .. }));
    }

    #[test]
    fn test_unknown_language_omits_language_fields() {
        let xml = REVIEW.replace("<dcite:language>de</dcite:language>", "<dcite:language>fr</dcite:language>");
        let Mapped::Record(out) = convert(&xml) else {
            panic!("record skipped");
        };
        assert!(out.get_field("041").is_none());
        assert!(out.get_control_field("008").is_none());
    }

    #[test]
    fn test_split_title() {
        assert_eq!(split_title("Titel"), ("Titel".to_string(), String::new()));
        assert_eq!(split_title("A : B"), ("A - B".to_string(), String::new()));
        assert_eq!(split_title("A: B: C: D"), ("A - B".to_string(), "C : D".to_string()));
    }

    #[test]
    fn test_local_id_is_unpadded_base64() {
        assert_eq!(local_id("ab"), "YWI");
    }
}
