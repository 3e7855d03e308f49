//! Source 148: Bundesarchiv Filmarchiv.
//!
//! Input is already MARC. Most fields are copied unchanged; the mapping
//! adds the finc identifier, cleans the ISBN, derives a 689 heading from
//! the first 650, rewrites the host item link and attaches the catalogue
//! link and collection fields.

use super::finc_id;
use crate::builder::MarcRecordBuilder;
use crate::driver::{InputRecord, Mapped, ParentTitleIndex, SourceMapping};
use crate::error::Result;
use crate::format_table::FormatTable;
use crate::record::{is_control_tag, Record};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

const SOURCE_ID: &str = "148";
const COLLECTION: &str = "sid-148-col-bundesarchivfilm";
const CATALOGUE_URL: &str = "https://apps.bundesarchiv.de/F?func=find-c&ccl_term=SYS%3D";

/// Tags copied from the input record unchanged, in output order.
pub const COPY_TAGS: &[&str] = &[
    "002", "003", "004", "005", "006", "008", "009", "010", "011", "012", "013", "014", "016",
    "017", "018", "022", "024", "030", "035", "040", "041", "100", "110", "111", "240", "242",
    "243", "245", "246", "247", "249", "250", "260", "263", "300", "310", "362", "490", "500",
    "501", "502", "504", "505", "510", "515", "516", "538", "546", "547", "550", "590", "600",
    "610", "611", "630", "648", "649", "651", "655", "700", "710", "711", "730", "770", "772",
    "775", "776", "780", "785", "787", "800", "810", "811", "830", "856", "906", "982", "999",
];

lazy_static! {
    static ref ISBN: Regex = Regex::new(r"([0-9xX-]{10,17})").expect("ISBN pattern is valid");
}

/// Normalize separators in an ISBN and cut it out of surrounding text.
///
/// Returns `None` when nothing ISBN-like remains.
#[must_use]
pub fn clean_isbn(raw: &str) -> Option<String> {
    let normalized = raw.replace([' ', '.'], "-");
    ISBN.captures(&normalized)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('-').to_string())
}

/// Mapping for source 148.
#[derive(Debug, Clone, Default)]
pub struct BundesarchivMapping {
    formats: FormatTable,
}

impl BundesarchivMapping {
    /// Create the mapping.
    #[must_use]
    pub fn new() -> Self {
        BundesarchivMapping::default()
    }

    fn convert(&self, input: &Record) -> Mapped {
        let Some(id) = input.get_control_field("001").filter(|id| !id.is_empty()) else {
            return Mapped::skip("", "missing 001");
        };
        if input.subfield_value("245", 'a').map_or(true, str::is_empty) {
            return Mapped::skip(id, "missing title");
        }

        let mut builder = MarcRecordBuilder::new(&self.formats);
        let mut leader = input.leader.clone();
        leader.record_length = 0;
        leader.data_base_address = 0;
        builder.set_leader_value(leader);

        builder.add_control_field("001", &finc_id(SOURCE_ID, id));
        builder.add_control_field("007", "tu");

        if let Some(raw) = input.get_field("020").and_then(|f| f.get_subfield('a')) {
            match clean_isbn(raw) {
                Some(isbn) => builder.add_data_field("020", &[('a', &isbn)]),
                None => info!(id = %id, isbn = %raw, "ISBN does not look like an ISBN"),
            }
        }

        for tag in COPY_TAGS {
            if is_control_tag(tag) {
                for value in input.control_fields_by_tag(tag) {
                    builder.add_control_field(tag, value);
                }
            } else {
                for field in input.fields_by_tag(tag) {
                    builder.add_field(field.clone());
                }
            }
        }

        let subject = input
            .get_field("650")
            .and_then(|f| f.get_subfield('a'))
            .unwrap_or_default();
        builder.add_data_field("689", &[('a', subject)]);

        let host = input.get_field("773");
        let host_subfield = |code| host.and_then(|f| f.get_subfield(code)).unwrap_or_default();
        let host_id = host_subfield('w');
        let host_link = if host_id.is_empty() {
            String::new()
        } else {
            format!("(DE-576){host_id}")
        };
        builder.add_data_field(
            "773",
            &[('g', host_subfield('g')), ('t', host_subfield('t')), ('w', &host_link)],
        );

        builder.add_data_field(
            "856",
            &[
                ('q', "text/html"),
                ('3', "Link zum Bundesarchiv"),
                ('u', &format!("{CATALOGUE_URL}{id}&local_base=BAB01")),
            ],
        );
        builder.add_data_field("912", &[('a', "vkfilm")]);
        builder.add_data_field("980", &[('a', id), ('b', SOURCE_ID), ('c', COLLECTION)]);

        Mapped::Record(builder.into_record())
    }
}

impl SourceMapping for BundesarchivMapping {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn map(&self, record: &InputRecord, _parents: &ParentTitleIndex) -> Result<Mapped> {
        Ok(match record {
            InputRecord::Marc(record) => self.convert(record),
            InputRecord::Xml(_) => Mapped::skip("", "source 148 expects MARC input"),
        })
    }
}
