//! Source 109: Kunsthochschule für Medien Köln.
//!
//! The export is one XML file of `<record>` elements in a numbered
//! datafield schema (`331` title, `433` extent, `540` ISBN, ...).
//! Multi-volume works are split into a parent record and child records
//! that name the parent in `010 $a`; a child's title is rendered as
//! `245 $a` parent title, `$p` own title, with a `773 $w` link back to the
//! parent. This needs the parent index pass.

use super::{as_pairs, finc_id, imprint, remove_brackets};
use crate::builder::MarcRecordBuilder;
use crate::classify::{Classification, FormatClassifier, FormatSignals};
use crate::driver::{InputRecord, Mapped, ParentIndexBuilder, ParentTitleIndex, SourceMapping};
use crate::error::Result;
use crate::extract::FieldExtractor;
use crate::format_table::FormatTable;
use crate::source_record::SourceRecord;
use tracing::debug;

const SOURCE_ID: &str = "109";
const COLLECTION: &str = "sid-109-col-kunsthochschulekoeln";
const PARENT_PREFIX: &str = "(DE-576)";
const DEFAULT_LINK_NOTE: &str = "zusätzliche Informationen";

/// Mapping for source 109.
#[derive(Debug, Clone, Default)]
pub struct KhmMapping {
    formats: FormatTable,
    classifier: FormatClassifier,
    extractor: FieldExtractor,
}

impl KhmMapping {
    /// Create the mapping with the given format table and the default cascade.
    #[must_use]
    pub fn new(formats: FormatTable) -> Self {
        KhmMapping {
            formats,
            classifier: FormatClassifier::default(),
            extractor: FieldExtractor::default(),
        }
    }

    fn field(&self, record: &SourceRecord, tag: &str) -> String {
        self.extractor.value(record, tag, "a")
    }

    fn convert(&self, record: &SourceRecord, parents: &ParentTitleIndex) -> Result<Mapped> {
        let id = self.field(record, "001");
        let parent_id = self.field(record, "010");
        let title = self.field(record, "331");

        if title.is_empty() {
            return Ok(Mapped::skip(id, "missing title"));
        }
        if title.contains("Brockhaus") {
            return Ok(Mapped::skip(id, "excluded reference work"));
        }

        let (f245a, f245p, f773w) = match parents.title(&parent_id) {
            Some(parent_title) if !parent_id.is_empty() => (
                parent_title.to_string(),
                title.clone(),
                format!("{PARENT_PREFIX}{parent_id}"),
            ),
            _ => (title.clone(), String::new(), String::new()),
        };

        let extent = self.field(record, "433");
        let isbn = self.field(record, "540");
        let signals = FormatSignals::new(&extent, !isbn.is_empty(), parents.is_parent(&id));
        let label = match self.classifier.classify(&signals) {
            Classification::Format(label) => label,
            Classification::Skip => return Ok(Mapped::skip(id, "journal without ISBN")),
        };
        debug!(id = %id, format = %label, "classified");

        let mut builder = MarcRecordBuilder::new(&self.formats);
        let rule = builder.set_leader(label)?;

        builder.add_control_field("001", &finc_id(SOURCE_ID, &id));
        builder.add_control_field("007", &rule.field_007);
        builder.add_control_field("008", rule.field_008.as_deref().unwrap_or_default());

        builder.add_data_field("020", &[('a', &isbn)]);
        builder.add_data_field("020", &[('a', &self.field(record, "570"))]);
        builder.add_data_field("041", &[('a', &self.field(record, "037"))]);
        builder.add_data_field("100", &[('a', &remove_brackets(&self.field(record, "100")))]);

        builder.add_data_field(
            "245",
            &[
                ('a', &remove_brackets(&f245a)),
                ('c', &self.field(record, "359")),
                ('p', &remove_brackets(&f245p)),
            ],
        );

        let f260 = imprint(
            &self.field(record, "410"),
            &remove_brackets(&self.field(record, "412")),
            &self.field(record, "425"),
        );
        builder.add_data_field("260", &as_pairs(&f260));

        builder.add_data_field(
            "300",
            &[('a', &remove_brackets(&extent)), ('b', &self.field(record, "434"))],
        );

        let series = self.field(record, "451");
        match series.split_once(" ; ") {
            Some((name, volume)) if !volume.contains(" ; ") => {
                builder.add_data_field("490", &[('a', name), ('v', volume)]);
            },
            _ => builder.add_data_field("490", &[('a', &series)]),
        }

        for tag in ["710", "711"] {
            let mut subjects: Vec<String> = Vec::new();
            for subject in self.extractor.values(record, tag, "a") {
                let subject = remove_brackets(&subject);
                if !subjects.contains(&subject) {
                    subjects.push(subject);
                }
            }
            for subject in &subjects {
                builder.add_data_field("650", &[('a', subject)]);
            }
        }

        for tag in 101..200 {
            let person = remove_brackets(&self.field(record, &tag.to_string()));
            builder.add_data_field("700", &[('a', &person)]);
        }
        for tag in 200..300 {
            let body = remove_brackets(&self.field(record, &tag.to_string()));
            builder.add_data_field("710", &[('a', &body)]);
        }

        builder.add_data_field("773", &[('w', &f773w)]);

        let url = self.extractor.value(record, "655", "u");
        if url.contains("http") {
            let note = self.extractor.value(record, "655", "x");
            let note = if note.is_empty() { DEFAULT_LINK_NOTE } else { note.as_str() };
            builder.add_data_field("856", &[('q', "text/html"), ('3', note), ('u', &url)]);
        }

        builder.add_data_field(
            "935",
            &[
                ('b', rule.field_935b.as_deref().unwrap_or_default()),
                ('c', rule.field_935c.as_deref().unwrap_or_default()),
            ],
        );
        builder.add_data_field("980", &[('a', &id), ('b', SOURCE_ID), ('c', COLLECTION)]);

        Ok(Mapped::Record(builder.into_record()))
    }
}

impl SourceMapping for KhmMapping {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn needs_parent_index(&self) -> bool {
        true
    }

    fn index_record(&self, record: &InputRecord, index: &mut ParentIndexBuilder) {
        if let InputRecord::Xml(record) = record {
            index.reference_parent(&self.field(record, "010"));
            index.record_title(&self.field(record, "001"), &self.field(record, "331"));
        }
    }

    fn local_id(&self, record: &InputRecord) -> String {
        match record {
            InputRecord::Xml(record) => self.field(record, "001"),
            InputRecord::Marc(_) => String::new(),
        }
    }

    fn map(&self, record: &InputRecord, parents: &ParentTitleIndex) -> Result<Mapped> {
        match record {
            InputRecord::Xml(record) => self.convert(record, parents),
            InputRecord::Marc(_) => Ok(Mapped::skip("", "source 109 expects XML input")),
        }
    }
}
