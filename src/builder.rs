//! Field-by-field assembly of output records.
//!
//! [`MarcRecordBuilder`] wraps a [`Record`] and enforces the conversion
//! rules: empty values never reach the record, repeated tags append, and
//! the leader comes from the [`FormatTable`] the builder was created with.
//!
//! # Examples
//!
//! ```
//! use finc_marc::{FormatLabel, FormatTable, MarcRecordBuilder, TargetEncoding};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = FormatTable::default();
//! let mut builder = MarcRecordBuilder::new(&table);
//! let rule = builder.set_leader(FormatLabel::Dvd)?;
//! builder.add_control_field("001", "finc-109-1");
//! builder.add_control_field("007", &rule.field_007);
//! builder.add_data_field("245", &[('a', "Solaris"), ('c', "")]);
//!
//! assert_eq!(builder.record().get_field("245").unwrap().subfields.len(), 1);
//! let bytes = builder.serialize(TargetEncoding::Utf8)?;
//! assert_eq!(&bytes[5..8], b"ngm");
//! # Ok(())
//! # }
//! ```

use crate::encoding::TargetEncoding;
use crate::error::Result;
use crate::format_table::{FormatLabel, FormatRule, FormatTable};
use crate::leader::Leader;
use crate::record::{Field, Record};
use crate::writer::serialize_record;

/// Builder for one output record.
#[derive(Debug, Clone)]
pub struct MarcRecordBuilder<'t> {
    formats: &'t FormatTable,
    record: Record,
}

impl<'t> MarcRecordBuilder<'t> {
    /// Start an empty record with a blank leader.
    #[must_use]
    pub fn new(formats: &'t FormatTable) -> Self {
        MarcRecordBuilder {
            formats,
            record: Record::new(Leader::default()),
        }
    }

    /// Set the leader for `label` and return its rule.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::UnknownFormat`](crate::ConvertError::UnknownFormat)
    /// if the table has no entry for `label`.
    pub fn set_leader(&mut self, label: FormatLabel) -> Result<&'t FormatRule> {
        let formats = self.formats;
        let rule = formats.get(label)?;
        self.record.leader = rule.leader()?;
        Ok(rule)
    }

    /// Set a fixed leader from a 24-character template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not a valid leader, see
    /// [`Leader::from_template`].
    pub fn set_leader_template(&mut self, template: &str) -> Result<()> {
        self.record.leader = Leader::from_template(template)?;
        Ok(())
    }

    /// Use `leader` as is. Length and base address are recomputed on
    /// serialization.
    pub fn set_leader_value(&mut self, leader: Leader) {
        self.record.leader = leader;
    }

    /// Add a control field. Empty data is dropped.
    pub fn add_control_field(&mut self, tag: &str, data: &str) {
        if data.is_empty() {
            return;
        }
        self.record
            .add_control_field(tag.to_string(), data.to_string());
    }

    /// Add a data field with blank indicators.
    ///
    /// Pairs with empty values are dropped; if none remain, nothing is added.
    pub fn add_data_field(&mut self, tag: &str, pairs: &[(char, &str)]) {
        self.add_data_field_with_indicators(tag, ' ', ' ', pairs);
    }

    /// Add a data field with explicit indicators, dropping empty values.
    pub fn add_data_field_with_indicators(
        &mut self,
        tag: &str,
        indicator1: char,
        indicator2: char,
        pairs: &[(char, &str)],
    ) {
        let mut field = Field::new(tag.to_string(), indicator1, indicator2);
        for (code, value) in pairs {
            field.add_subfield_str(*code, value);
        }
        self.add_field(field);
    }

    /// Add an existing field, dropping its empty subfields.
    pub fn add_field(&mut self, mut field: Field) {
        field.retain_non_empty();
        if field.subfields.is_empty() {
            return;
        }
        self.record.add_field(field);
    }

    /// The record built so far.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Finish building.
    #[must_use]
    pub fn into_record(self) -> Record {
        self.record
    }

    /// Serialize the current state to ISO 2709 bytes. No I/O.
    ///
    /// # Errors
    ///
    /// See [`serialize_record`].
    pub fn serialize(&self, encoding: TargetEncoding) -> Result<Vec<u8>> {
        serialize_record(&self.record, encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use crate::reader::MarcReader;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn test_leader_from_label() {
        let table = FormatTable::default();
        let mut builder = MarcRecordBuilder::new(&table);
        let rule = builder.set_leader(FormatLabel::Mehrbaende).unwrap();
        assert_eq!(rule.field_007, "tu");

        let bytes = builder.serialize(TargetEncoding::Utf8).unwrap();
        assert_eq!(&bytes[5..12], b"cam a22");
        assert_eq!(&bytes[19..24], b"a4500");
    }

    #[test]
    fn test_unknown_label_is_lookup_error() {
        let table = FormatTable::from_rules([]);
        let mut builder = MarcRecordBuilder::new(&table);
        assert!(matches!(
            builder.set_leader(FormatLabel::Buch),
            Err(ConvertError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_empty_values_dropped() {
        let table = FormatTable::default();
        let mut builder = MarcRecordBuilder::new(&table);
        builder.add_control_field("008", "");
        builder.add_data_field("773", &[('w', "")]);
        builder.add_data_field("245", &[('a', "Titel"), ('c', ""), ('p', "Teil")]);

        let record = builder.record();
        assert!(record.control_fields.is_empty());
        assert!(record.get_field("773").is_none());
        let codes: Vec<char> = record.get_field("245").unwrap().subfields.iter().map(|s| s.code).collect();
        assert_eq!(codes, vec!['a', 'p']);
    }

    #[test]
    fn test_repeated_tags_append() {
        let table = FormatTable::default();
        let mut builder = MarcRecordBuilder::new(&table);
        builder.add_data_field("020", &[('a', "3-89472-512-4")]);
        builder.add_data_field("020", &[('a', "978-3-89472-512-1")]);
        assert_eq!(builder.record().fields_by_tag("020").count(), 2);
    }

    #[test]
    fn test_template_leader() {
        let table = FormatTable::default();
        let mut builder = MarcRecordBuilder::new(&table);
        builder.set_leader_template("     nab  22        4500").unwrap();
        assert_eq!(builder.record().leader.bibliographic_level, 'b');
        assert!(builder.set_leader_template("short").is_err());
    }

    #[test]
    fn test_roundtrip_per_label() {
        let table = FormatTable::default();
        for label in [
            FormatLabel::Buch,
            FormatLabel::Mehrbaende,
            FormatLabel::Dvd,
            FormatLabel::BluRay,
            FormatLabel::Cd,
            FormatLabel::Videokassette,
            FormatLabel::Loseblattsammlung,
            FormatLabel::Aufsatz,
            FormatLabel::Objekt,
            FormatLabel::Zeitschrift,
        ] {
            let mut builder = MarcRecordBuilder::new(&table);
            let rule = builder.set_leader(label).unwrap();
            builder.add_control_field("001", "finc-109-7");
            builder.add_control_field("007", &rule.field_007);
            builder.add_control_field("008", rule.field_008.as_deref().unwrap_or_default());
            builder.add_data_field("245", &[('a', "Über Filme"), ('p', "Band 1")]);
            builder.add_data_field(
                "935",
                &[
                    ('b', rule.field_935b.as_deref().unwrap_or_default()),
                    ('c', rule.field_935c.as_deref().unwrap_or_default()),
                ],
            );

            let bytes = builder.serialize(TargetEncoding::Utf8).unwrap();
            let parsed = MarcReader::new(Cursor::new(bytes)).read_record().unwrap().unwrap();

            let mut expected = builder.record().leader.clone();
            expected.character_coding = 'a';
            assert_eq!(parsed.leader.record_status, expected.record_status, "{label}");
            assert_eq!(parsed.leader.record_type, expected.record_type, "{label}");
            assert_eq!(parsed.leader.bibliographic_level, expected.bibliographic_level, "{label}");
            assert_eq!(parsed.leader.multipart_level, expected.multipart_level, "{label}");
            assert_eq!(parsed.leader.character_coding, 'a');
            assert_eq!(parsed.subfield_triples(), builder.record().subfield_triples(), "{label}");
            assert_eq!(parsed.get_control_field("007"), Some(rule.field_007.as_str()));
        }
    }

    proptest! {
        #[test]
        fn prop_empty_pairs_never_stored(
            values in prop::collection::vec(prop_oneof!["", "[a-z]{1,5}"], 1..8)
        ) {
            let table = FormatTable::default();
            let mut builder = MarcRecordBuilder::new(&table);
            let pairs: Vec<(char, &str)> = values.iter().map(|v| ('a', v.as_str())).collect();
            builder.add_data_field("500", &pairs);

            let non_empty = values.iter().filter(|v| !v.is_empty()).count();
            let stored = builder
                .record()
                .get_field("500")
                .map_or(0, |f| f.subfields.len());
            prop_assert_eq!(stored, non_empty);
            prop_assert!(builder.record().fields().all(|f| f.subfields.iter().all(|s| !s.value.is_empty())));
        }
    }
}
