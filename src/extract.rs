//! Tolerant datafield/subfield lookups on MARC-shaped XML exports.
//!
//! Many institutional exports encode records as
//! `<datafield tag="..."><subfield code="...">value</subfield></datafield>`.
//! After conversion to a [`SourceRecord`] a field list may be a single
//! mapping or an array, and so may each field's subfield list.
//! [`FieldExtractor`] handles both shapes the same way.
//!
//! Absence is data, not failure: a missing tag or code yields `""` in
//! single-value mode and an empty vector in multi-value mode.

use crate::source_record::{items, value_text, SourceRecord};
use serde_json::Value;

/// Element and attribute names used to locate fields and subfields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExtractor {
    field_element: String,
    tag_attribute: String,
    subfield_element: String,
    code_attribute: String,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        FieldExtractor::new("datafield", "tag", "subfield", "code")
    }
}

impl FieldExtractor {
    /// Create an extractor for a custom export schema.
    ///
    /// Attribute names are given without the `@` prefix.
    #[must_use]
    pub fn new(
        field_element: &str,
        tag_attribute: &str,
        subfield_element: &str,
        code_attribute: &str,
    ) -> Self {
        FieldExtractor {
            field_element: field_element.to_string(),
            tag_attribute: format!("@{tag_attribute}"),
            subfield_element: subfield_element.to_string(),
            code_attribute: format!("@{code_attribute}"),
        }
    }

    /// First value of subfield `code` in any field tagged `tag`, or `""`.
    #[must_use]
    pub fn value(&self, record: &SourceRecord, tag: &str, code: &str) -> String {
        self.matches(record, tag, code)
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// All values of subfield `code` in fields tagged `tag`, in document order.
    ///
    /// Empty subfield elements count as `""` occurrences.
    #[must_use]
    pub fn values(&self, record: &SourceRecord, tag: &str, code: &str) -> Vec<String> {
        self.matches(record, tag, code).map(str::to_string).collect()
    }

    /// Whether the record has at least one field tagged `tag`.
    #[must_use]
    pub fn has_field(&self, record: &SourceRecord, tag: &str) -> bool {
        self.fields(record, tag).next().is_some()
    }

    fn fields<'r>(&'r self, record: &'r SourceRecord, tag: &'r str) -> impl Iterator<Item = &'r Value> {
        record
            .root()
            .get(&self.field_element)
            .into_iter()
            .flat_map(items)
            .filter(move |field| attribute(field, &self.tag_attribute) == Some(tag))
    }

    fn matches<'r>(
        &'r self,
        record: &'r SourceRecord,
        tag: &'r str,
        code: &'r str,
    ) -> impl Iterator<Item = &'r str> {
        self.fields(record, tag)
            .filter_map(move |field| field.get(&self.subfield_element))
            .flat_map(items)
            .filter(move |subfield| attribute(subfield, &self.code_attribute) == Some(code))
            .map(|subfield| value_text(subfield).unwrap_or_default())
    }
}

fn attribute<'v>(value: &'v Value, name: &str) -> Option<&'v str> {
    value.get(name).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(xml: &str) -> SourceRecord {
        SourceRecord::parse(xml).unwrap()
    }

    #[test]
    fn test_single_field_single_subfield() {
        let r = record(r#"<record><datafield tag="001"><subfield code="a">4711</subfield></datafield></record>"#);
        let extractor = FieldExtractor::default();
        assert_eq!(extractor.value(&r, "001", "a"), "4711");
        assert_eq!(extractor.values(&r, "001", "a"), vec!["4711"]);
    }

    #[test]
    fn test_repeated_fields_and_subfields_in_order() {
        let r = record(
            r#"<record>
                 <datafield tag="710"><subfield code="a">Film</subfield><subfield code="a">Kino</subfield></datafield>
                 <datafield tag="331"><subfield code="a">Titel</subfield></datafield>
                 <datafield tag="710"><subfield code="a">Theater</subfield></datafield>
               </record>"#,
        );
        let extractor = FieldExtractor::default();
        assert_eq!(extractor.value(&r, "710", "a"), "Film");
        assert_eq!(
            extractor.values(&r, "710", "a"),
            vec!["Film", "Kino", "Theater"]
        );
    }

    #[test]
    fn test_missing_is_empty() {
        let r = record(r#"<record><datafield tag="331"><subfield code="a">Titel</subfield></datafield></record>"#);
        let extractor = FieldExtractor::default();
        assert_eq!(extractor.value(&r, "100", "a"), "");
        assert_eq!(extractor.value(&r, "331", "b"), "");
        assert!(extractor.values(&r, "100", "a").is_empty());
        assert!(!extractor.has_field(&r, "100"));

        let bare = record("<record/>");
        assert_eq!(extractor.value(&bare, "331", "a"), "");
    }

    #[test]
    fn test_empty_subfield_counts_as_occurrence() {
        let r = record(
            r#"<record><datafield tag="655"><subfield code="x"/><subfield code="x">Inhalt</subfield></datafield></record>"#,
        );
        let extractor = FieldExtractor::default();
        assert_eq!(extractor.values(&r, "655", "x"), vec!["", "Inhalt"]);
        assert_eq!(extractor.value(&r, "655", "x"), "");
    }

    #[test]
    fn test_custom_schema() {
        let r = record(r#"<rec><fld id="245"><sf c="a">Titel</sf></fld></rec>"#);
        let extractor = FieldExtractor::new("fld", "id", "sf", "c");
        assert_eq!(extractor.value(&r, "245", "a"), "Titel");
    }

    fn build_xml(fields: &[(u8, Vec<(char, String)>)]) -> String {
        let mut xml = String::from("<record>");
        for (tag, subfields) in fields {
            xml.push_str(&format!(r#"<datafield tag="{:03}">"#, 100 + u32::from(*tag)));
            for (code, value) in subfields {
                xml.push_str(&format!(r#"<subfield code="{code}">{value}</subfield>"#));
            }
            xml.push_str("</datafield>");
        }
        xml.push_str("</record>");
        xml
    }

    proptest! {
        #[test]
        fn prop_multi_value_counts_and_order(
            fields in prop::collection::vec(
                (0u8..3, prop::collection::vec((prop::sample::select(vec!['a', 'b']), "[A-Za-z]{1,8}"), 0..4)),
                0..6,
            )
        ) {
            let r = record(&build_xml(&fields));
            let extractor = FieldExtractor::default();
            for tag in 0u8..3 {
                let tag_str = format!("{:03}", 100 + u32::from(tag));
                let expected: Vec<String> = fields
                    .iter()
                    .filter(|(t, _)| *t == tag)
                    .flat_map(|(_, sfs)| sfs.iter().filter(|(c, _)| *c == 'a').map(|(_, v)| v.clone()))
                    .collect();
                let first = expected.first().cloned().unwrap_or_default();
                prop_assert_eq!(extractor.values(&r, &tag_str, "a"), expected);
                prop_assert_eq!(extractor.value(&r, &tag_str, "a"), first);
            }
            prop_assert_eq!(extractor.value(&r, "999", "z"), "");
        }
    }
}
