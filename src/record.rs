//! MARC record structures and operations.
//!
//! This module provides the core record types produced by conversions:
//! - [`Record`] — Leader plus control and data fields
//! - [`Field`] — Variable data fields (010+)
//! - [`Subfield`] — Coded data elements within fields
//!
//! Fields keep the order in which they were added. Adding a field whose tag
//! already exists appends another occurrence; nothing is overwritten.
//!
//! # Examples
//!
//! ```
//! use finc_marc::{Field, Leader, Record};
//!
//! let mut record = Record::new(Leader::default());
//! record.add_control_field("001".to_string(), "finc-109-4711".to_string());
//!
//! let mut field = Field::new("245".to_string(), ' ', ' ');
//! field.add_subfield('a', "Der Himmel über Berlin".to_string());
//! record.add_field(field);
//!
//! assert_eq!(record.title(), Some("Der Himmel über Berlin"));
//! ```

use crate::leader::Leader;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A MARC bibliographic record
///
/// Control fields and data fields are each an ordered sequence. Repeated
/// tags may be interleaved with other tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record leader (24 bytes)
    pub leader: Leader,
    /// Control fields (001-009) as (tag, value), in insertion order
    pub control_fields: Vec<(String, String)>,
    /// Data fields (010+), in insertion order
    pub fields: Vec<Field>,
}

/// A data field in a MARC record (fields 010 and higher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field tag (3 digits)
    pub tag: String,
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields with 4 or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

/// Whether a tag names a control field (`"001"` to `"009"`).
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.bytes().all(|b| b.is_ascii_digit()) && tag < "010"
}

impl Record {
    /// Create a new MARC record with the given leader
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            control_fields: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Add a control field (001-009). Repeated tags append.
    pub fn add_control_field(&mut self, tag: String, value: String) {
        self.control_fields.push((tag, value));
    }

    /// Get the first value of a control field
    #[must_use]
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over all control fields as (tag, value) pairs, in insertion order
    pub fn control_fields_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.control_fields
            .iter()
            .map(|(tag, value)| (tag.as_str(), value.as_str()))
    }

    /// Iterate over the values of control fields with a given tag
    pub fn control_fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> {
        self.control_fields
            .iter()
            .filter(move |(t, _)| t == tag)
            .map(|(_, value)| value.as_str())
    }

    /// Add a data field. Repeated tags append.
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Remove every field (control or data) with a given tag
    pub fn remove_fields(&mut self, tag: &str) {
        self.control_fields.retain(|(t, _)| t != tag);
        self.fields.retain(|f| f.tag != tag);
    }

    /// Get first field with a given tag
    #[must_use]
    pub fn get_field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// Iterate over all data fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Iterate over fields matching a specific tag
    pub fn fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Field> {
        self.fields.iter().filter(move |f| f.tag == tag)
    }

    /// First value of subfield `code` in the first `tag` field that has one.
    #[must_use]
    pub fn subfield_value(&self, tag: &str, code: char) -> Option<&str> {
        self.fields
            .iter()
            .filter(|f| f.tag == tag)
            .find_map(|field| field.get_subfield(code))
    }

    /// Title proper (245 $a)
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get_field("245").and_then(|f| f.get_subfield('a'))
    }

    /// Every (tag, subfield code, value) triple of the data fields, in order.
    #[must_use]
    pub fn subfield_triples(&self) -> Vec<(String, char, String)> {
        self.fields()
            .flat_map(|field| {
                field
                    .subfields
                    .iter()
                    .map(|sf| (field.tag.clone(), sf.code, sf.value.clone()))
            })
            .collect()
    }
}

impl Field {
    /// Create a new data field
    #[must_use]
    pub fn new(tag: String, indicator1: char, indicator2: char) -> Self {
        Field {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Add a subfield
    pub fn add_subfield(&mut self, code: char, value: String) {
        self.subfields.push(Subfield { code, value });
    }

    /// Add a subfield using a string slice
    pub fn add_subfield_str(&mut self, code: char, value: &str) {
        self.add_subfield(code, value.to_string());
    }

    /// Get first value for a subfield code
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Get all values for a subfield code
    #[must_use]
    pub fn get_subfield_values(&self, code: char) -> Vec<&str> {
        self.subfields_by_code(code).collect()
    }

    /// Iterate over subfields with a specific code
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Drop subfields with empty values, keeping the order of the rest.
    pub fn retain_non_empty(&mut self) {
        self.subfields.retain(|sf| !sf.value.is_empty());
    }
}
