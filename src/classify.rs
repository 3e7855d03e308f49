//! Heuristic physical format classification.
//!
//! A [`FormatClassifier`] holds an ordered list of [`ClassifierRule`]s. Each
//! rule tests the [`FormatSignals`] extracted from a record; the first rule
//! that matches decides the outcome, and the fallback label applies when
//! none does. Categories overlap, so the order of the rules matters.
//!
//! The default cascade, in order:
//!
//! | # | Condition | Outcome |
//! |---|-----------|---------|
//! | 1 | record is a parent | Mehrbänder |
//! | 2 | has ISBN, text mentions none of Videokassette/VHS/DVD | Buch |
//! | 3 | page, leaf, illustration or volume markers | Buch |
//! | 4 | `CD` | CD |
//! | 5 | `DVD` | DVD |
//! | 6 | `Blu-ray` | Blu-ray |
//! | 7 | `Videokassette`, `VHS` or `Min` | Videokassette |
//! | 8 | `Losebl.-Ausg.` | Loseblattsammlung |
//! | 9 | page range such as `S. 12 - 34` | Aufsatz |
//! | 10 | object markers (Plakat, Box, Schuber, ...) | Objekt |
//! | 11 | parent without ISBN | skip |
//! | 12 | otherwise | Buch |
//!
//! # Examples
//!
//! ```
//! use finc_marc::{Classification, FormatClassifier, FormatLabel, FormatSignals};
//!
//! let classifier = FormatClassifier::default();
//! let outcome = classifier.classify(&FormatSignals::new("1 DVD (ca. 90 Min.)", false, false));
//! assert_eq!(outcome, Classification::Format(FormatLabel::Dvd));
//! ```

use crate::format_table::FormatLabel;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PAGE_RANGE: Regex =
        Regex::new(r"S\.\s\d+\s?-\s?\d+").expect("page range pattern is valid");
}

/// Inputs to classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSignals<'a> {
    /// Free-text format or extent statement
    pub text: &'a str,
    /// Whether the record carries an ISBN
    pub has_isbn: bool,
    /// Whether another record references this one as its parent
    pub is_parent: bool,
}

impl<'a> FormatSignals<'a> {
    /// Bundle the three signals.
    #[must_use]
    pub fn new(text: &'a str, has_isbn: bool, is_parent: bool) -> Self {
        FormatSignals {
            text,
            has_isbn,
            is_parent,
        }
    }
}

/// Result of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Convert the record with this format.
    Format(FormatLabel),
    /// Leave the record out of the output.
    Skip,
}

/// Test applied to the signals.
#[derive(Debug, Clone)]
pub enum Condition {
    /// The record is a parent.
    IsParent,
    /// The record is a parent and has no ISBN.
    ParentWithoutIsbn,
    /// The record has an ISBN and the text contains none of the markers.
    IsbnWithout(Vec<String>),
    /// The text contains at least one of the markers.
    ContainsAny(Vec<String>),
    /// The text matches the pattern.
    Matches(Regex),
}

impl Condition {
    fn contains_any(markers: &[&str]) -> Self {
        Condition::ContainsAny(markers.iter().map(|m| (*m).to_string()).collect())
    }

    fn test(&self, signals: &FormatSignals<'_>) -> bool {
        match self {
            Condition::IsParent => signals.is_parent,
            Condition::ParentWithoutIsbn => signals.is_parent && !signals.has_isbn,
            Condition::IsbnWithout(markers) => {
                signals.has_isbn && !markers.iter().any(|m| signals.text.contains(m.as_str()))
            },
            Condition::ContainsAny(markers) => {
                markers.iter().any(|m| signals.text.contains(m.as_str()))
            },
            Condition::Matches(pattern) => pattern.is_match(signals.text),
        }
    }
}

/// One step of the cascade.
#[derive(Debug, Clone)]
pub struct ClassifierRule {
    /// When the rule applies
    pub condition: Condition,
    /// What it decides
    pub outcome: Classification,
}

impl ClassifierRule {
    /// Create a rule.
    #[must_use]
    pub fn new(condition: Condition, outcome: Classification) -> Self {
        ClassifierRule { condition, outcome }
    }
}

/// Ordered, immutable rule cascade with a fallback label.
#[derive(Debug, Clone)]
pub struct FormatClassifier {
    rules: Vec<ClassifierRule>,
    fallback: FormatLabel,
}

impl Default for FormatClassifier {
    fn default() -> Self {
        use Classification::{Format, Skip};
        use FormatLabel as L;

        let rules = vec![
            ClassifierRule::new(Condition::IsParent, Format(L::Mehrbaende)),
            ClassifierRule::new(
                Condition::IsbnWithout(
                    ["Videokassette", "VHS", "DVD"].map(String::from).to_vec(),
                ),
                Format(L::Buch),
            ),
            ClassifierRule::new(
                Condition::contains_any(&[
                    "S.", "Bl.", "Ill.", " p.", "XI", "XV", "X,", "Bde.", ": graph",
                ]),
                Format(L::Buch),
            ),
            ClassifierRule::new(Condition::contains_any(&["CD"]), Format(L::Cd)),
            ClassifierRule::new(Condition::contains_any(&["DVD"]), Format(L::Dvd)),
            ClassifierRule::new(Condition::contains_any(&["Blu-ray"]), Format(L::BluRay)),
            ClassifierRule::new(
                Condition::contains_any(&["Videokassette", "VHS", "Min"]),
                Format(L::Videokassette),
            ),
            ClassifierRule::new(
                Condition::contains_any(&["Losebl.-Ausg."]),
                Format(L::Loseblattsammlung),
            ),
            ClassifierRule::new(Condition::Matches(PAGE_RANGE.clone()), Format(L::Aufsatz)),
            ClassifierRule::new(
                Condition::contains_any(&[
                    "Plakat",
                    "Kassette",
                    "Box",
                    "Karton",
                    "Postkarten",
                    "Teile",
                    "USB",
                    "Schachtel",
                    "Schautafel",
                    "Medienkombination",
                    "Tafel",
                    "Faltbl",
                    "Schuber",
                ]),
                Format(L::Objekt),
            ),
            ClassifierRule::new(Condition::ParentWithoutIsbn, Skip),
        ];

        FormatClassifier::new(rules, L::Buch)
    }
}

impl FormatClassifier {
    /// Create a classifier from an ordered rule list.
    #[must_use]
    pub fn new(rules: Vec<ClassifierRule>, fallback: FormatLabel) -> Self {
        FormatClassifier { rules, fallback }
    }

    /// The rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }

    /// Classify a record. The first matching rule wins.
    #[must_use]
    pub fn classify(&self, signals: &FormatSignals<'_>) -> Classification {
        self.rules
            .iter()
            .find(|rule| rule.condition.test(signals))
            .map_or(Classification::Format(self.fallback), |rule| rule.outcome)
    }
}
