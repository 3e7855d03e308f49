//! Generic nested mapping built from one XML record element.
//!
//! A [`SourceRecord`] is the shape every XML source is mapped from. The
//! element tree is converted into a [`serde_json::Value`] with these rules:
//!
//! - attributes become `@name` keys, element text becomes `#text`
//! - an element with neither attributes nor children becomes a string
//!   (or `null` when it is empty)
//! - a child element that occurs more than once becomes an array
//! - namespace prefixes are stripped from element and attribute names and
//!   `xmlns` declarations are dropped
//!
//! Key order follows the document, so iteration is deterministic.
//!
//! # Examples
//!
//! ```
//! use finc_marc::SourceRecord;
//!
//! let record = SourceRecord::parse(
//!     r#"<Record><header><identifier>oai:1</identifier></header>
//!        <metadata><title lang="de">Filmtheorie</title></metadata></Record>"#,
//! )
//! .unwrap();
//! assert_eq!(record.root_name(), "Record");
//! assert_eq!(record.text("header/identifier"), "oai:1");
//! assert_eq!(record.text("metadata/title"), "Filmtheorie");
//! assert_eq!(record.text("metadata/missing"), "");
//! ```

use crate::error::{ConvertError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

/// One parsed record element.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    root_name: String,
    root: Value,
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let mut children = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ConvertError::ParseError(e.to_string()))?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            let value = attr.unescape_value()?.into_owned();
            children.insert(format!("@{name}"), Value::String(value));
        }
        Ok(Frame {
            name: String::from_utf8_lossy(start.local_name().as_ref()).to_string(),
            children,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.children.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut children = self.children;
            if !text.is_empty() {
                children.insert("#text".to_string(), Value::String(text.to_string()));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

fn insert_child(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        },
        None => {
            parent.insert(name, value);
        },
    }
}

impl SourceRecord {
    /// Parse a serialized XML element (as yielded by
    /// [`XmlRecordStream`](crate::XmlRecordStream) or read from a file).
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::ParseError`] for malformed XML, undefined
    /// entities, or a document without a root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Frame> = Vec::new();
        let mut root = None;

        loop {
            let closed = match reader.read_event()? {
                Event::Start(e) => {
                    stack.push(Frame::open(&e)?);
                    None
                },
                Event::Empty(e) => Some(Frame::open(&e)?.close()),
                Event::End(_) => stack.pop().map(Frame::close),
                Event::Text(e) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.text.push_str(&e.unescape()?);
                    }
                    None
                },
                Event::CData(e) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.text.push_str(&String::from_utf8_lossy(&e));
                    }
                    None
                },
                Event::Eof => break,
                _ => None,
            };

            if let Some((name, value)) = closed {
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.children, name, value),
                    None if root.is_none() => root = Some((name, value)),
                    None => {
                        return Err(ConvertError::ParseError(format!(
                            "second root element <{name}>"
                        )))
                    },
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(ConvertError::ParseError(format!(
                "unexpected end of document inside <{}>",
                open.name
            )));
        }
        let (root_name, root) =
            root.ok_or_else(|| ConvertError::ParseError("document has no root element".to_string()))?;
        Ok(SourceRecord { root_name, root })
    }

    /// Local name of the record element.
    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// The record element's converted value.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a `/`-separated path of child names below the root.
    ///
    /// Each step descends into a mapping. When a step meets an array, the
    /// first element is used. An empty path returns the root.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.root, path)
    }

    /// Text at `path`, or `""` when absent or not text-like.
    ///
    /// Strings are returned as is, mappings yield their `#text`.
    #[must_use]
    pub fn text(&self, path: &str) -> String {
        self.get(path)
            .and_then(value_text)
            .unwrap_or_default()
            .to_string()
    }
}

/// Resolve `path` below `value`, see [`SourceRecord::get`].
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/')
        .filter(|step| !step.is_empty())
        .try_fold(value, |current, step| first(current).as_object()?.get(step))
}

/// Text content of a string or a mapping with `#text`.
#[must_use]
pub fn value_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("#text").and_then(Value::as_str),
        _ => None,
    }
}

/// Iterate a value that may be a single item or an array of items.
///
/// `null` yields nothing.
pub fn items(value: &Value) -> impl Iterator<Item = &Value> {
    let slice: &[Value] = match value {
        Value::Array(values) => values,
        Value::Null => &[],
        single => std::slice::from_ref(single),
    };
    slice.iter()
}

fn first(value: &Value) -> &Value {
    match value {
        Value::Array(values) => values.first().unwrap_or(value),
        other => other,
    }
}
