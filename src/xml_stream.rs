//! Streaming extraction of record elements from large XML documents.
//!
//! [`XmlRecordStream`] walks an XML document with a pull parser and yields
//! every element whose local name matches a target tag as a standalone
//! serialized snippet, in document order. Only the events of the element
//! currently being captured are buffered, so arbitrarily large exports can
//! be processed in constant memory per record.
//!
//! Namespace prefixes are ignored when matching: a target of `record`
//! matches `<record>`, `<ns0:record>` and `<marc:record>`.
//!
//! # Examples
//!
//! ```
//! use finc_marc::XmlRecordStream;
//!
//! let xml = r#"<collection><ns0:record id="1"/><ns0:record id="2"><x>y</x></ns0:record></collection>"#;
//! let snippets: Vec<String> = XmlRecordStream::from_reader(xml.as_bytes(), "record")
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(snippets.len(), 2);
//! assert_eq!(snippets[1], r#"<ns0:record id="2"><x>y</x></ns0:record>"#);
//! ```

use crate::error::{ConvertError, Result};
use flate2::read::MultiGzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Open a file for buffered reading, transparently decompressing `.gz` files.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Lazy, finite, non-restartable sequence of record snippets.
///
/// After the first error the stream is exhausted.
pub struct XmlRecordStream<R: BufRead> {
    reader: Reader<R>,
    target: Vec<u8>,
    buf: Vec<u8>,
    finished: bool,
    snippets: usize,
}

impl<R: BufRead> std::fmt::Debug for XmlRecordStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlRecordStream")
            .field("target", &String::from_utf8_lossy(&self.target))
            .field("finished", &self.finished)
            .field("snippets", &self.snippets)
            .finish_non_exhaustive()
    }
}

impl XmlRecordStream<Box<dyn BufRead>> {
    /// Stream `tag` elements from the file at `path` (plain or `.gz`).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn open(path: &Path, tag: &str) -> Result<Self> {
        Ok(Self::from_reader(open_input(path)?, tag))
    }
}

impl<R: BufRead> XmlRecordStream<R> {
    /// Stream `tag` elements from any buffered reader.
    pub fn from_reader(input: R, tag: &str) -> Self {
        let local = tag.rsplit(':').next().unwrap_or(tag);
        XmlRecordStream {
            reader: Reader::from_reader(input),
            target: local.as_bytes().to_vec(),
            buf: Vec::new(),
            finished: false,
            snippets: 0,
        }
    }

    /// Number of snippets yielded so far.
    #[must_use]
    pub fn snippets_read(&self) -> usize {
        self.snippets
    }

    /// Copy events into a new document until the element opened by `start` closes.
    fn capture(&mut self, start: BytesStart<'static>) -> Result<String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Start(start))?;
        let mut depth = 1usize;

        loop {
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => return Err(parse_error(self.reader.buffer_position(), e)),
            };
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    return Err(parse_error(
                        self.reader.buffer_position(),
                        format!("unexpected end of document inside <{name}>"),
                    ));
                },
                _ => {},
            }
            writer.write_event(event)?;
            self.buf.clear();

            if depth == 0 {
                break;
            }
        }

        String::from_utf8(writer.into_inner())
            .map_err(|e| ConvertError::ParseError(format!("record <{name}> is not UTF-8: {e}")))
    }

    fn next_start(&mut self) -> Step {
        let step = match self.reader.read_event_into(&mut self.buf) {
            Err(e) => Step::Failed(parse_error(self.reader.buffer_position(), e)),
            Ok(Event::Eof) => Step::Eof,
            Ok(Event::Start(e)) if e.local_name().as_ref() == self.target.as_slice() => {
                Step::Found(e.into_owned(), false)
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == self.target.as_slice() => {
                Step::Found(e.into_owned(), true)
            },
            Ok(_) => Step::Skip,
        };
        self.buf.clear();
        step
    }
}

enum Step {
    Skip,
    Eof,
    Failed(ConvertError),
    Found(BytesStart<'static>, bool),
}

fn parse_error(position: usize, message: impl std::fmt::Display) -> ConvertError {
    ConvertError::ParseError(format!("{message} (at byte {position})"))
}

fn empty_element(start: BytesStart<'static>) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Empty(start))?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| ConvertError::ParseError(format!("record is not UTF-8: {e}")))
}

impl<R: BufRead> Iterator for XmlRecordStream<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = loop {
            match self.next_start() {
                Step::Skip => continue,
                Step::Eof => {
                    self.finished = true;
                    return None;
                },
                Step::Failed(e) => break Err(e),
                Step::Found(start, true) => break empty_element(start),
                Step::Found(start, false) => break self.capture(start),
            }
        };

        match result {
            Ok(snippet) => {
                self.snippets += 1;
                Some(Ok(snippet))
            },
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            },
        }
    }
}
