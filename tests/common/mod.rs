//! Common test helpers and utilities shared across the test suite.

#![allow(dead_code)]

use finc_marc::{
    ConversionDriver, ConversionReport, ConvertError, Field, Leader, MarcReader, MarcWriter,
    Record, Source, TargetEncoding,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One `<record>` of the numbered datafield export, each field with subfield `a`.
pub fn khm_record(fields: &[(&str, &str)]) -> String {
    let mut xml = String::from("  <ns0:record>\n");
    for (tag, value) in fields {
        xml.push_str(&format!(
            "    <ns0:datafield tag=\"{tag}\"><ns0:subfield code=\"a\">{value}</ns0:subfield></ns0:datafield>\n"
        ));
    }
    xml.push_str("  </ns0:record>\n");
    xml
}

/// Wrap records in a collection element.
pub fn khm_export(records: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ns0:collection xmlns:ns0=\"http://www.loc.gov/MARC21/slim\">\n{}</ns0:collection>\n",
        records.concat()
    )
}

/// Run a full conversion for `source` from `input` into `output`.
pub fn convert(
    source: Source,
    input: &Path,
    output: &Path,
    encoding: TargetEncoding,
) -> Result<ConversionReport, ConvertError> {
    let mapping = source.mapping(Default::default(), None)?;
    let file = File::create(output)?;
    let mut driver = ConversionDriver::new(BufWriter::new(file), encoding);
    driver.run(&source.record_source(input), mapping.as_ref())
}

/// Read every record of a MARC file.
pub fn read_output(path: &Path) -> Vec<Record> {
    let bytes = fs::read(path).expect("output file");
    MarcReader::new(bytes.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .expect("output parses as MARC")
}

/// Creates a leader like the ones found in film archive exports.
pub fn film_leader() -> Leader {
    Leader {
        record_length: 0,
        record_status: 'n',
        record_type: 'g',
        bibliographic_level: 'm',
        control_record_type: ' ',
        character_coding: 'a',
        indicator_count: 2,
        subfield_code_count: 2,
        data_base_address: 0,
        encoding_level: ' ',
        cataloging_form: 'a',
        multipart_level: ' ',
        reserved: "4500".to_string(),
    }
}

/// A film record with control number, title and subject.
pub fn film_record(id: &str, title: &str, subject: &str) -> Record {
    let mut record = Record::new(film_leader());
    record.add_control_field("001".to_string(), id.to_string());
    let mut f245 = Field::new("245".to_string(), '1', '0');
    f245.add_subfield_str('a', title);
    record.add_field(f245);
    let mut f650 = Field::new("650".to_string(), ' ', '7');
    f650.add_subfield_str('a', subject);
    record.add_field(f650);
    record
}

/// Write records to a MARC file.
pub fn write_marc(path: &Path, records: &[Record]) {
    let file = File::create(path).expect("create MARC file");
    let mut writer = MarcWriter::new(BufWriter::new(file), TargetEncoding::Utf8);
    for record in records {
        writer.write_record(record).expect("write record");
    }
    writer.finish().expect("flush MARC file");
}

/// Log output collected by [`capture_logs`].
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a plain-text subscriber on this thread and return its log output.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}
