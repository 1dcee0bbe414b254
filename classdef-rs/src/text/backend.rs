//! Text container sessions.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::codec::EncodedRecord;
use crate::container::{ContainerBackend, RecordReader, RecordWriter};
use crate::error::{Error, Result};

use super::codec::TextCodec;
use super::literal::TextField;
use super::parser::Parser;

const PREAMBLE: &str = "# Created by classdef-rs\n";

/// The text container format.
///
/// # Example
///
/// ```no_run
/// use classdef_rs::{load_records, save_records, ClassRecord, Record, TextBackend};
/// use std::path::Path;
///
/// let record = Record::new().with("Name", "Thomas")?;
/// let backend = TextBackend::new();
/// save_records(&backend, Path::new("person.txt"), &[ClassRecord::new("Person", record)])?;
///
/// let loaded = load_records(&backend, Path::new("person.txt"))?;
/// assert_eq!(loaded[0].class_name.as_deref(), Some("Person"));
/// # Ok::<(), classdef_rs::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextBackend {
    codec: TextCodec,
}

impl TextBackend {
    /// Create a text backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContainerBackend for TextBackend {
    type Native = TextField;
    type Codec = TextCodec;
    type Writer = TextWriter;
    type Reader = TextReader;

    fn name(&self) -> &'static str {
        "text"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn codec(&self) -> &TextCodec {
        &self.codec
    }

    fn create(&self, path: &Path, _class_name: Option<&str>) -> Result<TextWriter> {
        TextWriter::create(path)
    }

    fn open(&self, path: &Path) -> Result<TextReader> {
        let file = File::open(path).map_err(|e| Error::open_failed(path, e))?;
        debug!("opened text container '{}'", path.display());
        Ok(TextReader {
            parser: Parser::new(BufReader::new(file)),
        })
    }
}

/// An open text container being written.
///
/// Output goes to a temporary file next to the target, which replaces the
/// target only on [`close`](RecordWriter::close). Dropping the writer
/// without closing it deletes the temporary file and leaves the target
/// untouched.
#[derive(Debug)]
pub struct TextWriter {
    tmp: NamedTempFile,
    path: PathBuf,
    records: usize,
}

impl TextWriter {
    fn create(path: &Path) -> Result<Self> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::open_failed(path, e))?;
        tmp.write_all(PREAMBLE.as_bytes())?;
        debug!(
            "writing text container '{}' via '{}'",
            path.display(),
            tmp.path().display()
        );
        Ok(TextWriter {
            tmp,
            path: path.to_path_buf(),
            records: 0,
        })
    }

    /// Get the target path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordWriter for TextWriter {
    type Native = TextField;

    fn write_record(&mut self, record: &EncodedRecord<TextField>) -> Result<()> {
        let mut out = String::new();
        if self.records > 0 {
            out.push('\n');
        }
        match &record.class_name {
            Some(class) => {
                out.push_str("# classdef: ");
                out.push_str(class);
                out.push('\n');
            }
            None => out.push_str("# struct\n"),
        }
        for field in &record.fields {
            field.render(0, &mut out);
        }
        self.tmp.write_all(out.as_bytes())?;
        self.records += 1;
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        self.tmp.flush()?;
        self.tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        debug!("persisted {} record(s) to '{}'", self.records, self.path.display());
        Ok(())
    }
}

/// An open text container being read.
#[derive(Debug)]
pub struct TextReader {
    parser: Parser<BufReader<File>>,
}

impl RecordReader for TextReader {
    type Native = TextField;

    fn read_next_record(&mut self) -> Result<Option<EncodedRecord<TextField>>> {
        self.parser.next_record()
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ClassRecord, Record};
    use crate::{load_records, save_records};

    #[test]
    fn test_dropped_writer_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.txt");

        let writer = TextBackend::new().create(&path, None).unwrap();
        drop(writer);

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_records_are_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("many.txt");
        let records: Vec<_> = (0..3)
            .map(|i| ClassRecord::anonymous(Record::new().with("i", i as i32).unwrap()))
            .collect();
        save_records(&TextBackend::new(), &path, &records).unwrap();

        let mut reader = TextBackend::new().open(&path).unwrap();
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(first.fields[0].name, "i");
        assert_eq!(reader.records().count(), 2);
        reader.close().unwrap();

        assert_eq!(load_records(&TextBackend::new(), &path).unwrap(), records);
    }

    #[test]
    fn test_open_missing() {
        let err = TextBackend::new().open(Path::new("/no/such/file.txt")).unwrap_err();
        assert!(matches!(err, Error::ContainerOpen { .. }));
    }
}
