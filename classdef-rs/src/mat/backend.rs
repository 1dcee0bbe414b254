//! MAT container sessions.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::codec::EncodedRecord;
use crate::container::{ContainerBackend, RecordReader, RecordWriter};
use crate::error::{Error, Result};

use super::codec::MatCodec;
use super::file::FileLayer;
use super::layer::{MatLayer, MatSink, MatSource};
use super::var::{Compression, MatHeader, MatVar};

/// The MAT container format over a [`MatLayer`].
///
/// Each field of a record becomes one top-level variable. The class name
/// goes into the header text so a load can find it again.
///
/// # Example
///
/// ```no_run
/// use classdef_rs::{save_records, ClassRecord, Compression, MatBackend, Record};
/// use std::path::Path;
///
/// let backend = MatBackend::new().compression(Compression::Default);
/// let record = Record::new().with("Name", "Thomas")?.with("Age", 42.0)?;
/// save_records(&backend, Path::new("person.mat"), &[ClassRecord::new("Person", record)])?;
/// # Ok::<(), classdef_rs::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MatBackend<L = FileLayer> {
    layer: L,
    codec: MatCodec,
    compression: Compression,
}

impl MatBackend<FileLayer> {
    /// A backend writing real files, uncompressed.
    pub fn new() -> Self {
        Self::with_layer(FileLayer)
    }
}

impl<L: MatLayer> MatBackend<L> {
    /// A backend over a custom layer.
    pub fn with_layer(layer: L) -> Self {
        MatBackend {
            layer,
            codec: MatCodec,
            compression: Compression::None,
        }
    }

    /// Set the compression used for new variables.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Get the layer.
    pub fn layer(&self) -> &L {
        &self.layer
    }
}

impl<L: MatLayer> ContainerBackend for MatBackend<L> {
    type Native = MatVar;
    type Codec = MatCodec;
    type Writer = MatWriter<L::Sink>;
    type Reader = MatReader<L::Source>;

    fn name(&self) -> &'static str {
        "mat"
    }

    fn extension(&self) -> &'static str {
        "mat"
    }

    fn codec(&self) -> &MatCodec {
        &self.codec
    }

    fn create(&self, path: &Path, class_name: Option<&str>) -> Result<Self::Writer> {
        let sink = self.layer.create(path, &MatHeader::new(class_name)?)?;
        Ok(MatWriter {
            sink: Some(sink),
            path: path.to_path_buf(),
            names: HashSet::new(),
            compression: self.compression,
        })
    }

    fn open(&self, path: &Path) -> Result<Self::Reader> {
        let source = self.layer.open(path)?;
        Ok(MatReader {
            source: Some(source),
            path: path.to_path_buf(),
            done: false,
        })
    }
}

/// An open MAT file being written.
///
/// The sink is closed exactly once: by [`close`](RecordWriter::close), or
/// on drop if an error got there first.
#[derive(Debug)]
pub struct MatWriter<S: MatSink> {
    sink: Option<S>,
    path: PathBuf,
    names: HashSet<String>,
    compression: Compression,
}

impl<S: MatSink> RecordWriter for MatWriter<S> {
    type Native = MatVar;

    fn write_record(&mut self, record: &EncodedRecord<MatVar>) -> Result<()> {
        let sink = self
            .sink
            .as_mut()
            .ok_or(Error::invalid_state("MAT writer has been closed"))?;
        for var in &record.fields {
            if !self.names.insert(var.name.clone()) {
                return Err(Error::variable_write(&var.name, "duplicate variable name"));
            }
            sink.write_var(var, self.compression).map_err(|e| match e {
                e @ Error::VariableWrite { .. } => e,
                other => Error::variable_write(&var.name, other),
            })?;
        }
        Ok(())
    }

    fn close(mut self) -> Result<()> {
        match self.sink.take() {
            Some(mut sink) => {
                sink.close()?;
                debug!(
                    "closed MAT file '{}' ({} variables)",
                    self.path.display(),
                    self.names.len()
                );
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<S: MatSink> Drop for MatWriter<S> {
    fn drop(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close() {
                warn!("closing '{}' failed: {}", self.path.display(), e);
            }
        }
    }
}

/// An open MAT file being read.
///
/// All variables of a file form one record; the second read returns `None`.
#[derive(Debug)]
pub struct MatReader<S: MatSource> {
    source: Option<S>,
    path: PathBuf,
    done: bool,
}

impl<S: MatSource> RecordReader for MatReader<S> {
    type Native = MatVar;

    fn read_next_record(&mut self) -> Result<Option<EncodedRecord<MatVar>>> {
        if self.done {
            return Ok(None);
        }
        let source = self
            .source
            .as_mut()
            .ok_or(Error::invalid_state("MAT reader has been closed"))?;

        let mut fields = Vec::new();
        while let Some(var) = source.read_next()? {
            fields.push(var);
        }
        self.done = true;
        debug!(
            "read {} variable(s) from '{}'",
            fields.len(),
            self.path.display()
        );
        Ok(Some(EncodedRecord {
            class_name: source.header().class_name().map(str::to_string),
            fields,
        }))
    }

    fn close(mut self) -> Result<()> {
        match self.source.take() {
            Some(mut source) => source.close(),
            None => Ok(()),
        }
    }
}

impl<S: MatSource> Drop for MatReader<S> {
    fn drop(&mut self) {
        if let Some(mut source) = self.source.take() {
            if let Err(e) = source.close() {
                warn!("closing '{}' failed: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldCodec;
    use crate::record::{ClassRecord, Record};
    use crate::{load_records, save_records};

    #[test]
    fn test_one_record_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.mat");
        let record = Record::new().with("A", 1.0).unwrap().with("B", "two").unwrap();
        save_records(&MatBackend::new(), &path, &[ClassRecord::new("P", record.clone())]).unwrap();

        let mut reader = MatBackend::new().open(&path).unwrap();
        assert!(reader.read_next_record().unwrap().is_some());
        assert!(reader.read_next_record().unwrap().is_none());
        reader.close().unwrap();

        let loaded = load_records(&MatBackend::new(), &path).unwrap();
        assert_eq!(loaded, vec![ClassRecord::new("P", record)]);
    }

    #[test]
    fn test_duplicate_variable() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MatBackend::new();
        let codec = backend.codec();
        let a = Record::new().with("X", 1.0).unwrap();

        let mut writer = backend.create(&dir.path().join("d.mat"), None).unwrap();
        writer
            .write_record(&codec.encode_record(&ClassRecord::anonymous(a.clone())).unwrap())
            .unwrap();
        let err = writer
            .write_record(&codec.encode_record(&ClassRecord::anonymous(a)).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::VariableWrite { field, .. } if field == "X"));
    }
}
