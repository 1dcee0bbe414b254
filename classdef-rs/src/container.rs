//! The container capability shared by the text and MAT backends.
//!
//! A backend owns its file session for the duration of one save or one load.
//! Writers and readers release the session on [`close`](RecordWriter::close)
//! and, if that is never reached because an error unwound the call, when
//! they are dropped.
//!
//! # State Machine
//!
//! ```text
//! create → write_record* → close
//! open   → read_next_record* → close
//! ```

use std::path::Path;

use log::debug;

use crate::codec::{EncodedRecord, FieldCodec};
use crate::error::Result;
use crate::record::ClassRecord;

/// A container format: a codec plus a way to create and open files.
pub trait ContainerBackend {
    /// Native field representation shared by the codec, writer and reader.
    type Native;

    /// Field codec for this format.
    type Codec: FieldCodec<Native = Self::Native>;

    /// Session returned by [`create`](Self::create).
    type Writer: RecordWriter<Native = Self::Native>;

    /// Session returned by [`open`](Self::open).
    type Reader: RecordReader<Native = Self::Native>;

    /// Short name, e.g. `"text"` or `"mat"`.
    fn name(&self) -> &'static str;

    /// File extension used for default output paths.
    fn extension(&self) -> &'static str;

    /// The field codec.
    fn codec(&self) -> &Self::Codec;

    /// Create a new container at `path`. `class_name` is recorded in the
    /// container header where the format has one.
    fn create(&self, path: &Path, class_name: Option<&str>) -> Result<Self::Writer>;

    /// Open an existing container.
    fn open(&self, path: &Path) -> Result<Self::Reader>;
}

/// An open container being written.
pub trait RecordWriter {
    /// Native field representation.
    type Native;

    /// Write one encoded record.
    fn write_record(&mut self, record: &EncodedRecord<Self::Native>) -> Result<()>;

    /// Finish writing and release the session.
    fn close(self) -> Result<()>;
}

/// An open container being read.
pub trait RecordReader {
    /// Native field representation.
    type Native;

    /// Read the next record, or `None` once the container is exhausted.
    fn read_next_record(&mut self) -> Result<Option<EncodedRecord<Self::Native>>>;

    /// Release the session.
    fn close(self) -> Result<()>;

    /// Iterate lazily over the remaining records.
    fn records(&mut self) -> Records<'_, Self>
    where
        Self: Sized,
    {
        Records {
            reader: self,
            done: false,
        }
    }
}

/// Lazy iterator over the records of a [`RecordReader`].
///
/// Iteration stops after the first error.
pub struct Records<'a, R> {
    reader: &'a mut R,
    done: bool,
}

impl<R: RecordReader> Iterator for Records<'_, R> {
    type Item = Result<EncodedRecord<R::Native>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Encode and write records to a new container.
///
/// Every record is encoded before the file is created, so an unencodable
/// field never leaves a container behind.
pub fn save_records<B: ContainerBackend>(
    backend: &B,
    path: &Path,
    records: &[ClassRecord],
) -> Result<()> {
    let encoded = records
        .iter()
        .map(|r| backend.codec().encode_record(r))
        .collect::<Result<Vec<_>>>()?;

    let class_name = records.first().and_then(|r| r.class_name.as_deref());
    let mut writer = backend.create(path, class_name)?;
    for record in &encoded {
        writer.write_record(record)?;
    }
    writer.close()?;

    debug!(
        "wrote {} record(s) to {} container '{}'",
        records.len(),
        backend.name(),
        path.display()
    );
    Ok(())
}

/// Read and decode every record of a container.
pub fn load_records<B: ContainerBackend>(backend: &B, path: &Path) -> Result<Vec<ClassRecord>> {
    let mut reader = backend.open(path)?;
    let mut records = Vec::new();
    for encoded in reader.records() {
        records.push(backend.codec().decode_record(encoded?)?);
    }
    reader.close()?;

    debug!(
        "read {} record(s) from {} container '{}'",
        records.len(),
        backend.name(),
        path.display()
    );
    Ok(records)
}
