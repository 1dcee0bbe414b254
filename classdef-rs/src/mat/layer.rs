//! The low-level MAT I/O seam.
//!
//! [`MatBackend`](super::MatBackend) talks to files only through these
//! traits. [`FileLayer`](super::FileLayer) is the real implementation;
//! tests substitute layers that count opens and closes or fail on demand.

use std::path::Path;

use crate::error::Result;

use super::var::{Compression, MatHeader, MatVar};

/// Opens MAT files for writing and reading.
pub trait MatLayer {
    /// Write session.
    type Sink: MatSink;
    /// Read session.
    type Source: MatSource;

    /// Create a file at `path` and write its header.
    fn create(&self, path: &Path, header: &MatHeader) -> Result<Self::Sink>;

    /// Open an existing file and read its header.
    fn open(&self, path: &Path) -> Result<Self::Source>;
}

/// An open MAT file being written.
pub trait MatSink {
    /// Append one top-level variable.
    fn write_var(&mut self, var: &MatVar, compression: Compression) -> Result<()>;

    /// Flush and release the file.
    fn close(&mut self) -> Result<()>;
}

/// An open MAT file being read.
pub trait MatSource {
    /// The file header.
    fn header(&self) -> &MatHeader;

    /// Read the next top-level variable, or `None` at end of file.
    fn read_next(&mut self) -> Result<Option<MatVar>>;

    /// Release the file.
    fn close(&mut self) -> Result<()>;
}
