//! Level 5 MAT-file containers.
//!
//! Reading and writing is split in two layers:
//!
//! - [`MatLayer`] / [`MatSink`] / [`MatSource`] move whole variables
//!   ([`MatVar`]) in and out of files. [`FileLayer`] implements them for
//!   the Level 5 binary format, including `miCOMPRESSED` elements and
//!   big-endian files.
//! - [`MatCodec`] maps typed values onto variables and back, and
//!   [`MatBackend`] ties the two together as a container backend.
//!
//! v7.3 files are HDF5 underneath and are refused at open.

mod backend;
mod class;
mod codec;
mod file;
mod layer;
mod var;

pub use backend::{MatBackend, MatReader, MatWriter};
pub use class::{MatClass, MiType};
pub use codec::MatCodec;
pub use file::{FileLayer, FileSink, FileSource};
pub use layer::{MatLayer, MatSink, MatSource};
pub use var::{Compression, MatData, MatHeader, MatVar};
