//! # classdef-rs
//!
//! Save MATLAB/Octave classdef objects to disk and load them back, in a
//! line-oriented text format or in Level 5 MAT files.
//!
//! An object is reduced to a [`Record`], an ordered list of named
//! [`TypedValue`]s. A [`FieldCodec`] turns each field into the container's
//! own representation and a [`ContainerBackend`] writes it out. Loading
//! runs the same pipeline backwards and rebuilds the object through an
//! [`ObjectStore`], the only way this crate ever talks to a host object
//! system.
//!
//! ## Quick Start
//!
//! ```no_run
//! use classdef_rs::{
//!     ClassDef, LoadOptions, MatBackend, MemoryStore, ObjectStore, Result, SaveOptions,
//!     Serializer,
//! };
//!
//! fn main() -> Result<()> {
//!     let mut store = MemoryStore::new();
//!     store.define(
//!         ClassDef::new("Person")
//!             .property("Name", "")
//!             .property("Age", 0.0),
//!     );
//!
//!     let thomas = store.construct_default("Person")?;
//!     store.set_property(thomas, "Name", "Thomas".into())?;
//!
//!     let backend = MatBackend::new();
//!     let mut serializer = Serializer::new(&mut store);
//!     let path = serializer.save(&backend, thomas, &SaveOptions::new().path("thomas.mat"))?;
//!
//!     let copy = serializer.load(&backend, &path, &LoadOptions::new())?;
//!     println!("loaded {}", copy);
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Values
//!
//! | Kind | Text | MAT |
//! |------|------|-----|
//! | `int8`..`uint64`, `single`, `double` (scalar or N-d) | yes | yes |
//! | char arrays | yes | yes |
//! | UTF-8 text | yes | yes |
//! | nested record, one level | yes | yes (1x1 struct) |
//! | cell list, one level | no | yes |
//!
//! Anything a backend can't store exactly fails with
//! [`Error::UnsupportedConversion`] or [`Error::UnsupportedNesting`] before
//! a file is created.
//!
//! ## Feature Flags
//!
//! - `ndarray` (default): convert numeric arrays to and from
//!   `ndarray::ArrayD`
//!
//! ## Logging
//!
//! Phase transitions and per-variable I/O are logged at `debug` through the
//! `log` facade; skipped fields are logged at `warn`.

#![deny(missing_docs)]

// Modules
mod builder;
mod codec;
mod container;
mod data_type;
mod driver;
mod error;
pub mod mat;
mod memory;
mod record;
mod shape;
mod store;
pub mod text;
mod value;

// Public exports
pub use builder::{RecordBuilder, UnknownFields};
pub use codec::{EncodedRecord, FieldCodec};
pub use container::{load_records, save_records, ContainerBackend, RecordReader, RecordWriter, Records};
pub use data_type::{DataType, Element};
pub use driver::{LoadOptions, LoadPhase, SaveOptions, SavePhase, Serializer};
pub use error::{Error, Result};
pub use mat::{Compression, FileLayer, MatBackend, MatCodec, MatLayer, MatSink, MatSource, MatVar};
pub use memory::{ClassDef, MemoryStore, MethodFn};
pub use record::{ClassRecord, FieldEntry, Record};
pub use shape::Shape;
pub use store::{Hook, HookArg, HookValue, ObjectHandle, ObjectStore, LOADOBJ, SAVEOBJ};
pub use text::{TextBackend, TextCodec};
pub use value::{CellArray, CharArray, Kind, NumericArray, TypedValue};

// Conditional re-exports
#[cfg(feature = "ndarray")]
pub use ndarray;
