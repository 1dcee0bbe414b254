//! Saving objects to containers and loading them back.
//!
//! [`Serializer`] ties the pieces together:
//!
//! ```text
//! save: object → RecordBuilder → FieldCodec × N → RecordWriter → file
//! load: file → RecordReader → FieldCodec × N → RecordBuilder → object
//! ```
//!
//! Each call walks an explicit phase sequence. On failure the call moves to
//! `Failed`, the open container is released, and the error is returned
//! wrapped in [`Error::Container`] naming the file and the phase.
//!
//! # Example
//!
//! ```no_run
//! use classdef_rs::{ClassDef, LoadOptions, MemoryStore, ObjectStore, SaveOptions, Serializer, TextBackend};
//!
//! let mut store = MemoryStore::new();
//! store.define(ClassDef::new("Person").property("Name", ""));
//! let thomas = store.construct_default("Person")?;
//! store.set_property(thomas, "Name", "Thomas".into())?;
//!
//! let backend = TextBackend::new();
//! let mut serializer = Serializer::new(&mut store);
//! let path = serializer.save(&backend, thomas, &SaveOptions::new())?;
//! let copy = serializer.load(&backend, &path, &LoadOptions::new())?;
//! # Ok::<(), classdef_rs::Error>(())
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::builder::{RecordBuilder, UnknownFields};
use crate::codec::FieldCodec;
use crate::container::{ContainerBackend, RecordReader, RecordWriter};
use crate::error::{Error, Result};
use crate::record::ClassRecord;
use crate::store::{ObjectHandle, ObjectStore};

/// Phases of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    /// Nothing done yet.
    Idle,
    /// Reading the object's state.
    Extracting,
    /// Encoding fields for the backend.
    Encoding,
    /// Writing the container.
    Writing,
    /// Finished successfully.
    Closed,
    /// Aborted by an error.
    Failed,
}

/// Phases of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Nothing done yet.
    Idle,
    /// Opening the container.
    Opening,
    /// Reading the encoded record.
    Reading,
    /// Decoding fields.
    Decoding,
    /// Building the object.
    Constructing,
    /// Finished successfully.
    Closed,
    /// Aborted by an error.
    Failed,
}

impl SavePhase {
    fn label(self) -> &'static str {
        match self {
            SavePhase::Idle => "save",
            SavePhase::Extracting => "extracting",
            SavePhase::Encoding => "encoding",
            SavePhase::Writing => "writing",
            SavePhase::Closed => "closing",
            SavePhase::Failed => "save",
        }
    }
}

impl LoadPhase {
    fn label(self) -> &'static str {
        match self {
            LoadPhase::Idle => "load",
            LoadPhase::Opening => "opening",
            LoadPhase::Reading => "reading",
            LoadPhase::Decoding => "decoding",
            LoadPhase::Constructing => "constructing",
            LoadPhase::Closed => "closing",
            LoadPhase::Failed => "load",
        }
    }
}

impl fmt::Display for SavePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Options for [`Serializer::save`].
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Output path. Defaults to `<ClassName>.<extension>` in the working
    /// directory.
    pub path: Option<PathBuf>,
}

impl SaveOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output path.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Options for [`Serializer::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Class to construct. When unset, the class named in the container
    /// header is used, then the file stem.
    pub class_name: Option<String>,

    /// Policy for fields the class doesn't declare.
    pub unknown_fields: UnknownFields,
}

impl LoadOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the class to construct.
    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.class_name = Some(class.into());
        self
    }

    /// Set the unknown-field policy.
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }
}

/// Saves and loads objects of an [`ObjectStore`].
pub struct Serializer<'s, S: ObjectStore + ?Sized> {
    store: &'s mut S,
}

impl<'s, S: ObjectStore + ?Sized> Serializer<'s, S> {
    /// Create a serializer over `store`.
    pub fn new(store: &'s mut S) -> Self {
        Serializer { store }
    }

    /// Save `object` to a container, returning the path written.
    ///
    /// Fields are encoded before the container is created, so a value the
    /// backend can't represent never leaves a file behind.
    pub fn save<B: ContainerBackend>(
        &mut self,
        backend: &B,
        object: ObjectHandle,
        options: &SaveOptions,
    ) -> Result<PathBuf> {
        let class = self.store.class_of(object)?;
        let path = match &options.path {
            Some(path) => path.clone(),
            None => PathBuf::from(format!("{}.{}", class, backend.extension())),
        };

        let mut phase = SavePhase::Idle;
        match self.run_save(backend, object, &class, &path, &mut phase) {
            Ok(()) => {
                debug!("saved {} object {} to '{}'", class, object, path.display());
                Ok(path)
            }
            Err(e) => {
                let failed_in = phase.label();
                phase = SavePhase::Failed;
                warn!("{} of '{}' failed: {}", failed_in, path.display(), e);
                debug!("save phase -> {:?}", phase);
                Err(e.in_container(path, failed_in))
            }
        }
    }

    fn run_save<B: ContainerBackend>(
        &mut self,
        backend: &B,
        object: ObjectHandle,
        class: &str,
        path: &Path,
        phase: &mut SavePhase,
    ) -> Result<()> {
        advance(phase, SavePhase::Extracting);
        let record = RecordBuilder::new().capture(self.store, object)?;

        advance(phase, SavePhase::Encoding);
        let encoded = backend
            .codec()
            .encode_record(&ClassRecord::new(class, record))?;

        advance(phase, SavePhase::Writing);
        let mut writer = backend.create(path, Some(class))?;
        writer.write_record(&encoded)?;

        advance(phase, SavePhase::Closed);
        writer.close()
    }

    /// Load an object from the first record of a container.
    pub fn load<B: ContainerBackend>(
        &mut self,
        backend: &B,
        path: &Path,
        options: &LoadOptions,
    ) -> Result<ObjectHandle> {
        let mut phase = LoadPhase::Idle;
        match self.run_load(backend, path, options, &mut phase) {
            Ok(object) => {
                debug!("loaded object {} from '{}'", object, path.display());
                Ok(object)
            }
            Err(e) => {
                let failed_in = phase.label();
                phase = LoadPhase::Failed;
                warn!("{} of '{}' failed: {}", failed_in, path.display(), e);
                debug!("load phase -> {:?}", phase);
                Err(e.in_container(path, failed_in))
            }
        }
    }

    fn run_load<B: ContainerBackend>(
        &mut self,
        backend: &B,
        path: &Path,
        options: &LoadOptions,
        phase: &mut LoadPhase,
    ) -> Result<ObjectHandle> {
        advance(phase, LoadPhase::Opening);
        let mut reader = backend.open(path)?;

        advance(phase, LoadPhase::Reading);
        let encoded = reader
            .read_next_record()?
            .ok_or_else(|| Error::invalid_format("container holds no record"))?;

        advance(phase, LoadPhase::Decoding);
        let decoded = backend.codec().decode_record(encoded)?;
        let class = resolve_class(options, decoded.class_name.as_deref(), path)?;

        advance(phase, LoadPhase::Constructing);
        let object = RecordBuilder::new()
            .unknown_fields(options.unknown_fields)
            .restore(self.store, &class, decoded.record)?;

        advance(phase, LoadPhase::Closed);
        reader.close()?;
        Ok(object)
    }
}

fn advance<P: fmt::Debug>(phase: &mut P, next: P) {
    debug!("phase {:?} -> {:?}", phase, next);
    *phase = next;
}

/// Pick the class to construct: explicit option, then container header,
/// then file stem.
fn resolve_class(options: &LoadOptions, header: Option<&str>, path: &Path) -> Result<String> {
    if let Some(class) = &options.class_name {
        if let Some(declared) = header.filter(|h| *h != class) {
            debug!("loading '{}' record as {}", declared, class);
        }
        return Ok(class.clone());
    }
    if let Some(class) = header {
        return Ok(class.to_string());
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::argument(format!("cannot infer a class name for '{}'", path.display())))
}
