//! Error types for classdef save/load operations.
//!
//! This module provides the [`Error`] enum covering every failure mode of the
//! serialization engine, along with a convenient [`Result`] type alias.
//!
//! Errors raised deep inside a codec or container are wrapped once by the
//! driver in [`Error::Container`] so the caller learns which file was being
//! processed. Use [`Error::root`] to get at the underlying variant.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::value::Kind;

/// Result type alias for classdef operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while saving or loading objects.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A call was made with an invalid shape of arguments.
    #[error("Invalid argument: {message}")]
    Argument {
        /// Description of the problem.
        message: String,
    },

    /// Reading a property through the object store failed.
    #[error("Failed to read property '{property}': {message}")]
    PropertyRead {
        /// Property whose getter failed.
        property: String,
        /// Message reported by the object store.
        message: String,
    },

    /// A record carries a field the target class does not declare.
    #[error("Class '{class}' has no property named '{field}'")]
    UnknownField {
        /// Name of the offending field.
        field: String,
        /// Class that was being populated.
        class: String,
    },

    /// The backend cannot represent a value of this kind bit-identically.
    #[error("Field '{field}': {backend} backend cannot represent {kind} values")]
    UnsupportedConversion {
        /// Field being encoded or decoded.
        field: String,
        /// Kind of the value.
        kind: Kind,
        /// Backend that refused the value.
        backend: &'static str,
    },

    /// Records or lists nested deeper than the backend supports.
    #[error("Field '{field}': nesting depth {depth} is not supported")]
    UnsupportedNesting {
        /// Field containing the nested value.
        field: String,
        /// Depth that was reached.
        depth: usize,
    },

    /// The container holds a value whose type tag is not recognized.
    #[error("Unknown type tag '{tag}'")]
    UnknownType {
        /// Raw tag, as found in the container.
        tag: String,
    },

    /// Malformed text container.
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Description of the syntax error.
        message: String,
    },

    /// The container could not be created or opened.
    #[error("Failed to open container '{path}': {reason}")]
    ContainerOpen {
        /// Path to the container.
        path: PathBuf,
        /// Why the open failed.
        reason: String,
    },

    /// Writing a variable to a binary container failed.
    #[error("Failed to write variable '{field}': {reason}")]
    VariableWrite {
        /// Field that was being written.
        field: String,
        /// Underlying cause.
        reason: String,
    },

    /// A `saveobj`/`loadobj` hook failed or returned the wrong kind of value.
    #[error("Hook '{hook}' failed: {message}")]
    HookInvocation {
        /// Qualified hook name (`Class.method`).
        hook: String,
        /// Description of the failure.
        message: String,
    },

    /// The object store does not know the requested class.
    #[error("Class not found: '{class}'")]
    ClassNotFound {
        /// Requested class name.
        class: String,
    },

    /// Payload size does not match the declared shape.
    #[error("Invalid dimensions: shape requires {expected} bytes, payload has {found}")]
    InvalidDimensions {
        /// Byte count implied by the shape.
        expected: usize,
        /// Byte count actually supplied.
        found: usize,
    },

    /// Requested element type doesn't match the array's actual type.
    #[error("Data type mismatch: expected {expected}, found {found}")]
    DataTypeMismatch {
        /// Expected data type.
        expected: String,
        /// Actual data type of the array.
        found: String,
    },

    /// A record already contains a field with this name.
    #[error("Duplicate field '{field}'")]
    DuplicateField {
        /// The repeated name.
        field: String,
    },

    /// Field names must not be empty.
    #[error("Field name cannot be empty")]
    EmptyFieldName,

    /// The container contents are structurally invalid.
    #[error("Invalid container format: {reason}")]
    InvalidFormat {
        /// Description of the format error.
        reason: String,
    },

    /// Operation performed in the wrong state (e.g. writing after close).
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state error.
        message: &'static str,
    },

    /// A save or load failed while processing the given container.
    #[error("{phase} of '{path}' failed")]
    Container {
        /// Container path.
        path: PathBuf,
        /// Phase in which the failure happened.
        phase: &'static str,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an Argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument { message: message.into() }
    }

    /// Create a PropertyRead error.
    pub fn property_read(property: impl Into<String>, message: impl ToString) -> Self {
        Self::PropertyRead {
            property: property.into(),
            message: message.to_string(),
        }
    }

    /// Create an UnknownField error.
    pub fn unknown_field(field: impl Into<String>, class: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            class: class.into(),
        }
    }

    /// Create an UnsupportedConversion error.
    pub fn unsupported(field: impl Into<String>, kind: Kind, backend: &'static str) -> Self {
        Self::UnsupportedConversion {
            field: field.into(),
            kind,
            backend,
        }
    }

    /// Create an UnsupportedNesting error.
    pub fn nesting(field: impl Into<String>, depth: usize) -> Self {
        Self::UnsupportedNesting {
            field: field.into(),
            depth,
        }
    }

    /// Create an UnknownType error.
    pub fn unknown_type(tag: impl Into<String>) -> Self {
        Self::UnknownType { tag: tag.into() }
    }

    /// Create a Parse error.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a ContainerOpen error.
    pub fn open_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ContainerOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a VariableWrite error.
    pub fn variable_write(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::VariableWrite {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a HookInvocation error.
    pub fn hook(hook: impl Into<String>, message: impl ToString) -> Self {
        Self::HookInvocation {
            hook: hook.into(),
            message: message.to_string(),
        }
    }

    /// Create a ClassNotFound error.
    pub fn class_not_found(class: impl Into<String>) -> Self {
        Self::ClassNotFound { class: class.into() }
    }

    /// Create a DataTypeMismatch error.
    pub fn type_mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Self::DataTypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Create an InvalidFormat error with the given reason.
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat { reason: reason.into() }
    }

    /// Create an InvalidState error.
    pub const fn invalid_state(message: &'static str) -> Self {
        Self::InvalidState { message }
    }

    /// Wrap an error with the container path and phase it occurred in.
    pub fn in_container(self, path: impl Into<PathBuf>, phase: &'static str) -> Self {
        Self::Container {
            path: path.into(),
            phase,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`Error::Container`] wrappers.
    pub fn root(&self) -> &Error {
        let mut err = self;
        while let Error::Container { source, .. } = err {
            err = source;
        }
        err
    }
}
