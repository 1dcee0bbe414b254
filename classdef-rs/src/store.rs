//! The object-store capability surface.
//!
//! The serialization engine never touches a host object system directly.
//! Everything it needs (reading and writing properties, constructing
//! instances, finding and calling `saveobj`/`loadobj`) goes through the
//! [`ObjectStore`] trait, which an adapter implements for a concrete host.
//! The store is passed into every call; there is no ambient interpreter.

use std::fmt;

use crate::error::Result;
use crate::record::Record;
use crate::value::TypedValue;

/// Name of the instance method that produces a custom save record.
pub const SAVEOBJ: &str = "saveobj";

/// Name of the static method that rebuilds an object from a record.
pub const LOADOBJ: &str = "loadobj";

/// Opaque reference to an object living in an [`ObjectStore`].
///
/// Handles are plain ids; the store owns the objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    /// Wrap a store-specific id.
    pub const fn new(id: u64) -> Self {
        ObjectHandle(id)
    }

    /// The store-specific id.
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A method found on a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    class: String,
    method: String,
    is_static: bool,
}

impl Hook {
    /// Describe a method of `class`.
    pub fn new(class: impl Into<String>, method: impl Into<String>, is_static: bool) -> Self {
        Hook {
            class: class.into(),
            method: method.into(),
            is_static,
        }
    }

    /// Class declaring the method.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether the method is static.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// `Class.method`, for messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class, self.method)
    }
}

/// An argument passed to a hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HookArg {
    /// An object in the store.
    Object(ObjectHandle),
    /// A record of field values.
    Record(Record),
}

/// What a hook returned.
#[derive(Debug, Clone, PartialEq)]
pub enum HookValue {
    /// An object in the store.
    Object(ObjectHandle),
    /// A record of field values.
    Record(Record),
    /// No return value.
    Nothing,
}

/// Capabilities the engine needs from a host object system.
pub trait ObjectStore {
    /// Class name of an object.
    fn class_of(&self, object: ObjectHandle) -> Result<String>;

    /// Declared property names, in definition order.
    fn list_properties(&self, object: ObjectHandle) -> Result<Vec<String>>;

    /// Read a property.
    fn get_property(&self, object: ObjectHandle, name: &str) -> Result<TypedValue>;

    /// Write a property.
    fn set_property(&mut self, object: ObjectHandle, name: &str, value: TypedValue) -> Result<()>;

    /// Construct an instance with default property values.
    fn construct_default(&mut self, class: &str) -> Result<ObjectHandle>;

    /// Look up a method declared by `class`.
    fn find_method(&self, class: &str, method: &str) -> Option<Hook>;

    /// Call a method.
    fn invoke(&mut self, hook: &Hook, args: Vec<HookArg>) -> Result<HookValue>;
}
