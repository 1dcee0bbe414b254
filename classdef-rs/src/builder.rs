//! Moving state between objects and records.
//!
//! [`RecordBuilder`] reads an object's declared properties into a
//! [`Record`] and writes a record back onto an object. When a class declares
//! `saveobj`/`loadobj`, [`capture`](RecordBuilder::capture) and
//! [`restore`](RecordBuilder::restore) call those instead and never touch the
//! properties directly.

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::record::Record;
use crate::store::{Hook, HookArg, HookValue, ObjectHandle, ObjectStore, LOADOBJ, SAVEOBJ};

/// What to do with a record field the target class doesn't declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Fail with [`Error::UnknownField`] before any property is set.
    #[default]
    Reject,

    /// Ignore the field and log a warning.
    Skip,
}

/// Extracts records from objects and applies them back.
///
/// # Example
///
/// ```
/// use classdef_rs::{ClassDef, MemoryStore, RecordBuilder, ObjectStore};
///
/// let mut store = MemoryStore::new();
/// store.define(ClassDef::new("Person").property("Name", ""));
///
/// let thomas = store.construct_default("Person")?;
/// store.set_property(thomas, "Name", "Thomas".into())?;
///
/// let builder = RecordBuilder::new();
/// let record = builder.extract(&store, thomas)?;
///
/// let copy = store.construct_default("Person")?;
/// builder.apply(&mut store, copy, &record)?;
/// assert_eq!(store.get_property(copy, "Name")?.as_text(), Some("Thomas"));
/// # Ok::<(), classdef_rs::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    unknown_fields: UnknownFields,
}

impl RecordBuilder {
    /// Create a builder that rejects unknown fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unknown-field policy.
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Read every declared property of `object`, in definition order.
    ///
    /// # Errors
    ///
    /// - [`Error::PropertyRead`] if a getter fails
    /// - [`Error::DuplicateField`] if the store lists a property twice
    pub fn extract<S: ObjectStore + ?Sized>(&self, store: &S, object: ObjectHandle) -> Result<Record> {
        let mut record = Record::new();
        for name in store.list_properties(object)? {
            let value = store
                .get_property(object, &name)
                .map_err(|e| Error::property_read(&name, e))?;
            record.insert(name, value)?;
        }
        Ok(record)
    }

    /// Set each field of `record` on `object`.
    ///
    /// Unknown fields are checked first, so under [`UnknownFields::Reject`]
    /// a failing apply leaves the object untouched.
    pub fn apply<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        object: ObjectHandle,
        record: &Record,
    ) -> Result<()> {
        let declared = store.list_properties(object)?;
        let class = store.class_of(object)?;

        let mut known = Vec::with_capacity(record.len());
        for field in record {
            if declared.iter().any(|p| p == field.name()) {
                known.push(field);
                continue;
            }
            match self.unknown_fields {
                UnknownFields::Reject => return Err(Error::unknown_field(field.name(), &class)),
                UnknownFields::Skip => {
                    warn!("skipping field '{}': not a property of {}", field.name(), class);
                }
            }
        }

        for field in known {
            store.set_property(object, field.name(), field.value().clone())?;
        }
        Ok(())
    }

    /// Produce the save record for `object`: the result of its `saveobj`
    /// hook if the class declares one, otherwise [`extract`](Self::extract).
    pub fn capture<S: ObjectStore + ?Sized>(&self, store: &mut S, object: ObjectHandle) -> Result<Record> {
        let class = store.class_of(object)?;

        let Some(hook) = store.find_method(&class, SAVEOBJ) else {
            return self.extract(store, object);
        };

        let name = hook.qualified_name();
        if hook.is_static() {
            return Err(Error::hook(name, "saveobj must be an instance method"));
        }

        debug!("calling {}", name);
        match invoke_hook(store, &hook, vec![HookArg::Object(object)])? {
            HookValue::Record(record) => Ok(record),
            other => Err(Error::hook(
                name,
                format!("expected a record, got {}", describe(&other)),
            )),
        }
    }

    /// Rebuild an object of `class` from `record`: through its static
    /// `loadobj` hook if declared, otherwise by default construction and
    /// [`apply`](Self::apply).
    pub fn restore<S: ObjectStore + ?Sized>(
        &self,
        store: &mut S,
        class: &str,
        record: Record,
    ) -> Result<ObjectHandle> {
        let Some(hook) = store.find_method(class, LOADOBJ) else {
            let object = store.construct_default(class)?;
            self.apply(store, object, &record)?;
            return Ok(object);
        };

        let name = hook.qualified_name();
        if !hook.is_static() {
            return Err(Error::hook(name, "loadobj must be static"));
        }

        debug!("calling {}", name);
        match invoke_hook(store, &hook, vec![HookArg::Record(record)])? {
            HookValue::Object(object) => Ok(object),
            other => Err(Error::hook(
                name,
                format!("expected an object, got {}", describe(&other)),
            )),
        }
    }
}

fn invoke_hook<S: ObjectStore + ?Sized>(
    store: &mut S,
    hook: &Hook,
    args: Vec<HookArg>,
) -> Result<HookValue> {
    store.invoke(hook, args).map_err(|e| match e {
        e @ Error::HookInvocation { .. } => e,
        other => Error::hook(hook.qualified_name(), other),
    })
}

fn describe(value: &HookValue) -> &'static str {
    match value {
        HookValue::Object(_) => "an object",
        HookValue::Record(_) => "a record",
        HookValue::Nothing => "nothing",
    }
}
