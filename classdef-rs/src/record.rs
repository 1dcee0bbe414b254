//! Records: ordered, uniquely named field collections.
//!
//! A [`Record`] is what one object's state looks like once it has been
//! pulled out of the object store. Fields keep insertion order so that a
//! save followed by a load preserves the class's property order.

use crate::error::{Error, Result};
use crate::value::TypedValue;

/// One named value within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    name: String,
    value: TypedValue,
}

impl FieldEntry {
    /// Create a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyFieldName`] if `name` is empty.
    pub fn new(name: impl Into<String>, value: impl Into<TypedValue>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptyFieldName);
        }
        Ok(FieldEntry {
            name,
            value: value.into(),
        })
    }

    /// Get the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the field value.
    pub fn value(&self) -> &TypedValue {
        &self.value
    }

    /// Split into name and value.
    pub fn into_parts(self) -> (String, TypedValue) {
        (self.name, self.value)
    }
}

/// An ordered collection of fields with unique names.
///
/// # Example
///
/// ```
/// use classdef_rs::Record;
///
/// let mut record = Record::new();
/// record.insert("Name", "Thomas")?;
/// record.insert("Age", 42i32)?;
///
/// assert_eq!(record.names().collect::<Vec<_>>(), ["Name", "Age"]);
/// assert!(record.insert("Name", "Again").is_err());
/// # Ok::<(), classdef_rs::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<FieldEntry>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateField`] if the name is already present.
    pub fn push(&mut self, field: FieldEntry) -> Result<()> {
        if self.contains(field.name()) {
            return Err(Error::DuplicateField {
                field: field.name,
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// Append a field built from a name and value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Result<()> {
        self.push(FieldEntry::new(name, value)?)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Look up a field value by name.
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Check whether a field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Iterate over the fields in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldEntry> {
        self.fields.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl IntoIterator for Record {
    type Item = FieldEntry;
    type IntoIter = std::vec::IntoIter<FieldEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a FieldEntry;
    type IntoIter = std::slice::Iter<'a, FieldEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// A record tagged with the class it was saved from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassRecord {
    /// Declared class name; `None` for an anonymous struct.
    pub class_name: Option<String>,

    /// The field values.
    pub record: Record,
}

impl ClassRecord {
    /// Tag a record with a class name.
    pub fn new(class_name: impl Into<String>, record: Record) -> Self {
        ClassRecord {
            class_name: Some(class_name.into()),
            record,
        }
    }

    /// A record without a class.
    pub fn anonymous(record: Record) -> Self {
        ClassRecord {
            class_name: None,
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(FieldEntry::new("", 1.0), Err(Error::EmptyFieldName)));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut record = Record::new();
        record.insert("A", 1i8).unwrap();
        let err = record.insert("A", 2i8).unwrap_err();
        assert!(matches!(err, Error::DuplicateField { field } if field == "A"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_insertion_order_kept() {
        let record = Record::new()
            .with("C", 3.0)
            .and_then(|r| r.with("A", 1.0))
            .and_then(|r| r.with("B", 2.0))
            .unwrap();
        assert_eq!(record.names().collect::<Vec<_>>(), ["C", "A", "B"]);
        assert_eq!(record.get("A"), Some(&TypedValue::from(1.0)));
    }
}
