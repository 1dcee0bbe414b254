//! Per-field encoding into a backend's native representation.

use crate::error::Result;
use crate::record::{ClassRecord, FieldEntry, Record};

/// A record after every field has been encoded for a particular backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord<N> {
    /// Declared class name, if any.
    pub class_name: Option<String>,

    /// Encoded fields, in record order.
    pub fields: Vec<N>,
}

/// Translates fields to and from a backend's native value type.
///
/// Each container format has its own codec. Encoding must either produce an
/// exact representation of the value or fail with
/// [`Error::UnsupportedConversion`](crate::Error::UnsupportedConversion) /
/// [`Error::UnsupportedNesting`](crate::Error::UnsupportedNesting).
pub trait FieldCodec {
    /// The backend's representation of one named field.
    type Native;

    /// Short backend name used in error messages.
    fn backend(&self) -> &'static str;

    /// Encode one field.
    fn encode(&self, field: &FieldEntry) -> Result<Self::Native>;

    /// Decode one field.
    fn decode(&self, native: Self::Native) -> Result<FieldEntry>;

    /// Encode a whole record, stopping at the first field that fails.
    fn encode_record(&self, record: &ClassRecord) -> Result<EncodedRecord<Self::Native>> {
        let fields = record
            .record
            .iter()
            .map(|field| self.encode(field))
            .collect::<Result<Vec<_>>>()?;
        Ok(EncodedRecord {
            class_name: record.class_name.clone(),
            fields,
        })
    }

    /// Decode a whole record, rejecting duplicate field names.
    fn decode_record(&self, encoded: EncodedRecord<Self::Native>) -> Result<ClassRecord> {
        let mut record = Record::new();
        for native in encoded.fields {
            record.push(self.decode(native)?)?;
        }
        Ok(ClassRecord {
            class_name: encoded.class_name,
            record,
        })
    }
}
