//! Conversion between typed values and MAT variables.

use crate::codec::FieldCodec;
use crate::data_type::{DataType, Element};
use crate::error::{Error, Result};
use crate::record::{FieldEntry, Record};
use crate::shape::Shape;
use crate::value::{CellArray, CharArray, NumericArray, TypedValue};

use super::class::{MatClass, MiType};
use super::var::{MatData, MatVar};

/// Field codec for MAT files.
///
/// Every numeric kind maps to its own class, so values round-trip bit for
/// bit. Text is stored as a UTF-8 char row, char arrays as 8-bit chars.
/// Records become 1x1 structs and lists become cells, one level deep.
///
/// Decoding also accepts what MATLAB itself writes: numbers stored in a
/// narrower type than their class, and UTF-16 char data.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatCodec;

impl MatCodec {
    /// Create a MAT codec.
    pub fn new() -> Self {
        MatCodec
    }
}

impl FieldCodec for MatCodec {
    type Native = MatVar;

    fn backend(&self) -> &'static str {
        "mat"
    }

    fn encode(&self, field: &FieldEntry) -> Result<MatVar> {
        let depth = field.value().depth();
        if depth > 1 {
            return Err(Error::nesting(field.name(), depth));
        }
        Ok(encode_value(field.name().to_string(), field.value()))
    }

    fn decode(&self, var: MatVar) -> Result<FieldEntry> {
        let name = var.name.clone();
        let value = decode_value(&name, var, 0)?;
        FieldEntry::new(name, value)
    }
}

fn encode_value(name: String, value: &TypedValue) -> MatVar {
    let (class, dims, data) = match value {
        TypedValue::Numeric(array) => (
            MatClass::from_data_type(array.data_type()),
            array.shape().matrix_dims(),
            MatData::Numeric {
                stored: MiType::from_data_type(array.data_type()),
                bytes: array.as_bytes().to_vec(),
            },
        ),
        TypedValue::Char(chars) => (
            MatClass::Char,
            chars.shape().matrix_dims(),
            MatData::Numeric {
                stored: MiType::UInt8,
                bytes: chars.as_bytes().to_vec(),
            },
        ),
        TypedValue::Text(s) => (
            MatClass::Char,
            value.shape().matrix_dims(),
            MatData::Numeric {
                stored: MiType::Utf8,
                bytes: s.as_bytes().to_vec(),
            },
        ),
        TypedValue::Record(record) => (
            MatClass::Struct,
            vec![1, 1],
            MatData::Struct {
                field_names: record.names().map(str::to_string).collect(),
                elements: record
                    .iter()
                    .map(|f| encode_value(String::new(), f.value()))
                    .collect(),
            },
        ),
        TypedValue::List(list) => (
            MatClass::Cell,
            list.shape().matrix_dims(),
            MatData::Cell(
                list.items()
                    .iter()
                    .map(|item| encode_value(String::new(), item))
                    .collect(),
            ),
        ),
    };
    MatVar {
        name,
        class: class.code(),
        dims,
        complex: false,
        data,
    }
}

fn decode_value(name: &str, var: MatVar, depth: usize) -> Result<TypedValue> {
    let class = var
        .class()
        .ok_or_else(|| Error::unknown_type(format!("mxClass {}", var.class)))?;
    if var.complex {
        return Err(Error::unknown_type(format!("complex {}", class)));
    }
    let numel = var.numel();
    let shape = Shape::new(var.dims);

    match (class, var.data) {
        (MatClass::Struct, MatData::Struct { field_names, elements }) => {
            if depth > 0 {
                return Err(Error::nesting(name, depth + 1));
            }
            if numel != 1 {
                return Err(Error::unknown_type(format!("{} struct array", shape)));
            }
            if field_names.len() != elements.len() {
                return Err(Error::invalid_format(format!(
                    "struct '{}' has {} field names but {} values",
                    name,
                    field_names.len(),
                    elements.len()
                )));
            }
            let mut record = Record::new();
            for (field, element) in field_names.into_iter().zip(elements) {
                let value = decode_value(&field, element, depth + 1)?;
                record.insert(field, value)?;
            }
            Ok(record.into())
        }
        (MatClass::Cell, MatData::Cell(items)) => {
            if depth > 0 {
                return Err(Error::nesting(name, depth + 1));
            }
            let items = items
                .into_iter()
                .map(|item| decode_value(name, item, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            Ok(CellArray::new(shape, items)?.into())
        }
        (MatClass::Char, MatData::Numeric { stored, bytes }) => decode_char(shape, stored, bytes),
        (class, MatData::Numeric { stored, bytes }) => match class.data_type() {
            Some(dt) => decode_numeric(name, shape, dt, stored, bytes),
            None => Err(Error::unknown_type(class.to_string())),
        },
        (class, _) => Err(Error::unknown_type(class.to_string())),
    }
}

fn decode_numeric(
    name: &str,
    shape: Shape,
    target: DataType,
    stored: MiType,
    bytes: Vec<u8>,
) -> Result<TypedValue> {
    let source = stored.data_type().ok_or_else(|| {
        Error::invalid_format(format!("field '{}': numeric data stored as {:?}", name, stored))
    })?;
    if bytes.len() % source.size_bytes() != 0 {
        return Err(Error::invalid_format(format!(
            "field '{}': {} bytes is not a whole number of {} values",
            name,
            bytes.len(),
            source
        )));
    }
    let bytes = if source == target {
        bytes
    } else {
        convert(&bytes, source, target)
    };
    Ok(NumericArray::new(target, shape, bytes)?.into())
}

/// A char array stored as a row (or empty) reads back as text.
fn decode_char(shape: Shape, stored: MiType, bytes: Vec<u8>) -> Result<TypedValue> {
    let dims = shape.dims();
    let row_or_empty = dims.len() == 2 && (dims[0] == 1 || shape.is_empty());

    match stored {
        MiType::Utf8 if row_or_empty => String::from_utf8(bytes)
            .map(TypedValue::Text)
            .map_err(|_| Error::invalid_format("char data is not valid UTF-8")),
        MiType::UInt8 | MiType::Int8 => Ok(CharArray::new(shape, bytes)?.into()),
        MiType::UInt16 | MiType::Utf16 => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            if row_or_empty {
                String::from_utf16(&units)
                    .map(TypedValue::Text)
                    .map_err(|_| Error::invalid_format("char data is not valid UTF-16"))
            } else if units.iter().all(|&u| u < 0x100) {
                Ok(CharArray::new(shape, units.into_iter().map(|u| u as u8).collect())?.into())
            } else {
                Err(Error::unknown_type("multi-byte char matrix"))
            }
        }
        other => Err(Error::unknown_type(format!("char data stored as {:?}", other))),
    }
}

enum Number {
    Int(i128),
    Float(f64),
}

fn read_number(dt: DataType, bytes: &[u8]) -> Number {
    match dt {
        DataType::Int8 => Number::Int(i8::read_le(bytes).into()),
        DataType::Int16 => Number::Int(i16::read_le(bytes).into()),
        DataType::Int32 => Number::Int(i32::read_le(bytes).into()),
        DataType::Int64 => Number::Int(i64::read_le(bytes).into()),
        DataType::UInt8 => Number::Int(u8::read_le(bytes).into()),
        DataType::UInt16 => Number::Int(u16::read_le(bytes).into()),
        DataType::UInt32 => Number::Int(u32::read_le(bytes).into()),
        DataType::UInt64 => Number::Int(u64::read_le(bytes).into()),
        DataType::Single => Number::Float(f32::read_le(bytes).into()),
        DataType::Double => Number::Float(f64::read_le(bytes)),
    }
}

macro_rules! cast {
    ($n:expr, $ty:ty) => {
        match $n {
            Number::Int(i) => i as $ty,
            Number::Float(f) => f as $ty,
        }
    };
}

fn write_number(n: Number, dt: DataType, out: &mut Vec<u8>) {
    match dt {
        DataType::Int8 => cast!(n, i8).write_le(out),
        DataType::Int16 => cast!(n, i16).write_le(out),
        DataType::Int32 => cast!(n, i32).write_le(out),
        DataType::Int64 => cast!(n, i64).write_le(out),
        DataType::UInt8 => cast!(n, u8).write_le(out),
        DataType::UInt16 => cast!(n, u16).write_le(out),
        DataType::UInt32 => cast!(n, u32).write_le(out),
        DataType::UInt64 => cast!(n, u64).write_le(out),
        DataType::Single => cast!(n, f32).write_le(out),
        DataType::Double => cast!(n, f64).write_le(out),
    }
}

/// Widen elements stored as `from` to the class type `to`.
fn convert(bytes: &[u8], from: DataType, to: DataType) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() / from.size_bytes() * to.size_bytes());
    for chunk in bytes.chunks_exact(from.size_bytes()) {
        write_number(read_number(from, chunk), to, &mut out);
    }
    out
}
