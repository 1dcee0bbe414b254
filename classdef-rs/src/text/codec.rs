//! Conversion between typed values and text literals.

use crate::codec::FieldCodec;
use crate::data_type::{DataType, Element};
use crate::error::{Error, Result};
use crate::record::{FieldEntry, Record};
use crate::shape::Shape;
use crate::value::{CharArray, Kind, NumericArray, TypedValue};

use super::literal::{is_field_name, TextField, TextLiteral, Token};

const BACKEND: &str = "text";

/// Field codec for the text format.
///
/// Numbers are written in their shortest round-trip form, so every finite
/// value, the infinities and the canonical NaN survive exactly. NaNs with a
/// custom payload and cell lists can't be written and are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl TextCodec {
    /// Create a text codec.
    pub fn new() -> Self {
        TextCodec
    }
}

impl FieldCodec for TextCodec {
    type Native = TextField;

    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn encode(&self, field: &FieldEntry) -> Result<TextField> {
        let depth = field.value().depth();
        if depth > 1 {
            return Err(Error::nesting(field.name(), depth));
        }
        encode_field(field)
    }

    fn decode(&self, native: TextField) -> Result<FieldEntry> {
        let value = decode_value(&native.name, native.value, 0)?;
        FieldEntry::new(native.name, value)
    }
}

fn encode_field(field: &FieldEntry) -> Result<TextField> {
    if !is_field_name(field.name()) {
        return Err(Error::argument(format!(
            "field name '{}' can't be written as text",
            field.name().escape_debug()
        )));
    }
    Ok(TextField {
        name: field.name().to_string(),
        value: encode_value(field.name(), field.value())?,
    })
}

fn encode_value(name: &str, value: &TypedValue) -> Result<TextLiteral> {
    match value {
        TypedValue::Numeric(array) if array.is_scalar() => Ok(TextLiteral::Scalar {
            tag: array.data_type().name().to_string(),
            token: format_element(name, array.data_type(), array.as_bytes())?,
        }),
        TypedValue::Numeric(array) => {
            let dt = array.data_type();
            let size = dt.size_bytes();
            let tokens = array
                .as_bytes()
                .chunks_exact(size)
                .map(|bytes| format_element(name, dt, bytes).map(Token::Number))
                .collect::<Result<Vec<_>>>()?;
            let shape = Shape::new(array.shape().matrix_dims());
            Ok(TextLiteral::Array {
                tag: dt.name().to_string(),
                pages: to_pages(&shape, tokens, |row| row),
                shape,
            })
        }
        TypedValue::Char(chars) => {
            let shape = Shape::new(chars.shape().matrix_dims());
            let tokens = chars.as_bytes().to_vec();
            Ok(TextLiteral::Array {
                tag: "char".to_string(),
                pages: to_pages(&shape, tokens, |row| vec![Token::Chars(row)]),
                shape,
            })
        }
        TypedValue::Text(s) => Ok(TextLiteral::Text(s.clone())),
        TypedValue::Record(record) => record
            .iter()
            .map(encode_field)
            .collect::<Result<Vec<_>>>()
            .map(TextLiteral::Struct),
        TypedValue::List(_) => Err(Error::unsupported(name, Kind::List, BACKEND)),
    }
}

/// Lay column-major elements out as pages of rows; `row` turns one row of
/// elements into tokens.
fn to_pages<T, F>(shape: &Shape, elements: Vec<T>, row: F) -> Vec<Vec<Vec<Token>>>
where
    T: Clone,
    F: Fn(Vec<T>) -> Vec<Token>,
{
    if elements.is_empty() {
        return Vec::new();
    }
    let dims = shape.matrix_dims();
    let (rows, cols) = (dims[0], dims[1]);
    let page_len = rows * cols;
    elements
        .chunks(page_len)
        .map(|page| {
            (0..rows)
                .map(|r| row((0..cols).map(|c| page[r + c * rows].clone()).collect()))
                .collect()
        })
        .collect()
}

fn decode_value(name: &str, literal: TextLiteral, depth: usize) -> Result<TypedValue> {
    match literal {
        TextLiteral::Text(s) => Ok(TypedValue::Text(s)),
        TextLiteral::Scalar { tag, token } => {
            let dt = DataType::from_name(&tag).ok_or_else(|| Error::unknown_type(tag))?;
            let mut data = Vec::with_capacity(dt.size_bytes());
            parse_element(name, dt, &token, &mut data)?;
            Ok(NumericArray::new(dt, Shape::scalar(), data)?.into())
        }
        TextLiteral::Array { tag, shape, pages } if tag == "char" => {
            let rows = from_pages(name, &shape, pages, |row, cols| match row.as_slice() {
                [Token::Chars(bytes)] if bytes.len() == cols => Ok(bytes.clone()),
                _ => Err(bad_row(name, &shape)),
            })?;
            Ok(CharArray::new(shape, rows)?.into())
        }
        TextLiteral::Array { tag, shape, pages } => {
            let dt = DataType::from_name(&tag).ok_or_else(|| Error::unknown_type(tag))?;
            let elements = from_pages(name, &shape, pages, |row, cols| {
                if row.len() != cols {
                    return Err(bad_row(name, &shape));
                }
                let mut bytes = Vec::with_capacity(cols * dt.size_bytes());
                for token in row {
                    match token {
                        Token::Number(n) => parse_element(name, dt, n, &mut bytes)?,
                        Token::Chars(_) => return Err(bad_row(name, &shape)),
                    }
                }
                Ok(bytes)
            })?;
            Ok(NumericArray::new(dt, shape, elements)?.into())
        }
        TextLiteral::Struct(_) if depth > 0 => Err(Error::nesting(name, depth + 1)),
        TextLiteral::Struct(fields) => {
            let mut record = Record::new();
            for field in fields {
                let value = decode_value(&field.name, field.value, depth + 1)?;
                record.insert(field.name, value)?;
            }
            Ok(record.into())
        }
    }
}

/// Check the page/row layout against `shape` and reassemble the payload in
/// column-major order. `row` decodes one row to its element bytes.
fn from_pages<F>(
    name: &str,
    shape: &Shape,
    pages: Vec<Vec<Vec<Token>>>,
    row: F,
) -> Result<Vec<u8>>
where
    F: Fn(&Vec<Token>, usize) -> Result<Vec<u8>>,
{
    if shape.is_empty() {
        if !pages.is_empty() {
            return Err(bad_row(name, shape));
        }
        return Ok(Vec::new());
    }

    let dims = shape.matrix_dims();
    let (rows, cols) = (dims[0], dims[1]);
    let page_count = Shape::new(dims[2..].to_vec())
        .checked_numel()
        .ok_or_else(|| bad_row(name, shape))?;
    if pages.len() != page_count || pages.iter().any(|p| p.len() != rows) {
        return Err(bad_row(name, shape));
    }

    let mut out = Vec::new();
    for page in &pages {
        let decoded = page
            .iter()
            .map(|r| row(r, cols))
            .collect::<Result<Vec<_>>>()?;
        let width = decoded.first().map_or(0, |r| r.len() / cols.max(1));
        for c in 0..cols {
            for r in &decoded {
                out.extend_from_slice(&r[c * width..(c + 1) * width]);
            }
        }
    }
    Ok(out)
}

fn bad_row(name: &str, shape: &Shape) -> Error {
    Error::invalid_format(format!(
        "field '{}': array body doesn't match dimensions {}",
        name, shape
    ))
}

macro_rules! float_checked {
    ($name:expr, $ty:ty, $bytes:expr) => {{
        let v = <$ty>::read_le($bytes);
        if v.is_nan() && v.to_bits() != <$ty>::NAN.to_bits() {
            return Err(Error::unsupported($name, Kind::scalar(<$ty>::DATA_TYPE), BACKEND));
        }
        format!("{:?}", v)
    }};
}

/// Render one little-endian element.
fn format_element(name: &str, dt: DataType, bytes: &[u8]) -> Result<String> {
    Ok(match dt {
        DataType::Int8 => i8::read_le(bytes).to_string(),
        DataType::Int16 => i16::read_le(bytes).to_string(),
        DataType::Int32 => i32::read_le(bytes).to_string(),
        DataType::Int64 => i64::read_le(bytes).to_string(),
        DataType::UInt8 => u8::read_le(bytes).to_string(),
        DataType::UInt16 => u16::read_le(bytes).to_string(),
        DataType::UInt32 => u32::read_le(bytes).to_string(),
        DataType::UInt64 => u64::read_le(bytes).to_string(),
        DataType::Single => float_checked!(name, f32, bytes),
        DataType::Double => float_checked!(name, f64, bytes),
    })
}

/// Parse one element and append its little-endian bytes to `out`.
fn parse_element(name: &str, dt: DataType, token: &str, out: &mut Vec<u8>) -> Result<()> {
    fn parse<T: Element + std::str::FromStr>(
        name: &str,
        dt: DataType,
        token: &str,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let v: T = token.parse().map_err(|_| {
            Error::invalid_format(format!("field '{}': '{}' is not a valid {}", name, token, dt))
        })?;
        v.write_le(out);
        Ok(())
    }

    match dt {
        DataType::Int8 => parse::<i8>(name, dt, token, out),
        DataType::Int16 => parse::<i16>(name, dt, token, out),
        DataType::Int32 => parse::<i32>(name, dt, token, out),
        DataType::Int64 => parse::<i64>(name, dt, token, out),
        DataType::UInt8 => parse::<u8>(name, dt, token, out),
        DataType::UInt16 => parse::<u16>(name, dt, token, out),
        DataType::UInt32 => parse::<u32>(name, dt, token, out),
        DataType::UInt64 => parse::<u64>(name, dt, token, out),
        DataType::Single => parse::<f32>(name, dt, token, out),
        DataType::Double => parse::<f64>(name, dt, token, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: TypedValue) -> TypedValue {
        let codec = TextCodec::new();
        let field = FieldEntry::new("x", value).unwrap();
        codec.decode(codec.encode(&field).unwrap()).unwrap().into_parts().1
    }

    #[test]
    fn test_matrix_layout() {
        let a = NumericArray::from_vec(vec![2, 3], vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]).unwrap();
        let encoded = TextCodec::new()
            .encode(&FieldEntry::new("M", a.clone()).unwrap())
            .unwrap();
        let mut out = String::new();
        encoded.render(0, &mut out);
        assert_eq!(out, "M = double[2x3] [1.0 2.0 3.0; 4.0 5.0 6.0]\n");
        assert_eq!(round_trip(a.clone().into()), TypedValue::from(a));
    }

    #[test]
    fn test_special_floats() {
        for v in [f64::INFINITY, f64::NEG_INFINITY, -0.0, f64::MIN_POSITIVE, 0.1] {
            let back = round_trip(v.into());
            let bits = back.as_numeric().unwrap().scalar_value::<f64>().unwrap().to_bits();
            assert_eq!(bits, v.to_bits());
        }
        let nan = round_trip(f32::NAN.into());
        assert!(nan.as_numeric().unwrap().scalar_value::<f32>().unwrap().is_nan());
    }

    #[test]
    fn test_payload_nan_refused() {
        let odd = f64::from_bits(0x7ff8_0000_0000_0001);
        let err = TextCodec::new()
            .encode(&FieldEntry::new("x", odd).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedConversion { kind: Kind::Float64, .. }));
    }

    #[test]
    fn test_char_cube() {
        let c = CharArray::new(Shape::new(vec![2, 2, 2]), b"acbdegfh".to_vec()).unwrap();
        assert_eq!(round_trip(c.clone().into()), TypedValue::from(c));
    }

    #[test]
    fn test_list_refused() {
        let list = crate::value::CellArray::row(vec![1.0.into()]);
        let err = TextCodec::new()
            .encode(&FieldEntry::new("L", list).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedConversion { kind: Kind::List, .. }));
    }

    #[test]
    fn test_unreadable_names_refused() {
        let codec = TextCodec::new();
        for name in ["my field", "a=b", "#x", "x\ny", "}"] {
            let err = codec.encode(&FieldEntry::new(name, 1.0).unwrap()).unwrap_err();
            assert!(matches!(err, Error::Argument { .. }), "{:?}", name);
        }

        let inner = Record::new().with("bad name", 1.0).unwrap();
        let err = codec
            .encode(&FieldEntry::new("outer", inner).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::Argument { .. }));
    }

    #[test]
    fn test_unknown_tag() {
        let field = TextField {
            name: "x".into(),
            value: TextLiteral::Scalar {
                tag: "quaternion".into(),
                token: "1".into(),
            },
        };
        let err = TextCodec::new().decode(field).unwrap_err();
        assert!(matches!(err, Error::UnknownType { tag } if tag == "quaternion"));
    }

    #[test]
    fn test_nested_struct_depth() {
        let inner = Record::new().with("x", 1.0).unwrap();
        let outer = Record::new().with("inner", inner.clone()).unwrap();

        assert_eq!(round_trip(inner.clone().into()), TypedValue::from(inner));
        let err = TextCodec::new()
            .encode(&FieldEntry::new("outer", outer).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedNesting { depth: 2, .. }));
    }
}
