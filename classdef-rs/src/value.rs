//! Typed field values.
//!
//! [`TypedValue`] is the closed set of things a property can hold once it
//! leaves the host object system: numeric arrays of every width, char
//! arrays, UTF-8 text, one level of nested record and cell lists. Codecs
//! match on it exhaustively, so adding a variant is a compile-time exercise.
//!
//! # Data Layout
//!
//! Numeric and char payloads are raw little-endian bytes in MATLAB's
//! column-major order. The payload length always equals
//! `shape.numel() * element size`; constructors refuse anything else.

use std::fmt;

#[cfg(feature = "ndarray")]
use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use crate::data_type::{DataType, Element};
use crate::error::{Error, Result};
use crate::record::Record;
use crate::shape::Shape;

/// Discriminant of a [`TypedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Scalar `int8`.
    Int8,
    /// Scalar `int16`.
    Int16,
    /// Scalar `int32`.
    Int32,
    /// Scalar `int64`.
    Int64,
    /// Scalar `uint8`.
    UInt8,
    /// Scalar `uint16`.
    UInt16,
    /// Scalar `uint32`.
    UInt32,
    /// Scalar `uint64`.
    UInt64,
    /// Scalar `single`.
    Float32,
    /// Scalar `double`.
    Float64,
    /// Char array, one byte per element.
    Char,
    /// UTF-8 text.
    Text,
    /// Numeric array with more or less than one element.
    NDArray(DataType),
    /// Nested record (scalar struct).
    Record,
    /// Cell list.
    List,
}

impl Kind {
    /// The scalar kind for a numeric element type.
    pub const fn scalar(data_type: DataType) -> Kind {
        match data_type {
            DataType::Int8 => Kind::Int8,
            DataType::Int16 => Kind::Int16,
            DataType::Int32 => Kind::Int32,
            DataType::Int64 => Kind::Int64,
            DataType::UInt8 => Kind::UInt8,
            DataType::UInt16 => Kind::UInt16,
            DataType::UInt32 => Kind::UInt32,
            DataType::UInt64 => Kind::UInt64,
            DataType::Single => Kind::Float32,
            DataType::Double => Kind::Float64,
        }
    }

    /// The numeric element type, for scalar and array kinds.
    pub const fn data_type(&self) -> Option<DataType> {
        match self {
            Kind::Int8 => Some(DataType::Int8),
            Kind::Int16 => Some(DataType::Int16),
            Kind::Int32 => Some(DataType::Int32),
            Kind::Int64 => Some(DataType::Int64),
            Kind::UInt8 => Some(DataType::UInt8),
            Kind::UInt16 => Some(DataType::UInt16),
            Kind::UInt32 => Some(DataType::UInt32),
            Kind::UInt64 => Some(DataType::UInt64),
            Kind::Float32 => Some(DataType::Single),
            Kind::Float64 => Some(DataType::Double),
            Kind::NDArray(dt) => Some(*dt),
            Kind::Char | Kind::Text | Kind::Record | Kind::List => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Char => write!(f, "char"),
            Kind::Text => write!(f, "text"),
            Kind::NDArray(dt) => write!(f, "{} array", dt),
            Kind::Record => write!(f, "record"),
            Kind::List => write!(f, "list"),
            scalar => match scalar.data_type() {
                Some(dt) => write!(f, "{}", dt),
                None => Ok(()),
            },
        }
    }
}

/// A numeric array of any element type.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    data_type: DataType,
    shape: Shape,
    data: Vec<u8>,
}

impl NumericArray {
    /// Create an array from raw little-endian, column-major bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if the byte count doesn't match
    /// the shape.
    pub fn new(data_type: DataType, shape: Shape, data: Vec<u8>) -> Result<Self> {
        let expected = shape
            .checked_numel()
            .and_then(|n| n.checked_mul(data_type.size_bytes()))
            .ok_or_else(|| too_large(&shape))?;
        if data.len() != expected {
            return Err(Error::InvalidDimensions {
                expected,
                found: data.len(),
            });
        }
        Ok(NumericArray {
            data_type,
            shape,
            data,
        })
    }

    /// Create a scalar.
    pub fn scalar<T: Element>(value: T) -> Self {
        let mut data = Vec::with_capacity(T::DATA_TYPE.size_bytes());
        value.write_le(&mut data);
        NumericArray {
            data_type: T::DATA_TYPE,
            shape: Shape::scalar(),
            data,
        }
    }

    /// Create an array from column-major values.
    pub fn from_vec<T: Element>(shape: impl Into<Shape>, values: Vec<T>) -> Result<Self> {
        let mut data = Vec::with_capacity(values.len() * T::DATA_TYPE.size_bytes());
        for v in values {
            v.write_le(&mut data);
        }
        Self::new(T::DATA_TYPE, shape.into(), data)
    }

    /// Get the element type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Get the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Get the raw little-endian payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the array, returning its payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape.numel()
    }

    /// Check if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// True for single-element arrays, which report a scalar [`Kind`].
    pub fn is_scalar(&self) -> bool {
        self.shape.is_scalar()
    }

    /// The kind this array reports.
    pub fn kind(&self) -> Kind {
        if self.is_scalar() {
            Kind::scalar(self.data_type)
        } else {
            Kind::NDArray(self.data_type)
        }
    }

    /// Copy the elements out as a column-major `Vec<T>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataTypeMismatch`] if `T` isn't the element type.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DATA_TYPE != self.data_type {
            return Err(Error::type_mismatch(T::DATA_TYPE, self.data_type));
        }
        Ok(self
            .data
            .chunks_exact(self.data_type.size_bytes())
            .map(T::read_le)
            .collect())
    }

    /// Get the single element of a scalar array.
    pub fn scalar_value<T: Element>(&self) -> Result<T> {
        if !self.is_scalar() {
            return Err(Error::invalid_format(format!(
                "expected a scalar, found shape {}",
                self.shape
            )));
        }
        Ok(self.to_vec::<T>()?[0])
    }

    /// Build an array from an `ndarray`, reading it in column-major order.
    #[cfg(feature = "ndarray")]
    pub fn from_ndarray<T: Element>(array: &ArrayD<T>) -> Self {
        let shape = Shape::new(array.shape().to_vec());
        let mut data = Vec::with_capacity(array.len() * T::DATA_TYPE.size_bytes());
        // Iterating the transposed view walks the original in column-major order.
        for v in array.t().iter() {
            (*v).write_le(&mut data);
        }
        NumericArray {
            data_type: T::DATA_TYPE,
            shape,
            data,
        }
    }

    /// Get the array as an `ndarray::ArrayD` with the stored dimensions.
    #[cfg(feature = "ndarray")]
    pub fn to_ndarray<T: Element>(&self) -> Result<ArrayD<T>> {
        let values = self.to_vec::<T>()?;
        ArrayD::from_shape_vec(IxDyn(self.shape.dims()).f(), values)
            .map_err(|e| Error::invalid_format(format!("Shape error: {}", e)))
    }
}

/// A char array: one byte per element, column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CharArray {
    shape: Shape,
    data: Vec<u8>,
}

impl CharArray {
    /// Create a char array from column-major bytes.
    pub fn new(shape: Shape, data: Vec<u8>) -> Result<Self> {
        let expected = shape.checked_numel().ok_or_else(|| too_large(&shape))?;
        if data.len() != expected {
            return Err(Error::InvalidDimensions {
                expected,
                found: data.len(),
            });
        }
        Ok(CharArray { shape, data })
    }

    /// Create a char matrix from equal-length rows, like `['abc'; 'def']`.
    pub fn from_rows(rows: &[&[u8]]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != cols) {
            return Err(Error::argument("char matrix rows must have equal length"));
        }
        let mut data = Vec::with_capacity(rows.len() * cols);
        for c in 0..cols {
            for row in rows {
                data.push(row[c]);
            }
        }
        Self::new(Shape::new(vec![rows.len(), cols]), data)
    }

    /// Get the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Get the column-major bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

fn too_large(shape: &Shape) -> Error {
    Error::argument(format!("array of shape {} is too large", shape))
}

/// A cell list with its own shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CellArray {
    shape: Shape,
    items: Vec<TypedValue>,
}

impl CellArray {
    /// Create a cell array; `items` are in column-major order.
    pub fn new(shape: Shape, items: Vec<TypedValue>) -> Result<Self> {
        let expected = shape.checked_numel().ok_or_else(|| too_large(&shape))?;
        if items.len() != expected {
            return Err(Error::argument(format!(
                "cell array of shape {} needs {} items, got {}",
                shape,
                expected,
                items.len()
            )));
        }
        Ok(CellArray { shape, items })
    }

    /// A `1xN` cell row.
    pub fn row(items: Vec<TypedValue>) -> Self {
        CellArray {
            shape: Shape::row(items.len()),
            items,
        }
    }

    /// Get the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Get the items.
    pub fn items(&self) -> &[TypedValue] {
        &self.items
    }
}

/// Any storable field value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Numeric scalar or array.
    Numeric(NumericArray),
    /// Char array.
    Char(CharArray),
    /// UTF-8 text.
    Text(String),
    /// Nested record.
    Record(Record),
    /// Cell list.
    List(CellArray),
}

impl TypedValue {
    /// The value's kind.
    pub fn kind(&self) -> Kind {
        match self {
            TypedValue::Numeric(a) => a.kind(),
            TypedValue::Char(_) => Kind::Char,
            TypedValue::Text(_) => Kind::Text,
            TypedValue::Record(_) => Kind::Record,
            TypedValue::List(_) => Kind::List,
        }
    }

    /// The value's shape. Text is a `1xN` row of bytes (`0x0` when empty),
    /// a record is a scalar.
    pub fn shape(&self) -> Shape {
        match self {
            TypedValue::Numeric(a) => a.shape().clone(),
            TypedValue::Char(c) => c.shape().clone(),
            TypedValue::Text(s) if s.is_empty() => Shape::new(vec![0, 0]),
            TypedValue::Text(s) => Shape::row(s.len()),
            TypedValue::Record(_) => Shape::scalar(),
            TypedValue::List(l) => l.shape().clone(),
        }
    }

    /// How many container levels this value spans: 0 for leaves, 1 for a
    /// record or list of leaves, and so on.
    pub fn depth(&self) -> usize {
        match self {
            TypedValue::Record(r) => 1 + r.iter().map(|f| f.value().depth()).max().unwrap_or(0),
            TypedValue::List(l) => 1 + l.items().iter().map(|v| v.depth()).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Get the text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the numeric array, if this is one.
    pub fn as_numeric(&self) -> Option<&NumericArray> {
        match self {
            TypedValue::Numeric(a) => Some(a),
            _ => None,
        }
    }

    /// Get the nested record, if this is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            TypedValue::Record(r) => Some(r),
            _ => None,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for TypedValue {
                fn from(value: $ty) -> Self {
                    TypedValue::Numeric(NumericArray::scalar(value))
                }
            }
        )*
    };
}

impl_from_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::Text(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::Text(value)
    }
}

impl From<NumericArray> for TypedValue {
    fn from(value: NumericArray) -> Self {
        TypedValue::Numeric(value)
    }
}

impl From<CharArray> for TypedValue {
    fn from(value: CharArray) -> Self {
        TypedValue::Char(value)
    }
}

impl From<Record> for TypedValue {
    fn from(value: Record) -> Self {
        TypedValue::Record(value)
    }
}

impl From<CellArray> for TypedValue {
    fn from(value: CellArray) -> Self {
        TypedValue::List(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_size_checked() {
        let err = NumericArray::new(DataType::Int16, Shape::new(vec![2, 2]), vec![0; 6]);
        assert!(matches!(
            err,
            Err(Error::InvalidDimensions { expected: 8, found: 6 })
        ));
    }

    #[test]
    fn test_oversized_shape_refused() {
        let huge = Shape::new(vec![usize::MAX, 2]);
        assert!(matches!(
            NumericArray::new(DataType::Double, huge.clone(), Vec::new()),
            Err(Error::Argument { .. })
        ));
        assert!(CharArray::new(huge.clone(), Vec::new()).is_err());
        assert!(CellArray::new(huge, Vec::new()).is_err());
    }

    #[test]
    fn test_scalar_kind_is_canonical() {
        let one = NumericArray::from_vec(vec![1, 1], vec![5i32]).unwrap();
        assert_eq!(one.kind(), Kind::Int32);
        assert_eq!(one, NumericArray::scalar(5i32));

        let many = NumericArray::from_vec(vec![3], vec![1.0f32, 2.0, 3.0]).unwrap();
        assert_eq!(many.kind(), Kind::NDArray(DataType::Single));
    }

    #[test]
    fn test_to_vec_type_checked() {
        let a = NumericArray::from_vec(vec![2], vec![1u8, 2]).unwrap();
        assert_eq!(a.to_vec::<u8>().unwrap(), vec![1, 2]);
        assert!(matches!(a.to_vec::<i8>(), Err(Error::DataTypeMismatch { .. })));
    }

    #[test]
    fn test_char_rows_column_major() {
        let c = CharArray::from_rows(&[b"abc", b"def"]).unwrap();
        assert_eq!(c.shape().dims(), &[2, 3]);
        assert_eq!(c.as_bytes(), b"adbecf");
    }

    #[test]
    fn test_text_shape() {
        assert_eq!(TypedValue::from("").shape().dims(), &[0, 0]);
        assert_eq!(TypedValue::from("abc").shape().dims(), &[1, 3]);
    }

    #[test]
    fn test_depth() {
        let mut inner = Record::new();
        inner.insert("x", 1.0).unwrap();
        let mut outer = Record::new();
        outer.insert("inner", inner.clone()).unwrap();

        assert_eq!(TypedValue::from(1.0).depth(), 0);
        assert_eq!(TypedValue::from(inner).depth(), 1);
        assert_eq!(TypedValue::from(outer).depth(), 2);
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn test_ndarray_column_major() {
        let array = ndarray::arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn();
        let a = NumericArray::from_ndarray(&array);

        assert_eq!(a.shape().dims(), &[2, 3]);
        assert_eq!(a.to_vec::<f64>().unwrap(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(a.to_ndarray::<f64>().unwrap(), array);
    }
}
