//! Numeric element types.
//!
//! MATLAB/Octave numeric arrays come in ten element types: signed and
//! unsigned integers of 8 to 64 bits, `single` (f32) and `double` (f64).
//! The names used here are the MATLAB class names, since those are what
//! both container formats print and parse.

use std::fmt;

/// Element type of a numeric array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 8-bit signed integer (i8)
    Int8,
    /// 16-bit signed integer (i16)
    Int16,
    /// 32-bit signed integer (i32)
    Int32,
    /// 64-bit signed integer (i64)
    Int64,
    /// 8-bit unsigned integer (u8)
    UInt8,
    /// 16-bit unsigned integer (u16)
    UInt16,
    /// 32-bit unsigned integer (u32)
    UInt32,
    /// 64-bit unsigned integer (u64)
    UInt64,
    /// 32-bit floating point (f32)
    Single,
    /// 64-bit floating point (f64)
    Double,
}

impl DataType {
    /// Every numeric type, in MAT class-code order.
    pub const ALL: [DataType; 10] = [
        DataType::Double,
        DataType::Single,
        DataType::Int8,
        DataType::UInt8,
        DataType::Int16,
        DataType::UInt16,
        DataType::Int32,
        DataType::UInt32,
        DataType::Int64,
        DataType::UInt64,
    ];

    /// Get the size in bytes of a single element of this type.
    pub const fn size_bytes(&self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Single => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Double => 8,
        }
    }

    /// Check if this type is a floating-point type.
    pub const fn is_float(&self) -> bool {
        matches!(self, DataType::Single | DataType::Double)
    }

    /// Check if this type is an integer type.
    pub const fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Check if this type is a signed integer type.
    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    /// The MATLAB class name (`"int32"`, `"double"`, ...).
    pub const fn name(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Single => "single",
            DataType::Double => "double",
        }
    }

    /// Look up a type by its MATLAB class name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dt| dt.name() == name)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::Double // MATLAB's default numeric class
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust primitive that can be stored in a numeric array.
///
/// Implemented for `i8`..`i64`, `u8`..`u64`, `f32` and `f64`. Values are
/// stored little-endian regardless of host byte order.
pub trait Element: Copy + sealed::Sealed {
    /// The array element type this primitive maps to.
    const DATA_TYPE: DataType;

    /// Append the little-endian bytes of `self` to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Read a value from exactly `size_bytes()` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dt:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const DATA_TYPE: DataType = DataType::$dt;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Single,
    f64 => Double,
}
