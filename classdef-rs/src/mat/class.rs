//! Array class and data element type codes of the Level 5 MAT format.

use std::fmt;

use crate::data_type::DataType;

/// The `mxClass` of a MAT array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatClass {
    /// Cell array.
    Cell,
    /// Structure.
    Struct,
    /// Object.
    Object,
    /// Character array.
    Char,
    /// Sparse array.
    Sparse,
    /// Double precision.
    Double,
    /// Single precision.
    Single,
    /// 8-bit signed integer.
    Int8,
    /// 8-bit unsigned integer.
    UInt8,
    /// 16-bit signed integer.
    Int16,
    /// 16-bit unsigned integer.
    UInt16,
    /// 32-bit signed integer.
    Int32,
    /// 32-bit unsigned integer.
    UInt32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit unsigned integer.
    UInt64,
    /// Function handle.
    Function,
    /// Opaque (e.g. classdef object).
    Opaque,
}

impl MatClass {
    /// Look up a class by its code in the array flags.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => MatClass::Cell,
            2 => MatClass::Struct,
            3 => MatClass::Object,
            4 => MatClass::Char,
            5 => MatClass::Sparse,
            6 => MatClass::Double,
            7 => MatClass::Single,
            8 => MatClass::Int8,
            9 => MatClass::UInt8,
            10 => MatClass::Int16,
            11 => MatClass::UInt16,
            12 => MatClass::Int32,
            13 => MatClass::UInt32,
            14 => MatClass::Int64,
            15 => MatClass::UInt64,
            16 => MatClass::Function,
            17 => MatClass::Opaque,
            _ => return None,
        })
    }

    /// The code stored in the array flags.
    pub fn code(self) -> u8 {
        match self {
            MatClass::Cell => 1,
            MatClass::Struct => 2,
            MatClass::Object => 3,
            MatClass::Char => 4,
            MatClass::Sparse => 5,
            MatClass::Double => 6,
            MatClass::Single => 7,
            MatClass::Int8 => 8,
            MatClass::UInt8 => 9,
            MatClass::Int16 => 10,
            MatClass::UInt16 => 11,
            MatClass::Int32 => 12,
            MatClass::UInt32 => 13,
            MatClass::Int64 => 14,
            MatClass::UInt64 => 15,
            MatClass::Function => 16,
            MatClass::Opaque => 17,
        }
    }

    /// The numeric class for an element type.
    pub fn from_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::Int8 => MatClass::Int8,
            DataType::Int16 => MatClass::Int16,
            DataType::Int32 => MatClass::Int32,
            DataType::Int64 => MatClass::Int64,
            DataType::UInt8 => MatClass::UInt8,
            DataType::UInt16 => MatClass::UInt16,
            DataType::UInt32 => MatClass::UInt32,
            DataType::UInt64 => MatClass::UInt64,
            DataType::Single => MatClass::Single,
            DataType::Double => MatClass::Double,
        }
    }

    /// Element type of a numeric class.
    pub fn data_type(self) -> Option<DataType> {
        match self {
            MatClass::Double => Some(DataType::Double),
            MatClass::Single => Some(DataType::Single),
            MatClass::Int8 => Some(DataType::Int8),
            MatClass::UInt8 => Some(DataType::UInt8),
            MatClass::Int16 => Some(DataType::Int16),
            MatClass::UInt16 => Some(DataType::UInt16),
            MatClass::Int32 => Some(DataType::Int32),
            MatClass::UInt32 => Some(DataType::UInt32),
            MatClass::Int64 => Some(DataType::Int64),
            MatClass::UInt64 => Some(DataType::UInt64),
            _ => None,
        }
    }

    /// Whether variables of this class carry a numeric data element.
    pub fn has_numeric_data(self) -> bool {
        self.data_type().is_some() || self == MatClass::Char
    }
}

impl fmt::Display for MatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatClass::Cell => "cell",
            MatClass::Struct => "struct",
            MatClass::Object => "object",
            MatClass::Char => "char",
            MatClass::Sparse => "sparse",
            MatClass::Function => "function_handle",
            MatClass::Opaque => "opaque",
            numeric => match numeric.data_type() {
                Some(dt) => dt.name(),
                None => "unknown",
            },
        };
        f.write_str(name)
    }
}

/// Data element type (`miINT8`, `miMATRIX`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiType {
    /// `miINT8`
    Int8,
    /// `miUINT8`
    UInt8,
    /// `miINT16`
    Int16,
    /// `miUINT16`
    UInt16,
    /// `miINT32`
    Int32,
    /// `miUINT32`
    UInt32,
    /// `miSINGLE`
    Single,
    /// `miDOUBLE`
    Double,
    /// `miINT64`
    Int64,
    /// `miUINT64`
    UInt64,
    /// `miMATRIX`
    Matrix,
    /// `miCOMPRESSED`
    Compressed,
    /// `miUTF8`
    Utf8,
    /// `miUTF16`
    Utf16,
    /// `miUTF32`
    Utf32,
}

impl MiType {
    /// Look up a type by its tag code.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => MiType::Int8,
            2 => MiType::UInt8,
            3 => MiType::Int16,
            4 => MiType::UInt16,
            5 => MiType::Int32,
            6 => MiType::UInt32,
            7 => MiType::Single,
            9 => MiType::Double,
            12 => MiType::Int64,
            13 => MiType::UInt64,
            14 => MiType::Matrix,
            15 => MiType::Compressed,
            16 => MiType::Utf8,
            17 => MiType::Utf16,
            18 => MiType::Utf32,
            _ => return None,
        })
    }

    /// The code written in a data element tag.
    pub fn code(self) -> u32 {
        match self {
            MiType::Int8 => 1,
            MiType::UInt8 => 2,
            MiType::Int16 => 3,
            MiType::UInt16 => 4,
            MiType::Int32 => 5,
            MiType::UInt32 => 6,
            MiType::Single => 7,
            MiType::Double => 9,
            MiType::Int64 => 12,
            MiType::UInt64 => 13,
            MiType::Matrix => 14,
            MiType::Compressed => 15,
            MiType::Utf8 => 16,
            MiType::Utf16 => 17,
            MiType::Utf32 => 18,
        }
    }

    /// Storage type for an element type.
    pub fn from_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::Int8 => MiType::Int8,
            DataType::Int16 => MiType::Int16,
            DataType::Int32 => MiType::Int32,
            DataType::Int64 => MiType::Int64,
            DataType::UInt8 => MiType::UInt8,
            DataType::UInt16 => MiType::UInt16,
            DataType::UInt32 => MiType::UInt32,
            DataType::UInt64 => MiType::UInt64,
            DataType::Single => MiType::Single,
            DataType::Double => MiType::Double,
        }
    }

    /// Element type of a numeric storage type.
    pub fn data_type(self) -> Option<DataType> {
        match self {
            MiType::Int8 => Some(DataType::Int8),
            MiType::UInt8 => Some(DataType::UInt8),
            MiType::Int16 => Some(DataType::Int16),
            MiType::UInt16 => Some(DataType::UInt16),
            MiType::Int32 => Some(DataType::Int32),
            MiType::UInt32 => Some(DataType::UInt32),
            MiType::Single => Some(DataType::Single),
            MiType::Double => Some(DataType::Double),
            MiType::Int64 => Some(DataType::Int64),
            MiType::UInt64 => Some(DataType::UInt64),
            _ => None,
        }
    }

    /// Width of one stored unit, used for byte swapping.
    pub fn unit_bytes(self) -> usize {
        match self {
            MiType::Utf16 => 2,
            MiType::Utf32 => 4,
            other => other.data_type().map_or(1, |dt| dt.size_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in 1..=17 {
            assert_eq!(MatClass::from_code(code).unwrap().code(), code);
        }
        for code in [1, 2, 3, 4, 5, 6, 7, 9, 12, 13, 14, 15, 16, 17, 18] {
            assert_eq!(MiType::from_code(code).unwrap().code(), code);
        }
        assert_eq!(MiType::from_code(8), None);
    }

    #[test]
    fn test_numeric_mapping() {
        for dt in DataType::ALL {
            assert_eq!(MatClass::from_data_type(dt).data_type(), Some(dt));
            assert_eq!(MiType::from_data_type(dt).data_type(), Some(dt));
        }
        assert!(MatClass::Char.has_numeric_data());
        assert!(!MatClass::Struct.has_numeric_data());
    }
}
