//! In-memory form of MAT variables and file headers.

use crate::error::{Error, Result};

use super::class::{MatClass, MiType};

/// Size of the fixed file header.
pub const HEADER_LEN: usize = 128;

/// Length of the descriptive text at the start of the header.
pub const HEADER_TEXT_LEN: usize = 116;

/// Version field of a Level 5 file.
pub const VERSION_5: u16 = 0x0100;

/// Version field of a v7.3 (HDF5-based) file.
pub const VERSION_73: u16 = 0x0200;

const CLASS_PREFIX: &str = "Class: ";

/// The 128-byte MAT file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatHeader {
    /// Descriptive text, at most 116 bytes.
    pub text: String,
    /// Format version.
    pub version: u16,
    /// True if the file was written big-endian (`MI` marker).
    pub big_endian: bool,
}

impl MatHeader {
    /// Header for a new file, recording `class_name` in the text.
    ///
    /// Fails if the name contains a comma or doesn't fit in the text.
    pub fn new(class_name: Option<&str>) -> Result<Self> {
        let mut text = format!(
            "MATLAB 5.0 MAT-file, Platform: {}, Created by: classdef-rs",
            std::env::consts::OS
        );
        if let Some(class) = class_name {
            if class.contains(',') {
                return Err(Error::argument(format!(
                    "class name '{}' can't be recorded in a MAT header",
                    class
                )));
            }
            text.push_str(", ");
            text.push_str(CLASS_PREFIX);
            text.push_str(class);
        }
        if text.len() > HEADER_TEXT_LEN {
            return Err(Error::argument(format!(
                "class name '{}' doesn't fit in the {}-byte MAT header text",
                class_name.unwrap_or_default(),
                HEADER_TEXT_LEN
            )));
        }
        Ok(MatHeader {
            text,
            version: VERSION_5,
            big_endian: false,
        })
    }

    /// Class name recorded in the header text, if any.
    pub fn class_name(&self) -> Option<&str> {
        let start = self.text.find(CLASS_PREFIX)? + CLASS_PREFIX.len();
        let name = self.text[start..]
            .split(',')
            .next()
            .unwrap_or_default()
            .trim_matches(|c: char| c.is_whitespace() || c == '\0');
        (!name.is_empty()).then_some(name)
    }
}

/// Payload of a [`MatVar`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatData {
    /// Numeric or char data: the real part, little-endian, as stored.
    Numeric {
        /// Storage type of the data element.
        stored: MiType,
        /// Raw little-endian bytes.
        bytes: Vec<u8>,
    },

    /// Struct fields. `elements` holds one variable per field per struct
    /// element, field-fastest.
    Struct {
        /// Field names in order.
        field_names: Vec<String>,
        /// Field values.
        elements: Vec<MatVar>,
    },

    /// Cell items in column-major order.
    Cell(Vec<MatVar>),

    /// A class this layer doesn't decode.
    Opaque,
}

/// One array as stored in a MAT file.
#[derive(Debug, Clone, PartialEq)]
pub struct MatVar {
    /// Variable name; empty for struct fields and cell items.
    pub name: String,
    /// Raw `mxClass` code from the array flags.
    pub class: u8,
    /// Dimensions, at least two.
    pub dims: Vec<usize>,
    /// Whether the array has an imaginary part.
    pub complex: bool,
    /// The payload.
    pub data: MatData,
}

impl MatVar {
    /// The decoded class, if the code is known.
    pub fn class(&self) -> Option<MatClass> {
        MatClass::from_code(self.class)
    }

    /// Number of elements, saturating at `usize::MAX`.
    pub fn numel(&self) -> usize {
        self.dims
            .iter()
            .try_fold(1usize, |n, &d| n.checked_mul(d))
            .unwrap_or(usize::MAX)
    }

    /// An empty `0x0` double, as MATLAB stores `[]`.
    pub fn empty(name: impl Into<String>) -> Self {
        MatVar {
            name: name.into(),
            class: MatClass::Double.code(),
            dims: vec![0, 0],
            complex: false,
            data: MatData::Numeric {
                stored: MiType::Double,
                bytes: Vec::new(),
            },
        }
    }
}

/// Whether variables are written through `miCOMPRESSED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Store elements as is.
    #[default]
    None,
    /// zlib at the default level.
    Default,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_class_name() {
        let header = MatHeader::new(Some("Person")).unwrap();
        assert!(header.text.starts_with("MATLAB 5.0 MAT-file"));
        assert_eq!(header.class_name(), Some("Person"));
        assert_eq!(MatHeader::new(None).unwrap().class_name(), None);
    }

    #[test]
    fn test_header_class_must_fit() {
        let long = "C".repeat(200);
        assert!(matches!(MatHeader::new(Some(&long)), Err(Error::Argument { .. })));
        assert!(matches!(MatHeader::new(Some("a,b")), Err(Error::Argument { .. })));

        let widest = "C".repeat(HEADER_TEXT_LEN - MatHeader::new(Some("")).unwrap().text.len());
        let header = MatHeader::new(Some(&widest)).unwrap();
        assert_eq!(header.text.len(), HEADER_TEXT_LEN);
        assert_eq!(header.class_name(), Some(widest.as_str()));
    }

    #[test]
    fn test_numel_saturates() {
        let mut var = MatVar::empty("x");
        assert_eq!(var.numel(), 0);
        var.dims = vec![usize::MAX, 2];
        assert_eq!(var.numel(), usize::MAX);
    }
}
