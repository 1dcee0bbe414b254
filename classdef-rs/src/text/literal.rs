//! Syntax tree of the text format, and rendering back to text.

use std::fmt::Write as _;

use crate::shape::Shape;

/// One `Name = value` line (or block) of a text container.
#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    /// Field name.
    pub name: String,
    /// Parsed value.
    pub value: TextLiteral,
}

/// A value as it appears in the text format, before type checking.
#[derive(Debug, Clone, PartialEq)]
pub enum TextLiteral {
    /// `"..."`: UTF-8 text, already unescaped.
    Text(String),

    /// `int32(42)`.
    Scalar {
        /// Type tag before the parenthesis.
        tag: String,
        /// The number between the parentheses.
        token: String,
    },

    /// `double[2x3] [1 2 3; 4 5 6]`, `char[2x3] ['abc'; 'def']`.
    Array {
        /// Type tag before the dimensions.
        tag: String,
        /// Declared dimensions.
        shape: Shape,
        /// Pages of rows of tokens, in reading order.
        pages: Vec<Vec<Vec<Token>>>,
    },

    /// `struct { ... }`.
    Struct(Vec<TextField>),
}

/// One element token inside an array body.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare number such as `-1.5`, `inf` or `NaN`.
    Number(String),
    /// A single-quoted char row, unescaped to bytes.
    Chars(Vec<u8>),
}

impl TextField {
    /// Append this field to `out`, indented by `indent` spaces.
    pub(crate) fn render(&self, indent: usize, out: &mut String) {
        push_indent(indent, out);
        out.push_str(&self.name);
        out.push_str(" = ");
        match &self.value {
            TextLiteral::Text(s) => quote_text(s, out),
            TextLiteral::Scalar { tag, token } => {
                let _ = write!(out, "{}({})", tag, token);
            }
            TextLiteral::Array { tag, shape, pages } => {
                let _ = write!(out, "{}[{}] ", tag, shape);
                render_body(pages, out);
            }
            TextLiteral::Struct(fields) => {
                out.push_str("struct {\n");
                for field in fields {
                    field.render(indent + 2, out);
                }
                push_indent(indent, out);
                out.push('}');
            }
        }
        out.push('\n');
    }
}

fn push_indent(indent: usize, out: &mut String) {
    out.extend(std::iter::repeat(' ').take(indent));
}

fn render_body(pages: &[Vec<Vec<Token>>], out: &mut String) {
    out.push('[');
    for (p, page) in pages.iter().enumerate() {
        if p > 0 {
            out.push_str(" | ");
        }
        for (r, row) in page.iter().enumerate() {
            if r > 0 {
                out.push_str("; ");
            }
            for (t, token) in row.iter().enumerate() {
                if t > 0 {
                    out.push(' ');
                }
                match token {
                    Token::Number(n) => out.push_str(n),
                    Token::Chars(bytes) => quote_chars(bytes, out),
                }
            }
        }
    }
    out.push(']');
}

/// Whether `name` reads back as the name of a `Name = value` line.
pub(crate) fn is_field_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(['#', '}'])
        && !name.contains(|c: char| c == '=' || c.is_whitespace() || c.is_control())
}

/// Write `s` as a double-quoted string literal.
pub(crate) fn quote_text(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Write raw bytes as a single-quoted char row.
pub(crate) fn quote_chars(bytes: &[u8], out: &mut String) {
    out.push('\'');
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push('\'');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nested() {
        let field = TextField {
            name: "Address".into(),
            value: TextLiteral::Struct(vec![TextField {
                name: "City".into(),
                value: TextLiteral::Text("Paris".into()),
            }]),
        };
        let mut out = String::new();
        field.render(0, &mut out);
        assert_eq!(out, "Address = struct {\n  City = \"Paris\"\n}\n");
    }

    #[test]
    fn test_render_array_pages() {
        let n = |s: &str| Token::Number(s.into());
        let field = TextField {
            name: "Cube".into(),
            value: TextLiteral::Array {
                tag: "uint8".into(),
                shape: Shape::new(vec![1, 2, 2]),
                pages: vec![vec![vec![n("1"), n("2")]], vec![vec![n("3"), n("4")]]],
            },
        };
        let mut out = String::new();
        field.render(0, &mut out);
        assert_eq!(out, "Cube = uint8[1x2x2] [1 2 | 3 4]\n");
    }

    #[test]
    fn test_escapes() {
        let mut out = String::new();
        quote_text("a\"b\\\n\u{1}", &mut out);
        assert_eq!(out, r#""a\"b\\\n\u{1}""#);

        let mut out = String::new();
        quote_chars(b"it's\xff", &mut out);
        assert_eq!(out, r"'it\'s\xff'");
    }
}
