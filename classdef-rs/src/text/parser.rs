//! Line-oriented parser for text containers.
//!
//! The parser pulls lines from any [`BufRead`] one at a time and yields one
//! record per call to [`Parser::next_record`], so a large container is
//! never held in memory as a whole.

use std::io::BufRead;

use crate::codec::EncodedRecord;
use crate::error::{Error, Result};
use crate::shape::Shape;

use super::literal::{is_field_name, TextField, TextLiteral, Token};

/// What a non-field line means.
enum Header {
    /// `# classdef: Name`
    Class(String),
    /// `# struct`
    Anonymous,
}

/// Incremental record parser.
#[derive(Debug)]
pub struct Parser<R> {
    reader: R,
    line_no: usize,
    peeked: Option<(usize, String)>,
}

impl<R: BufRead> Parser<R> {
    /// Create a parser reading from `reader`.
    pub fn new(reader: R) -> Self {
        Parser {
            reader,
            line_no: 0,
            peeked: None,
        }
    }

    /// Parse the next record, or return `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<EncodedRecord<TextField>>> {
        let class_name = loop {
            let Some((line_no, line)) = self.next_line()? else {
                return Ok(None);
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_header(trimmed, line_no)? {
                Some(Header::Class(name)) => break Some(name),
                Some(Header::Anonymous) => break None,
                None if trimmed.starts_with('#') => continue,
                None => return Err(Error::parse(line_no, "expected a record header")),
            }
        };

        let mut fields = Vec::new();
        while let Some((line_no, line)) = self.next_line()? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('#') {
                if parse_header(trimmed, line_no)?.is_some() {
                    self.peeked = Some((line_no, line));
                    break;
                }
                continue;
            }
            fields.push(self.parse_field(trimmed, line_no)?);
        }

        Ok(Some(EncodedRecord { class_name, fields }))
    }

    fn next_line(&mut self) -> Result<Option<(usize, String)>> {
        if let Some(peeked) = self.peeked.take() {
            return Ok(Some(peeked));
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(len);
        Ok(Some((self.line_no, line)))
    }

    fn parse_field(&mut self, line: &str, line_no: usize) -> Result<TextField> {
        let (name, rest) = line
            .split_once('=')
            .ok_or_else(|| Error::parse(line_no, "expected 'Name = value'"))?;
        let name = name.trim();
        if !is_field_name(name) {
            return Err(Error::parse(line_no, format!("invalid field name '{}'", name)));
        }
        let value = self.parse_literal(rest.trim(), line_no)?;
        Ok(TextField {
            name: name.to_string(),
            value,
        })
    }

    fn parse_literal(&mut self, text: &str, line_no: usize) -> Result<TextLiteral> {
        if text.starts_with('"') {
            let (s, rest) = unquote_text(text, line_no)?;
            expect_end(rest, line_no)?;
            return Ok(TextLiteral::Text(s));
        }

        if let Some(rest) = text.strip_prefix("struct") {
            match rest.trim() {
                "{}" => return Ok(TextLiteral::Struct(Vec::new())),
                "{" => return self.parse_struct_body(line_no).map(TextLiteral::Struct),
                _ => {}
            }
        }

        let tag_len = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        let (tag, rest) = text.split_at(tag_len);
        if tag.is_empty() {
            return Err(Error::parse(line_no, "expected a value"));
        }

        if let Some(inner) = rest.strip_prefix('(') {
            let (token, rest) = inner
                .split_once(')')
                .ok_or_else(|| Error::parse(line_no, "missing ')'"))?;
            expect_end(rest, line_no)?;
            return Ok(TextLiteral::Scalar {
                tag: tag.to_string(),
                token: token.trim().to_string(),
            });
        }

        if let Some(inner) = rest.strip_prefix('[') {
            let (dims, rest) = inner
                .split_once(']')
                .ok_or_else(|| Error::parse(line_no, "missing ']' after dimensions"))?;
            let shape: Shape = dims
                .parse()
                .map_err(|e| Error::parse(line_no, format!("bad dimensions '{}': {}", dims, e)))?;
            if shape.checked_numel().is_none() {
                return Err(Error::parse(line_no, format!("dimensions '{}' overflow", dims)));
            }
            let body = rest
                .trim_start()
                .strip_prefix('[')
                .ok_or_else(|| Error::parse(line_no, "expected '[' to open the array body"))?;
            let pages = self.parse_array_body(body, line_no)?;
            return Ok(TextLiteral::Array {
                tag: tag.to_string(),
                shape,
                pages,
            });
        }

        Err(Error::parse(line_no, format!("expected '(' or '[' after '{}'", tag)))
    }

    fn parse_struct_body(&mut self, open_line: usize) -> Result<Vec<TextField>> {
        let mut fields = Vec::new();
        loop {
            let Some((line_no, line)) = self.next_line()? else {
                return Err(Error::parse(open_line, "unterminated struct"));
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed == "}" {
                return Ok(fields);
            }
            fields.push(self.parse_field(trimmed, line_no)?);
        }
    }

    /// Collect the body after the opening `[`, pulling continuation lines
    /// until the bracket closes. A line break inside the body separates rows.
    fn parse_array_body(&mut self, first: &str, open_line: usize) -> Result<Vec<Vec<Vec<Token>>>> {
        let mut body = first.to_string();
        let mut line_no = open_line;
        let close = loop {
            if let Some(close) = find_close(&body) {
                break close;
            }
            let Some((next_no, next)) = self.next_line()? else {
                return Err(Error::parse(open_line, "unterminated array"));
            };
            line_no = next_no;
            body.push('\n');
            body.push_str(&next);
        };
        expect_end(&body[close + 1..], line_no)?;
        tokenize(&body[..close], open_line)
    }
}

fn parse_header(line: &str, line_no: usize) -> Result<Option<Header>> {
    let Some(comment) = line.strip_prefix('#') else {
        return Ok(None);
    };
    let comment = comment.trim();
    if comment == "struct" {
        return Ok(Some(Header::Anonymous));
    }
    match comment.strip_prefix("classdef:") {
        Some(name) if !name.trim().is_empty() => Ok(Some(Header::Class(name.trim().to_string()))),
        Some(_) => Err(Error::parse(line_no, "missing class name")),
        None => Ok(None),
    }
}

fn expect_end(rest: &str, line_no: usize) -> Result<()> {
    if rest.trim().is_empty() {
        Ok(())
    } else {
        Err(Error::parse(line_no, format!("unexpected '{}'", rest.trim())))
    }
}

/// Byte offset of the `]` that closes an array body, skipping quoted rows.
fn find_close(body: &str) -> Option<usize> {
    let mut in_quote = false;
    let mut escaped = false;
    for (i, b) in body.bytes().enumerate() {
        match b {
            _ if escaped => escaped = false,
            b'\\' if in_quote => escaped = true,
            b'\'' => in_quote = !in_quote,
            b']' if !in_quote => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split an array body into pages (`|`), rows (`;` or newline) and tokens.
/// Empty rows and pages are dropped.
fn tokenize(body: &str, line_no: usize) -> Result<Vec<Vec<Vec<Token>>>> {
    let mut pages = Vec::new();
    let mut rows: Vec<Vec<Token>> = Vec::new();
    let mut row: Vec<Token> = Vec::new();
    let mut number = String::new();
    let mut chars = body.char_indices();

    fn end_number(number: &mut String, row: &mut Vec<Token>) {
        if !number.is_empty() {
            row.push(Token::Number(std::mem::take(number)));
        }
    }

    while let Some((_, c)) = chars.next() {
        match c {
            ' ' | '\t' | ',' => end_number(&mut number, &mut row),
            ';' | '\n' | '\r' => {
                end_number(&mut number, &mut row);
                if !row.is_empty() {
                    rows.push(std::mem::take(&mut row));
                }
            }
            '|' => {
                end_number(&mut number, &mut row);
                if !row.is_empty() {
                    rows.push(std::mem::take(&mut row));
                }
                if !rows.is_empty() {
                    pages.push(std::mem::take(&mut rows));
                }
            }
            '\'' => {
                if !number.is_empty() {
                    return Err(Error::parse(line_no, "missing separator before quote"));
                }
                let mut bytes = Vec::new();
                loop {
                    match chars.next() {
                        None => return Err(Error::parse(line_no, "unterminated char row")),
                        Some((_, '\'')) => break,
                        Some((_, '\\')) => bytes.push(unescape_char_byte(&mut chars, line_no)?),
                        Some((_, other)) => {
                            let mut buf = [0u8; 4];
                            bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
                        }
                    }
                }
                row.push(Token::Chars(bytes));
            }
            other => number.push(other),
        }
    }
    end_number(&mut number, &mut row);
    if !row.is_empty() {
        rows.push(row);
    }
    if !rows.is_empty() {
        pages.push(rows);
    }
    Ok(pages)
}

fn unescape_char_byte<I>(chars: &mut I, line_no: usize) -> Result<u8>
where
    I: Iterator<Item = (usize, char)>,
{
    match chars.next().map(|(_, c)| c) {
        Some('\\') => Ok(b'\\'),
        Some('\'') => Ok(b'\''),
        Some('x') => {
            let hex: String = chars.by_ref().take(2).map(|(_, c)| c).collect();
            u8::from_str_radix(&hex, 16)
                .map_err(|_| Error::parse(line_no, format!("bad escape '\\x{}'", hex)))
        }
        Some(other) => Err(Error::parse(line_no, format!("unknown escape '\\{}'", other))),
        None => Err(Error::parse(line_no, "unterminated escape")),
    }
}

/// Parse a double-quoted string at the start of `text`, returning the
/// unescaped contents and whatever follows the closing quote.
fn unquote_text(text: &str, line_no: usize) -> Result<(String, &str)> {
    let mut out = String::new();
    let mut chars = text.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &text[i + 1..])),
            '\\' => match chars.next().map(|(_, c)| c) {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('u') => {
                    let mut code = String::new();
                    if chars.next().map(|(_, c)| c) != Some('{') {
                        return Err(Error::parse(line_no, "expected '{' after '\\u'"));
                    }
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => code.push(c),
                            None => return Err(Error::parse(line_no, "unterminated '\\u{'")),
                        }
                    }
                    let ch = u32::from_str_radix(&code, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| Error::parse(line_no, format!("bad escape '\\u{{{}}}'", code)))?;
                    out.push(ch);
                }
                Some(other) => {
                    return Err(Error::parse(line_no, format!("unknown escape '\\{}'", other)))
                }
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(Error::parse(line_no, "unterminated string"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_all(text: &str) -> Result<Vec<EncodedRecord<TextField>>> {
        let mut parser = Parser::new(Cursor::new(text));
        let mut records = Vec::new();
        while let Some(record) = parser.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    #[test]
    fn test_header_and_fields() {
        let records = parse_all(
            "# Created by hand\n# classdef: Person\nName = \"Thomas\"\nAge = int32(42)\n",
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].class_name.as_deref(), Some("Person"));
        assert_eq!(records[0].fields[0].value, TextLiteral::Text("Thomas".into()));
        assert_eq!(
            records[0].fields[1].value,
            TextLiteral::Scalar {
                tag: "int32".into(),
                token: "42".into()
            }
        );
    }

    #[test]
    fn test_multiple_records() {
        let records = parse_all("# struct\nA = int8(1)\n\n# classdef: B\nX = \"\"\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].class_name, None);
        assert_eq!(records[1].class_name.as_deref(), Some("B"));
    }

    #[test]
    fn test_multiline_matrix() {
        let records = parse_all("# struct\nM = double[2x3] [1 2 3\n  4 5 6]\n").unwrap();
        let TextLiteral::Array { pages, .. } = &records[0].fields[0].value else {
            panic!("expected an array");
        };
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 2);
        assert_eq!(pages[0][1][2], Token::Number("6".into()));
    }

    #[test]
    fn test_char_rows_with_brackets() {
        let records = parse_all("# struct\nC = char[1x3] ['a]\\'']\n").unwrap();
        let TextLiteral::Array { pages, .. } = &records[0].fields[0].value else {
            panic!("expected an array");
        };
        assert_eq!(pages[0][0][0], Token::Chars(b"a]'".to_vec()));
    }

    #[test]
    fn test_nested_struct() {
        let records = parse_all("# struct\nAddr = struct {\n  City = \"Paris\"\n}\nZip = uint16(75)\n")
            .unwrap();
        assert_eq!(records[0].fields.len(), 2);
        assert!(matches!(&records[0].fields[0].value, TextLiteral::Struct(f) if f.len() == 1));
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = parse_all("# struct\nA = int8(1)\nB int8(2)\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }));

        let err = parse_all("A = int8(1)\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));

        let err = parse_all("# struct\nA = double[1x2] [1 2\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_overflowing_dimensions() {
        let err = parse_all("# struct\nM = double[4294967296x4294967296x4294967296] []\n")
            .unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_bad_field_names() {
        for line in ["my field = int8(1)", "}x = int8(1)", " = int8(1)"] {
            let err = parse_all(&format!("# struct\n{}\n", line)).unwrap_err();
            assert!(matches!(err, Error::Parse { line: 2, .. }), "{}", line);
        }
    }

    #[test]
    fn test_text_escapes() {
        let records = parse_all("# struct\nT = \"a\\\"b\\n\\u{263a}\"\n").unwrap();
        assert_eq!(records[0].fields[0].value, TextLiteral::Text("a\"b\n\u{263a}".into()));
    }
}
