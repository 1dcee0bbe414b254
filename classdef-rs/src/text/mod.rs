//! Line-oriented text containers.
//!
//! # Format
//!
//! ```text
//! # Created by classdef-rs
//! # classdef: Person
//! Name = "Thomas"
//! Age = int32(42)
//! Scores = double[2x3] [1.0 2.0 3.0; 4.0 5.0 6.0]
//! Tag = char[2x3] ['abc'; 'def']
//! Cube = uint8[2x2x2] [1 2; 3 4 | 5 6; 7 8]
//! Address = struct {
//!   City = "Paris"
//! }
//! ```
//!
//! A `# classdef: <Name>` or `# struct` line opens a record; any other `#`
//! line is a comment. Scalars are written `type(value)`, arrays
//! `type[dims] [rows]` with `;` between rows and `|` between pages. An
//! array body may span several lines, each line break starting a new row.
//! Text is double-quoted with `\\`, `\"`, `\n`, `\r`, `\t` and `\u{..}`
//! escapes; char rows are single-quoted with `\\`, `\'` and `\xNN`.

mod backend;
mod codec;
mod literal;
mod parser;

pub use backend::{TextBackend, TextReader, TextWriter};
pub use codec::TextCodec;
pub use literal::{TextField, TextLiteral, Token};
