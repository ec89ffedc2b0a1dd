//! Source positions.
//!
//! Every token, AST node and diagnostic carries a `Span` pointing at the
//! first character of the construct. Lines and columns are 1-based and
//! columns count Unicode scalar values, not bytes, so that a position in
//! a line full of emoticon glyphs still matches what an editor shows.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset into the source text.
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(offset: u32, line: u32, column: u32) -> Self {
        Span {
            offset,
            line,
            column,
        }
    }

    /// Position of the very first character of a source file.
    pub fn start() -> Self {
        Span::new(0, 1, 1)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
