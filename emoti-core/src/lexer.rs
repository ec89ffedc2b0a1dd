//! Lexer for EmotiLang.
//!
//! EmotiLang lexemes are short emoticon sequences that overlap heavily
//! (`:)`, `:+)`, `>:)` ...) plus a handful of multi-codepoint glyphs such
//! as `(╭ರ_•́)`. Punctuation is matched against a single table that is
//! ordered longest-first, so a lexeme is always tried before any of its
//! prefixes and glyphs are compared as whole codepoint sequences.

use crate::diagnostic::{Diagnostic, DiagnosticKind, Stage};
use crate::span::Span;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    Number,
    String,

    // Structure
    SadOpen,    // :(
    HappyClose, // :)
    Terminator, // ;)
    BlockOpen,  // :{
    BlockClose, // :}
    FieldSep,   // :,D

    // Declarations and types
    Declare,     // :<
    TypeArrow,   // :>
    NumberMark,  // :0
    StringMark,  // :L
    BooleanType, // X_X
    Assign,      // <3

    // Literals
    True,  // :D
    False, // :'(
    Input, // O_O

    // Statements
    Print,    // :P
    Function, // 🤖
    Return,   // /o/
    If,       // (╭ರ_•́)
    While,    // (⸝⸝๑﹏๑⸝⸝)
    Try,      // 🕷️
    Catch,    // 🕸️
    Throw,    // 💥

    // Operators
    Plus,     // :+)
    Minus,    // :-(
    Star,     // *_*
    Slash,    // :/
    Percent,  // :%
    Equal,    // =)
    NotEqual, // !(
    Greater,  // >:)
    Less,     // <:(
    And,      // &)
    Or,       // |)
    Not,      // !)
}

impl TokenKind {
    /// Human readable name used in parser messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string literal",
            TokenKind::SadOpen => "`:(`",
            TokenKind::HappyClose => "`:)`",
            TokenKind::Terminator => "`;)`",
            TokenKind::BlockOpen => "`:{`",
            TokenKind::BlockClose => "`:}`",
            TokenKind::FieldSep => "`:,D`",
            TokenKind::Declare => "`:<`",
            TokenKind::TypeArrow => "`:>`",
            TokenKind::NumberMark => "`:0`",
            TokenKind::StringMark => "`:L`",
            TokenKind::BooleanType => "`X_X`",
            TokenKind::Assign => "`<3`",
            TokenKind::True => "`:D`",
            TokenKind::False => "`:'(`",
            TokenKind::Input => "`O_O`",
            TokenKind::Print => "`:P`",
            TokenKind::Function => "`🤖`",
            TokenKind::Return => "`/o/`",
            TokenKind::If => "`(╭ರ_•́)`",
            TokenKind::While => "`(⸝⸝๑﹏๑⸝⸝)`",
            TokenKind::Try => "`🕷️`",
            TokenKind::Catch => "`🕸️`",
            TokenKind::Throw => "`💥`",
            TokenKind::Plus => "`:+)`",
            TokenKind::Minus => "`:-(`",
            TokenKind::Star => "`*_*`",
            TokenKind::Slash => "`:/`",
            TokenKind::Percent => "`:%`",
            TokenKind::Equal => "`=)`",
            TokenKind::NotEqual => "`!(`",
            TokenKind::Greater => "`>:)`",
            TokenKind::Less => "`<:(`",
            TokenKind::And => "`&)`",
            TokenKind::Or => "`|)`",
            TokenKind::Not => "`!)`",
        }
    }
}

/// Punctuation and glyph lexemes, longest (in bytes) first.
///
/// A lexeme never appears after one of its own proper prefixes; the
/// `symbol_table_is_prefix_safe` test keeps it that way.
pub const SYMBOLS: &[(&str, TokenKind)] = &[
    ("(\u{2E1D}\u{2E1D}\u{0E51}\u{FE4F}\u{0E51}\u{2E1D}\u{2E1D})", TokenKind::While),
    ("(\u{256D}\u{0CB0}_\u{2022}\u{0301})", TokenKind::If),
    ("\u{1F577}\u{FE0F}", TokenKind::Try),
    ("\u{1F578}\u{FE0F}", TokenKind::Catch),
    ("\u{1F577}", TokenKind::Try),
    ("\u{1F578}", TokenKind::Catch),
    ("\u{1F916}", TokenKind::Function),
    ("\u{1F4A5}", TokenKind::Throw),
    (":,D", TokenKind::FieldSep),
    (":'(", TokenKind::False),
    ("/o/", TokenKind::Return),
    (":+)", TokenKind::Plus),
    (":-(", TokenKind::Minus),
    ("*_*", TokenKind::Star),
    (">:)", TokenKind::Greater),
    ("<:(", TokenKind::Less),
    (":)", TokenKind::HappyClose),
    (":(", TokenKind::SadOpen),
    (";)", TokenKind::Terminator),
    (":{", TokenKind::BlockOpen),
    (":}", TokenKind::BlockClose),
    (":<", TokenKind::Declare),
    (":>", TokenKind::TypeArrow),
    (":0", TokenKind::NumberMark),
    (":L", TokenKind::StringMark),
    (":D", TokenKind::True),
    (":P", TokenKind::Print),
    ("<3", TokenKind::Assign),
    (":/", TokenKind::Slash),
    (":%", TokenKind::Percent),
    ("=)", TokenKind::Equal),
    ("!(", TokenKind::NotEqual),
    ("&)", TokenKind::And),
    ("|)", TokenKind::Or),
    ("!)", TokenKind::Not),
];

const COMMENT_MARKER: &str = "Z_Z";

/// A single token with its kind, text and position.
///
/// For string literals `lexeme` holds the text between the quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

/// Result of lexing a source file.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex a source string into tokens.
///
/// Always returns a token list terminated by `Eof`. Unrecognised input
/// is reported and skipped so one pass reports every lexical error.
pub fn lex(source: &str) -> LexResult {
    let mut lexer = Lexer {
        source,
        index: 0,
        line: 1,
        column: 1,
        diagnostics: Vec::new(),
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    index: usize,
    line: u32,
    column: u32,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> LexResult {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.consume_char();
                continue;
            }

            if self.rest().starts_with(COMMENT_MARKER) {
                self.skip_comment();
                continue;
            }

            let start = self.span();
            let token = if let Some((lexeme, kind)) = self.match_symbol() {
                self.consume_str(lexeme);
                Some(Token {
                    kind,
                    lexeme: lexeme.to_string(),
                    span: start,
                })
            } else if ch == '"' {
                self.lex_string(start)
            } else if ch.is_ascii_digit() {
                self.lex_number(start)
            } else if is_ident_start(ch) {
                Some(self.lex_ident_or_keyword(start))
            } else {
                self.consume_char();
                self.error(start, format!("unrecognized character `{ch}`"));
                None
            };

            if let Some(tok) = token {
                tokens.push(tok);
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: self.span(),
        });

        LexResult {
            tokens,
            diagnostics: core::mem::take(&mut self.diagnostics),
        }
    }

    fn match_symbol(&self) -> Option<(&'static str, TokenKind)> {
        let rest = self.rest();
        SYMBOLS
            .iter()
            .find(|(lexeme, _)| rest.starts_with(lexeme))
            .copied()
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn lex_string(&mut self, start: Span) -> Option<Token> {
        self.consume_char(); // opening quote
        let content_start = self.index;

        let rest = self.rest();
        let closing = rest.find(['"', '\n']);
        match closing {
            Some(offset) if rest[offset..].starts_with('"') => {
                let content = &self.source[content_start..content_start + offset];
                self.consume_str(content);
                self.consume_char(); // closing quote
                Some(Token {
                    kind: TokenKind::String,
                    lexeme: content.to_string(),
                    span: start,
                })
            }
            _ => {
                self.error(start, "unterminated string literal");
                self.skip_to_boundary();
                None
            }
        }
    }

    fn lex_number(&mut self, start: Span) -> Option<Token> {
        let text_start = self.index;
        self.consume_digits();

        let mut malformed = false;
        if self.peek_char() == Some('.') {
            if self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                self.consume_char(); // '.'
                self.consume_digits();
                if self.peek_char() == Some('.') {
                    malformed = true;
                }
            } else {
                malformed = true;
            }
        }
        if self.peek_char().is_some_and(is_ident_continue) {
            malformed = true;
        }

        if malformed {
            self.skip_to_boundary();
            let text = &self.source[text_start..self.index];
            self.error(start, format!("malformed number literal `{text}`"));
            return None;
        }

        Some(Token {
            kind: TokenKind::Number,
            lexeme: self.source[text_start..self.index].to_string(),
            span: start,
        })
    }

    fn lex_ident_or_keyword(&mut self, start: Span) -> Token {
        let text_start = self.index;
        while self.peek_char().is_some_and(is_ident_continue) {
            self.consume_char();
        }
        let text = &self.source[text_start..self.index];

        let kind = match text {
            "X_X" => TokenKind::BooleanType,
            "O_O" => TokenKind::Input,
            _ => TokenKind::Ident,
        };

        Token {
            kind,
            lexeme: text.to_string(),
            span: start,
        }
    }

    /// Skip forward to the next whitespace or recognised lexeme.
    fn skip_to_boundary(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() || self.match_symbol().is_some() {
                break;
            }
            self.consume_char();
        }
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(
            Stage::Lexer,
            DiagnosticKind::LexicalError,
            message,
            span,
        ));
    }

    fn span(&self) -> Span {
        Span::new(self.index as u32, self.line, self.column)
    }

    fn rest(&self) -> &'src str {
        &self.source[self.index..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn consume_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.index += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    /// Consume `text`, which must be the next input and contain no line break.
    fn consume_str(&mut self, text: &str) {
        self.index += text.len();
        self.column += text.chars().count() as u32;
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
