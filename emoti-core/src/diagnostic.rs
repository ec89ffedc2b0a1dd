//! Diagnostics shared by every compiler stage.
//!
//! A compilation owns exactly one `Diagnostics` list. Stages append to it
//! in the order problems are found and nothing is ever removed, so the
//! rendered list doubles as a chronological trace of what went wrong.

use core::fmt;

use crate::span::Span;

/// Pipeline stage that recorded a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Driver,
    Lexer,
    Parser,
    Resolver,
    CodeGen,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Driver => "driver",
            Stage::Lexer => "lexer",
            Stage::Parser => "parser",
            Stage::Resolver => "resolver",
            Stage::CodeGen => "codegen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Error taxonomy of the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    LexicalError,
    SyntaxError,
    NameError,
    RedeclarationError,
    TypeError,
    LimitExceeded,
    /// Non-fatal remark, only ever recorded with `Severity::Warning`.
    Lint,
}

impl DiagnosticKind {
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticKind::LexicalError => "LexicalError",
            DiagnosticKind::SyntaxError => "SyntaxError",
            DiagnosticKind::NameError => "NameError",
            DiagnosticKind::RedeclarationError => "RedeclarationError",
            DiagnosticKind::TypeError => "TypeError",
            DiagnosticKind::LimitExceeded => "LimitExceeded",
            DiagnosticKind::Lint => "Warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(
        stage: Stage,
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Diagnostic {
            stage,
            severity: Severity::Error,
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn warning(stage: Stage, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            stage,
            severity: Severity::Warning,
            kind: DiagnosticKind::Lint,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Renders as `stage: Kind at line L, column C: message`.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}: {}",
            self.stage.name(),
            self.kind.name(),
            self.span,
            self.message
        )
    }
}

/// Append-only, ordered collection of diagnostics for one compilation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One rendered diagnostic per line, in recording order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for diagnostic in &self.items {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
        out
    }
}
