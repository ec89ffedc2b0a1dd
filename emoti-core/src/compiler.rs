use core::fmt::Write as _;

use tracing::{debug, warn};

use crate::codegen_js::generate_js;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Stage};
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind, lex};
use crate::parser::parse;
use crate::span::Span;
use crate::typecheck::resolve;

/// Highest nesting limit any compilation runs with. Every stage recurses
/// once per level, so larger values would let hostile input exhaust the
/// native stack again.
pub const MAX_DEPTH_CEILING: usize = 512;

/// Limits and trace settings for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Deepest expression or block nesting accepted by every stage. Each
    /// binary operator in a chain counts as one level. Values above
    /// [`MAX_DEPTH_CEILING`] are clamped to it.
    pub max_depth: usize,
    /// Larger inputs are rejected before lexing.
    pub max_source_bytes: usize,
    /// Include the full token listing in the debug trace.
    pub trace_tokens: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_depth: 256,
            max_source_bytes: 256 * 1024,
            trace_tokens: true,
        }
    }
}

/// Everything a caller learns from one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub success: bool,
    /// Generated JavaScript; empty unless `success`.
    pub generated_code: String,
    /// Human readable stage trace, always present.
    pub debug_trace: String,
    /// Every diagnostic, one per line; empty on success.
    pub error_summary: String,
}

impl CompileOptions {
    /// The nesting limit actually enforced.
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.min(MAX_DEPTH_CEILING)
    }
}

pub fn compile(source: &str) -> CompileResult {
    compile_with_options(source, &CompileOptions::default())
}

/// Run the whole pipeline. Never panics on malformed input: every
/// problem ends up in the returned diagnostics.
pub fn compile_with_options(source: &str, options: &CompileOptions) -> CompileResult {
    let mut diagnostics = Diagnostics::new();
    let mut trace = String::new();
    let max_depth = options.effective_max_depth();

    if source.len() > options.max_source_bytes {
        warn!(
            bytes = source.len(),
            limit = options.max_source_bytes,
            "source rejected by size limit"
        );
        diagnostics.push(Diagnostic::error(
            Stage::Driver,
            DiagnosticKind::LimitExceeded,
            format!(
                "source is {} bytes, larger than the limit of {} bytes",
                source.len(),
                options.max_source_bytes
            ),
            Span::start(),
        ));
        return finish(trace, None, &diagnostics);
    }

    let lexed = lex(source);
    debug!(
        tokens = lexed.tokens.len(),
        errors = lexed.diagnostics.len(),
        "lexed source"
    );
    diagnostics.extend(lexed.diagnostics);
    trace.push_str("=== LEXER ===\n");
    if options.trace_tokens {
        render_tokens(&mut trace, &lexed.tokens);
    } else {
        let _ = writeln!(trace, "{} tokens", lexed.tokens.len());
    }

    let parsed = parse(&lexed.tokens, max_depth);
    debug!(
        statements = parsed.program.as_ref().map_or(0, |p| p.statements.len()),
        errors = parsed.diagnostics.len(),
        "parsed tokens"
    );
    diagnostics.extend(parsed.diagnostics);
    trace.push_str("=== PARSER ===\n");
    let Some(program) = parsed.program else {
        warn!(limit = max_depth, "parser nesting limit exceeded");
        trace.push_str("aborted\n");
        return finish(trace, None, &diagnostics);
    };
    trace.push_str(&program.render_tree());

    trace.push_str("=== RESOLVER ===\n");
    if diagnostics.has_errors() {
        trace.push_str("skipped: earlier stages reported errors\n");
        return finish(trace, None, &diagnostics);
    }
    let resolved = resolve(&program, max_depth);
    debug!(
        diagnostics = resolved.diagnostics.len(),
        ok = resolved.module.is_some(),
        "resolved program"
    );
    if resolved
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::LimitExceeded)
    {
        warn!(limit = max_depth, "resolver nesting limit exceeded");
    }
    diagnostics.extend(resolved.diagnostics);
    let Some(module) = resolved.module else {
        trace.push_str("failed\n");
        return finish(trace, None, &diagnostics);
    };
    let _ = writeln!(
        trace,
        "ok: {} top-level statement(s), {} function(s)",
        module.statements.len(),
        module.function_count()
    );

    trace.push_str("=== CODEGEN ===\n");
    match generate_js(&module, max_depth) {
        Ok(code) => {
            let _ = writeln!(trace, "{} line(s) of JavaScript", code.lines().count());
            finish(trace, Some(code), &diagnostics)
        }
        Err(diagnostic) => {
            warn!(limit = max_depth, "codegen nesting limit exceeded");
            trace.push_str("failed\n");
            diagnostics.push(diagnostic);
            finish(trace, None, &diagnostics)
        }
    }
}

/// Compile and return only the generated code, for callers that treat
/// any diagnostic error as a hard failure.
pub fn compile_js(source: &str) -> Result<String, CoreError> {
    let result = compile(source);
    if result.success {
        Ok(result.generated_code)
    } else {
        Err(CoreError::Compilation {
            summary: result.error_summary,
        })
    }
}

fn render_tokens(trace: &mut String, tokens: &[Token]) {
    for token in tokens {
        let _ = write!(
            trace,
            "{}:{} {:?}",
            token.span.line, token.span.column, token.kind
        );
        match token.kind {
            TokenKind::Eof => {}
            TokenKind::String => {
                let _ = write!(trace, " {:?}", token.lexeme);
            }
            _ => {
                let _ = write!(trace, " {}", token.lexeme);
            }
        }
        trace.push('\n');
    }
}

fn finish(mut trace: String, code: Option<String>, diagnostics: &Diagnostics) -> CompileResult {
    let success = code.is_some() && !diagnostics.has_errors();
    trace.push_str("=== DIAGNOSTICS ===\n");
    if diagnostics.is_empty() {
        trace.push_str("(none)\n");
    } else {
        trace.push_str(&diagnostics.render());
    }
    debug!(
        success,
        errors = diagnostics.error_count(),
        "compilation finished"
    );
    CompileResult {
        success,
        generated_code: if success { code.unwrap_or_default() } else { String::new() },
        debug_trace: trace,
        error_summary: if success { String::new() } else { diagnostics.render() },
    }
}
