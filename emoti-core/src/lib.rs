//! Core of the EmotiLang toolchain.
//!
//! This crate provides the whole compiler pipeline for EmotiLang, a small
//! statically typed language written in emoticons. The pipeline is:
//!
//!   source .emoti
//!     -> lexer      (tokens)
//!     -> parser     (surface AST)
//!     -> typecheck  (scopes + types, lowered to HIR)
//!     -> codegen_js (JavaScript text)
//!
//! `compile` runs all of it and never fails: problems come back as
//! diagnostics inside the `CompileResult`. Higher-level tools (CLI, web
//! playground) should depend on this crate rather than reimplementing the
//! pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: types, name resolution and type checking, HIR
// ---------------------------------------------------------------------

pub mod types;
pub mod typecheck;
pub mod hir;

// ---------------------------------------------------------------------
// Host bindings and source discovery
// ---------------------------------------------------------------------

pub mod builtins;
pub mod sources;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen_js;
pub mod compiler;
pub mod response;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{
    CompileOptions, CompileResult, MAX_DEPTH_CEILING, compile, compile_js, compile_with_options,
};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity, Stage};
pub use error::CoreError;
pub use response::CompileResponse;
pub use sources::{SourceFile, load_source_files};
