//! Parser for EmotiLang.
//!
//! Statements are parsed by recursive descent, dispatching on the leading
//! token. Expressions use precedence climbing over the table in
//! `binary_op`. Every recursive entry point (expression, `!)` operand,
//! block) goes through `nested`, which enforces the configured depth
//! limit so hostile input cannot exhaust the stack.
//!
//! Syntax errors are recorded and the parser resynchronises at the next
//! statement boundary, so one run reports independent errors together.

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, FunctionDecl, Ident, Param, Program, Stmt, StmtKind,
    TypeAnnotation,
};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Stage};
use crate::lexer::{Token, TokenKind};
use crate::span::Span;
use crate::types::Type;

/// Result of parsing a token stream.
///
/// `program` is `None` only when the depth limit aborted parsing; with
/// ordinary syntax errors it holds every statement that parsed cleanly.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Option<Program>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn parse(tokens: &[Token], max_depth: usize) -> ParseResult {
    let eof_span = tokens.last().map(|t| t.span).unwrap_or_else(Span::start);
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
        eof: Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: eof_span,
        },
        diagnostics: Vec::new(),
    };
    let program = parser.parse_program().ok();
    ParseResult {
        program,
        diagnostics: parser.diagnostics,
    }
}

/// Why a parse function gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    /// A syntax error was recorded; recover at the next boundary.
    Syntax,
    /// The depth limit tripped; abandon the whole parse.
    Limit,
}

type PResult<T> = Result<T, Halt>;

/// Binding strength of `!)`: above AND, below equality.
const NOT_PRECEDENCE: u8 = 3;
const LOWEST_PRECEDENCE: u8 = 1;

fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::Or => (BinaryOp::Or, 1),
        TokenKind::And => (BinaryOp::And, 2),
        TokenKind::Equal => (BinaryOp::Eq, 4),
        TokenKind::NotEqual => (BinaryOp::Ne, 4),
        TokenKind::Greater => (BinaryOp::Gt, 5),
        TokenKind::Less => (BinaryOp::Lt, 5),
        TokenKind::Plus => (BinaryOp::Add, 6),
        TokenKind::Minus => (BinaryOp::Sub, 6),
        TokenKind::Star => (BinaryOp::Mul, 7),
        TokenKind::Slash => (BinaryOp::Div, 7),
        TokenKind::Percent => (BinaryOp::Mod, 7),
        _ => return None,
    };
    Some(entry)
}

fn starts_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Declare
            | TokenKind::Print
            | TokenKind::Function
            | TokenKind::Return
            | TokenKind::If
            | TokenKind::While
            | TokenKind::Try
            | TokenKind::Throw
    )
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
    eof: Token,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    fn parse_program(&mut self) -> PResult<Program> {
        let mut statements = Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::BlockClose) {
                self.error_here("a statement (this `:}` has no matching `:{`)");
                self.bump();
                continue;
            }
            self.statement_into(&mut statements)?;
        }
        Ok(Program { statements })
    }

    /// Parse one statement, recovering from syntax errors in place.
    fn statement_into(&mut self, statements: &mut Vec<Stmt>) -> PResult<()> {
        let before = self.pos;
        match self.parse_statement() {
            Ok(stmt) => statements.push(stmt),
            Err(Halt::Syntax) => {
                self.synchronize();
                if self.pos == before {
                    self.bump();
                }
            }
            Err(Halt::Limit) => return Err(Halt::Limit),
        }
        Ok(())
    }

    fn synchronize(&mut self) {
        loop {
            match self.current().kind {
                TokenKind::Eof | TokenKind::BlockClose => return,
                TokenKind::Terminator => {
                    self.bump();
                    return;
                }
                kind if starts_statement(kind) => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        let span = self.current().span;
        let kind = match self.current().kind {
            TokenKind::Declare => self.parse_var_decl()?,
            TokenKind::Ident => match self.peek_kind(1) {
                TokenKind::Assign => {
                    let target = self.expect_ident("assignment target")?;
                    self.bump(); // <3
                    let value = self.parse_expression()?;
                    self.expect_terminator()?;
                    StmtKind::Assign { target, value }
                }
                TokenKind::SadOpen => {
                    let callee = self.expect_ident("function name")?;
                    let call = self.parse_call(callee)?;
                    self.expect_terminator()?;
                    StmtKind::Expr(call)
                }
                _ => {
                    self.bump();
                    self.error_here("`<3` or `:(` after identifier");
                    return Err(Halt::Syntax);
                }
            },
            TokenKind::Print => {
                self.bump();
                let expr = self.parse_expression()?;
                self.expect_terminator()?;
                StmtKind::Print(expr)
            }
            TokenKind::Function => StmtKind::FunctionDecl(self.parse_function()?),
            TokenKind::Return => {
                self.bump();
                let expr = self.parse_expression()?;
                self.expect_terminator()?;
                StmtKind::Return(expr)
            }
            TokenKind::If => {
                self.bump();
                let cond = self.parse_expression()?;
                let body = self.parse_block("`:{` to open the if body")?;
                StmtKind::If { cond, body }
            }
            TokenKind::While => {
                self.bump();
                let cond = self.parse_expression()?;
                let body = self.parse_block("`:{` to open the loop body")?;
                StmtKind::While { cond, body }
            }
            TokenKind::Try => {
                self.bump();
                let body = self.parse_block("`:{` to open the try block")?;
                self.expect(TokenKind::Catch, "`🕸️` (catch) after the try block")?;
                let binding = self.expect_ident("name for the caught value")?;
                let handler = self.parse_block("`:{` to open the catch block")?;
                StmtKind::Try {
                    body,
                    binding,
                    handler,
                }
            }
            TokenKind::Throw => {
                self.bump();
                let expr = self.parse_expression()?;
                self.expect_terminator()?;
                StmtKind::Throw(expr)
            }
            _ => {
                self.error_here("a statement");
                return Err(Halt::Syntax);
            }
        };
        Ok(Stmt { kind, span })
    }

    fn parse_var_decl(&mut self) -> PResult<StmtKind> {
        self.bump(); // :<
        let name = self.expect_ident("variable name after `:<`")?;
        self.expect(TokenKind::TypeArrow, "`:>` before the variable type")?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::Assign, "`<3` before the initial value")?;
        let init = self.parse_expression()?;
        self.expect_terminator()?;
        Ok(StmtKind::VarDecl { name, ty, init })
    }

    fn parse_function(&mut self) -> PResult<FunctionDecl> {
        self.bump(); // 🤖
        let name = self.expect_ident("function name after `🤖`")?;
        self.expect(TokenKind::SadOpen, "`:(` to open the parameter list")?;

        let mut params = Vec::new();
        if !self.at(TokenKind::HappyClose) {
            loop {
                let param_name = self.expect_ident("parameter name")?;
                self.expect(TokenKind::TypeArrow, "`:>` before the parameter type")?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: param_name,
                    ty,
                });
                if self.at(TokenKind::FieldSep) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::HappyClose, "`:,D` or `:)` in the parameter list")?;
        self.expect(TokenKind::TypeArrow, "`:>` before the return type")?;
        let result = self.parse_type()?;
        let body = self.parse_block("`:{` to open the function body")?;
        Ok(FunctionDecl {
            name,
            params,
            result,
            body,
        })
    }

    fn parse_type(&mut self) -> PResult<TypeAnnotation> {
        let span = self.current().span;
        let ty = match self.current().kind {
            TokenKind::NumberMark => Type::Number,
            TokenKind::StringMark => Type::String,
            TokenKind::BooleanType => Type::Boolean,
            _ => {
                self.error_here("a type (`:0`, `:L` or `X_X`)");
                return Err(Halt::Syntax);
            }
        };
        self.bump();
        Ok(TypeAnnotation { ty, span })
    }

    fn parse_block(&mut self, opener: &str) -> PResult<Block> {
        self.nested(|p| {
            let span = p.current().span;
            p.expect(TokenKind::BlockOpen, opener)?;
            let mut statements = Vec::new();
            loop {
                match p.current().kind {
                    TokenKind::BlockClose => {
                        p.bump();
                        break;
                    }
                    TokenKind::Eof => {
                        p.error_here("`:}` to close the block");
                        return Err(Halt::Syntax);
                    }
                    _ => p.statement_into(&mut statements)?,
                }
            }
            Ok(Block { statements, span })
        })
    }

    fn parse_expression(&mut self) -> PResult<Expr> {
        self.nested(|p| p.parse_binary(LOWEST_PRECEDENCE))
    }

    /// Precedence climbing: fold operators binding at least as tight as `min`.
    ///
    /// Each fold deepens the left spine of the tree, so it counts towards
    /// the nesting limit until the whole chain is done. Later stages walk
    /// that spine recursively, which is what the limit protects.
    fn parse_binary(&mut self, min: u8) -> PResult<Expr> {
        let base = self.depth;
        let result = self.fold_binary(min);
        self.depth = base;
        result
    }

    fn fold_binary(&mut self, min: u8) -> PResult<Expr> {
        let mut lhs = self.parse_operand()?;
        while let Some((op, precedence)) = binary_op(self.current().kind) {
            if precedence < min {
                break;
            }
            let op_span = self.bump().span;
            if self.depth >= self.max_depth {
                let message = format!(
                    "operator chain exceeds the nesting limit of {}; every binary operator in a chain counts as one level",
                    self.max_depth
                );
                return Err(self.limit_exceeded(op_span, message));
            }
            self.depth += 1;
            let rhs = self.parse_binary(precedence + 1)?;
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: op_span,
            };
        }
        Ok(lhs)
    }

    /// A primary expression, or a `!)` whose operand extends over every
    /// operator binding tighter than NOT.
    fn parse_operand(&mut self) -> PResult<Expr> {
        if self.at(TokenKind::Not) {
            let span = self.bump().span;
            let operand = self.nested(|p| p.parse_binary(NOT_PRECEDENCE))?;
            return Ok(Expr {
                kind: ExprKind::Not(Box::new(operand)),
                span,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.current().span;
        let kind = match self.current().kind {
            TokenKind::NumberMark => {
                self.bump();
                let token = self.expect(TokenKind::Number, "a number after `:0`")?;
                ExprKind::Number(token.lexeme)
            }
            TokenKind::StringMark => {
                self.bump();
                let token = self.expect(TokenKind::String, "a string literal after `:L`")?;
                ExprKind::String(token.lexeme)
            }
            TokenKind::True => {
                self.bump();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.bump();
                ExprKind::Bool(false)
            }
            TokenKind::Input => {
                self.bump();
                ExprKind::Input
            }
            TokenKind::Ident => {
                let ident = self.expect_ident("identifier")?;
                if self.at(TokenKind::SadOpen) {
                    return self.parse_call(ident);
                }
                ExprKind::Identifier(ident.name)
            }
            TokenKind::SadOpen => {
                self.bump();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::HappyClose, "`:)` to close the group")?;
                return Ok(inner);
            }
            _ => {
                self.error_here("an expression");
                return Err(Halt::Syntax);
            }
        };
        Ok(Expr { kind, span })
    }

    fn parse_call(&mut self, callee: Ident) -> PResult<Expr> {
        self.expect(TokenKind::SadOpen, "`:(` to open the argument list")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::HappyClose) {
            loop {
                args.push(self.parse_expression()?);
                if self.at(TokenKind::FieldSep) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::HappyClose, "`:,D` or `:)` in the argument list")?;
        let span = callee.span;
        Ok(Expr {
            kind: ExprKind::Call { callee, args },
            span,
        })
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.descend()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Go one level deeper, failing once the limit is exceeded.
    fn descend(&mut self) -> PResult<()> {
        if self.depth >= self.max_depth {
            let span = self.current().span;
            let message = format!("nesting depth exceeds the limit of {}", self.max_depth);
            return Err(self.limit_exceeded(span, message));
        }
        self.depth += 1;
        Ok(())
    }

    fn limit_exceeded(&mut self, span: Span, message: String) -> Halt {
        self.diagnostics.push(Diagnostic::error(
            Stage::Parser,
            DiagnosticKind::LimitExceeded,
            message,
            span,
        ));
        Halt::Limit
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> PResult<Token> {
        if self.at(kind) {
            return Ok(self.bump());
        }
        self.error_here(expected);
        Err(Halt::Syntax)
    }

    fn expect_ident(&mut self, expected: &str) -> PResult<Ident> {
        let token = self.expect(TokenKind::Ident, expected)?;
        Ok(Ident {
            name: token.lexeme,
            span: token.span,
        })
    }

    fn expect_terminator(&mut self) -> PResult<()> {
        self.expect(TokenKind::Terminator, "`;)` to end the statement")
            .map(|_| ())
    }

    /// Record "expected X, found Y" at the current token.
    fn error_here(&mut self, expected: &str) {
        let token = self.current();
        let found = describe_found(token);
        let span = token.span;
        self.diagnostics.push(Diagnostic::error(
            Stage::Parser,
            DiagnosticKind::SyntaxError,
            format!("expected {expected}, found {found}"),
            span,
        ));
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }
}

fn describe_found(token: &Token) -> String {
    match token.kind {
        TokenKind::Ident => format!("identifier `{}`", token.lexeme),
        TokenKind::Number => format!("number `{}`", token.lexeme),
        TokenKind::String => format!("string literal \"{}\"", token.lexeme),
        kind => kind.describe().to_string(),
    }
}
