//! Surface syntax tree produced by the parser.
//!
//! Every node owns its children and carries the position of its first
//! token (binary operators carry the operator's position instead, which
//! is where type errors about them are reported).

use core::fmt::Write as _;

use crate::span::Span;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// A written type annotation such as `:> :0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeAnnotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub result: TypeAnnotation,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarDecl {
        name: Ident,
        ty: TypeAnnotation,
        init: Expr,
    },
    Assign {
        target: Ident,
        value: Expr,
    },
    Print(Expr),
    FunctionDecl(FunctionDecl),
    Return(Expr),
    If {
        cond: Expr,
        body: Block,
    },
    While {
        cond: Expr,
        body: Block,
    },
    Try {
        body: Block,
        binding: Ident,
        handler: Block,
    },
    Throw(Expr),
    /// A call evaluated for its side effects.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal text as written, e.g. `42` or `3.5`.
    Number(String),
    String(String),
    Bool(bool),
    Input,
    Identifier(String),
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Gt,
    Lt,
    And,
    Or,
}

/// Operator families sharing one typing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    Arithmetic,
    Relational,
    Equality,
    Logical,
}

impl BinaryOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            BinaryOp::Add => ":+)",
            BinaryOp::Sub => ":-(",
            BinaryOp::Mul => "*_*",
            BinaryOp::Div => ":/",
            BinaryOp::Mod => ":%",
            BinaryOp::Eq => "=)",
            BinaryOp::Ne => "!(",
            BinaryOp::Gt => ">:)",
            BinaryOp::Lt => "<:(",
            BinaryOp::And => "&)",
            BinaryOp::Or => "|)",
        }
    }

    pub fn class(self) -> OpClass {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                OpClass::Arithmetic
            }
            BinaryOp::Gt | BinaryOp::Lt => OpClass::Relational,
            BinaryOp::Eq | BinaryOp::Ne => OpClass::Equality,
            BinaryOp::And | BinaryOp::Or => OpClass::Logical,
        }
    }
}

impl Program {
    /// Indented, one-node-per-line rendering used in the debug trace.
    pub fn render_tree(&self) -> String {
        let mut out = String::from("Program\n");
        for stmt in &self.statements {
            write_stmt(&mut out, stmt, 1);
        }
        out
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_block(out: &mut String, label: &str, block: &Block, depth: usize) {
    indent(out, depth);
    let _ = writeln!(out, "{label}");
    for stmt in &block.statements {
        write_stmt(out, stmt, depth + 1);
    }
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    indent(out, depth);
    match &stmt.kind {
        StmtKind::VarDecl { name, ty, init } => {
            let _ = writeln!(out, "VarDecl {} : {}", name.name, ty.ty);
            write_expr(out, init, depth + 1);
        }
        StmtKind::Assign { target, value } => {
            let _ = writeln!(out, "Assign {}", target.name);
            write_expr(out, value, depth + 1);
        }
        StmtKind::Print(expr) => {
            out.push_str("Print\n");
            write_expr(out, expr, depth + 1);
        }
        StmtKind::FunctionDecl(func) => {
            let params: Vec<String> = func
                .params
                .iter()
                .map(|p| format!("{}: {}", p.name.name, p.ty.ty))
                .collect();
            let _ = writeln!(
                out,
                "FunctionDecl {}({}) -> {}",
                func.name.name,
                params.join(", "),
                func.result.ty
            );
            for inner in &func.body.statements {
                write_stmt(out, inner, depth + 1);
            }
        }
        StmtKind::Return(expr) => {
            out.push_str("Return\n");
            write_expr(out, expr, depth + 1);
        }
        StmtKind::If { cond, body } => {
            out.push_str("If\n");
            write_expr(out, cond, depth + 1);
            write_block(out, "Then", body, depth + 1);
        }
        StmtKind::While { cond, body } => {
            out.push_str("While\n");
            write_expr(out, cond, depth + 1);
            write_block(out, "Body", body, depth + 1);
        }
        StmtKind::Try {
            body,
            binding,
            handler,
        } => {
            out.push_str("Try\n");
            write_block(out, "Body", body, depth + 1);
            write_block(out, &format!("Catch {}", binding.name), handler, depth + 1);
        }
        StmtKind::Throw(expr) => {
            out.push_str("Throw\n");
            write_expr(out, expr, depth + 1);
        }
        StmtKind::Expr(expr) => {
            out.push_str("ExprStmt\n");
            write_expr(out, expr, depth + 1);
        }
    }
}

fn write_expr(out: &mut String, expr: &Expr, depth: usize) {
    indent(out, depth);
    match &expr.kind {
        ExprKind::Number(text) => {
            let _ = writeln!(out, "NumberLiteral {text}");
        }
        ExprKind::String(text) => {
            let _ = writeln!(out, "StringLiteral {text:?}");
        }
        ExprKind::Bool(value) => {
            let _ = writeln!(out, "BoolLiteral {value}");
        }
        ExprKind::Input => out.push_str("Input\n"),
        ExprKind::Identifier(name) => {
            let _ = writeln!(out, "Identifier {name}");
        }
        ExprKind::Call { callee, args } => {
            let _ = writeln!(out, "Call {}", callee.name);
            for arg in args {
                write_expr(out, arg, depth + 1);
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let _ = writeln!(out, "BinaryOp {}", op.lexeme());
            write_expr(out, lhs, depth + 1);
            write_expr(out, rhs, depth + 1);
        }
        ExprKind::Not(operand) => {
            out.push_str("UnaryNot\n");
            write_expr(out, operand, depth + 1);
        }
    }
}
