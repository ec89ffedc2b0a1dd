//! Typed intermediate representation.
//!
//! The resolver lowers the AST into HIR once every name and type has been
//! checked. HIR mirrors the surface tree one-to-one, but every expression
//! carries its resolved `Type`, and it only exists for programs without
//! errors, so the code generator never has to re-validate anything.

use crate::ast::BinaryOp;
use crate::span::Span;
use crate::types::Type;

/// Identifier in HIR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirIdent {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirParam {
    pub name: HirIdent,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirFunction {
    pub name: HirIdent,
    pub params: Vec<HirParam>,
    pub result: Type,
    pub body: HirBlock,
}

/// A whole checked program.
#[derive(Debug, Clone, PartialEq)]
pub struct HirModule {
    pub statements: Vec<HirStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirBlock {
    pub statements: Vec<HirStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirStmt {
    pub kind: HirStmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HirStmtKind {
    Let {
        name: HirIdent,
        ty: Type,
        init: HirExpr,
    },
    Set {
        target: HirIdent,
        value: HirExpr,
    },
    Print(HirExpr),
    Function(HirFunction),
    Return(HirExpr),
    If {
        cond: HirExpr,
        body: HirBlock,
    },
    While {
        cond: HirExpr,
        body: HirBlock,
    },
    Try {
        body: HirBlock,
        binding: HirIdent,
        handler: HirBlock,
    },
    Throw(HirExpr),
    Expr(HirExpr),
}

/// Expression node in HIR; always typed.
#[derive(Debug, Clone, PartialEq)]
pub struct HirExpr {
    pub kind: HirExprKind,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HirExprKind {
    /// Normalised decimal text (no redundant leading zeros).
    Number(String),
    String(String),
    Bool(bool),
    Input,
    Var(HirIdent),
    Call {
        callee: HirIdent,
        args: Vec<HirExpr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<HirExpr>,
        rhs: Box<HirExpr>,
    },
    Not(Box<HirExpr>),
}

impl HirModule {
    /// Number of function definitions at any nesting level.
    pub fn function_count(&self) -> usize {
        fn count(statements: &[HirStmt]) -> usize {
            statements
                .iter()
                .map(|stmt| match &stmt.kind {
                    HirStmtKind::Function(func) => 1 + count(&func.body.statements),
                    HirStmtKind::If { body, .. } | HirStmtKind::While { body, .. } => {
                        count(&body.statements)
                    }
                    HirStmtKind::Try { body, handler, .. } => {
                        count(&body.statements) + count(&handler.statements)
                    }
                    _ => 0,
                })
                .sum()
        }
        count(&self.statements)
    }
}
