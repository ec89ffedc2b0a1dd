//! Name resolution and type checking for EmotiLang.
//!
//! Walks the AST with a stack of lexical scopes, validates every name and
//! type, and lowers the program to typed HIR. Checking never stops at the
//! first problem: independent statements are all examined. A node whose
//! own operand failed is treated as unresolved (`None`) so the failure is
//! reported once, not again by every enclosing expression.
//!
//! Declarations follow block scoping with a dead zone: a variable is bound
//! from the start of its block but may not be touched until its
//! declaration has run. Function bodies may mention variables declared
//! later; instead, every call made while such a variable is still pending
//! is checked against the names the callee (transitively) reads.

use std::collections::{HashMap, HashSet};

use crate::ast::{self, BinaryOp, OpClass};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Stage};
use crate::hir::{
    HirBlock, HirExpr, HirExprKind, HirFunction, HirIdent, HirModule, HirParam, HirStmt,
    HirStmtKind,
};
use crate::span::Span;
use crate::types::{Signature, Type};

/// Result of resolving a whole program.
///
/// `module` is present only when no error-severity diagnostic was found.
#[derive(Debug)]
pub struct ResolveResult {
    pub module: Option<HirModule>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn resolve(program: &ast::Program, max_depth: usize) -> ResolveResult {
    let mut checker = TypeChecker::new(max_depth);
    let statements = checker.check_statements(&program.statements);
    let failed = checker.diagnostics.iter().any(Diagnostic::is_error);
    ResolveResult {
        module: (!failed).then_some(HirModule { statements }),
        diagnostics: checker.diagnostics,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarState {
    /// Bound for the whole block; its declaration has not run yet.
    Pending,
    /// Its own initializer is being evaluated.
    Initializing,
    Ready,
}

#[derive(Debug, Clone)]
enum SymbolKind {
    Variable(VarState),
    Function {
        signature: Signature,
        /// Outer names the body reads, assigns or calls.
        captures: Vec<String>,
    },
}

#[derive(Debug, Clone)]
struct Symbol {
    /// Declared type of a variable, or the result type of a function.
    ty: Type,
    kind: SymbolKind,
    span: Span,
}

/// Stack of lexical scopes; index 0 is the global scope.
#[derive(Debug)]
struct TypeEnv {
    scopes: Vec<HashMap<String, Symbol>>,
}

impl TypeEnv {
    fn new() -> Self {
        TypeEnv {
            scopes: vec![HashMap::new()],
        }
    }

    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Bind `name` in the innermost scope, returning the clashing
    /// symbol's position if that scope already binds it.
    fn declare(&mut self, name: &str, symbol: Symbol) -> Result<(), Span> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        if let Some(existing) = scope.get(name) {
            return Err(existing.span);
        }
        scope.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Innermost binding of `name`, with the index of its scope.
    fn lookup(&self, name: &str) -> Option<(usize, &Symbol)> {
        self.lookup_below(self.scopes.len(), name)
    }

    /// Like `lookup`, but only searching the scopes below index `end`.
    fn lookup_below(&self, end: usize, name: &str) -> Option<(usize, &Symbol)> {
        self.scopes
            .iter()
            .take(end)
            .enumerate()
            .rev()
            .find_map(|(index, scope)| scope.get(name).map(|symbol| (index, symbol)))
    }

    fn innermost(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    /// Move the variable declared at `span` in the innermost scope to
    /// `state`. False when that scope binds the name to another declaration.
    fn set_state(&mut self, name: &str, span: Span, state: VarState) -> bool {
        match self.scopes.last_mut().and_then(|scope| scope.get_mut(name)) {
            Some(symbol) if symbol.span == span && matches!(symbol.kind, SymbolKind::Variable(_)) => {
                symbol.kind = SymbolKind::Variable(state);
                true
            }
            _ => false,
        }
    }
}

struct TypeChecker {
    env: TypeEnv,
    /// Declared result types of the enclosing functions, innermost last.
    returns: Vec<Type>,
    /// Scope index holding each enclosing function's parameters.
    frames: Vec<usize>,
    depth: usize,
    max_depth: usize,
    /// Set once the depth limit trips; nothing further is checked.
    halted: bool,
    diagnostics: Vec<Diagnostic>,
}

impl TypeChecker {
    fn new(max_depth: usize) -> Self {
        TypeChecker {
            env: TypeEnv::new(),
            returns: Vec::new(),
            frames: Vec::new(),
            depth: 0,
            max_depth,
            halted: false,
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, kind: DiagnosticKind, span: Span, message: String) {
        self.diagnostics
            .push(Diagnostic::error(Stage::Resolver, kind, message, span));
    }

    fn descend(&mut self, span: Span) -> bool {
        if self.halted {
            return false;
        }
        if self.depth >= self.max_depth {
            self.error(
                DiagnosticKind::LimitExceeded,
                span,
                format!("nesting depth exceeds the limit of {}", self.max_depth),
            );
            self.halted = true;
            return false;
        }
        self.depth += 1;
        true
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    /// Scopes from this index up belong to the function body being checked.
    fn frame_base(&self) -> usize {
        self.frames.last().copied().unwrap_or(0)
    }

    /// Check a statement list in the current scope.
    ///
    /// Every declaration is bound first so calls may precede a function's
    /// declaration and functions may be mutually recursive.
    fn check_statements(&mut self, statements: &[ast::Stmt]) -> Vec<HirStmt> {
        self.hoist_declarations(statements);
        let mut checked = Vec::new();
        for stmt in statements {
            if self.halted {
                break;
            }
            if let Some(hir) = self.check_stmt(stmt) {
                checked.push(hir);
            }
        }
        checked
    }

    fn hoist_declarations(&mut self, statements: &[ast::Stmt]) {
        for stmt in statements {
            match &stmt.kind {
                ast::StmtKind::FunctionDecl(func) => {
                    let signature = Signature {
                        params: func.params.iter().map(|p| p.ty.ty).collect(),
                        result: func.result.ty,
                    };
                    let symbol = Symbol {
                        ty: signature.result,
                        kind: SymbolKind::Function {
                            signature,
                            captures: captured_names(func),
                        },
                        span: func.name.span,
                    };
                    self.declare(&func.name, symbol);
                }
                ast::StmtKind::VarDecl { name, ty, .. } => {
                    let symbol = Symbol {
                        ty: ty.ty,
                        kind: SymbolKind::Variable(VarState::Pending),
                        span: name.span,
                    };
                    self.declare(name, symbol);
                }
                _ => {}
            }
        }
    }

    fn declare(&mut self, name: &ast::Ident, symbol: Symbol) -> bool {
        match self.env.declare(&name.name, symbol) {
            Ok(()) => true,
            Err(previous) => {
                self.error(
                    DiagnosticKind::RedeclarationError,
                    name.span,
                    format!(
                        "`{}` is already declared in this scope (at {previous})",
                        name.name
                    ),
                );
                false
            }
        }
    }

    /// Check a nested block in a fresh scope.
    fn check_block(&mut self, block: &ast::Block) -> Option<HirBlock> {
        if !self.descend(block.span) {
            return None;
        }
        self.env.push();
        let statements = self.check_statements(&block.statements);
        self.env.pop();
        self.ascend();
        Some(HirBlock { statements })
    }

    fn check_stmt(&mut self, stmt: &ast::Stmt) -> Option<HirStmt> {
        use ast::StmtKind;

        let kind = match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => self.check_var_decl(name, ty.ty, init)?,
            StmtKind::Assign { target, value } => self.check_assign(target, value)?,
            StmtKind::Print(expr) => HirStmtKind::Print(self.check_expr(expr)?),
            StmtKind::FunctionDecl(func) => HirStmtKind::Function(self.check_function(func)?),
            StmtKind::Return(expr) => self.check_return(stmt.span, expr)?,
            StmtKind::If { cond, body } => {
                let cond = self.check_condition(cond, "if");
                let body = self.check_block(body);
                HirStmtKind::If {
                    cond: cond?,
                    body: body?,
                }
            }
            StmtKind::While { cond, body } => {
                let cond = self.check_condition(cond, "while");
                let body = self.check_block(body);
                HirStmtKind::While {
                    cond: cond?,
                    body: body?,
                }
            }
            StmtKind::Try {
                body,
                binding,
                handler,
            } => {
                let body = self.check_block(body);
                let handler = self.check_handler(binding, handler);
                HirStmtKind::Try {
                    body: body?,
                    binding: hir_ident(binding),
                    handler: handler?,
                }
            }
            StmtKind::Throw(expr) => HirStmtKind::Throw(self.check_expr(expr)?),
            StmtKind::Expr(expr) => HirStmtKind::Expr(self.check_expr(expr)?),
        };
        Some(HirStmt {
            kind,
            span: stmt.span,
        })
    }

    fn check_var_decl(
        &mut self,
        name: &ast::Ident,
        declared: Type,
        init: &ast::Expr,
    ) -> Option<HirStmtKind> {
        // A clashing declaration was already reported while hoisting.
        let declared_ok = self
            .env
            .set_state(&name.name, name.span, VarState::Initializing);
        let init = self.check_expr(init);
        if declared_ok {
            self.env.set_state(&name.name, name.span, VarState::Ready);
        }
        let init = init?;
        if !init.ty.fits(declared) {
            self.error(
                DiagnosticKind::TypeError,
                init.span,
                format!(
                    "cannot initialize `{}` of type {declared} with a value of type {}",
                    name.name, init.ty
                ),
            );
            return None;
        }
        declared_ok.then(|| HirStmtKind::Let {
            name: hir_ident(name),
            ty: declared,
            init,
        })
    }

    fn check_assign(&mut self, target: &ast::Ident, value: &ast::Expr) -> Option<HirStmtKind> {
        let value = self.check_expr(value);
        let Some((index, symbol)) = self.env.lookup(&target.name) else {
            self.error(
                DiagnosticKind::NameError,
                target.span,
                format!("assignment to undeclared identifier `{}`", target.name),
            );
            return None;
        };
        let (ty, declared_at) = (symbol.ty, symbol.span);
        match symbol.kind {
            SymbolKind::Function { .. } => {
                self.error(
                    DiagnosticKind::TypeError,
                    target.span,
                    format!("cannot assign to function `{}`", target.name),
                );
                return None;
            }
            SymbolKind::Variable(VarState::Pending) if index >= self.frame_base() => {
                self.error(
                    DiagnosticKind::NameError,
                    target.span,
                    format!(
                        "`{}` is assigned before its declaration (at {declared_at})",
                        target.name
                    ),
                );
                return None;
            }
            SymbolKind::Variable(_) => {}
        }
        let value = value?;
        if !value.ty.fits(ty) {
            self.error(
                DiagnosticKind::TypeError,
                value.span,
                format!(
                    "cannot assign a value of type {} to `{}` of type {ty}",
                    value.ty, target.name
                ),
            );
            return None;
        }
        Some(HirStmtKind::Set {
            target: hir_ident(target),
            value,
        })
    }

    fn check_function(&mut self, func: &ast::FunctionDecl) -> Option<HirFunction> {
        if !self.descend(func.body.span) {
            return None;
        }
        self.env.push();
        self.frames.push(self.env.innermost());
        let mut params = Vec::new();
        for param in &func.params {
            let symbol = Symbol {
                ty: param.ty.ty,
                kind: SymbolKind::Variable(VarState::Ready),
                span: param.name.span,
            };
            if self.declare(&param.name, symbol) {
                params.push(HirParam {
                    name: hir_ident(&param.name),
                    ty: param.ty.ty,
                });
            }
        }
        self.returns.push(func.result.ty);
        let statements = self.check_statements(&func.body.statements);
        self.returns.pop();
        self.frames.pop();
        self.env.pop();
        self.ascend();

        if !self.halted && !definitely_returns(&func.body.statements) {
            self.diagnostics.push(Diagnostic::warning(
                Stage::Resolver,
                format!(
                    "function `{}` may finish without returning a value of type {}",
                    func.name.name, func.result.ty
                ),
                func.name.span,
            ));
        }

        Some(HirFunction {
            name: hir_ident(&func.name),
            params,
            result: func.result.ty,
            body: HirBlock { statements },
        })
    }

    fn check_return(&mut self, span: Span, expr: &ast::Expr) -> Option<HirStmtKind> {
        let value = self.check_expr(expr);
        let Some(&expected) = self.returns.last() else {
            self.error(
                DiagnosticKind::SyntaxError,
                span,
                "`/o/` (return) is only allowed inside a function".to_string(),
            );
            return None;
        };
        let value = value?;
        if !value.ty.fits(expected) {
            self.error(
                DiagnosticKind::TypeError,
                value.span,
                format!(
                    "function returns {expected} but this value has type {}",
                    value.ty
                ),
            );
            return None;
        }
        Some(HirStmtKind::Return(value))
    }

    fn check_condition(&mut self, cond: &ast::Expr, construct: &str) -> Option<HirExpr> {
        let cond = self.check_expr(cond)?;
        if !cond.ty.fits(Type::Boolean) {
            self.error(
                DiagnosticKind::TypeError,
                cond.span,
                format!("{construct} condition must be boolean, found {}", cond.ty),
            );
            return None;
        }
        Some(cond)
    }

    /// The catch binding and the handler's statements share one scope.
    fn check_handler(&mut self, binding: &ast::Ident, handler: &ast::Block) -> Option<HirBlock> {
        if !self.descend(handler.span) {
            return None;
        }
        self.env.push();
        let symbol = Symbol {
            ty: Type::Any,
            kind: SymbolKind::Variable(VarState::Ready),
            span: binding.span,
        };
        self.declare(binding, symbol);
        let statements = self.check_statements(&handler.statements);
        self.env.pop();
        self.ascend();
        Some(HirBlock { statements })
    }

    fn check_expr(&mut self, expr: &ast::Expr) -> Option<HirExpr> {
        if !self.descend(expr.span) {
            return None;
        }
        let checked = self.check_expr_kind(expr);
        self.ascend();
        checked
    }

    fn check_expr_kind(&mut self, expr: &ast::Expr) -> Option<HirExpr> {
        use ast::ExprKind;

        let span = expr.span;
        let (kind, ty) = match &expr.kind {
            ExprKind::Number(text) => (HirExprKind::Number(normalize_number(text)), Type::Number),
            ExprKind::String(text) => (HirExprKind::String(text.clone()), Type::String),
            ExprKind::Bool(value) => (HirExprKind::Bool(*value), Type::Boolean),
            ExprKind::Input => (HirExprKind::Input, Type::String),
            ExprKind::Identifier(name) => return self.check_ident(span, name),
            ExprKind::Call { callee, args } => return self.check_call(span, callee, args),
            ExprKind::Binary { op, lhs, rhs } => return self.check_binary(span, *op, lhs, rhs),
            ExprKind::Not(operand) => {
                let operand = self.check_expr(operand)?;
                if !operand.ty.fits(Type::Boolean) {
                    self.error(
                        DiagnosticKind::TypeError,
                        span,
                        format!("operator `!)` requires a boolean operand, found {}", operand.ty),
                    );
                    return None;
                }
                (HirExprKind::Not(Box::new(operand)), Type::Boolean)
            }
        };
        Some(HirExpr { kind, ty, span })
    }

    fn check_ident(&mut self, span: Span, name: &str) -> Option<HirExpr> {
        let Some((index, symbol)) = self.env.lookup(name) else {
            self.error(
                DiagnosticKind::NameError,
                span,
                format!("undeclared identifier `{name}`"),
            );
            return None;
        };
        let (ty, declared_at) = (symbol.ty, symbol.span);
        let state = match symbol.kind {
            SymbolKind::Variable(state) => Some(state),
            SymbolKind::Function { .. } => None,
        };
        // Reads from a nested function body run when it is called.
        let deferred = index < self.frame_base();
        match state {
            Some(VarState::Pending) if !deferred => {
                self.error(
                    DiagnosticKind::NameError,
                    span,
                    format!("`{name}` is used before its declaration (at {declared_at})"),
                );
                None
            }
            Some(VarState::Initializing) if !deferred => {
                self.error(
                    DiagnosticKind::NameError,
                    span,
                    format!("`{name}` is used in its own initializer"),
                );
                None
            }
            Some(_) => Some(HirExpr {
                kind: HirExprKind::Var(HirIdent {
                    name: name.to_string(),
                    span,
                }),
                ty,
                span,
            }),
            None => {
                self.error(
                    DiagnosticKind::TypeError,
                    span,
                    format!("function `{name}` cannot be used as a value; call it with `:( ... :)`"),
                );
                None
            }
        }
    }

    fn check_call(&mut self, span: Span, callee: &ast::Ident, args: &[ast::Expr]) -> Option<HirExpr> {
        let checked_args: Vec<Option<HirExpr>> =
            args.iter().map(|arg| self.check_expr(arg)).collect();

        let Some((_, symbol)) = self.env.lookup(&callee.name) else {
            self.error(
                DiagnosticKind::NameError,
                callee.span,
                format!("call to undeclared function `{}`", callee.name),
            );
            return None;
        };
        let SymbolKind::Function { signature, .. } = &symbol.kind else {
            let ty = symbol.ty;
            self.error(
                DiagnosticKind::TypeError,
                callee.span,
                format!("`{}` is a variable of type {ty}, not a function", callee.name),
            );
            return None;
        };
        let signature = signature.clone();
        if let Some((variable, declared_at)) = self.premature_capture(&callee.name) {
            self.error(
                DiagnosticKind::NameError,
                callee.span,
                format!(
                    "call to `{}` reads `{variable}` before it is initialized (declared at {declared_at})",
                    callee.name
                ),
            );
            return None;
        }
        if signature.params.len() != args.len() {
            self.error(
                DiagnosticKind::TypeError,
                callee.span,
                format!(
                    "function `{}` expects {} argument(s) but received {}",
                    callee.name,
                    signature.params.len(),
                    args.len()
                ),
            );
            return None;
        }

        let mut resolved = Vec::with_capacity(args.len());
        let mut ok = true;
        for (index, (arg, expected)) in checked_args.into_iter().zip(&signature.params).enumerate() {
            match arg {
                Some(arg) if arg.ty.fits(*expected) => resolved.push(arg),
                Some(arg) => {
                    self.error(
                        DiagnosticKind::TypeError,
                        arg.span,
                        format!(
                            "argument {} of `{}` must be {expected}, found {}",
                            index + 1,
                            callee.name,
                            arg.ty
                        ),
                    );
                    ok = false;
                }
                None => ok = false,
            }
        }
        if !ok {
            return None;
        }
        Some(HirExpr {
            kind: HirExprKind::Call {
                callee: hir_ident(callee),
                args: resolved,
            },
            ty: signature.result,
            span,
        })
    }

    /// A variable of the running frame that calling `callee` would touch
    /// before its declaration ran, following the functions it calls.
    fn premature_capture(&self, callee: &str) -> Option<(String, Span)> {
        let base = self.frame_base();
        let (index, _) = self.env.lookup(callee)?;
        let mut pending = vec![(callee.to_string(), index)];
        let mut visited = HashSet::new();
        while let Some((name, index)) = pending.pop() {
            if !visited.insert((name.clone(), index)) {
                continue;
            }
            let Some(SymbolKind::Function { captures, .. }) = self
                .env
                .scopes
                .get(index)
                .and_then(|scope| scope.get(&name))
                .map(|symbol| &symbol.kind)
            else {
                continue;
            };
            for captured in captures {
                let Some((found, symbol)) = self.env.lookup_below(index + 1, captured) else {
                    continue;
                };
                match symbol.kind {
                    SymbolKind::Variable(state) if state != VarState::Ready && found >= base => {
                        return Some((captured.clone(), symbol.span));
                    }
                    SymbolKind::Variable(_) => {}
                    SymbolKind::Function { .. } => pending.push((captured.clone(), found)),
                }
            }
        }
        None
    }

    fn check_binary(
        &mut self,
        span: Span,
        op: BinaryOp,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
    ) -> Option<HirExpr> {
        let lhs = self.check_expr(lhs);
        let rhs = self.check_expr(rhs);
        let (lhs, rhs) = (lhs?, rhs?);

        let ty = match op.class() {
            OpClass::Arithmetic => self.require_both(span, op, &lhs, &rhs, Type::Number, Type::Number),
            OpClass::Relational => self.require_both(span, op, &lhs, &rhs, Type::Number, Type::Boolean),
            OpClass::Logical => self.require_both(span, op, &lhs, &rhs, Type::Boolean, Type::Boolean),
            OpClass::Equality => {
                if lhs.ty.fits(rhs.ty) {
                    Some(Type::Boolean)
                } else {
                    self.error(
                        DiagnosticKind::TypeError,
                        span,
                        format!(
                            "operator `{}` requires operands of the same type, found {} and {}",
                            op.lexeme(),
                            lhs.ty,
                            rhs.ty
                        ),
                    );
                    None
                }
            }
        }?;

        Some(HirExpr {
            kind: HirExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            span,
        })
    }

    fn require_both(
        &mut self,
        span: Span,
        op: BinaryOp,
        lhs: &HirExpr,
        rhs: &HirExpr,
        operand: Type,
        result: Type,
    ) -> Option<Type> {
        if lhs.ty.fits(operand) && rhs.ty.fits(operand) {
            return Some(result);
        }
        self.error(
            DiagnosticKind::TypeError,
            span,
            format!(
                "operator `{}` requires {operand} operands, found {} and {}",
                op.lexeme(),
                lhs.ty,
                rhs.ty
            ),
        );
        None
    }
}

fn hir_ident(ident: &ast::Ident) -> HirIdent {
    HirIdent {
        name: ident.name.clone(),
        span: ident.span,
    }
}

/// Names `func` reads, assigns or calls without binding them itself, in
/// order of first use. Nested functions contribute their own free names.
fn captured_names(func: &ast::FunctionDecl) -> Vec<String> {
    let mut names = FreeNames::default();
    names.function(func);
    names.free
}

#[derive(Default)]
struct FreeNames {
    bound: Vec<HashSet<String>>,
    free: Vec<String>,
}

impl FreeNames {
    fn note(&mut self, name: &str) {
        let bound = self.bound.iter().any(|scope| scope.contains(name));
        if !bound && !self.free.iter().any(|free| free == name) {
            self.free.push(name.to_string());
        }
    }

    fn function(&mut self, func: &ast::FunctionDecl) {
        self.bound
            .push(func.params.iter().map(|p| p.name.name.clone()).collect());
        self.statements(&func.body.statements);
        self.bound.pop();
    }

    fn block(&mut self, statements: &[ast::Stmt], binding: Option<&ast::Ident>) {
        self.bound
            .push(binding.map(|b| b.name.clone()).into_iter().collect());
        self.statements(statements);
        self.bound.pop();
    }

    fn statements(&mut self, statements: &[ast::Stmt]) {
        if let Some(scope) = self.bound.last_mut() {
            for stmt in statements {
                match &stmt.kind {
                    ast::StmtKind::VarDecl { name, .. } => {
                        scope.insert(name.name.clone());
                    }
                    ast::StmtKind::FunctionDecl(func) => {
                        scope.insert(func.name.name.clone());
                    }
                    _ => {}
                }
            }
        }
        for stmt in statements {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &ast::Stmt) {
        use ast::StmtKind;

        match &stmt.kind {
            StmtKind::VarDecl { init, .. } => self.expr(init),
            StmtKind::Assign { target, value } => {
                self.note(&target.name);
                self.expr(value);
            }
            StmtKind::Print(expr)
            | StmtKind::Return(expr)
            | StmtKind::Throw(expr)
            | StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::FunctionDecl(func) => self.function(func),
            StmtKind::If { cond, body } | StmtKind::While { cond, body } => {
                self.expr(cond);
                self.block(&body.statements, None);
            }
            StmtKind::Try {
                body,
                binding,
                handler,
            } => {
                self.block(&body.statements, None);
                self.block(&handler.statements, Some(binding));
            }
        }
    }

    fn expr(&mut self, expr: &ast::Expr) {
        use ast::ExprKind;

        match &expr.kind {
            ExprKind::Identifier(name) => self.note(name),
            ExprKind::Call { callee, args } => {
                self.note(&callee.name);
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Not(operand) => self.expr(operand),
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Bool(_) | ExprKind::Input => {}
        }
    }
}

/// Whether every path through `statements` ends in a return.
fn definitely_returns(statements: &[ast::Stmt]) -> bool {
    statements.iter().any(|stmt| match &stmt.kind {
        ast::StmtKind::Return(_) => true,
        ast::StmtKind::Try { body, handler, .. } => {
            definitely_returns(&body.statements) && definitely_returns(&handler.statements)
        }
        _ => false,
    })
}

/// Strip redundant leading zeros so the literal is valid in strict-mode targets.
fn normalize_number(text: &str) -> String {
    let (int_part, fraction) = match text.split_once('.') {
        Some((int_part, fraction)) => (int_part, Some(fraction)),
        None => (text, None),
    };
    let trimmed = int_part.trim_start_matches('0');
    let int_part = if trimmed.is_empty() { "0" } else { trimmed };
    match fraction {
        Some(fraction) => format!("{int_part}.{fraction}"),
        None => int_part.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    const IF: &str = "(\u{256D}\u{0CB0}_\u{2022}\u{0301})";
    const WHILE: &str = "(\u{2E1D}\u{2E1D}\u{0E51}\u{FE4F}\u{0E51}\u{2E1D}\u{2E1D})";

    fn resolve_source(source: &str) -> ResolveResult {
        let lexed = lex(source);
        assert!(lexed.diagnostics.is_empty(), "{:?}", lexed.diagnostics);
        let parsed = parse(&lexed.tokens, 64);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        resolve(&parsed.program.expect("program"), 64)
    }

    fn errors(source: &str) -> Vec<(DiagnosticKind, String)> {
        resolve_source(source)
            .diagnostics
            .into_iter()
            .filter(Diagnostic::is_error)
            .map(|d| (d.kind, d.message))
            .collect()
    }

    fn assert_clean(source: &str) -> HirModule {
        let result = resolve_source(source);
        let errors: Vec<_> = result.diagnostics.iter().filter(|d| d.is_error()).collect();
        assert!(errors.is_empty(), "{errors:?}");
        result.module.expect("module")
    }

    #[test]
    fn annotates_expressions_with_types() {
        let module = assert_clean(":< x :> X_X <3 :0 1 :+) :0 2 >:) :0 2 ;)");
        let HirStmtKind::Let { init, .. } = &module.statements[0].kind else {
            panic!("expected let");
        };
        assert_eq!(init.ty, Type::Boolean);
        let HirExprKind::Binary { lhs, .. } = &init.kind else {
            panic!("expected binary");
        };
        assert_eq!(lhs.ty, Type::Number);
    }

    #[test]
    fn declaration_type_mismatch() {
        let errs = errors(":< x :> :0 <3 :L \"hi\" ;)");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].0, DiagnosticKind::TypeError);
        assert!(errs[0].1.contains("`x`"));
    }

    #[test]
    fn redeclaration_in_same_scope_but_shadowing_in_nested_scope() {
        let errs = errors(":< x :> :0 <3 :0 1 ;)\n:< x :> :0 <3 :0 2 ;)");
        assert_eq!(errs, vec![(
            DiagnosticKind::RedeclarationError,
            "`x` is already declared in this scope (at line 1, column 4)".to_string()
        )]);

        assert_clean(&format!(
            ":< x :> :0 <3 :0 1 ;)\n{IF} :D :{{ :< x :> :L <3 :L \"inner\" ;) :P x ;) :}}"
        ));
    }

    #[test]
    fn undeclared_identifier_is_a_name_error_with_position() {
        let result = resolve_source(":P :0 1 ;)\n:P missing ;)");
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::NameError)
            .expect("name error");
        assert!(diag.message.contains("`missing`"));
        assert_eq!((diag.span.line, diag.span.column), (2, 4));
        assert!(result.module.is_none());
    }

    #[test]
    fn assignment_rules() {
        let errs = errors("y <3 :0 1 ;)");
        assert_eq!(errs[0].0, DiagnosticKind::NameError);

        let errs = errors(":< s :> :L <3 :L \"a\" ;)\ns <3 :0 1 ;)");
        assert_eq!(errs[0].0, DiagnosticKind::TypeError);

        assert_clean(":< s :> :L <3 :L \"a\" ;)\ns <3 O_O ;)");
    }

    #[test]
    fn arithmetic_requires_numbers() {
        let errs = errors(":P :L \"a\" :+) :0 1 ;)");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].0, DiagnosticKind::TypeError);
        assert!(errs[0].1.contains("`:+)`"));

        let errs = errors(":P :D *_* :0 2 ;)");
        assert!(errs[0].1.contains("`*_*`"));
    }

    #[test]
    fn relational_equality_and_logic_rules() {
        assert_eq!(errors(":P :L \"a\" >:) :L \"b\" ;)")[0].0, DiagnosticKind::TypeError);
        assert_eq!(errors(":P :0 1 =) :L \"1\" ;)")[0].0, DiagnosticKind::TypeError);
        assert_eq!(errors(":P :0 1 &) :D ;)")[0].0, DiagnosticKind::TypeError);
        assert_eq!(errors(":P !) :0 1 ;)")[0].0, DiagnosticKind::TypeError);
        assert_clean(":P :L \"a\" =) :L \"b\" |) !) :D &) :0 1 <:( :0 2 ;)");
    }

    #[test]
    fn failed_operand_does_not_cascade() {
        let errs = errors(":P :( nope :+) :0 1 :) *_* :0 2 >:) :0 3 ;)");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].0, DiagnosticKind::NameError);
    }

    #[test]
    fn independent_errors_are_all_reported() {
        let errs = errors(":P a ;)\n:P :D :+) :0 1 ;)\n:P b ;)");
        let kinds: Vec<_> = errs.iter().map(|e| e.0).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::NameError,
                DiagnosticKind::TypeError,
                DiagnosticKind::NameError
            ]
        );
    }

    #[test]
    fn function_calls_check_arity_and_argument_types() {
        let decl = "🤖 twice :( n :> :0 :) :> :0 :{ /o/ n *_* :0 2 ;) :}\n";
        assert_clean(&format!("{decl}:< r :> :0 <3 twice :( :0 4 :) ;)"));

        let errs = errors(&format!("{decl}:P twice :( :0 1 :,D :0 2 :) ;)"));
        assert_eq!(errs[0].0, DiagnosticKind::TypeError);
        assert!(errs[0].1.contains("expects 1 argument(s) but received 2"));

        let errs = errors(&format!("{decl}:P twice :( :L \"x\" :) ;)"));
        assert!(errs[0].1.contains("argument 1 of `twice` must be number"));

        let errs = errors(":P ghost :( :) ;)");
        assert_eq!(errs[0].0, DiagnosticKind::NameError);
    }

    #[test]
    fn call_result_type_flows_into_declarations() {
        let errs = errors(
            "🤖 name :( :) :> :L :{ /o/ :L \"x\" ;) :}\n:< n :> :0 <3 name :( :) ;)",
        );
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].0, DiagnosticKind::TypeError);
    }

    #[test]
    fn functions_are_hoisted_and_may_recurse() {
        assert_clean(&format!(
            ":P isEven :( :0 4 :) ;)\n\
             🤖 isEven :( n :> :0 :) :> X_X :{{\n\
               {IF} n =) :0 0 :{{ /o/ :D ;) :}}\n\
               /o/ isOdd :( n :-( :0 1 :) ;)\n\
             :}}\n\
             🤖 isOdd :( n :> :0 :) :> X_X :{{\n\
               {IF} n =) :0 0 :{{ /o/ :'( ;) :}}\n\
               /o/ isEven :( n :-( :0 1 :) ;)\n\
             :}}"
        ));
    }

    #[test]
    fn return_type_must_match() {
        let errs = errors("🤖 f :( :) :> :0 :{ /o/ :L \"no\" ;) :}");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].1.contains("function returns number"));
    }

    #[test]
    fn return_outside_function_is_a_syntax_error() {
        let errs = errors("/o/ :0 1 ;)");
        assert_eq!(errs[0].0, DiagnosticKind::SyntaxError);
    }

    #[test]
    fn parameters_are_scoped_to_the_function() {
        let errs = errors("🤖 f :( p :> :0 :) :> :0 :{ /o/ p ;) :}\n:P p ;)");
        assert_eq!(errs, vec![(DiagnosticKind::NameError, "undeclared identifier `p`".to_string())]);

        let errs = errors("🤖 f :( p :> :0 :) :> :0 :{ :< p :> :0 <3 :0 1 ;) /o/ p ;) :}");
        assert_eq!(errs[0].0, DiagnosticKind::RedeclarationError);

        let errs = errors("🤖 f :( p :> :0 :,D p :> :L :) :> :0 :{ /o/ :0 1 ;) :}");
        assert_eq!(errs[0].0, DiagnosticKind::RedeclarationError);
    }

    #[test]
    fn functions_and_variables_are_not_interchangeable() {
        let decl = "🤖 f :( :) :> :0 :{ /o/ :0 1 ;) :}\n";
        assert_eq!(errors(&format!("{decl}:P f ;)"))[0].0, DiagnosticKind::TypeError);
        assert_eq!(errors(&format!("{decl}f <3 :0 2 ;)"))[0].0, DiagnosticKind::TypeError);
        assert_eq!(
            errors(":< v :> :0 <3 :0 1 ;)\n:P v :( :) ;)")[0].0,
            DiagnosticKind::TypeError
        );
    }

    #[test]
    fn variable_in_its_own_initializer() {
        let errs = errors(":< x :> :0 <3 x :+) :0 1 ;)");
        assert_eq!(errs[0].0, DiagnosticKind::NameError);
        assert!(errs[0].1.contains("own initializer"));
    }

    #[test]
    fn reading_before_declaration_is_a_name_error() {
        let errs = errors(":P later ;)\n:< later :> :0 <3 :0 1 ;)");
        assert_eq!(errs, vec![(
            DiagnosticKind::NameError,
            "`later` is used before its declaration (at line 2, column 4)".to_string()
        )]);

        let errs = errors("later <3 :0 2 ;)\n:< later :> :0 <3 :0 1 ;)");
        assert_eq!(errs[0].0, DiagnosticKind::NameError);
        assert!(errs[0].1.contains("assigned before its declaration"));
    }

    #[test]
    fn inner_declaration_shadows_from_the_start_of_its_block() {
        let errs = errors(&format!(
            ":< x :> :0 <3 :0 1 ;)\n{IF} :D :{{ :P x ;) :< x :> :0 <3 :0 2 ;) :}}"
        ));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].0, DiagnosticKind::NameError);
        assert!(errs[0].1.starts_with("`x` is used before its declaration"));
    }

    #[test]
    fn calling_a_function_before_the_variable_it_reads_is_declared() {
        let errs = errors(
            ":P f :( :) ;)\n\
             :< x :> :0 <3 :0 1 ;)\n\
             🤖 f :( :) :> :0 :{ /o/ x ;) :}",
        );
        assert_eq!(errs, vec![(
            DiagnosticKind::NameError,
            "call to `f` reads `x` before it is initialized (declared at line 2, column 4)"
                .to_string()
        )]);

        assert_clean(
            "🤖 f :( :) :> :0 :{ /o/ x ;) :}\n\
             :< x :> :0 <3 :0 1 ;)\n\
             :P f :( :) ;)",
        );
    }

    #[test]
    fn reads_through_called_functions_are_followed() {
        let program = "🤖 outer :( :) :> :0 :{ /o/ inner :( :) ;) :}\n\
                       🤖 inner :( :) :> :0 :{ total <3 total :+) :0 1 ;) /o/ total ;) :}\n";
        let errs = errors(&format!("{program}:P outer :( :) ;)\n:< total :> :0 <3 :0 0 ;)"));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].1.starts_with("call to `outer` reads `total`"));

        assert_clean(&format!("{program}:< total :> :0 <3 :0 0 ;)\n:P outer :( :) ;)"));
    }

    #[test]
    fn initializer_calling_a_reader_of_the_variable() {
        let errs = errors(
            "🤖 peek :( :) :> :0 :{ /o/ seed ;) :}\n\
             :< seed :> :0 <3 peek :( :) ;)",
        );
        assert_eq!(errs.len(), 1);
        assert!(errs[0].1.starts_with("call to `peek` reads `seed`"));
    }

    #[test]
    fn dead_zone_checks_follow_the_running_function() {
        let errs = errors(
            "🤖 run :( :) :> :0 :{\n\
               :P show :( :) ;)\n\
               :< local :> :0 <3 :0 3 ;)\n\
               🤖 show :( :) :> :0 :{ /o/ local ;) :}\n\
               /o/ show :( :) ;)\n\
             :}",
        );
        assert_eq!(errs.len(), 1);
        assert!(errs[0].1.starts_with("call to `show` reads `local`"));

        // A parameter with the same name hides the later global.
        assert_clean(
            "🤖 echo :( x :> :0 :) :> :0 :{ /o/ x ;) :}\n\
             :P echo :( :0 1 :) ;)\n\
             :< x :> :0 <3 :0 2 ;)",
        );
    }

    #[test]
    fn catch_binding_is_any_and_scoped_to_handler() {
        assert_clean(
            "🕷️ :{ 💥 :0 7 ;) :} 🕸️ e :{ :< n :> :0 <3 e ;) :< s :> :L <3 e ;) :P e ;) :}",
        );
        let errs = errors("🕷️ :{ 💥 :L \"x\" ;) :} 🕸️ e :{ :P e ;) :}\n:P e ;)");
        assert_eq!(errs, vec![(DiagnosticKind::NameError, "undeclared identifier `e`".to_string())]);
    }

    #[test]
    fn conditions_must_be_boolean() {
        let errs = errors(&format!("{IF} :0 1 :{{ :P :0 1 ;) :}}"));
        assert_eq!(errs[0].0, DiagnosticKind::TypeError);
        assert!(errs[0].1.starts_with("if condition"));
        let errs = errors(&format!("{WHILE} :L \"x\" :{{ :P :0 1 ;) :}}"));
        assert_eq!(errs[0].0, DiagnosticKind::TypeError);
    }

    #[test]
    fn block_scopes_close_on_exit() {
        let errs = errors(&format!("{IF} :D :{{ :< inner :> :0 <3 :0 1 ;) :}}\n:P inner ;)"));
        assert_eq!(errs[0].0, DiagnosticKind::NameError);
    }

    #[test]
    fn missing_return_is_only_a_warning() {
        let result = resolve_source("🤖 f :( :) :> :0 :{ :P :0 1 ;) :}");
        assert!(result.module.is_some());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(!result.diagnostics[0].is_error());
    }

    #[test]
    fn try_returning_on_both_paths_counts_as_returning() {
        let result = resolve_source(
            "🤖 f :( :) :> :0 :{ 🕷️ :{ /o/ :0 1 ;) :} 🕸️ e :{ /o/ :0 2 ;) :} :}",
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn resolver_depth_guard() {
        let lexed = lex(":P :0 1 :+) :0 2 :+) :0 3 :+) :0 4 ;)");
        let parsed = parse(&lexed.tokens, 64);
        let result = resolve(&parsed.program.expect("program"), 2);
        assert!(result.module.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::LimitExceeded);
    }

    #[test]
    fn normalizes_number_literals() {
        assert_eq!(normalize_number("007"), "7");
        assert_eq!(normalize_number("0"), "0");
        assert_eq!(normalize_number("00.50"), "0.50");
        assert_eq!(normalize_number("42"), "42");
    }
}
