//! JavaScript backend.
//!
//! Translates a checked `HirModule` into JavaScript source text. The
//! module is already known to be well formed, so the only failure is the
//! nesting guard, which keeps the recursive walk bounded.

use std::collections::HashMap;

use crate::ast::BinaryOp;
use crate::builtins::{self, BuiltinKind};
use crate::diagnostic::{Diagnostic, DiagnosticKind, Stage};
use crate::hir::{HirBlock, HirExpr, HirExprKind, HirFunction, HirModule, HirStmt, HirStmtKind};
use crate::span::Span;
use crate::types::Type;

pub const HEADER: &str = "// Transpiled from EmotiLang";

/// Generate JavaScript for a checked module.
///
/// Output is a pure function of the module: the same input always yields
/// byte-identical text.
pub fn generate_js(module: &HirModule, max_depth: usize) -> Result<String, Diagnostic> {
    let mut generator = JsGenerator::new(max_depth);
    generator.line(HEADER);
    generator.line("");
    for stmt in &module.statements {
        generator.stmt(stmt)?;
    }
    Ok(generator.finish())
}

struct JsGenerator {
    out: String,
    indent: usize,
    depth: usize,
    max_depth: usize,
    /// Source name -> emitted name, for names that would clash with JavaScript.
    renames: HashMap<String, String>,
}

impl JsGenerator {
    fn new(max_depth: usize) -> Self {
        JsGenerator {
            out: String::new(),
            indent: 0,
            depth: 0,
            max_depth,
            renames: HashMap::new(),
        }
    }

    fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("  ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn descend(&mut self, span: Span) -> Result<(), Diagnostic> {
        if self.depth >= self.max_depth {
            return Err(Diagnostic::error(
                Stage::CodeGen,
                DiagnosticKind::LimitExceeded,
                format!("nesting depth exceeds the limit of {}", self.max_depth),
                span,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    /// Emitted spelling of a user identifier.
    fn name(&mut self, name: &str) -> String {
        if let Some(renamed) = self.renames.get(name) {
            return renamed.clone();
        }
        let emitted = if builtins::is_reserved(name) {
            format!("{name}$")
        } else {
            name.to_string()
        };
        self.renames.insert(name.to_string(), emitted.clone());
        emitted
    }

    fn stmt(&mut self, stmt: &HirStmt) -> Result<(), Diagnostic> {
        match &stmt.kind {
            HirStmtKind::Let { name, ty, init } => {
                let name = self.name(&name.name);
                let init = self.expr(init)?;
                self.line(&format!("let {name} = {init}; // {}", type_comment(*ty)));
            }
            HirStmtKind::Set { target, value } => {
                let target = self.name(&target.name);
                let value = self.expr(value)?;
                self.line(&format!("{target} = {value};"));
            }
            HirStmtKind::Print(expr) => {
                let value = self.expr(expr)?;
                let print = builtins::builtin(BuiltinKind::Print).path();
                self.line(&format!("{print}({value});"));
            }
            HirStmtKind::Function(func) => self.function(func)?,
            HirStmtKind::Return(expr) => {
                let value = self.expr(expr)?;
                self.line(&format!("return {value};"));
            }
            HirStmtKind::If { cond, body } => {
                let cond = self.condition(cond)?;
                self.line(&format!("if ({cond}) {{"));
                self.block(body, stmt.span)?;
                self.line("}");
            }
            HirStmtKind::While { cond, body } => {
                let cond = self.condition(cond)?;
                self.line(&format!("while ({cond}) {{"));
                self.block(body, stmt.span)?;
                self.line("}");
            }
            HirStmtKind::Try {
                body,
                binding,
                handler,
            } => {
                self.line("try {");
                self.block(body, stmt.span)?;
                let binding = self.name(&binding.name);
                self.line(&format!("}} catch ({binding}) {{"));
                self.block(handler, stmt.span)?;
                self.line("}");
            }
            HirStmtKind::Throw(expr) => {
                let value = self.expr(expr)?;
                self.line(&format!("throw {value};"));
            }
            HirStmtKind::Expr(expr) => {
                let value = self.expr(expr)?;
                self.line(&format!("{value};"));
            }
        }
        Ok(())
    }

    fn function(&mut self, func: &HirFunction) -> Result<(), Diagnostic> {
        let name = self.name(&func.name.name);
        let params: Vec<String> = func
            .params
            .iter()
            .map(|p| format!("{} /* {} */", self.name(&p.name.name), type_comment(p.ty)))
            .collect();
        self.line(&format!(
            "function {name}({}) /* -> {} */ {{",
            params.join(", "),
            type_comment(func.result)
        ));
        self.block(&func.body, func.name.span)?;
        self.line("}");
        Ok(())
    }

    /// Emit the statements of a block one level deeper; braces are the caller's.
    fn block(&mut self, block: &HirBlock, span: Span) -> Result<(), Diagnostic> {
        self.descend(span)?;
        self.indent += 1;
        for stmt in &block.statements {
            self.stmt(stmt)?;
        }
        self.indent -= 1;
        self.ascend();
        Ok(())
    }

    /// A condition already sits inside `if (...)`, so its outer parentheses are dropped.
    fn condition(&mut self, cond: &HirExpr) -> Result<String, Diagnostic> {
        let text = self.expr(cond)?;
        if matches!(cond.kind, HirExprKind::Binary { .. }) {
            if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
                return Ok(inner.to_string());
            }
        }
        Ok(text)
    }

    fn expr(&mut self, expr: &HirExpr) -> Result<String, Diagnostic> {
        self.descend(expr.span)?;
        let text = match &expr.kind {
            HirExprKind::Number(text) => text.clone(),
            HirExprKind::String(text) => quote(text),
            HirExprKind::Bool(value) => value.to_string(),
            HirExprKind::Input => {
                let input = builtins::builtin(BuiltinKind::Input);
                format!("{}({})", input.path(), input.fixed_args.join(", "))
            }
            HirExprKind::Var(ident) => self.name(&ident.name),
            HirExprKind::Call { callee, args } => {
                let callee = self.name(&callee.name);
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    rendered.push(self.expr(arg)?);
                }
                format!("{callee}({})", rendered.join(", "))
            }
            HirExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                format!("({lhs} {} {rhs})", js_operator(*op))
            }
            HirExprKind::Not(operand) => {
                let operand = self.expr(operand)?;
                format!("(!{operand})")
            }
        };
        self.ascend();
        Ok(text)
    }
}

fn js_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "===",
        BinaryOp::Ne => "!==",
        BinaryOp::Gt => ">",
        BinaryOp::Lt => "<",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

fn type_comment(ty: Type) -> &'static str {
    ty.name()
}

/// Double-quoted JavaScript string literal.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", ch as u32)),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::typecheck::resolve;

    const IF: &str = "(\u{256D}\u{0CB0}_\u{2022}\u{0301})";
    const WHILE: &str = "(\u{2E1D}\u{2E1D}\u{0E51}\u{FE4F}\u{0E51}\u{2E1D}\u{2E1D})";

    fn js(source: &str) -> String {
        let lexed = lex(source);
        let parsed = parse(&lexed.tokens, 100);
        let resolved = resolve(&parsed.program.expect("program"), 100);
        let module = resolved.module.expect("module");
        generate_js(&module, 100).expect("codegen")
    }

    #[test]
    fn declaration_and_print() {
        assert_eq!(
            js(":< myNumber :> :0 <3 :0 42 ;)\n:P myNumber ;)"),
            "// Transpiled from EmotiLang\n\nlet myNumber = 42; // number\nconsole.log(myNumber);\n"
        );
    }

    #[test]
    fn recursive_factorial() {
        let source = format!(
            "🤖 factorial :( n :> :0 :) :> :0 :{{\n\
               {IF} n <:( :0 2 :{{ /o/ :0 1 ;) :}}\n\
               /o/ n *_* factorial :( n :-( :0 1 :) ;)\n\
             :}}\n\
             :P factorial :( :0 5 :) ;)"
        );
        assert_eq!(
            js(&source),
            "// Transpiled from EmotiLang\n\
             \n\
             function factorial(n /* number */) /* -> number */ {\n\
             \x20 if (n < 2) {\n\
             \x20   return 1;\n\
             \x20 }\n\
             \x20 return (n * factorial((n - 1)));\n\
             }\n\
             console.log(factorial(5));\n"
        );
    }

    #[test]
    fn counting_loop() {
        let source = format!(
            ":< i :> :0 <3 :0 0 ;)\n{WHILE} i <:( :0 5 :{{ :P i ;) i <3 i :+) :0 1 ;) :}}"
        );
        assert_eq!(
            js(&source),
            "// Transpiled from EmotiLang\n\
             \n\
             let i = 0; // number\n\
             while (i < 5) {\n\
             \x20 console.log(i);\n\
             \x20 i = (i + 1);\n\
             }\n"
        );
    }

    #[test]
    fn try_catch_throw() {
        let source = "🕷️ :{ 💥 :L \"Something went wrong\" ;) :} 🕸️ err :{ :P :L \"Caught error\" ;) :}";
        assert_eq!(
            js(source),
            "// Transpiled from EmotiLang\n\
             \n\
             try {\n\
             \x20 throw \"Something went wrong\";\n\
             } catch (err) {\n\
             \x20 console.log(\"Caught error\");\n\
             }\n"
        );
    }

    #[test]
    fn logic_input_and_booleans() {
        let out = js(":< s :> :L <3 O_O ;)\n:< b :> X_X <3 !) :D &) s !( :L \"\" |) :'( ;)");
        assert!(out.contains("let s = prompt(\"Enter input:\"); // string\n"));
        assert!(out.contains("let b = (((!true) && (s !== \"\")) || false); // boolean\n"));
    }

    #[test]
    fn reserved_identifiers_are_suffixed() {
        let out = js(":< console :> :0 <3 :0 1 ;)\n:< let :> :0 <3 console :+) :0 1 ;)\n:P let ;)");
        assert!(out.contains("let console$ = 1; // number\n"));
        assert!(out.contains("let let$ = (console$ + 1); // number\n"));
        assert!(out.contains("console.log(let$);\n"));
    }

    #[test]
    fn numbers_are_normalized_and_strings_escaped() {
        let out = js(":P :0 007 ;)\n:P :L \"a\\b\" ;)");
        assert!(out.contains("console.log(7);\n"));
        assert!(out.contains("console.log(\"a\\\\b\");\n"));
    }

    #[test]
    fn call_statement() {
        let out = js("🤖 hello :( :) :> :0 :{ :P :L \"hi\" ;) /o/ :0 0 ;) :}\nhello :( :) ;)");
        assert!(out.ends_with("}\nhello();\n"));
    }

    #[test]
    fn output_is_deterministic() {
        let source = ":< x :> :0 <3 :0 1 ;)\n:P x :+) :0 2 ;)";
        assert_eq!(js(source), js(source));
    }

    #[test]
    fn depth_guard_reports_codegen_limit() {
        let lexed = lex(":P :0 1 :+) :0 2 :+) :0 3 ;)");
        let parsed = parse(&lexed.tokens, 100);
        let module = resolve(&parsed.program.expect("program"), 100)
            .module
            .expect("module");
        let err = generate_js(&module, 2).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::LimitExceeded);
        assert_eq!(err.stage, Stage::CodeGen);
    }

    #[test]
    fn quoting() {
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("tab\there"), "\"tab\\there\"");
        assert_eq!(quote("\u{2028}"), "\"\\u2028\"");
    }
}
