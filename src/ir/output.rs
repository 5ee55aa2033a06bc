//! IR output flattening
//!
//! Renders the target-language tree to text. Every node carrying a Python
//! source span contributes a `{pythonRange, targetRange}` pair to the source
//! map as it is written, so the map falls out of the same walk that produces
//! the text.

use super::exprs::{ArrowBody, TsExpr, TsExprKind};
use super::nodes::{Accessor, LoopCmp, TsFunction, TsParam, TsStmt, TsStmtKind};
use crate::span::Span;
use serde::Serialize;

/// One source-map interval: a Python range and the target range it became.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceMapEntry {
    pub py: Span,
    pub ts: Span,
}

/// Flatten a statement list to text plus its source map.
pub fn flatten(stmts: &[TsStmt]) -> (String, Vec<SourceMapEntry>) {
    let mut printer = Printer::new();
    for stmt in stmts {
        printer.write_stmt(stmt);
    }
    (printer.out, printer.map)
}

/// Render a single expression with no indentation context (used by the
/// override-template expander).
pub fn render_expr(expr: &TsExpr) -> String {
    let mut printer = Printer::new();
    printer.write_expr(expr, 0);
    printer.out
}

struct Printer {
    out: String,
    indent: usize,
    map: Vec<SourceMapEntry>,
    // one-shot: set when the next statement continues the current line
    skip_pad: bool,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            map: Vec::new(),
            skip_pad: false,
        }
    }

    fn pad(&mut self) {
        if self.skip_pad {
            self.skip_pad = false;
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn line(&mut self, text: &str) {
        self.pad();
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn record(&mut self, py_span: Option<Span>, start: usize) {
        if let Some(py) = py_span {
            self.map.push(SourceMapEntry {
                py,
                ts: Span::new(start as u32, self.out.len() as u32),
            });
        }
    }

    fn write_block(&mut self, body: &[TsStmt]) {
        self.out.push_str(" {\n");
        self.indent += 1;
        for stmt in body {
            self.write_stmt(stmt);
        }
        self.indent -= 1;
        self.pad();
        self.out.push('}');
    }

    fn write_doc(&mut self, doc: &Option<String>) {
        if let Some(doc) = doc {
            for line in doc.lines() {
                self.pad();
                self.out.push_str("//");
                if !line.is_empty() && !line.starts_with(' ') {
                    self.out.push(' ');
                }
                self.out.push_str(line);
                self.out.push('\n');
            }
        }
    }

    fn write_params(&mut self, params: &[TsParam]) {
        self.out.push('(');
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&p.name);
            if let Some(ty) = &p.ty {
                self.out.push_str(": ");
                self.out.push_str(ty);
            }
            if let Some(default) = &p.default {
                self.out.push_str(" = ");
                self.write_expr(default, 0);
            }
        }
        self.out.push(')');
    }

    fn write_function(&mut self, f: &TsFunction, in_class: bool) {
        self.write_doc(&f.doc);
        self.pad();
        if in_class {
            if f.is_static {
                self.out.push_str("static ");
            }
            match f.accessor {
                Some(Accessor::Get) => self.out.push_str("get "),
                Some(Accessor::Set) => self.out.push_str("set "),
                None => {}
            }
        } else {
            self.out.push_str("function ");
        }
        self.out.push_str(&f.name);
        self.write_params(&f.params);
        if let Some(ret) = &f.ret {
            self.out.push_str(": ");
            self.out.push_str(ret);
        }
        self.write_block(&f.body);
        self.out.push('\n');
    }

    fn write_stmt(&mut self, stmt: &TsStmt) {
        let start = self.out.len();
        match &stmt.kind {
            TsStmtKind::ExprStmt(expr) => {
                self.pad();
                self.write_expr(expr, 0);
                self.out.push_str(";\n");
            }
            TsStmtKind::Let { name, ty, init } => {
                self.pad();
                self.out.push_str("let ");
                self.out.push_str(name);
                if let Some(ty) = ty {
                    self.out.push_str(": ");
                    self.out.push_str(ty);
                }
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.write_expr(init, 0);
                }
                self.out.push_str(";\n");
            }
            TsStmtKind::Assign { target, op, value } => {
                self.pad();
                self.write_expr(target, 0);
                match op {
                    Some(op) => {
                        self.out.push(' ');
                        self.out.push_str(op.text());
                        self.out.push_str("= ");
                    }
                    None => self.out.push_str(" = "),
                }
                self.write_expr(value, 0);
                self.out.push_str(";\n");
            }
            TsStmtKind::If { test, then, els } => {
                self.pad();
                self.out.push_str("if (");
                self.write_expr(test, 0);
                self.out.push(')');
                self.write_block(then);
                if !els.is_empty() {
                    // collapse a single nested If into `else if`
                    if els.len() == 1 {
                        if let TsStmtKind::If { .. } = &els[0].kind {
                            self.out.push_str(" else ");
                            self.skip_pad = true;
                            self.write_stmt(&els[0]);
                            return self.record(stmt.py_span, start);
                        }
                    }
                    self.out.push_str(" else");
                    self.write_block(els);
                }
                self.out.push('\n');
            }
            TsStmtKind::While { test, body } => {
                self.pad();
                self.out.push_str("while (");
                self.write_expr(test, 0);
                self.out.push(')');
                self.write_block(body);
                self.out.push('\n');
            }
            TsStmtKind::ForCounted {
                var,
                init,
                cmp,
                limit,
                step,
                body,
            } => {
                self.pad();
                self.out.push_str("for (let ");
                self.out.push_str(var);
                self.out.push_str(" = ");
                self.write_expr(init, 0);
                self.out.push_str("; ");
                self.out.push_str(var);
                self.out.push_str(match cmp {
                    LoopCmp::Lt => " < ",
                    LoopCmp::Gt => " > ",
                });
                self.write_expr(limit, 0);
                self.out.push_str("; ");
                // `i++` / `i--` for unit steps, `i += n` otherwise
                match &step.kind {
                    TsExprKind::NumberLit(text) if text == "1" => {
                        self.out.push_str(var);
                        self.out.push_str("++");
                    }
                    TsExprKind::NumberLit(text) if text == "-1" => {
                        self.out.push_str(var);
                        self.out.push_str("--");
                    }
                    _ => {
                        self.out.push_str(var);
                        self.out.push_str(" += ");
                        self.write_expr(step, 0);
                    }
                }
                self.out.push(')');
                self.write_block(body);
                self.out.push('\n');
            }
            TsStmtKind::ForOf { var, iter, body } => {
                self.pad();
                self.out.push_str("for (const ");
                self.out.push_str(var);
                self.out.push_str(" of ");
                self.write_expr(iter, 0);
                self.out.push(')');
                self.write_block(body);
                self.out.push('\n');
            }
            TsStmtKind::Function(f) => self.write_function(f, false),
            TsStmtKind::Class {
                name,
                extends,
                members,
                doc,
            } => {
                self.write_doc(doc);
                self.pad();
                self.out.push_str("class ");
                self.out.push_str(name);
                if let Some(base) = extends {
                    self.out.push_str(" extends ");
                    self.out.push_str(base);
                }
                self.out.push_str(" {\n");
                self.indent += 1;
                for member in members {
                    match &member.kind {
                        TsStmtKind::Function(f) => self.write_function(f, true),
                        _ => self.write_stmt(member),
                    }
                }
                self.indent -= 1;
                self.line("}");
            }
            TsStmtKind::Constructor { params, body } => {
                self.pad();
                self.out.push_str("constructor");
                self.write_params(params);
                self.write_block(body);
                self.out.push('\n');
            }
            TsStmtKind::Field { name, ty, init } => {
                self.pad();
                self.out.push_str(name);
                if let Some(ty) = ty {
                    self.out.push_str(": ");
                    self.out.push_str(ty);
                }
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.write_expr(init, 0);
                }
                self.out.push_str(";\n");
            }
            TsStmtKind::Return(value) => {
                self.pad();
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.write_expr(value, 0);
                }
                self.out.push_str(";\n");
            }
            TsStmtKind::Break => self.line("break;"),
            TsStmtKind::Continue => self.line("continue;"),
            TsStmtKind::Throw(expr) => {
                self.pad();
                self.out.push_str("throw ");
                self.write_expr(expr, 0);
                self.out.push_str(";\n");
            }
            TsStmtKind::Try {
                body,
                catch,
                finally,
            } => {
                self.pad();
                self.out.push_str("try");
                self.write_block(body);
                if let Some((name, handler)) = catch {
                    self.out.push_str(&format!(" catch ({name})"));
                    self.write_block(handler);
                }
                if !finally.is_empty() {
                    self.out.push_str(" finally");
                    self.write_block(finally);
                }
                self.out.push('\n');
            }
            TsStmtKind::Switch { disc, cases } => {
                self.pad();
                self.out.push_str("switch (");
                self.write_expr(disc, 0);
                self.out.push_str(") {\n");
                self.indent += 1;
                for (test, body) in cases {
                    self.pad();
                    match test {
                        Some(test) => {
                            self.out.push_str("case ");
                            self.write_expr(test, 0);
                            self.out.push_str(":\n");
                        }
                        None => self.out.push_str("default:\n"),
                    }
                    self.indent += 1;
                    for stmt in body {
                        self.write_stmt(stmt);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.line("}");
            }
            TsStmtKind::Incr { target, negative } => {
                self.pad();
                self.write_expr(target, 0);
                self.out.push_str(if *negative { "--" } else { "++" });
                self.out.push_str(";\n");
            }
            TsStmtKind::Comment(text) => {
                self.pad();
                self.out.push_str("//");
                if !text.is_empty() && !text.starts_with(' ') {
                    self.out.push(' ');
                }
                self.out.push_str(text);
                self.out.push('\n');
            }
            TsStmtKind::Block(body) => {
                self.pad();
                self.out.push('{');
                self.write_block_inner(body);
                self.out.push_str("}\n");
            }
            TsStmtKind::Raw(text) => self.line(text),
        }
        self.record(stmt.py_span, start);
    }

    fn write_block_inner(&mut self, body: &[TsStmt]) {
        self.out.push('\n');
        self.indent += 1;
        for stmt in body {
            self.write_stmt(stmt);
        }
        self.indent -= 1;
        self.pad();
    }

    fn write_expr(&mut self, expr: &TsExpr, parent_prec: u8) {
        let start = self.out.len();
        let prec = expr.kind.precedence();
        let parens = prec < parent_prec;
        if parens {
            self.out.push('(');
        }
        match &expr.kind {
            TsExprKind::Ident(name) => self.out.push_str(name),
            TsExprKind::NumberLit(text) => self.out.push_str(text),
            TsExprKind::StringLit(value) => {
                self.out.push('"');
                self.out.push_str(&escape_string(value, '"'));
                self.out.push('"');
            }
            TsExprKind::TemplateLit { parts, exprs } => {
                self.out.push('`');
                for (i, part) in parts.iter().enumerate() {
                    self.out.push_str(&escape_template(part));
                    if let Some(e) = exprs.get(i) {
                        self.out.push_str("${");
                        self.write_expr(e, 0);
                        self.out.push('}');
                    }
                }
                self.out.push('`');
            }
            TsExprKind::BoolLit(value) => {
                self.out.push_str(if *value { "true" } else { "false" })
            }
            TsExprKind::Null => self.out.push_str("null"),
            TsExprKind::Undefined => self.out.push_str("undefined"),
            TsExprKind::Binary { op, left, right } => {
                self.write_expr(left, op.precedence());
                self.out.push(' ');
                self.out.push_str(op.text());
                self.out.push(' ');
                self.write_expr(right, op.precedence() + 1);
            }
            TsExprKind::Unary { op, operand } => {
                self.out.push_str(op.text());
                self.write_expr(operand, 11);
            }
            TsExprKind::Conditional { test, cons, alt } => {
                self.write_expr(test, 2);
                self.out.push_str(" ? ");
                self.write_expr(cons, 2);
                self.out.push_str(" : ");
                self.write_expr(alt, 1);
            }
            TsExprKind::Call { callee, args } => {
                self.write_expr(callee, 13);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_expr(arg, 0);
                }
                self.out.push(')');
            }
            TsExprKind::New { callee, args } => {
                self.out.push_str("new ");
                self.write_expr(callee, 13);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_expr(arg, 0);
                }
                self.out.push(')');
            }
            TsExprKind::Member { obj, prop } => {
                self.write_expr(obj, 13);
                self.out.push('.');
                self.out.push_str(prop);
            }
            TsExprKind::Index { obj, index } => {
                self.write_expr(obj, 13);
                self.out.push('[');
                self.write_expr(index, 0);
                self.out.push(']');
            }
            TsExprKind::ArrayLit(elts) => {
                self.out.push('[');
                for (i, e) in elts.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_expr(e, 0);
                }
                self.out.push(']');
            }
            TsExprKind::ObjectLit(fields) => {
                self.out.push('{');
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push('"');
                    self.out.push_str(&escape_string(key, '"'));
                    self.out.push_str("\": ");
                    self.write_expr(value, 0);
                }
                self.out.push('}');
            }
            TsExprKind::Arrow { params, body } => {
                self.out.push('(');
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(p);
                }
                self.out.push_str(") => ");
                match body {
                    ArrowBody::Expr(e) => self.write_expr(e, 1),
                    ArrowBody::Block(stmts) => {
                        self.out.push('{');
                        self.write_block_inner(stmts);
                        self.out.push('}');
                    }
                }
            }
            TsExprKind::Raw(text) => self.out.push_str(text),
        }
        if parens {
            self.out.push(')');
        }
        if let Some(py) = expr.py_span {
            self.map.push(SourceMapEntry {
                py,
                ts: Span::new(start as u32, self.out.len() as u32),
            });
        }
    }
}

fn escape_string(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn escape_template(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ops::TsBinOp;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flatten_let() {
        let stmts = vec![TsStmt::new(TsStmtKind::Let {
            name: "x".to_string(),
            ty: Some("number".to_string()),
            init: Some(TsExpr::number("10")),
        })];
        let (text, _) = flatten(&stmts);
        assert_eq!(text, "let x: number = 10;\n");
    }

    #[test]
    fn test_precedence_parenthesization() {
        // (a + b) * c
        let expr = TsExpr::binary(
            TsBinOp::Mul,
            TsExpr::binary(TsBinOp::Add, TsExpr::ident("a"), TsExpr::ident("b")),
            TsExpr::ident("c"),
        );
        assert_eq!(render_expr(&expr), "(a + b) * c");
        // a + b * c needs no parens
        let expr = TsExpr::binary(
            TsBinOp::Add,
            TsExpr::ident("a"),
            TsExpr::binary(TsBinOp::Mul, TsExpr::ident("b"), TsExpr::ident("c")),
        );
        assert_eq!(render_expr(&expr), "a + b * c");
    }

    #[test]
    fn test_counted_loop_renders_unit_step_as_increment() {
        let stmts = vec![TsStmt::new(TsStmtKind::ForCounted {
            var: "i".to_string(),
            init: TsExpr::number("0"),
            cmp: LoopCmp::Lt,
            limit: TsExpr::number("10"),
            step: TsExpr::number("1"),
            body: vec![],
        })];
        let (text, _) = flatten(&stmts);
        assert_eq!(text, "for (let i = 0; i < 10; i++) {\n}\n");
    }

    #[test]
    fn test_template_literal_escapes() {
        let expr = TsExpr::new(TsExprKind::TemplateLit {
            parts: vec!["v=`$".to_string(), "".to_string()],
            exprs: vec![TsExpr::ident("x")],
        });
        assert_eq!(render_expr(&expr), "`v=\\`\\$${x}`");
    }

    #[test]
    fn test_source_map_records_spans() {
        let stmts = vec![TsStmt::spanned(
            TsStmtKind::ExprStmt(TsExpr::ident("f")),
            Span::new(0, 3),
        )];
        let (text, map) = flatten(&stmts);
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].py, Span::new(0, 3));
        assert_eq!(
            &text[map[0].ts.start as usize..map[0].ts.end as usize],
            "f;\n"
        );
    }
}
