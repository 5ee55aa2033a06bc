//! Python emitter - target IR back to Python source
//!
//! The reverse direction of the converter. It consumes the same statement IR
//! the forward generator produces and prints Python: template literals become
//! f-strings, `&&`/`||`/`!` become `and`/`or`/`not`, strict equality becomes
//! `==`/`!=`, counted loops become `range()` calls, `Math.pow`/`Math.idiv`
//! become `**`/`//`, and switches become if/elif chains.
//!
//! The contract is narrower than the forward one: a construct with no Python
//! equivalent (raw spliced text, block-bodied arrows, classes or lambdas when
//! gated off) fails with a positioned [`ConvertError::Unsupported`] instead of
//! emitting invalid output.
//!
//! Identifiers colliding with Python keywords or builtins get underscores
//! appended. The rename map lives for the whole file, so every occurrence of a
//! name renames identically.

#[cfg(test)]
mod tests;

use crate::error::{ConvertError, Result};
use crate::ir::{
    Accessor, ArrowBody, TsBinOp, TsExpr, TsExprKind, TsFunction, TsStmt, TsStmtKind, TsUnaryOp,
};
use crate::span::Span;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Feature gates for the reverse emitter.
#[derive(Debug, Clone)]
pub struct PyEmitOptions {
    pub allow_lambda: bool,
    pub allow_classes: bool,
}

impl Default for PyEmitOptions {
    fn default() -> Self {
        Self {
            allow_lambda: true,
            allow_classes: true,
        }
    }
}

/// Names a Python identifier must not collide with.
static PY_RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // keywords
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield",
        // builtins the emitter itself leans on
        "abs", "bool", "dict", "float", "id", "input", "int", "len", "list", "max", "min",
        "print", "range", "round", "set", "str", "type",
    ]
    .into_iter()
    .collect()
});

/// Method renames from the target spelling back to Python's.
static METHOD_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("push", "append"),
        ("removeElement", "remove"),
        ("indexOf", "index"),
        ("toUpperCase", "upper"),
        ("toLowerCase", "lower"),
        ("trim", "strip"),
    ]
    .into_iter()
    .collect()
});

/// Emit Python source for a target-language program.
pub fn emit(stmts: &[TsStmt], options: &PyEmitOptions) -> Result<String> {
    let mut emitter = Emitter::new(options);
    let mut declared = HashSet::new();
    collect_declared(stmts, &mut declared);
    emitter.scopes.push(Scope {
        function: false,
        declared,
    });
    for stmt in stmts {
        emitter.write_stmt(stmt, false)?;
    }
    let mut out = String::new();
    if emitter.needs_math {
        out.push_str("import math\n");
    }
    if emitter.needs_random {
        out.push_str("import random\n");
    }
    if !out.is_empty() && !emitter.out.is_empty() {
        out.push('\n');
    }
    out.push_str(&emitter.out);
    Ok(out)
}

/// One lexical scope for global/nonlocal analysis.
struct Scope {
    function: bool,
    declared: HashSet<String>,
}

struct Emitter<'a> {
    out: String,
    indent: usize,
    options: &'a PyEmitOptions,
    renames: HashMap<String, String>,
    scopes: Vec<Scope>,
    needs_math: bool,
    needs_random: bool,
}

impl<'a> Emitter<'a> {
    fn new(options: &'a PyEmitOptions) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            options,
            renames: HashMap::new(),
            scopes: Vec::new(),
            needs_math: false,
            needs_random: false,
        }
    }

    fn unsupported(&self, construct: &str, span: Option<Span>) -> ConvertError {
        ConvertError::Unsupported {
            construct: construct.to_string(),
            span: span.unwrap_or_default(),
        }
    }

    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    /// Stable per-file rename for identifiers colliding with Python words.
    fn rename(&mut self, name: &str) -> String {
        if let Some(renamed) = self.renames.get(name) {
            return renamed.clone();
        }
        let mut candidate = name.to_string();
        while PY_RESERVED.contains(candidate.as_str()) {
            candidate.push('_');
        }
        self.renames.insert(name.to_string(), candidate.clone());
        candidate
    }

    // ----- statements -----

    fn write_stmt(&mut self, stmt: &TsStmt, in_class: bool) -> Result<()> {
        match &stmt.kind {
            TsStmtKind::ExprStmt(expr) => {
                self.pad();
                self.write_expr(expr, 0)?;
                self.out.push('\n');
            }
            TsStmtKind::Let { name, init, .. } => {
                let name = self.rename(name);
                self.pad();
                self.out.push_str(&name);
                self.out.push_str(" = ");
                match init {
                    Some(init) => self.write_expr(init, 0)?,
                    None => self.out.push_str("None"),
                }
                self.out.push('\n');
            }
            TsStmtKind::Assign { target, op, value } => {
                self.pad();
                self.write_expr(target, 0)?;
                match op {
                    Some(op) => {
                        self.out.push(' ');
                        self.out.push_str(op.text());
                        self.out.push_str("= ");
                    }
                    None => self.out.push_str(" = "),
                }
                self.write_expr(value, 0)?;
                self.out.push('\n');
            }
            TsStmtKind::If { test, then, els } => self.write_if(test, then, els, "if")?,
            TsStmtKind::While { test, body } => {
                self.pad();
                self.out.push_str("while ");
                self.write_expr(test, 0)?;
                self.out.push_str(":\n");
                self.write_block(body)?;
            }
            TsStmtKind::ForCounted {
                var,
                init,
                limit,
                step,
                body,
                ..
            } => {
                let var = self.rename(var);
                self.pad();
                self.out.push_str("for ");
                self.out.push_str(&var);
                self.out.push_str(" in range(");
                let default_step = matches!(&step.kind, TsExprKind::NumberLit(s) if s == "1");
                let zero_start = matches!(&init.kind, TsExprKind::NumberLit(s) if s == "0");
                if zero_start && default_step {
                    self.write_expr(limit, 0)?;
                } else {
                    self.write_expr(init, 0)?;
                    self.out.push_str(", ");
                    self.write_expr(limit, 0)?;
                    if !default_step {
                        self.out.push_str(", ");
                        self.write_expr(step, 0)?;
                    }
                }
                self.out.push_str("):\n");
                self.write_block(body)?;
            }
            TsStmtKind::ForOf { var, iter, body } => {
                let var = self.rename(var);
                self.pad();
                self.out.push_str("for ");
                self.out.push_str(&var);
                self.out.push_str(" in ");
                self.write_expr(iter, 0)?;
                self.out.push_str(":\n");
                self.write_block(body)?;
            }
            TsStmtKind::Function(f) => self.write_function(f, in_class)?,
            TsStmtKind::Constructor { params, body } => {
                let ctor = TsFunction {
                    name: "__init__".to_string(),
                    params: params.clone(),
                    ret: None,
                    body: body.clone(),
                    doc: None,
                    is_static: false,
                    accessor: None,
                };
                self.write_function(&ctor, true)?;
            }
            TsStmtKind::Class {
                name,
                extends,
                members,
                doc,
            } => self.write_class(name, extends.as_deref(), members, doc.as_deref(), stmt)?,
            TsStmtKind::Field { name, init, .. } => {
                // an uninitialized field declaration is implied by the
                // constructor's assignments
                if let Some(init) = init {
                    let name = self.rename(name);
                    self.pad();
                    self.out.push_str(&name);
                    self.out.push_str(" = ");
                    self.write_expr(init, 0)?;
                    self.out.push('\n');
                }
            }
            TsStmtKind::Return(value) => {
                self.pad();
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.write_expr(value, 0)?;
                }
                self.out.push('\n');
            }
            TsStmtKind::Throw(expr) => {
                self.pad();
                self.out.push_str("raise ");
                if let TsExprKind::New { callee, args } = &expr.kind {
                    if matches!(&callee.kind, TsExprKind::Ident(n) if n == "Error") {
                        self.out.push_str("Exception(");
                        self.write_args(args)?;
                        self.out.push_str(")\n");
                        return Ok(());
                    }
                }
                self.write_expr(expr, 0)?;
                self.out.push('\n');
            }
            TsStmtKind::Try {
                body,
                catch,
                finally,
            } => {
                if catch.is_none() && finally.is_empty() {
                    for s in body {
                        self.write_stmt(s, false)?;
                    }
                    return Ok(());
                }
                self.pad();
                self.out.push_str("try:\n");
                self.write_block(body)?;
                if let Some((name, cbody)) = catch {
                    let name = self.rename(name);
                    self.pad();
                    self.out.push_str("except Exception as ");
                    self.out.push_str(&name);
                    self.out.push_str(":\n");
                    self.write_block(cbody)?;
                }
                if !finally.is_empty() {
                    self.pad();
                    self.out.push_str("finally:\n");
                    self.write_block(finally)?;
                }
            }
            TsStmtKind::Break => {
                self.pad();
                self.out.push_str("break\n");
            }
            TsStmtKind::Continue => {
                self.pad();
                self.out.push_str("continue\n");
            }
            TsStmtKind::Switch { disc, cases } => self.write_switch(disc, cases)?,
            TsStmtKind::Incr { target, negative } => {
                self.pad();
                self.write_expr(target, 0)?;
                self.out.push_str(if *negative { " -= 1\n" } else { " += 1\n" });
            }
            TsStmtKind::Comment(text) => {
                for line in text.lines() {
                    self.pad();
                    self.out.push_str("# ");
                    self.out.push_str(line);
                    self.out.push('\n');
                }
            }
            TsStmtKind::Block(body) => {
                // Python has no block scope; inline the statements
                for s in body {
                    self.write_stmt(s, false)?;
                }
            }
            TsStmtKind::Raw(_) => {
                return Err(self.unsupported("raw target fragment", stmt.py_span));
            }
        }
        Ok(())
    }

    fn write_if(&mut self, test: &TsExpr, then: &[TsStmt], els: &[TsStmt], kw: &str) -> Result<()> {
        self.pad();
        self.out.push_str(kw);
        self.out.push(' ');
        self.write_expr(test, 0)?;
        self.out.push_str(":\n");
        self.write_block(then)?;
        if els.is_empty() {
            return Ok(());
        }
        if els.len() == 1 {
            if let TsStmtKind::If {
                test: etest,
                then: ethen,
                els: eels,
            } = &els[0].kind
            {
                return self.write_if(etest, ethen, eels, "elif");
            }
        }
        self.pad();
        self.out.push_str("else:\n");
        self.write_block(els)
    }

    fn write_switch(
        &mut self,
        disc: &TsExpr,
        cases: &[(Option<TsExpr>, Vec<TsStmt>)],
    ) -> Result<()> {
        let mut first = true;
        for (value, body) in cases {
            // a trailing break is implicit in the if/elif rendering
            let body: Vec<&TsStmt> = body
                .iter()
                .filter(|s| !matches!(s.kind, TsStmtKind::Break))
                .collect();
            match value {
                Some(value) => {
                    self.pad();
                    self.out.push_str(if first { "if " } else { "elif " });
                    first = false;
                    self.write_expr(disc, 6)?;
                    self.out.push_str(" == ");
                    self.write_expr(value, 6)?;
                    self.out.push_str(":\n");
                }
                None => {
                    if first {
                        // a default-only switch degenerates to its body
                        for s in body {
                            self.write_stmt(s, false)?;
                        }
                        continue;
                    }
                    self.pad();
                    self.out.push_str("else:\n");
                }
            }
            self.indent += 1;
            if body.is_empty() {
                self.pad();
                self.out.push_str("pass\n");
            }
            for s in body {
                self.write_stmt(s, false)?;
            }
            self.indent -= 1;
        }
        Ok(())
    }

    fn write_function(&mut self, f: &TsFunction, in_class: bool) -> Result<()> {
        let name = self.rename(&f.name);
        if in_class {
            match f.accessor {
                Some(Accessor::Get) => {
                    self.pad();
                    self.out.push_str("@property\n");
                }
                Some(Accessor::Set) => {
                    self.pad();
                    self.out.push_str(&format!("@{name}.setter\n"));
                }
                None => {}
            }
            if f.is_static {
                self.pad();
                self.out.push_str("@staticmethod\n");
            }
        }
        self.pad();
        self.out.push_str("def ");
        self.out.push_str(&name);
        self.out.push('(');
        let mut first = true;
        if in_class && !f.is_static {
            self.out.push_str("self");
            first = false;
        }
        let mut declared = HashSet::new();
        for p in &f.params {
            if !first {
                self.out.push_str(", ");
            }
            first = false;
            let pname = self.rename(&p.name);
            declared.insert(p.name.clone());
            self.out.push_str(&pname);
            if let Some(default) = &p.default {
                self.out.push('=');
                self.write_expr(default, 0)?;
            }
        }
        self.out.push_str("):\n");

        collect_declared(&f.body, &mut declared);
        let (globals, nonlocals) = self.capture_analysis(&f.body, &declared);
        self.scopes.push(Scope {
            function: true,
            declared,
        });
        self.indent += 1;
        if let Some(doc) = &f.doc {
            self.pad();
            self.out.push_str(&format!("\"\"\"{doc}\"\"\"\n"));
        }
        if !globals.is_empty() {
            let names: Vec<String> = globals.iter().map(|n| self.rename(n)).collect();
            self.pad();
            self.out.push_str(&format!("global {}\n", names.join(", ")));
        }
        if !nonlocals.is_empty() {
            let names: Vec<String> = nonlocals.iter().map(|n| self.rename(n)).collect();
            self.pad();
            self.out.push_str(&format!("nonlocal {}\n", names.join(", ")));
        }
        if f.body.is_empty() && f.doc.is_none() && globals.is_empty() && nonlocals.is_empty() {
            self.pad();
            self.out.push_str("pass\n");
        }
        for stmt in &f.body {
            self.write_stmt(stmt, false)?;
        }
        self.indent -= 1;
        self.scopes.pop();
        Ok(())
    }

    /// Names assigned in a function body but declared in an enclosing scope
    /// need `global`/`nonlocal`; everything else stays implicit.
    fn capture_analysis(
        &self,
        body: &[TsStmt],
        declared: &HashSet<String>,
    ) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut assigned = HashSet::new();
        collect_assigned(body, &mut assigned);
        let mut globals = BTreeSet::new();
        let mut nonlocals = BTreeSet::new();
        for name in assigned {
            if declared.contains(&name) {
                continue;
            }
            for scope in self.scopes.iter().rev() {
                if scope.declared.contains(&name) {
                    if scope.function {
                        nonlocals.insert(name);
                    } else {
                        globals.insert(name);
                    }
                    break;
                }
            }
        }
        (globals, nonlocals)
    }

    fn write_class(
        &mut self,
        name: &str,
        extends: Option<&str>,
        members: &[TsStmt],
        doc: Option<&str>,
        stmt: &TsStmt,
    ) -> Result<()> {
        if !self.options.allow_classes {
            return Err(self.unsupported("class declaration", stmt.py_span));
        }
        let name = self.rename(name);
        self.pad();
        self.out.push_str("class ");
        self.out.push_str(&name);
        if let Some(base) = extends {
            let base = self.rename(base);
            self.out.push('(');
            self.out.push_str(&base);
            self.out.push(')');
        }
        self.out.push_str(":\n");
        self.indent += 1;
        if let Some(doc) = doc {
            self.pad();
            self.out.push_str(&format!("\"\"\"{doc}\"\"\"\n"));
        }
        let mut wrote_any = doc.is_some();
        for member in members {
            match &member.kind {
                TsStmtKind::Field { init: None, .. } => continue,
                _ => {
                    if wrote_any
                        && matches!(
                            member.kind,
                            TsStmtKind::Function(_) | TsStmtKind::Constructor { .. }
                        )
                    {
                        self.out.push('\n');
                    }
                    self.write_stmt(member, true)?;
                    wrote_any = true;
                }
            }
        }
        if !wrote_any {
            self.pad();
            self.out.push_str("pass\n");
        }
        self.indent -= 1;
        Ok(())
    }

    fn write_block(&mut self, stmts: &[TsStmt]) -> Result<()> {
        self.indent += 1;
        if stmts.is_empty() {
            self.pad();
            self.out.push_str("pass\n");
        }
        for stmt in stmts {
            self.write_stmt(stmt, false)?;
        }
        self.indent -= 1;
        Ok(())
    }

    // ----- expressions -----

    fn write_args(&mut self, args: &[TsExpr]) -> Result<()> {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.write_expr(arg, 0)?;
        }
        Ok(())
    }

    fn write_expr(&mut self, expr: &TsExpr, parent_prec: u8) -> Result<()> {
        match &expr.kind {
            TsExprKind::Ident(name) => {
                if name == "this" {
                    self.out.push_str("self");
                } else if name.contains('.') {
                    // a pre-qualified target name; dots are not renameable
                    self.out.push_str(name);
                } else {
                    let name = self.rename(name);
                    self.out.push_str(&name);
                }
            }
            TsExprKind::NumberLit(text) => self.out.push_str(text),
            TsExprKind::StringLit(value) => {
                let quoted = python_string(value);
                self.out.push_str(&quoted);
            }
            TsExprKind::TemplateLit { parts, exprs } => {
                self.out.push_str("f\"");
                for (i, part) in parts.iter().enumerate() {
                    self.push_fstring_text(part);
                    if i < exprs.len() {
                        self.out.push('{');
                        self.write_expr(&exprs[i], 0)?;
                        self.out.push('}');
                    }
                }
                self.out.push('"');
            }
            TsExprKind::BoolLit(value) => {
                self.out.push_str(if *value { "True" } else { "False" })
            }
            TsExprKind::Null | TsExprKind::Undefined => self.out.push_str("None"),
            TsExprKind::Binary { op, left, right } => {
                if *op == TsBinOp::Instanceof {
                    self.out.push_str("isinstance(");
                    self.write_expr(left, 0)?;
                    self.out.push_str(", ");
                    self.write_expr(right, 0)?;
                    self.out.push(')');
                    return Ok(());
                }
                let (text, prec) = python_bin_op(*op);
                let parens = prec < parent_prec;
                if parens {
                    self.out.push('(');
                }
                self.write_expr(left, prec)?;
                self.out.push(' ');
                self.out.push_str(text);
                self.out.push(' ');
                self.write_expr(right, prec + 1)?;
                if parens {
                    self.out.push(')');
                }
            }
            TsExprKind::Unary { op, operand } => {
                let (text, prec) = match op {
                    TsUnaryOp::Not => ("not ", 4u8),
                    TsUnaryOp::Neg => ("-", 12),
                    TsUnaryOp::Plus => ("+", 12),
                    TsUnaryOp::BitNot => ("~", 12),
                };
                let parens = prec < parent_prec;
                if parens {
                    self.out.push('(');
                }
                self.out.push_str(text);
                self.write_expr(operand, prec + 1)?;
                if parens {
                    self.out.push(')');
                }
            }
            TsExprKind::Conditional { test, cons, alt } => {
                let parens = 1 < parent_prec;
                if parens {
                    self.out.push('(');
                }
                self.write_expr(cons, 2)?;
                self.out.push_str(" if ");
                self.write_expr(test, 2)?;
                self.out.push_str(" else ");
                self.write_expr(alt, 1)?;
                if parens {
                    self.out.push(')');
                }
            }
            TsExprKind::Call { callee, args } => {
                self.write_call(callee, args, parent_prec)?;
            }
            TsExprKind::New { callee, args } => {
                self.write_expr(callee, 14)?;
                self.out.push('(');
                self.write_args(args)?;
                self.out.push(')');
            }
            TsExprKind::Member { obj, prop } => {
                if prop == "length" {
                    self.out.push_str("len(");
                    self.write_expr(obj, 0)?;
                    self.out.push(')');
                    return Ok(());
                }
                if let TsExprKind::Ident(ns) = &obj.kind {
                    if ns == "Math" {
                        match prop.as_str() {
                            "PI" => {
                                self.needs_math = true;
                                self.out.push_str("math.pi");
                                return Ok(());
                            }
                            "E" => {
                                self.needs_math = true;
                                self.out.push_str("math.e");
                                return Ok(());
                            }
                            _ => {}
                        }
                    }
                }
                self.write_expr(obj, 14)?;
                self.out.push('.');
                let prop = self.rename(prop);
                self.out.push_str(&prop);
            }
            TsExprKind::Index { obj, index } => {
                self.write_expr(obj, 14)?;
                self.out.push('[');
                self.write_expr(index, 0)?;
                self.out.push(']');
            }
            TsExprKind::ArrayLit(elts) => {
                self.out.push('[');
                self.write_args(elts)?;
                self.out.push(']');
            }
            TsExprKind::ObjectLit(fields) => {
                self.out.push('{');
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&python_string(key));
                    self.out.push_str(": ");
                    self.write_expr(value, 0)?;
                }
                self.out.push('}');
            }
            TsExprKind::Arrow { params, body } => {
                if !self.options.allow_lambda {
                    return Err(self.unsupported("arrow function", expr.py_span));
                }
                let ArrowBody::Expr(body) = body else {
                    return Err(self.unsupported("arrow function with a statement body", expr.py_span));
                };
                let parens = parent_prec > 0;
                if parens {
                    self.out.push('(');
                }
                self.out.push_str("lambda");
                for (i, p) in params.iter().enumerate() {
                    self.out.push_str(if i == 0 { " " } else { ", " });
                    let p = self.rename(p);
                    self.out.push_str(&p);
                }
                self.out.push_str(": ");
                self.write_expr(body, 1)?;
                if parens {
                    self.out.push(')');
                }
            }
            TsExprKind::Raw(_) => {
                return Err(self.unsupported("raw target fragment", expr.py_span));
            }
        }
        Ok(())
    }

    fn write_call(&mut self, callee: &TsExpr, args: &[TsExpr], parent_prec: u8) -> Result<()> {
        if let TsExprKind::Ident(name) = &callee.kind {
            match name.as_str() {
                "super" => {
                    self.out.push_str("super().__init__(");
                    self.write_args(args)?;
                    self.out.push(')');
                    return Ok(());
                }
                "parseInt" => {
                    self.out.push_str("int(");
                    self.write_args(args)?;
                    self.out.push(')');
                    return Ok(());
                }
                "parseFloat" => {
                    self.out.push_str("float(");
                    self.write_args(args)?;
                    self.out.push(')');
                    return Ok(());
                }
                _ => {}
            }
        }
        if let TsExprKind::Member { obj, prop } = &callee.kind {
            if let TsExprKind::Ident(ns) = &obj.kind {
                match ns.as_str() {
                    "console" if prop == "log" => {
                        self.out.push_str("print(");
                        self.write_args(args)?;
                        self.out.push(')');
                        return Ok(());
                    }
                    "super" => {
                        self.out.push_str("super().");
                        let prop = self.rename(prop);
                        self.out.push_str(&prop);
                        self.out.push('(');
                        self.write_args(args)?;
                        self.out.push(')');
                        return Ok(());
                    }
                    "Math" => return self.write_math_call(prop, args, parent_prec),
                    _ => {}
                }
            }
            match prop.as_str() {
                "charAt" if args.len() == 1 => {
                    self.write_expr(obj, 14)?;
                    self.out.push('[');
                    self.write_expr(&args[0], 0)?;
                    self.out.push(']');
                    return Ok(());
                }
                "slice" if !args.is_empty() && args.len() <= 2 => {
                    self.write_expr(obj, 14)?;
                    self.out.push('[');
                    self.write_expr(&args[0], 0)?;
                    self.out.push(':');
                    if let Some(upper) = args.get(1) {
                        self.write_expr(upper, 0)?;
                    }
                    self.out.push(']');
                    return Ok(());
                }
                _ => {
                    if let Some(renamed) = METHOD_MAP.get(prop.as_str()) {
                        self.write_expr(obj, 14)?;
                        self.out.push('.');
                        self.out.push_str(renamed);
                        self.out.push('(');
                        self.write_args(args)?;
                        self.out.push(')');
                        return Ok(());
                    }
                }
            }
        }
        self.write_expr(callee, 14)?;
        self.out.push('(');
        self.write_args(args)?;
        self.out.push(')');
        Ok(())
    }

    fn write_math_call(&mut self, prop: &str, args: &[TsExpr], parent_prec: u8) -> Result<()> {
        match prop {
            "pow" if args.len() == 2 => {
                let parens = 13 < parent_prec;
                if parens {
                    self.out.push('(');
                }
                self.write_expr(&args[0], 14)?;
                self.out.push_str(" ** ");
                // right-associative
                self.write_expr(&args[1], 13)?;
                if parens {
                    self.out.push(')');
                }
            }
            "idiv" if args.len() == 2 => {
                let parens = 11 < parent_prec;
                if parens {
                    self.out.push('(');
                }
                self.write_expr(&args[0], 11)?;
                self.out.push_str(" // ");
                self.write_expr(&args[1], 12)?;
                if parens {
                    self.out.push(')');
                }
            }
            "abs" | "min" | "max" | "round" => {
                self.out.push_str(prop);
                self.out.push('(');
                self.write_args(args)?;
                self.out.push(')');
            }
            "randomRange" => {
                self.needs_random = true;
                self.out.push_str("random.randint(");
                self.write_args(args)?;
                self.out.push(')');
            }
            _ => {
                self.needs_math = true;
                self.out.push_str("math.");
                self.out.push_str(prop);
                self.out.push('(');
                self.write_args(args)?;
                self.out.push(')');
            }
        }
        Ok(())
    }

    fn push_fstring_text(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '{' => self.out.push_str("{{"),
                '}' => self.out.push_str("}}"),
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                _ => self.out.push(c),
            }
        }
    }
}

fn python_bin_op(op: TsBinOp) -> (&'static str, u8) {
    match op {
        TsBinOp::Or => ("or", 2),
        TsBinOp::And => ("and", 3),
        TsBinOp::Eq => ("==", 5),
        TsBinOp::NotEq => ("!=", 5),
        TsBinOp::Lt => ("<", 5),
        TsBinOp::Gt => (">", 5),
        TsBinOp::LtEq => ("<=", 5),
        TsBinOp::GtEq => (">=", 5),
        TsBinOp::BitOr => ("|", 6),
        TsBinOp::BitXor => ("^", 7),
        TsBinOp::BitAnd => ("&", 8),
        TsBinOp::Shl => ("<<", 9),
        TsBinOp::Shr => (">>", 9),
        TsBinOp::Add => ("+", 10),
        TsBinOp::Sub => ("-", 10),
        TsBinOp::Mul => ("*", 11),
        TsBinOp::Div => ("/", 11),
        TsBinOp::Mod => ("%", 11),
        TsBinOp::Instanceof => ("isinstance", 14),
    }
}

fn python_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Names bound in a scope: `let`s, loop variables, nested def/class names.
/// Does not descend into nested function bodies, which bind their own names.
fn collect_declared(stmts: &[TsStmt], out: &mut HashSet<String>) {
    for stmt in stmts {
        match &stmt.kind {
            TsStmtKind::Let { name, .. } => {
                out.insert(name.clone());
            }
            TsStmtKind::ForCounted { var, body, .. } | TsStmtKind::ForOf { var, body, .. } => {
                out.insert(var.clone());
                collect_declared(body, out);
            }
            TsStmtKind::If { then, els, .. } => {
                collect_declared(then, out);
                collect_declared(els, out);
            }
            TsStmtKind::While { body, .. } | TsStmtKind::Block(body) => {
                collect_declared(body, out);
            }
            TsStmtKind::Try {
                body,
                catch,
                finally,
            } => {
                collect_declared(body, out);
                if let Some((name, cbody)) = catch {
                    out.insert(name.clone());
                    collect_declared(cbody, out);
                }
                collect_declared(finally, out);
            }
            TsStmtKind::Switch { cases, .. } => {
                for (_, body) in cases {
                    collect_declared(body, out);
                }
            }
            TsStmtKind::Function(f) => {
                out.insert(f.name.clone());
            }
            TsStmtKind::Class { name, .. } => {
                out.insert(name.clone());
            }
            _ => {}
        }
    }
}

/// Plain-identifier assignment targets in a scope, nested functions excluded.
fn collect_assigned(stmts: &[TsStmt], out: &mut HashSet<String>) {
    for stmt in stmts {
        match &stmt.kind {
            TsStmtKind::Assign { target, .. } | TsStmtKind::Incr { target, .. } => {
                if let TsExprKind::Ident(name) = &target.kind {
                    out.insert(name.clone());
                }
            }
            TsStmtKind::If { then, els, .. } => {
                collect_assigned(then, out);
                collect_assigned(els, out);
            }
            TsStmtKind::While { body, .. }
            | TsStmtKind::ForCounted { body, .. }
            | TsStmtKind::ForOf { body, .. }
            | TsStmtKind::Block(body) => {
                collect_assigned(body, out);
            }
            TsStmtKind::Try {
                body,
                catch,
                finally,
            } => {
                collect_assigned(body, out);
                if let Some((_, cbody)) = catch {
                    collect_assigned(cbody, out);
                }
                collect_assigned(finally, out);
            }
            TsStmtKind::Switch { cases, .. } => {
                for (_, body) in cases {
                    collect_assigned(body, out);
                }
            }
            _ => {}
        }
    }
}
