//! Statement generation rules
//!
//! One rule per statement kind. Unsupported constructs produce an inline TODO
//! marker plus a diagnostic and generation continues, so one bad statement
//! never aborts the rest of the file.

use super::{Ctx, Session};
use crate::diagnostics::codes;
use crate::ir::{Accessor, LoopCmp, TsExpr, TsFunction, TsParam, TsStmt, TsStmtKind};
use crate::parser::{NodeId, NodeKind};
use crate::semantic::scope::ScopeKind;
use crate::semantic::symbol::{ParamSymbol, Symbol, SymbolId, SymbolKind};
use crate::span::Span;

impl Session<'_> {
    pub(crate) fn gen_stmts(&mut self, stmts: &[NodeId], ctx: &mut Ctx) -> Vec<TsStmt> {
        // pre-declare defs and classes so forward references resolve
        for &id in stmts {
            match self.parsed.ast.kind(id) {
                NodeKind::FunctionDef { .. } => {
                    self.declare_function(id, ctx);
                }
                NodeKind::ClassDef { .. } => {
                    self.declare_class(id, ctx);
                }
                _ => {}
            }
        }
        let mut out = Vec::new();
        for &id in stmts {
            self.gen_stmt(id, ctx, &mut out);
        }
        out
    }

    fn gen_stmt(&mut self, id: NodeId, ctx: &mut Ctx, out: &mut Vec<TsStmt>) {
        let span = self.parsed.ast.span(id);
        let kind = self.parsed.ast.kind(id).clone();
        match kind {
            NodeKind::FunctionDef { .. } => {
                if !self.is_inlined_def(id) {
                    let stmts = self.gen_function(id, ctx);
                    out.extend(stmts);
                }
            }
            NodeKind::ClassDef { .. } => self.gen_class(id, ctx, out),
            NodeKind::If { test, body, orelse } => {
                let (test, _) = self.gen_expr(test, ctx);
                let then = self.gen_block(&body, ctx);
                let els = self.gen_block(&orelse, ctx);
                out.push(TsStmt::spanned(TsStmtKind::If { test, then, els }, span));
            }
            NodeKind::While { test, body, orelse } => {
                let (test, _) = self.gen_expr(test, ctx);
                let body = self.gen_block(&body, ctx);
                out.push(TsStmt::spanned(TsStmtKind::While { test, body }, span));
                if !orelse.is_empty() {
                    self.unsupported("`else` clause on a loop", span);
                    out.extend(self.gen_block(&orelse, ctx));
                }
            }
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.gen_for(target, iter, &body, span, ctx, out);
                if !orelse.is_empty() {
                    self.unsupported("`else` clause on a loop", span);
                    out.extend(self.gen_block(&orelse, ctx));
                }
            }
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finally,
            } => {
                let mut try_body = self.gen_block(&body, ctx);
                if !orelse.is_empty() {
                    self.unsupported("`else` clause on try", span);
                    try_body.extend(self.gen_block(&orelse, ctx));
                }
                let catch = handlers.first().map(|h| {
                    let name = h.name.clone().unwrap_or_else(|| "e".to_string());
                    if h.name.is_some() {
                        self.declare_local(&name, ctx);
                    }
                    (name, self.gen_block(&h.body, ctx))
                });
                for extra in handlers.iter().skip(1) {
                    self.unsupported("more than one except clause", extra.span);
                }
                let finally = self.gen_block(&finally, ctx);
                out.push(TsStmt::spanned(
                    TsStmtKind::Try {
                        body: try_body,
                        catch,
                        finally,
                    },
                    span,
                ));
            }
            NodeKind::With { items, body } => {
                self.unsupported("with statement", span);
                for (item, _) in &items {
                    let _ = self.gen_expr(*item, ctx);
                }
                out.push(TsStmt::spanned(
                    TsStmtKind::Block(self.gen_block(&body, ctx)),
                    span,
                ));
            }
            NodeKind::Return { value } => {
                let value = value.map(|v| self.gen_expr(v, ctx));
                if let Some(fid) = ctx.function {
                    if let Some(ret) = self.symbols.get(fid).ret_type {
                        match &value {
                            Some((_, vty)) => self.unify_at(ret, *vty, span),
                            None => {
                                let void = self.ty_void;
                                self.unify_at(ret, void, span);
                            }
                        }
                    }
                }
                out.push(TsStmt::spanned(
                    TsStmtKind::Return(value.map(|(e, _)| e)),
                    span,
                ));
            }
            NodeKind::Raise { exc } => {
                let expr = match exc {
                    Some(e) => self.gen_expr(e, ctx).0,
                    None => TsExpr::new(crate::ir::TsExprKind::New {
                        callee: Box::new(TsExpr::ident("Error")),
                        args: vec![],
                    }),
                };
                out.push(TsStmt::spanned(TsStmtKind::Throw(expr), span));
            }
            NodeKind::Assign { targets, value } => {
                let (vexpr, vty) = self.gen_expr(value, ctx);
                for target in targets {
                    self.gen_assign_one(target, &vexpr, vty, span, ctx, out);
                }
            }
            NodeKind::AugAssign { target, op, value } => {
                self.gen_aug_assign(target, op, value, span, ctx, out);
            }
            NodeKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                self.gen_ann_assign(target, annotation, value, span, ctx, out);
            }
            NodeKind::ExprStmt { value } => {
                if self.inline_calls.contains_key(&value) {
                    let block = self.expand_inline(value, ctx);
                    out.push(TsStmt::spanned(TsStmtKind::Block(block), span));
                    return;
                }
                if let NodeKind::StringLit { value: text } = self.parsed.ast.kind(value) {
                    // bare string statement, kept as a comment
                    out.push(TsStmt::spanned(TsStmtKind::Comment(text.clone()), span));
                    return;
                }
                let (expr, _) = self.gen_expr(value, ctx);
                out.push(TsStmt::spanned(TsStmtKind::ExprStmt(expr), span));
            }
            NodeKind::Global { names } => {
                for name in &names {
                    if self.scopes.lookup_local(ctx.scope, name).is_some() {
                        self.error(
                            codes::SCOPE,
                            format!("name `{name}` is used before its global declaration"),
                            span,
                        );
                    }
                    self.scopes.declare_global(ctx.scope, name);
                }
            }
            NodeKind::Nonlocal { names } => {
                for name in &names {
                    if self.scopes.lookup_local(ctx.scope, name).is_some() {
                        self.error(
                            codes::SCOPE,
                            format!("name `{name}` is used before its nonlocal declaration"),
                            span,
                        );
                        continue;
                    }
                    if self.scopes.declare_nonlocal(ctx.scope, name).is_err() {
                        self.error(
                            codes::SCOPE,
                            format!("no binding for nonlocal `{name}` found"),
                            span,
                        );
                    }
                }
            }
            NodeKind::Import { .. } | NodeKind::ImportFrom { .. } => {
                // imports resolve against the API surface, nothing to emit
                out.push(TsStmt::spanned(
                    TsStmtKind::Comment(self.snippet(span).to_string()),
                    span,
                ));
            }
            NodeKind::Assert { test, msg } => {
                let (test, _) = self.gen_expr(test, ctx);
                let message = match msg {
                    Some(m) => self.gen_expr(m, ctx).0,
                    None => TsExpr::string("assertion failed"),
                };
                let negated = TsExpr::new(crate::ir::TsExprKind::Unary {
                    op: crate::ir::TsUnaryOp::Not,
                    operand: Box::new(test),
                });
                out.push(TsStmt::spanned(
                    TsStmtKind::If {
                        test: negated,
                        then: vec![TsStmt::new(TsStmtKind::Throw(message))],
                        els: vec![],
                    },
                    span,
                ));
            }
            NodeKind::Del { .. } => {
                self.unsupported("del statement", span);
                out.push(self.todo_marker("del statement", span));
            }
            NodeKind::Pass => {}
            NodeKind::Break => out.push(TsStmt::spanned(TsStmtKind::Break, span)),
            NodeKind::Continue => out.push(TsStmt::spanned(TsStmtKind::Continue, span)),
            NodeKind::Error => {
                out.push(TsStmt::spanned(
                    TsStmtKind::Raw("// TODO: statement could not be parsed".to_string()),
                    span,
                ));
            }
            _ => {
                // an expression node in statement position is a parser bug
                self.unsupported("statement", span);
                out.push(self.todo_marker("statement", span));
            }
        }
    }

    // ----- assignments -----

    fn gen_assign_one(
        &mut self,
        target: NodeId,
        value: &TsExpr,
        vty: crate::semantic::types::TypeId,
        span: Span,
        ctx: &mut Ctx,
        out: &mut Vec<TsStmt>,
    ) {
        let tkind = self.parsed.ast.kind(target).clone();
        match tkind {
            NodeKind::Name { id: name } => {
                let sid = self.declare_local(&name, ctx);
                self.node_symbols[target.index()] = Some(sid);
                let dt = self.declared_type_of(sid);
                self.unify_at(dt, vty, span);
                let tspan = self.parsed.ast.span(target);
                let first = self.note_assign(sid, tspan, ctx);
                let hoisted = self.symbols.get(sid).usage.hoisted;
                if first && !hoisted {
                    let ty = self.render_type(dt);
                    out.push(TsStmt::spanned(
                        TsStmtKind::Let {
                            name,
                            ty,
                            init: Some(value.clone()),
                        },
                        span,
                    ));
                } else {
                    out.push(TsStmt::spanned(
                        TsStmtKind::Assign {
                            target: TsExpr::ident(&name),
                            op: None,
                            value: value.clone(),
                        },
                        span,
                    ));
                }
            }
            NodeKind::Attribute { value: obj, attr } => {
                let target_expr = if self.is_self(obj, ctx) {
                    let class = ctx.class.expect("self outside class");
                    let field = self.declare_field(class, &attr);
                    self.node_symbols[target.index()] = Some(field);
                    let dt = self.declared_type_of(field);
                    self.unify_at(dt, vty, span);
                    TsExpr::member(TsExpr::ident("this"), &attr)
                } else {
                    let (oexpr, oty) = self.gen_expr(obj, ctx);
                    if let crate::semantic::types::TypeKind::Class(cls) = self.pool.kind(oty) {
                        if let Some(member) = self.symbols.member(cls, &attr) {
                            self.node_symbols[target.index()] = Some(member);
                            let dt = self.declared_type_of(member);
                            self.unify_at(dt, vty, span);
                        }
                    }
                    TsExpr::member(oexpr, &attr)
                };
                out.push(TsStmt::spanned(
                    TsStmtKind::Assign {
                        target: target_expr,
                        op: None,
                        value: value.clone(),
                    },
                    span,
                ));
            }
            NodeKind::Subscript { value: obj, index } => {
                let (oexpr, oty) = self.gen_expr(obj, ctx);
                let (iexpr, ity) = self.gen_expr(index, ctx);
                let number = self.ty_number;
                self.unify_at(ity, number, span);
                let elem = self.ensure_array(oty, span);
                self.unify_at(elem, vty, span);
                out.push(TsStmt::spanned(
                    TsStmtKind::Assign {
                        target: TsExpr::new(crate::ir::TsExprKind::Index {
                            obj: Box::new(oexpr),
                            index: Box::new(iexpr),
                        }),
                        op: None,
                        value: value.clone(),
                    },
                    span,
                ));
            }
            NodeKind::Tuple { .. } => {
                self.unsupported("destructuring assignment", span);
                out.push(self.todo_marker("destructuring assignment", span));
            }
            _ => {
                self.unsupported("assignment target", span);
                out.push(self.todo_marker("assignment target", span));
            }
        }
    }

    fn gen_aug_assign(
        &mut self,
        target: NodeId,
        op: crate::parser::BinOp,
        value: NodeId,
        span: Span,
        ctx: &mut Ctx,
        out: &mut Vec<TsStmt>,
    ) {
        use crate::parser::BinOp;
        let (texpr, tty) = self.gen_expr(target, ctx);
        let (vexpr, vty) = self.gen_expr(value, ctx);
        if matches!(self.parsed.ast.kind(target), NodeKind::Name { .. }) {
            if let Some(sid) = self.node_symbols[target.index()] {
                let tspan = self.parsed.ast.span(target);
                self.note_assign(sid, tspan, ctx);
            }
        }
        match op {
            BinOp::FloorDiv => {
                let call = TsExpr::call(
                    TsExpr::member(TsExpr::ident("Math"), "idiv"),
                    vec![texpr.clone(), vexpr],
                );
                let number = self.ty_number;
                self.unify_at(tty, number, span);
                self.unify_at(vty, number, span);
                out.push(TsStmt::spanned(
                    TsStmtKind::Assign {
                        target: texpr,
                        op: None,
                        value: call,
                    },
                    span,
                ));
            }
            BinOp::Pow => {
                let call = TsExpr::call(
                    TsExpr::member(TsExpr::ident("Math"), "pow"),
                    vec![texpr.clone(), vexpr],
                );
                let number = self.ty_number;
                self.unify_at(tty, number, span);
                self.unify_at(vty, number, span);
                out.push(TsStmt::spanned(
                    TsStmtKind::Assign {
                        target: texpr,
                        op: None,
                        value: call,
                    },
                    span,
                ));
            }
            _ => {
                if op == BinOp::Add {
                    // `+=` works for strings and numbers alike
                    self.unify_at(tty, vty, span);
                } else {
                    let number = self.ty_number;
                    self.unify_at(tty, number, span);
                    self.unify_at(vty, number, span);
                }
                let ts_op = match op {
                    BinOp::Add => crate::ir::TsBinOp::Add,
                    BinOp::Sub => crate::ir::TsBinOp::Sub,
                    BinOp::Mul => crate::ir::TsBinOp::Mul,
                    BinOp::Div => crate::ir::TsBinOp::Div,
                    BinOp::Mod => crate::ir::TsBinOp::Mod,
                    BinOp::BitAnd => crate::ir::TsBinOp::BitAnd,
                    BinOp::BitOr => crate::ir::TsBinOp::BitOr,
                    BinOp::BitXor => crate::ir::TsBinOp::BitXor,
                    BinOp::Shl => crate::ir::TsBinOp::Shl,
                    BinOp::Shr => crate::ir::TsBinOp::Shr,
                    BinOp::FloorDiv | BinOp::Pow => unreachable!(),
                    BinOp::MatMul => {
                        self.unsupported("matrix multiplication", span);
                        crate::ir::TsBinOp::Mul
                    }
                };
                out.push(TsStmt::spanned(
                    TsStmtKind::Assign {
                        target: texpr,
                        op: Some(ts_op),
                        value: vexpr,
                    },
                    span,
                ));
            }
        }
    }

    fn gen_ann_assign(
        &mut self,
        target: NodeId,
        annotation: NodeId,
        value: Option<NodeId>,
        span: Span,
        ctx: &mut Ctx,
        out: &mut Vec<TsStmt>,
    ) {
        let tkind = self.parsed.ast.kind(target).clone();
        let NodeKind::Name { id: name } = tkind else {
            self.unsupported("annotated assignment target", span);
            out.push(self.todo_marker("annotated assignment target", span));
            return;
        };
        let sid = self.declare_local(&name, ctx);
        self.node_symbols[target.index()] = Some(sid);
        let dt = self.declared_type_of(sid);
        // resolve the annotation once; the declared slot keeps the result
        if self.symbols.get(sid).usage.first_assign.is_none()
            && matches!(self.pool.kind(dt), crate::semantic::types::TypeKind::Any)
        {
            let ann = self.ann_type(annotation, ctx);
            self.unify_at(dt, ann, span);
        }
        let value = value.map(|v| {
            let (vexpr, vty) = self.gen_expr(v, ctx);
            self.unify_at(dt, vty, span);
            vexpr
        });
        let tspan = self.parsed.ast.span(target);
        let first = self.note_assign(sid, tspan, ctx);
        let hoisted = self.symbols.get(sid).usage.hoisted;
        if first && !hoisted {
            let ty = self.render_type(dt);
            out.push(TsStmt::spanned(TsStmtKind::Let { name, ty, init: value }, span));
        } else if let Some(value) = value {
            out.push(TsStmt::spanned(
                TsStmtKind::Assign {
                    target: TsExpr::ident(&name),
                    op: None,
                    value,
                },
                span,
            ));
        }
    }

    // ----- loops -----

    fn gen_for(
        &mut self,
        target: NodeId,
        iter: NodeId,
        body: &[NodeId],
        span: Span,
        ctx: &mut Ctx,
        out: &mut Vec<TsStmt>,
    ) {
        let NodeKind::Name { id: var } = self.parsed.ast.kind(target).clone() else {
            self.unsupported("loop target", span);
            out.push(self.todo_marker("loop target", span));
            return;
        };
        let sid = self.declare_local(&var, ctx);
        self.node_symbols[target.index()] = Some(sid);
        let var_ty = self.declared_type_of(sid);
        // the loop variable belongs to the surrounding block
        {
            let tspan = self.parsed.ast.span(target);
            let path = ctx.block_path.clone();
            let usage = &mut self.symbols.get_mut(sid).usage;
            usage.first_assign = Some(tspan);
            usage.assign_block_path = Some(path);
        }

        if let Some((args, _)) = self.range_call(iter) {
            let number = self.ty_number;
            self.unify_at(var_ty, number, span);
            let step_lit = match args.len() {
                3 => self.literal_number(args[2]),
                _ => Some("1".to_string()),
            };
            if let Some(step) = step_lit {
                let (init, limit) = match args.len() {
                    1 => (TsExpr::number("0"), self.gen_expr(args[0], ctx).0),
                    _ => (self.gen_expr(args[0], ctx).0, self.gen_expr(args[1], ctx).0),
                };
                if args.len() == 3 {
                    let _ = self.gen_expr(args[2], ctx);
                }
                let cmp = if step.starts_with('-') {
                    LoopCmp::Gt
                } else {
                    LoopCmp::Lt
                };
                let body = self.gen_block(body, ctx);
                out.push(TsStmt::spanned(
                    TsStmtKind::ForCounted {
                        var,
                        init,
                        cmp,
                        limit,
                        step: TsExpr::number(&step),
                        body,
                    },
                    span,
                ));
                return;
            }
        }
        // generic iteration
        let (iter_expr, iter_ty) = self.gen_expr(iter, ctx);
        let elem = self.ensure_array(iter_ty, span);
        self.unify_at(var_ty, elem, span);
        let body = self.gen_block(body, ctx);
        out.push(TsStmt::spanned(
            TsStmtKind::ForOf {
                var,
                iter: iter_expr,
                body,
            },
            span,
        ));
    }

    /// A direct `range(...)` call with 1-3 positional arguments.
    fn range_call(&self, iter: NodeId) -> Option<(Vec<NodeId>, Span)> {
        if let NodeKind::Call {
            func,
            args,
            keywords,
        } = self.parsed.ast.kind(iter)
        {
            if let NodeKind::Name { id } = self.parsed.ast.kind(*func) {
                if id == "range" && keywords.is_empty() && (1..=3).contains(&args.len()) {
                    return Some((args.clone(), self.parsed.ast.span(iter)));
                }
            }
        }
        None
    }

    /// The literal text of a numeric node, including a unary-minus prefix.
    pub(crate) fn literal_number(&self, id: NodeId) -> Option<String> {
        match self.parsed.ast.kind(id) {
            NodeKind::NumberLit { text, .. } => Some(text.clone()),
            NodeKind::UnaryExpr {
                op: crate::parser::UnaryOp::Neg,
                operand,
            } => match self.parsed.ast.kind(*operand) {
                NodeKind::NumberLit { text, .. } => Some(format!("-{text}")),
                _ => None,
            },
            _ => None,
        }
    }

    // ----- functions -----

    /// Declare (or re-find) a function/method symbol with its parameter and
    /// return types. Types are allocated once per run.
    pub(crate) fn declare_function(&mut self, id: NodeId, ctx: &Ctx) -> SymbolId {
        let NodeKind::FunctionDef {
            name,
            params,
            return_annotation,
            decorators,
            ..
        } = self.parsed.ast.kind(id).clone()
        else {
            unreachable!("declare_function on a non-def node");
        };
        let qname = self.qualify(&name, ctx);
        let sid = match self.symbols.by_qname(&qname) {
            Some(existing) => existing,
            None => {
                let mut is_static = false;
                let mut is_property = false;
                for &dec in &decorators {
                    match self.parsed.ast.kind(dec) {
                        NodeKind::Name { id } if id == "staticmethod" => is_static = true,
                        NodeKind::Name { id } if id == "property" => is_property = true,
                        NodeKind::Attribute { attr, .. } if attr == "setter" => is_property = true,
                        _ => {}
                    }
                }
                let kind = if is_property {
                    SymbolKind::Property
                } else if ctx.class.is_some() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let mut sym = Symbol::new(&qname, kind);
                sym.is_instance = ctx.class.is_some() && !is_static;
                sym.is_static = is_static;
                let mut ps = Vec::new();
                for p in &params {
                    if p.name == "self" && ctx.class.is_some() {
                        continue;
                    }
                    let ty = match p.annotation {
                        Some(a) => self.ann_type(a, ctx),
                        None => self.pool.fresh_any(),
                    };
                    ps.push(ParamSymbol {
                        name: p.name.clone(),
                        ty,
                        optional: p.default.is_some(),
                        default: p.default.and_then(|d| self.render_const(d)),
                    });
                }
                let ret = match return_annotation {
                    Some(a) => self.ann_type(a, ctx),
                    None => self.pool.fresh_any(),
                };
                sym.params = Some(ps);
                sym.ret_type = Some(ret);
                self.symbols.add(sym)
            }
        };
        self.scopes.define(ctx.scope, &name, sid);
        self.node_symbols[id.index()] = Some(sid);
        sid
    }

    fn gen_function(&mut self, id: NodeId, ctx: &mut Ctx) -> Vec<TsStmt> {
        let span = self.parsed.ast.span(id);
        let NodeKind::FunctionDef {
            name,
            params: _,
            return_annotation: _,
            body,
            decorators,
            doc,
        } = self.parsed.ast.kind(id).clone()
        else {
            unreachable!("gen_function on a non-def node");
        };
        let sid = self.declare_function(id, ctx);
        let in_ctor = ctx.class.is_some() && name == "__init__";
        let fscope = self.node_scope(id, ScopeKind::Function, ctx.scope);
        self.bind_params(sid, fscope, span);

        let mut accessor = None;
        let mut is_static = false;
        let mut comments = Vec::new();
        for &dec in &decorators {
            let dspan = self.parsed.ast.span(dec);
            match self.parsed.ast.kind(dec) {
                NodeKind::Name { id } if id == "property" => accessor = Some(Accessor::Get),
                NodeKind::Name { id } if id == "staticmethod" => is_static = true,
                NodeKind::Attribute { attr, .. } if attr == "setter" => {
                    accessor = Some(Accessor::Set)
                }
                _ => {
                    // unrecognized decorators survive as comments
                    comments.push(TsStmt::spanned(
                        TsStmtKind::Comment(format!("@{}", self.snippet(dspan))),
                        dspan,
                    ));
                }
            }
        }

        let mut inner = Ctx {
            scope: fscope,
            class: ctx.class,
            function: Some(sid),
            in_ctor,
            block_path: vec![0],
            block_counter: 0,
        };
        let body_stmts = self.gen_body(&body, &mut inner);

        if in_ctor {
            let class = ctx.class.expect("__init__ outside class");
            let has_base = !self.symbols.get(class).extends.is_empty();
            let first_ok = body.first().map(|&s| self.is_super_init(s)).unwrap_or(false);
            if has_base && !first_ok {
                let cls = self.symbols.get(class).qname.clone();
                self.error(
                    codes::SUPER_FIRST,
                    format!(
                        "constructor of `{cls}` must call super().__init__ as its first statement"
                    ),
                    span,
                );
            }
        }

        // a function with no return statement returns void
        if !self.subtree_returns(id) {
            if let Some(ret) = self.symbols.get(sid).ret_type {
                let void = self.ty_void;
                self.unify_at(ret, void, span);
            }
        }

        let psyms = self.symbols.get(sid).params.clone().unwrap_or_default();
        let ts_params: Vec<TsParam> = psyms
            .iter()
            .map(|p| TsParam {
                name: p.name.clone(),
                ty: self.render_type(p.ty),
                default: p.default.clone().map(TsExpr::raw),
            })
            .collect();

        let mut out = comments;
        if in_ctor {
            out.push(TsStmt::spanned(
                TsStmtKind::Constructor {
                    params: ts_params,
                    body: body_stmts,
                },
                span,
            ));
        } else {
            let ret = self
                .symbols
                .get(sid)
                .ret_type
                .and_then(|t| self.render_type(t));
            out.push(TsStmt::spanned(
                TsStmtKind::Function(TsFunction {
                    name,
                    params: ts_params,
                    ret,
                    body: body_stmts,
                    doc,
                    is_static,
                    accessor,
                }),
                span,
            ));
        }
        out
    }

    /// Define the function's parameters as locals of its body scope; they
    /// count as assigned at function entry.
    pub(crate) fn bind_params(
        &mut self,
        sid: SymbolId,
        fscope: crate::semantic::scope::ScopeId,
        span: Span,
    ) {
        let fq = self.symbols.get(sid).qname.clone();
        let psyms = self.symbols.get(sid).params.clone().unwrap_or_default();
        for p in &psyms {
            let pq = format!("{fq}.{}", p.name);
            let psid = match self.symbols.by_qname(&pq) {
                Some(existing) => existing,
                None => {
                    let mut sym = Symbol::new(&pq, SymbolKind::Variable);
                    sym.declared_type = Some(p.ty);
                    self.symbols.add(sym)
                }
            };
            self.scopes.define(fscope, &p.name, psid);
            self.sym_scopes.insert(psid, fscope);
            let usage = &mut self.symbols.get_mut(psid).usage;
            usage.first_assign = Some(span);
            usage.assign_block_path = Some(vec![0]);
        }
    }

    fn is_super_init(&self, stmt: NodeId) -> bool {
        let NodeKind::ExprStmt { value } = self.parsed.ast.kind(stmt) else {
            return false;
        };
        let NodeKind::Call { func, .. } = self.parsed.ast.kind(*value) else {
            return false;
        };
        let NodeKind::Attribute { value: obj, attr } = self.parsed.ast.kind(*func) else {
            return false;
        };
        if attr != "__init__" {
            return false;
        }
        let NodeKind::Call { func: inner, .. } = self.parsed.ast.kind(*obj) else {
            return false;
        };
        matches!(self.parsed.ast.kind(*inner), NodeKind::Name { id } if id == "super")
    }

    // ----- classes -----

    pub(crate) fn declare_class(&mut self, id: NodeId, ctx: &Ctx) -> SymbolId {
        let NodeKind::ClassDef { name, bases, .. } = self.parsed.ast.kind(id).clone() else {
            unreachable!("declare_class on a non-class node");
        };
        let qname = self.qualify(&name, ctx);
        let sid = match self.symbols.by_qname(&qname) {
            Some(existing) => existing,
            None => {
                let mut sym = Symbol::new(&qname, SymbolKind::Class);
                for &base in &bases {
                    let base_qname = match self.parsed.ast.kind(base).clone() {
                        NodeKind::Name { id: base_name } => {
                            let bsid = self.resolve_class_name(&base_name, ctx);
                            self.symbols.get(bsid).qname.clone()
                        }
                        _ => self.snippet(self.parsed.ast.span(base)).to_string(),
                    };
                    sym.extends.push(base_qname);
                }
                self.symbols.add(sym)
            }
        };
        self.scopes.define(ctx.scope, &name, sid);
        self.node_symbols[id.index()] = Some(sid);
        sid
    }

    fn gen_class(&mut self, id: NodeId, ctx: &mut Ctx, out: &mut Vec<TsStmt>) {
        let span = self.parsed.ast.span(id);
        let NodeKind::ClassDef {
            name,
            bases,
            body,
            decorators,
            doc,
        } = self.parsed.ast.kind(id).clone()
        else {
            unreachable!("gen_class on a non-class node");
        };
        let sid = self.declare_class(id, ctx);
        if bases.len() > 1 {
            self.unsupported("multiple inheritance", span);
        }
        for &dec in &decorators {
            let dspan = self.parsed.ast.span(dec);
            out.push(TsStmt::spanned(
                TsStmtKind::Comment(format!("@{}", self.snippet(dspan))),
                dspan,
            ));
        }
        let cscope = self.node_scope(id, ScopeKind::Class, ctx.scope);
        let mut cctx = Ctx {
            scope: cscope,
            class: Some(sid),
            function: None,
            in_ctor: false,
            block_path: vec![0],
            block_counter: 0,
        };
        // pre-declare members so methods can call each other
        for &m in &body {
            if matches!(self.parsed.ast.kind(m), NodeKind::FunctionDef { .. }) {
                self.declare_function(m, &cctx);
            }
        }
        self.synthesize_constructor(sid);

        let mut ctor = Vec::new();
        let mut methods = Vec::new();
        let mut statics = Vec::new();
        for &m in &body {
            let mspan = self.parsed.ast.span(m);
            match self.parsed.ast.kind(m).clone() {
                NodeKind::FunctionDef { name: mname, .. } => {
                    let stmts = self.gen_function(m, &mut cctx);
                    if mname == "__init__" {
                        ctor.extend(stmts);
                    } else {
                        methods.extend(stmts);
                    }
                }
                NodeKind::Assign { targets, value } if targets.len() == 1 => {
                    if let NodeKind::Name { id: attr } = self.parsed.ast.kind(targets[0]).clone() {
                        let (vexpr, vty) = self.gen_expr(value, &mut cctx);
                        let field = self.declare_field(sid, &attr);
                        let dt = self.declared_type_of(field);
                        self.unify_at(dt, vty, mspan);
                        let ty = self.render_type(dt);
                        statics.push(TsStmt::spanned(
                            TsStmtKind::Field {
                                name: attr,
                                ty,
                                init: Some(vexpr),
                            },
                            mspan,
                        ));
                    } else {
                        self.unsupported("class body statement", mspan);
                    }
                }
                NodeKind::AnnAssign {
                    target,
                    annotation,
                    value,
                } => {
                    if let NodeKind::Name { id: attr } = self.parsed.ast.kind(target).clone() {
                        let field = self.declare_field(sid, &attr);
                        let dt = self.declared_type_of(field);
                        if matches!(self.pool.kind(dt), crate::semantic::types::TypeKind::Any) {
                            let ann = self.ann_type(annotation, &cctx);
                            self.unify_at(dt, ann, mspan);
                        }
                        let init = value.map(|v| {
                            let (vexpr, vty) = self.gen_expr(v, &mut cctx);
                            self.unify_at(dt, vty, mspan);
                            vexpr
                        });
                        let ty = self.render_type(dt);
                        statics.push(TsStmt::spanned(
                            TsStmtKind::Field {
                                name: attr,
                                ty,
                                init,
                            },
                            mspan,
                        ));
                    } else {
                        self.unsupported("class body statement", mspan);
                    }
                }
                NodeKind::ExprStmt { value }
                    if matches!(self.parsed.ast.kind(value), NodeKind::StringLit { .. }) => {}
                NodeKind::Pass => {}
                _ => self.unsupported("class body statement", mspan),
            }
        }

        // instance fields discovered from `self.x` assignments, before the
        // constructor and methods
        let mut members = Vec::new();
        let field_ids = self.class_fields.get(&sid).cloned().unwrap_or_default();
        for fid in field_ids {
            let fname = self.symbols.get(fid).local_name().to_string();
            let dt = self.symbols.get(fid).declared_type;
            let ty = dt.and_then(|t| self.render_type(t));
            members.push(TsStmt::new(TsStmtKind::Field {
                name: fname,
                ty,
                init: None,
            }));
        }
        members.extend(statics);
        members.extend(ctor);
        members.extend(methods);

        let extends = self.symbols.get(sid).extends.first().cloned();
        out.push(TsStmt::spanned(
            TsStmtKind::Class {
                name,
                extends,
                members,
                doc,
            },
            span,
        ));
    }

    /// Register an instance field symbol `Class.attr` on first assignment.
    pub(crate) fn declare_field(&mut self, class: SymbolId, attr: &str) -> SymbolId {
        let qname = format!("{}.{}", self.symbols.get(class).qname, attr);
        if let Some(existing) = self.symbols.by_qname(&qname) {
            return existing;
        }
        let mut sym = Symbol::new(&qname, SymbolKind::Property);
        sym.is_instance = true;
        sym.declared_type = Some(self.pool.fresh_any());
        let sid = self.symbols.add(sym);
        self.class_fields.entry(class).or_default().push(sid);
        sid
    }

    /// A class without its own `__init__` adopts the nearest ancestor's
    /// constructor signature (or an empty one).
    fn synthesize_constructor(&mut self, class: SymbolId) {
        let qname = format!("{}.__init__", self.symbols.get(class).qname);
        if self.symbols.by_qname(&qname).is_some() {
            return;
        }
        let inherited = self
            .symbols
            .inherited_constructor(class)
            .map(|c| self.symbols.get(c).params.clone().unwrap_or_default());
        let mut sym = Symbol::new(&qname, SymbolKind::Method);
        sym.is_instance = true;
        sym.params = Some(inherited.unwrap_or_default());
        sym.ret_type = Some(self.ty_void);
        self.symbols.add(sym);
    }

    // ----- small helpers -----

    pub(crate) fn is_self(&self, id: NodeId, ctx: &Ctx) -> bool {
        ctx.class.is_some()
            && matches!(self.parsed.ast.kind(id), NodeKind::Name { id } if id == "self")
    }

    pub(crate) fn declared_type_of(&mut self, sid: SymbolId) -> crate::semantic::types::TypeId {
        if let Some(t) = self.symbols.get(sid).declared_type {
            return t;
        }
        let t = self.pool.fresh_any();
        self.symbols.get_mut(sid).declared_type = Some(t);
        t
    }

    pub(crate) fn snippet(&self, span: Span) -> &str {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
            .trim()
    }

    pub(crate) fn todo_marker(&self, what: &str, span: Span) -> TsStmt {
        TsStmt::spanned(
            TsStmtKind::Raw(format!("// TODO: unsupported {what}: {}", self.snippet(span))),
            span,
        )
    }

    pub(crate) fn render_const(&self, id: NodeId) -> Option<String> {
        match self.parsed.ast.kind(id) {
            NodeKind::NumberLit { text, .. } => Some(text.clone()),
            NodeKind::StringLit { value } => Some(format!("{value:?}")),
            NodeKind::BoolLit { value } => Some(if *value { "true" } else { "false" }.to_string()),
            NodeKind::NoneLit => Some("null".to_string()),
            NodeKind::UnaryExpr {
                op: crate::parser::UnaryOp::Neg,
                operand,
            } => match self.parsed.ast.kind(*operand) {
                NodeKind::NumberLit { text, .. } => Some(format!("-{text}")),
                _ => None,
            },
            _ => None,
        }
    }
}
