//! Expression generation rules
//!
//! [`Session::gen_expr`] returns the lowered expression together with the
//! node's type slot, so statement rules can constrain it further. Member
//! access dispatches on the object's inferred type: an attribute on a
//! string/array maps through the API surface's `str.*`/`list.*` entries, an
//! attribute on a class instance resolves against the symbol table.

use super::{Ctx, Session};
use crate::diagnostics::codes;
use crate::ir::{ArrowBody, TsBinOp, TsExpr, TsExprKind, TsUnaryOp};
use crate::parser::{BinOp, BoolOpKind, CmpOp, CompClause, CompKind, NodeId, NodeKind, UnaryOp};
use crate::semantic::scope::ScopeKind;
use crate::semantic::symbol::{Symbol, SymbolId, SymbolKind};
use crate::semantic::types::{TypeId, TypeKind};
use crate::span::Span;

impl Session<'_> {
    pub(crate) fn gen_expr(&mut self, id: NodeId, ctx: &mut Ctx) -> (TsExpr, TypeId) {
        let span = self.parsed.ast.span(id);
        let ty = self.node_type(id);
        let kind = self.parsed.ast.kind(id).clone();
        let mut expr = match kind {
            NodeKind::Name { id: name } => self.gen_name(id, &name, ty, span, ctx),
            NodeKind::NumberLit { text, .. } => {
                let number = self.ty_number;
                self.unify_at(ty, number, span);
                TsExpr::number(&text)
            }
            NodeKind::StringLit { value } => {
                let string = self.ty_string;
                self.unify_at(ty, string, span);
                TsExpr::string(&value)
            }
            NodeKind::BoolLit { value } => {
                let boolean = self.ty_boolean;
                self.unify_at(ty, boolean, span);
                TsExpr::bool(value)
            }
            NodeKind::NoneLit => {
                let null = self.ty_null;
                self.unify_at(ty, null, span);
                TsExpr::new(TsExprKind::Null)
            }
            NodeKind::FString { parts, exprs } => {
                let string = self.ty_string;
                self.unify_at(ty, string, span);
                let exprs = exprs.iter().map(|&e| self.gen_expr(e, ctx).0).collect();
                TsExpr::new(TsExprKind::TemplateLit { parts, exprs })
            }
            NodeKind::ListLit { elts } | NodeKind::Tuple { elts } => {
                let elem = self.ensure_array(ty, span);
                let mut out = Vec::with_capacity(elts.len());
                for &e in &elts {
                    let (expr, ety) = self.gen_expr(e, ctx);
                    self.unify_at(elem, ety, span);
                    out.push(expr);
                }
                TsExpr::new(TsExprKind::ArrayLit(out))
            }
            NodeKind::SetLit { elts } => {
                self.unsupported("set literal", span);
                let elem = self.ensure_array(ty, span);
                let mut out = Vec::with_capacity(elts.len());
                for &e in &elts {
                    let (expr, ety) = self.gen_expr(e, ctx);
                    self.unify_at(elem, ety, span);
                    out.push(expr);
                }
                TsExpr::new(TsExprKind::ArrayLit(out))
            }
            NodeKind::DictLit { keys, values } => {
                let mut fields = Vec::with_capacity(keys.len());
                let mut all_string = true;
                for (&k, &v) in keys.iter().zip(&values) {
                    let kkind = self.parsed.ast.kind(k).clone();
                    let (vexpr, _) = self.gen_expr(v, ctx);
                    match kkind {
                        NodeKind::StringLit { value: key } => fields.push((key, vexpr)),
                        _ => {
                            all_string = false;
                            let _ = self.gen_expr(k, ctx);
                        }
                    }
                }
                if !all_string {
                    self.unsupported("non-string dictionary key", span);
                }
                TsExpr::new(TsExprKind::ObjectLit(fields))
            }
            NodeKind::BinExpr { op, left, right } => {
                self.gen_binary(op, left, right, ty, span, ctx)
            }
            NodeKind::BoolExpr { op, values } => {
                let ts_op = match op {
                    BoolOpKind::And => TsBinOp::And,
                    BoolOpKind::Or => TsBinOp::Or,
                };
                let mut acc: Option<(TsExpr, TypeId)> = None;
                for &v in &values {
                    let (expr, vty) = self.gen_expr(v, ctx);
                    acc = Some(match acc {
                        None => (expr, vty),
                        Some((prev, pty)) => {
                            // `a or b` keeps an operand, so the operands share
                            // a type rather than collapsing to boolean
                            self.unify_at(pty, vty, span);
                            (TsExpr::binary(ts_op, prev, expr), pty)
                        }
                    });
                }
                match acc {
                    Some((expr, vty)) => {
                        self.unify_at(ty, vty, span);
                        expr
                    }
                    None => TsExpr::bool(true),
                }
            }
            NodeKind::UnaryExpr { op, operand } => {
                let (oexpr, oty) = self.gen_expr(operand, ctx);
                let ts_op = match op {
                    UnaryOp::Not => {
                        let boolean = self.ty_boolean;
                        self.unify_at(ty, boolean, span);
                        TsUnaryOp::Not
                    }
                    UnaryOp::Neg | UnaryOp::Pos | UnaryOp::Invert => {
                        let number = self.ty_number;
                        self.unify_at(oty, number, span);
                        self.unify_at(ty, number, span);
                        match op {
                            UnaryOp::Neg => TsUnaryOp::Neg,
                            UnaryOp::Pos => TsUnaryOp::Plus,
                            _ => TsUnaryOp::BitNot,
                        }
                    }
                };
                TsExpr::new(TsExprKind::Unary {
                    op: ts_op,
                    operand: Box::new(oexpr),
                })
            }
            NodeKind::Compare {
                left,
                ops,
                comparators,
            } => {
                let boolean = self.ty_boolean;
                self.unify_at(ty, boolean, span);
                self.gen_compare(left, &ops, &comparators, span, ctx)
            }
            NodeKind::Call { .. } => return self.gen_call(id, ty, span, ctx),
            NodeKind::Attribute { value, attr } => {
                self.gen_attribute(id, value, &attr, ty, span, ctx)
            }
            NodeKind::Subscript { value, index } => {
                self.gen_subscript(value, index, ty, span, ctx)
            }
            NodeKind::IfExp { test, body, orelse } => {
                let (test, _) = self.gen_expr(test, ctx);
                let (cons, cty) = self.gen_expr(body, ctx);
                let (alt, aty) = self.gen_expr(orelse, ctx);
                self.unify_at(cty, aty, span);
                self.unify_at(ty, cty, span);
                TsExpr::new(TsExprKind::Conditional {
                    test: Box::new(test),
                    cons: Box::new(cons),
                    alt: Box::new(alt),
                })
            }
            NodeKind::Lambda { params, body } => {
                let lscope = self.node_scope(id, ScopeKind::Function, ctx.scope);
                let names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
                for p in &params {
                    let qname = format!("<lambda{}>.{}", id.0, p.name);
                    let psid = match self.symbols.by_qname(&qname) {
                        Some(existing) => existing,
                        None => {
                            let mut sym = Symbol::new(&qname, SymbolKind::Variable);
                            sym.declared_type = Some(self.pool.fresh_any());
                            self.symbols.add(sym)
                        }
                    };
                    self.scopes.define(lscope, &p.name, psid);
                    self.sym_scopes.insert(psid, lscope);
                    let usage = &mut self.symbols.get_mut(psid).usage;
                    usage.first_assign = Some(p.span);
                    usage.assign_block_path = Some(vec![0]);
                }
                let mut inner = Ctx {
                    scope: lscope,
                    class: ctx.class,
                    function: ctx.function,
                    in_ctor: false,
                    block_path: vec![0],
                    block_counter: 0,
                };
                let (bexpr, _) = self.gen_expr(body, &mut inner);
                TsExpr::new(TsExprKind::Arrow {
                    params: names,
                    body: ArrowBody::Expr(Box::new(bexpr)),
                })
            }
            NodeKind::Comp {
                kind: CompKind::List,
                elt,
                generators,
            } if generators.len() == 1
                && matches!(
                    self.parsed.ast.kind(generators[0].target),
                    NodeKind::Name { .. }
                ) =>
            {
                self.gen_list_comp(id, elt, &generators[0], ty, span, ctx)
            }
            NodeKind::Comp { .. } | NodeKind::DictComp { .. } | NodeKind::Starred { .. } => {
                self.unsupported("comprehension form", span);
                TsExpr::raw(self.snippet(span).to_string())
            }
            NodeKind::SliceExpr { .. } => {
                self.unsupported("slice outside a subscript", span);
                TsExpr::raw(self.snippet(span).to_string())
            }
            NodeKind::Error => TsExpr::raw("/* unparsed */".to_string()),
            _ => {
                // a statement node in expression position is a parser bug
                self.unsupported("expression", span);
                TsExpr::raw(self.snippet(span).to_string())
            }
        };
        if expr.py_span.is_none() {
            expr.py_span = Some(span);
        }
        (expr, ty)
    }

    /// Scope lookup first, then the API surface by Python-side name.
    pub(crate) fn resolve_name(&mut self, name: &str, ctx: &Ctx) -> Option<SymbolId> {
        if let Some(sid) = self.scopes.lookup(ctx.scope, name) {
            return Some(sid);
        }
        let surface = self.surface.clone();
        self.binder
            .bind_py(&surface, name, &mut self.pool, &mut self.symbols)
    }

    fn gen_name(
        &mut self,
        id: NodeId,
        name: &str,
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        if name == "self" {
            if let Some(cls) = ctx.class {
                let t = self.class_type(cls);
                self.unify_at(ty, t, span);
                return TsExpr::ident("this");
            }
        }
        match self.resolve_name(name, ctx) {
            Some(sid) => {
                self.node_symbols[id.index()] = Some(sid);
                let (sym_kind, external, qname) = {
                    let sym = self.symbols.get(sid);
                    (sym.kind, sym.is_external, sym.qname.clone())
                };
                match sym_kind {
                    SymbolKind::Variable | SymbolKind::Property | SymbolKind::EnumMember => {
                        self.note_read(sid, span, ctx);
                        let dt = self.declared_type_of(sid);
                        self.unify_at(ty, dt, span);
                    }
                    SymbolKind::Module => {
                        let t = self.module_type(sid);
                        self.unify_at(ty, t, span);
                    }
                    _ => {}
                }
                if external {
                    TsExpr::ident(&qname)
                } else {
                    TsExpr::ident(name)
                }
            }
            None => {
                self.error(
                    codes::UNDEFINED_NAME,
                    format!("name `{name}` is not defined"),
                    span,
                );
                TsExpr::ident(name)
            }
        }
    }

    fn gen_binary(
        &mut self,
        op: BinOp,
        left: NodeId,
        right: NodeId,
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        if op == BinOp::Mod {
            if let NodeKind::StringLit { value: fmt } = self.parsed.ast.kind(left).clone() {
                return self.gen_percent_format(&fmt, right, ty, span, ctx);
            }
        }
        let (lexpr, lty) = self.gen_expr(left, ctx);
        let (rexpr, rty) = self.gen_expr(right, ctx);
        match op {
            BinOp::Add => {
                // works for numbers and string concatenation alike
                self.unify_at(lty, rty, span);
                self.unify_at(ty, lty, span);
                TsExpr::binary(TsBinOp::Add, lexpr, rexpr)
            }
            BinOp::FloorDiv => {
                self.numeric_operands(lty, rty, ty, span);
                TsExpr::call(
                    TsExpr::member(TsExpr::ident("Math"), "idiv"),
                    vec![lexpr, rexpr],
                )
            }
            BinOp::Pow => {
                self.numeric_operands(lty, rty, ty, span);
                TsExpr::call(
                    TsExpr::member(TsExpr::ident("Math"), "pow"),
                    vec![lexpr, rexpr],
                )
            }
            BinOp::MatMul => {
                self.unsupported("matrix multiplication", span);
                TsExpr::binary(TsBinOp::Mul, lexpr, rexpr)
            }
            _ => {
                self.numeric_operands(lty, rty, ty, span);
                let ts_op = match op {
                    BinOp::Sub => TsBinOp::Sub,
                    BinOp::Mul => TsBinOp::Mul,
                    BinOp::Div => TsBinOp::Div,
                    BinOp::Mod => TsBinOp::Mod,
                    BinOp::BitAnd => TsBinOp::BitAnd,
                    BinOp::BitOr => TsBinOp::BitOr,
                    BinOp::BitXor => TsBinOp::BitXor,
                    BinOp::Shl => TsBinOp::Shl,
                    BinOp::Shr => TsBinOp::Shr,
                    _ => unreachable!("handled above"),
                };
                TsExpr::binary(ts_op, lexpr, rexpr)
            }
        }
    }

    fn numeric_operands(&mut self, lty: TypeId, rty: TypeId, ty: TypeId, span: Span) {
        let number = self.ty_number;
        self.unify_at(lty, number, span);
        self.unify_at(rty, number, span);
        self.unify_at(ty, number, span);
    }

    /// `"x=%d" % v` and friends become template literals.
    fn gen_percent_format(
        &mut self,
        fmt: &str,
        right: NodeId,
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        let string = self.ty_string;
        self.unify_at(ty, string, span);
        let args: Vec<TsExpr> = match self.parsed.ast.kind(right).clone() {
            NodeKind::Tuple { elts } => elts.iter().map(|&e| self.gen_expr(e, ctx).0).collect(),
            _ => vec![self.gen_expr(right, ctx).0],
        };
        let mut parts = vec![String::new()];
        let mut slots = 0usize;
        let mut chars = fmt.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                parts.last_mut().unwrap().push(c);
                continue;
            }
            match chars.next() {
                Some('%') => parts.last_mut().unwrap().push('%'),
                Some('s') | Some('d') | Some('f') => {
                    slots += 1;
                    parts.push(String::new());
                }
                _ => {
                    self.unsupported("string format specifier", span);
                    return TsExpr::raw(self.snippet(span).to_string());
                }
            }
        }
        if slots != args.len() {
            self.unsupported("format argument count", span);
            return TsExpr::raw(self.snippet(span).to_string());
        }
        TsExpr::new(TsExprKind::TemplateLit { parts, exprs: args })
    }

    fn gen_compare(
        &mut self,
        left: NodeId,
        ops: &[CmpOp],
        comparators: &[NodeId],
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        let mut operands = vec![self.gen_expr(left, ctx)];
        for &c in comparators {
            operands.push(self.gen_expr(c, ctx));
        }
        let mut result: Option<TsExpr> = None;
        for (i, &op) in ops.iter().enumerate() {
            let (lexpr, lty) = operands[i].clone();
            let (rexpr, rty) = operands[i + 1].clone();
            let pair = self.cmp_pair(op, lexpr, lty, rexpr, rty, span);
            result = Some(match result {
                None => pair,
                // a chained comparison is the conjunction of its links
                Some(acc) => TsExpr::binary(TsBinOp::And, acc, pair),
            });
        }
        result.unwrap_or_else(|| TsExpr::bool(true))
    }

    fn cmp_pair(
        &mut self,
        op: CmpOp,
        lexpr: TsExpr,
        lty: TypeId,
        rexpr: TsExpr,
        rty: TypeId,
        span: Span,
    ) -> TsExpr {
        match op {
            CmpOp::Eq | CmpOp::Is => TsExpr::binary(TsBinOp::Eq, lexpr, rexpr),
            CmpOp::NotEq | CmpOp::IsNot => TsExpr::binary(TsBinOp::NotEq, lexpr, rexpr),
            CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => {
                self.unify_at(lty, rty, span);
                let ts_op = match op {
                    CmpOp::Lt => TsBinOp::Lt,
                    CmpOp::LtE => TsBinOp::LtEq,
                    CmpOp::Gt => TsBinOp::Gt,
                    _ => TsBinOp::GtEq,
                };
                TsExpr::binary(ts_op, lexpr, rexpr)
            }
            CmpOp::In | CmpOp::NotIn => {
                match self.pool.kind(rty) {
                    TypeKind::String => {
                        let string = self.ty_string;
                        self.unify_at(lty, string, span);
                    }
                    _ => {
                        let elem = self.ensure_array(rty, span);
                        self.unify_at(elem, lty, span);
                    }
                }
                let probe = TsExpr::call(TsExpr::member(rexpr, "indexOf"), vec![lexpr]);
                let ts_op = if op == CmpOp::In {
                    TsBinOp::GtEq
                } else {
                    TsBinOp::Lt
                };
                TsExpr::binary(ts_op, probe, TsExpr::number("0"))
            }
        }
    }

    fn gen_attribute(
        &mut self,
        id: NodeId,
        obj: NodeId,
        attr: &str,
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        let (oexpr, oty) = self.gen_expr(obj, ctx);
        let okind = self.pool.kind(oty);
        let resolved = match &okind {
            TypeKind::Class(owner) | TypeKind::Module(owner) => self.bind_member(*owner, attr),
            TypeKind::String => {
                let surface = self.surface.clone();
                self.binder.bind_py(
                    &surface,
                    &format!("str.{attr}"),
                    &mut self.pool,
                    &mut self.symbols,
                )
            }
            TypeKind::Array(_) => {
                let surface = self.surface.clone();
                self.binder.bind_py(
                    &surface,
                    &format!("list.{attr}"),
                    &mut self.pool,
                    &mut self.symbols,
                )
            }
            _ => None,
        };
        if let Some(sid) = resolved {
            self.node_symbols[id.index()] = Some(sid);
            if let Some(t) = self.symbol_value_type(sid) {
                self.unify_at(ty, t, span);
            }
            let local = self.symbols.get(sid).local_name().to_string();
            return TsExpr::member(oexpr, &local);
        }
        match okind {
            TypeKind::Class(cls) if !self.symbols.get(cls).is_external => {
                // a later assignment may introduce this field; give it a slot
                // now so the fixpoint converges on a single symbol
                let field = self.declare_field(cls, attr);
                self.node_symbols[id.index()] = Some(field);
                let dt = self.declared_type_of(field);
                self.unify_at(ty, dt, span);
            }
            TypeKind::Class(cls) | TypeKind::Module(cls) => {
                let owner = self.symbols.get(cls).qname.clone();
                self.error(
                    codes::UNDEFINED_NAME,
                    format!("`{owner}` has no member `{attr}`"),
                    span,
                );
            }
            TypeKind::String | TypeKind::Array(_) => {
                self.error(
                    codes::UNDEFINED_NAME,
                    format!("no mapping for method `{attr}` on this type"),
                    span,
                );
            }
            // an undetermined object type may firm up in a later pass
            _ => {}
        }
        TsExpr::member(oexpr, attr)
    }

    /// Member lookup on a class/module symbol, walking the `extends` chain and
    /// binding lazily from the API surface by both naming schemes.
    pub(crate) fn bind_member(&mut self, owner: SymbolId, attr: &str) -> Option<SymbolId> {
        if let Some(found) = self.symbols.member(owner, attr) {
            return Some(found);
        }
        let surface = self.surface.clone();
        let mut current = Some(owner);
        let mut hops = 0usize;
        while let Some(cls) = current {
            let (qname, py_qname, base) = {
                let sym = self.symbols.get(cls);
                (
                    format!("{}.{}", sym.qname, attr),
                    format!("{}.{}", sym.py_qname, attr),
                    sym.extends.first().cloned(),
                )
            };
            if let Some(found) =
                self.binder
                    .bind_py(&surface, &py_qname, &mut self.pool, &mut self.symbols)
            {
                return Some(found);
            }
            if let Some(found) =
                self.binder
                    .bind(&surface, &qname, &mut self.pool, &mut self.symbols)
            {
                return Some(found);
            }
            current = base.and_then(|b| self.symbols.by_qname(&b));
            hops += 1;
            if hops > self.symbols.len() {
                break;
            }
        }
        None
    }

    /// The type a symbol contributes when read as a value.
    pub(crate) fn symbol_value_type(&mut self, sid: SymbolId) -> Option<TypeId> {
        let sym = self.symbols.get(sid);
        match sym.kind {
            SymbolKind::Variable | SymbolKind::Property | SymbolKind::EnumMember => {
                sym.declared_type.or(sym.ret_type)
            }
            _ => None,
        }
    }

    fn gen_subscript(
        &mut self,
        value: NodeId,
        index: NodeId,
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        if let NodeKind::SliceExpr { lower, upper, step } = self.parsed.ast.kind(index).clone() {
            let (oexpr, oty) = self.gen_expr(value, ctx);
            if step.is_some() {
                self.unsupported("slice step", span);
            }
            let number = self.ty_number;
            let mut args = Vec::new();
            let start = match lower {
                Some(l) => {
                    let (expr, lt) = self.gen_expr(l, ctx);
                    self.unify_at(lt, number, span);
                    expr
                }
                None => TsExpr::number("0"),
            };
            args.push(start);
            if let Some(u) = upper {
                let (expr, ut) = self.gen_expr(u, ctx);
                self.unify_at(ut, number, span);
                args.push(expr);
            }
            // slicing preserves the container type
            self.unify_at(ty, oty, span);
            return TsExpr::call(TsExpr::member(oexpr, "slice"), args);
        }
        let (oexpr, oty) = self.gen_expr(value, ctx);
        let (iexpr, ity) = self.gen_expr(index, ctx);
        let number = self.ty_number;
        self.unify_at(ity, number, span);
        if matches!(self.pool.kind(oty), TypeKind::String) {
            let string = self.ty_string;
            self.unify_at(ty, string, span);
            return TsExpr::call(TsExpr::member(oexpr, "charAt"), vec![iexpr]);
        }
        let elem = self.ensure_array(oty, span);
        self.unify_at(ty, elem, span);
        TsExpr::new(TsExprKind::Index {
            obj: Box::new(oexpr),
            index: Box::new(iexpr),
        })
    }

    /// `[f(x) for x in xs if cond]` becomes `xs.filter(...).map(...)`.
    fn gen_list_comp(
        &mut self,
        id: NodeId,
        elt: NodeId,
        clause: &CompClause,
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        let NodeKind::Name { id: var } = self.parsed.ast.kind(clause.target).clone() else {
            unreachable!("guarded by the caller");
        };
        let (iter_expr, iter_ty) = self.gen_expr(clause.iter, ctx);
        let elem = self.ensure_array(iter_ty, span);
        let cscope = self.node_scope(id, ScopeKind::Function, ctx.scope);
        let qname = format!("<comp{}>.{var}", id.0);
        let vsid = match self.symbols.by_qname(&qname) {
            Some(existing) => existing,
            None => {
                let mut sym = Symbol::new(&qname, SymbolKind::Variable);
                sym.declared_type = Some(self.pool.fresh_any());
                self.symbols.add(sym)
            }
        };
        self.scopes.define(cscope, &var, vsid);
        self.sym_scopes.insert(vsid, cscope);
        {
            let tspan = self.parsed.ast.span(clause.target);
            let usage = &mut self.symbols.get_mut(vsid).usage;
            usage.first_assign = Some(tspan);
            usage.assign_block_path = Some(vec![0]);
        }
        let dt = self.declared_type_of(vsid);
        self.unify_at(dt, elem, span);
        self.node_symbols[clause.target.index()] = Some(vsid);

        let mut inner = Ctx {
            scope: cscope,
            class: ctx.class,
            function: ctx.function,
            in_ctor: false,
            block_path: vec![0],
            block_counter: 0,
        };
        let mut source = iter_expr;
        let mut condition: Option<TsExpr> = None;
        for &c in &clause.conditions {
            let (cexpr, _) = self.gen_expr(c, &mut inner);
            condition = Some(match condition {
                None => cexpr,
                Some(acc) => TsExpr::binary(TsBinOp::And, acc, cexpr),
            });
        }
        if let Some(cond) = condition {
            source = TsExpr::call(
                TsExpr::member(source, "filter"),
                vec![TsExpr::new(TsExprKind::Arrow {
                    params: vec![var.clone()],
                    body: ArrowBody::Expr(Box::new(cond)),
                })],
            );
        }
        let (eexpr, ety) = self.gen_expr(elt, &mut inner);
        let out_elem = self.ensure_array(ty, span);
        self.unify_at(out_elem, ety, span);
        TsExpr::call(
            TsExpr::member(source, "map"),
            vec![TsExpr::new(TsExprKind::Arrow {
                params: vec![var],
                body: ArrowBody::Expr(Box::new(eexpr)),
            })],
        )
    }
}
