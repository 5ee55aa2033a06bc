//! Call generation rules
//!
//! Calls against a known signature map keyword arguments to positional slots,
//! check arity, and narrow each argument against its declared parameter type.
//! Narrowing skips parameters whose declared type is still free: those are
//! shared across every caller of an external signature, and unifying them
//! with one caller's argument would leak that choice into all the others.
//!
//! Entries carrying an override template are expanded from pre-rendered
//! argument texts instead of emitting a plain call.

use super::{Ctx, Session};
use crate::diagnostics::codes;
use crate::ir::{self, TsExpr, TsExprKind, TsStmt, TsStmtKind};
use crate::parser::{NodeId, NodeKind};
use crate::semantic::scope::ScopeKind;
use crate::semantic::symbol::{ParamSymbol, SymbolId, SymbolKind};
use crate::semantic::types::{TypeId, TypeKind};
use crate::span::Span;

impl Session<'_> {
    pub(crate) fn gen_call(
        &mut self,
        id: NodeId,
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> (TsExpr, TypeId) {
        let NodeKind::Call {
            func,
            args,
            keywords,
        } = self.parsed.ast.kind(id).clone()
        else {
            unreachable!("gen_call on a non-call node");
        };
        if let Some(expr) = self.gen_super_call(func, &args, span, ctx) {
            return (expr, ty);
        }
        let (callee, _) = self.gen_expr(func, ctx);
        let sym = self.node_symbols[func.index()];
        let mut expr = if let Some(sid) = sym {
            let sym_kind = self.symbols.get(sid).kind;
            match sym_kind {
                SymbolKind::Class | SymbolKind::Interface => {
                    self.gen_new(sid, callee, &args, &keywords, ty, span, ctx)
                }
                _ if self.symbols.get(sid).params.is_some() => {
                    self.gen_known_call(sid, callee, &args, &keywords, ty, span, ctx)
                }
                _ => self.gen_plain_call(callee, &args, &keywords, span, ctx),
            }
        } else {
            self.gen_plain_call(callee, &args, &keywords, span, ctx)
        };
        if expr.py_span.is_none() {
            expr.py_span = Some(span);
        }
        (expr, ty)
    }

    /// `super().__init__(...)` becomes `super(...)`; any other
    /// `super().method(...)` becomes `super.method(...)`.
    fn gen_super_call(
        &mut self,
        func: NodeId,
        args: &[NodeId],
        span: Span,
        ctx: &mut Ctx,
    ) -> Option<TsExpr> {
        let NodeKind::Attribute { value: obj, attr } = self.parsed.ast.kind(func).clone() else {
            return None;
        };
        let NodeKind::Call {
            func: inner,
            args: inner_args,
            ..
        } = self.parsed.ast.kind(obj).clone()
        else {
            return None;
        };
        if !matches!(self.parsed.ast.kind(inner), NodeKind::Name { id } if id == "super") {
            return None;
        }
        if !inner_args.is_empty() {
            self.unsupported("super() with arguments", span);
        }
        if ctx.class.is_none() {
            self.error(
                codes::SCOPE,
                "super() outside a class body".to_string(),
                span,
            );
        }
        let call_args: Vec<TsExpr> = args.iter().map(|&a| self.gen_expr(a, ctx).0).collect();
        let mut expr = if attr == "__init__" {
            TsExpr::call(TsExpr::ident("super"), call_args)
        } else {
            TsExpr::call(TsExpr::member(TsExpr::ident("super"), &attr), call_args)
        };
        expr.py_span = Some(span);
        Some(expr)
    }

    fn gen_plain_call(
        &mut self,
        callee: TsExpr,
        args: &[NodeId],
        keywords: &[(String, NodeId)],
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        let call_args: Vec<TsExpr> = args.iter().map(|&a| self.gen_expr(a, ctx).0).collect();
        if !keywords.is_empty() {
            self.unsupported("keyword arguments for a function without a known signature", span);
            for (_, v) in keywords {
                let _ = self.gen_expr(*v, ctx);
            }
        }
        TsExpr::call(callee, call_args)
    }

    fn gen_known_call(
        &mut self,
        sid: SymbolId,
        callee: TsExpr,
        args: &[NodeId],
        keywords: &[(String, NodeId)],
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        let (params, ret, external, template) = {
            let sym = self.symbols.get(sid);
            (
                sym.params.clone().unwrap_or_default(),
                sym.ret_type,
                sym.is_external,
                sym.ts_override.clone(),
            )
        };
        let slots = self.map_arguments(&params, args, keywords, span, ctx);
        self.narrow_slots(&params, &slots, external, span);
        if let Some(ret) = ret {
            let rk = self.pool.kind(ret);
            // an external signature's free return type is shared state; it
            // must not be pinned by one call site
            if !(external && matches!(rk, TypeKind::Any | TypeKind::GenericParam(_))) {
                self.unify_at(ty, ret, span);
            }
        }
        if let Some(template) = template {
            let rendered = self.render_slots(&params, &slots);
            return TsExpr::raw(template.expand(&rendered));
        }
        TsExpr::call(callee, self.build_call_args(&params, slots))
    }

    fn gen_new(
        &mut self,
        cls: SymbolId,
        callee: TsExpr,
        args: &[NodeId],
        keywords: &[(String, NodeId)],
        ty: TypeId,
        span: Span,
        ctx: &mut Ctx,
    ) -> TsExpr {
        let ctor = {
            let qname = format!("{}.__init__", self.symbols.get(cls).qname);
            self.symbols
                .by_qname(&qname)
                .or_else(|| self.symbols.inherited_constructor(cls))
        };
        let params = match ctor {
            Some(c) => self.symbols.get(c).params.clone().unwrap_or_default(),
            // external classes carry constructor parameters on the class entry
            None => self.symbols.get(cls).params.clone().unwrap_or_default(),
        };
        let external = self.symbols.get(cls).is_external;
        let slots = self.map_arguments(&params, args, keywords, span, ctx);
        self.narrow_slots(&params, &slots, external, span);
        let inst = self.class_type(cls);
        self.unify_at(ty, inst, span);
        TsExpr::new(TsExprKind::New {
            callee: Box::new(callee),
            args: self.build_call_args(&params, slots),
        })
    }

    /// Place positional and keyword arguments into parameter slots, reporting
    /// arity problems without aborting.
    fn map_arguments(
        &mut self,
        params: &[ParamSymbol],
        args: &[NodeId],
        keywords: &[(String, NodeId)],
        span: Span,
        ctx: &mut Ctx,
    ) -> Vec<Option<(TsExpr, TypeId)>> {
        let mut slots: Vec<Option<(TsExpr, TypeId)>> = vec![None; params.len()];
        if args.len() > params.len() {
            self.error(
                codes::ARITY,
                format!(
                    "expected at most {} arguments, got {}",
                    params.len(),
                    args.len()
                ),
                span,
            );
        }
        for (i, &a) in args.iter().enumerate() {
            let value = self.gen_expr(a, ctx);
            if i < slots.len() {
                slots[i] = Some(value);
            }
        }
        for (name, v) in keywords {
            let value = self.gen_expr(*v, ctx);
            match params.iter().position(|p| &p.name == name) {
                Some(i) if slots[i].is_none() => slots[i] = Some(value),
                Some(_) => self.error(
                    codes::ARITY,
                    format!("argument `{name}` given more than once"),
                    span,
                ),
                None => self.error(
                    codes::ARITY,
                    format!("unknown argument `{name}`"),
                    span,
                ),
            }
        }
        for (i, p) in params.iter().enumerate() {
            if slots[i].is_none() && !p.optional && p.default.is_none() {
                self.error(
                    codes::ARITY,
                    format!("missing argument `{}`", p.name),
                    span,
                );
            }
        }
        slots
    }

    fn narrow_slots(
        &mut self,
        params: &[ParamSymbol],
        slots: &[Option<(TsExpr, TypeId)>],
        external: bool,
        span: Span,
    ) {
        for (slot, p) in slots.iter().zip(params) {
            let Some((_, aty)) = slot else { continue };
            let pk = self.pool.kind(p.ty);
            if matches!(pk, TypeKind::Any | TypeKind::GenericParam(_)) {
                // an external signature's free parameter type is shared state;
                // an internal one co-infers with its call sites
                if !external {
                    self.unify_at(p.ty, *aty, span);
                }
                continue;
            }
            if let Err(m) = self.pool.narrow(*aty, p.ty, &self.symbols) {
                let expected = self.pool.render(m.expected, &self.symbols);
                let actual = self.pool.render(m.actual, &self.symbols);
                self.error(
                    codes::TYPE_MISMATCH,
                    format!("type mismatch: {actual} is not compatible with {expected}"),
                    span,
                );
            }
        }
    }

    /// Argument texts for override expansion: provided slots render, gaps take
    /// the declared default.
    fn render_slots(
        &self,
        params: &[ParamSymbol],
        slots: &[Option<(TsExpr, TypeId)>],
    ) -> Vec<String> {
        let last = match slots.iter().rposition(|s| s.is_some()) {
            Some(i) => i + 1,
            None => 0,
        };
        (0..last)
            .map(|i| match &slots[i] {
                Some((expr, _)) => ir::render_expr(expr),
                None => params[i]
                    .default
                    .clone()
                    .unwrap_or_else(|| "null".to_string()),
            })
            .collect()
    }

    /// Argument expressions for a plain call, filling interior gaps with the
    /// declared defaults and dropping trailing omitted optionals.
    fn build_call_args(
        &self,
        params: &[ParamSymbol],
        slots: Vec<Option<(TsExpr, TypeId)>>,
    ) -> Vec<TsExpr> {
        let last = match slots.iter().rposition(|s| s.is_some()) {
            Some(i) => i + 1,
            None => 0,
        };
        slots
            .into_iter()
            .take(last)
            .enumerate()
            .map(|(i, slot)| match slot {
                Some((expr, _)) => expr,
                None => TsExpr::raw(
                    params
                        .get(i)
                        .and_then(|p| p.default.clone())
                        .unwrap_or_else(|| "null".to_string()),
                ),
            })
            .collect()
    }

    /// Expand a single-call-site helper at its call: parameter bindings as
    /// `let` statements, then the helper body, inside one block.
    pub(crate) fn expand_inline(&mut self, call: NodeId, ctx: &mut Ctx) -> Vec<TsStmt> {
        let def = self.inline_calls[&call];
        let span = self.parsed.ast.span(call);
        let NodeKind::Call { args, .. } = self.parsed.ast.kind(call).clone() else {
            unreachable!("inline expansion of a non-call node");
        };
        let NodeKind::FunctionDef { body, .. } = self.parsed.ast.kind(def).clone() else {
            unreachable!("inline expansion of a non-def node");
        };
        let sid = self.declare_function(def, ctx);
        let fscope = self.node_scope(def, ScopeKind::Function, ctx.scope);
        self.bind_params(sid, fscope, span);
        let params = self.symbols.get(sid).params.clone().unwrap_or_default();
        if args.len() != params.len() {
            self.error(
                codes::ARITY,
                format!("expected {} arguments, got {}", params.len(), args.len()),
                span,
            );
        }
        let mut out = Vec::new();
        for (p, &a) in params.iter().zip(&args) {
            let (aexpr, aty) = self.gen_expr(a, ctx);
            self.unify_at(p.ty, aty, span);
            let ty = self.render_type(p.ty);
            out.push(TsStmt::new(TsStmtKind::Let {
                name: p.name.clone(),
                ty,
                init: Some(aexpr),
            }));
        }
        let mut inner = Ctx {
            scope: fscope,
            class: ctx.class,
            function: ctx.function,
            in_ctor: ctx.in_ctor,
            block_path: vec![0],
            block_counter: 0,
        };
        out.extend(self.gen_body(&body, &mut inner));
        out
    }
}
