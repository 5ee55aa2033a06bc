//! Forward generator - Python AST to target-language tree
//!
//! One [`Session`] per source file. The session owns every per-run pool (types,
//! symbols, scopes, diagnostics, annotation side tables) and drives the
//! generation fixpoint: a full pass over the module may refine types discovered
//! by later statements, so passes repeat until the type pool records zero
//! redirections and no hoisting decision changed, or the pass cap is hit.
//!
//! Type identity must be stable across passes: a node's inferred type is
//! allocated on first encounter and reused afterwards, and primitive/class
//! instance types are cached in the session. Allocating a fresh type per pass
//! and unifying it would count as a change every pass and the loop would never
//! converge.

mod calls;
mod exprs;
mod stmts;

#[cfg(test)]
mod tests;

use crate::diagnostics::{codes, Diagnostic, DiagnosticList, Phase, Severity};
use crate::ir::TsStmt;
use crate::parser::{self, NodeId, NodeKind, ParsedFile};
use crate::semantic::api::{ApiSurface, ExternalBinder};
use crate::semantic::scope::{ScopeArena, ScopeId, ScopeKind};
use crate::semantic::symbol::{Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::semantic::types::{TypeId, TypeKind, TypePool};
use crate::span::Span;
use crate::{ConvertOptions, IdeQuery, QueryKind, QueryResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Result of generating one file: the target tree, every diagnostic from
/// lexing through generation, and the answer to an IDE query if one was asked.
#[derive(Debug)]
pub struct FileResult {
    pub stmts: Vec<TsStmt>,
    pub diagnostics: DiagnosticList,
    pub aborted: bool,
    pub query: Option<QueryResult>,
}

/// Parse and convert one Python source file against an API surface.
pub fn generate(
    source: &str,
    file: Option<&str>,
    surface: &Arc<ApiSurface>,
    options: &ConvertOptions,
) -> FileResult {
    let parsed = parser::parse_with_limit(source, file, options.diagnostic_limit);
    if parsed.aborted {
        error!(
            file = file.unwrap_or("<input>"),
            limit = options.diagnostic_limit,
            "parse aborted at the diagnostic ceiling"
        );
    }
    let session = Session::new(parsed, source, file, surface.clone(), options);
    session.run()
}

/// Generation context threaded through every rule; saved and restored on
/// entry to functions, classes, and nested blocks instead of living in
/// session-wide mutable state.
pub(crate) struct Ctx {
    pub scope: ScopeId,
    pub class: Option<SymbolId>,
    pub function: Option<SymbolId>,
    pub in_ctor: bool,
    /// Numbered-block path from function body to the current block, for
    /// hoisting decisions.
    pub block_path: Vec<u32>,
    pub block_counter: u32,
}

impl Ctx {
    fn module(scope: ScopeId) -> Self {
        Self {
            scope,
            class: None,
            function: None,
            in_ctor: false,
            block_path: vec![0],
            block_counter: 0,
        }
    }
}

pub(crate) struct Session<'a> {
    pub(crate) parsed: ParsedFile,
    pub(crate) source: &'a str,
    pub(crate) file: Option<&'a str>,
    pub(crate) surface: Arc<ApiSurface>,
    pub(crate) options: &'a ConvertOptions,
    pub(crate) pool: TypePool,
    pub(crate) symbols: SymbolTable,
    pub(crate) scopes: ScopeArena,
    pub(crate) binder: ExternalBinder,
    /// Inferred type per AST node; allocated on first touch, then stable.
    pub(crate) node_types: Vec<Option<TypeId>>,
    /// Resolved symbol per AST node.
    pub(crate) node_symbols: Vec<Option<SymbolId>>,
    /// Scope allocated for each def/class body, reused across passes.
    node_scopes: HashMap<NodeId, ScopeId>,
    /// Home scope of locally declared variable symbols.
    sym_scopes: HashMap<SymbolId, ScopeId>,
    /// Instance fields discovered per class, in first-assignment order.
    pub(crate) class_fields: HashMap<SymbolId, Vec<SymbolId>>,
    /// Single-call-site helpers: `def` node -> call node expanded in place.
    inline_defs: HashMap<NodeId, NodeId>,
    /// Reverse index of `inline_defs`: call node -> `def` node.
    pub(crate) inline_calls: HashMap<NodeId, NodeId>,
    pub(crate) diags: DiagnosticList,
    /// Non-pool state changes this pass (hoist marks).
    state_changes: usize,
    // interned types, allocated once per run
    pub(crate) ty_number: TypeId,
    pub(crate) ty_string: TypeId,
    pub(crate) ty_boolean: TypeId,
    pub(crate) ty_void: TypeId,
    pub(crate) ty_null: TypeId,
    class_types: HashMap<SymbolId, TypeId>,
    module_types: HashMap<SymbolId, TypeId>,
}

impl<'a> Session<'a> {
    fn new(
        parsed: ParsedFile,
        source: &'a str,
        file: Option<&'a str>,
        surface: Arc<ApiSurface>,
        options: &'a ConvertOptions,
    ) -> Self {
        let mut pool = TypePool::new();
        let ty_number = pool.add(TypeKind::Number);
        let ty_string = pool.add(TypeKind::String);
        let ty_boolean = pool.add(TypeKind::Boolean);
        let ty_void = pool.add(TypeKind::Void);
        let ty_null = pool.add(TypeKind::Null);
        let node_count = parsed.ast.len();
        Self {
            parsed,
            source,
            file,
            surface,
            options,
            pool,
            symbols: SymbolTable::new(),
            scopes: ScopeArena::new(),
            binder: ExternalBinder::new(),
            node_types: vec![None; node_count],
            node_symbols: vec![None; node_count],
            node_scopes: HashMap::new(),
            sym_scopes: HashMap::new(),
            class_fields: HashMap::new(),
            inline_defs: HashMap::new(),
            inline_calls: HashMap::new(),
            diags: DiagnosticList::new(),
            state_changes: 0,
            ty_number,
            ty_string,
            ty_boolean,
            ty_void,
            ty_null,
            class_types: HashMap::new(),
            module_types: HashMap::new(),
        }
    }

    fn run(mut self) -> FileResult {
        self.mark_inline_candidates();
        let body = self.parsed.body.clone();
        let mut pass = 0usize;
        let stmts = loop {
            pass += 1;
            self.pool.reset_changes();
            self.state_changes = 0;
            self.diags = DiagnosticList::new();
            self.reset_usage();
            let mut ctx = Ctx::module(self.scopes.module_scope());
            let out = self.gen_body(&body, &mut ctx);
            let changes = self.pool.changes() + self.state_changes;
            debug!(pass, changes, "generation pass complete");
            if changes == 0 {
                break out;
            }
            if pass >= self.options.max_passes {
                warn!(
                    pass,
                    changes, "type inference stopped before reaching a fixpoint"
                );
                self.diags.add(Diagnostic::new(
                    codes::FIXPOINT_CAP,
                    Severity::Warning,
                    format!(
                        "type inference stopped after {pass} passes with {changes} pending refinements"
                    ),
                    self.file,
                    Span::at(0),
                    Phase::Convert,
                    self.source,
                ));
                break out;
            }
        };
        let query = self
            .options
            .query
            .as_ref()
            .and_then(|q| self.answer_query(q));
        let mut diagnostics = DiagnosticList::new();
        diagnostics.extend(std::mem::take(&mut self.parsed.diagnostics));
        diagnostics.extend(std::mem::take(&mut self.diags));
        FileResult {
            stmts,
            diagnostics,
            aborted: self.parsed.aborted,
            query,
        }
    }

    /// Clear per-pass usage spans; `hoisted` is sticky so a decision made in
    /// one pass shapes every later pass.
    fn reset_usage(&mut self) {
        for i in 0..self.symbols.len() {
            let usage = &mut self.symbols.get_mut(SymbolId(i as u32)).usage;
            usage.first_assign = None;
            usage.first_ref = None;
            usage.assign_block_path = None;
        }
    }

    // ----- diagnostics -----

    pub(crate) fn error(&mut self, code: &'static str, message: String, span: Span) {
        self.diags.add(Diagnostic::new(
            code,
            Severity::Error,
            message,
            self.file,
            span,
            Phase::Convert,
            self.source,
        ));
    }

    pub(crate) fn unsupported(&mut self, what: &str, span: Span) {
        self.error(
            codes::UNSUPPORTED,
            format!("{what} is not supported"),
            span,
        );
    }

    // ----- type plumbing -----

    /// The inferred type slot of a node, allocated on first touch.
    pub(crate) fn node_type(&mut self, id: NodeId) -> TypeId {
        match self.node_types[id.index()] {
            Some(t) => t,
            None => {
                let t = self.pool.fresh_any();
                self.node_types[id.index()] = Some(t);
                t
            }
        }
    }

    /// Unify two types, reporting a mismatch at `span`.
    pub(crate) fn unify_at(&mut self, a: TypeId, b: TypeId, span: Span) {
        if let Err(m) = self.pool.unify(a, b) {
            let expected = self.pool.render(m.expected, &self.symbols);
            let actual = self.pool.render(m.actual, &self.symbols);
            self.error(
                codes::TYPE_MISMATCH,
                format!("type mismatch: {actual} is not compatible with {expected}"),
                span,
            );
        }
    }

    /// Instance type of a class symbol, interned per run.
    pub(crate) fn class_type(&mut self, sid: SymbolId) -> TypeId {
        if let Some(t) = self.class_types.get(&sid) {
            return *t;
        }
        let t = self.pool.add(TypeKind::Class(sid));
        self.class_types.insert(sid, t);
        t
    }

    /// `typeof module` type of a namespace symbol, interned per run.
    pub(crate) fn module_type(&mut self, sid: SymbolId) -> TypeId {
        if let Some(t) = self.module_types.get(&sid) {
            return *t;
        }
        let t = self.pool.add(TypeKind::Module(sid));
        self.module_types.insert(sid, t);
        t
    }

    /// Force a node's type slot to be an array, returning the element type.
    pub(crate) fn ensure_array(&mut self, ty: TypeId, span: Span) -> TypeId {
        match self.pool.kind(ty) {
            TypeKind::Array(elem) => elem,
            _ => {
                let elem = self.pool.fresh_any();
                let arr = self.pool.add(TypeKind::Array(elem));
                self.unify_at(ty, arr, span);
                elem
            }
        }
    }

    /// Rendered annotation for emitted output; `None` while undetermined.
    pub(crate) fn render_type(&mut self, ty: TypeId) -> Option<String> {
        if matches!(self.pool.kind(ty), TypeKind::Any | TypeKind::GenericParam(_)) {
            return None;
        }
        Some(self.pool.render(ty, &self.symbols))
    }

    /// Map a Python annotation expression to a type. Called once per symbol
    /// (results are stored on the symbol), so allocation here is pass-safe.
    pub(crate) fn ann_type(&mut self, id: NodeId, ctx: &Ctx) -> TypeId {
        let kind = self.parsed.ast.kind(id).clone();
        match kind {
            NodeKind::Name { id: name } => match name.as_str() {
                "int" | "float" => self.ty_number,
                "str" => self.ty_string,
                "bool" => self.ty_boolean,
                _ => {
                    let sid = self.resolve_class_name(&name, ctx);
                    self.class_type(sid)
                }
            },
            NodeKind::NoneLit => self.ty_void,
            NodeKind::Subscript { value, index } => {
                if let NodeKind::Name { id: base } = self.parsed.ast.kind(value) {
                    if base == "List" || base == "list" {
                        let elem = self.ann_type(index, ctx);
                        return self.pool.add(TypeKind::Array(elem));
                    }
                }
                self.pool.fresh_any()
            }
            _ => self.pool.fresh_any(),
        }
    }

    /// A class symbol for an annotation/base name: scope lookup, then the API
    /// surface, then a forward-declared placeholder.
    pub(crate) fn resolve_class_name(&mut self, name: &str, ctx: &Ctx) -> SymbolId {
        if let Some(sid) = self.scopes.lookup(ctx.scope, name) {
            return sid;
        }
        let surface = self.surface.clone();
        if let Some(sid) = self
            .binder
            .bind_py(&surface, name, &mut self.pool, &mut self.symbols)
        {
            return sid;
        }
        if let Some(sid) = self.symbols.by_qname(name) {
            return sid;
        }
        self.symbols.add(Symbol::new(name, SymbolKind::Class))
    }

    // ----- scopes and locals -----

    /// The scope for a def/class body, allocated once and reused every pass.
    pub(crate) fn node_scope(&mut self, id: NodeId, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        if let Some(s) = self.node_scopes.get(&id) {
            return *s;
        }
        let s = self.scopes.push(kind, parent);
        self.node_scopes.insert(id, s);
        s
    }

    /// Dotted qualified name for a declaration in the current context.
    pub(crate) fn qualify(&self, name: &str, ctx: &Ctx) -> String {
        let owner = ctx
            .class
            .or(ctx.function)
            .map(|sid| self.symbols.get(sid).qname.clone());
        match owner {
            Some(owner) => format!("{owner}.{name}"),
            None => name.to_string(),
        }
    }

    /// Declare (or re-find) a local variable in the context scope.
    pub(crate) fn declare_local(&mut self, name: &str, ctx: &Ctx) -> SymbolId {
        let target = self.scopes.declaring_scope(ctx.scope, name);
        if let Some(sid) = self.scopes.lookup_local(target, name) {
            return sid;
        }
        let qname = self.qualify(name, ctx);
        let sid = match self.symbols.by_qname(&qname) {
            Some(existing) => existing,
            None => {
                let mut sym = Symbol::new(&qname, SymbolKind::Variable);
                sym.declared_type = Some(self.pool.fresh_any());
                self.symbols.add(sym)
            }
        };
        self.scopes.define(target, name, sid);
        self.sym_scopes.insert(sid, target);
        sid
    }

    // ----- hoisting bookkeeping -----

    fn tracks_usage(&self, sid: SymbolId, ctx: &Ctx) -> bool {
        self.sym_scopes.get(&sid) == Some(&self.scopes.enclosing_function(ctx.scope))
    }

    fn mark_hoisted(&mut self, sid: SymbolId) {
        let usage = &mut self.symbols.get_mut(sid).usage;
        if !usage.hoisted {
            usage.hoisted = true;
            self.state_changes += 1;
        }
    }

    /// Record a read. A read before this pass's first assignment, or from a
    /// block outside the first assignment's block path, hoists the variable.
    pub(crate) fn note_read(&mut self, sid: SymbolId, span: Span, ctx: &Ctx) {
        if !self.tracks_usage(sid, ctx) {
            return;
        }
        let usage = &mut self.symbols.get_mut(sid).usage;
        if usage.first_ref.is_none() {
            usage.first_ref = Some(span);
        }
        let needs_hoist = match &usage.assign_block_path {
            None => true,
            Some(path) => !is_block_prefix(path, &ctx.block_path),
        };
        if needs_hoist {
            self.mark_hoisted(sid);
        }
    }

    /// Record an assignment; returns true when this is the pass's first
    /// assignment (the declaration site when not hoisted).
    pub(crate) fn note_assign(&mut self, sid: SymbolId, span: Span, ctx: &Ctx) -> bool {
        if !self.tracks_usage(sid, ctx) {
            // assignment redirected to an outer scope (`global`): that scope
            // must declare the variable even if it never assigns it itself
            self.mark_hoisted(sid);
            return false;
        }
        let usage = &mut self.symbols.get_mut(sid).usage;
        if usage.first_assign.is_none() {
            usage.first_assign = Some(span);
            usage.assign_block_path = Some(ctx.block_path.clone());
            return true;
        }
        let path = usage.assign_block_path.clone().unwrap_or_default();
        if !is_block_prefix(&path, &ctx.block_path) {
            self.mark_hoisted(sid);
        }
        false
    }

    /// Generate a statement list that owns hoisted declarations: after the
    /// body is generated, hoisted locals of this scope are declared up front.
    pub(crate) fn gen_body(&mut self, stmts: &[NodeId], ctx: &mut Ctx) -> Vec<TsStmt> {
        let body = self.gen_stmts(stmts, ctx);
        let mut out = Vec::new();
        for (name, sid) in self.scopes.local_names(ctx.scope) {
            let sym = self.symbols.get(sid);
            if sym.kind != SymbolKind::Variable || !sym.usage.hoisted {
                continue;
            }
            let declared = sym.declared_type;
            let ty = declared.and_then(|t| self.render_type(t));
            out.push(TsStmt::new(crate::ir::TsStmtKind::Let {
                name,
                ty,
                init: None,
            }));
        }
        out.extend(body);
        out
    }

    /// Generate a nested block, extending the numbered block path.
    pub(crate) fn gen_block(&mut self, stmts: &[NodeId], ctx: &mut Ctx) -> Vec<TsStmt> {
        ctx.block_counter += 1;
        ctx.block_path.push(ctx.block_counter);
        let out = self.gen_stmts(stmts, ctx);
        ctx.block_path.pop();
        out
    }

    // ----- helper inlining pre-pass -----

    /// Find local helper functions safe to expand at their single call site:
    /// plain functions (no decorators, outside classes, no `return`) called
    /// exactly once, in statement position, and never referenced otherwise.
    fn mark_inline_candidates(&mut self) {
        let ast = &self.parsed.ast;
        let mut candidates: HashMap<String, NodeId> = HashMap::new();
        let mut dupes: HashSet<String> = HashSet::new();
        for i in 0..ast.len() {
            let id = NodeId(i as u32);
            if let NodeKind::FunctionDef {
                name, decorators, ..
            } = ast.kind(id)
            {
                let in_class = matches!(
                    ast.parent(id).map(|p| ast.kind(p)),
                    Some(NodeKind::ClassDef { .. })
                );
                if in_class || !decorators.is_empty() || self.subtree_returns(id) {
                    continue;
                }
                // redefined names disqualify every definition
                if dupes.contains(name) || candidates.insert(name.clone(), id).is_some() {
                    dupes.insert(name.clone());
                    candidates.remove(name);
                }
            }
        }
        if candidates.is_empty() {
            return;
        }
        // reference census: statement-position calls vs everything else
        let mut stmt_calls: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut other_refs: HashSet<String> = HashSet::new();
        for i in 0..ast.len() {
            let id = NodeId(i as u32);
            match ast.kind(id) {
                NodeKind::Call {
                    func, keywords, ..
                } => {
                    if let NodeKind::Name { id: name } = ast.kind(*func) {
                        if candidates.contains_key(name) {
                            let in_stmt = matches!(
                                ast.parent(id).map(|p| ast.kind(p)),
                                Some(NodeKind::ExprStmt { .. })
                            );
                            if in_stmt && keywords.is_empty() {
                                stmt_calls.entry(name.clone()).or_default().push(id);
                            } else {
                                other_refs.insert(name.clone());
                            }
                        }
                    }
                }
                NodeKind::Name { id: name } => {
                    if candidates.contains_key(name) {
                        let parent = ast.parent(id);
                        let is_callee = matches!(
                            parent.map(|p| ast.kind(p)),
                            Some(NodeKind::Call { func, .. }) if *func == id
                        );
                        if !is_callee {
                            other_refs.insert(name.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        for (name, def) in candidates {
            if other_refs.contains(&name) {
                continue;
            }
            match stmt_calls.get(&name) {
                Some(calls) if calls.len() == 1 => {
                    self.inline_defs.insert(def, calls[0]);
                    self.inline_calls.insert(calls[0], def);
                }
                _ => {}
            }
        }
    }

    pub(crate) fn is_inlined_def(&self, id: NodeId) -> bool {
        self.inline_defs.contains_key(&id)
    }

    fn subtree_returns(&self, id: NodeId) -> bool {
        let ast = &self.parsed.ast;
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if n != id && matches!(ast.kind(n), NodeKind::Return { .. }) {
                return true;
            }
            // nested defs own their returns
            if n != id && matches!(ast.kind(n), NodeKind::FunctionDef { .. }) {
                continue;
            }
            stack.extend(ast.children(n));
        }
        false
    }

    // ----- IDE queries -----

    fn answer_query(&mut self, query: &IdeQuery) -> Option<QueryResult> {
        let node = self.parsed.ast.node_at(&self.parsed.body, query.position)?;
        let span = self.parsed.ast.span(node);
        let candidates = match query.kind {
            QueryKind::Symbol => {
                let sid = self.node_symbols[node.index()]?;
                vec![self.symbols.get(sid).qname.clone()]
            }
            QueryKind::Signature => {
                let sid = self.enclosing_call_symbol(node)?;
                vec![self.render_signature(sid)]
            }
            QueryKind::MemberCompletion => self.member_candidates(node)?,
            QueryKind::IdentifierCompletion => {
                let mut names: Vec<String> = self
                    .scopes
                    .local_names(self.scopes.module_scope())
                    .into_iter()
                    .map(|(n, _)| n)
                    .collect();
                names.extend(
                    self.surface
                        .entries
                        .iter()
                        .filter(|e| !e.qname.contains('.'))
                        .map(|e| e.qname.clone()),
                );
                names.sort();
                names.dedup();
                names
            }
        };
        Some(QueryResult {
            begin_pos: span.start,
            end_pos: span.end,
            candidates,
        })
    }

    fn enclosing_call_symbol(&self, node: NodeId) -> Option<SymbolId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if matches!(self.parsed.ast.kind(id), NodeKind::Call { .. }) {
                if let NodeKind::Call { func, .. } = self.parsed.ast.kind(id) {
                    return self.node_symbols[func.index()];
                }
            }
            current = self.parsed.ast.parent(id);
        }
        None
    }

    fn render_signature(&mut self, sid: SymbolId) -> String {
        let sym = self.symbols.get(sid);
        let name = sym.qname.clone();
        let params = sym.params.clone().unwrap_or_default();
        let ret = sym.ret_type;
        let ps: Vec<String> = params
            .iter()
            .map(|p| {
                let ty = self.pool.render(p.ty, &self.symbols);
                if p.optional {
                    format!("{}?: {}", p.name, ty)
                } else {
                    format!("{}: {}", p.name, ty)
                }
            })
            .collect();
        let ret = ret
            .map(|t| self.pool.render(t, &self.symbols))
            .unwrap_or_else(|| "void".to_string());
        format!("{name}({}): {ret}", ps.join(", "))
    }

    fn member_candidates(&mut self, node: NodeId) -> Option<Vec<String>> {
        // find the attribute's object: either the node itself or its parent
        let attr = match self.parsed.ast.kind(node) {
            NodeKind::Attribute { value, .. } => *value,
            _ => match self.parsed.ast.parent(node).map(|p| (p, self.parsed.ast.kind(p))) {
                Some((_, NodeKind::Attribute { value, .. })) => *value,
                _ => node,
            },
        };
        let ty = self.node_types[attr.index()]?;
        let owner = match self.pool.kind(ty) {
            TypeKind::Class(sid) | TypeKind::Module(sid) => self.symbols.get(sid).qname.clone(),
            TypeKind::String => "String".to_string(),
            TypeKind::Array(_) => "Array".to_string(),
            _ => return None,
        };
        let mut names: Vec<String> = self
            .surface
            .members_of(&owner)
            .map(|e| e.qname.rsplit('.').next().unwrap_or(&e.qname).to_string())
            .collect();
        names.extend(self.symbols.iter().filter_map(|(_, s)| {
            s.qname
                .strip_prefix(owner.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .filter(|rest| !rest.contains('.'))
                .map(|rest| rest.to_string())
        }));
        names.sort();
        names.dedup();
        Some(names)
    }
}

/// True when `prefix` is a prefix of `path` (same function, enclosing block).
fn is_block_prefix(prefix: &[u32], path: &[u32]) -> bool {
    prefix.len() <= path.len() && prefix.iter().zip(path).all(|(a, b)| a == b)
}
