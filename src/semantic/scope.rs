//! Scope management
//!
//! One scope per module, class body, or function body, arena-allocated per
//! run. Name lookup walks parent links, skipping class-body scopes (Python
//! classes are not a lookup scope for their own methods). `global`/`nonlocal`
//! declarations redirect a name to its declaring scope.

use crate::semantic::symbol::SymbolId;
use std::collections::{HashMap, HashSet};

/// Index of a scope in its [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    names: HashMap<String, SymbolId>,
    /// Names redirected to the module scope by a `global` statement.
    globals: HashSet<String>,
    /// Names redirected to an enclosing function scope by `nonlocal`.
    nonlocals: HashMap<String, ScopeId>,
}

/// Per-run arena of scopes. Index 0 is always the module scope.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Module,
                parent: None,
                names: HashMap::new(),
                globals: HashSet::new(),
                nonlocals: HashMap::new(),
            }],
        }
    }

    pub fn module_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn push(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            names: HashMap::new(),
            globals: HashSet::new(),
            nonlocals: HashMap::new(),
        });
        id
    }

    pub fn kind(&self, id: ScopeId) -> ScopeKind {
        self.scopes[id.index()].kind
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.index()].parent
    }

    /// Define `name` in `scope`, honoring a `global`/`nonlocal` redirect.
    pub fn define(&mut self, scope: ScopeId, name: &str, symbol: SymbolId) {
        let target = self.declaring_scope(scope, name);
        self.scopes[target.index()]
            .names
            .insert(name.to_string(), symbol);
    }

    /// The scope a definition of `name` lands in after redirects.
    pub fn declaring_scope(&self, scope: ScopeId, name: &str) -> ScopeId {
        let s = &self.scopes[scope.index()];
        if s.globals.contains(name) {
            return self.module_scope();
        }
        if let Some(target) = s.nonlocals.get(name) {
            return *target;
        }
        scope
    }

    /// Look `name` up in this scope only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope.index()].names.get(name).copied()
    }

    /// Full lookup: nearest enclosing function/module scope first, walking
    /// parent links and skipping class-body scopes other than the start.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let redirected = self.declaring_scope(scope, name);
        if redirected != scope {
            return self.lookup_local(redirected, name);
        }
        let mut current = Some(scope);
        let mut first = true;
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if first || s.kind != ScopeKind::Class {
                if let Some(sym) = s.names.get(name) {
                    return Some(*sym);
                }
            }
            first = false;
            current = s.parent;
        }
        None
    }

    /// Record a `global` declaration.
    pub fn declare_global(&mut self, scope: ScopeId, name: &str) {
        self.scopes[scope.index()].globals.insert(name.to_string());
    }

    pub fn is_global(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope.index()].globals.contains(name)
    }

    /// Record a `nonlocal` declaration. Fails when no enclosing non-module
    /// function scope binds the name.
    pub fn declare_nonlocal(&mut self, scope: ScopeId, name: &str) -> Result<ScopeId, ()> {
        let mut current = self.scopes[scope.index()].parent;
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            match s.kind {
                ScopeKind::Module => break,
                ScopeKind::Function if s.names.contains_key(name) => {
                    self.scopes[scope.index()]
                        .nonlocals
                        .insert(name.to_string(), id);
                    return Ok(id);
                }
                _ => {}
            }
            current = s.parent;
        }
        Err(())
    }

    pub fn is_nonlocal(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope.index()].nonlocals.contains_key(name)
    }

    /// Names defined directly in a scope, sorted for deterministic output.
    pub fn local_names(&self, scope: ScopeId) -> Vec<(String, SymbolId)> {
        let mut out: Vec<(String, SymbolId)> = self.scopes[scope.index()]
            .names
            .iter()
            .map(|(n, s)| (n.clone(), *s))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Nearest enclosing function/module scope (for hoisting decisions).
    pub fn enclosing_function(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let s = &self.scopes[current.index()];
            if s.kind != ScopeKind::Class {
                return current;
            }
            match s.parent {
                Some(p) => current = p,
                None => return current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let mut arena = ScopeArena::new();
        let module = arena.module_scope();
        arena.define(module, "x", SymbolId(0));
        let func = arena.push(ScopeKind::Function, module);
        assert_eq!(arena.lookup(func, "x"), Some(SymbolId(0)));
    }

    #[test]
    fn test_class_scope_skipped_from_methods() {
        let mut arena = ScopeArena::new();
        let module = arena.module_scope();
        let class = arena.push(ScopeKind::Class, module);
        arena.define(class, "attr", SymbolId(1));
        let method = arena.push(ScopeKind::Function, class);
        // class-body names are invisible from method bodies
        assert_eq!(arena.lookup(method, "attr"), None);
        // but visible from the class body itself
        assert_eq!(arena.lookup(class, "attr"), Some(SymbolId(1)));
    }

    #[test]
    fn test_global_redirects_definition() {
        let mut arena = ScopeArena::new();
        let module = arena.module_scope();
        let func = arena.push(ScopeKind::Function, module);
        arena.declare_global(func, "counter");
        arena.define(func, "counter", SymbolId(7));
        assert_eq!(arena.lookup_local(module, "counter"), Some(SymbolId(7)));
        assert_eq!(arena.lookup_local(func, "counter"), None);
    }

    #[test]
    fn test_nonlocal_requires_enclosing_binding() {
        let mut arena = ScopeArena::new();
        let module = arena.module_scope();
        let outer = arena.push(ScopeKind::Function, module);
        let inner = arena.push(ScopeKind::Function, outer);
        assert!(arena.declare_nonlocal(inner, "missing").is_err());
        arena.define(outer, "present", SymbolId(3));
        assert_eq!(arena.declare_nonlocal(inner, "present"), Ok(outer));
        assert_eq!(arena.lookup(inner, "present"), Some(SymbolId(3)));
    }
}
