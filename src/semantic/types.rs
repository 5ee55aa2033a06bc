//! Type pool and unification
//!
//! Types are interned in a per-run [`TypePool`] and merged by unification.
//! Each entry optionally carries a `redirect` to the entry it was unified
//! with, forming a union-find chain; [`TypePool::canonicalize`] follows the
//! chain with path compression. Only canonical representatives are ever
//! redirected, so chains cannot form cycles.

use crate::semantic::symbol::{SymbolId, SymbolTable};

/// Index of a type in its [`TypePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of type constructors.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Free type: unifies with anything by redirecting to it.
    Any,
    String,
    Number,
    Boolean,
    Void,
    Null,
    /// Single-letter generic placeholder from an API signature. Instantiated
    /// to a fresh `Any` per call site; a surviving placeholder behaves free.
    GenericParam(String),
    Array(TypeId),
    /// Arity is part of the constructor: functions of different parameter
    /// counts never unify.
    Function { params: Vec<TypeId>, ret: TypeId },
    Union(Vec<TypeId>),
    /// Instance of a class/interface symbol.
    Class(SymbolId),
    /// A module/namespace symbol used as a value.
    Module(SymbolId),
}

#[derive(Debug, Clone)]
struct TypeEntry {
    kind: TypeKind,
    redirect: Option<TypeId>,
}

/// Outcome of an assignability check. `Maybe` means "not yet decidable";
/// callers treat it as neither proof nor refutation and let later fixpoint
/// passes improve the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignable {
    Yes,
    No,
    Maybe,
}

/// A type mismatch found during unification; the caller owns turning it into
/// a positioned diagnostic.
#[derive(Debug, Clone)]
pub struct TypeMismatch {
    pub expected: TypeId,
    pub actual: TypeId,
}

/// Per-run arena of types.
#[derive(Debug, Default)]
pub struct TypePool {
    entries: Vec<TypeEntry>,
    /// Redirections performed since the last [`Self::reset_changes`]; the
    /// fixpoint driver repeats passes until this stays zero.
    changes: usize,
}

impl TypePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.entries.len() as u32);
        self.entries.push(TypeEntry {
            kind,
            redirect: None,
        });
        id
    }

    pub fn fresh_any(&mut self) -> TypeId {
        self.add(TypeKind::Any)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn changes(&self) -> usize {
        self.changes
    }

    pub fn reset_changes(&mut self) {
        self.changes = 0;
    }

    /// Follow the redirect chain to the representative, compressing the path
    /// on the way back.
    pub fn canonicalize(&mut self, t: TypeId) -> TypeId {
        let mut root = t;
        let mut hops = 0usize;
        while let Some(next) = self.entries[root.index()].redirect {
            root = next;
            hops += 1;
            debug_assert!(
                hops <= self.entries.len(),
                "unifyWith chain does not terminate"
            );
        }
        // path compression
        let mut cur = t;
        while let Some(next) = self.entries[cur.index()].redirect {
            self.entries[cur.index()].redirect = Some(root);
            cur = next;
        }
        root
    }

    pub fn kind(&mut self, t: TypeId) -> TypeKind {
        let c = self.canonicalize(t);
        self.entries[c.index()].kind.clone()
    }

    fn redirect(&mut self, from: TypeId, to: TypeId) {
        debug_assert!(self.entries[from.index()].redirect.is_none());
        debug_assert_ne!(from, to);
        self.entries[from.index()].redirect = Some(to);
        self.changes += 1;
    }

    /// Merge two types. Free types redirect to the other side; same
    /// constructors unify their arguments pairwise and collapse into one;
    /// different constructors are a mismatch, reported to the caller and
    /// otherwise left alone (the generator falls back to a placeholder).
    pub fn unify(&mut self, t0: TypeId, t1: TypeId) -> Result<TypeId, TypeMismatch> {
        let a = self.canonicalize(t0);
        let b = self.canonicalize(t1);
        if a == b {
            return Ok(a);
        }
        let ka = self.entries[a.index()].kind.clone();
        let kb = self.entries[b.index()].kind.clone();
        match (&ka, &kb) {
            (TypeKind::Any, _) | (TypeKind::GenericParam(_), _) => {
                self.redirect(a, b);
                Ok(b)
            }
            (_, TypeKind::Any) | (_, TypeKind::GenericParam(_)) => {
                self.redirect(b, a);
                Ok(a)
            }
            (TypeKind::String, TypeKind::String)
            | (TypeKind::Number, TypeKind::Number)
            | (TypeKind::Boolean, TypeKind::Boolean)
            | (TypeKind::Void, TypeKind::Void)
            | (TypeKind::Null, TypeKind::Null) => {
                self.redirect(a, b);
                Ok(b)
            }
            (TypeKind::Array(ea), TypeKind::Array(eb)) => {
                let (ea, eb) = (*ea, *eb);
                self.unify(ea, eb)?;
                // recheck: unifying the elements may have merged a and b
                let (a, b) = (self.canonicalize(a), self.canonicalize(b));
                if a != b {
                    self.redirect(a, b);
                }
                Ok(b)
            }
            (
                TypeKind::Function {
                    params: pa,
                    ret: ra,
                },
                TypeKind::Function {
                    params: pb,
                    ret: rb,
                },
            ) => {
                if pa.len() != pb.len() {
                    return Err(TypeMismatch {
                        expected: a,
                        actual: b,
                    });
                }
                let (pa, pb) = (pa.clone(), pb.clone());
                let (ra, rb) = (*ra, *rb);
                for (x, y) in pa.into_iter().zip(pb) {
                    self.unify(x, y)?;
                }
                self.unify(ra, rb)?;
                let (a, b) = (self.canonicalize(a), self.canonicalize(b));
                if a != b {
                    self.redirect(a, b);
                }
                Ok(b)
            }
            (TypeKind::Union(ua), TypeKind::Union(ub)) => {
                if ua.len() != ub.len() {
                    return Err(TypeMismatch {
                        expected: a,
                        actual: b,
                    });
                }
                let (ua, ub) = (ua.clone(), ub.clone());
                for (x, y) in ua.into_iter().zip(ub) {
                    self.unify(x, y)?;
                }
                let (a, b) = (self.canonicalize(a), self.canonicalize(b));
                if a != b {
                    self.redirect(a, b);
                }
                Ok(b)
            }
            (TypeKind::Class(sa), TypeKind::Class(sb)) if sa == sb => {
                self.redirect(a, b);
                Ok(b)
            }
            (TypeKind::Module(sa), TypeKind::Module(sb)) if sa == sb => {
                self.redirect(a, b);
                Ok(b)
            }
            _ => Err(TypeMismatch {
                expected: a,
                actual: b,
            }),
        }
    }

    /// One-directional constraint used at call sites: only unify when
    /// assignability cannot already be proven. Conservative on purpose.
    pub fn narrow(
        &mut self,
        actual: TypeId,
        expected: TypeId,
        symbols: &SymbolTable,
    ) -> Result<(), TypeMismatch> {
        match self.is_assignable(actual, expected, symbols) {
            Assignable::Yes => Ok(()),
            Assignable::No | Assignable::Maybe => {
                self.unify(actual, expected).map(|_| ())
            }
        }
    }

    /// Structural assignability: identity, `extends` ancestry, or membership
    /// in a one-level union. Deliberately incomplete; `Maybe` is returned for
    /// anything it cannot decide.
    pub fn is_assignable(
        &mut self,
        from: TypeId,
        to: TypeId,
        symbols: &SymbolTable,
    ) -> Assignable {
        let a = self.canonicalize(from);
        let b = self.canonicalize(to);
        if a == b {
            return Assignable::Yes;
        }
        let ka = self.entries[a.index()].kind.clone();
        let kb = self.entries[b.index()].kind.clone();
        match (&ka, &kb) {
            (TypeKind::Any, _) | (_, TypeKind::Any) => Assignable::Maybe,
            (TypeKind::GenericParam(_), _) | (_, TypeKind::GenericParam(_)) => Assignable::Maybe,
            // a class is assignable to any ancestor on its extends chain
            (TypeKind::Class(sub), TypeKind::Class(sup)) => {
                if symbols.extends_transitively(*sub, *sup) {
                    Assignable::Yes
                } else {
                    Assignable::No
                }
            }
            // anything is assignable to a union containing it (one level)
            (_, TypeKind::Union(members)) => {
                let members = members.clone();
                let mut saw_maybe = false;
                for m in members {
                    match self.is_assignable(a, m, symbols) {
                        Assignable::Yes => return Assignable::Yes,
                        Assignable::Maybe => saw_maybe = true,
                        Assignable::No => {}
                    }
                }
                if saw_maybe {
                    Assignable::Maybe
                } else {
                    Assignable::No
                }
            }
            (TypeKind::Null, TypeKind::Class(_)) => Assignable::Yes,
            (TypeKind::String, TypeKind::String)
            | (TypeKind::Number, TypeKind::Number)
            | (TypeKind::Boolean, TypeKind::Boolean)
            | (TypeKind::Void, TypeKind::Void) => Assignable::Yes,
            (TypeKind::Array(ea), TypeKind::Array(eb)) => {
                let (ea, eb) = (*ea, *eb);
                self.is_assignable(ea, eb, symbols)
            }
            _ => Assignable::No,
        }
    }

    /// Render a type for diagnostics and emitted annotations.
    pub fn render(&mut self, t: TypeId, symbols: &SymbolTable) -> String {
        let c = self.canonicalize(t);
        match self.entries[c.index()].kind.clone() {
            TypeKind::Any => "any".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::Number => "number".to_string(),
            TypeKind::Boolean => "boolean".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Null => "null".to_string(),
            TypeKind::GenericParam(name) => name,
            TypeKind::Array(e) => {
                let inner = self.render(e, symbols);
                if inner.contains(' ') {
                    format!("({inner})[]")
                } else {
                    format!("{inner}[]")
                }
            }
            TypeKind::Function { params, ret } => {
                let ps: Vec<String> = params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("a{i}: {}", self.render(*p, symbols)))
                    .collect();
                format!("({}) => {}", ps.join(", "), self.render(ret, symbols))
            }
            TypeKind::Union(members) => members
                .iter()
                .map(|m| self.render(*m, symbols))
                .collect::<Vec<_>>()
                .join(" | "),
            TypeKind::Class(sym) => symbols.get(sym).qname.clone(),
            TypeKind::Module(sym) => format!("typeof {}", symbols.get(sym).qname),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::symbol::{Symbol, SymbolKind};

    fn empty_symbols() -> SymbolTable {
        SymbolTable::new()
    }

    #[test]
    fn test_unify_any_redirects_to_concrete() {
        let mut pool = TypePool::new();
        let a = pool.fresh_any();
        let n = pool.add(TypeKind::Number);
        pool.unify(a, n).unwrap();
        assert_eq!(pool.canonicalize(a), pool.canonicalize(n));
        assert_eq!(pool.kind(a), TypeKind::Number);
        assert_eq!(pool.changes(), 1);
    }

    #[test]
    fn test_unify_mismatch_reports_both_sides() {
        let mut pool = TypePool::new();
        let s = pool.add(TypeKind::String);
        let n = pool.add(TypeKind::Number);
        let err = pool.unify(s, n).unwrap_err();
        assert_eq!(pool.canonicalize(err.expected), pool.canonicalize(s));
        assert_eq!(pool.canonicalize(err.actual), pool.canonicalize(n));
    }

    #[test]
    fn test_unify_arrays_pairwise() {
        let mut pool = TypePool::new();
        let e0 = pool.fresh_any();
        let a0 = pool.add(TypeKind::Array(e0));
        let e1 = pool.add(TypeKind::Number);
        let a1 = pool.add(TypeKind::Array(e1));
        pool.unify(a0, a1).unwrap();
        assert_eq!(pool.kind(e0), TypeKind::Number);
    }

    #[test]
    fn test_unify_function_arity_mismatch() {
        let mut pool = TypePool::new();
        let n = pool.add(TypeKind::Number);
        let v = pool.add(TypeKind::Void);
        let f1 = pool.add(TypeKind::Function {
            params: vec![n],
            ret: v,
        });
        let f2 = pool.add(TypeKind::Function {
            params: vec![n, n],
            ret: v,
        });
        assert!(pool.unify(f1, f2).is_err());
    }

    #[test]
    fn test_unify_is_idempotent() {
        let mut pool = TypePool::new();
        let a = pool.fresh_any();
        let n = pool.add(TypeKind::Number);
        pool.unify(a, n).unwrap();
        pool.reset_changes();
        pool.unify(a, n).unwrap();
        assert_eq!(pool.changes(), 0, "re-unifying merged types must not churn");
    }

    #[test]
    fn test_canonicalize_terminates_and_compresses_long_chains() {
        let mut pool = TypePool::new();
        // adversarial: chain 200 free types end to end
        let types: Vec<TypeId> = (0..200).map(|_| pool.fresh_any()).collect();
        for w in types.windows(2) {
            pool.unify(w[0], w[1]).unwrap();
        }
        let root = pool.canonicalize(types[0]);
        for t in &types {
            assert_eq!(pool.canonicalize(*t), root);
            // after compression every entry points straight at the root
            if *t != root {
                assert_eq!(pool.entries[t.index()].redirect, Some(root));
            }
        }
    }

    #[test]
    fn test_assignable_through_extends_chain() {
        let mut pool = TypePool::new();
        let mut symbols = empty_symbols();
        let a = symbols.add(Symbol::new("A", SymbolKind::Class));
        let mut b_sym = Symbol::new("B", SymbolKind::Class);
        b_sym.extends = vec!["A".to_string()];
        let b = symbols.add(b_sym);
        let mut c_sym = Symbol::new("C", SymbolKind::Class);
        c_sym.extends = vec!["B".to_string()];
        let c = symbols.add(c_sym);
        let ta = pool.add(TypeKind::Class(a));
        let tb = pool.add(TypeKind::Class(b));
        let tc = pool.add(TypeKind::Class(c));
        assert_eq!(pool.is_assignable(tc, ta, &symbols), Assignable::Yes);
        assert_eq!(pool.is_assignable(tc, tb, &symbols), Assignable::Yes);
        assert_eq!(pool.is_assignable(ta, tc, &symbols), Assignable::No);
    }

    #[test]
    fn test_narrow_skips_unify_when_provable() {
        let mut pool = TypePool::new();
        let mut symbols = empty_symbols();
        let a = symbols.add(Symbol::new("A", SymbolKind::Class));
        let mut b_sym = Symbol::new("B", SymbolKind::Class);
        b_sym.extends = vec!["A".to_string()];
        let b = symbols.add(b_sym);
        let ta = pool.add(TypeKind::Class(a));
        let tb = pool.add(TypeKind::Class(b));
        pool.narrow(tb, ta, &symbols).unwrap();
        // provably assignable: the two classes must not have been merged
        assert_ne!(pool.canonicalize(ta), pool.canonicalize(tb));
        assert_eq!(pool.changes(), 0);
    }

    #[test]
    fn test_assignable_to_union_member() {
        let mut pool = TypePool::new();
        let symbols = empty_symbols();
        let s = pool.add(TypeKind::String);
        let n = pool.add(TypeKind::Number);
        let u = pool.add(TypeKind::Union(vec![s, n]));
        let n2 = pool.add(TypeKind::Number);
        assert_eq!(pool.is_assignable(n2, u, &symbols), Assignable::Yes);
        let b = pool.add(TypeKind::Boolean);
        assert_eq!(pool.is_assignable(b, u, &symbols), Assignable::No);
    }

    #[test]
    fn test_render_types() {
        let mut pool = TypePool::new();
        let symbols = empty_symbols();
        let n = pool.add(TypeKind::Number);
        let arr = pool.add(TypeKind::Array(n));
        assert_eq!(pool.render(arr, &symbols), "number[]");
        let s = pool.add(TypeKind::String);
        let u = pool.add(TypeKind::Union(vec![s, n]));
        assert_eq!(pool.render(u, &symbols), "string | number");
    }
}
