//! Symbol table
//!
//! Qualified symbols for everything the converter can resolve: external API
//! entries, program functions/classes, and local variables. Symbols live in a
//! per-run arena; AST nodes refer to them by [`SymbolId`] through the session
//! side tables.

use crate::semantic::api::OverrideTemplate;
use crate::semantic::types::TypeId;
use crate::span::Span;
use std::collections::HashMap;

/// Index of a symbol in its [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Module,
    Class,
    Interface,
    Enum,
    EnumMember,
    Function,
    Method,
    Property,
    Variable,
}

/// One declared parameter of a function/method symbol.
#[derive(Debug, Clone)]
pub struct ParamSymbol {
    pub name: String,
    pub ty: TypeId,
    pub optional: bool,
    /// Literal default rendered in the target language (`"0"`, `"\"x\""`).
    pub default: Option<String>,
}

/// Hoisting bookkeeping for local variables, maintained by the forward
/// generator. `block_path` is the sequence of numbered blocks from function
/// body down to the block of the first assignment.
#[derive(Debug, Clone, Default)]
pub struct VarUsage {
    pub first_assign: Option<Span>,
    pub first_ref: Option<Span>,
    pub assign_block_path: Option<Vec<u32>>,
    pub hoisted: bool,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    /// Fully dotted target-language name.
    pub qname: String,
    /// Python-side qualified name; equals `qname` for internal symbols.
    pub py_qname: String,
    pub kind: SymbolKind,
    pub params: Option<Vec<ParamSymbol>>,
    pub declared_type: Option<TypeId>,
    pub ret_type: Option<TypeId>,
    pub is_instance: bool,
    pub is_static: bool,
    pub is_protected: bool,
    /// True for symbols harvested from the read-only API surface.
    pub is_external: bool,
    /// Qualified names of base classes/interfaces.
    pub extends: Vec<String>,
    pub ts_override: Option<OverrideTemplate>,
    pub py_override: Option<OverrideTemplate>,
    pub usage: VarUsage,
}

impl Symbol {
    pub fn new(qname: &str, kind: SymbolKind) -> Self {
        Self {
            qname: qname.to_string(),
            py_qname: qname.to_string(),
            kind,
            params: None,
            declared_type: None,
            ret_type: None,
            is_instance: false,
            is_static: false,
            is_protected: false,
            is_external: false,
            extends: Vec::new(),
            ts_override: None,
            py_override: None,
            usage: VarUsage::default(),
        }
    }

    /// Last path segment of the qualified name.
    pub fn local_name(&self) -> &str {
        self.qname.rsplit('.').next().unwrap_or(&self.qname)
    }
}

/// Per-run arena of symbols with qualified-name lookup.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_qname: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.by_qname.insert(symbol.qname.clone(), id);
        self.symbols.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn by_qname(&self, qname: &str) -> Option<SymbolId> {
        self.by_qname.get(qname).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    /// Dotted member lookup that walks `extends` chains: `C.m` resolves to
    /// the nearest ancestor of `C` declaring `m`.
    pub fn member(&self, class: SymbolId, name: &str) -> Option<SymbolId> {
        let mut current = Some(class);
        let mut hops = 0usize;
        while let Some(cls) = current {
            let qname = format!("{}.{}", self.get(cls).qname, name);
            if let Some(found) = self.by_qname(&qname) {
                return Some(found);
            }
            current = self
                .get(cls)
                .extends
                .first()
                .and_then(|base| self.by_qname(base));
            hops += 1;
            if hops > self.symbols.len() {
                break; // malformed extends cycle
            }
        }
        None
    }

    /// True when `sub` reaches `sup` through `extends` links (reflexive).
    pub fn extends_transitively(&self, sub: SymbolId, sup: SymbolId) -> bool {
        if sub == sup {
            return true;
        }
        let sup_qname = &self.get(sup).qname;
        let mut worklist = vec![sub];
        let mut hops = 0usize;
        while let Some(cls) = worklist.pop() {
            hops += 1;
            if hops > self.symbols.len() + 1 {
                return false;
            }
            for base in &self.get(cls).extends {
                if base == sup_qname {
                    return true;
                }
                if let Some(base_id) = self.by_qname(base) {
                    worklist.push(base_id);
                }
            }
        }
        false
    }

    /// Nearest ancestor of `class` (starting with itself) that declares a
    /// constructor symbol, for default-constructor synthesis.
    pub fn inherited_constructor(&self, class: SymbolId) -> Option<SymbolId> {
        let mut current = Some(class);
        let mut hops = 0usize;
        while let Some(cls) = current {
            let qname = format!("{}.__init__", self.get(cls).qname);
            if let Some(found) = self.by_qname(&qname) {
                return Some(found);
            }
            current = self
                .get(cls)
                .extends
                .first()
                .and_then(|base| self.by_qname(base));
            hops += 1;
            if hops > self.symbols.len() {
                break;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup_by_qname() {
        let mut table = SymbolTable::new();
        let id = table.add(Symbol::new("Math.abs", SymbolKind::Function));
        assert_eq!(table.by_qname("Math.abs"), Some(id));
        assert_eq!(table.get(id).local_name(), "abs");
    }

    #[test]
    fn test_member_resolves_through_extends() {
        let mut table = SymbolTable::new();
        let base = table.add(Symbol::new("Base", SymbolKind::Class));
        table.add(Symbol::new("Base.greet", SymbolKind::Method));
        let mut sub = Symbol::new("Sub", SymbolKind::Class);
        sub.extends = vec!["Base".to_string()];
        let sub = table.add(sub);
        let found = table.member(sub, "greet").unwrap();
        assert_eq!(table.get(found).qname, "Base.greet");
        assert!(table.extends_transitively(sub, base));
    }

    #[test]
    fn test_inherited_constructor_walks_chain() {
        let mut table = SymbolTable::new();
        table.add(Symbol::new("A", SymbolKind::Class));
        table.add(Symbol::new("A.__init__", SymbolKind::Method));
        let mut b = Symbol::new("B", SymbolKind::Class);
        b.extends = vec!["A".to_string()];
        let b = table.add(b);
        let ctor = table.inherited_constructor(b).unwrap();
        assert_eq!(table.get(ctor).qname, "A.__init__");
    }
}
