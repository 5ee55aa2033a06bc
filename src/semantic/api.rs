//! API surface input
//!
//! The host environment describes its built-in functions/classes/modules as a
//! JSON symbol table (deserialized with serde). The surface is read-only and
//! shared across conversion runs behind an `Arc`; each run materializes the
//! entries it actually touches into its own symbol table through
//! [`ExternalBinder`], lazily and memoized.
//!
//! Entries may carry override templates — a small mini-language of literal
//! text interleaved with `$N` positional substitutions, `$N?` optional
//! arguments, and `$N=literal` defaults. Malformed templates fail closed: the
//! override is ignored and a plain call is generated instead.

use crate::semantic::symbol::{ParamSymbol, Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::semantic::types::{TypeId, TypeKind, TypePool};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One harvested API symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEntry {
    /// Target-language qualified name (`console.log`).
    pub qname: String,
    /// Python-side qualified name (`print`); defaults to `qname`.
    #[serde(default)]
    pub py_q_name: Option<String>,
    pub kind: ApiKind,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ApiParam>,
    #[serde(default)]
    pub ret_type: Option<String>,
    /// Override template applied when generating target code for a call.
    #[serde(default)]
    pub ts_override: Option<String>,
    /// Override template applied by the reverse emitter.
    #[serde(default)]
    pub py_override: Option<String>,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_protected: bool,
    #[serde(default)]
    pub is_instance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiKind {
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

impl ApiKind {
    pub fn to_symbol_kind(self) -> SymbolKind {
        match self {
            ApiKind::Module => SymbolKind::Module,
            ApiKind::Class => SymbolKind::Class,
            ApiKind::Interface => SymbolKind::Interface,
            ApiKind::Enum => SymbolKind::Enum,
            ApiKind::EnumMember => SymbolKind::EnumMember,
            ApiKind::Function => SymbolKind::Function,
            ApiKind::Method => SymbolKind::Method,
            ApiKind::Property => SymbolKind::Property,
            ApiKind::Variable => SymbolKind::Variable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

/// The whole harvested surface. Immutable after deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSurface {
    pub entries: Vec<ApiEntry>,
}

impl ApiSurface {
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::error::ConvertError::ApiSurface(e.to_string()))
    }

    pub fn by_qname(&self, qname: &str) -> Option<&ApiEntry> {
        self.entries.iter().find(|e| e.qname == qname)
    }

    /// Look an entry up by its Python-side name.
    pub fn by_py_qname(&self, py_qname: &str) -> Option<&ApiEntry> {
        self.entries
            .iter()
            .find(|e| e.py_q_name.as_deref().unwrap_or(&e.qname) == py_qname)
    }

    /// Direct members of a namespace/class, by qualified-name prefix.
    pub fn members_of<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a ApiEntry> {
        self.entries.iter().filter(move |e| {
            e.qname
                .strip_prefix(owner)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(|rest| !rest.contains('.'))
                .unwrap_or(false)
        })
    }
}

/// Lazily materializes external API entries into a run's symbol table.
#[derive(Debug, Default)]
pub struct ExternalBinder {
    memo: HashMap<String, SymbolId>,
}

impl ExternalBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a Python-side qualified name against the surface, creating the
    /// run-local symbol (and its types) on first use.
    pub fn bind_py(
        &mut self,
        surface: &ApiSurface,
        py_qname: &str,
        pool: &mut TypePool,
        symbols: &mut SymbolTable,
    ) -> Option<SymbolId> {
        let qname = surface.by_py_qname(py_qname)?.qname.clone();
        self.bind(surface, &qname, pool, symbols)
    }

    /// Resolve a target-language qualified name.
    pub fn bind(
        &mut self,
        surface: &ApiSurface,
        qname: &str,
        pool: &mut TypePool,
        symbols: &mut SymbolTable,
    ) -> Option<SymbolId> {
        if let Some(id) = self.memo.get(qname) {
            return Some(*id);
        }
        let entry = surface.by_qname(qname)?.clone();
        let mut symbol = Symbol::new(&entry.qname, entry.kind.to_symbol_kind());
        symbol.py_qname = entry.py_q_name.clone().unwrap_or_else(|| entry.qname.clone());
        symbol.is_external = true;
        symbol.is_static = entry.is_static;
        symbol.is_protected = entry.is_protected;
        symbol.is_instance = entry.is_instance;
        symbol.extends = entry.extends.clone();
        symbol.ts_override = entry.ts_override.as_deref().and_then(OverrideTemplate::parse);
        symbol.py_override = entry.py_override.as_deref().and_then(OverrideTemplate::parse);
        let id = symbols.add(symbol);
        // memoize before descending into type strings: a class referring to
        // itself in a signature must not recurse forever
        self.memo.insert(qname.to_string(), id);

        let params: Vec<ParamSymbol> = entry
            .parameters
            .iter()
            .map(|p| ParamSymbol {
                name: p.name.clone(),
                ty: self.parse_type(surface, &p.ty, pool, symbols),
                optional: p.optional || p.default.is_some(),
                default: p.default.clone(),
            })
            .collect();
        let ret = entry
            .ret_type
            .as_deref()
            .map(|t| self.parse_type(surface, t, pool, symbols));
        let sym = symbols.get_mut(id);
        if matches!(
            entry.kind,
            ApiKind::Function | ApiKind::Method | ApiKind::EnumMember
        ) || !params.is_empty()
        {
            sym.params = Some(params);
        }
        sym.ret_type = ret;
        if matches!(entry.kind, ApiKind::Variable | ApiKind::Property) {
            let declared = entry
                .ret_type
                .as_deref()
                .map(|t| self.parse_type(surface, t, pool, symbols))
                .unwrap_or_else(|| pool.fresh_any());
            symbols.get_mut(id).declared_type = Some(declared);
        }
        Some(id)
    }

    /// Parse a type string in the target language's spelling: primitives,
    /// `T[]`, `A | B`, class qnames, single-uppercase generic placeholders.
    /// Anything unrecognized falls back to `any`.
    pub fn parse_type(
        &mut self,
        surface: &ApiSurface,
        text: &str,
        pool: &mut TypePool,
        symbols: &mut SymbolTable,
    ) -> TypeId {
        let text = text.trim();
        // one-level union
        if let Some(members) = split_top_level_union(text) {
            let ids: Vec<TypeId> = members
                .iter()
                .map(|m| self.parse_type(surface, m, pool, symbols))
                .collect();
            return pool.add(TypeKind::Union(ids));
        }
        if let Some(elem) = text.strip_suffix("[]") {
            let elem = elem.trim().trim_start_matches('(').trim_end_matches(')');
            let inner = self.parse_type(surface, elem, pool, symbols);
            return pool.add(TypeKind::Array(inner));
        }
        match text {
            "string" => return pool.add(TypeKind::String),
            "number" => return pool.add(TypeKind::Number),
            "boolean" => return pool.add(TypeKind::Boolean),
            "void" => return pool.add(TypeKind::Void),
            "null" | "undefined" => return pool.add(TypeKind::Null),
            "any" | "" => return pool.fresh_any(),
            _ => {}
        }
        if text.len() == 1 && text.chars().all(|c| c.is_ascii_uppercase()) {
            return pool.add(TypeKind::GenericParam(text.to_string()));
        }
        // class/interface/enum reference
        let sym = if surface.by_qname(text).is_some() {
            self.bind(surface, text, pool, symbols)
        } else {
            None
        };
        let sym = sym.or_else(|| symbols.by_qname(text)).unwrap_or_else(|| {
            symbols.add(Symbol::new(text, SymbolKind::Class))
        });
        pool.add(TypeKind::Class(sym))
    }
}

/// Split `A | B | C` at top-level pipes; returns `None` for a single type.
fn split_top_level_union(text: &str) -> Option<Vec<&str>> {
    let mut depth = 0i32;
    let mut parts = Vec::new();
    let mut start = 0usize;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'<' => depth += 1,
            b')' | b']' | b'>' => depth -= 1,
            b'|' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if parts.is_empty() {
        return None;
    }
    parts.push(text[start..].trim());
    Some(parts)
}

/// Parsed override template: literal text interleaved with argument slots.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideTemplate {
    pub parts: Vec<TemplatePart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Lit(String),
    Arg {
        index: usize,
        optional: bool,
        default: Option<String>,
    },
}

impl OverrideTemplate {
    /// Parse the template text; returns `None` for malformed input (fail
    /// closed — no override is applied then).
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = Vec::new();
        let mut lit = String::new();
        let bytes = text.as_bytes();
        let mut i = 0usize;
        while i < bytes.len() {
            if bytes[i] != b'$' {
                // '$' is ASCII, so the chunk boundary is a char boundary
                let chunk = i;
                while i < bytes.len() && bytes[i] != b'$' {
                    i += 1;
                }
                lit.push_str(&text[chunk..i]);
                continue;
            }
            i += 1;
            let digit_start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i == digit_start {
                return None; // '$' must be followed by an argument index
            }
            let index: usize = text[digit_start..i].parse().ok()?;
            let mut optional = false;
            let mut default = None;
            if i < bytes.len() && bytes[i] == b'?' {
                optional = true;
                i += 1;
            } else if i < bytes.len() && bytes[i] == b'=' {
                i += 1;
                let (value, consumed) = parse_default_literal(&text[i..])?;
                default = Some(value);
                i += consumed;
            }
            if !lit.is_empty() {
                parts.push(TemplatePart::Lit(std::mem::take(&mut lit)));
            }
            parts.push(TemplatePart::Arg {
                index,
                optional,
                default,
            });
        }
        if !lit.is_empty() {
            parts.push(TemplatePart::Lit(lit));
        }
        Some(Self { parts })
    }

    /// Highest argument index referenced, if any slot exists.
    pub fn max_index(&self) -> Option<usize> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                TemplatePart::Arg { index, .. } => Some(*index),
                _ => None,
            })
            .max()
    }

    /// Expand with already-rendered argument texts. Missing arguments take
    /// the default literal, or vanish when optional (with separator cleanup).
    pub fn expand(&self, args: &[String]) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Lit(text) => out.push_str(text),
                TemplatePart::Arg {
                    index,
                    optional,
                    default,
                } => {
                    if let Some(arg) = args.get(*index) {
                        out.push_str(arg);
                    } else if let Some(value) = default {
                        out.push_str(value);
                    } else if *optional {
                        // drop the separator that introduced this slot
                        let trimmed = out.trim_end();
                        if trimmed.ends_with(',') {
                            let cut = trimmed.len() - 1;
                            out.truncate(cut);
                        }
                    }
                }
            }
        }
        out
    }
}

/// A default literal after `=`: a number, quoted string, boolean, or
/// null/undefined. Returns the literal text and consumed byte count.
fn parse_default_literal(rest: &str) -> Option<(String, usize)> {
    let bytes = rest.as_bytes();
    if rest.is_empty() {
        return None;
    }
    if bytes[0] == b'"' || bytes[0] == b'\'' {
        let quote = bytes[0];
        let mut i = 1usize;
        while i < bytes.len() {
            if bytes[i] == b'\\' {
                i += 2;
                continue;
            }
            if bytes[i] == quote {
                return Some((rest[..=i].to_string(), i + 1));
            }
            i += 1;
        }
        return None; // unterminated quote
    }
    let mut i = 0usize;
    while i < bytes.len()
        && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'.' | b'_' | b'-' | b'+'))
    {
        i += 1;
    }
    if i == 0 {
        return None;
    }
    let word = &rest[..i];
    let valid = word.parse::<f64>().is_ok()
        || matches!(word, "true" | "false" | "null" | "undefined")
        || word.contains('.') && word.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if valid {
        Some((word.to_string(), i))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_surface_from_json() {
        let json = r#"{
            "entries": [
                {
                    "qname": "console.log",
                    "pyQName": "print",
                    "kind": "function",
                    "namespace": "console",
                    "parameters": [
                        { "name": "msg", "type": "string", "default": null, "optional": false }
                    ],
                    "retType": "void"
                }
            ]
        }"#;
        let surface = ApiSurface::from_json(json).unwrap();
        assert_eq!(surface.entries.len(), 1);
        assert!(surface.by_py_qname("print").is_some());
        assert!(surface.by_qname("console.log").is_some());
    }

    #[test]
    fn test_bind_is_memoized() {
        let json = r#"{"entries":[{"qname":"Math.abs","kind":"function",
            "parameters":[{"name":"x","type":"number"}],"retType":"number"}]}"#;
        let surface = ApiSurface::from_json(json).unwrap();
        let mut binder = ExternalBinder::new();
        let mut pool = TypePool::new();
        let mut symbols = SymbolTable::new();
        let a = binder.bind(&surface, "Math.abs", &mut pool, &mut symbols);
        let b = binder.bind(&surface, "Math.abs", &mut pool, &mut symbols);
        assert_eq!(a, b);
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn test_parse_type_strings() {
        let surface = ApiSurface::default();
        let mut binder = ExternalBinder::new();
        let mut pool = TypePool::new();
        let mut symbols = SymbolTable::new();
        let arr = binder.parse_type(&surface, "number[]", &mut pool, &mut symbols);
        assert!(matches!(pool.kind(arr), TypeKind::Array(_)));
        let union = binder.parse_type(&surface, "string | number", &mut pool, &mut symbols);
        assert!(matches!(pool.kind(union), TypeKind::Union(ref m) if m.len() == 2));
        let generic = binder.parse_type(&surface, "T", &mut pool, &mut symbols);
        assert!(matches!(pool.kind(generic), TypeKind::GenericParam(_)));
        let class = binder.parse_type(&surface, "Sprite", &mut pool, &mut symbols);
        assert!(matches!(pool.kind(class), TypeKind::Class(_)));
    }

    #[test]
    fn test_template_parse_and_expand() {
        let tpl = OverrideTemplate::parse("console.log($0)").unwrap();
        assert_eq!(tpl.expand(&["\"hi\"".to_string()]), "console.log(\"hi\")");
    }

    #[test]
    fn test_template_default_literal() {
        let tpl = OverrideTemplate::parse("pins.read($0=AnalogPin.P0)").unwrap();
        assert_eq!(tpl.expand(&[]), "pins.read(AnalogPin.P0)");
        assert_eq!(tpl.expand(&["pin1".to_string()]), "pins.read(pin1)");
    }

    #[test]
    fn test_template_optional_drops_separator() {
        let tpl = OverrideTemplate::parse("music.play($0, $1?)").unwrap();
        assert_eq!(tpl.expand(&["m".to_string()]), "music.play(m)");
    }

    #[test]
    fn test_template_quoted_default() {
        let tpl = OverrideTemplate::parse("show($0=\"hello\")").unwrap();
        assert_eq!(tpl.expand(&[]), "show(\"hello\")");
    }

    #[test]
    fn test_template_keeps_multibyte_literal_text() {
        let tpl = OverrideTemplate::parse("basic.showString(\"température: \" + $0)").unwrap();
        assert_eq!(
            tpl.expand(&["t".to_string()]),
            "basic.showString(\"température: \" + t)"
        );
    }

    #[test]
    fn test_malformed_template_fails_closed() {
        assert_eq!(OverrideTemplate::parse("bad($)"), None);
        assert_eq!(OverrideTemplate::parse("bad($0=\"unterminated)"), None);
        assert_eq!(OverrideTemplate::parse("bad($0=)"), None);
    }
}
