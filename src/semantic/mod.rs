//! Semantic analysis module
//!
//! Owns the per-run data the forward generator works over: the type pool and
//! unification ([`types`]), the symbol arena ([`symbol`]), the scope arena
//! ([`scope`]), and the external API surface with its lazy binder ([`api`]).
//! The generator itself lives in `tsgen`; this module has no AST knowledge.

pub mod api;
pub mod builtins;
pub mod scope;
pub mod symbol;
pub mod types;

pub use api::{ApiEntry, ApiKind, ApiParam, ApiSurface, ExternalBinder, OverrideTemplate};
pub use scope::{ScopeArena, ScopeId, ScopeKind};
pub use symbol::{ParamSymbol, Symbol, SymbolId, SymbolKind, SymbolTable, VarUsage};
pub use types::{Assignable, TypeId, TypeKind, TypeMismatch, TypePool};
