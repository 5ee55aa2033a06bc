//! Target-language intermediate representation
//!
//! The forward pipeline lowers the Python AST into this tree rather than
//! emitting text directly: sub-phases can rewrite it (loop shaping, helper
//! inlining, accessor grouping) before `output` flattens it. The tree is
//! serde-serializable so the reverse pipeline can consume it as JSON.

pub mod exprs;
pub mod nodes;
pub mod ops;
pub mod output;

pub use exprs::{ArrowBody, TsExpr, TsExprKind};
pub use nodes::{Accessor, LoopCmp, TsFunction, TsParam, TsStmt, TsStmtKind};
pub use ops::{TsBinOp, TsUnaryOp};
pub use output::{flatten, render_expr, SourceMapEntry};
