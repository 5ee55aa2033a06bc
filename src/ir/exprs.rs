//! IR expression definitions
//!
//! Target-language expressions. Every node optionally carries the Python
//! source span it was lowered from; the output flattener records a
//! `{pythonRange, targetRange}` source-map pair for each span-carrying node.

use super::ops::{TsBinOp, TsUnaryOp};
use crate::span::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsExpr {
    pub kind: TsExprKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub py_span: Option<Span>,
}

impl TsExpr {
    pub fn new(kind: TsExprKind) -> Self {
        Self {
            kind,
            py_span: None,
        }
    }

    pub fn spanned(kind: TsExprKind, span: Span) -> Self {
        Self {
            kind,
            py_span: Some(span),
        }
    }

    pub fn ident(name: &str) -> Self {
        Self::new(TsExprKind::Ident(name.to_string()))
    }

    pub fn number(text: &str) -> Self {
        Self::new(TsExprKind::NumberLit(text.to_string()))
    }

    pub fn string(value: &str) -> Self {
        Self::new(TsExprKind::StringLit(value.to_string()))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(TsExprKind::BoolLit(value))
    }

    pub fn binary(op: TsBinOp, left: TsExpr, right: TsExpr) -> Self {
        Self::new(TsExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn call(callee: TsExpr, args: Vec<TsExpr>) -> Self {
        Self::new(TsExprKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    pub fn member(obj: TsExpr, prop: &str) -> Self {
        Self::new(TsExprKind::Member {
            obj: Box::new(obj),
            prop: prop.to_string(),
        })
    }

    /// Raw pre-rendered text, used for override-template expansions and
    /// "not yet supported" markers.
    pub fn raw(text: String) -> Self {
        Self::new(TsExprKind::Raw(text))
    }
}

/// Arrow-function body: a single expression or a statement block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrowBody {
    Expr(Box<TsExpr>),
    Block(Vec<super::nodes::TsStmt>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TsExprKind {
    Ident(String),
    /// Numeric literal text, echoed verbatim.
    NumberLit(String),
    StringLit(String),
    /// Template literal; `parts.len() == exprs.len() + 1`.
    TemplateLit {
        parts: Vec<String>,
        exprs: Vec<TsExpr>,
    },
    BoolLit(bool),
    Null,
    Undefined,
    Binary {
        op: TsBinOp,
        left: Box<TsExpr>,
        right: Box<TsExpr>,
    },
    Unary {
        op: TsUnaryOp,
        operand: Box<TsExpr>,
    },
    Conditional {
        test: Box<TsExpr>,
        cons: Box<TsExpr>,
        alt: Box<TsExpr>,
    },
    Call {
        callee: Box<TsExpr>,
        args: Vec<TsExpr>,
    },
    New {
        callee: Box<TsExpr>,
        args: Vec<TsExpr>,
    },
    Member {
        obj: Box<TsExpr>,
        prop: String,
    },
    Index {
        obj: Box<TsExpr>,
        index: Box<TsExpr>,
    },
    ArrayLit(Vec<TsExpr>),
    /// String-keyed object literal (from Python dict literals).
    ObjectLit(Vec<(String, TsExpr)>),
    Arrow {
        params: Vec<String>,
        body: ArrowBody,
    },
    /// Pre-rendered text spliced into the output verbatim.
    Raw(String),
}

impl TsExprKind {
    /// Precedence of the produced expression, for parenthesization.
    pub fn precedence(&self) -> u8 {
        match self {
            TsExprKind::Arrow { .. } => 0,
            TsExprKind::Conditional { .. } => 1,
            TsExprKind::Binary { op, .. } => op.precedence(),
            TsExprKind::Unary { .. } => 11,
            TsExprKind::New { .. } => 12,
            TsExprKind::Call { .. }
            | TsExprKind::Member { .. }
            | TsExprKind::Index { .. } => 13,
            _ => 14,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_helpers() {
        let e = TsExpr::binary(TsBinOp::Add, TsExpr::ident("a"), TsExpr::number("1"));
        match e.kind {
            TsExprKind::Binary { op, .. } => assert_eq!(op, TsBinOp::Add),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let e = TsExpr::spanned(
            TsExprKind::Member {
                obj: Box::new(TsExpr::ident("console")),
                prop: "log".to_string(),
            },
            Span::new(0, 5),
        );
        let json = serde_json::to_string(&e).unwrap();
        let back: TsExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
