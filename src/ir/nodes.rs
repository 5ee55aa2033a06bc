//! IR statement definitions

use super::exprs::TsExpr;
use super::ops::TsBinOp;
use crate::span::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsStmt {
    pub kind: TsStmtKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub py_span: Option<Span>,
}

impl TsStmt {
    pub fn new(kind: TsStmtKind) -> Self {
        Self {
            kind,
            py_span: None,
        }
    }

    pub fn spanned(kind: TsStmtKind, span: Span) -> Self {
        Self {
            kind,
            py_span: Some(span),
        }
    }
}

/// Direction of a counted `for` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopCmp {
    /// `i < limit` (ascending)
    Lt,
    /// `i > limit` (descending)
    Gt,
}

/// Class-member accessor flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accessor {
    Get,
    Set,
}

/// A function/method parameter with an optional rendered type annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<TsExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsFunction {
    pub name: String,
    pub params: Vec<TsParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<String>,
    pub body: Vec<TsStmt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessor: Option<Accessor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TsStmtKind {
    ExprStmt(TsExpr),
    /// `let name: ty = init;` — `init` may be absent for hoisted
    /// declarations.
    Let {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ty: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<TsExpr>,
    },
    /// `target op= value;` / `target = value;`
    Assign {
        target: TsExpr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        op: Option<TsBinOp>,
        value: TsExpr,
    },
    If {
        test: TsExpr,
        then: Vec<TsStmt>,
        els: Vec<TsStmt>,
    },
    While {
        test: TsExpr,
        body: Vec<TsStmt>,
    },
    /// `for (let var = init; var cmp limit; var += step) { ... }`
    ForCounted {
        var: String,
        init: TsExpr,
        cmp: LoopCmp,
        limit: TsExpr,
        step: TsExpr,
        body: Vec<TsStmt>,
    },
    /// `for (const var of iter) { ... }`
    ForOf {
        var: String,
        iter: TsExpr,
        body: Vec<TsStmt>,
    },
    Function(TsFunction),
    Class {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extends: Option<String>,
        /// Field declarations then constructor then methods.
        members: Vec<TsStmt>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        doc: Option<String>,
    },
    /// `constructor(params) { ... }`
    Constructor {
        params: Vec<TsParam>,
        body: Vec<TsStmt>,
    },
    /// Class field declaration (`name: ty` or with initializer).
    Field {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ty: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<TsExpr>,
    },
    Return(#[serde(default)] Option<TsExpr>),
    Break,
    Continue,
    Throw(TsExpr),
    Try {
        body: Vec<TsStmt>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        catch: Option<(String, Vec<TsStmt>)>,
        #[serde(default)]
        finally: Vec<TsStmt>,
    },
    /// `switch` over a discriminant; a `None` test is the `default` case.
    Switch {
        disc: TsExpr,
        cases: Vec<(Option<TsExpr>, Vec<TsStmt>)>,
    },
    /// Postfix `target++;` / `target--;`
    Incr {
        target: TsExpr,
        negative: bool,
    },
    /// `// text` line comment.
    Comment(String),
    /// A nested block scope (from inlined helper calls).
    Block(Vec<TsStmt>),
    /// Pre-rendered line spliced verbatim.
    Raw(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_roundtrip_statement() {
        let stmt = TsStmt::new(TsStmtKind::Let {
            name: "x".to_string(),
            ty: Some("number".to_string()),
            init: Some(TsExpr::number("10")),
        });
        let json = serde_json::to_string(&stmt).unwrap();
        let back: TsStmt = serde_json::from_str(&json).unwrap();
        assert_eq!(stmt, back);
    }

    #[test]
    fn test_for_counted_shape() {
        let stmt = TsStmt::new(TsStmtKind::ForCounted {
            var: "i".to_string(),
            init: TsExpr::number("0"),
            cmp: LoopCmp::Lt,
            limit: TsExpr::number("10"),
            step: TsExpr::number("2"),
            body: vec![],
        });
        match stmt.kind {
            TsStmtKind::ForCounted { cmp, .. } => assert_eq!(cmp, LoopCmp::Lt),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
