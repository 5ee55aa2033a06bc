//! AST definitions - arena-allocated Python syntax tree
//!
//! Nodes live in a flat `Vec` inside [`Ast`] and refer to each other by
//! [`NodeId`]. The `parent` link is a plain index assigned in one pass after
//! parsing, so the tree is frozen from then on; per-run annotations (inferred
//! types, resolved symbols) live in side tables owned by the conversion
//! session, never in the nodes themselves.

use crate::span::Span;

/// Index of a node in its [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One AST node: a tagged production plus its source span and parent link.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Parent node, or `None` for top-level statements.
    pub parent: Option<NodeId>,
}

/// Function/lambda parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<NodeId>,
    pub default: Option<NodeId>,
    pub span: Span,
}

/// One `except` clause of a `try` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    pub exc_type: Option<NodeId>,
    pub name: Option<String>,
    pub body: Vec<NodeId>,
    pub span: Span,
}

/// One `for ... in ... [if ...]` clause of a comprehension.
#[derive(Debug, Clone, PartialEq)]
pub struct CompClause {
    pub target: NodeId,
    pub iter: NodeId,
    pub conditions: Vec<NodeId>,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    MatMul,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Comparison operators (chainable)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    Invert,
}

/// `and` / `or`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

/// Comprehension flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompKind {
    List,
    Set,
    Generator,
}

/// Closed set of grammar productions. Every variant is handled exhaustively
/// by the forward generator; there is no string-keyed dispatch anywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // ----- statements -----
    FunctionDef {
        name: String,
        params: Vec<Param>,
        return_annotation: Option<NodeId>,
        body: Vec<NodeId>,
        decorators: Vec<NodeId>,
        doc: Option<String>,
    },
    ClassDef {
        name: String,
        bases: Vec<NodeId>,
        body: Vec<NodeId>,
        decorators: Vec<NodeId>,
        doc: Option<String>,
    },
    If {
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    While {
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    For {
        target: NodeId,
        iter: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    Try {
        body: Vec<NodeId>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<NodeId>,
        finally: Vec<NodeId>,
    },
    With {
        items: Vec<(NodeId, Option<NodeId>)>,
        body: Vec<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Raise {
        exc: Option<NodeId>,
    },
    Assign {
        targets: Vec<NodeId>,
        value: NodeId,
    },
    AugAssign {
        target: NodeId,
        op: BinOp,
        value: NodeId,
    },
    AnnAssign {
        target: NodeId,
        annotation: NodeId,
        value: Option<NodeId>,
    },
    ExprStmt {
        value: NodeId,
    },
    Global {
        names: Vec<String>,
    },
    Nonlocal {
        names: Vec<String>,
    },
    Import {
        /// (module path, optional alias)
        names: Vec<(String, Option<String>)>,
    },
    ImportFrom {
        module: String,
        names: Vec<(String, Option<String>)>,
    },
    Assert {
        test: NodeId,
        msg: Option<NodeId>,
    },
    Del {
        targets: Vec<NodeId>,
    },
    Pass,
    Break,
    Continue,
    /// Placeholder for a resynchronized region; spans the skipped tokens.
    Error,

    // ----- expressions -----
    Name {
        id: String,
    },
    NumberLit {
        value: f64,
        is_int: bool,
        text: String,
    },
    StringLit {
        value: String,
    },
    FString {
        /// Literal fragments; always `exprs.len() + 1` entries.
        parts: Vec<String>,
        exprs: Vec<NodeId>,
    },
    BoolLit {
        value: bool,
    },
    NoneLit,
    Tuple {
        elts: Vec<NodeId>,
    },
    ListLit {
        elts: Vec<NodeId>,
    },
    SetLit {
        elts: Vec<NodeId>,
    },
    DictLit {
        keys: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    BinExpr {
        op: BinOp,
        left: NodeId,
        right: NodeId,
    },
    BoolExpr {
        op: BoolOpKind,
        values: Vec<NodeId>,
    },
    UnaryExpr {
        op: UnaryOp,
        operand: NodeId,
    },
    Compare {
        left: NodeId,
        ops: Vec<CmpOp>,
        comparators: Vec<NodeId>,
    },
    Call {
        func: NodeId,
        args: Vec<NodeId>,
        keywords: Vec<(String, NodeId)>,
    },
    Attribute {
        value: NodeId,
        attr: String,
    },
    Subscript {
        value: NodeId,
        index: NodeId,
    },
    SliceExpr {
        lower: Option<NodeId>,
        upper: Option<NodeId>,
        step: Option<NodeId>,
    },
    Lambda {
        params: Vec<Param>,
        body: NodeId,
    },
    IfExp {
        test: NodeId,
        body: NodeId,
        orelse: NodeId,
    },
    Comp {
        kind: CompKind,
        elt: NodeId,
        generators: Vec<CompClause>,
    },
    DictComp {
        key: NodeId,
        value: NodeId,
        generators: Vec<CompClause>,
    },
    Starred {
        value: NodeId,
    },
}

/// Arena holding every node of one parsed file.
#[derive(Debug, Default, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a node, in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        collect_children(self.kind(id), &mut out);
        out
    }

    /// Assign parent links by walking down from the given roots. Called once
    /// by the parser after the tree is complete.
    pub fn assign_parents(&mut self, roots: &[NodeId]) {
        let mut stack: Vec<NodeId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            for child in self.children(id) {
                self.nodes[child.index()].parent = Some(id);
                stack.push(child);
            }
        }
    }

    /// Innermost node whose span contains `offset`, preferring deeper nodes.
    /// Used by the IDE query entry point.
    pub fn node_at(&self, roots: &[NodeId], offset: u32) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        let mut stack: Vec<NodeId> = roots.to_vec();
        while let Some(id) = stack.pop() {
            let span = self.span(id);
            if span.start <= offset && offset <= span.end {
                let better = match best {
                    Some(b) => self.span(b).len() >= span.len(),
                    None => true,
                };
                if better {
                    best = Some(id);
                }
                stack.extend(self.children(id));
            }
        }
        best
    }
}

fn collect_children(kind: &NodeKind, out: &mut Vec<NodeId>) {
    use NodeKind::*;
    match kind {
        FunctionDef {
            params,
            return_annotation,
            body,
            decorators,
            ..
        } => {
            out.extend(decorators.iter().copied());
            for p in params {
                out.extend(p.annotation);
                out.extend(p.default);
            }
            out.extend(return_annotation.iter().copied());
            out.extend(body.iter().copied());
        }
        ClassDef {
            bases,
            body,
            decorators,
            ..
        } => {
            out.extend(decorators.iter().copied());
            out.extend(bases.iter().copied());
            out.extend(body.iter().copied());
        }
        If { test, body, orelse } | While { test, body, orelse } => {
            out.push(*test);
            out.extend(body.iter().copied());
            out.extend(orelse.iter().copied());
        }
        For {
            target,
            iter,
            body,
            orelse,
        } => {
            out.push(*target);
            out.push(*iter);
            out.extend(body.iter().copied());
            out.extend(orelse.iter().copied());
        }
        Try {
            body,
            handlers,
            orelse,
            finally,
        } => {
            out.extend(body.iter().copied());
            for h in handlers {
                out.extend(h.exc_type);
                out.extend(h.body.iter().copied());
            }
            out.extend(orelse.iter().copied());
            out.extend(finally.iter().copied());
        }
        With { items, body } => {
            for (ctx, alias) in items {
                out.push(*ctx);
                out.extend(*alias);
            }
            out.extend(body.iter().copied());
        }
        Return { value } => out.extend(*value),
        Raise { exc } => out.extend(*exc),
        Assign { targets, value } => {
            out.extend(targets.iter().copied());
            out.push(*value);
        }
        AugAssign { target, value, .. } => {
            out.push(*target);
            out.push(*value);
        }
        AnnAssign {
            target,
            annotation,
            value,
        } => {
            out.push(*target);
            out.push(*annotation);
            out.extend(*value);
        }
        ExprStmt { value } => out.push(*value),
        Assert { test, msg } => {
            out.push(*test);
            out.extend(*msg);
        }
        Del { targets } => out.extend(targets.iter().copied()),
        Global { .. } | Nonlocal { .. } | Import { .. } | ImportFrom { .. } | Pass | Break
        | Continue | Error => {}
        Name { .. } | NumberLit { .. } | StringLit { .. } | BoolLit { .. } | NoneLit => {}
        FString { exprs, .. } => out.extend(exprs.iter().copied()),
        Tuple { elts } | ListLit { elts } | SetLit { elts } => out.extend(elts.iter().copied()),
        DictLit { keys, values } => {
            out.extend(keys.iter().copied());
            out.extend(values.iter().copied());
        }
        BinExpr { left, right, .. } => {
            out.push(*left);
            out.push(*right);
        }
        BoolExpr { values, .. } => out.extend(values.iter().copied()),
        UnaryExpr { operand, .. } => out.push(*operand),
        Compare {
            left, comparators, ..
        } => {
            out.push(*left);
            out.extend(comparators.iter().copied());
        }
        Call {
            func,
            args,
            keywords,
        } => {
            out.push(*func);
            out.extend(args.iter().copied());
            out.extend(keywords.iter().map(|(_, v)| *v));
        }
        Attribute { value, .. } => out.push(*value),
        Subscript { value, index } => {
            out.push(*value);
            out.push(*index);
        }
        SliceExpr { lower, upper, step } => {
            out.extend(*lower);
            out.extend(*upper);
            out.extend(*step);
        }
        Lambda { params, body } => {
            for p in params {
                out.extend(p.annotation);
                out.extend(p.default);
            }
            out.push(*body);
        }
        IfExp { test, body, orelse } => {
            out.push(*test);
            out.push(*body);
            out.push(*orelse);
        }
        Comp { elt, generators, .. } => {
            out.push(*elt);
            for g in generators {
                out.push(g.target);
                out.push(g.iter);
                out.extend(g.conditions.iter().copied());
            }
        }
        DictComp {
            key,
            value,
            generators,
        } => {
            out.push(*key);
            out.push(*value);
            for g in generators {
                out.push(g.target);
                out.push(g.iter);
                out.extend(g.conditions.iter().copied());
            }
        }
        Starred { value } => out.push(*value),
    }
}
