//! Python emitter tests

use crate::error::ConvertError;
use crate::ir::{
    ArrowBody, LoopCmp, TsBinOp, TsExpr, TsExprKind, TsFunction, TsParam, TsStmt, TsStmtKind,
    TsUnaryOp,
};
use crate::pyemit::{emit, PyEmitOptions};
use pretty_assertions::assert_eq;

fn stmt(kind: TsStmtKind) -> TsStmt {
    TsStmt::new(kind)
}

fn let_stmt(name: &str, init: Option<TsExpr>) -> TsStmt {
    stmt(TsStmtKind::Let {
        name: name.to_string(),
        ty: None,
        init,
    })
}

fn assign(name: &str, value: TsExpr) -> TsStmt {
    stmt(TsStmtKind::Assign {
        target: TsExpr::ident(name),
        op: None,
        value,
    })
}

fn expr_stmt(expr: TsExpr) -> TsStmt {
    stmt(TsStmtKind::ExprStmt(expr))
}

fn run(stmts: &[TsStmt]) -> String {
    emit(stmts, &PyEmitOptions::default()).unwrap()
}

#[test]
fn test_let_and_assign() {
    let program = vec![
        let_stmt("x", Some(TsExpr::number("10"))),
        assign("x", TsExpr::number("20")),
    ];
    assert_eq!(run(&program), "x = 10\nx = 20\n");
}

#[test]
fn test_let_without_init_becomes_none() {
    let program = vec![let_stmt("x", None)];
    assert_eq!(run(&program), "x = None\n");
}

#[test]
fn test_if_elif_else_chain() {
    let inner = stmt(TsStmtKind::If {
        test: TsExpr::binary(TsBinOp::Lt, TsExpr::ident("x"), TsExpr::number("0")),
        then: vec![expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("console"), "log"),
            vec![TsExpr::string("neg")],
        ))],
        els: vec![expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("console"), "log"),
            vec![TsExpr::string("zero")],
        ))],
    });
    let program = vec![stmt(TsStmtKind::If {
        test: TsExpr::binary(TsBinOp::Gt, TsExpr::ident("x"), TsExpr::number("0")),
        then: vec![expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("console"), "log"),
            vec![TsExpr::string("pos")],
        ))],
        els: vec![inner],
    })];
    assert_eq!(
        run(&program),
        "if x > 0:\n    print(\"pos\")\nelif x < 0:\n    print(\"neg\")\nelse:\n    print(\"zero\")\n"
    );
}

#[test]
fn test_counted_loop_to_range() {
    let program = vec![stmt(TsStmtKind::ForCounted {
        var: "i".to_string(),
        init: TsExpr::number("0"),
        cmp: LoopCmp::Lt,
        limit: TsExpr::number("10"),
        step: TsExpr::number("1"),
        body: vec![expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("console"), "log"),
            vec![TsExpr::ident("i")],
        ))],
    })];
    assert_eq!(run(&program), "for i in range(10):\n    print(i)\n");
}

#[test]
fn test_counted_loop_negative_step() {
    let program = vec![stmt(TsStmtKind::ForCounted {
        var: "i".to_string(),
        init: TsExpr::number("10"),
        cmp: LoopCmp::Gt,
        limit: TsExpr::number("0"),
        step: TsExpr::number("-1"),
        body: vec![],
    })];
    assert_eq!(run(&program), "for i in range(10, 0, -1):\n    pass\n");
}

#[test]
fn test_for_of_loop() {
    let program = vec![stmt(TsStmtKind::ForOf {
        var: "item".to_string(),
        iter: TsExpr::ident("items"),
        body: vec![expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("console"), "log"),
            vec![TsExpr::ident("item")],
        ))],
    })];
    assert_eq!(run(&program), "for item in items:\n    print(item)\n");
}

#[test]
fn test_template_literal_to_fstring() {
    let program = vec![expr_stmt(TsExpr::new(TsExprKind::TemplateLit {
        parts: vec!["hello ".to_string(), "!".to_string()],
        exprs: vec![TsExpr::ident("name")],
    }))];
    assert_eq!(run(&program), "f\"hello {name}!\"\n");
}

#[test]
fn test_logical_ops_become_words() {
    let program = vec![expr_stmt(TsExpr::binary(
        TsBinOp::And,
        TsExpr::ident("a"),
        TsExpr::new(TsExprKind::Unary {
            op: TsUnaryOp::Not,
            operand: Box::new(TsExpr::ident("b")),
        }),
    ))];
    assert_eq!(run(&program), "a and not b\n");
}

#[test]
fn test_strict_equality_relaxed() {
    let program = vec![expr_stmt(TsExpr::binary(
        TsBinOp::Or,
        TsExpr::binary(TsBinOp::Eq, TsExpr::ident("a"), TsExpr::number("1")),
        TsExpr::binary(TsBinOp::NotEq, TsExpr::ident("b"), TsExpr::number("2")),
    ))];
    assert_eq!(run(&program), "a == 1 or b != 2\n");
}

#[test]
fn test_math_pow_and_idiv() {
    let program = vec![
        expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("Math"), "pow"),
            vec![TsExpr::ident("x"), TsExpr::number("2")],
        )),
        expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("Math"), "idiv"),
            vec![TsExpr::ident("x"), TsExpr::number("3")],
        )),
    ];
    assert_eq!(run(&program), "x ** 2\nx // 3\n");
}

#[test]
fn test_math_functions_need_import() {
    let program = vec![expr_stmt(TsExpr::call(
        TsExpr::member(TsExpr::ident("Math"), "sqrt"),
        vec![TsExpr::ident("x")],
    ))];
    assert_eq!(run(&program), "import math\n\nmath.sqrt(x)\n");
}

#[test]
fn test_random_range_import() {
    let program = vec![expr_stmt(TsExpr::call(
        TsExpr::member(TsExpr::ident("Math"), "randomRange"),
        vec![TsExpr::number("1"), TsExpr::number("6")],
    ))];
    assert_eq!(run(&program), "import random\n\nrandom.randint(1, 6)\n");
}

#[test]
fn test_length_member_becomes_len() {
    let program = vec![expr_stmt(TsExpr::member(TsExpr::ident("items"), "length"))];
    assert_eq!(run(&program), "len(items)\n");
}

#[test]
fn test_method_renames() {
    let program = vec![
        expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("items"), "push"),
            vec![TsExpr::number("1")],
        )),
        expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("s"), "toUpperCase"),
            vec![],
        )),
        expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("s"), "charAt"),
            vec![TsExpr::number("0")],
        )),
    ];
    assert_eq!(run(&program), "items.append(1)\ns.upper()\ns[0]\n");
}

#[test]
fn test_switch_becomes_if_chain() {
    let program = vec![stmt(TsStmtKind::Switch {
        disc: TsExpr::ident("k"),
        cases: vec![
            (
                Some(TsExpr::number("1")),
                vec![assign("r", TsExpr::string("one")), stmt(TsStmtKind::Break)],
            ),
            (
                Some(TsExpr::number("2")),
                vec![assign("r", TsExpr::string("two")), stmt(TsStmtKind::Break)],
            ),
            (None, vec![assign("r", TsExpr::string("other"))]),
        ],
    })];
    assert_eq!(
        run(&program),
        "if k == 1:\n    r = \"one\"\nelif k == 2:\n    r = \"two\"\nelse:\n    r = \"other\"\n"
    );
}

#[test]
fn test_incr_and_decr() {
    let program = vec![
        stmt(TsStmtKind::Incr {
            target: TsExpr::ident("i"),
            negative: false,
        }),
        stmt(TsStmtKind::Incr {
            target: TsExpr::ident("j"),
            negative: true,
        }),
    ];
    assert_eq!(run(&program), "i += 1\nj -= 1\n");
}

#[test]
fn test_throw_error_becomes_raise_exception() {
    let program = vec![stmt(TsStmtKind::Throw(TsExpr::new(TsExprKind::New {
        callee: Box::new(TsExpr::ident("Error")),
        args: vec![TsExpr::string("boom")],
    })))];
    assert_eq!(run(&program), "raise Exception(\"boom\")\n");
}

#[test]
fn test_try_catch_finally() {
    let program = vec![stmt(TsStmtKind::Try {
        body: vec![assign("x", TsExpr::number("1"))],
        catch: Some((
            "e".to_string(),
            vec![expr_stmt(TsExpr::call(
                TsExpr::member(TsExpr::ident("console"), "log"),
                vec![TsExpr::ident("e")],
            ))],
        )),
        finally: vec![assign("done", TsExpr::bool(true))],
    })];
    assert_eq!(
        run(&program),
        "try:\n    x = 1\nexcept Exception as e:\n    print(e)\nfinally:\n    done = True\n"
    );
}

#[test]
fn test_nonlocal_for_enclosing_assignment() {
    let inner = TsFunction {
        name: "inner".to_string(),
        params: vec![],
        ret: None,
        body: vec![assign("count", TsExpr::number("1"))],
        doc: None,
        is_static: false,
        accessor: None,
    };
    let outer = TsFunction {
        name: "outer".to_string(),
        params: vec![],
        ret: None,
        body: vec![
            let_stmt("count", Some(TsExpr::number("0"))),
            stmt(TsStmtKind::Function(inner)),
        ],
        doc: None,
        is_static: false,
        accessor: None,
    };
    let text = run(&[stmt(TsStmtKind::Function(outer))]);
    assert_eq!(
        text,
        "def outer():\n    count = 0\n    def inner():\n        nonlocal count\n        count = 1\n"
    );
}

#[test]
fn test_global_for_module_assignment() {
    let f = TsFunction {
        name: "bump".to_string(),
        params: vec![],
        ret: None,
        body: vec![stmt(TsStmtKind::Incr {
            target: TsExpr::ident("total"),
            negative: false,
        })],
        doc: None,
        is_static: false,
        accessor: None,
    };
    let program = vec![
        let_stmt("total", Some(TsExpr::number("0"))),
        stmt(TsStmtKind::Function(f)),
    ];
    assert_eq!(
        run(&program),
        "total = 0\ndef bump():\n    global total\n    total += 1\n"
    );
}

#[test]
fn test_keyword_rename_is_stable() {
    let program = vec![
        let_stmt("lambda", Some(TsExpr::number("1"))),
        assign("lambda", TsExpr::number("2")),
        expr_stmt(TsExpr::call(
            TsExpr::member(TsExpr::ident("console"), "log"),
            vec![TsExpr::ident("lambda")],
        )),
    ];
    assert_eq!(run(&program), "lambda_ = 1\nlambda_ = 2\nprint(lambda_)\n");
}

#[test]
fn test_class_with_constructor_and_method() {
    let ctor = stmt(TsStmtKind::Constructor {
        params: vec![TsParam {
            name: "name".to_string(),
            ty: Some("string".to_string()),
            default: None,
        }],
        body: vec![stmt(TsStmtKind::Assign {
            target: TsExpr::member(TsExpr::ident("this"), "name"),
            op: None,
            value: TsExpr::ident("name"),
        })],
    });
    let speak = stmt(TsStmtKind::Function(TsFunction {
        name: "speak".to_string(),
        params: vec![],
        ret: None,
        body: vec![stmt(TsStmtKind::Return(Some(TsExpr::member(
            TsExpr::ident("this"),
            "name",
        ))))],
        doc: None,
        is_static: false,
        accessor: None,
    }));
    let program = vec![stmt(TsStmtKind::Class {
        name: "Dog".to_string(),
        extends: None,
        members: vec![
            stmt(TsStmtKind::Field {
                name: "name".to_string(),
                ty: Some("string".to_string()),
                init: None,
            }),
            ctor,
            speak,
        ],
        doc: None,
    })];
    assert_eq!(
        run(&program),
        "class Dog:\n    def __init__(self, name):\n        self.name = name\n\n    def speak(self):\n        return self.name\n"
    );
}

#[test]
fn test_arrow_becomes_lambda() {
    let program = vec![expr_stmt(TsExpr::call(
        TsExpr::member(TsExpr::ident("items"), "filter"),
        vec![TsExpr::new(TsExprKind::Arrow {
            params: vec!["x".to_string()],
            body: ArrowBody::Expr(Box::new(TsExpr::binary(
                TsBinOp::Gt,
                TsExpr::ident("x"),
                TsExpr::number("0"),
            ))),
        })],
    ))];
    assert_eq!(run(&program), "items.filter(lambda x: x > 0)\n");
}

#[test]
fn test_arrow_rejected_when_gated() {
    let program = vec![expr_stmt(TsExpr::new(TsExprKind::Arrow {
        params: vec!["x".to_string()],
        body: ArrowBody::Expr(Box::new(TsExpr::ident("x"))),
    }))];
    let opts = PyEmitOptions {
        allow_lambda: false,
        ..Default::default()
    };
    let err = emit(&program, &opts).unwrap_err();
    assert!(matches!(err, ConvertError::Unsupported { .. }));
}

#[test]
fn test_class_rejected_when_gated() {
    let program = vec![stmt(TsStmtKind::Class {
        name: "Dog".to_string(),
        extends: None,
        members: vec![],
        doc: None,
    })];
    let opts = PyEmitOptions {
        allow_classes: false,
        ..Default::default()
    };
    let err = emit(&program, &opts).unwrap_err();
    assert!(matches!(err, ConvertError::Unsupported { .. }));
}

#[test]
fn test_raw_statement_rejected() {
    let program = vec![stmt(TsStmtKind::Raw("/* opaque */".to_string()))];
    let err = emit(&program, &PyEmitOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::Unsupported { .. }));
}

#[test]
fn test_instanceof_becomes_isinstance() {
    let program = vec![expr_stmt(TsExpr::binary(
        TsBinOp::Instanceof,
        TsExpr::ident("d"),
        TsExpr::ident("Dog"),
    ))];
    assert_eq!(run(&program), "isinstance(d, Dog)\n");
}

#[test]
fn test_conditional_expression() {
    let program = vec![expr_stmt(TsExpr::new(TsExprKind::Conditional {
        test: Box::new(TsExpr::binary(
            TsBinOp::Gt,
            TsExpr::ident("x"),
            TsExpr::number("0"),
        )),
        cons: Box::new(TsExpr::string("pos")),
        alt: Box::new(TsExpr::string("neg")),
    }))];
    assert_eq!(run(&program), "\"pos\" if x > 0 else \"neg\"\n");
}

#[test]
fn test_precedence_parenthesization() {
    // (a + b) * c keeps its parens
    let program = vec![expr_stmt(TsExpr::binary(
        TsBinOp::Mul,
        TsExpr::binary(TsBinOp::Add, TsExpr::ident("a"), TsExpr::ident("b")),
        TsExpr::ident("c"),
    ))];
    assert_eq!(run(&program), "(a + b) * c\n");
}
