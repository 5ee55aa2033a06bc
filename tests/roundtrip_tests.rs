//! Round-trip tests
//!
//! Forward conversion produces the statement IR; the reverse emitter turns
//! that IR back into Python. These tests check that structure survives the
//! trip and that the reverse direction honors its own contract.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tsubame::ir::{TsExpr, TsStmt, TsStmtKind};
use tsubame::semantic::ApiSurface;
use tsubame::tsgen;
use tsubame::{convert_ts_to_py, default_surface, ConvertOptions, PyEmitOptions};

fn forward(source: &str) -> Vec<TsStmt> {
    let surface: Arc<ApiSurface> = default_surface();
    let result = tsgen::generate(source, Some("input.py"), &surface, &ConvertOptions::default());
    assert!(
        !result.diagnostics.has_errors(),
        "{}",
        result.diagnostics.to_text()
    );
    result.stmts
}

fn reverse(stmts: &[TsStmt]) -> String {
    convert_ts_to_py(stmts, &PyEmitOptions::default()).expect("reverse emission")
}

#[test]
fn test_function_and_call_round_trip() {
    let source = "\
def add(a, b):
    return a + b

total = add(2, 3)
";
    let python = reverse(&forward(source));
    assert_eq!(python, "def add(a, b):\n    return a + b\ntotal = add(2, 3)\n");
}

#[test]
fn test_counted_loop_round_trip() {
    let source = "\
total = 0
for i in range(5):
    total += i
";
    let python = reverse(&forward(source));
    assert_eq!(python, "total = 0\nfor i in range(5):\n    total += i\n");
}

#[test]
fn test_conditional_round_trip() {
    let source = "\
x = 3
if x > 2:
    y = 1
elif x > 1:
    y = 2
else:
    y = 3
";
    let python = reverse(&forward(source));
    assert!(python.contains("if x > 2:"), "{python}");
    assert!(python.contains("elif x > 1:"), "{python}");
    assert!(python.contains("else:"), "{python}");
}

#[test]
fn test_class_round_trip() {
    let source = "\
class Dog:
    def __init__(self, name):
        self.name = name

    def speak(self):
        return self.name

d = Dog(\"rex\")
";
    let python = reverse(&forward(source));
    assert!(python.contains("class Dog:"), "{python}");
    assert!(python.contains("def __init__(self, name):"), "{python}");
    assert!(python.contains("self.name = name"), "{python}");
    assert!(python.contains("def speak(self):"), "{python}");
    assert!(python.contains("return self.name"), "{python}");
    assert!(python.contains("d = Dog(\"rex\")"), "{python}");
}

#[test]
fn test_fstring_round_trip() {
    let source = "name = \"world\"\ns = f\"hi {name}!\"\n";
    let python = reverse(&forward(source));
    assert!(python.contains("s = f\"hi {name}!\""), "{python}");
}

/// Converting Python forward, reverse-emitting, and converting forward again
/// reaches the same target text: the trip is stable after one cycle.
#[test]
fn test_second_forward_pass_is_stable() {
    let source = "\
def double(n):
    return n * 2

value = double(21)
";
    let stmts = forward(source);
    let (first_text, _) = tsubame::ir::flatten(&stmts);
    let python = reverse(&stmts);
    let stmts_again = forward(&python);
    let (second_text, _) = tsubame::ir::flatten(&stmts_again);
    assert_eq!(first_text, second_text);
}

/// Assigning to an enclosing function's variable emits `nonlocal` for
/// exactly that variable.
#[test]
fn test_nonlocal_emitted_for_enclosing_binding() {
    let source = "\
def counter():
    count = 0
    def bump():
        nonlocal count
        count = count + 1
    bump()
    bump()
    return count

total = counter()
";
    let python = reverse(&forward(source));
    assert!(python.contains("nonlocal count"), "{python}");
    assert!(!python.contains("global count"), "{python}");
}

/// Identifiers that collide with Python keywords rename consistently
/// throughout the file.
#[test]
fn test_keyword_collisions_rename_consistently() {
    let stmts = vec![
        TsStmt::new(TsStmtKind::Let {
            name: "class".to_string(),
            ty: None,
            init: Some(TsExpr::number("1")),
        }),
        TsStmt::new(TsStmtKind::Assign {
            target: TsExpr::ident("class"),
            op: None,
            value: TsExpr::binary(
                tsubame::ir::TsBinOp::Add,
                TsExpr::ident("class"),
                TsExpr::number("1"),
            ),
        }),
    ];
    let python = convert_ts_to_py(&stmts, &PyEmitOptions::default()).unwrap();
    assert_eq!(python, "class_ = 1\nclass_ = class_ + 1\n");
}

#[test]
fn test_reverse_rejects_raw_fragments() {
    let stmts = vec![TsStmt::new(TsStmtKind::Raw("declare const x;".to_string()))];
    let err = convert_ts_to_py(&stmts, &PyEmitOptions::default()).unwrap_err();
    assert!(matches!(err, tsubame::ConvertError::Unsupported { .. }));
}

#[test]
fn test_ir_survives_json_serialization() {
    let source = "\
x = 1
if x > 0:
    x += 1
";
    let stmts = forward(source);
    let json = serde_json::to_string(&stmts).unwrap();
    let decoded: Vec<TsStmt> = serde_json::from_str(&json).unwrap();
    assert_eq!(reverse(&stmts), reverse(&decoded));
}
