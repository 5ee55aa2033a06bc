//! Diagnostics behavior across the pipeline
//!
//! Codes, severities, positions, serialization, and the recovery guarantees
//! around bad input.

use tsubame::diagnostics::Severity;
use tsubame::parser;
use tsubame::{convert_py_to_ts, default_surface, ConvertOptions, ConvertResult};

fn convert(source: &str) -> ConvertResult {
    let surface = default_surface();
    convert_py_to_ts(
        &[("sample.py", source)],
        &surface,
        &ConvertOptions::default(),
    )
}

#[test]
fn test_undefined_name_is_an_error() {
    let result = convert("print(ghost)\n");
    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.code == "TSB-UNDEFINED-NAME")
        .expect("undefined name should be diagnosed");
    assert_eq!(diag.severity, Severity::Error);
    assert!(diag.message.contains("ghost"), "{}", diag.message);
    assert!(!result.success);
}

#[test]
fn test_type_mismatch_names_both_types() {
    let result = convert("x = 1\nx = \"two\"\n");
    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.code == "TSB-TYPE-MISMATCH")
        .expect("reassigning with a different type should be diagnosed");
    assert!(diag.message.contains("number"), "{}", diag.message);
    assert!(diag.message.contains("string"), "{}", diag.message);
}

#[test]
fn test_diagnostics_carry_position_and_file() {
    let source = "x = 1\nprint(ghost)\n";
    let result = convert(source);
    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.code == "TSB-UNDEFINED-NAME")
        .unwrap();
    assert_eq!(diag.file.as_deref(), Some("sample.py"));
    assert_eq!(diag.line, 2);
    let span = diag.span();
    assert_eq!(&source[span.start as usize..span.end as usize], "ghost");
}

#[test]
fn test_json_output_is_parseable() {
    let result = convert("x = 1\nx = \"two\"\n");
    let json = result.diagnostics.to_json();
    let value: serde_json::Value = serde_json::from_str(&json).expect("diagnostics JSON");
    let diags = value["diagnostics"].as_array().expect("diagnostics array");
    assert!(diags
        .iter()
        .any(|d| d["code"] == "TSB-TYPE-MISMATCH" && d["severity"] == "error"));
}

#[test]
fn test_text_output_one_line_per_diagnostic() {
    let result = convert("print(ghost)\n");
    let text = result.diagnostics.to_text();
    assert!(
        text.starts_with("[TSB-UNDEFINED-NAME] sample.py:1:"),
        "{text}"
    );
}

/// One bad line in an otherwise valid file: one diagnostic group, every
/// other statement still in the tree.
#[test]
fn test_resync_preserves_surrounding_statements() {
    let clean = "a = 1\nb = 2\nc = 3\n";
    let broken = "a = 1\nb = = 2\nc = 3\n";
    let parsed_clean = parser::parse(clean, None);
    let parsed_broken = parser::parse(broken, None);
    assert_eq!(parsed_clean.diagnostics.error_count(), 0);
    assert!(parsed_broken.diagnostics.error_count() >= 1);
    // a and c parse exactly as before; only the bad line differs
    assert_eq!(parsed_broken.body.len(), parsed_clean.body.len());
    let assigned_name = |parsed: &parser::ParsedFile, stmt: parser::NodeId| -> String {
        let parser::NodeKind::Assign { targets, .. } = parsed.ast.kind(stmt) else {
            panic!("expected an assignment");
        };
        let parser::NodeKind::Name { id } = parsed.ast.kind(targets[0]) else {
            panic!("expected a name target");
        };
        id.clone()
    };
    assert_eq!(assigned_name(&parsed_broken, parsed_broken.body[0]), "a");
    assert_eq!(
        assigned_name(&parsed_broken, *parsed_broken.body.last().unwrap()),
        "c"
    );
}

#[test]
fn test_arity_diagnostics() {
    let source = "\
def add(a, b):
    return a + b

x = add(1, 2, 3)
y = add(1, c=2)
";
    let result = convert(source);
    let arity: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.code == "TSB-ARITY")
        .collect();
    assert!(arity.len() >= 2, "{}", result.diagnostics.to_text());
    assert!(arity.iter().any(|d| d.message.contains("at most")));
    assert!(arity.iter().any(|d| d.message.contains("unknown argument")));
}

#[test]
fn test_nonlocal_without_binding_is_a_scope_error() {
    let source = "\
def f():
    nonlocal ghost
    ghost = 1

f()
f()
";
    let result = convert(source);
    assert!(
        result.diagnostics.iter().any(|d| d.code == "TSB-SCOPE"),
        "{}",
        result.diagnostics.to_text()
    );
}

#[test]
fn test_unsupported_construct_is_diagnosed_not_fatal() {
    let source = "\
items = [1, 2]
del items
x = 5
";
    let result = convert(source);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.code == "TSB-UNSUPPORTED"),
        "{}",
        result.diagnostics.to_text()
    );
    // conversion continues past the unsupported statement
    assert!(result.outputs[0].text.contains("let x: number = 5;"));
}

#[test]
fn test_pass_ceiling_is_a_warning_not_an_error() {
    let source = "\
def f():
    return g()

def g():
    return 1
";
    let surface = default_surface();
    let options = ConvertOptions {
        max_passes: 1,
        ..Default::default()
    };
    let result = convert_py_to_ts(&[("sample.py", source)], &surface, &options);
    let cap = result
        .diagnostics
        .iter()
        .find(|d| d.code == "TSB-FIXPOINT-CAP")
        .expect("pass ceiling should be reported");
    assert_eq!(cap.severity, Severity::Warning);
    assert!(result.success);
}

#[test]
fn test_diagnostic_ceiling_stops_a_hopeless_parse() {
    let mut source = String::new();
    for _ in 0..300 {
        source.push_str("x = = 1\n");
    }
    let result = convert(&source);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == "TSB-TOO-MANY-ERRORS"));
    // the ceiling bounds the list; it does not grow with input size
    assert!(result.diagnostics.len() <= 110);
}

#[test]
fn test_lexer_diagnostics_flow_through() {
    let result = convert("s = \"unterminated\n");
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == "TSB-UNTERMINATED-STRING"));
}
