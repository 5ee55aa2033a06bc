//! Parser tests
//!
//! Shape checks over the AST arena plus the error-recovery guarantees:
//! a bad statement never takes the rest of the file with it, and the
//! diagnostic ceiling stops a hopeless parse instead of flooding.

use super::*;
use crate::diagnostics::codes;
use pretty_assertions::assert_eq;

fn has_code(parsed: &ParsedFile, code: &str) -> bool {
    parsed.diagnostics.iter().any(|d| d.code == code)
}

#[test]
fn test_simple_assignment_shape() {
    let parsed = parse("x = 1\n", None);
    assert!(!parsed.diagnostics.has_errors());
    assert_eq!(parsed.body.len(), 1);
    let NodeKind::Assign { targets, value } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected an assignment");
    };
    assert_eq!(targets.len(), 1);
    assert!(matches!(parsed.ast.kind(targets[0]), NodeKind::Name { id } if id == "x"));
    assert!(matches!(
        parsed.ast.kind(*value),
        NodeKind::NumberLit { is_int: true, .. }
    ));
}

#[test]
fn test_function_def_shape() {
    let source = "\
def greet(name: str, times: int = 1) -> None:
    \"\"\"Say hello.\"\"\"
    print(name)
";
    let parsed = parse(source, None);
    assert!(!parsed.diagnostics.has_errors());
    let NodeKind::FunctionDef {
        name,
        params,
        return_annotation,
        body,
        doc,
        ..
    } = parsed.ast.kind(parsed.body[0])
    else {
        panic!("expected a function definition");
    };
    assert_eq!(name, "greet");
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name, "name");
    assert!(params[0].annotation.is_some());
    assert!(params[0].default.is_none());
    assert_eq!(params[1].name, "times");
    assert!(params[1].default.is_some());
    assert!(return_annotation.is_some());
    assert_eq!(doc.as_deref(), Some("Say hello."));
    // the docstring is consumed, leaving one body statement
    assert_eq!(body.len(), 1);
}

#[test]
fn test_if_elif_else_nests_in_orelse() {
    let source = "\
if a:
    x = 1
elif b:
    x = 2
else:
    x = 3
";
    let parsed = parse(source, None);
    assert!(!parsed.diagnostics.has_errors());
    let NodeKind::If { orelse, .. } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected an if statement");
    };
    assert_eq!(orelse.len(), 1);
    let NodeKind::If { orelse: inner, .. } = parsed.ast.kind(orelse[0]) else {
        panic!("elif should parse as a nested if");
    };
    assert_eq!(inner.len(), 1);
}

#[test]
fn test_operator_precedence() {
    let parsed = parse("x = 1 + 2 * 3\n", None);
    let NodeKind::Assign { value, .. } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected an assignment");
    };
    let NodeKind::BinExpr {
        op: BinOp::Add,
        right,
        ..
    } = parsed.ast.kind(*value)
    else {
        panic!("expected addition at the top");
    };
    assert!(matches!(
        parsed.ast.kind(*right),
        NodeKind::BinExpr {
            op: BinOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_comparison_chain() {
    let parsed = parse("b = 1 < x < 10\n", None);
    let NodeKind::Assign { value, .. } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected an assignment");
    };
    let NodeKind::Compare {
        ops, comparators, ..
    } = parsed.ast.kind(*value)
    else {
        panic!("expected a comparison chain");
    };
    assert_eq!(ops.len(), 2);
    assert_eq!(comparators.len(), 2);
    assert!(matches!(ops[0], CmpOp::Lt));
}

#[test]
fn test_fstring_parts_and_exprs() {
    let parsed = parse("s = f\"a {x} b {y} c\"\n", None);
    let NodeKind::Assign { value, .. } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected an assignment");
    };
    let NodeKind::FString { parts, exprs } = parsed.ast.kind(*value) else {
        panic!("expected an f-string");
    };
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "a ");
    assert_eq!(parts[1], " b ");
    assert_eq!(parts[2], " c");
    assert_eq!(exprs.len(), 2);
}

#[test]
fn test_class_def_with_base() {
    let source = "\
class Dog(Animal):
    def speak(self):
        return 1
";
    let parsed = parse(source, None);
    assert!(!parsed.diagnostics.has_errors());
    let NodeKind::ClassDef { name, bases, body, .. } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected a class definition");
    };
    assert_eq!(name, "Dog");
    assert_eq!(bases.len(), 1);
    assert_eq!(body.len(), 1);
    assert!(matches!(
        parsed.ast.kind(body[0]),
        NodeKind::FunctionDef { .. }
    ));
}

#[test]
fn test_try_except_finally() {
    let source = "\
try:
    x = 1
except ValueError as e:
    x = 2
finally:
    x = 3
";
    let parsed = parse(source, None);
    assert!(!parsed.diagnostics.has_errors());
    let NodeKind::Try {
        handlers, finally, ..
    } = parsed.ast.kind(parsed.body[0])
    else {
        panic!("expected a try statement");
    };
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].name.as_deref(), Some("e"));
    assert!(handlers[0].exc_type.is_some());
    assert_eq!(finally.len(), 1);
}

#[test]
fn test_syntax_error_resyncs_to_next_statement() {
    let parsed = parse("x = = 1\ny = 2\n", None);
    assert!(has_code(&parsed, codes::SYNTAX));
    // the statement after the bad one still parses
    let last = *parsed.body.last().expect("body should not be empty");
    let NodeKind::Assign { targets, .. } = parsed.ast.kind(last) else {
        panic!("expected the next assignment to survive");
    };
    assert!(matches!(parsed.ast.kind(targets[0]), NodeKind::Name { id } if id == "y"));
}

#[test]
fn test_bad_block_recovers_at_dedent() {
    let source = "\
def broken(:
    x = 1

z = 5
";
    let parsed = parse(source, None);
    assert!(parsed.diagnostics.has_errors());
    let last = *parsed.body.last().expect("body should not be empty");
    let NodeKind::Assign { targets, .. } = parsed.ast.kind(last) else {
        panic!("expected the top-level assignment to survive");
    };
    assert!(matches!(parsed.ast.kind(targets[0]), NodeKind::Name { id } if id == "z"));
}

#[test]
fn test_inconsistent_dedent_is_reported() {
    let source = "\
if x:
    y = 1
  z = 2
";
    let parsed = parse(source, None);
    assert!(has_code(&parsed, codes::INDENT));
}

#[test]
fn test_unterminated_string_is_reported() {
    let parsed = parse("s = \"oops\n", None);
    let diag = parsed
        .diagnostics
        .iter()
        .find(|d| d.code == codes::UNTERMINATED_STRING)
        .expect("expected an unterminated-string diagnostic");
    assert_eq!(diag.phase, Phase::Lex);
}

#[test]
fn test_diagnostic_ceiling_aborts_the_parse() {
    let mut source = String::new();
    for _ in 0..20 {
        source.push_str("x = = 1\n");
    }
    let parsed = parse_with_limit(&source, None, 5);
    assert!(parsed.aborted);
    assert!(has_code(&parsed, codes::TOO_MANY_ERRORS));
}

#[test]
fn test_comments_and_blank_lines_are_skipped() {
    let source = "\
# leading comment

x = 1  # trailing comment

# another

y = 2
";
    let parsed = parse(source, None);
    assert!(!parsed.diagnostics.has_errors());
    assert_eq!(parsed.body.len(), 2);
}

#[test]
fn test_node_at_finds_innermost_node() {
    let source = "x = 1\nprint(x)\n";
    let parsed = parse(source, None);
    let offset = source.rfind('x').unwrap() as u32;
    let node = parsed
        .ast
        .node_at(&parsed.body, offset)
        .expect("offset should land on a node");
    assert!(matches!(parsed.ast.kind(node), NodeKind::Name { id } if id == "x"));
}

#[test]
fn test_for_loop_with_orelse() {
    let source = "\
for i in items:
    print(i)
else:
    print(0)
";
    let parsed = parse(source, None);
    assert!(!parsed.diagnostics.has_errors());
    let NodeKind::For { orelse, .. } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected a for loop");
    };
    assert_eq!(orelse.len(), 1);
}

#[test]
fn test_augmented_assignment_shape() {
    let parsed = parse("x += 2\n", None);
    assert!(matches!(
        parsed.ast.kind(parsed.body[0]),
        NodeKind::AugAssign {
            op: BinOp::Add,
            ..
        }
    ));
}

#[test]
fn test_lambda_and_conditional_expression() {
    let parsed = parse("f = lambda a, b: a if a > b else b\n", None);
    assert!(!parsed.diagnostics.has_errors());
    let NodeKind::Assign { value, .. } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected an assignment");
    };
    let NodeKind::Lambda { params, body } = parsed.ast.kind(*value) else {
        panic!("expected a lambda");
    };
    assert_eq!(params.len(), 2);
    assert!(matches!(parsed.ast.kind(*body), NodeKind::IfExp { .. }));
}

#[test]
fn test_list_comprehension_shape() {
    let parsed = parse("d = [n * 2 for n in nums if n > 0]\n", None);
    assert!(!parsed.diagnostics.has_errors());
    let NodeKind::Assign { value, .. } = parsed.ast.kind(parsed.body[0]) else {
        panic!("expected an assignment");
    };
    let NodeKind::Comp {
        kind: CompKind::List,
        generators,
        ..
    } = parsed.ast.kind(*value)
    else {
        panic!("expected a list comprehension");
    };
    assert_eq!(generators.len(), 1);
    assert_eq!(generators[0].conditions.len(), 1);
}
